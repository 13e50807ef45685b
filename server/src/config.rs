//! Startup configuration.
//!
//! Every option can come from a flag or from the environment (a `.env` file
//! is honoured too). Parsed once into an immutable [`Config`] that is shared
//! by the dispatcher, the landing handler and the routes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Default OMNI send endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://services.yuboto.com/omni/v1/Send";

/// Upper bound on a single provider call.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// File name of the message log inside the data directory.
pub const LOG_FILE_NAME: &str = "logs.json";

#[derive(Parser, Debug, Clone)]
#[command(name = "teamalert", about = "SMS event alerts with landing-page acknowledgements")]
pub struct Cli {
    /// Pre-encoded HTTP Basic credential for the SMS provider.
    #[arg(long, env = "YUBOTO_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sender name shown on recipients' phones.
    #[arg(long, env = "YUBOTO_SENDER", default_value = "FDTeam 2012")]
    sender: String,

    /// Public URL the landing links are built from.
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "http://127.0.0.1:8899")]
    public_base_url: String,

    /// Directory holding the message log.
    #[arg(long, env = "TEAMALERT_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Directory served under /static (icons, favicon).
    #[arg(long, env = "TEAMALERT_STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,

    /// Address to bind.
    #[arg(long, env = "TEAMALERT_BIND", default_value = "0.0.0.0")]
    bind: std::net::IpAddr,

    /// HTTP port to listen on.
    #[arg(long, env = "TEAMALERT_PORT", default_value_t = 8899)]
    port: u16,

    /// SMS provider send endpoint.
    #[arg(long, env = "YUBOTO_URL", default_value = DEFAULT_PROVIDER_URL)]
    provider_url: String,

    /// Team name used as the first line of every message.
    #[arg(long, env = "TEAMALERT_TEAM", default_value = "Flying Dads Team")]
    team_name: String,

    /// Take the client address from X-Forwarded-For (when behind a reverse proxy).
    #[arg(long, env = "TEAMALERT_TRUST_FORWARDED")]
    trust_forwarded: bool,
}

impl Cli {
    pub fn into_config(self) -> Config {
        Config {
            api_key: self
                .api_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            sender: self.sender.trim().to_string(),
            public_base_url: self.public_base_url.trim().trim_end_matches('/').to_string(),
            data_dir: self.data_dir,
            static_dir: self.static_dir,
            listen: SocketAddr::new(self.bind, self.port),
            provider_url: self.provider_url,
            team_name: self.team_name,
            trust_forwarded: self.trust_forwarded,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub sender: String,
    pub public_base_url: String,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub listen: SocketAddr,
    pub provider_url: String,
    pub team_name: String,
    pub trust_forwarded: bool,
}

impl Config {
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE_NAME)
    }
}
