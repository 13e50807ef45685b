//! Team event alerts over SMS.
//!
//! An operator fills in place/date/time and a recipient list; the server
//! normalizes the numbers, sends one SMS batch through the provider, logs the
//! send in a JSON file and serves a per-message landing page where recipients
//! confirm they saw it.

pub mod config;
pub mod dispatch;
pub mod landing;
pub mod pages;
pub mod routes;
pub mod store;
pub mod transport;

pub use config::{Cli, Config};
pub use routes::{router, serve, AppState};
