//! Send flow: validate, compose, hand to the transport, log the outcome.

use std::sync::Arc;

use serde::Deserialize;
use teamalert_common::message::{
    compose_text, fresh_id, landing_url, now_timestamp, Channel, EventDetails, MessageId,
    MessageRecord, ProviderResponse,
};
use teamalert_common::msisdn::normalize_msisdns;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::store::{MessageStore, StoreError};
use crate::transport::SmsTransport;

/// Body of `POST /send`. Missing fields default to empty and fail validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SendRequest {
    pub place: String,
    pub date: String,
    pub time: String,
    pub channel: Option<String>,
    pub raw_numbers: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Συμπλήρωσε τόπο/ημερομηνία/ώρα.")]
    MissingEventFields,
    #[error("Μόνο SMS υποστηρίζεται προς το παρόν.")]
    UnsupportedChannel(String),
    #[error("Δεν βρέθηκαν παραλήπτες.")]
    NoRecipients,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("message was sent but could not be logged: {0}")]
    Store(#[from] StoreError),
    #[error("send task did not complete: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSend {
    pub event: EventDetails,
    pub channel: Channel,
    pub recipients: Vec<String>,
}

impl SendRequest {
    pub fn validate(&self) -> Result<ValidatedSend, ValidationError> {
        let event = EventDetails {
            place: self.place.trim().to_string(),
            date: self.date.trim().to_string(),
            time: self.time.trim().to_string(),
        };
        if event.place.is_empty() || event.date.is_empty() || event.time.is_empty() {
            return Err(ValidationError::MissingEventFields);
        }

        let channel = match self.channel.as_deref().map(str::trim) {
            None | Some("") => Channel::Sms,
            Some(other) => {
                Channel::parse(other).ok_or_else(|| ValidationError::UnsupportedChannel(other.to_string()))?
            }
        };

        let recipients = normalize_msisdns(&self.raw_numbers);
        if recipients.is_empty() {
            return Err(ValidationError::NoRecipients);
        }

        Ok(ValidatedSend {
            event,
            channel,
            recipients,
        })
    }
}

/// What a send produced. The record exists in the log whatever `ok` says.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub ok: bool,
    pub id: MessageId,
    pub landing_url: String,
    pub provider: ProviderResponse,
}

#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<Config>,
    store: Arc<dyn MessageStore>,
    transport: Arc<dyn SmsTransport>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn SmsTransport>,
    ) -> Self {
        Self {
            config,
            store,
            transport,
        }
    }

    /// Validate and deliver one batch.
    ///
    /// Delivery runs on its own task: once the provider has been called the
    /// record is logged even if the caller stops waiting.
    pub async fn send(&self, request: &SendRequest) -> Result<SendOutcome, DispatchError> {
        let valid = request.validate().inspect_err(|e| {
            warn!(error = %e, channel = ?request.channel, "send rejected");
        })?;

        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.deliver(valid).await }).await?
    }

    async fn deliver(&self, valid: ValidatedSend) -> Result<SendOutcome, DispatchError> {
        let existing = self.store.load().await;
        let id = fresh_id(&existing);
        let landing = landing_url(&self.config.public_base_url, &id);
        let text = compose_text(&self.config.team_name, &valid.event, &landing);

        info!(
            %id,
            channel = valid.channel.as_str(),
            recipients = valid.recipients.len(),
            "dispatching batch"
        );
        let result = self
            .transport
            .send_batch(&self.config.sender, &text, &valid.recipients)
            .await;

        let record = MessageRecord {
            id: id.clone(),
            timestamp: now_timestamp(),
            place: valid.event.place,
            date: valid.event.date,
            time: valid.event.time,
            channel: valid.channel,
            recipients: valid.recipients,
            text,
            landing_url: landing.clone(),
            provider_response: result.response.clone(),
            seen_by: Vec::new(),
        };
        self.store.append(record).await.inspect_err(|e| {
            error!(%id, error = %e, "failed to log message");
        })?;

        Ok(SendOutcome {
            ok: result.success,
            id,
            landing_url: landing,
            provider: result.response,
        })
    }
}
