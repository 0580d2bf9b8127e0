//! Outbound ad-conversion event emission (§6). Fire-and-forget: failures are
//! logged and swallowed, never propagated to the router or pipeline caller,
//! mirroring the teacher's `rpc/client.rs` posture toward a flaky external
//! service.

use crate::utils::retry::calculate_next_backoff;
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::warn;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_SECONDS: u64 = 1;
const BACKOFF_MULTIPLIER: f64 = 2.0;
const MAX_BACKOFF_SECONDS: u64 = 10;

/// Pseudonymize a contact identifier the way the Conversions API expects:
/// lowercase, trim, SHA-256, hex-encode.
pub fn hash_contact(contact: &str) -> String {
    let normalized = contact.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)
}

#[derive(Debug, Serialize)]
struct UserData {
    external_id: String,
}

#[derive(Debug, Serialize)]
struct EventPayload {
    event_name: &'static str,
    event_time: i64,
    event_id: String,
    action_source: &'static str,
    user_data: UserData,
    custom_data: CustomData,
}

#[derive(Debug, Serialize)]
struct CustomData {
    currency: &'static str,
    value: f64,
}

#[derive(Debug, Serialize)]
struct EventRequest {
    data: Vec<EventPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_event_code: Option<String>,
}

/// Emits a purchase conversion event to an ad platform; the receipt pipeline
/// depends on this trait rather than a concrete HTTP client so it can be
/// exercised without a live network call in tests.
#[async_trait]
pub trait AdEventEmitter: Send + Sync {
    async fn emit_purchase(
        &self,
        contact: &str,
        value: f64,
        pixel_id: &str,
        access_token: &str,
        test_event_code: Option<&str>,
        event_time: i64,
    );
}

pub struct FacebookAdEventEmitter {
    client: reqwest::Client,
}

impl FacebookAdEventEmitter {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(pixel_id: &str, access_token: &str) -> String {
        format!("https://graph.facebook.com/v18.0/{pixel_id}/events?access_token={access_token}")
    }
}

impl Default for FacebookAdEventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdEventEmitter for FacebookAdEventEmitter {
    async fn emit_purchase(
        &self,
        contact: &str,
        value: f64,
        pixel_id: &str,
        access_token: &str,
        test_event_code: Option<&str>,
        event_time: i64,
    ) {
        let body = EventRequest {
            data: vec![EventPayload {
                event_name: "Purchase",
                event_time,
                event_id: uuid::Uuid::new_v4().to_string(),
                action_source: "chat",
                user_data: UserData {
                    external_id: hash_contact(contact),
                },
                custom_data: CustomData {
                    currency: "ARS",
                    value,
                },
            }],
            test_event_code: test_event_code.map(str::to_string),
        };

        let url = Self::endpoint(pixel_id, access_token);
        let mut backoff = Duration::from_secs(INITIAL_BACKOFF_SECONDS);

        for attempt in 1..=MAX_ATTEMPTS {
            match self.client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => return,
                Ok(response) => {
                    warn!(status = %response.status(), attempt, "ad event rejected by platform");
                }
                Err(err) => {
                    warn!(error = %err, attempt, "ad event request failed");
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(backoff).await;
                backoff = calculate_next_backoff(
                    backoff,
                    BACKOFF_MULTIPLIER,
                    MAX_BACKOFF_SECONDS,
                );
            }
        }

        warn!(contact_hash = %hash_contact(contact), "ad event exhausted retries, dropping");
    }
}
