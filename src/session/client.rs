//! The external-client capability interface (§9 "External client
//! encapsulation"): `{initialize, getState, onEvent(name, fn), destroy}`.
//! Modeled as a trait plus an event enum rather than a callback-registration
//! API, since Rust's ownership rules make a Rust-idiomatic event loop
//! (`handle_event` dispatched by the caller) a closer fit than JS-style
//! `on(name, fn)` registration.

use super::state::ClientRawState;
use crate::errors::AppResult;
use async_trait::async_trait;

/// A single inbound WhatsApp message, as delivered by either the `message`
/// or `message_create` client event (§4.8 "Message dispatch").
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub from: String,
    pub is_group_or_broadcast: bool,
    pub from_me: bool,
    pub body: Option<String>,
    pub media: Option<crate::types::ReceiptCandidate>,
}

/// The event set a conforming external client implementation must emit
/// (§9): `{loading_screen, qr, authenticated, ready, message,
/// message_create, disconnected}`.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    LoadingScreen,
    Qr(String),
    Authenticated,
    Ready,
    Message(InboundMessage),
    MessageCreate(InboundMessage),
    Disconnected(String),
}

/// Capability interface for the external WhatsApp Web client/browser
/// automation layer. A reimplementation may substitute any backend as long
/// as it emits [`ClientEvent`] and answers [`ExternalClient::get_state`]
/// truthfully.
#[async_trait]
pub trait ExternalClient: Send + Sync {
    async fn initialize(&self) -> AppResult<()>;
    async fn get_state(&self) -> ClientRawState;
    /// The line's own phone number, once resolvable; `None` until the
    /// client has enough session state to answer.
    async fn own_phone(&self) -> Option<String>;
    async fn destroy(&self) -> AppResult<()>;
}
