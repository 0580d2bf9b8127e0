//! Inbound Router (§2.10 overview, §4.8 "Message dispatch"). Dedupes on the
//! message's canonical ID, skips non-individual chats and self-originated
//! messages, classifies a plain chat vs. a receipt candidate, updates the
//! agenda/lead tables, emits ad-conversion events, and invokes the Receipt
//! Pipeline on media. Grounded in the teacher's `cli/commands/fetch.rs`
//! dispatch shape: one function per concern, called in a fixed sequence,
//! each wrapped so a failure in one step never aborts the rest (§5 "Failure
//! containment").

use crate::ads::AdEventEmitter;
use crate::errors::AppResult;
use crate::receipt;
use crate::session::client::InboundMessage;
use crate::store::{ObjectStore, RowStore};
use crate::types::{AgendaRow, AnalyticsChatRow, AnalyticsLeadRow};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, warn};

lazy_static! {
    static ref LEAD_TRIGGER: Regex =
        Regex::new(r"(?i)^\s*hola\s+mi\s+c[oó]digo\s+de\s+descuento\s+es\s*[:\-]?\s*\S+")
            .unwrap();
}

/// Per-process dedupe set and external collaborators the router needs to
/// carry a message end to end. Shared between every [`crate::session`]
/// instance (§9 "Global mutable state").
pub struct Router {
    store: Arc<dyn RowStore>,
    object_store: Arc<dyn ObjectStore>,
    ad_emitter: Arc<dyn AdEventEmitter>,
    receipts_bucket: String,
    mp_force_x1000: bool,
    seen: Mutex<HashSet<String>>,
}

impl Router {
    pub fn new(
        store: Arc<dyn RowStore>,
        object_store: Arc<dyn ObjectStore>,
        ad_emitter: Arc<dyn AdEventEmitter>,
        receipts_bucket: String,
        mp_force_x1000: bool,
    ) -> Self {
        Self {
            store,
            object_store,
            ad_emitter,
            receipts_bucket,
            mp_force_x1000,
            seen: Mutex::new(HashSet::new()),
        }
    }

    pub async fn handle_inbound(
        &self,
        project_id: &str,
        line_id: &str,
        msg: InboundMessage,
    ) -> AppResult<()> {
        if msg.is_group_or_broadcast || msg.from_me {
            return Ok(());
        }

        {
            let mut seen = self.seen.lock().await;
            if !seen.insert(msg.id.clone()) {
                return Ok(());
            }
        }

        if let Err(err) = self
            .record_chat_and_agenda(project_id, line_id, &msg)
            .await
        {
            error!(message_id = %msg.id, error = %err, "failed to record chat/agenda");
        }

        if let Some(candidate) = msg.media.clone() {
            if let Err(err) = self
                .run_receipt_pipeline(project_id, line_id, &msg, candidate)
                .await
            {
                error!(message_id = %msg.id, error = %err, "receipt pipeline failed");
            }
        }

        Ok(())
    }

    async fn record_chat_and_agenda(
        &self,
        project_id: &str,
        line_id: &str,
        msg: &InboundMessage,
    ) -> AppResult<()> {
        let now = epoch_ms_placeholder();

        self.store
            .insert_chat(&AnalyticsChatRow {
                project_id: project_id.to_string(),
                page_id: None,
                slug: None,
                line_id: Some(line_id.to_string()),
                wa_phone: Some(msg.from.clone()),
                contact: msg.from.clone(),
                message: msg.body.clone(),
                created_at: now,
            })
            .await?;

        let existing_status = self
            .store
            .get_agenda_status(project_id, &msg.from)
            .await?;
        let status = existing_status.unwrap_or_else(|| "new".to_string());

        self.store
            .upsert_agenda(&AgendaRow {
                project_id: project_id.to_string(),
                contact: msg.from.clone(),
                wa_phone: Some(msg.from.clone()),
                source_slug: None,
                source_page_id: None,
                status,
                last_message_at: now,
                updated_at: now,
            })
            .await?;

        if !self.store.lead_exists(project_id, &msg.from).await? {
            self.store
                .upsert_lead(&AnalyticsLeadRow {
                    project_id: project_id.to_string(),
                    contact: msg.from.clone(),
                    wa_phone: Some(msg.from.clone()),
                    source_slug: None,
                    source_page_id: None,
                    page_id: None,
                    slug: None,
                    first_message: msg.body.clone(),
                    created_at: now,
                })
                .await?;
        } else if let Some(body) = &msg.body {
            if LEAD_TRIGGER.is_match(body) {
                self.store
                    .upsert_lead(&AnalyticsLeadRow {
                        project_id: project_id.to_string(),
                        contact: msg.from.clone(),
                        wa_phone: Some(msg.from.clone()),
                        source_slug: None,
                        source_page_id: None,
                        page_id: None,
                        slug: None,
                        first_message: Some(body.clone()),
                        created_at: now,
                    })
                    .await?;
            }
        }

        Ok(())
    }

    async fn run_receipt_pipeline(
        &self,
        project_id: &str,
        line_id: &str,
        msg: &InboundMessage,
        candidate: crate::types::ReceiptCandidate,
    ) -> AppResult<()> {
        let outcome = receipt::process(
            project_id,
            line_id,
            &msg.from,
            &candidate,
            msg.body.as_deref(),
            self.store.as_ref(),
            self.object_store.as_ref(),
            &self.receipts_bucket,
            self.mp_force_x1000,
        )
        .await?;

        if let Some(parsed) = outcome {
            self.store
                .upsert_agenda(&AgendaRow {
                    project_id: project_id.to_string(),
                    contact: msg.from.clone(),
                    wa_phone: Some(msg.from.clone()),
                    source_slug: None,
                    source_page_id: None,
                    status: "conversion".to_string(),
                    last_message_at: epoch_ms_placeholder(),
                    updated_at: epoch_ms_placeholder(),
                })
                .await?;

            if let Some(page) = self.store.get_page(line_id).await.ok().flatten() {
                if let (Some(pixel_id), Some(token)) = (page.fb_pixel_id, page.fb_access_token) {
                    if let Some(amount) = parsed.amount {
                        self.ad_emitter
                            .emit_purchase(
                                &msg.from,
                                amount,
                                &pixel_id,
                                &token,
                                page.fb_test_event_code.as_deref(),
                                epoch_ms_placeholder(),
                            )
                            .await;
                    }
                }
            } else {
                warn!(line_id = %line_id, "no page/pixel config found, skipping ad event");
            }
        }

        Ok(())
    }
}

fn epoch_ms_placeholder() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::object_store::FsObjectStore;
    use crate::store::sqlite::SqliteRowStore;
    use async_trait::async_trait;

    struct NoopAdEmitter;

    #[async_trait]
    impl AdEventEmitter for NoopAdEmitter {
        async fn emit_purchase(
            &self,
            _contact: &str,
            _value: f64,
            _pixel_id: &str,
            _access_token: &str,
            _test_event_code: Option<&str>,
            _event_time: i64,
        ) {
        }
    }

    fn router() -> Router {
        let store = Arc::new(SqliteRowStore::open_in_memory().unwrap());
        let object_store = Arc::new(FsObjectStore::new(std::env::temp_dir()));
        Router::new(store, object_store, Arc::new(NoopAdEmitter), "receipts".to_string(), true)
    }

    fn text_message(id: &str, body: &str) -> InboundMessage {
        InboundMessage {
            id: id.to_string(),
            from: "5491112345".to_string(),
            is_group_or_broadcast: false,
            from_me: false,
            body: Some(body.to_string()),
            media: None,
        }
    }

    #[tokio::test]
    async fn duplicate_message_id_is_a_no_op_second_time() {
        let router = router();
        router
            .handle_inbound("proj1", "line1", text_message("m1", "hola"))
            .await
            .unwrap();
        router
            .handle_inbound("proj1", "line1", text_message("m1", "hola"))
            .await
            .unwrap();

        assert_eq!(router.seen.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn group_messages_are_skipped() {
        let router = router();
        let mut msg = text_message("m2", "hola");
        msg.is_group_or_broadcast = true;
        router.handle_inbound("proj1", "line1", msg).await.unwrap();
        assert!(router.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn self_originated_messages_are_skipped() {
        let router = router();
        let mut msg = text_message("m3", "hola");
        msg.from_me = true;
        router.handle_inbound("proj1", "line1", msg).await.unwrap();
        assert!(router.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn lead_trigger_phrase_matches() {
        assert!(LEAD_TRIGGER.is_match("Hola mi codigo de descuento es: ABC123"));
        assert!(!LEAD_TRIGGER.is_match("buen dia"));
    }
}
