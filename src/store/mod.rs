//! Persistence contracts (§6). `spec.md` treats the row store and object
//! store as external collaborators behind four operations each; this module
//! defines those as traits plus a real reference implementation of each, so
//! the core pipeline can be exercised end-to-end without assuming a
//! specific backing database (Supabase/Postgres in the original system).

pub mod object_store;
pub mod sqlite;

use crate::errors::AppResult;
use crate::types::{
    AgendaRow, AnalyticsChatRow, AnalyticsConversionRow, AnalyticsLeadRow, LineRow, PageRow,
    WaContactNameRow, WhatsappSessionRow,
};
use async_trait::async_trait;

/// The row-store contract from §6: `insert`, `upsert(onConflict)`,
/// `update`, `select`. Modeled here as one method per concrete row shape
/// rather than a single dynamically-typed `insert(table, row)` call,
/// because the column lists are contractual and Rust's type system is
/// better used to enforce that than a generic JSON blob would.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn upsert_line(&self, row: &LineRow) -> AppResult<()>;
    async fn get_line(&self, id: &str) -> AppResult<Option<LineRow>>;
    async fn upsert_session(&self, row: &WhatsappSessionRow) -> AppResult<()>;
    async fn insert_chat(&self, row: &AnalyticsChatRow) -> AppResult<()>;
    async fn upsert_contact_name(&self, row: &WaContactNameRow) -> AppResult<()>;
    async fn upsert_agenda(&self, row: &AgendaRow) -> AppResult<()>;
    async fn get_agenda_status(&self, project_id: &str, contact: &str) -> AppResult<Option<String>>;
    async fn upsert_lead(&self, row: &AnalyticsLeadRow) -> AppResult<()>;
    async fn lead_exists(&self, project_id: &str, contact: &str) -> AppResult<bool>;
    async fn insert_conversion(&self, row: &AnalyticsConversionRow) -> AppResult<()>;
    async fn get_page(&self, id: &str) -> AppResult<Option<PageRow>>;
}

/// The object-store contract from §6: `upload` with upsert semantics and a
/// retrievable public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> AppResult<()>;
    async fn get_public_url(&self, bucket: &str, path: &str) -> AppResult<Option<String>>;
}

/// Build the object-store path contract from §4.7/§6:
/// `{project_id}/{digits(phone)}/{epoch_ms}.{ext}`.
pub fn object_store_path(project_id: &str, phone: &str, epoch_ms: i64, ext: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("{project_id}/{digits}/{epoch_ms}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_strips_non_digits_from_phone() {
        assert_eq!(
            object_store_path("proj1", "+54 9 11-2345", 1_700_000_000_000, "png"),
            "proj1/5491112345/1700000000000.png"
        );
    }
}
