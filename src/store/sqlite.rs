//! SQLite-backed `RowStore` reference implementation. Schema setup mirrors
//! the teacher's `database::schema_v2` discipline: `CREATE TABLE IF NOT
//! EXISTS` banners, one statement per table, run once on connection open.

use super::RowStore;
use crate::errors::AppResult;
use crate::types::{
    AgendaRow, AnalyticsChatRow, AnalyticsConversionRow, AnalyticsLeadRow, LineRow, PageRow,
    WaContactNameRow, WhatsappSessionRow,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

const SCHEMA: &str = r#"
-- lines: one row per WhatsApp line, status mirrors the session state machine
-- plus the two HTTP-only statuses (connected, qr_ready).
CREATE TABLE IF NOT EXISTS lines (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    status TEXT NOT NULL,
    phone TEXT
);

-- whatsapp_sessions: one row per line, conflict key is line_id.
CREATE TABLE IF NOT EXISTS whatsapp_sessions (
    line_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    wa_status TEXT NOT NULL,
    wa_phone TEXT,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS analytics_chats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    page_id TEXT,
    slug TEXT,
    line_id TEXT,
    wa_phone TEXT,
    contact TEXT NOT NULL,
    message TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_analytics_chats_contact
    ON analytics_chats(project_id, contact);

CREATE TABLE IF NOT EXISTS wa_contact_names (
    project_id TEXT NOT NULL,
    phone TEXT NOT NULL,
    name TEXT,
    avatar_url TEXT,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (project_id, phone)
);

-- agenda: status only ever moves new -> conversion (never backwards).
-- source_page_id/source_slug are sticky to the first-seen values (Open
-- Question (c)): the upsert's DO UPDATE clause omits them.
CREATE TABLE IF NOT EXISTS agenda (
    project_id TEXT NOT NULL,
    contact TEXT NOT NULL,
    wa_phone TEXT,
    source_slug TEXT,
    source_page_id TEXT,
    status TEXT NOT NULL DEFAULT 'new',
    last_message_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (project_id, contact)
);

-- analytics_leads: at most one row per (project_id, contact) on the normal
-- path (Open Question (b): a single deterministic upsert, not two writes).
CREATE TABLE IF NOT EXISTS analytics_leads (
    project_id TEXT NOT NULL,
    contact TEXT NOT NULL,
    wa_phone TEXT,
    source_slug TEXT,
    source_page_id TEXT,
    page_id TEXT,
    slug TEXT,
    first_message TEXT,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (project_id, contact)
);

CREATE TABLE IF NOT EXISTS analytics_conversions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    page_id TEXT,
    slug TEXT,
    contact TEXT NOT NULL,
    wa_phone TEXT,
    file_url TEXT,
    file_mime TEXT NOT NULL,
    amount REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'received',
    line_id TEXT,
    concept TEXT,
    reference TEXT,
    operation_no TEXT,
    origin_name TEXT,
    origin_cuit TEXT,
    origin_account TEXT,
    origin_bank TEXT,
    dest_name TEXT,
    dest_cuit TEXT,
    dest_account TEXT,
    dest_bank TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_analytics_conversions_contact
    ON analytics_conversions(project_id, contact);

CREATE TABLE IF NOT EXISTS pages (
    id TEXT PRIMARY KEY,
    slug TEXT NOT NULL,
    project_id TEXT NOT NULL,
    fb_pixel_id TEXT,
    fb_access_token TEXT,
    fb_test_event_code TEXT
);
"#;

pub struct SqliteRowStore {
    connection: Mutex<Connection>,
}

impl SqliteRowStore {
    pub fn open(path: &std::path::Path) -> AppResult<Self> {
        let connection = Connection::open(path)?;
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

#[async_trait]
impl RowStore for SqliteRowStore {
    async fn upsert_line(&self, row: &LineRow) -> AppResult<()> {
        let conn = self.connection.lock().unwrap();
        conn.execute(
            "INSERT INTO lines (id, project_id, status, phone) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET status = excluded.status, phone = excluded.phone",
            params![row.id, row.project_id, row.status, row.phone],
        )?;
        Ok(())
    }

    async fn get_line(&self, id: &str) -> AppResult<Option<LineRow>> {
        let conn = self.connection.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, project_id, status, phone FROM lines WHERE id = ?1",
                params![id],
                |r| {
                    Ok(LineRow {
                        id: r.get(0)?,
                        project_id: r.get(1)?,
                        status: r.get(2)?,
                        phone: r.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    async fn upsert_session(&self, row: &WhatsappSessionRow) -> AppResult<()> {
        let conn = self.connection.lock().unwrap();
        conn.execute(
            "INSERT INTO whatsapp_sessions (line_id, project_id, wa_status, wa_phone, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(line_id) DO UPDATE SET
                wa_status = excluded.wa_status,
                wa_phone = excluded.wa_phone,
                updated_at = excluded.updated_at",
            params![
                row.line_id,
                row.project_id,
                row.wa_status,
                row.wa_phone,
                row.updated_at
            ],
        )?;
        Ok(())
    }

    async fn insert_chat(&self, row: &AnalyticsChatRow) -> AppResult<()> {
        let conn = self.connection.lock().unwrap();
        conn.execute(
            "INSERT INTO analytics_chats
                (project_id, page_id, slug, line_id, wa_phone, contact, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.project_id,
                row.page_id,
                row.slug,
                row.line_id,
                row.wa_phone,
                row.contact,
                row.message,
                row.created_at
            ],
        )?;
        Ok(())
    }

    async fn upsert_contact_name(&self, row: &WaContactNameRow) -> AppResult<()> {
        let conn = self.connection.lock().unwrap();
        conn.execute(
            "INSERT INTO wa_contact_names (project_id, phone, name, avatar_url, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(project_id, phone) DO UPDATE SET
                name = excluded.name,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at",
            params![row.project_id, row.phone, row.name, row.avatar_url, row.updated_at],
        )?;
        Ok(())
    }

    async fn upsert_agenda(&self, row: &AgendaRow) -> AppResult<()> {
        let conn = self.connection.lock().unwrap();
        conn.execute(
            "INSERT INTO agenda
                (project_id, contact, wa_phone, source_slug, source_page_id, status,
                 last_message_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(project_id, contact) DO UPDATE SET
                wa_phone = excluded.wa_phone,
                status = excluded.status,
                last_message_at = excluded.last_message_at,
                updated_at = excluded.updated_at",
            params![
                row.project_id,
                row.contact,
                row.wa_phone,
                row.source_slug,
                row.source_page_id,
                row.status,
                row.last_message_at,
                row.updated_at
            ],
        )?;
        Ok(())
    }

    async fn get_agenda_status(&self, project_id: &str, contact: &str) -> AppResult<Option<String>> {
        let conn = self.connection.lock().unwrap();
        let status = conn
            .query_row(
                "SELECT status FROM agenda WHERE project_id = ?1 AND contact = ?2",
                params![project_id, contact],
                |r| r.get(0),
            )
            .optional()?;
        Ok(status)
    }

    async fn upsert_lead(&self, row: &AnalyticsLeadRow) -> AppResult<()> {
        let conn = self.connection.lock().unwrap();
        conn.execute(
            "INSERT INTO analytics_leads
                (project_id, contact, wa_phone, source_slug, source_page_id, page_id, slug,
                 first_message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(project_id, contact) DO UPDATE SET
                wa_phone = excluded.wa_phone,
                first_message = excluded.first_message",
            params![
                row.project_id,
                row.contact,
                row.wa_phone,
                row.source_slug,
                row.source_page_id,
                row.page_id,
                row.slug,
                row.first_message,
                row.created_at
            ],
        )?;
        Ok(())
    }

    async fn lead_exists(&self, project_id: &str, contact: &str) -> AppResult<bool> {
        let conn = self.connection.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM analytics_leads WHERE project_id = ?1 AND contact = ?2",
            params![project_id, contact],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    async fn insert_conversion(&self, row: &AnalyticsConversionRow) -> AppResult<()> {
        let conn = self.connection.lock().unwrap();
        conn.execute(
            "INSERT INTO analytics_conversions
                (project_id, page_id, slug, contact, wa_phone, file_url, file_mime, amount,
                 status, line_id, concept, reference, operation_no,
                 origin_name, origin_cuit, origin_account, origin_bank,
                 dest_name, dest_cuit, dest_account, dest_bank, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22)",
            params![
                row.project_id,
                row.page_id,
                row.slug,
                row.contact,
                row.wa_phone,
                row.file_url,
                row.file_mime,
                row.amount,
                row.status,
                row.line_id,
                row.concept,
                row.reference,
                row.operation_no,
                row.origin_name,
                row.origin_cuit,
                row.origin_account,
                row.origin_bank,
                row.dest_name,
                row.dest_cuit,
                row.dest_account,
                row.dest_bank,
                row.created_at
            ],
        )?;
        Ok(())
    }

    async fn get_page(&self, id: &str) -> AppResult<Option<PageRow>> {
        let conn = self.connection.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, slug, project_id, fb_pixel_id, fb_access_token, fb_test_event_code
                 FROM pages WHERE id = ?1",
                params![id],
                |r| {
                    Ok(PageRow {
                        id: r.get(0)?,
                        slug: r.get(1)?,
                        project_id: r.get(2)?,
                        fb_pixel_id: r.get(3)?,
                        fb_access_token: r.get(4)?,
                        fb_test_event_code: r.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteRowStore {
        SqliteRowStore::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn line_upsert_then_get() {
        let store = store();
        let row = LineRow {
            id: "line1".into(),
            project_id: "p1".into(),
            status: "ready".into(),
            phone: Some("5491112345".into()),
        };
        store.upsert_line(&row).await.unwrap();
        let fetched = store.get_line("line1").await.unwrap().unwrap();
        assert_eq!(fetched.status, "ready");
        assert_eq!(fetched.phone.as_deref(), Some("5491112345"));
    }

    #[tokio::test]
    async fn agenda_upsert_is_idempotent_on_conflict_key() {
        let store = store();
        let row = AgendaRow {
            project_id: "p1".into(),
            contact: "c1".into(),
            wa_phone: None,
            source_slug: Some("slug-a".into()),
            source_page_id: Some("page-a".into()),
            status: "new".into(),
            last_message_at: 1,
            updated_at: 1,
        };
        store.upsert_agenda(&row).await.unwrap();

        let mut second = row.clone();
        second.status = "conversion".into();
        second.source_slug = Some("slug-b".into());
        store.upsert_agenda(&second).await.unwrap();

        let status = store.get_agenda_status("p1", "c1").await.unwrap();
        assert_eq!(status.as_deref(), Some("conversion"));
    }

    #[tokio::test]
    async fn lead_upsert_keeps_single_row_per_contact() {
        let store = store();
        let row = AnalyticsLeadRow {
            project_id: "p1".into(),
            contact: "c1".into(),
            wa_phone: None,
            source_slug: None,
            source_page_id: None,
            page_id: None,
            slug: None,
            first_message: Some("hola".into()),
            created_at: 1,
        };
        store.upsert_lead(&row).await.unwrap();
        store.upsert_lead(&row).await.unwrap();
        assert!(store.lead_exists("p1", "c1").await.unwrap());
    }
}
