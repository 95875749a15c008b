//! # Draft Sessions
//!
//! Open invoice drafts, one per session key (an invoice "tab").
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  startup ──► restore() ──► draft_sessions rows decoded                  │
//! │                              (none? open one "New Invoice")             │
//! │                                                                         │
//! │  open() ──────────► inv_<millis>_<rand> → fresh draft                   │
//! │  with_draft_mut() ─► edit a copy → save to store → swap in              │
//! │  commit ──────────► discard_committed() → same key, fresh draft         │
//! │  close() ─────────► removed (never the last one)                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation is written to the store before it becomes visible, so a
//! restart restores exactly what the operator last saw.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use dukaan_core::draft::{InvoiceDraft, TaxConfig};
use dukaan_core::{CoreError, CoreResult, Money};
use dukaan_db::{DbError, DraftStore};

use crate::error::ApiError;

/// One row of the session tab strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub key: String,
    pub label: String,
    pub line_count: usize,
    pub grand_total: Money,
    pub updated_at: DateTime<Utc>,
}

impl SessionSummary {
    fn of(key: &str, draft: &InvoiceDraft) -> Self {
        SessionSummary {
            key: key.to_string(),
            label: draft.label(),
            line_count: draft.lines().len(),
            grand_total: draft.totals().grand_total,
            updated_at: draft.updated_at(),
        }
    }
}

/// Keyed collection of independent drafts, backed by the draft store.
///
/// Keys sort by creation time, so listings come out in tab order.
#[derive(Debug, Clone)]
pub struct DraftSessions {
    sessions: Arc<Mutex<BTreeMap<String, InvoiceDraft>>>,
    store: DraftStore,
    default_tax: TaxConfig,
}

impl DraftSessions {
    pub fn new(store: DraftStore, default_tax: TaxConfig) -> Self {
        DraftSessions {
            sessions: Arc::new(Mutex::new(BTreeMap::new())),
            store,
            default_tax,
        }
    }

    /// Loads saved drafts. Unreadable payloads are dropped from the store.
    /// Opens a fresh session when nothing was saved.
    ///
    /// Returns the number of sessions restored.
    pub async fn restore(&self) -> Result<usize, ApiError> {
        let records = self.store.list().await?;
        let mut sessions = self.sessions.lock().await;

        for record in records {
            match record.decode::<InvoiceDraft>() {
                Ok(draft) => {
                    sessions.insert(record.session_key, draft);
                }
                Err(e) => {
                    warn!(
                        key = %record.session_key,
                        error = %e,
                        "Dropping unreadable draft session"
                    );
                    self.store.delete(&record.session_key).await?;
                }
            }
        }

        let restored = sessions.len();
        if sessions.is_empty() {
            let (key, draft) = self.fresh();
            self.store.save(&key, &draft.label(), &draft).await?;
            sessions.insert(key, draft);
        }

        info!(restored, "Draft sessions restored");
        Ok(restored)
    }

    /// Opens a new empty session.
    pub async fn open(&self) -> Result<SessionSummary, ApiError> {
        let (key, draft) = self.fresh();
        self.store.save(&key, &draft.label(), &draft).await?;

        let summary = SessionSummary::of(&key, &draft);
        self.sessions.lock().await.insert(key.clone(), draft);

        info!(key = %key, "Draft session opened");
        Ok(summary)
    }

    /// Closes a session, discarding its draft.
    ///
    /// ## Returns
    /// * `Err` (`DRAFT_ERROR`) - It is the last open session
    pub async fn close(&self, key: &str) -> Result<(), ApiError> {
        let mut sessions = self.sessions.lock().await;

        if !sessions.contains_key(key) {
            return Err(CoreError::DraftSessionNotFound(key.to_string()).into());
        }
        if sessions.len() == 1 {
            return Err(CoreError::LastDraftSession.into());
        }

        match self.store.delete(key).await {
            Ok(()) | Err(DbError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        sessions.remove(key);

        info!(key = %key, "Draft session closed");
        Ok(())
    }

    pub async fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .lock()
            .await
            .iter()
            .map(|(key, draft)| SessionSummary::of(key, draft))
            .collect()
    }

    /// Runs `f` with read access to one draft.
    pub async fn with_draft<F, R>(&self, key: &str, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&InvoiceDraft) -> R,
    {
        let sessions = self.sessions.lock().await;
        let draft = sessions
            .get(key)
            .ok_or_else(|| CoreError::DraftSessionNotFound(key.to_string()))?;
        Ok(f(draft))
    }

    /// Applies `f` to one draft and persists the result.
    ///
    /// `f` runs on a copy; if it fails, or the store write fails, the
    /// session keeps its previous state.
    pub async fn with_draft_mut<F, R>(&self, key: &str, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&mut InvoiceDraft) -> CoreResult<R>,
    {
        let mut sessions = self.sessions.lock().await;
        let current = sessions
            .get(key)
            .ok_or_else(|| CoreError::DraftSessionNotFound(key.to_string()))?;

        let mut edited = current.clone();
        let result = f(&mut edited)?;

        self.store.save(key, &edited.label(), &edited).await?;
        debug!(key = %key, lines = edited.lines().len(), "Draft updated");
        sessions.insert(key.to_string(), edited);

        Ok(result)
    }

    /// Copy of one draft, e.g. to commit it without holding the lock.
    pub async fn snapshot(&self, key: &str) -> Result<InvoiceDraft, ApiError> {
        self.with_draft(key, InvoiceDraft::clone).await
    }

    /// Replaces a committed draft with a fresh one under the same key.
    ///
    /// If the draft was edited after `committed` was taken, those edits are
    /// kept and nothing is replaced.
    pub async fn discard_committed(
        &self,
        key: &str,
        committed: &InvoiceDraft,
    ) -> Result<SessionSummary, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let current = sessions
            .get(key)
            .ok_or_else(|| CoreError::DraftSessionNotFound(key.to_string()))?;

        if current != committed {
            warn!(key = %key, "Draft changed during commit; keeping the newer edits");
            return Ok(SessionSummary::of(key, current));
        }

        let draft = InvoiceDraft::new(self.default_tax);
        self.store.save(key, &draft.label(), &draft).await?;

        let summary = SessionSummary::of(key, &draft);
        sessions.insert(key.to_string(), draft);
        debug!(key = %key, "Draft reset after commit");
        Ok(summary)
    }

    fn fresh(&self) -> (String, InvoiceDraft) {
        (new_session_key(), InvoiceDraft::new(self.default_tax))
    }
}

/// `inv_<millis>_<6 hex>`
fn new_session_key() -> String {
    let rand = Uuid::new_v4().simple().to_string();
    format!("inv_{}_{}", Utc::now().timestamp_millis(), &rand[..6])
}

#[cfg(test)]
mod tests {
    use super::*;
    use dukaan_core::draft::{CustomerInfo, LineUpdate};
    use dukaan_core::DEFAULT_DRAFT_LABEL;
    use dukaan_db::{Database, DbConfig};

    use crate::error::ErrorCode;

    async fn sessions() -> (Database, DraftSessions) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sessions = DraftSessions::new(db.drafts(), TaxConfig::none());
        (db, sessions)
    }

    #[test]
    fn test_session_key_shape() {
        let key = new_session_key();
        let parts: Vec<&str> = key.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "inv");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 6);
    }

    #[tokio::test]
    async fn test_restore_opens_one_when_empty() {
        let (_db, sessions) = sessions().await;

        assert_eq!(sessions.restore().await.unwrap(), 0);

        let list = sessions.list().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].label, DEFAULT_DRAFT_LABEL);
    }

    #[tokio::test]
    async fn test_edits_survive_restart() {
        let (db, sessions) = sessions().await;
        let opened = sessions.open().await.unwrap();

        sessions
            .with_draft_mut(&opened.key, |d| {
                d.set_customer(CustomerInfo {
                    name: "Ravi".into(),
                    ..Default::default()
                });
                d.add_manual_line()
            })
            .await
            .unwrap();

        let reopened = DraftSessions::new(db.drafts(), TaxConfig::none());
        assert_eq!(reopened.restore().await.unwrap(), 1);

        let (label, lines) = reopened
            .with_draft(&opened.key, |d| (d.label(), d.lines().len()))
            .await
            .unwrap();
        assert_eq!(label, "Ravi");
        assert_eq!(lines, 1);
    }

    #[tokio::test]
    async fn test_failed_edit_leaves_draft_unchanged() {
        let (_db, sessions) = sessions().await;
        let opened = sessions.open().await.unwrap();

        let err = sessions
            .with_draft_mut(&opened.key, |d| {
                d.add_manual_line()?;
                d.update_line(5, LineUpdate::Quantity(2))
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DraftError);
        let untouched = sessions.with_draft(&opened.key, |d| d.is_empty()).await;
        assert!(untouched.unwrap());
    }

    #[tokio::test]
    async fn test_last_session_cannot_be_closed() {
        let (_db, sessions) = sessions().await;
        let a = sessions.open().await.unwrap();
        let b = sessions.open().await.unwrap();

        sessions.close(&a.key).await.unwrap();
        let err = sessions.close(&b.key).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::DraftError);
        assert_eq!(sessions.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (_db, sessions) = sessions().await;
        let err = sessions
            .with_draft("inv_0_000000", |_| ())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_discard_committed_keeps_newer_edits() {
        let (_db, sessions) = sessions().await;
        let opened = sessions.open().await.unwrap();
        sessions
            .with_draft_mut(&opened.key, |d| d.add_manual_line())
            .await
            .unwrap();

        let committed = sessions.snapshot(&opened.key).await.unwrap();
        sessions
            .with_draft_mut(&opened.key, |d| d.add_manual_line())
            .await
            .unwrap();

        let summary = sessions
            .discard_committed(&opened.key, &committed)
            .await
            .unwrap();
        assert_eq!(summary.line_count, 2);

        let committed = sessions.snapshot(&opened.key).await.unwrap();
        let summary = sessions
            .discard_committed(&opened.key, &committed)
            .await
            .unwrap();
        assert_eq!(summary.line_count, 0);
        assert_eq!(summary.key, opened.key);
    }
}
