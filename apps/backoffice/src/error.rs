//! # API Error Type
//!
//! Unified error type returned by every back office command.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                      │
//! │                                  │                                      │
//! │  DbError ────────────────────────┼──► ApiError { code, message } ──►   │
//! │                                  │                                      │
//! │  CommitError (saga outcome) ─────┤   internals are logged here and      │
//! │                                  │   replaced with a generic message    │
//! │  ConfigError ────────────────────┘                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use dukaan_core::CoreError;
use dukaan_db::DbError;

use crate::commit::CommitError;
use crate::state::ConfigError;

/// Error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "PARTIAL_COMMIT",
///   "message": "Invoice DK-1760860800000-1a2b saved but stock deduction failed at line 1: ...",
///   "invoiceId": "5f0c..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Set when a commit left a persisted invoice behind, so the caller can
    /// offer stock repair for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Database operation failed
    DatabaseError,

    /// The database or ledger did not answer in time
    Unavailable,

    /// Business rule rejected the request
    BusinessLogic,

    /// Internal error
    Internal,

    /// Draft session operation failed
    DraftError,

    /// Insufficient stock
    InsufficientStock,

    /// Payment, waiver or status override rejected
    PaymentError,

    /// The invoice was saved but the commit did not finish
    PartialCommit,

    /// Configuration could not be loaded
    ConfigError,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            invoice_id: None,
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn draft(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::DraftError, message)
    }

    fn for_invoice(mut self, invoice_id: impl Into<String>) -> Self {
        self.invoice_id = Some(invoice_id.into());
        self
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            err @ DbError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            DbError::Conflict(reason) => ApiError::new(ErrorCode::PaymentError, reason),
            DbError::InvalidInput(reason) => ApiError::validation(reason),
            err @ DbError::Timeout { .. } => ApiError::new(ErrorCode::Unavailable, err.to_string()),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::Unavailable, "Database connection failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::Unavailable, "Database pool exhausted")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Serialization(e) => {
                tracing::error!("Stored payload unreadable: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Stored data could not be read")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::VariantNotFound(id) => ApiError::not_found("Variant", &id),
            CoreError::DraftSessionNotFound(key) => ApiError::not_found("Draft session", &key),
            err @ CoreError::VariantRequired { .. } => ApiError::validation(err.to_string()),
            err @ (CoreError::PaymentAmountInvalid { .. } | CoreError::ReasonRequired { .. }) => {
                ApiError::new(ErrorCode::PaymentError, err.to_string())
            }
            err @ CoreError::InvalidStatusTransition { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, err.to_string())
            }
            err @ (CoreError::LineOutOfRange { .. }
            | CoreError::NotCatalogLine { .. }
            | CoreError::LastDraftSession
            | CoreError::DraftTooLarge { .. }) => ApiError::draft(err.to_string()),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<CommitError> for ApiError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Validation(e) => ApiError::validation(e.to_string()),
            err @ CommitError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            err @ (CommitError::VariantRequired { .. }
            | CommitError::UnknownStockTarget { .. }) => ApiError::validation(err.to_string()),
            err @ CommitError::LedgerUnavailable(_) => {
                ApiError::new(ErrorCode::Unavailable, err.to_string())
            }
            CommitError::PersistenceFailure {
                invoice_id,
                header_written: false,
                source,
                ..
            } => {
                // Nothing landed, and the draft already passed validation
                tracing::error!(invoice_id = %invoice_id, error = %source, "Header write failed");
                let code = if source.is_unavailable() {
                    ErrorCode::Unavailable
                } else {
                    ErrorCode::DatabaseError
                };
                ApiError::new(code, "Invoice could not be saved")
            }
            err @ CommitError::PersistenceFailure { .. } => {
                let invoice_id = err.invoice_id().unwrap_or_default().to_string();
                ApiError::new(ErrorCode::PartialCommit, err.to_string()).for_invoice(invoice_id)
            }
            err @ CommitError::DeductionFailure { .. } => {
                let invoice_id = err.invoice_id().unwrap_or_default().to_string();
                ApiError::new(ErrorCode::PartialCommit, err.to_string()).for_invoice(invoice_id)
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_code_and_message() {
        let err = ApiError::not_found("Invoice", "inv-9");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Invoice not found: inv-9");
        assert!(json.get("invoiceId").is_none());
    }

    #[test]
    fn test_query_failures_are_not_leaked() {
        let err = ApiError::from(DbError::QueryFailed("near \"SELEC\": syntax error".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("SELEC"));
    }

    #[test]
    fn test_timeouts_are_unavailable() {
        let err = ApiError::from(DbError::timeout("deduct stock"));
        assert_eq!(err.code, ErrorCode::Unavailable);
    }

    #[test]
    fn test_reason_required_is_a_payment_error() {
        let err = ApiError::from(CoreError::ReasonRequired {
            invoice_id: "inv-1".into(),
            from: dukaan_core::PaymentStatus::Paid,
            to: dukaan_core::PaymentStatus::Unpaid,
        });
        assert_eq!(err.code, ErrorCode::PaymentError);
    }

    fn header_failure(source: DbError) -> CommitError {
        CommitError::PersistenceFailure {
            invoice_id: "inv-3".into(),
            invoice_number: "DK-1-abcd".into(),
            header_written: false,
            items_written: 0,
            items_expected: 2,
            source,
        }
    }

    #[test]
    fn test_unsaved_header_with_duplicate_number_is_a_database_error() {
        let err = ApiError::from(header_failure(DbError::UniqueViolation {
            field: "invoice_number".into(),
            value: "DK-1-abcd".into(),
        }));

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Invoice could not be saved");
        assert!(err.invoice_id.is_none());
    }

    #[test]
    fn test_unsaved_header_on_timeout_is_unavailable() {
        let err = ApiError::from(header_failure(DbError::timeout("insert invoice")));
        assert_eq!(err.code, ErrorCode::Unavailable);
        assert!(err.invoice_id.is_none());
    }

    #[test]
    fn test_deduction_failure_carries_invoice_id() {
        let err = ApiError::from(CommitError::DeductionFailure {
            invoice_id: "inv-7".into(),
            invoice_number: "DK-1-abcd".into(),
            line: 1,
            deducted_lines: vec![0],
            source: DbError::timeout("deduct stock"),
        });

        assert_eq!(err.code, ErrorCode::PartialCommit);
        assert_eq!(err.invoice_id.as_deref(), Some("inv-7"));
    }
}
