//! Application error type shared by every layer.
//!
//! Each variant maps to one HTTP status and a stable machine-readable code
//! in the JSON body:
//!
//! ```json
//! { "error": { "code": "duplicate_code", "message": "...", "details": {} } }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

/// Name of the unique constraint guarding `links.short_name`.
pub const SHORT_NAME_CONSTRAINT: &str = "links_short_name_key";

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Serializable error payload.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad input shape, rejected field by field.
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// The chosen or generated short name is already issued.
    #[error("Short name '{code}' is already taken")]
    DuplicateCode { code: String },

    /// Every generation attempt collided with an existing short name.
    #[error("Failed to allocate a unique short code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    /// The acting user may not touch this resource.
    #[error("{message}")]
    Forbidden { message: String, details: Value },

    #[error("{message}")]
    Conflict { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    pub fn forbidden(message: impl Into<String>, details: Value) -> Self {
        Self::Forbidden {
            message: message.into(),
            details,
        }
    }

    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    pub fn duplicate_code(code: impl Into<String>) -> Self {
        Self::DuplicateCode { code: code.into() }
    }

    /// True for failures worth retrying (storage hiccups), false for
    /// anything caused by the input itself.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Internal { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::DuplicateCode { .. } | AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::CodeSpaceExhausted { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        let message = self.to_string();
        match self {
            AppError::Validation { details, .. } => ErrorInfo {
                code: "validation_error",
                message,
                details: details.clone(),
            },
            AppError::DuplicateCode { code } => ErrorInfo {
                code: "duplicate_code",
                message,
                details: json!({ "short_name": code }),
            },
            AppError::CodeSpaceExhausted { attempts } => ErrorInfo {
                code: "code_space_exhausted",
                message,
                details: json!({ "attempts": attempts }),
            },
            AppError::NotFound { details, .. } => ErrorInfo {
                code: "not_found",
                message,
                details: details.clone(),
            },
            AppError::Forbidden { details, .. } => ErrorInfo {
                code: "forbidden",
                message,
                details: details.clone(),
            },
            AppError::Conflict { details, .. } => ErrorInfo {
                code: "conflict",
                message,
                details: details.clone(),
            },
            AppError::Internal { details, .. } => ErrorInfo {
                code: "internal_error",
                message,
                details: details.clone(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            );
        }

        if matches!(e, sqlx::Error::RowNotFound) {
            return AppError::not_found("Record not found", json!({}));
        }

        tracing::error!("Database error: {}", e);
        AppError::internal("Database error", json!({}))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::internal("Migration failed", json!({ "reason": e.to_string() }))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: serde_json::Map<String, Value> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), json!(messages))
            })
            .collect();

        AppError::bad_request("Validation failed", json!({ "fields": fields }))
    }
}

/// Maps a failed `INSERT INTO links` to the link-store taxonomy.
///
/// A unique violation on the short-name constraint becomes
/// [`AppError::DuplicateCode`]; everything else goes through `From`.
pub fn map_link_insert_error(e: sqlx::Error, short_name: &str) -> AppError {
    if let Some(db) = e.as_database_error()
        && db.is_unique_violation()
        && db.constraint() == Some(SHORT_NAME_CONSTRAINT)
    {
        return AppError::duplicate_code(short_name);
    }

    AppError::from(e)
}
