//! Error types for the am-client crate.
//!
//! This module provides the [`ApiError`] taxonomy for failed API calls and the
//! [`FieldIssue`] type describing backend validation failures.

use am_core::ValidationReport;
use serde::Deserialize;

/// Message shown when a 401 ends the session.
pub const SESSION_EXPIRED_MESSAGE: &str = "Сессия истекла. Пожалуйста, войдите снова";

const DEFAULT_MESSAGE: &str = "Произошла ошибка при выполнении запроса";

/// One field error reported by the backend's request validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldIssue {
    /// Location of the field, e.g. `["body", "email"]`.
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    /// Validation message.
    pub msg: String,
}

impl FieldIssue {
    /// Returns the location joined with dots.
    #[must_use]
    pub fn path(&self) -> String {
        self.loc
            .iter()
            .map(|part| match part {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path(), self.msg)
    }
}

/// Errors returned by API calls.
///
/// # Error Recovery Strategy
///
/// - **Network** and **Timeout**: no response arrived; retryable
/// - **Server** (5xx) and **RateLimited**: retryable after a delay
/// - **Unauthorized**: the session is over; the stored token is cleared
/// - **Forbidden**, **NotFound**, **Validation**, other 4xx: caller error; never retried
/// - **Cancelled**: a newer request superseded this one; not an error for the user
/// - **Decode**: the response did not match the expected shape
///
/// # Examples
///
/// ```
/// use am_client::ApiError;
///
/// let err = ApiError::from_response(404, br#"{"detail": "Asset not found"}"#);
/// assert_eq!(err.status(), Some(404));
/// assert_eq!(err.detail(), Some("Asset not found"));
/// assert!(err.is_client_error());
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The server could not be reached.
    #[error("no connection to the server: {0}")]
    Network(String),

    /// The request exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// HTTP 401: missing, invalid, or expired token.
    #[error("unauthorized: {}", detail.as_deref().unwrap_or("session expired"))]
    Unauthorized {
        /// Server-provided detail.
        detail: Option<String>,
    },

    /// HTTP 403: the role lacks the required permission.
    #[error("forbidden: {}", detail.as_deref().unwrap_or("insufficient permissions"))]
    Forbidden {
        /// Server-provided detail.
        detail: Option<String>,
    },

    /// HTTP 404.
    #[error("not found: {}", detail.as_deref().unwrap_or("resource not found"))]
    NotFound {
        /// Server-provided detail.
        detail: Option<String>,
    },

    /// HTTP 422, or a 400 carrying a plain detail.
    #[error("validation failed: {}", describe_validation(issues, detail.as_deref()))]
    Validation {
        /// Field errors, when the backend reported them.
        issues: Vec<FieldIssue>,
        /// Plain detail, when the backend sent a string instead.
        detail: Option<String>,
    },

    /// HTTP 429.
    #[error("too many requests")]
    RateLimited,

    /// HTTP 5xx.
    #[error("server error {status}: {}", detail.as_deref().unwrap_or("internal error"))]
    Server {
        /// Status code.
        status: u16,
        /// Server-provided detail.
        detail: Option<String>,
    },

    /// Any other non-success status.
    #[error("request failed with status {status}: {}", detail.as_deref().unwrap_or("no detail"))]
    Status {
        /// Status code.
        status: u16,
        /// Server-provided `detail` or `message`.
        detail: Option<String>,
    },

    /// The request was superseded or aborted.
    #[error("request cancelled")]
    Cancelled,

    /// The body could not be encoded or decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Writing a downloaded file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_validation(issues: &[FieldIssue], detail: Option<&str>) -> String {
    if issues.is_empty() {
        detail.unwrap_or("invalid data").to_owned()
    } else {
        issues.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Classifies a non-success response by status and body.
    ///
    /// The body is read as the backend's `{"detail": ...}` error shape; a
    /// `message` field is used when `detail` is absent.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();
        let (detail_value, message) = parsed.map_or((None, None), |b| (b.detail, b.message));

        let issues: Vec<FieldIssue> = detail_value
            .as_ref()
            .filter(|v| v.is_array())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        let detail = match detail_value {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => message,
        };

        match status {
            401 => Self::Unauthorized { detail },
            403 => Self::Forbidden { detail },
            404 => Self::NotFound { detail },
            422 => Self::Validation { issues, detail },
            429 => Self::RateLimited,
            500..=599 => Self::Server { status, detail },
            _ => Self::Status { status, detail },
        }
    }

    /// Creates a new [`ApiError::Network`] error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a new [`ApiError::Decode`] error.
    #[inline]
    pub fn decode(message: impl std::fmt::Display) -> Self {
        Self::Decode(message.to_string())
    }

    /// Returns the HTTP status, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Validation { .. } => Some(422),
            Self::RateLimited => Some(429),
            Self::Server { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Network(_) | Self::Timeout | Self::Cancelled | Self::Decode(_) | Self::Io(_) => None,
        }
    }

    /// Returns the server-provided detail, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { detail }
            | Self::Forbidden { detail }
            | Self::NotFound { detail }
            | Self::Validation { detail, .. }
            | Self::Server { detail, .. }
            | Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` for 4xx responses.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if repeating the request may succeed.
    ///
    /// Client errors are never retried; rate limiting is treated as a client error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout | Self::Server { .. } => true,
            Self::Status { status, .. } => !(400..500).contains(status),
            _ => false,
        }
    }

    /// Returns `true` if the request was superseded.
    #[inline]
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if the session must end.
    #[inline]
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns the localized message shown to the user.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_client::ApiError;
    ///
    /// let err = ApiError::from_response(
    ///     422,
    ///     br#"{"detail": [{"loc": ["body", "email"], "msg": "field required", "type": "missing"}]}"#,
    /// );
    /// assert_eq!(err.user_message(), "Ошибка валидации: body.email: field required");
    /// ```
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { .. } => SESSION_EXPIRED_MESSAGE.to_owned(),
            Self::Forbidden { .. } => "У вас нет прав для выполнения этого действия".to_owned(),
            Self::NotFound { .. } => "Запрашиваемый ресурс не найден".to_owned(),
            Self::RateLimited => "Слишком много запросов. Попробуйте позже".to_owned(),
            Self::Server { status: 500, .. } => "Внутренняя ошибка сервера. Попробуйте позже".to_owned(),
            Self::Timeout => "Превышено время ожидания запроса".to_owned(),
            Self::Network(_) => "Нет соединения с сервером".to_owned(),
            Self::Validation { issues, detail } => {
                if !issues.is_empty() {
                    let joined = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                    format!("Ошибка валидации: {joined}")
                } else {
                    detail.clone().unwrap_or_else(|| "Ошибка валидации данных".to_owned())
                }
            }
            Self::Server { detail, .. } | Self::Status { detail, .. } => {
                detail.clone().unwrap_or_else(|| DEFAULT_MESSAGE.to_owned())
            }
            Self::Cancelled | Self::Decode(_) | Self::Io(_) => "Произошла неожиданная ошибка".to_owned(),
        }
    }
}

impl From<ValidationReport> for ApiError {
    /// Converts failed client-side validation into the same shape the backend
    /// reports, with each field as a one-element location.
    fn from(report: ValidationReport) -> Self {
        let issues = report
            .errors()
            .iter()
            .map(|(field, msg)| FieldIssue { loc: vec![serde_json::Value::String(field.clone())], msg: msg.clone() })
            .collect();
        Self::Validation { issues, detail: None }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err)
    }
}
