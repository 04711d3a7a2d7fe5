//! Provider error taxonomy.
//!
//! Every adapter maps its backend's native failures into [`ProviderError`].
//! Classification uses the HTTP status, the structured fields of the error
//! body (`error.type`, `error.code`, `error.status`, `error.details[].reason`)
//! and reqwest's transport flags. Message text is kept for logs only and
//! never appears in `Display`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kinds of provider failure. Only these drive failover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Too many requests.
    RateLimited,
    /// Billing quota or credits exhausted.
    QuotaExhausted,
    /// Credential missing, invalid or revoked.
    InvalidCredential,
    /// Credential valid but not allowed to use the resource.
    Unauthorized,
    /// The request did not complete in time.
    Timeout,
    /// Backend down, overloaded or unreachable.
    Unavailable,
}

impl FailureKind {
    /// Short label for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::RateLimited => "rate limited",
            FailureKind::QuotaExhausted => "quota exhausted",
            FailureKind::InvalidCredential => "invalid credential",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Timeout => "timeout",
            FailureKind::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by embedding and generation adapters.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// A provider failure, eligible for failover.
    #[error("Provider failure: {kind}")]
    Failure {
        /// Classified failure.
        kind: FailureKind,
        /// HTTP status, when the backend answered.
        status: Option<u16>,
        /// Backend message, for logs.
        detail: String,
    },

    /// The backend rejected the request itself. Retrying elsewhere would not
    /// help.
    #[error("Request rejected by provider")]
    InvalidRequest {
        /// HTTP status, when the backend answered.
        status: Option<u16>,
        /// Backend message, for logs.
        detail: String,
    },

    /// The backend answered with a body we could not interpret.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Build a provider failure without an HTTP status.
    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        ProviderError::Failure {
            kind,
            status: None,
            detail: detail.into(),
        }
    }

    /// Build a request rejection without an HTTP status.
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        ProviderError::InvalidRequest {
            status: None,
            detail: detail.into(),
        }
    }

    /// Whether this error is a provider failure and may trigger failover.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, ProviderError::Failure { .. })
    }

    /// Classified kind of a provider failure.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ProviderError::Failure { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Backend-supplied detail, for logging.
    pub fn detail(&self) -> &str {
        match self {
            ProviderError::Failure { detail, .. } | ProviderError::InvalidRequest { detail, .. } => {
                detail
            }
            ProviderError::MalformedResponse(msg) => msg,
        }
    }

    /// Classify a non-success HTTP response.
    pub fn from_http(status: u16, body: &str) -> Self {
        let signal = ErrorSignal::parse(body);
        let detail = signal.message.clone().unwrap_or_else(|| body.to_string());

        let kind = signal.kind().or(match status {
            429 => Some(FailureKind::RateLimited),
            402 => Some(FailureKind::QuotaExhausted),
            401 => Some(FailureKind::InvalidCredential),
            403 => Some(FailureKind::Unauthorized),
            408 | 504 => Some(FailureKind::Timeout),
            404 | 500..=599 => Some(FailureKind::Unavailable),
            _ => None,
        });

        match kind {
            Some(kind) => ProviderError::Failure {
                kind,
                status: Some(status),
                detail,
            },
            None => ProviderError::InvalidRequest {
                status: Some(status),
                detail,
            },
        }
    }

    /// Classify a transport error.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let detail = err.to_string();
        if err.is_timeout() {
            ProviderError::failure(FailureKind::Timeout, detail)
        } else if err.is_decode() {
            ProviderError::MalformedResponse(detail)
        } else if err.is_builder() {
            ProviderError::invalid_request(detail)
        } else {
            ProviderError::failure(FailureKind::Unavailable, detail)
        }
    }
}

/// Structured fields found in a backend error body.
///
/// Covers the OpenAI (`error.type`, `error.code`), Anthropic (`error.type`),
/// Gemini (`error.status`, `error.details[].reason`) and Ollama (`error` as
/// string) shapes.
#[derive(Debug, Default)]
struct ErrorSignal {
    codes: Vec<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Structured {
        #[serde(rename = "type")]
        error_type: Option<String>,
        code: Option<serde_json::Value>,
        status: Option<String>,
        message: Option<String>,
        #[serde(default)]
        details: Vec<ErrorDetail>,
    },
    Plain(String),
}

#[derive(Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

impl ErrorSignal {
    fn parse(body: &str) -> Self {
        let Ok(ErrorEnvelope { error: Some(error) }) = serde_json::from_str::<ErrorEnvelope>(body) else {
            return Self::default();
        };

        match error {
            ErrorBody::Plain(message) => Self {
                codes: Vec::new(),
                message: Some(message),
            },
            ErrorBody::Structured {
                error_type,
                code,
                status,
                message,
                details,
            } => {
                let mut codes: Vec<String> = Vec::new();
                codes.extend(error_type);
                if let Some(serde_json::Value::String(code)) = code {
                    codes.push(code);
                }
                codes.extend(status);
                codes.extend(details.into_iter().filter_map(|d| d.reason));
                Self { codes, message }
            }
        }
    }

    fn has(&self, candidates: &[&str]) -> bool {
        self.codes
            .iter()
            .any(|c| candidates.iter().any(|k| c.eq_ignore_ascii_case(k)))
    }

    /// Kind implied by the structured codes, strongest signal first.
    fn kind(&self) -> Option<FailureKind> {
        if self.has(&["insufficient_quota", "billing_hard_limit_reached", "quota_exceeded"]) {
            Some(FailureKind::QuotaExhausted)
        } else if self.has(&[
            "invalid_api_key",
            "authentication_error",
            "UNAUTHENTICATED",
            "API_KEY_INVALID",
        ]) {
            Some(FailureKind::InvalidCredential)
        } else if self.has(&["permission_error", "PERMISSION_DENIED"]) {
            Some(FailureKind::Unauthorized)
        } else if self.has(&["rate_limit_error", "rate_limit_exceeded", "RESOURCE_EXHAUSTED"]) {
            Some(FailureKind::RateLimited)
        } else if self.has(&["DEADLINE_EXCEEDED"]) {
            Some(FailureKind::Timeout)
        } else if self.has(&["overloaded_error", "api_error", "server_error", "UNAVAILABLE", "INTERNAL"]) {
            Some(FailureKind::Unavailable)
        } else {
            None
        }
    }
}
