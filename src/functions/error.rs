use std::fmt::{Display, Formatter};

use serde_json::Value as JsonValue;

use crate::app::AppError;
use crate::functions::serializer::decode;
use crate::functions::value::CallableValue;
use crate::functions::LOGGER;

/// Canonical status codes understood by the callable protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunctionsErrorCode {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl FunctionsErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionsErrorCode::Ok => "functions/ok",
            FunctionsErrorCode::Cancelled => "functions/cancelled",
            FunctionsErrorCode::Unknown => "functions/unknown",
            FunctionsErrorCode::InvalidArgument => "functions/invalid-argument",
            FunctionsErrorCode::DeadlineExceeded => "functions/deadline-exceeded",
            FunctionsErrorCode::NotFound => "functions/not-found",
            FunctionsErrorCode::AlreadyExists => "functions/already-exists",
            FunctionsErrorCode::PermissionDenied => "functions/permission-denied",
            FunctionsErrorCode::ResourceExhausted => "functions/resource-exhausted",
            FunctionsErrorCode::FailedPrecondition => "functions/failed-precondition",
            FunctionsErrorCode::Aborted => "functions/aborted",
            FunctionsErrorCode::OutOfRange => "functions/out-of-range",
            FunctionsErrorCode::Unimplemented => "functions/unimplemented",
            FunctionsErrorCode::Internal => "functions/internal",
            FunctionsErrorCode::Unavailable => "functions/unavailable",
            FunctionsErrorCode::DataLoss => "functions/data-loss",
            FunctionsErrorCode::Unauthenticated => "functions/unauthenticated",
        }
    }

    /// Parses the upper-case canonical name used in `error.status` response fields.
    pub fn from_status_name(status: &str) -> Option<Self> {
        let code = match status {
            "OK" => FunctionsErrorCode::Ok,
            "CANCELLED" => FunctionsErrorCode::Cancelled,
            "UNKNOWN" => FunctionsErrorCode::Unknown,
            "INVALID_ARGUMENT" => FunctionsErrorCode::InvalidArgument,
            "DEADLINE_EXCEEDED" => FunctionsErrorCode::DeadlineExceeded,
            "NOT_FOUND" => FunctionsErrorCode::NotFound,
            "ALREADY_EXISTS" => FunctionsErrorCode::AlreadyExists,
            "PERMISSION_DENIED" => FunctionsErrorCode::PermissionDenied,
            "RESOURCE_EXHAUSTED" => FunctionsErrorCode::ResourceExhausted,
            "FAILED_PRECONDITION" => FunctionsErrorCode::FailedPrecondition,
            "ABORTED" => FunctionsErrorCode::Aborted,
            "OUT_OF_RANGE" => FunctionsErrorCode::OutOfRange,
            "UNIMPLEMENTED" => FunctionsErrorCode::Unimplemented,
            "INTERNAL" => FunctionsErrorCode::Internal,
            "UNAVAILABLE" => FunctionsErrorCode::Unavailable,
            "DATA_LOSS" => FunctionsErrorCode::DataLoss,
            "UNAUTHENTICATED" => FunctionsErrorCode::Unauthenticated,
            _ => return None,
        };
        Some(code)
    }

    /// Maps an HTTP status to the code the callable backend uses for it.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            200..=299 => FunctionsErrorCode::Ok,
            400 => FunctionsErrorCode::InvalidArgument,
            401 => FunctionsErrorCode::Unauthenticated,
            403 => FunctionsErrorCode::PermissionDenied,
            404 => FunctionsErrorCode::NotFound,
            409 => FunctionsErrorCode::Aborted,
            429 => FunctionsErrorCode::ResourceExhausted,
            499 => FunctionsErrorCode::Cancelled,
            500 => FunctionsErrorCode::Internal,
            501 => FunctionsErrorCode::Unimplemented,
            503 => FunctionsErrorCode::Unavailable,
            504 => FunctionsErrorCode::DeadlineExceeded,
            _ => FunctionsErrorCode::Unknown,
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            FunctionsErrorCode::Ok => "OK",
            FunctionsErrorCode::Cancelled => "CANCELLED",
            FunctionsErrorCode::Unknown => "UNKNOWN",
            FunctionsErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            FunctionsErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            FunctionsErrorCode::NotFound => "NOT_FOUND",
            FunctionsErrorCode::AlreadyExists => "ALREADY_EXISTS",
            FunctionsErrorCode::PermissionDenied => "PERMISSION_DENIED",
            FunctionsErrorCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            FunctionsErrorCode::FailedPrecondition => "FAILED_PRECONDITION",
            FunctionsErrorCode::Aborted => "ABORTED",
            FunctionsErrorCode::OutOfRange => "OUT_OF_RANGE",
            FunctionsErrorCode::Unimplemented => "UNIMPLEMENTED",
            FunctionsErrorCode::Internal => "INTERNAL",
            FunctionsErrorCode::Unavailable => "UNAVAILABLE",
            FunctionsErrorCode::DataLoss => "DATA_LOSS",
            FunctionsErrorCode::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

/// Failure of a callable invocation or of client setup.
#[derive(Clone, Debug, PartialEq)]
pub enum FunctionsError {
    /// The client is not attached to an initialized app, or the app lacks required options.
    Configuration { message: String },
    /// The caller supplied something that cannot be sent (empty name, non-finite number...).
    InvalidArgument { message: String },
    /// The request never produced an HTTP response.
    Network {
        code: FunctionsErrorCode,
        message: String,
    },
    /// The backend answered with an error status or error body.
    Server {
        code: FunctionsErrorCode,
        message: String,
        details: Option<CallableValue>,
    },
    /// The response could not be decoded into the expected shape.
    Decoding { message: String },
    /// The invocation was cancelled before it completed.
    Cancelled { message: String },
}

impl FunctionsError {
    pub fn code(&self) -> FunctionsErrorCode {
        match self {
            FunctionsError::Configuration { .. } => FunctionsErrorCode::FailedPrecondition,
            FunctionsError::InvalidArgument { .. } => FunctionsErrorCode::InvalidArgument,
            FunctionsError::Network { code, .. } | FunctionsError::Server { code, .. } => *code,
            FunctionsError::Decoding { .. } => FunctionsErrorCode::Internal,
            FunctionsError::Cancelled { .. } => FunctionsErrorCode::Cancelled,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    pub fn message(&self) -> &str {
        match self {
            FunctionsError::Configuration { message }
            | FunctionsError::InvalidArgument { message }
            | FunctionsError::Network { message, .. }
            | FunctionsError::Server { message, .. }
            | FunctionsError::Decoding { message }
            | FunctionsError::Cancelled { message } => message,
        }
    }

    /// Structured details attached by the backend to a server error.
    pub fn details(&self) -> Option<&CallableValue> {
        match self {
            FunctionsError::Server { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

impl Display for FunctionsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.code_str())
    }
}

impl std::error::Error for FunctionsError {}

impl From<AppError> for FunctionsError {
    fn from(err: AppError) -> Self {
        configuration_error(err.to_string())
    }
}

pub type FunctionsResult<T> = Result<T, FunctionsError>;

pub fn configuration_error(message: impl Into<String>) -> FunctionsError {
    FunctionsError::Configuration {
        message: message.into(),
    }
}

pub fn invalid_argument(message: impl Into<String>) -> FunctionsError {
    FunctionsError::InvalidArgument {
        message: message.into(),
    }
}

pub fn network_error(code: FunctionsErrorCode, message: impl Into<String>) -> FunctionsError {
    FunctionsError::Network {
        code,
        message: message.into(),
    }
}

pub fn decoding_error(message: impl Into<String>) -> FunctionsError {
    FunctionsError::Decoding {
        message: message.into(),
    }
}

pub fn cancelled(message: impl Into<String>) -> FunctionsError {
    FunctionsError::Cancelled {
        message: message.into(),
    }
}

/// Builds the error described by an HTTP response, or `None` when the exchange succeeded.
///
/// The status code picks the initial error code. A JSON body of the form
/// `{"error": {"status", "message", "details"}}` refines it: a known `status` name overrides the
/// code, an unknown one yields `internal`.
pub fn error_for_http_response(status: u16, body: Option<&JsonValue>) -> Option<FunctionsError> {
    let mut code = FunctionsErrorCode::from_http_status(status);
    let mut description = code.default_message().to_string();
    let mut details = None;

    if let Some(error) = body.and_then(|body| body.get("error")) {
        if let Some(JsonValue::String(name)) = error.get("status") {
            match FunctionsErrorCode::from_status_name(name) {
                Some(parsed) => {
                    code = parsed;
                    description = name.clone();
                }
                None => {
                    return Some(FunctionsError::Server {
                        code: FunctionsErrorCode::Internal,
                        message: "INTERNAL".to_string(),
                        details: None,
                    });
                }
            }
        }

        if let Some(JsonValue::String(message)) = error.get("message") {
            description = message.clone();
        }

        if let Some(raw) = error.get("details") {
            details = match decode(raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    LOGGER.debug(format!("Discarding undecodable error details: {err}"));
                    None
                }
            };
        }
    }

    if code == FunctionsErrorCode::Ok {
        return None;
    }

    Some(FunctionsError::Server {
        code,
        message: description,
        details,
    })
}
