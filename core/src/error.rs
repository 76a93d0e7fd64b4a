//! Error taxonomy for the batch engine.
//!
//! # Design
//! Only transport-level failures become errors. A `404` or `500` is an
//! ordinary `HttpResponse`. Transport failures are split into `Network`
//! (the peer could not be reached in time: timeout, DNS, refused connection,
//! TLS) and `Client` (everything else the transport reports), so callers can
//! retry the former and give up on the latter. `Response` covers raw bytes
//! that cannot be decoded into a response.

use std::fmt;

/// Failure code reported by a transport for one job.
///
/// Numbering follows the conventional libcurl codes so that logs line up with
/// what operators already know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorCode {
    UnsupportedProtocol,
    FailedInit,
    UrlMalformat,
    CouldntResolveHost,
    CouldntConnect,
    WeirdServerReply,
    OperationTimedOut,
    SslConnectError,
    BadFunctionArgument,
    TooManyRedirects,
    GotNothing,
    SendError,
    RecvError,
    Other(u32),
}

impl TransportErrorCode {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::UnsupportedProtocol,
            2 => Self::FailedInit,
            3 => Self::UrlMalformat,
            6 => Self::CouldntResolveHost,
            7 => Self::CouldntConnect,
            8 => Self::WeirdServerReply,
            28 => Self::OperationTimedOut,
            35 => Self::SslConnectError,
            43 => Self::BadFunctionArgument,
            47 => Self::TooManyRedirects,
            52 => Self::GotNothing,
            55 => Self::SendError,
            56 => Self::RecvError,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::UnsupportedProtocol => 1,
            Self::FailedInit => 2,
            Self::UrlMalformat => 3,
            Self::CouldntResolveHost => 6,
            Self::CouldntConnect => 7,
            Self::WeirdServerReply => 8,
            Self::OperationTimedOut => 28,
            Self::SslConnectError => 35,
            Self::BadFunctionArgument => 43,
            Self::TooManyRedirects => 47,
            Self::GotNothing => 52,
            Self::SendError => 55,
            Self::RecvError => 56,
            Self::Other(code) => *code,
        }
    }
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Which connectivity problem a `Network` error represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    Timeout,
    Resolve,
    Connect,
    Tls,
}

/// Coarse error class, as decided by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Client,
    Network(NetworkFailure),
    Response,
}

/// Map a transport failure code onto the error taxonomy.
///
/// A timeout is always `Network(Timeout)` and never folds into another class.
pub fn classify(code: TransportErrorCode) -> ErrorKind {
    match code {
        TransportErrorCode::OperationTimedOut => ErrorKind::Network(NetworkFailure::Timeout),
        TransportErrorCode::CouldntResolveHost => ErrorKind::Network(NetworkFailure::Resolve),
        TransportErrorCode::CouldntConnect => ErrorKind::Network(NetworkFailure::Connect),
        TransportErrorCode::SslConnectError => ErrorKind::Network(NetworkFailure::Tls),
        _ => ErrorKind::Client,
    }
}

/// Errors raised by `send`, `send_many` and `send_all`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Transport failure that is not a connectivity problem.
    #[error("client error (code {code}): {message}")]
    Client {
        code: TransportErrorCode,
        message: String,
    },

    /// Timeout, DNS, refused connection or TLS failure.
    #[error("network error (code {code}): {message}")]
    Network {
        failure: NetworkFailure,
        code: TransportErrorCode,
        message: String,
    },

    /// Raw response bytes could not be decoded.
    #[error("malformed response: {0}")]
    Response(String),
}

impl Error {
    /// Build the classified error for a failed transport job.
    pub fn from_transport(code: TransportErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match classify(code) {
            ErrorKind::Network(failure) => Error::Network {
                failure,
                code,
                message,
            },
            ErrorKind::Client | ErrorKind::Response => Error::Client { code, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Client { .. } => ErrorKind::Client,
            Error::Network { failure, .. } => ErrorKind::Network(*failure),
            Error::Response(_) => ErrorKind::Response,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Network {
                failure: NetworkFailure::Timeout,
                ..
            }
        )
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. })
    }

    /// Transport code behind the error, if it came from the transport.
    pub fn code(&self) -> Option<TransportErrorCode> {
        match self {
            Error::Client { code, .. } | Error::Network { code, .. } => Some(*code),
            Error::Response(_) => None,
        }
    }
}
