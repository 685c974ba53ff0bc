use serde::Deserialize;
use std::fmt;

/// Application-level result classification attached to a response.
///
/// Wire numbering follows the coordinator's status enum. Codes this build does
/// not know about are kept verbatim in `Other` so they still render.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize)]
#[serde(try_from = "WireOutcomeCode")]
pub enum OutcomeCode {
    Unspecified,
    Ok,
    Timeout,
    Throttled,
    InvalidArgument,
    InvalidResponse,
    TemporaryError,
    PermanentError,
    IncompatibleState,
    DnsError,
    TcpError,
    TlsError,
    HttpError,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    Other(i32),
}

impl OutcomeCode {
    pub fn from_wire(value: i32) -> Self {
        match value {
            0 => Self::Unspecified,
            1 => Self::Ok,
            2 => Self::Timeout,
            3 => Self::Throttled,
            4 => Self::InvalidArgument,
            5 => Self::InvalidResponse,
            6 => Self::TemporaryError,
            7 => Self::PermanentError,
            8 => Self::IncompatibleState,
            9 => Self::DnsError,
            10 => Self::TcpError,
            11 => Self::TlsError,
            12 => Self::HttpError,
            13 => Self::Unauthenticated,
            14 => Self::PermissionDenied,
            15 => Self::NotFound,
            other => Self::Other(other),
        }
    }

    pub fn wire_value(self) -> i32 {
        match self {
            Self::Unspecified => 0,
            Self::Ok => 1,
            Self::Timeout => 2,
            Self::Throttled => 3,
            Self::InvalidArgument => 4,
            Self::InvalidResponse => 5,
            Self::TemporaryError => 6,
            Self::PermanentError => 7,
            Self::IncompatibleState => 8,
            Self::DnsError => 9,
            Self::TcpError => 10,
            Self::TlsError => 11,
            Self::HttpError => 12,
            Self::Unauthenticated => 13,
            Self::PermissionDenied => 14,
            Self::NotFound => 15,
            Self::Other(value) => value,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        let normalized = normalized.strip_prefix("status_").unwrap_or(&normalized);
        let code = match normalized {
            "unspecified" => Self::Unspecified,
            "ok" | "success" => Self::Ok,
            "timeout" => Self::Timeout,
            "throttled" => Self::Throttled,
            "invalid_argument" => Self::InvalidArgument,
            "invalid_response" => Self::InvalidResponse,
            "temporary_error" => Self::TemporaryError,
            "permanent_error" => Self::PermanentError,
            "incompatible_state" => Self::IncompatibleState,
            "dns_error" => Self::DnsError,
            "tcp_error" => Self::TcpError,
            "tls_error" => Self::TlsError,
            "http_error" => Self::HttpError,
            "unauthenticated" => Self::Unauthenticated,
            "permission_denied" => Self::PermissionDenied,
            "not_found" => Self::NotFound,
            _ => return None,
        };
        Some(code)
    }

    pub fn is_success(self) -> bool {
        self == Self::Ok
    }

    /// Whether an exit with this code ends the call. Non-terminal codes mean
    /// the coordinator is expected to retry.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            Self::Timeout
                | Self::Throttled
                | Self::TemporaryError
                | Self::IncompatibleState
                | Self::DnsError
                | Self::TcpError
                | Self::TlsError
                | Self::HttpError
        )
    }

    pub fn label(self) -> String {
        let label = match self {
            Self::Ok => "OK",
            Self::Timeout => "Timeout",
            Self::Throttled => "Throttled",
            Self::InvalidArgument => "Invalid argument",
            Self::InvalidResponse => "Invalid response",
            Self::TemporaryError => "Temporary error",
            Self::PermanentError => "Permanent error",
            Self::IncompatibleState => "Incompatible state",
            Self::DnsError => "DNS error",
            Self::TcpError => "TCP error",
            Self::TlsError => "TLS error",
            Self::HttpError => "HTTP error",
            Self::Unauthenticated => "Unauthenticated",
            Self::PermissionDenied => "Permission denied",
            Self::NotFound => "Not found",
            Self::Unspecified | Self::Other(_) => return self.wire_value().to_string(),
        };
        label.to_string()
    }
}

impl fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireOutcomeCode {
    Number(i32),
    Name(String),
}

impl TryFrom<WireOutcomeCode> for OutcomeCode {
    type Error = String;

    fn try_from(value: WireOutcomeCode) -> Result<Self, Self::Error> {
        match value {
            WireOutcomeCode::Number(number) => Ok(Self::from_wire(number)),
            WireOutcomeCode::Name(name) => {
                Self::from_name(&name).ok_or_else(|| format!("unknown outcome code: {name}"))
            }
        }
    }
}

/// Whether a transport failure with this HTTP-like status ends the call.
pub fn is_terminal_http_status(code: u16) -> bool {
    match code / 100 {
        4 => code != 408 && code != 429,
        5 => code == 501,
        _ => true,
    }
}
