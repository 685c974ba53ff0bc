use crate::domain::OutcomeCode;
use serde::Deserialize;
use std::fmt;
use std::time::SystemTime;

/// Opaque identifier of one function-call execution.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize)]
#[serde(transparent)]
pub struct DispatchId(String);

impl DispatchId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DispatchId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DispatchId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A request received from the coordinator, about to be forwarded locally.
///
/// An empty `parent_id` means the call has no parent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestEvent {
    pub root_id: DispatchId,
    pub parent_id: DispatchId,
    pub id: DispatchId,
    pub function: String,
    pub creation_time: Option<SystemTime>,
    pub expiration_time: Option<SystemTime>,
}

impl RequestEvent {
    pub fn root(id: impl Into<DispatchId>, function: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            root_id: id.clone(),
            parent_id: DispatchId::default(),
            id,
            function: function.into(),
            creation_time: None,
            expiration_time: None,
        }
    }

    pub fn child(
        root_id: impl Into<DispatchId>,
        parent_id: impl Into<DispatchId>,
        id: impl Into<DispatchId>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            root_id: root_id.into(),
            parent_id: parent_id.into(),
            id: id.into(),
            function: function.into(),
            creation_time: None,
            expiration_time: None,
        }
    }

    pub fn with_creation_time(mut self, at: SystemTime) -> Self {
        self.creation_time = Some(at);
        self
    }

    pub fn with_expiration_time(mut self, at: SystemTime) -> Self {
        self.expiration_time = Some(at);
        self
    }
}

/// What came back for a previously observed request.
///
/// `outcome` is set when the local application produced a structured
/// response. Otherwise `status_code` carries a transport failure, and `error`
/// a failure with no response at all.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResponseEvent {
    pub id: DispatchId,
    pub error: Option<String>,
    pub status_code: Option<u16>,
    pub outcome: Option<Outcome>,
}

impl ResponseEvent {
    pub fn outcome(id: impl Into<DispatchId>, outcome: Outcome) -> Self {
        Self {
            id: id.into(),
            error: None,
            status_code: None,
            outcome: Some(outcome),
        }
    }

    pub fn http_status(id: impl Into<DispatchId>, status_code: u16) -> Self {
        Self {
            id: id.into(),
            error: None,
            status_code: Some(status_code),
            outcome: None,
        }
    }

    pub fn failed(id: impl Into<DispatchId>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: Some(error.into()),
            status_code: None,
            outcome: None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct Outcome {
    pub code: OutcomeCode,
    pub directive: Directive,
}

impl Outcome {
    pub fn exit(code: OutcomeCode) -> Self {
        Self {
            code,
            directive: Directive::Exit(ExitDirective::default()),
        }
    }

    pub fn poll(code: OutcomeCode) -> Self {
        Self {
            code,
            directive: Directive::Poll,
        }
    }

    pub fn tail_call(code: OutcomeCode, function: impl Into<String>) -> Self {
        Self {
            code,
            directive: Directive::Exit(ExitDirective {
                tail_call: Some(function.into()),
                error: None,
            }),
        }
    }

    pub fn exit_with_error(code: OutcomeCode, error: ErrorPayload) -> Self {
        Self {
            code,
            directive: Directive::Exit(ExitDirective {
                tail_call: None,
                error: Some(error),
            }),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    Exit(ExitDirective),
    Poll,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct ExitDirective {
    #[serde(default)]
    pub tail_call: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorPayload {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// `type` alone, or `type: message`. `None` when the payload has no type.
    pub fn describe(&self) -> Option<String> {
        if self.kind.is_empty() {
            return None;
        }
        if self.message.is_empty() {
            Some(self.kind.clone())
        } else {
            Some(format!("{}: {}", self.kind, self.message))
        }
    }
}
