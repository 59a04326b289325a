use std::fmt;

/// One normalized event from a streaming backend run.
///
/// Every run emits exactly one `Started`, zero or more `Delta`s in wire
/// arrival order, and exactly one terminal event. HTTP error statuses
/// terminate through `Completed` carrying the error body so callers can
/// render it; transport failures and cancellation terminate through
/// `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Started {
        backend: String,
        model: String,
        temperature: f64,
    },
    Delta {
        text: String,
    },
    Completed {
        status: u16,
        body: String,
    },
    Failed {
        reason: FailureReason,
    },
}

impl StreamEvent {
    /// Returns true when this event terminates the run lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Classification for a `Failed` terminal event.
///
/// `Cancelled` is reserved for caller-initiated aborts so callers can
/// silently ignore it while still surfacing genuine failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Cancelled,
    Transport(String),
    Protocol(String),
}

impl FailureReason {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled by caller"),
            Self::Transport(message) => write!(f, "transport failure: {message}"),
            Self::Protocol(message) => write!(f, "protocol failure: {message}"),
        }
    }
}

/// Serial event sink for one run; invoked from a single task.
pub type EventHandler = Box<dyn FnMut(StreamEvent) + Send + 'static>;
