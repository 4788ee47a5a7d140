//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`SmartHomeError`] via `#[from]`. Adapters box their own error types
//! into [`SmartHomeError::Storage`].

/// Top-level error returned by services and repository ports.
#[derive(Debug, thiserror::Error)]
pub enum SmartHomeError {
    /// A domain invariant was violated by the caller's input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// A sensor could not produce a numeric reading.
    #[error(transparent)]
    SensorRead(#[from] SensorReadError),

    /// The persistence layer failed.
    #[error("storage error: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

/// Rejected input, detected when a record is created or edited.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("action path must not be empty")]
    EmptyPath,

    #[error("controller address must not be empty")]
    EmptyAddress,

    #[error("an action cannot be its own opposite")]
    SelfOpposite,

    #[error("minute must be within 0..=59, got {0}")]
    InvalidMinute(u8),

    #[error("hour must be within 0..=23, got {0}")]
    InvalidHour(u8),

    #[error("weekday must be within 0..=6 (0 is Monday), got {0}")]
    InvalidWeekday(u8),

    #[error("month day must be within 1..=31, got {0}")]
    InvalidMonthDay(u8),

    #[error("{field} is required for a {kind} schedule")]
    MissingScheduleField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("{field} is not allowed on a {kind} schedule")]
    UnexpectedScheduleField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("schedule {0:?} never fires")]
    InvalidSchedule(String),

    #[error("delay must be within 1..={max} minutes, got {0}", max = crate::task::MAX_DELAY_MINUTES)]
    InvalidDelay(u32),

    #[error("condition threshold must be a finite number")]
    NonFiniteThreshold,

    #[error("operator {0} cannot compare boolean values")]
    OperatorNotSupported(String),

    #[error("node {0} is not part of the automation graph")]
    UnknownNode(String),

    #[error("a node for {0} already exists in the automation graph")]
    DuplicateNode(String),

    #[error("controller {controller} does not expose action {action}")]
    ActionNotExposed { controller: String, action: String },

    #[error("action {0} has no opposite action")]
    NoOppositeAction(String),

    #[error("sensor {0} cannot be scheduled with an opposite action")]
    SensorHasNoOpposite(String),
}

/// A lookup by id found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A device response body did not match the expected value kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected \"true\" or \"false\", got {0:?}")]
    NotBoolean(String),

    #[error("expected a decimal number, got {0:?}")]
    NotNumber(String),
}

/// A sensor read did not yield a numeric value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorReadError {
    /// The device call failed or returned a non-success status.
    #[error("sensor did not answer successfully")]
    Unreachable { body: String },

    /// The device answered with something that is not a number.
    #[error("sensor returned a non-numeric value")]
    NotNumeric(#[from] ParseError),
}
