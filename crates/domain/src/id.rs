//! Typed identifier newtypes backed by UUIDs.
//!
//! Graph nodes and edges reference each other through these ids only, so
//! cyclic automation graphs never form reference cycles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for an [`Action`](crate::action::Action).
    ActionId
);

define_id!(
    /// Unique identifier for a [`Controller`](crate::controller::Controller).
    ControllerId
);

define_id!(
    /// Unique identifier for an [`AutomationGraph`](crate::automation::AutomationGraph).
    AutomationId
);

define_id!(
    /// Unique identifier for an [`AutomationNode`](crate::automation::AutomationNode).
    NodeId
);

define_id!(
    /// Unique identifier for an [`AutomationEdge`](crate::automation::AutomationEdge).
    EdgeId
);

define_id!(
    /// Unique identifier for a [`RecurringTask`](crate::task::RecurringTask).
    RecurringTaskId
);

define_id!(
    /// Unique identifier for a [`DelayedTask`](crate::task::DelayedTask).
    DelayedTaskId
);

define_id!(
    /// Opaque handle of a job registered with the scheduler.
    JobId
);
