//! Normalized result of a device call.

use serde::{Deserialize, Serialize};

use crate::automation::condition::parse_number;
use crate::error::SensorReadError;

/// What a device answered. Transport failures are folded into `ok = false`
/// so callers never handle a dispatch error separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub ok: bool,
    /// Raw response body; empty when nothing was received.
    pub body: String,
}

impl DispatchOutcome {
    #[must_use]
    pub fn succeeded(body: impl Into<String>) -> Self {
        Self {
            ok: true,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn failed(body: impl Into<String>) -> Self {
        Self {
            ok: false,
            body: body.into(),
        }
    }

    /// Interpret the outcome as a sensor reading.
    ///
    /// # Errors
    ///
    /// Returns [`SensorReadError::Unreachable`] when the call failed and
    /// [`SensorReadError::NotNumeric`] when the body is not a number.
    pub fn reading(&self) -> Result<f64, SensorReadError> {
        if !self.ok {
            return Err(SensorReadError::Unreachable {
                body: self.body.clone(),
            });
        }
        Ok(parse_number(&self.body)?)
    }
}
