//! Condition: the guard on an automation edge.
//!
//! Evaluation is pure: it parses the body returned by the edge's source
//! action and compares it against a configured threshold.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, SmartHomeError, ValidationError};

/// Parse a device body as a boolean.
///
/// Accepts `"true"` or `"false"` in any letter case. Surrounding whitespace
/// is *not* tolerated.
///
/// # Errors
///
/// Returns [`ParseError::NotBoolean`] for any other input.
pub fn parse_bool(raw: &str) -> Result<bool, ParseError> {
    if raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ParseError::NotBoolean(raw.to_string()))
    }
}

/// Parse a device body as a decimal number. Surrounding whitespace is
/// ignored since devices commonly terminate their answer with a newline.
///
/// # Errors
///
/// Returns [`ParseError::NotNumber`] when the body is not a decimal.
pub fn parse_number(raw: &str) -> Result<f64, ParseError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ParseError::NotNumber(raw.to_string()))
}

/// Comparison operator of a value condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl Operator {
    /// Apply the operator as `a <op> b` with IEEE-754 semantics.
    ///
    /// Equality is exact: `0.1 + 0.2 == 0.3` is `false`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn compare(self, a: f64, b: f64) -> bool {
        match self {
            Self::Greater => a > b,
            Self::Less => a < b,
            Self::LessOrEqual => a <= b,
            Self::GreaterOrEqual => a >= b,
            Self::Equal => a == b,
            Self::NotEqual => a != b,
        }
    }

    /// Whether the operator only tests (in)equality.
    #[must_use]
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Equal | Self::NotEqual)
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Configured right-hand side of a value condition. The variant also
/// decides how the source body is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Threshold {
    Boolean(bool),
    Number(f64),
}

/// Guard on an automation edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Always propagate once the source action succeeded.
    ByTrigger,
    /// Propagate when `<source body> <operator> <threshold>` holds.
    ByValue {
        operator: Operator,
        threshold: Threshold,
        /// Re-poll the source action until the comparison holds.
        #[serde(rename = "loop", default)]
        looping: bool,
    },
}

/// What the runner does with an edge after evaluating its condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Invoke the target action.
    Advance,
    /// Wait, re-invoke the source action and evaluate again.
    Repoll,
    /// Abandon this branch.
    Stop,
}

impl Condition {
    /// Reject combinations that cannot be evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] when:
    /// - a number threshold is NaN or infinite ([`ValidationError::NonFiniteThreshold`])
    /// - a boolean threshold is paired with an ordering operator
    ///   ([`ValidationError::OperatorNotSupported`])
    pub fn validate(&self) -> Result<(), SmartHomeError> {
        match self {
            Self::ByTrigger => Ok(()),
            Self::ByValue {
                threshold: Threshold::Number(value),
                ..
            } if !value.is_finite() => Err(ValidationError::NonFiniteThreshold.into()),
            Self::ByValue {
                operator,
                threshold: Threshold::Boolean(_),
                ..
            } if !operator.is_equality() => {
                Err(ValidationError::OperatorNotSupported(operator.to_string()).into())
            }
            Self::ByValue { .. } => Ok(()),
        }
    }

    /// Decide what to do with the body returned by the edge's source action.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the body does not match the threshold kind.
    pub fn evaluate(&self, previous_body: &str) -> Result<Verdict, ParseError> {
        let Self::ByValue {
            operator,
            threshold,
            looping,
        } = self
        else {
            return Ok(Verdict::Advance);
        };

        let holds = match threshold {
            Threshold::Number(expected) => operator.compare(parse_number(previous_body)?, *expected),
            Threshold::Boolean(expected) => {
                let actual = parse_bool(previous_body)?;
                operator.compare(f64::from(u8::from(actual)), f64::from(u8::from(*expected)))
            }
        };

        Ok(if holds {
            Verdict::Advance
        } else if *looping {
            Verdict::Repoll
        } else {
            Verdict::Stop
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByTrigger => f.write_str("by_trigger"),
            Self::ByValue {
                operator,
                threshold,
                looping,
            } => {
                match threshold {
                    Threshold::Boolean(value) => write!(f, "value {operator} {value}")?,
                    Threshold::Number(value) => write!(f, "value {operator} {value}")?,
                }
                if *looping {
                    f.write_str(" (loop)")?;
                }
                Ok(())
            }
        }
    }
}
