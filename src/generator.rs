//! Timed external-input scripts.
//!
//! A script is the textual form of the event stream that drives a simulation
//! from outside: one `<time> <value>` pair per line, delivered to a chosen
//! boundary input port. Used both for the control stream of the full network
//! and for injecting acknowledgements when testing a sender on its own.

use thiserror::Error;

/// A script line that could not be accepted.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The line does not have exactly two whitespace-separated fields.
    #[error("line {line_no}: expected `<time> <value>`, got {line:?}")]
    Malformed {
        /// 1-based line number.
        line_no: usize,
        /// The offending line.
        line: String,
    },
    /// The time field is not a non-negative finite number.
    #[error("line {line_no}: invalid time {field:?}")]
    InvalidTime {
        /// 1-based line number.
        line_no: usize,
        /// The offending field.
        field: String,
    },
    /// The value field is not a finite number.
    #[error("line {line_no}: invalid value {field:?}")]
    InvalidValue {
        /// 1-based line number.
        line_no: usize,
        /// The offending field.
        field: String,
    },
    /// Times must not decrease from line to line.
    #[error("line {line_no}: time {time} is earlier than the previous entry")]
    NonMonotonic {
        /// 1-based line number.
        line_no: usize,
        /// The out-of-order time.
        time: f64,
    },
}

/// One timed value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScriptEntry {
    /// Virtual time of delivery.
    pub time: f64,
    /// The delivered value.
    pub value: f64,
}

/// A parsed sequence of timed values, in delivery order.
#[derive(Clone, Debug, Default)]
pub struct InputScript {
    entries: Vec<ScriptEntry>,
}

impl InputScript {
    /// Parses a script. Blank lines and `#` comments are skipped; anything
    /// else must be a `<time> <value>` pair with non-decreasing times.
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut entries: Vec<ScriptEntry> = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (time_field, value_field) = match (fields.next(), fields.next(), fields.next()) {
                (Some(t), Some(v), None) => (t, v),
                _ => {
                    return Err(ScriptError::Malformed {
                        line_no,
                        line: line.to_string(),
                    })
                }
            };
            let time: f64 = time_field.parse().map_err(|_| ScriptError::InvalidTime {
                line_no,
                field: time_field.to_string(),
            })?;
            if !time.is_finite() || time < 0.0 {
                return Err(ScriptError::InvalidTime {
                    line_no,
                    field: time_field.to_string(),
                });
            }
            let value: f64 = value_field.parse().map_err(|_| ScriptError::InvalidValue {
                line_no,
                field: value_field.to_string(),
            })?;
            if !value.is_finite() {
                return Err(ScriptError::InvalidValue {
                    line_no,
                    field: value_field.to_string(),
                });
            }
            if let Some(last) = entries.last() {
                if time < last.time {
                    return Err(ScriptError::NonMonotonic { line_no, time });
                }
            }
            entries.push(ScriptEntry { time, value });
        }
        Ok(Self { entries })
    }

    /// The entries, in delivery order.
    pub fn entries(&self) -> &[ScriptEntry] {
        &self.entries
    }
}
