//! The payload type carried between protocol components.

use std::fmt;

use serde::Serialize;

/// A single float-valued payload travelling on a port.
///
/// A message is immutable once produced. Its meaning depends on the port it
/// travels on: `packet_num * 10 + alt_bit` on a data port, the bare
/// acknowledgement bit on an ack port, or a packet count on a control port.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Message {
    /// The carried value.
    pub value: f64,
}

impl Message {
    /// Creates a message carrying `value`.
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    /// The value truncated to an integer, the way protocol components
    /// interpret packet numbers, counts and bits.
    pub fn as_int(&self) -> i64 {
        self.value as i64
    }
}

impl From<f64> for Message {
    fn from(value: f64) -> Self {
        Self { value }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.fract() == 0.0 {
            write!(f, "{}", self.value as i64)
        } else {
            write!(f, "{}", self.value)
        }
    }
}
