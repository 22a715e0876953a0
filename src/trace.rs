//! Simulation trace: the line format, its parser and the table formatter.
//!
//! The runner reports every externally visible emission through a
//! [`TraceLog`]. The log keeps structured records and can mirror them to a
//! writer in the classic line format:
//!
//! ```text
//! 10
//! [sender1_defs::dataOut: {11}] generated by model sender1
//! ```
//!
//! Lines are flushed as they are produced, so everything valid before an
//! aborted run is already on disk. The parser is the inverse, a small
//! line-oriented tokenizer with explicit boundaries, and
//! [`render_table`] turns records into the four-column report.

use std::fmt::Write as _;
use std::io::Write;

use colored::Colorize;
use serde::Serialize;
use thiserror::Error;

use crate::port::Port;

/// One externally visible emission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TraceRecord {
    /// Virtual time of the emission.
    pub time: f64,
    /// The carried value.
    pub value: f64,
    /// The port the value left on.
    pub port: Port,
    /// Name of the emitting component.
    pub component: String,
}

impl TraceRecord {
    /// The record as a JSON object, for structured log output.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("trace record serialization cannot fail")
    }
}

/// Formats a value the way trace lines do: no fraction for whole numbers.
fn fmt_value(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Collects trace records and mirrors them to an optional writer.
#[derive(Default)]
pub struct TraceLog {
    records: Vec<TraceRecord>,
    writer: Option<Box<dyn Write>>,
    echo: bool,
    last_time: Option<f64>,
}

impl TraceLog {
    /// An in-memory log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Additionally writes the line format to `writer`, one flushed line at a
    /// time.
    pub fn with_writer(writer: Box<dyn Write>) -> Self {
        Self {
            writer: Some(writer),
            ..Self::default()
        }
    }

    /// Also mirrors records to the console, colorized.
    pub fn echo(mut self, enabled: bool) -> Self {
        self.echo = enabled;
        self
    }

    /// Records one emission.
    pub fn record(&mut self, record: TraceRecord) {
        if let Some(writer) = &mut self.writer {
            if self.last_time != Some(record.time) {
                let _ = writeln!(writer, "{}", fmt_value(record.time));
            }
            let _ = writeln!(
                writer,
                "[{}_defs::{}: {{{}}}] generated by model {}",
                record.component,
                record.port,
                fmt_value(record.value),
                record.component
            );
            let _ = writer.flush();
        }
        if self.echo {
            println!(
                "{} [{}: {{{}}}] {}",
                fmt_value(record.time).green(),
                record.port.to_string().yellow(),
                fmt_value(record.value),
                record.component.cyan()
            );
        }
        self.last_time = Some(record.time);
        self.records.push(record);
    }

    /// All records so far, in emission order.
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Consumes the log, returning the records.
    pub fn into_records(self) -> Vec<TraceRecord> {
        self.records
    }
}

/// A malformed trace text.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A line that is neither a time header nor an emission entry.
    #[error("line {line_no}: expected a time header or an emission entry, got {line:?}")]
    UnexpectedLine {
        /// 1-based line number.
        line_no: usize,
        /// The offending line.
        line: String,
    },
    /// An emission entry before any time header.
    #[error("line {line_no}: emission entry before any time header")]
    MissingTime {
        /// 1-based line number.
        line_no: usize,
    },
    /// An emission entry that does not tokenize.
    #[error("line {line_no}: malformed emission entry {line:?}")]
    MalformedEntry {
        /// 1-based line number.
        line_no: usize,
        /// The offending line.
        line: String,
    },
    /// An emission entry naming an unknown port.
    #[error("line {line_no}: unknown port {token:?}")]
    UnknownPort {
        /// 1-based line number.
        line_no: usize,
        /// The unrecognized token.
        token: String,
    },
}

/// Incremental parser for the trace line format.
///
/// Feed lines in order; a time header sets the instant for the emission
/// entries that follow it.
#[derive(Debug, Default)]
pub struct TraceParser {
    time: Option<f64>,
}

impl TraceParser {
    /// A parser with no current instant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one line; returns a record for emission entries, `None` for
    /// time headers and blank lines.
    pub fn feed(&mut self, line_no: usize, raw: &str) -> Result<Option<TraceRecord>, TraceError> {
        let line = raw.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if !line.starts_with('[') {
            let time: f64 = line.parse().map_err(|_| TraceError::UnexpectedLine {
                line_no,
                line: line.to_string(),
            })?;
            self.time = Some(time);
            return Ok(None);
        }
        let time = self.time.ok_or(TraceError::MissingTime { line_no })?;
        self.parse_entry(line_no, line, time).map(Some)
    }

    fn parse_entry(
        &self,
        line_no: usize,
        line: &str,
        time: f64,
    ) -> Result<TraceRecord, TraceError> {
        let malformed = || TraceError::MalformedEntry {
            line_no,
            line: line.to_string(),
        };
        // [<desc>::<port>: {<value>}] generated by model <component>
        let rest = line.strip_prefix('[').ok_or_else(malformed)?;
        let (inside, tail) = rest.split_once(']').ok_or_else(malformed)?;
        let component = tail
            .strip_prefix(" generated by model ")
            .ok_or_else(malformed)?
            .trim();
        if component.is_empty() {
            return Err(malformed());
        }
        let (_desc, inside) = inside.rsplit_once("::").ok_or_else(malformed)?;
        let (token, braced) = inside.split_once(": ").ok_or_else(malformed)?;
        let port = Port::from_token(token).ok_or_else(|| TraceError::UnknownPort {
            line_no,
            token: token.to_string(),
        })?;
        let value: f64 = braced
            .strip_prefix('{')
            .and_then(|v| v.strip_suffix('}'))
            .ok_or_else(malformed)?
            .parse()
            .map_err(|_| malformed())?;
        Ok(TraceRecord {
            time,
            value,
            port,
            component: component.to_string(),
        })
    }
}

/// Parses a whole trace text into records.
pub fn parse_trace(text: &str) -> Result<Vec<TraceRecord>, TraceError> {
    let mut parser = TraceParser::new();
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(record) = parser.feed(idx + 1, line)? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Ports that appear in the report table.
const TABLE_PORTS: [Port; 4] = [
    Port::Out,
    Port::DataOut,
    Port::PacketSentOut,
    Port::AckReceivedOut,
];

/// Renders records as the four-column Time/Value/Port/Component table.
///
/// Only data-bearing output ports appear; routing and control noise is left
/// out, matching the classic report.
pub fn render_table(records: &[TraceRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>7}{:>20}{:>14}{:>22}",
        "Time", "Value", "Port", "Component"
    );
    let _ = writeln!(out, "{}", "-".repeat(70));
    for record in records {
        if !TABLE_PORTS.contains(&record.port) {
            continue;
        }
        let _ = writeln!(
            out,
            "{:>7}{:>20}{:>14}{:>22}",
            fmt_value(record.time),
            fmt_value(record.value),
            record.port.to_string(),
            record.component
        );
    }
    out
}
