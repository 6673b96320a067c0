//! Output formatting and the two optional emission sinks.

use std::io::{self, Write};

use crate::types::EmissionOrdinal;

/// Human-readable form: `Q<ordinal>)<text>` followed by a blank line.
pub fn pretty_line(ordinal: EmissionOrdinal, text: &str) -> String {
    format!("Q{ordinal}){text}\n\n")
}

/// Machine-readable qbank record form: `<q<text>q>` on its own line.
pub fn log_line(text: &str) -> String {
    format!("<q{text}q>\n")
}

/// Pair of independently optional byte sinks for one sampling run: the
/// pretty (human-readable) destination and the log (qbank record format)
/// destination. `None` disables a destination.
pub struct EmitSinks<'a> {
    pretty: Option<&'a mut dyn Write>,
    log: Option<&'a mut dyn Write>,
}

impl<'a> EmitSinks<'a> {
    /// Sinks writing to the given destinations.
    pub fn new(pretty: Option<&'a mut dyn Write>, log: Option<&'a mut dyn Write>) -> Self {
        Self { pretty, log }
    }

    /// Sinks with both destinations disabled.
    pub fn disabled() -> Self {
        Self {
            pretty: None,
            log: None,
        }
    }

    pub(crate) fn emit_pretty(&mut self, ordinal: EmissionOrdinal, text: &str) -> io::Result<()> {
        if let Some(sink) = self.pretty.as_mut() {
            sink.write_all(pretty_line(ordinal, text).as_bytes())?;
        }
        Ok(())
    }

    pub(crate) fn emit_log(&mut self, text: &str) -> io::Result<()> {
        if let Some(sink) = self.log.as_mut() {
            sink.write_all(log_line(text).as_bytes())?;
        }
        Ok(())
    }
}
