//! Tab-separated rendering of log events

use std::io::Write;

use serde_json::Value;

use crate::decoder::LogEvent;
use crate::error::Result;

/// Write events as tab-separated rows
///
/// The header is the first event's keys in sorted order; every later event
/// is rendered in that column order. Missing keys and `null` values become
/// empty cells, strings are written without quotes. An empty sequence
/// writes nothing. The first error from `events` is returned after the
/// rows before it have been written.
///
/// Returns the number of event rows written.
pub fn write_tsv<W, I>(writer: &mut W, events: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = Result<LogEvent>>,
{
    let mut header: Option<Vec<String>> = None;
    let mut rows = 0;

    for event in events {
        let event = event?;

        if header.is_none() {
            let mut keys: Vec<String> = event.keys().cloned().collect();
            keys.sort();
            writeln!(writer, "{}", keys.join("\t"))?;
            header = Some(keys);
        }
        let columns = header.as_deref().unwrap_or_default();

        let cells: Vec<String> = columns
            .iter()
            .map(|column| render_cell(event.get(column)))
            .collect();
        writeln!(writer, "{}", cells.join("\t"))?;
        rows += 1;
    }

    writer.flush()?;
    Ok(rows)
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
