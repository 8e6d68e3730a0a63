use std::io::{self, Write};

use serde::Serialize;

use crate::pipeline::{ProgressEvent, ProgressSink, RunSummary};
use crate::record::NormalizedRecord;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_record(record: &NormalizedRecord) -> io::Result<()> {
        Self::print_json(record)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "processed {} ids: {} written ({} inserted, {} updated), {} failed, {} skipped\n",
        summary.total,
        summary.written,
        summary.inserted,
        summary.updated,
        summary.failed,
        summary.skipped
    ));
    out.push_str(&format!(
        "coordinates: {} direct, {} fallback, {} unresolved\n",
        summary.resolved_direct, summary.resolved_fallback, summary.unresolved
    ));
    for item in summary.items.iter().filter(|item| item.error.is_some()) {
        out.push_str(&format!(
            "  failed {}: {}\n",
            item.id,
            item.error.as_deref().unwrap_or_default()
        ));
    }
    out
}
