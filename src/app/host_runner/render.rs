//! Rendering of query outcomes for the terminal.

use anyhow::Result;
use std::io::Write;

use crate::app::data_plane::logs_insights::{QueryOutcome, QueryStatus, ResultRow};

/// `<@timestamp>  <@message>`; missing fields render as empty strings
pub fn format_row(row: &ResultRow) -> String {
    format!(
        "{}  {}",
        row.timestamp().unwrap_or_default(),
        row.message().unwrap_or_default()
    )
}

/// One status line describing the outcome, for stderr
pub fn summary_line(outcome: &QueryOutcome) -> String {
    match outcome.status {
        None => "No query id returned; nothing was run.".to_string(),
        Some(_) if outcome.is_empty() => "No results found.".to_string(),
        Some(QueryStatus::Complete) => {
            format!("Query complete. Showing {} entries:", outcome.result.len())
        }
        Some(status) => format!(
            "Query ended with status {}. Showing {} entries:",
            status,
            outcome.result.len()
        ),
    }
}

/// Warning for terminal statuses other than `Complete`
pub fn status_warning(outcome: &QueryOutcome) -> Option<String> {
    match outcome.status {
        Some(QueryStatus::Complete) | None => None,
        Some(status) => Some(format!(
            "Warning: query {} ended with status {}; results may be incomplete.",
            outcome
                .handle
                .as_ref()
                .map(|h| h.query_id())
                .unwrap_or_default(),
            status
        )),
    }
}

/// Write every row as one text line, in backend order
pub fn render_text<W: Write>(outcome: &QueryOutcome, out: &mut W) -> Result<()> {
    for row in &outcome.result {
        writeln!(out, "{}", format_row(row))?;
    }
    out.flush()?;
    Ok(())
}

/// Write the whole outcome as pretty JSON
pub fn render_json<W: Write>(outcome: &QueryOutcome, out: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, outcome)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::data_plane::logs_insights::{QueryHandle, ResultField};
    use pretty_assertions::assert_eq;

    fn outcome(status: Option<QueryStatus>, rows: Vec<ResultRow>) -> QueryOutcome {
        QueryOutcome {
            handle: status.map(|_| QueryHandle::new("q1")),
            status,
            result: rows,
            statistics: None,
            polls: 1,
        }
    }

    fn row(fields: &[(&str, &str)]) -> ResultRow {
        fields
            .iter()
            .map(|(name, value)| ResultField::new(*name, *value))
            .collect()
    }

    #[test]
    fn test_format_row() {
        let r = row(&[("@timestamp", "t1"), ("@message", "hello")]);
        assert_eq!(format_row(&r), "t1  hello");
    }

    #[test]
    fn test_format_row_missing_fields() {
        assert_eq!(format_row(&row(&[("@message", "only message")])), "  only message");
        assert_eq!(format_row(&row(&[("@timestamp", "t1")])), "t1  ");
        assert_eq!(format_row(&ResultRow::new()), "  ");
    }

    #[test]
    fn test_render_text_keeps_order() {
        let o = outcome(
            Some(QueryStatus::Complete),
            vec![
                row(&[("@timestamp", "t2"), ("@message", "b")]),
                row(&[("@timestamp", "t1"), ("@message", "a")]),
            ],
        );

        let mut out = Vec::new();
        render_text(&o, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "t2  b\nt1  a\n");
    }

    #[test]
    fn test_summary_lines() {
        assert_eq!(summary_line(&outcome(None, vec![])), "No query id returned; nothing was run.");
        assert_eq!(
            summary_line(&outcome(Some(QueryStatus::Failed), vec![])),
            "No results found."
        );
        assert_eq!(
            summary_line(&outcome(Some(QueryStatus::Complete), vec![ResultRow::new()])),
            "Query complete. Showing 1 entries:"
        );
    }

    #[test]
    fn test_status_warning() {
        assert!(status_warning(&outcome(Some(QueryStatus::Complete), vec![])).is_none());
        assert!(status_warning(&outcome(None, vec![])).is_none());

        let warning = status_warning(&outcome(Some(QueryStatus::Timeout), vec![])).unwrap();
        assert!(warning.contains("q1"));
        assert!(warning.contains("Timeout"));
    }

    #[test]
    fn test_render_json() {
        let o = outcome(
            Some(QueryStatus::Complete),
            vec![row(&[("@message", "hello")])],
        );
        let mut out = Vec::new();
        render_json(&o, &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["status"], "Complete");
        assert_eq!(value["result"][0][0]["value"], "hello");
        assert_eq!(value["handle"]["query_id"], "q1");
    }
}
