use anyhow::Result;
use tracing::{debug, info};

use crate::markdown::document::{is_table_line, Document};
use crate::model::row::{ParsedRow, TableRow};
use crate::providers::IssueProvider;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Distinct identifiers found in the document.
    pub linked: usize,
    /// Identifiers struck through on this run.
    pub struck: Vec<String>,
}

struct LinkedRow {
    line: usize,
    identifier: String,
    row: TableRow,
}

fn linked_rows(doc: &Document) -> Vec<LinkedRow> {
    doc.lines()
        .iter()
        .enumerate()
        .filter(|(_, line)| is_table_line(line))
        .filter_map(|(idx, line)| match ParsedRow::parse(line) {
            ParsedRow::Row(row) => row.linked_identifier().map(|identifier| LinkedRow {
                line: idx,
                identifier: identifier.to_string(),
                row: row.clone(),
            }),
            ParsedRow::Malformed(_) => None,
        })
        .collect()
}

/// Strikes through items whose linked issue is completed or canceled.
/// All identifiers go out in one batched query; the document is only changed in memory.
pub async fn annotate_document(
    doc: &mut Document,
    provider: &dyn IssueProvider,
) -> Result<StatusReport> {
    let rows = linked_rows(doc);
    let mut identifiers: Vec<String> = Vec::new();
    for row in &rows {
        if !identifiers.contains(&row.identifier) {
            identifiers.push(row.identifier.clone());
        }
    }

    let mut report = StatusReport {
        linked: identifiers.len(),
        ..Default::default()
    };
    if identifiers.is_empty() {
        debug!(file = %doc.path().display(), "No Linear links found");
        return Ok(report);
    }

    info!(count = identifiers.len(), "Fetching issue status");
    let states = provider.issue_states(&identifiers).await?;

    for LinkedRow {
        line,
        identifier,
        mut row,
    } in rows
    {
        let Some(state) = states.get(&identifier) else {
            continue;
        };
        if !state.is_terminal() {
            continue;
        }
        let item = row.item().to_string();
        if row.strike_item() {
            doc.set_line(line, row.to_line());
            info!(%identifier, %state, item = %item, "Marked item");
            report.struck.push(identifier);
        }
    }

    Ok(report)
}
