use tracing::{debug, info, warn};

use crate::markdown::document::{Document, TableMarkers};
use crate::model::issue::{IssueRef, NewIssue, Priority};
use crate::model::row::{ParsedRow, TableRow};
use crate::providers::{CreateOutcome, IssueProvider, ProjectMap};

/// Everything the creation path needs, resolved once per run.
pub struct ActionSync<'a> {
    pub provider: &'a dyn IssueProvider,
    pub projects: &'a ProjectMap,
    pub team_id: &'a str,
    pub state_id: Option<&'a str>,
    pub markers: &'a TableMarkers,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub table_found: bool,
    pub created: Vec<String>,
    pub unmatched: usize,
    pub failed: usize,
    pub malformed: usize,
}

enum RowOutcome {
    AlreadyLinked,
    Created(IssueRef),
    UnknownProject,
    Failed,
}

impl<'a> ActionSync<'a> {
    /// Creates issues for action items without a link and writes the links back
    /// into the table. The document is only changed in memory.
    pub async fn sync_document(&self, doc: &mut Document) -> ActionReport {
        let mut report = ActionReport::default();
        let Some(span) = doc.find_table(self.markers) else {
            info!(file = %doc.path().display(), "No Action Items table found");
            return report;
        };
        report.table_found = true;
        debug!(header = span.start, rows = span.end - span.start, "Found action table");

        let source = doc.file_name();
        let table = doc.table_lines(span).to_vec();
        let mut updated = Vec::with_capacity(table.len());

        for (offset, line) in table.into_iter().enumerate() {
            // Header and separator.
            if offset < 2 {
                updated.push(line);
                continue;
            }
            let mut row = match ParsedRow::parse(&line) {
                ParsedRow::Row(row) => row,
                ParsedRow::Malformed(raw) => {
                    debug!(line = %raw, "Skipping malformed row");
                    report.malformed += 1;
                    updated.push(raw);
                    continue;
                }
            };

            match self.reconcile_row(&row, &source).await {
                RowOutcome::Created(issue) => {
                    row.set_link(&issue.markdown_link());
                    report.created.push(issue.identifier);
                    updated.push(row.to_line());
                }
                RowOutcome::AlreadyLinked => updated.push(line),
                RowOutcome::UnknownProject => {
                    report.unmatched += 1;
                    updated.push(line);
                }
                RowOutcome::Failed => {
                    report.failed += 1;
                    updated.push(line);
                }
            }
        }

        if !report.created.is_empty() {
            doc.replace_range(span, updated);
        }
        report
    }

    async fn reconcile_row(&self, row: &TableRow, source: &str) -> RowOutcome {
        // Any non-empty link counts as synced, even one we can't parse.
        if !row.link().is_empty() {
            return RowOutcome::AlreadyLinked;
        }

        let project = row.project();
        info!(project = %project, item = row.item(), "Creating issue");

        let Some(project_id) = self.projects.get(&project) else {
            warn!(project = %project, "Project not found in Linear, skipping");
            return RowOutcome::UnknownProject;
        };

        let issue = NewIssue {
            team_id: self.team_id.to_string(),
            title: row.item().to_string(),
            description: issue_description(row, source),
            priority: Some(Priority::from_label(row.priority())),
            project_id: Some(project_id.clone()),
            state_id: self.state_id.map(String::from),
        };

        match CreateOutcome::attempt(self.provider, &issue).await {
            CreateOutcome::Created(created) => {
                info!(identifier = %created.identifier, "Created issue");
                RowOutcome::Created(created)
            }
            CreateOutcome::Failed(reason) => {
                warn!(item = row.item(), %reason, "Failed to create issue");
                RowOutcome::Failed
            }
        }
    }

    /// One backlog issue holding the whole meeting note.
    pub async fn create_summary_issue(&self, doc: &Document, project: &str) -> Option<IssueRef> {
        let Some(project_id) = self.projects.get(project) else {
            warn!(project, "Summary project not found in Linear");
            return None;
        };

        let stem = doc
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let issue = NewIssue {
            team_id: self.team_id.to_string(),
            title: format!("[Meeting Notes] {stem}"),
            description: doc.text(),
            priority: None,
            project_id: Some(project_id.clone()),
            state_id: self.state_id.map(String::from),
        };

        match CreateOutcome::attempt(self.provider, &issue).await {
            CreateOutcome::Created(created) => {
                info!(url = %created.url, "Meeting issue created");
                Some(created)
            }
            CreateOutcome::Failed(reason) => {
                warn!(%reason, "Meeting issue creation failed");
                None
            }
        }
    }
}

pub fn issue_description(row: &TableRow, source: &str) -> String {
    format!(
        "{}\n\n**Due Date**: {}\n**Source**: Meeting Notes ({source})",
        row.description(),
        row.due()
    )
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::providers::tests::MockProvider;

    const HEADER: &str = "| Project | Priority | Item | Description | Due | Link |\n\
                          |---|---|---|---|---|---|\n";

    fn doc(rows: &str) -> Document {
        Document::from_text(
            Path::new("meeting_notes/2026-01-02.md"),
            &format!("# Notes\n\n{HEADER}{rows}\nTrailing text\n"),
        )
    }

    fn projects(entries: &[(&str, &str)]) -> ProjectMap {
        entries
            .iter()
            .map(|(name, id)| (name.to_string(), id.to_string()))
            .collect()
    }

    async fn run(
        provider: &MockProvider,
        projects: &ProjectMap,
        doc: &mut Document,
    ) -> ActionReport {
        let markers = TableMarkers::default();
        let sync = ActionSync {
            provider,
            projects,
            team_id: "team-1",
            state_id: Some("backlog-state"),
            markers: &markers,
        };
        sync.sync_document(doc).await
    }

    #[tokio::test]
    async fn creates_issue_and_writes_link() {
        let provider =
            MockProvider::new().with_created("OPS-5", "https://linear.app/x/issue/OPS-5");
        let projects = projects(&[("Ops", "proj-id-1")]);
        let mut d = doc("| Ops | 단기 | Fix leak | desc | 2026-01-10 |  |\n");

        let report = run(&provider, &projects, &mut d).await;

        assert_eq!(report.created, vec!["OPS-5".to_string()]);
        let row = &d.lines()[4];
        let link_cell = row.split('|').nth(6).unwrap();
        assert_eq!(link_cell, " [OPS-5](https://linear.app/x/issue/OPS-5) ");
        assert_eq!(
            row,
            "| Ops | 단기 | Fix leak | desc | 2026-01-10 | [OPS-5](https://linear.app/x/issue/OPS-5) |"
        );
        assert!(d.text().ends_with("\nTrailing text\n"));
    }

    #[tokio::test]
    async fn sends_expected_issue_fields() {
        let provider = MockProvider::new();
        let projects = projects(&[("Ops", "proj-id-1")]);
        let mut d = doc("| **Ops** | 즉시 | Fix leak | desc | 2026-01-10 |  |\n");

        run(&provider, &projects, &mut d).await;

        let created = provider.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        let issue = &created[0];
        assert_eq!(issue.team_id, "team-1");
        assert_eq!(issue.title, "Fix leak");
        assert_eq!(issue.priority, Some(Priority::Urgent));
        assert_eq!(issue.project_id.as_deref(), Some("proj-id-1"));
        assert_eq!(issue.state_id.as_deref(), Some("backlog-state"));
        assert_eq!(
            issue.description,
            "desc\n\n**Due Date**: 2026-01-10\n**Source**: Meeting Notes (2026-01-02.md)"
        );
    }

    #[tokio::test]
    async fn unknown_priority_defaults_to_none() {
        let provider = MockProvider::new();
        let projects = projects(&[("Ops", "proj-id-1")]);
        let mut d = doc("| Ops | later | Fix leak | desc | - |  |\n");
        run(&provider, &projects, &mut d).await;
        assert_eq!(provider.created.lock().unwrap()[0].priority, Some(Priority::None));
    }

    #[tokio::test]
    async fn unmatched_project_leaves_row() {
        let provider = MockProvider::new();
        let projects = projects(&[("Ops", "proj-id-1")]);
        let original = "| ops | 단기 | Fix leak | desc | - |  |\n";
        let mut d = doc(original);
        let before = d.text();

        let report = run(&provider, &projects, &mut d).await;

        assert_eq!(report.unmatched, 1);
        assert!(report.created.is_empty());
        assert_eq!(d.text(), before);
        assert!(provider.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_create_does_not_stop_batch() {
        let provider = MockProvider::new().failing_title("First");
        let projects = projects(&[("Ops", "proj-id-1")]);
        let mut d = doc(
            "| Ops | 단기 | First | d | - |  |\n| Ops | 단기 | Second | d | - |  |\n",
        );

        let report = run(&provider, &projects, &mut d).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.created, vec!["ISS-1".to_string()]);
        assert_eq!(d.lines()[4], "| Ops | 단기 | First | d | - |  |");
        assert!(d.lines()[5].contains("[ISS-1](https://linear.app/x/issue/ISS-1)"));
    }

    #[tokio::test]
    async fn linked_rows_are_not_recreated() {
        let provider = MockProvider::new();
        let projects = projects(&[("Ops", "proj-id-1")]);
        let mut d = doc(
            "| Ops | 단기 | Done | d | - | [OPS-1](https://linear.app/x/issue/OPS-1) |\n| Ops | 단기 | Odd | d | - | see notes |\n",
        );

        let report = run(&provider, &projects, &mut d).await;

        assert!(report.created.is_empty());
        assert!(provider.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_rows_pass_through() {
        let provider = MockProvider::new();
        let projects = projects(&[("Ops", "proj-id-1")]);
        let mut d = doc("| Ops | 단기 | short |\n| Ops | 단기 | Fix | d | - |  |\n");

        let report = run(&provider, &projects, &mut d).await;

        assert_eq!(report.malformed, 1);
        assert_eq!(report.created.len(), 1);
        assert_eq!(d.lines()[4], "| Ops | 단기 | short |");
    }

    #[tokio::test]
    async fn missing_table_is_reported() {
        let provider = MockProvider::new();
        let projects = ProjectMap::new();
        let mut d = Document::from_text(Path::new("a.md"), "# Nothing here\n");

        let report = run(&provider, &projects, &mut d).await;

        assert!(!report.table_found);
        assert_eq!(d.text(), "# Nothing here\n");
    }

    #[tokio::test]
    async fn second_run_creates_nothing() {
        let provider = MockProvider::new();
        let projects = projects(&[("Ops", "proj-id-1")]);
        let mut d = doc("| Ops | 단기 | Fix leak | desc | - |  |\n");

        run(&provider, &projects, &mut d).await;
        let after_first = d.text();
        let report = run(&provider, &projects, &mut d).await;

        assert!(report.created.is_empty());
        assert_eq!(d.text(), after_first);
        assert_eq!(provider.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn summary_issue_uses_file_stem() {
        let provider = MockProvider::new();
        let projects = projects(&[("Operations & Infra", "proj-ops")]);
        let markers = TableMarkers::default();
        let sync = ActionSync {
            provider: &provider,
            projects: &projects,
            team_id: "team-1",
            state_id: Some("backlog-state"),
            markers: &markers,
        };
        let d = doc("");

        let created = sync.create_summary_issue(&d, "Operations & Infra").await;

        assert!(created.is_some());
        let issues = provider.created.lock().unwrap();
        assert_eq!(issues[0].title, "[Meeting Notes] 2026-01-02");
        assert_eq!(issues[0].description, d.text());
        assert_eq!(issues[0].project_id.as_deref(), Some("proj-ops"));
    }

    #[tokio::test]
    async fn summary_issue_skipped_without_project() {
        let provider = MockProvider::new();
        let projects = ProjectMap::new();
        let markers = TableMarkers::default();
        let sync = ActionSync {
            provider: &provider,
            projects: &projects,
            team_id: "team-1",
            state_id: None,
            markers: &markers,
        };
        assert!(sync.create_summary_issue(&doc(""), "Operations & Infra").await.is_none());
        assert!(provider.created_titles().is_empty());
    }
}
