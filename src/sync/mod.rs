pub mod actions;
pub mod email;
pub mod status;

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::markdown::document::Document;
use crate::providers::IssueProvider;
use actions::{ActionReport, ActionSync};
use status::StatusReport;

/// Load, reconcile the action table, and write back only if a link was added.
pub async fn sync_file(
    path: &Path,
    actions: &ActionSync<'_>,
    summary_project: Option<&str>,
) -> Result<ActionReport> {
    info!(file = %path.display(), "Processing");
    let mut doc = Document::load(path)?;

    if let Some(project) = summary_project {
        actions.create_summary_issue(&doc, project).await;
    }

    let report = actions.sync_document(&mut doc).await;
    if doc.save_if_modified(report.created.len())? {
        info!(file = %path.display(), count = report.created.len(), "Added Linear links");
    }
    Ok(report)
}

/// Load, strike through finished items, and write back only if something changed.
pub async fn annotate_file(path: &Path, provider: &dyn IssueProvider) -> Result<StatusReport> {
    info!(file = %path.display(), "Checking");
    let mut doc = Document::load(path)?;
    let report = status::annotate_document(&mut doc, provider).await?;
    if doc.save_if_modified(report.struck.len())? {
        info!(file = %path.display(), count = report.struck.len(), "Saved status updates");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::document::TableMarkers;
    use crate::model::issue::StateType;
    use crate::providers::tests::MockProvider;
    use crate::providers::ProjectMap;

    const NOTE: &str = "# 2026-01-02\n\
                        \n\
                        ## Action Items\n\
                        | Project | Priority | Item | Description | Due | Linear Link |\n\
                        |---|---|---|---|---|---|\n\
                        | Ops | 단기 | Fix leak | desc | 2026-01-10 |  |\n\
                        | Ops | short |\n\
                        \n\
                        Notes continue.\n";

    fn actions<'a>(
        provider: &'a MockProvider,
        projects: &'a ProjectMap,
        markers: &'a TableMarkers,
    ) -> ActionSync<'a> {
        ActionSync {
            provider,
            projects,
            team_id: "team-1",
            state_id: None,
            markers,
        }
    }

    #[tokio::test]
    async fn sync_then_status_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2026-01-02.md");
        std::fs::write(&path, NOTE).unwrap();

        let provider = MockProvider::new()
            .with_project("Ops", "proj-id-1")
            .with_created("OPS-5", "https://linear.app/x/issue/OPS-5")
            .with_state("OPS-5", StateType::Completed);
        let projects = provider.projects().await.unwrap();
        let markers = TableMarkers::default();

        let report = sync_file(&path, &actions(&provider, &projects, &markers), None)
            .await
            .unwrap();
        assert_eq!(report.created, vec!["OPS-5".to_string()]);

        let status = annotate_file(&path, &provider).await.unwrap();
        assert_eq!(status.struck, vec!["OPS-5".to_string()]);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            NOTE.replace(
                "| Fix leak | desc | 2026-01-10 |  |",
                "| ~~Fix leak~~ | desc | 2026-01-10 | [OPS-5](https://linear.app/x/issue/OPS-5) |"
            )
        );
    }

    #[tokio::test]
    async fn unmodified_file_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, NOTE).unwrap();
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();

        // No projects, so nothing can be created.
        let provider = MockProvider::new();
        let projects = ProjectMap::new();
        let markers = TableMarkers::default();
        let report = sync_file(&path, &actions(&provider, &projects, &markers), None)
            .await
            .unwrap();

        assert_eq!(report.unmatched, 1);
        assert_eq!(std::fs::read(&path).unwrap(), NOTE.as_bytes());
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[tokio::test]
    async fn annotate_leaves_file_untouched_without_terminal_states() {
        let note = "| Project | Priority | Item | Description | Due | Linear Link |\n\
                    |---|---|---|---|---|---|\n\
                    | Ops | 단기 | Fix leak | d | - | [OPS-5](https://linear.app/x/issue/OPS-5) |\n\
                    | Ops | 중기 | Audit | d | - | [OPS-6](https://linear.app/x/issue/OPS-6) |\n";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, note).unwrap();
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();

        // OPS-5 is still in progress and OPS-6 does not resolve.
        let provider = MockProvider::new().with_state("OPS-5", StateType::Started);
        let report = annotate_file(&path, &provider).await.unwrap();

        assert_eq!(report.linked, 2);
        assert!(report.struck.is_empty());
        assert_eq!(std::fs::read(&path).unwrap(), note.as_bytes());
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[tokio::test]
    async fn summary_issue_created_before_table_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2026-01-02.md");
        std::fs::write(&path, NOTE).unwrap();
        let provider = MockProvider::new()
            .with_project("Ops", "proj-id-1")
            .with_project("Operations & Infra", "proj-ops");
        let projects = provider.projects().await.unwrap();
        let markers = TableMarkers::default();

        sync_file(
            &path,
            &actions(&provider, &projects, &markers),
            Some("Operations & Infra"),
        )
        .await
        .unwrap();

        assert_eq!(
            provider.created_titles(),
            vec!["[Meeting Notes] 2026-01-02".to_string(), "Fix leak".to_string()]
        );
    }
}
