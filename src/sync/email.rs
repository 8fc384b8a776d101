use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::markdown::email::{
    attach_issue_url, issue_title, linked_url, url_identifier, uses_legacy_tag,
};
use crate::model::issue::{IssueRef, NewIssue};
use crate::providers::{CreateOutcome, IssueProvider};

pub struct EmailSync<'a> {
    pub provider: &'a dyn IssueProvider,
    pub team_id: &'a str,
    pub state_id: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailOutcome {
    Created(IssueRef),
    Updated(String),
    Skipped(String),
}

impl<'a> EmailSync<'a> {
    /// Mirrors one email note into Linear. Lookup failures from the API propagate;
    /// a rejected create or update is reported as `Skipped`.
    pub async fn sync_note(&self, path: &Path) -> Result<EmailOutcome> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let title = issue_title(&content);

        match linked_url(&content) {
            Some(url) => self.update_existing(path, &content, &title, &url).await,
            None => self.create_new(path, &content, &title).await,
        }
    }

    async fn update_existing(
        &self,
        path: &Path,
        content: &str,
        title: &str,
        url: &str,
    ) -> Result<EmailOutcome> {
        let Some(identifier) = url_identifier(url) else {
            warn!(url, "Could not extract issue identifier from URL");
            return Ok(EmailOutcome::Skipped(format!("no identifier in {url}")));
        };

        info!(%identifier, "Updating existing issue");
        let Some(issue_id) = self.provider.find_issue_id(&identifier).await? else {
            warn!(%identifier, "Could not find issue");
            return Ok(EmailOutcome::Skipped(format!("{identifier} not found")));
        };

        if let Err(e) = self.provider.update_issue(&issue_id, title, content).await {
            warn!(%identifier, error = %e, "Update failed");
            return Ok(EmailOutcome::Skipped(format!("{e:#}")));
        }

        if uses_legacy_tag(content) {
            write_if_changed(path, content, &attach_issue_url(content, url))?;
        }
        Ok(EmailOutcome::Updated(identifier))
    }

    async fn create_new(&self, path: &Path, content: &str, title: &str) -> Result<EmailOutcome> {
        info!(title, "Creating new issue in Backlog");
        let issue = NewIssue {
            team_id: self.team_id.to_string(),
            title: title.to_string(),
            description: content.to_string(),
            priority: None,
            project_id: None,
            state_id: self.state_id.map(String::from),
        };

        match CreateOutcome::attempt(self.provider, &issue).await {
            CreateOutcome::Created(created) => {
                write_if_changed(path, content, &attach_issue_url(content, &created.url))?;
                info!(
                    identifier = %created.identifier,
                    url = %created.url,
                    "Created issue and linked note"
                );
                Ok(EmailOutcome::Created(created))
            }
            CreateOutcome::Failed(reason) => {
                warn!(%reason, "Failed to create issue");
                Ok(EmailOutcome::Skipped(reason))
            }
        }
    }
}

fn write_if_changed(path: &Path, before: &str, after: &str) -> Result<bool> {
    if before == after {
        return Ok(false);
    }
    std::fs::write(path, after).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}
