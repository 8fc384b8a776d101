pub mod linear;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::model::issue::{IssueRef, NewIssue, StateType};

/// Project name -> project id.
pub type ProjectMap = HashMap<String, String>;

#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub key: String,
}

/// Remote issue tracker. Only Linear is implemented; tests substitute a mock.
#[async_trait]
pub trait IssueProvider: Send + Sync {
    async fn projects(&self) -> Result<ProjectMap>;
    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueRef>;
    /// State category per identifier. Identifiers that don't resolve are absent.
    async fn issue_states(&self, identifiers: &[String]) -> Result<HashMap<String, StateType>>;
    /// Internal id (UUID) for a human identifier such as `OPS-5`.
    async fn find_issue_id(&self, identifier: &str) -> Result<Option<String>>;
    async fn update_issue(&self, id: &str, title: &str, description: &str) -> Result<()>;
    async fn first_team(&self) -> Result<Option<Team>>;
}

/// Result of one create attempt. Failures are per-item and never abort a batch.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(IssueRef),
    Failed(String),
}

impl CreateOutcome {
    pub async fn attempt(provider: &dyn IssueProvider, issue: &NewIssue) -> Self {
        match provider.create_issue(issue).await {
            Ok(created) => CreateOutcome::Created(created),
            Err(e) => CreateOutcome::Failed(format!("{e:#}")),
        }
    }
}
