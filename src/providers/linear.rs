use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::{IssueProvider, ProjectMap, Team};
use crate::config::LinearConfig;
use crate::model::issue::{IssueRef, NewIssue, StateType};

#[derive(Debug, Error)]
pub enum LinearError {
    #[error("Linear API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Linear API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Failed to parse Linear response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Linear GraphQL errors: {0}")]
    Graphql(String),
    #[error("No data in Linear response")]
    MissingData,
}

impl LinearError {
    /// The server answered but rejected the query, as opposed to a transport failure.
    fn is_rejection(&self) -> bool {
        matches!(self, LinearError::Graphql(_) | LinearError::MissingData)
    }
}

pub struct LinearProvider {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl LinearProvider {
    pub fn new(config: &LinearConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.clone(),
            client: reqwest::Client::new(),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T, LinearError> {
        let mut body = json!({ "query": query });
        if let Some(variables) = variables {
            body["variables"] = variables;
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(LinearError::Status { status, body: text });
        }

        let gql: GqlResponse<T> = serde_json::from_str(&text)?;
        gql.into_data()
    }

    pub async fn workspace_info(&self) -> Result<WorkspaceInfo> {
        let data: WorkspaceInfoData = self.execute(WORKSPACE_QUERY, None).await?;
        Ok(WorkspaceInfo {
            teams: data.teams.nodes,
            states: data.workflow_states.nodes,
        })
    }

    pub async fn open_issues(&self) -> Result<Vec<IssueSummary>> {
        let data: OpenIssuesData = self.execute(OPEN_ISSUES_QUERY, None).await?;
        Ok(data.issues.nodes)
    }

    async fn single_issue_state(&self, identifier: &str) -> Result<Option<StateType>> {
        let query = format!("query Issues {{\n{}\n}}", state_selection(0, identifier));
        match self
            .execute::<HashMap<String, Option<IssueStateNode>>>(&query, None)
            .await
        {
            Ok(data) => Ok(data
                .into_values()
                .flatten()
                .find_map(|node| node.state.map(|s| s.kind))),
            Err(e) if e.is_rejection() => {
                debug!(identifier, error = %e, "Issue not resolvable");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

const PROJECTS_QUERY: &str = r#"query {
  projects(first: 250) {
    nodes { id name }
  }
}"#;

const CREATE_MUTATION: &str = r#"mutation IssueCreate($input: IssueCreateInput!) {
  issueCreate(input: $input) {
    success
    issue { id identifier url }
  }
}"#;

const UPDATE_MUTATION: &str = r#"mutation IssueUpdate($id: String!, $input: IssueUpdateInput!) {
  issueUpdate(id: $id, input: $input) {
    success
  }
}"#;

const ISSUE_ID_QUERY: &str = r#"query Issue($id: String!) {
  issue(id: $id) { id }
}"#;

const FIRST_TEAM_QUERY: &str = r#"query {
  teams(first: 1) {
    nodes { id name key }
  }
}"#;

const WORKSPACE_QUERY: &str = r#"query {
  teams {
    nodes { id name key }
  }
  workflowStates {
    nodes {
      id name type
      team { id name key }
    }
  }
}"#;

const OPEN_ISSUES_QUERY: &str = r#"query {
  issues(first: 50, filter: { state: { name: { neq: "Done" } } }) {
    nodes {
      identifier title
      state { name }
      assignee { name }
    }
  }
}"#;

/// One aliased sub-query per identifier, so the response keys map back to the input.
fn state_selection(idx: usize, identifier: &str) -> String {
    // JSON string literals are valid GraphQL string literals.
    let literal = serde_json::to_string(identifier).unwrap_or_else(|_| "\"\"".into());
    format!("  i{idx}: issue(id: {literal}) {{ identifier state {{ type }} }}")
}

pub fn states_query(identifiers: &[String]) -> String {
    let mut lines = vec!["query Issues {".to_string()];
    lines.extend(
        identifiers
            .iter()
            .enumerate()
            .map(|(idx, identifier)| state_selection(idx, identifier)),
    );
    lines.push("}".to_string());
    lines.join("\n")
}

/// Keys the batch result by the requested identifier. Linear answers with the
/// issue's current identifier, which differs once the issue moves team.
fn states_by_alias(
    identifiers: &[String],
    data: HashMap<String, Option<IssueStateNode>>,
) -> HashMap<String, StateType> {
    data.into_iter()
        .filter_map(|(alias, node)| {
            let idx: usize = alias.strip_prefix('i')?.parse().ok()?;
            let requested = identifiers.get(idx)?;
            let node = node?;
            if node.identifier != *requested {
                debug!(%requested, current = %node.identifier, "Issue was renamed");
            }
            Some((requested.clone(), node.state?.kind))
        })
        .collect()
}

fn create_input(issue: &NewIssue) -> Value {
    let mut input = json!({
        "teamId": issue.team_id,
        "title": issue.title,
        "description": issue.description,
    });
    if let Some(priority) = issue.priority {
        input["priority"] = json!(priority.as_linear());
    }
    if let Some(project_id) = &issue.project_id {
        input["projectId"] = json!(project_id);
    }
    if let Some(state_id) = &issue.state_id {
        input["stateId"] = json!(state_id);
    }
    json!({ "input": input })
}

#[derive(Deserialize)]
struct GqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GqlError>,
}

#[derive(Deserialize)]
struct GqlError {
    message: String,
}

impl<T> GqlResponse<T> {
    fn into_data(self) -> Result<T, LinearError> {
        let messages = self
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        match self.data {
            Some(data) => {
                if !messages.is_empty() {
                    warn!(errors = %messages, "Linear returned partial errors");
                }
                Ok(data)
            }
            None if !messages.is_empty() => Err(LinearError::Graphql(messages)),
            None => Err(LinearError::MissingData),
        }
    }
}

#[derive(Deserialize)]
struct Connection<T> {
    nodes: Vec<T>,
}

#[derive(Deserialize)]
struct ProjectsData {
    projects: Connection<ProjectNode>,
}

#[derive(Deserialize)]
struct ProjectNode {
    id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    issue_create: Option<MutationPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateData {
    issue_update: Option<MutationPayload>,
}

#[derive(Deserialize)]
struct MutationPayload {
    success: bool,
    issue: Option<IssueRef>,
}

#[derive(Deserialize)]
struct IssueIdData {
    issue: Option<IssueIdNode>,
}

#[derive(Deserialize)]
struct IssueIdNode {
    id: String,
}

#[derive(Deserialize)]
struct IssueStateNode {
    identifier: String,
    state: Option<StateNode>,
}

#[derive(Deserialize)]
struct StateNode {
    #[serde(rename = "type")]
    kind: StateType,
}

#[derive(Deserialize)]
struct TeamsData {
    teams: Connection<Team>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceInfoData {
    teams: Connection<Team>,
    workflow_states: Connection<WorkflowState>,
}

#[derive(Deserialize)]
struct OpenIssuesData {
    issues: Connection<IssueSummary>,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub team: Option<Team>,
}

pub struct WorkspaceInfo {
    pub teams: Vec<Team>,
    pub states: Vec<WorkflowState>,
}

#[derive(Debug, Deserialize)]
pub struct IssueSummary {
    pub identifier: String,
    pub title: String,
    pub state: Option<NamedNode>,
    pub assignee: Option<NamedNode>,
}

#[derive(Debug, Deserialize)]
pub struct NamedNode {
    pub name: String,
}

#[async_trait]
impl IssueProvider for LinearProvider {
    async fn projects(&self) -> Result<ProjectMap> {
        let data: ProjectsData = self.execute(PROJECTS_QUERY, None).await?;
        Ok(data
            .projects
            .nodes
            .into_iter()
            .map(|p| (p.name, p.id))
            .collect())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueRef> {
        let data: CreateData = self
            .execute(CREATE_MUTATION, Some(create_input(issue)))
            .await?;
        match data.issue_create {
            Some(MutationPayload {
                success: true,
                issue: Some(created),
            }) => Ok(created),
            _ => bail!("issueCreate did not succeed for '{}'", issue.title),
        }
    }

    async fn issue_states(&self, identifiers: &[String]) -> Result<HashMap<String, StateType>> {
        if identifiers.is_empty() {
            return Ok(HashMap::new());
        }

        let query = states_query(identifiers);
        match self
            .execute::<HashMap<String, Option<IssueStateNode>>>(&query, None)
            .await
        {
            Ok(data) => Ok(states_by_alias(identifiers, data)),
            // A single unknown identifier nulls the whole batch; resolve one by one instead.
            Err(e) if e.is_rejection() && identifiers.len() > 1 => {
                warn!(error = %e, "Batched status query rejected, querying issues individually");
                let mut states = HashMap::new();
                for identifier in identifiers {
                    if let Some(state) = self.single_issue_state(identifier).await? {
                        states.insert(identifier.clone(), state);
                    }
                }
                Ok(states)
            }
            Err(e) if e.is_rejection() => {
                debug!(error = %e, "Issue not resolvable");
                Ok(HashMap::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_issue_id(&self, identifier: &str) -> Result<Option<String>> {
        match self
            .execute::<IssueIdData>(ISSUE_ID_QUERY, Some(json!({ "id": identifier })))
            .await
        {
            Ok(data) => Ok(data.issue.map(|i| i.id)),
            Err(e) if e.is_rejection() => {
                debug!(identifier, error = %e, "Issue lookup rejected");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_issue(&self, id: &str, title: &str, description: &str) -> Result<()> {
        let variables = json!({
            "id": id,
            "input": { "title": title, "description": description },
        });
        let data: UpdateData = self.execute(UPDATE_MUTATION, Some(variables)).await?;
        match data.issue_update {
            Some(payload) if payload.success => Ok(()),
            _ => bail!("issueUpdate did not succeed for {id}"),
        }
    }

    async fn first_team(&self) -> Result<Option<Team>> {
        let data: TeamsData = self.execute(FIRST_TEAM_QUERY, None).await?;
        Ok(data.teams.nodes.into_iter().next())
    }
}
