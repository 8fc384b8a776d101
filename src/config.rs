use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENDPOINT: &str = "https://api.linear.app/graphql";

/// Workflow state new issues are filed under ("Backlog").
pub const DEFAULT_BACKLOG_STATE_ID: &str = "125d3460-81be-4f22-b523-5017c318df22";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub linear: Option<LinearConfig>,
    #[serde(default)]
    pub meeting: MeetingConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearConfig {
    pub api_key: String,
    pub team_id: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_backlog_state_id")]
    pub backlog_state_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingConfig {
    #[serde(default = "default_meeting_dir")]
    pub notes_dir: PathBuf,
    #[serde(default = "default_summary_project")]
    pub summary_project: String,
    #[serde(default = "default_project_marker")]
    pub project_marker: String,
    #[serde(default = "default_link_marker")]
    pub link_marker: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_email_dir")]
    pub notes_dir: PathBuf,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            notes_dir: default_meeting_dir(),
            summary_project: default_summary_project(),
            project_marker: default_project_marker(),
            link_marker: default_link_marker(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            notes_dir: default_email_dir(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}

fn default_backlog_state_id() -> String {
    DEFAULT_BACKLOG_STATE_ID.into()
}

fn default_meeting_dir() -> PathBuf {
    PathBuf::from("meeting_notes")
}

fn default_email_dir() -> PathBuf {
    PathBuf::from("email_notes")
}

fn default_summary_project() -> String {
    "Operations & Infra".into()
}

fn default_project_marker() -> String {
    "| Project".into()
}

fn default_link_marker() -> String {
    "Link".into()
}

impl AppConfig {
    /// Linear credentials, or a configuration error telling the user where to put them.
    pub fn linear(&self) -> Result<&LinearConfig> {
        self.linear.as_ref().context(
            "LINEAR_API_KEY not set. Add it to .env, the environment, or [linear] in ~/.notesync/config.toml",
        )
    }

    /// Environment variables win over the config file.
    fn apply_env(&mut self, api_key: Option<String>, team_id: Option<String>) {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        let team_id = team_id.filter(|t| !t.trim().is_empty());

        if let Some(key) = api_key {
            let linear = self.linear.get_or_insert_with(|| LinearConfig {
                api_key: String::new(),
                team_id: None,
                endpoint: default_endpoint(),
                backlog_state_id: default_backlog_state_id(),
            });
            linear.api_key = key;
        }

        if let (Some(linear), Some(team)) = (&mut self.linear, team_id) {
            linear.team_id = Some(team);
        }
    }
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".notesync")
        .join("config.toml")
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        AppConfig::default()
    };

    config.apply_env(
        std::env::var("LINEAR_API_KEY").ok(),
        std::env::var("LINEAR_TEAM_ID").ok(),
    );
    Ok(config)
}
