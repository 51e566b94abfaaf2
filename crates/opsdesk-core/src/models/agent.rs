use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Action name the backend routes free-text queries through
pub const NATURAL_LANGUAGE_ACTION: &str = "process_natural_language";

/// Backend agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Clock,
    Task,
    Report,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Clock, AgentKind::Task, AgentKind::Report];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Clock => "clock",
            AgentKind::Task => "task",
            AgentKind::Report => "report",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| format!("Unknown agent: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AgentRequest {
    pub agent_type: String,
    pub action: String,
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl AgentRequest {
    /// Structured action with explicit parameters
    pub fn action(agent: AgentKind, action: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            agent_type: agent.as_str().to_string(),
            action: action.into(),
            parameters,
            context: Map::new(),
        }
    }

    /// Free-text chat message for an agent
    pub fn chat(agent: AgentKind, query: impl Into<String>) -> Self {
        let mut parameters = Map::new();
        parameters.insert("query".to_string(), Value::String(query.into()));
        Self::action(agent, NATURAL_LANGUAGE_ACTION, parameters)
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AgentResponse {
    pub success: bool,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub agent: String,
    #[serde(default)]
    pub execution_time_ms: i64,
    #[serde(default)]
    pub action_id: Option<i64>,
}

impl AgentResponse {
    /// Text to show in the conversation: the output, or the error on failure
    pub fn reply(&self) -> &str {
        if self.success {
            self.output.as_deref().unwrap_or("")
        } else {
            self.error
                .as_deref()
                .or(self.output.as_deref())
                .unwrap_or("The agent did not return a response")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub available: bool,
}

/// Agents keyed by agent type
pub type AgentCatalog = BTreeMap<String, AgentInfo>;

/// Query filters and paging for the action history
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub agent_type: Option<AgentKind>,
    pub success_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AgentActionSummary {
    pub id: i64,
    pub agent_name: String,
    pub action_type: String,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub execution_time_ms: Option<i64>,
    pub timestamp: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub overridden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AgentHistory {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    #[serde(default)]
    pub actions: Vec<AgentActionSummary>,
}

impl AgentHistory {
    /// More rows exist past this page
    pub fn has_more(&self) -> bool {
        (self.offset as u64 + self.actions.len() as u64) < self.total
    }

    /// Share of successful actions on this page
    pub fn success_rate(&self) -> Option<f64> {
        if self.actions.is_empty() {
            return None;
        }
        let ok = self.actions.iter().filter(|a| a.success).count();
        Some(ok as f64 / self.actions.len() as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ActionUser {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AgentActionDetail {
    pub id: i64,
    pub agent_name: String,
    pub action_type: String,
    #[serde(default)]
    pub input_data: Value,
    #[serde(default)]
    pub output_data: Value,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub execution_time_ms: Option<i64>,
    pub timestamp: String,
    #[serde(default)]
    pub user: Option<ActionUser>,
    #[serde(default)]
    pub overridden: bool,
    #[serde(default)]
    pub overridden_by: Option<ActionUser>,
    #[serde(default)]
    pub override_reason: Option<String>,
}

/// Manager override of a recorded agent action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AgentOverride {
    pub reason: String,
    #[serde(default)]
    pub corrective_action: Map<String, Value>,
}
