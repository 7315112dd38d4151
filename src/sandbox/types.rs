use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Base directory inside every sandbox; files land here and commands run here.
pub const WORKSPACE_ROOT: &str = "/workspace";

pub type SandboxId = String;

// ── Sandbox snapshot ────────────────────────────────────────────────

/// Lifecycle state as reported by the service. The service owns the
/// authoritative value; anything we hold is a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxState {
    Creating,
    Starting,
    #[serde(rename = "started", alias = "running")]
    Running,
    Stopping,
    Stopped,
    Archived,
    #[serde(alias = "deleted")]
    Destroyed,
    Error,
    #[serde(other)]
    Unknown,
}

impl SandboxState {
    /// Idle states that need an explicit start before use.
    pub fn needs_start(self) -> bool {
        matches!(self, SandboxState::Stopped | SandboxState::Archived)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sandbox {
    pub id: SandboxId,
    pub state: SandboxState,
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub memory: Option<u32>,
    #[serde(default)]
    pub disk: Option<u32>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub auto_stop_interval: Option<u32>,
    #[serde(default)]
    pub auto_archive_interval: Option<u32>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub target: Option<String>,
}

// ── Creation ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    pub cpu: u32,
    /// GB
    pub memory: u32,
    /// GB
    pub disk: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSandboxRequest {
    pub image: String,
    pub public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    pub env: BTreeMap<String, String>,
    pub target: String,
    pub cpu: u32,
    pub memory: u32,
    pub disk: u32,
    /// Minutes of idleness before the service stops the sandbox.
    pub auto_stop_interval: u32,
    /// Minutes a stopped sandbox waits before being archived.
    pub auto_archive_interval: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreviewLink {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
}

// ── Process sessions ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExecuteRequest {
    pub command: String,
    pub run_async: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExecuteResponse {
    pub cmd_id: String,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

/// Accumulated output of a session command at the time of the fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLogs {
    pub output: String,
    pub exit_code: Option<i32>,
}

/// Client-side execution mode. The transport always runs commands
/// asynchronously; blocking means we poll for completion ourselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Blocking { timeout_secs: u64 },
    NonBlocking,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_deserializes_service_payload() {
        let json = r#"{
            "id": "4f1c2a9e-77aa",
            "state": "started",
            "cpu": 2, "memory": 4, "disk": 5,
            "env": {"VNC_PASSWORD": "secret"},
            "labels": {"id": "proj-1"},
            "autoStopInterval": 15,
            "autoArchiveInterval": 1440,
            "public": true,
            "target": "us"
        }"#;
        let sandbox: Sandbox = serde_json::from_str(json).unwrap();
        assert_eq!(sandbox.state, SandboxState::Running);
        assert_eq!(sandbox.auto_archive_interval, Some(1440));
        assert_eq!(sandbox.labels.get("id").map(String::as_str), Some("proj-1"));
    }

    #[test]
    fn unknown_state_maps_to_unknown() {
        let sandbox: Sandbox =
            serde_json::from_str(r#"{"id":"a","state":"pulling_snapshot"}"#).unwrap();
        assert_eq!(sandbox.state, SandboxState::Unknown);
    }

    #[test]
    fn state_aliases() {
        let running: SandboxState = serde_json::from_str(r#""running""#).unwrap();
        let deleted: SandboxState = serde_json::from_str(r#""deleted""#).unwrap();
        assert_eq!(running, SandboxState::Running);
        assert_eq!(deleted, SandboxState::Destroyed);
    }

    #[test]
    fn only_idle_states_need_start() {
        assert!(SandboxState::Stopped.needs_start());
        assert!(SandboxState::Archived.needs_start());
        assert!(!SandboxState::Running.needs_start());
        assert!(!SandboxState::Creating.needs_start());
        assert!(!SandboxState::Unknown.needs_start());
    }

    #[test]
    fn create_request_omits_missing_labels() {
        let req = CreateSandboxRequest {
            image: "img:1".into(),
            public: true,
            labels: None,
            env: BTreeMap::new(),
            target: "us".into(),
            cpu: 2,
            memory: 4,
            disk: 5,
            auto_stop_interval: 15,
            auto_archive_interval: 1440,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("labels").is_none());
        assert_eq!(json["autoStopInterval"], 15);
        assert_eq!(json["autoArchiveInterval"], 1440);
    }

    #[test]
    fn execute_request_is_camel_case() {
        let req = SessionExecuteRequest {
            command: "sh -c 'ls'".into(),
            run_async: true,
            cwd: Some(WORKSPACE_ROOT.into()),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["runAsync"], true);
        assert_eq!(json["cwd"], "/workspace");
    }
}
