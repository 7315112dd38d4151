//! In-memory stand-in for the remote service, used by unit tests.
//!
//! Commands are interpreted just enough for the lifecycle tests: `cat <file>`
//! reads an uploaded file, `echo <text>` echoes, anything else succeeds with
//! no output.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;

use super::error::SandboxError;
use super::service::{SandboxService, SessionCreated};
use super::types::*;

#[derive(Debug, Clone)]
struct FakeCommand {
    output: String,
    exit_code: i32,
    fetches: usize,
}

#[derive(Debug)]
pub struct FakeState {
    pub sandboxes: BTreeMap<String, Sandbox>,
    pub files: BTreeMap<(String, String), Vec<u8>>,
    pub sessions: BTreeSet<(String, String)>,
    commands: BTreeMap<String, FakeCommand>,
    next_id: u32,

    pub created: Vec<CreateSandboxRequest>,
    pub executed: Vec<(String, SessionExecuteRequest)>,
    pub start_calls: usize,
    pub delete_calls: usize,
    pub create_session_calls: usize,
    pub log_fetches: usize,

    /// State a sandbox lands in after `start` (normally running).
    pub start_lands_in: SandboxState,
    /// State a fresh sandbox is created in.
    pub created_in: SandboxState,
    pub fail_create: bool,
    pub fail_sessions: bool,
    pub fail_preview: bool,
    pub fail_upload: bool,
    /// Number of leading log fetches that error out.
    pub log_errors: usize,
    /// Log fetches a command needs before its result becomes visible.
    pub finish_after_fetches: usize,
    /// Commands never produce output or an exit code.
    pub hang: bool,
}

pub struct FakeService {
    pub state: StdMutex<FakeState>,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            state: StdMutex::new(FakeState {
                sandboxes: BTreeMap::new(),
                files: BTreeMap::new(),
                sessions: BTreeSet::new(),
                commands: BTreeMap::new(),
                next_id: 1,
                created: Vec::new(),
                executed: Vec::new(),
                start_calls: 0,
                delete_calls: 0,
                create_session_calls: 0,
                log_fetches: 0,
                start_lands_in: SandboxState::Running,
                created_in: SandboxState::Running,
                fail_create: false,
                fail_sessions: false,
                fail_preview: false,
                fail_upload: false,
                log_errors: 0,
                finish_after_fetches: 0,
                hang: false,
            }),
        }
    }

    /// Seed a sandbox in the given state and return its id.
    pub fn with_sandbox(&self, id: &str, state: SandboxState) -> String {
        let sandbox: Sandbox =
            serde_json::from_value(serde_json::json!({ "id": id, "state": "started" })).unwrap();
        let mut st = self.state.lock().unwrap();
        st.sandboxes.insert(
            id.to_string(),
            Sandbox {
                state,
                ..sandbox
            },
        );
        id.to_string()
    }

    pub fn configure(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn snapshot<R>(&self, f: impl FnOnce(&FakeState) -> R) -> R {
        f(&self.state.lock().unwrap())
    }
}

fn not_found(id: &str) -> SandboxError {
    SandboxError::NotFound(id.to_string())
}

/// Strip the `sh -c '...'` wrapper the executor adds.
fn unwrap_shell(command: &str) -> String {
    command
        .strip_prefix("sh -c '")
        .and_then(|rest| rest.strip_suffix('\''))
        .map(|inner| inner.replace("'\\''", "'"))
        .unwrap_or_else(|| command.to_string())
}

fn interpret(
    files: &BTreeMap<(String, String), Vec<u8>>,
    sandbox_id: &str,
    cwd: &str,
    command: &str,
) -> (String, i32) {
    let inner = unwrap_shell(command);
    if let Some(arg) = inner.strip_prefix("cat ") {
        let path = if arg.starts_with('/') {
            arg.to_string()
        } else {
            format!("{}/{}", cwd.trim_end_matches('/'), arg)
        };
        return match files.get(&(sandbox_id.to_string(), path)) {
            Some(bytes) => (String::from_utf8_lossy(bytes).into_owned(), 0),
            None => (format!("cat: {arg}: No such file or directory\n"), 1),
        };
    }
    if let Some(text) = inner.strip_prefix("echo ") {
        return (format!("{text}\n"), 0);
    }
    (String::new(), 0)
}

#[async_trait]
impl SandboxService for FakeService {
    async fn get(&self, sandbox_id: &str) -> Result<Sandbox, SandboxError> {
        let st = self.state.lock().unwrap();
        st.sandboxes
            .get(sandbox_id)
            .cloned()
            .ok_or_else(|| not_found(sandbox_id))
    }

    async fn create(&self, req: &CreateSandboxRequest) -> Result<Sandbox, SandboxError> {
        let mut st = self.state.lock().unwrap();
        if st.fail_create {
            return Err(SandboxError::Service("create sandbox returned 503: no capacity".into()));
        }
        let id = format!("{:08x}-5a4d-4c1e-9b1f-fake", st.next_id);
        st.next_id += 1;
        let sandbox = Sandbox {
            id: id.clone(),
            state: st.created_in,
            cpu: Some(req.cpu),
            memory: Some(req.memory),
            disk: Some(req.disk),
            env: req.env.clone(),
            labels: req.labels.clone().unwrap_or_default(),
            auto_stop_interval: Some(req.auto_stop_interval),
            auto_archive_interval: Some(req.auto_archive_interval),
            public: req.public,
            target: Some(req.target.clone()),
        };
        st.created.push(req.clone());
        st.sandboxes.insert(id, sandbox.clone());
        Ok(sandbox)
    }

    async fn start(&self, sandbox: &Sandbox) -> Result<(), SandboxError> {
        let mut st = self.state.lock().unwrap();
        st.start_calls += 1;
        let lands_in = st.start_lands_in;
        let entry = st
            .sandboxes
            .get_mut(&sandbox.id)
            .ok_or_else(|| not_found(&sandbox.id))?;
        entry.state = lands_in;
        Ok(())
    }

    async fn delete(&self, sandbox: &Sandbox) -> Result<(), SandboxError> {
        let mut st = self.state.lock().unwrap();
        st.delete_calls += 1;
        st.sandboxes
            .remove(&sandbox.id)
            .map(|_| ())
            .ok_or_else(|| not_found(&sandbox.id))
    }

    async fn upload_file(
        &self,
        sandbox: &Sandbox,
        bytes: Vec<u8>,
        path: &str,
    ) -> Result<(), SandboxError> {
        let mut st = self.state.lock().unwrap();
        if st.fail_upload {
            return Err(SandboxError::Service("upload file returned 500: disk full".into()));
        }
        st.files.insert((sandbox.id.clone(), path.to_string()), bytes);
        Ok(())
    }

    async fn create_session(
        &self,
        sandbox: &Sandbox,
        session_id: &str,
    ) -> Result<SessionCreated, SandboxError> {
        let mut st = self.state.lock().unwrap();
        st.create_session_calls += 1;
        if st.fail_sessions {
            return Err(SandboxError::Service("create session returned 500: toolbox down".into()));
        }
        if st.sessions.insert((sandbox.id.clone(), session_id.to_string())) {
            Ok(SessionCreated::Created)
        } else {
            Ok(SessionCreated::AlreadyExists)
        }
    }

    async fn execute_session_command(
        &self,
        sandbox: &Sandbox,
        session_id: &str,
        req: &SessionExecuteRequest,
    ) -> Result<SessionExecuteResponse, SandboxError> {
        let mut st = self.state.lock().unwrap();
        if !st.sessions.contains(&(sandbox.id.clone(), session_id.to_string())) {
            return Err(SandboxError::Service(format!(
                "execute session command returned 404: session {session_id} not found"
            )));
        }
        let cwd = req.cwd.clone().unwrap_or_else(|| "/".to_string());
        let (output, exit_code) = interpret(&st.files, &sandbox.id, &cwd, &req.command);
        let cmd_id = format!("cmd-{}", st.next_id);
        st.next_id += 1;
        st.commands.insert(
            cmd_id.clone(),
            FakeCommand {
                output,
                exit_code,
                fetches: 0,
            },
        );
        st.executed.push((session_id.to_string(), req.clone()));
        Ok(SessionExecuteResponse {
            cmd_id,
            output: None,
            exit_code: None,
        })
    }

    async fn get_session_command_logs(
        &self,
        _sandbox: &Sandbox,
        _session_id: &str,
        command_id: &str,
    ) -> Result<CommandLogs, SandboxError> {
        let mut st = self.state.lock().unwrap();
        st.log_fetches += 1;
        if st.log_errors > 0 {
            st.log_errors -= 1;
            return Err(SandboxError::Service("get command logs returned 502".into()));
        }
        let hang = st.hang;
        let finish_after = st.finish_after_fetches;
        let cmd = st
            .commands
            .get_mut(command_id)
            .ok_or_else(|| SandboxError::Service(format!("unknown command {command_id}")))?;
        cmd.fetches += 1;
        if hang || cmd.fetches <= finish_after {
            return Ok(CommandLogs::default());
        }
        Ok(CommandLogs {
            output: cmd.output.clone(),
            exit_code: Some(cmd.exit_code),
        })
    }

    async fn get_preview_link(
        &self,
        sandbox: &Sandbox,
        port: u16,
    ) -> Result<PreviewLink, SandboxError> {
        let st = self.state.lock().unwrap();
        if st.fail_preview {
            return Err(SandboxError::Service("get preview link returned 503".into()));
        }
        Ok(PreviewLink {
            url: format!("https://{port}-{}.proxy.daytona.works", sandbox.id),
            token: None,
        })
    }
}
