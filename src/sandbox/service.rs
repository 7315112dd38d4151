use async_trait::async_trait;

use super::error::SandboxError;
use super::types::*;

/// Boundary to the remote sandbox service.
///
/// The service owns sandbox state, scheduling and the container runtime; this
/// trait only names the request/response calls the client needs. `DaytonaApi`
/// is the HTTP implementation; tests substitute an in-memory fake.
#[async_trait]
pub trait SandboxService: Send + Sync {
    /// Fetch a sandbox snapshot. Unknown ids are `SandboxError::NotFound`.
    async fn get(&self, sandbox_id: &str) -> Result<Sandbox, SandboxError>;

    async fn create(&self, req: &CreateSandboxRequest) -> Result<Sandbox, SandboxError>;

    async fn start(&self, sandbox: &Sandbox) -> Result<(), SandboxError>;

    async fn delete(&self, sandbox: &Sandbox) -> Result<(), SandboxError>;

    // ── Files ───────────────────────────────────────────────────

    async fn upload_file(
        &self,
        sandbox: &Sandbox,
        bytes: Vec<u8>,
        path: &str,
    ) -> Result<(), SandboxError>;

    // ── Process sessions ────────────────────────────────────────

    /// Create a named session. An existing session with the same id is
    /// reported as `Ok(SessionCreated::AlreadyExists)`.
    async fn create_session(
        &self,
        sandbox: &Sandbox,
        session_id: &str,
    ) -> Result<SessionCreated, SandboxError>;

    async fn execute_session_command(
        &self,
        sandbox: &Sandbox,
        session_id: &str,
        req: &SessionExecuteRequest,
    ) -> Result<SessionExecuteResponse, SandboxError>;

    /// Output accumulated so far, plus the exit code once the command ended.
    async fn get_session_command_logs(
        &self,
        sandbox: &Sandbox,
        session_id: &str,
        command_id: &str,
    ) -> Result<CommandLogs, SandboxError>;

    // ── Ports ───────────────────────────────────────────────────

    async fn get_preview_link(&self, sandbox: &Sandbox, port: u16)
    -> Result<PreviewLink, SandboxError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCreated {
    Created,
    AlreadyExists,
}
