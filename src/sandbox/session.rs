use super::outcome::Outcome;
use super::service::{SandboxService, SessionCreated};
use super::types::Sandbox;

/// Length of the sandbox-id prefix used in derived session ids.
const SESSION_ID_PREFIX_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Existing,
}

/// Session id shared by every command run against one sandbox.
pub fn command_session_id(sandbox_id: &str) -> String {
    let prefix: String = sandbox_id.chars().take(SESSION_ID_PREFIX_LEN).collect();
    format!("cmd-{prefix}")
}

/// Make sure `session_id` exists in the sandbox.
///
/// Never fails: an existing session is `Existing`, and any other failure is
/// reported as `Degraded`. If the session really is missing, the next command
/// submission surfaces the error.
pub async fn ensure_session(
    service: &dyn SandboxService,
    sandbox: &Sandbox,
    session_id: &str,
) -> Outcome<SessionState> {
    match service.create_session(sandbox, session_id).await {
        Ok(SessionCreated::Created) => {
            tracing::debug!(sandbox_id = %sandbox.id, session_id = %session_id, "session created");
            Outcome::Ok(SessionState::Created)
        }
        Ok(SessionCreated::AlreadyExists) => Outcome::Ok(SessionState::Existing),
        Err(e) => {
            tracing::warn!(
                sandbox_id = %sandbox.id,
                session_id = %session_id,
                error = %e,
                "could not create session"
            );
            Outcome::degraded(
                SessionState::Existing,
                format!("session {session_id} could not be created: {e}"),
            )
        }
    }
}
