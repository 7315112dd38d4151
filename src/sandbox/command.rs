//! Command execution inside a sandbox session.
//!
//! The service runs every command asynchronously and offers no completion
//! notification, so blocking mode is a local poll loop over the command logs.
//! Completion is decided by a `CompletionPolicy`; the default treats any
//! output or any exit code as "done", which ends early for commands that print
//! before they finish.

use std::time::Duration;

use super::error::SandboxError;
use super::outcome::Outcome;
use super::resolver::{StartWait, ensure_runnable};
use super::service::SandboxService;
use super::session::{command_session_id, ensure_session};
use super::shell::ShellCommand;
use super::types::*;

/// Decides whether a log snapshot means the command has finished.
pub type CompletionPolicy = fn(&CommandLogs) -> bool;

/// Default policy: an exit code or any output at all.
pub fn output_or_exit_code(logs: &CommandLogs) -> bool {
    logs.exit_code.is_some() || !logs.output.is_empty()
}

/// Strict policy: only an exit code counts.
pub fn exit_code_only(logs: &CommandLogs) -> bool {
    logs.exit_code.is_some()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Blocking mode result. `timed_out` is set when the poll budget ran out.
    Completed {
        output: String,
        exit_code: i32,
        timed_out: bool,
    },
    /// Non-blocking mode: the command was submitted and left running.
    Started {
        command_id: String,
        session_id: String,
    },
}

pub struct CommandExecutor<'a> {
    service: &'a dyn SandboxService,
    start_wait: StartWait,
    poll_interval: Duration,
    policy: CompletionPolicy,
}

impl<'a> CommandExecutor<'a> {
    pub fn new(service: &'a dyn SandboxService, start_wait: StartWait, poll_interval: Duration) -> Self {
        Self {
            service,
            start_wait,
            poll_interval,
            policy: output_or_exit_code,
        }
    }

    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn execute(
        &self,
        sandbox_id: &str,
        command: &ShellCommand,
        mode: ExecMode,
    ) -> Result<Outcome<CommandOutput>, SandboxError> {
        let sandbox = ensure_runnable(self.service, sandbox_id, self.start_wait).await?;

        let session_id = command_session_id(sandbox_id);
        if let Some(reason) = ensure_session(self.service, &sandbox, &session_id).await.reason() {
            // Submission below reports the real failure if the session is missing.
            tracing::debug!(sandbox_id = %sandbox_id, reason = %reason, "continuing without confirmed session");
        }

        let req = SessionExecuteRequest {
            command: command.render(),
            run_async: true,
            cwd: Some(WORKSPACE_ROOT.to_string()),
        };
        tracing::info!(
            sandbox_id = %sandbox_id,
            session_id = %session_id,
            command = %req.command,
            ?mode,
            "submitting command"
        );
        let response = self
            .service
            .execute_session_command(&sandbox, &session_id, &req)
            .await?;

        match mode {
            ExecMode::NonBlocking => Ok(Outcome::Ok(CommandOutput::Started {
                command_id: response.cmd_id,
                session_id,
            })),
            ExecMode::Blocking { timeout_secs } => Ok(self
                .wait_for_completion(&sandbox, &session_id, &response, timeout_secs)
                .await),
        }
    }

    /// Number of polls that fit in `timeout_secs` at the configured interval.
    fn poll_budget(&self, timeout_secs: u64) -> u64 {
        let timeout_ms = Duration::from_secs(timeout_secs).as_millis();
        let interval_ms = self.poll_interval.as_millis().max(1);
        u64::try_from(timeout_ms.div_ceil(interval_ms)).unwrap_or(u64::MAX)
    }

    async fn wait_for_completion(
        &self,
        sandbox: &Sandbox,
        session_id: &str,
        response: &SessionExecuteResponse,
        timeout_secs: u64,
    ) -> Outcome<CommandOutput> {
        let command_id = response.cmd_id.as_str();

        for attempt in 0..self.poll_budget(timeout_secs) {
            match self
                .service
                .get_session_command_logs(sandbox, session_id, command_id)
                .await
            {
                Ok(logs) if (self.policy)(&logs) => {
                    tracing::debug!(command_id = %command_id, attempt, "command completed");
                    return Outcome::Ok(completed(logs, response.exit_code, false));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(command_id = %command_id, attempt, error = %e, "log poll failed");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        tracing::warn!(
            sandbox_id = %sandbox.id,
            command_id = %command_id,
            timeout_secs,
            "command did not complete in time, returning partial output"
        );
        let logs = match self
            .service
            .get_session_command_logs(sandbox, session_id, command_id)
            .await
        {
            Ok(logs) => logs,
            Err(e) => {
                tracing::warn!(command_id = %command_id, error = %e, "final log fetch failed");
                CommandLogs::default()
            }
        };
        Outcome::degraded(
            completed(logs, response.exit_code, true),
            format!("command {command_id} did not complete within {timeout_secs}s"),
        )
    }
}

/// A missing exit code is reported as 0.
fn completed(logs: CommandLogs, submitted_exit_code: Option<i32>, timed_out: bool) -> CommandOutput {
    CommandOutput::Completed {
        exit_code: logs.exit_code.or(submitted_exit_code).unwrap_or(0),
        output: logs.output,
        timed_out,
    }
}
