use std::time::Duration;

use tokio::time::Instant;

use super::error::SandboxError;
use super::service::SandboxService;
use super::types::{Sandbox, SandboxState};

/// Bound on how long we wait for a sandbox to reach `running`.
#[derive(Debug, Clone, Copy)]
pub struct StartWait {
    pub timeout: Duration,
    pub interval: Duration,
}

/// Fetch a sandbox and make sure it can accept work.
///
/// Stopped or archived sandboxes get exactly one start call, then are
/// re-fetched until running or until `wait.timeout` elapses. Any other state
/// is returned as-is without a start call.
pub async fn ensure_runnable(
    service: &dyn SandboxService,
    sandbox_id: &str,
    wait: StartWait,
) -> Result<Sandbox, SandboxError> {
    let sandbox = service.get(sandbox_id).await?;
    if !sandbox.state.needs_start() {
        return Ok(sandbox);
    }

    tracing::info!(
        sandbox_id = %sandbox_id,
        state = ?sandbox.state,
        "sandbox is idle, starting it"
    );
    service.start(&sandbox).await?;
    wait_until_running(service, sandbox_id, wait).await
}

/// Re-fetch until the sandbox reports `running`.
pub async fn wait_until_running(
    service: &dyn SandboxService,
    sandbox_id: &str,
    wait: StartWait,
) -> Result<Sandbox, SandboxError> {
    let started = Instant::now();
    loop {
        let sandbox = service.get(sandbox_id).await?;
        match sandbox.state {
            SandboxState::Running => {
                tracing::debug!(
                    sandbox_id = %sandbox_id,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "sandbox is running"
                );
                return Ok(sandbox);
            }
            SandboxState::Error | SandboxState::Destroyed => {
                return Err(SandboxError::Service(format!(
                    "sandbox {sandbox_id} entered state {:?} while starting",
                    sandbox.state
                )));
            }
            _ => {}
        }

        if started.elapsed() >= wait.timeout {
            return Err(SandboxError::StartTimeout {
                id: sandbox_id.to_string(),
                waited: wait.timeout,
            });
        }
        tokio::time::sleep(wait.interval).await;
    }
}
