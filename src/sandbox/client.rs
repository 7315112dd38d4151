use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

use super::command::{CommandExecutor, CommandOutput};
use super::daytona::DaytonaApi;
use super::outcome::Outcome;
use super::provision::{ProvisionSpec, Provisioned, provision};
use super::report::OpResult;
use super::resolver::StartWait;
use super::service::SandboxService;
use super::shell::ShellCommand;
use super::types::ExecMode;
use super::{files, teardown};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub image: String,
    pub target: String,
    pub vnc_password: String,
    pub start_wait: StartWait,
    pub poll_interval: Duration,
}

impl ClientSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            image: config.sandbox_image.clone(),
            target: config.target.clone(),
            vnc_password: config.vnc_password.clone(),
            start_wait: StartWait {
                timeout: config.start_timeout,
                interval: config.poll_interval,
            },
            poll_interval: config.poll_interval,
        }
    }
}

/// Entry point for the four sandbox operations.
///
/// Every operation returns an [`OpResult`]; nothing here panics or returns an
/// error to the caller.
#[derive(Clone)]
pub struct SandboxClient {
    service: Arc<dyn SandboxService>,
    settings: ClientSettings,
}

impl SandboxClient {
    pub fn new(service: Arc<dyn SandboxService>, settings: ClientSettings) -> Self {
        Self { service, settings }
    }

    pub fn from_config(config: &Config, http: reqwest::Client) -> Self {
        let api = DaytonaApi::new(http, config.server_url.clone(), config.api_key.clone());
        Self::new(Arc::new(api), ClientSettings::from_config(config))
    }

    /// Provision a desktop sandbox. `password` overrides the configured VNC
    /// password; `project_label` tags the sandbox when non-empty.
    pub async fn create(&self, password: Option<&str>, project_label: Option<&str>) -> OpResult {
        let spec = ProvisionSpec {
            image: self.settings.image.clone(),
            target: self.settings.target.clone(),
            wait: self.settings.start_wait,
        };
        let password = password
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.settings.vnc_password);

        let result = provision(self.service.as_ref(), &spec, password, project_label).await;
        OpResult::from_result(result, |p: Provisioned| OpResult {
            sandbox_id: Some(p.sandbox_id),
            vnc_url: Some(p.vnc_url),
            website_url: Some(p.website_url),
            ..OpResult::ok()
        })
    }

    pub async fn write_file(&self, sandbox_id: &str, path: &str, content: &str) -> OpResult {
        let result = files::write_file(
            self.service.as_ref(),
            sandbox_id,
            path,
            content,
            self.settings.start_wait,
        )
        .await;
        OpResult::from_result(result.map(Outcome::Ok), |_| {
            let relative = path.trim_start_matches('/');
            OpResult::ok().message(format!("File {relative} written successfully"))
        })
    }

    /// Run a shell command in the sandbox's command session. Blocking calls
    /// wait up to `timeout_secs` for completion.
    pub async fn run_command(
        &self,
        sandbox_id: &str,
        command: &str,
        blocking: bool,
        timeout_secs: u64,
    ) -> OpResult {
        let mode = if blocking {
            ExecMode::Blocking { timeout_secs }
        } else {
            ExecMode::NonBlocking
        };
        let executor = CommandExecutor::new(
            self.service.as_ref(),
            self.settings.start_wait,
            self.settings.poll_interval,
        );

        let result = executor
            .execute(sandbox_id, &ShellCommand::from(command), mode)
            .await;
        OpResult::from_result(result, |output| match output {
            CommandOutput::Completed {
                output,
                exit_code,
                timed_out,
            } => OpResult {
                output: Some(output),
                exit_code: Some(exit_code),
                timed_out,
                ..OpResult::ok()
            },
            CommandOutput::Started {
                command_id,
                session_id,
            } => OpResult {
                command_id: Some(command_id),
                session_id: Some(session_id),
                ..OpResult::ok().message("Command started (non-blocking)")
            },
        })
    }

    pub async fn delete(&self, sandbox_id: &str) -> OpResult {
        let result = teardown::delete(self.service.as_ref(), sandbox_id).await;
        OpResult::from_result(result.map(Outcome::Ok), |()| {
            OpResult::ok().message(format!("Sandbox {sandbox_id} deleted"))
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────
