//! Sandbox creation with the desktop image defaults.
//!
//! Only the create call itself can fail provisioning. Waiting for the sandbox
//! to come up, launching supervisord and resolving preview links are
//! best-effort and degrade the outcome instead.

use std::collections::BTreeMap;

use super::error::SandboxError;
use super::outcome::Outcome;
use super::resolver::{StartWait, wait_until_running};
use super::service::SandboxService;
use super::session::ensure_session;
use super::shell::ShellCommand;
use super::types::*;

pub const VNC_PORT: u16 = 6080;
pub const WEBSITE_PORT: u16 = 8080;

const RESOURCES: Resources = Resources {
    cpu: 2,
    memory: 4,
    disk: 5,
};
const AUTO_STOP_MINUTES: u32 = 15;
const AUTO_ARCHIVE_MINUTES: u32 = 24 * 60;

const SUPERVISOR_SESSION: &str = "supervisord-session";
const SUPERVISOR_CONF: &str = "/etc/supervisor/conf.d/supervisord.conf";

/// Where and from what to create sandboxes.
#[derive(Debug, Clone)]
pub struct ProvisionSpec {
    pub image: String,
    pub target: String,
    pub wait: StartWait,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub sandbox_id: SandboxId,
    pub vnc_url: String,
    pub website_url: String,
}

/// Env vars for the virtual display, VNC and the bundled browser.
pub fn display_env(password: &str) -> BTreeMap<String, String> {
    [
        ("CHROME_PERSISTENT_SESSION", "true"),
        ("RESOLUTION", "1024x768x24"),
        ("RESOLUTION_WIDTH", "1024"),
        ("RESOLUTION_HEIGHT", "768"),
        ("VNC_PASSWORD", password),
        ("ANONYMIZED_TELEMETRY", "false"),
        ("CHROME_PATH", ""),
        ("CHROME_USER_DATA", ""),
        ("CHROME_DEBUGGING_PORT", "9222"),
        ("CHROME_DEBUGGING_HOST", "localhost"),
        ("CHROME_CDP", ""),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn creation_request(
    spec: &ProvisionSpec,
    password: &str,
    project_label: Option<&str>,
) -> CreateSandboxRequest {
    let labels = project_label
        .filter(|label| !label.is_empty())
        .map(|label| BTreeMap::from([("id".to_string(), label.to_string())]));

    CreateSandboxRequest {
        image: spec.image.clone(),
        public: true,
        labels,
        env: display_env(password),
        target: spec.target.clone(),
        cpu: RESOURCES.cpu,
        memory: RESOURCES.memory,
        disk: RESOURCES.disk,
        auto_stop_interval: AUTO_STOP_MINUTES,
        auto_archive_interval: AUTO_ARCHIVE_MINUTES,
    }
}

/// Deterministic URL used when the service cannot resolve a preview link.
pub fn fallback_preview_url(port: u16, sandbox_id: &str) -> String {
    format!("https://{port}-{sandbox_id}.daytona.work")
}

pub async fn provision(
    service: &dyn SandboxService,
    spec: &ProvisionSpec,
    password: &str,
    project_label: Option<&str>,
) -> Result<Outcome<Provisioned>, SandboxError> {
    let req = creation_request(spec, password, project_label);
    let created = service.create(&req).await?;
    let sandbox_id = created.id.clone();

    let mut reasons = Vec::new();

    let sandbox = match wait_until_running(service, &sandbox_id, spec.wait).await {
        Ok(sandbox) => sandbox,
        Err(e) => {
            tracing::warn!(sandbox_id = %sandbox_id, error = %e, "sandbox not running yet");
            reasons.push(format!("sandbox not confirmed running: {e}"));
            created
        }
    };

    if let Some(reason) = launch_supervisor(service, &sandbox).await {
        reasons.push(reason);
    }

    let (vnc_url, vnc_reason) = preview_url(service, &sandbox, VNC_PORT).await.into_parts();
    let (website_url, website_reason) =
        preview_url(service, &sandbox, WEBSITE_PORT).await.into_parts();
    reasons.extend(vnc_reason);
    reasons.extend(website_reason);

    tracing::info!(
        sandbox_id = %sandbox_id,
        vnc_url = %vnc_url,
        website_url = %website_url,
        degraded = !reasons.is_empty(),
        "sandbox provisioned"
    );

    let provisioned = Provisioned {
        sandbox_id,
        vnc_url,
        website_url,
    };
    if reasons.is_empty() {
        Ok(Outcome::Ok(provisioned))
    } else {
        Ok(Outcome::degraded(provisioned, reasons.join("; ")))
    }
}

/// Start supervisord in its own session. Returns a reason on failure.
async fn launch_supervisor(service: &dyn SandboxService, sandbox: &Sandbox) -> Option<String> {
    if let Some(reason) = ensure_session(service, sandbox, SUPERVISOR_SESSION).await.reason() {
        return Some(format!("supervisor not started: {reason}"));
    }

    let req = SessionExecuteRequest {
        command: ShellCommand::argv(["exec", "/usr/bin/supervisord", "-n", "-c", SUPERVISOR_CONF])
            .render(),
        run_async: true,
        cwd: None,
    };
    match service
        .execute_session_command(sandbox, SUPERVISOR_SESSION, &req)
        .await
    {
        Ok(resp) => {
            tracing::debug!(sandbox_id = %sandbox.id, command_id = %resp.cmd_id, "supervisord launched");
            None
        }
        Err(e) => {
            tracing::warn!(sandbox_id = %sandbox.id, error = %e, "supervisord launch failed");
            Some(format!("supervisor not started: {e}"))
        }
    }
}

async fn preview_url(service: &dyn SandboxService, sandbox: &Sandbox, port: u16) -> Outcome<String> {
    match service.get_preview_link(sandbox, port).await {
        Ok(link) => Outcome::Ok(link.url),
        Err(e) => {
            tracing::warn!(sandbox_id = %sandbox.id, port, error = %e, "preview link unavailable");
            Outcome::degraded(
                fallback_preview_url(port, &sandbox.id),
                format!("preview link for port {port} unavailable: {e}"),
            )
        }
    }
}
