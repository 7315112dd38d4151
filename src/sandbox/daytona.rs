//! HTTP client for the Daytona sandbox API.
//!
//! Control plane: `POST /sandbox`, `GET /sandbox/{id}`, `POST /sandbox/{id}/start`,
//! `DELETE /sandbox/{id}`, `GET /sandbox/{id}/ports/{port}/preview-url`.
//! Toolbox (inside the sandbox): `/toolbox/{id}/toolbox/files/upload` and
//! `/toolbox/{id}/toolbox/process/session/...`.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;

use super::error::SandboxError;
use super::service::{SandboxService, SessionCreated};
use super::types::*;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandStatus {
    #[serde(default)]
    exit_code: Option<i32>,
}

/// REST client for one Daytona account.
#[derive(Debug, Clone)]
pub struct DaytonaApi {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl DaytonaApi {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key,
            client,
        }
    }

    fn sandbox_url(&self, sandbox_id: &str) -> String {
        format!("{}/sandbox/{}", self.base_url, sandbox_id)
    }

    fn toolbox_url(&self, sandbox_id: &str, path: &str) -> String {
        format!("{}/toolbox/{}/toolbox/{}", self.base_url, sandbox_id, path)
    }

    fn session_url(&self, sandbox_id: &str, session_id: &str) -> String {
        self.toolbox_url(sandbox_id, &format!("process/session/{session_id}"))
    }
}

/// Control-plane calls on `/sandbox/{id}`: a 404 means the sandbox is unknown.
async fn check_sandbox(resp: Response, op: &str, sandbox_id: &str) -> Result<Response, SandboxError> {
    if resp.status() == StatusCode::NOT_FOUND {
        return Err(SandboxError::NotFound(sandbox_id.to_string()));
    }
    check(resp, op).await
}

/// Map non-2xx responses to service errors carrying the body. Toolbox and
/// port calls use this directly, so a missing session or command stays a
/// service error.
async fn check(resp: Response, op: &str) -> Result<Response, SandboxError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SandboxError::Service(format!("{op} returned {status}: {body}")));
    }
    Ok(resp)
}

#[async_trait]
impl SandboxService for DaytonaApi {
    async fn get(&self, sandbox_id: &str) -> Result<Sandbox, SandboxError> {
        let resp = self
            .client
            .get(self.sandbox_url(sandbox_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SandboxError::transport(format!("get sandbox {sandbox_id} failed"), e))?;

        check_sandbox(resp, "get sandbox", sandbox_id)
            .await?
            .json::<Sandbox>()
            .await
            .map_err(|e| SandboxError::Serde(format!("failed to parse sandbox: {e}")))
    }

    async fn create(&self, req: &CreateSandboxRequest) -> Result<Sandbox, SandboxError> {
        let url = format!("{}/sandbox", self.base_url);

        tracing::info!(image = %req.image, target = %req.target, "creating sandbox");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await
            .map_err(|e| SandboxError::transport("create sandbox failed", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SandboxError::Service(format!(
                "create sandbox returned {status}: {body}"
            )));
        }

        let sandbox = resp
            .json::<Sandbox>()
            .await
            .map_err(|e| SandboxError::Serde(format!("failed to parse sandbox: {e}")))?;

        tracing::info!(sandbox_id = %sandbox.id, state = ?sandbox.state, "sandbox created");
        Ok(sandbox)
    }

    async fn start(&self, sandbox: &Sandbox) -> Result<(), SandboxError> {
        let url = format!("{}/start", self.sandbox_url(&sandbox.id));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SandboxError::transport(format!("start sandbox {} failed", sandbox.id), e))?;

        check_sandbox(resp, "start sandbox", &sandbox.id).await?;
        Ok(())
    }

    async fn delete(&self, sandbox: &Sandbox) -> Result<(), SandboxError> {
        tracing::info!(sandbox_id = %sandbox.id, "deleting sandbox");

        let resp = self
            .client
            .delete(self.sandbox_url(&sandbox.id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| {
                SandboxError::transport(format!("delete sandbox {} failed", sandbox.id), e)
            })?;

        check_sandbox(resp, "delete sandbox", &sandbox.id).await?;
        tracing::info!(sandbox_id = %sandbox.id, "sandbox deleted");
        Ok(())
    }

    async fn upload_file(
        &self,
        sandbox: &Sandbox,
        bytes: Vec<u8>,
        path: &str,
    ) -> Result<(), SandboxError> {
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        );

        let resp = self
            .client
            .post(self.toolbox_url(&sandbox.id, "files/upload"))
            .bearer_auth(&self.api_key)
            .query(&[("path", path)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| SandboxError::transport(format!("upload to {path} failed"), e))?;

        check(resp, "upload file").await?;
        Ok(())
    }

    async fn create_session(
        &self,
        sandbox: &Sandbox,
        session_id: &str,
    ) -> Result<SessionCreated, SandboxError> {
        let resp = self
            .client
            .post(self.toolbox_url(&sandbox.id, "process/session"))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "sessionId": session_id }))
            .send()
            .await
            .map_err(|e| {
                SandboxError::transport(format!("create session {session_id} failed"), e)
            })?;

        let status = resp.status();
        if status == StatusCode::CONFLICT {
            return Ok(SessionCreated::AlreadyExists);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if body.to_ascii_lowercase().contains("already exists") {
                return Ok(SessionCreated::AlreadyExists);
            }
            return Err(SandboxError::Service(format!(
                "create session returned {status}: {body}"
            )));
        }
        Ok(SessionCreated::Created)
    }

    async fn execute_session_command(
        &self,
        sandbox: &Sandbox,
        session_id: &str,
        req: &SessionExecuteRequest,
    ) -> Result<SessionExecuteResponse, SandboxError> {
        let url = format!("{}/exec", self.session_url(&sandbox.id, session_id));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await
            .map_err(|e| {
                SandboxError::transport(format!("execute in session {session_id} failed"), e)
            })?;

        check(resp, "execute session command")
            .await?
            .json::<SessionExecuteResponse>()
            .await
            .map_err(|e| SandboxError::Serde(format!("failed to parse execute response: {e}")))
    }

    async fn get_session_command_logs(
        &self,
        sandbox: &Sandbox,
        session_id: &str,
        command_id: &str,
    ) -> Result<CommandLogs, SandboxError> {
        let command_url = format!(
            "{}/command/{}",
            self.session_url(&sandbox.id, session_id),
            command_id
        );

        let resp = self
            .client
            .get(format!("{command_url}/logs"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SandboxError::transport(format!("fetch logs for {command_id} failed"), e))?;
        let output = check(resp, "get command logs")
            .await?
            .text()
            .await
            .map_err(|e| SandboxError::transport("failed to read command logs", e))?;

        let resp = self
            .client
            .get(&command_url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| {
                SandboxError::transport(format!("fetch status for {command_id} failed"), e)
            })?;
        let status = check(resp, "get command")
            .await?
            .json::<CommandStatus>()
            .await
            .map_err(|e| SandboxError::Serde(format!("failed to parse command status: {e}")))?;

        Ok(CommandLogs {
            output,
            exit_code: status.exit_code,
        })
    }

    async fn get_preview_link(
        &self,
        sandbox: &Sandbox,
        port: u16,
    ) -> Result<PreviewLink, SandboxError> {
        let url = format!("{}/ports/{}/preview-url", self.sandbox_url(&sandbox.id), port);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SandboxError::transport(format!("preview link for port {port} failed"), e))?;

        check(resp, "get preview link")
            .await?
            .json::<PreviewLink>()
            .await
            .map_err(|e| SandboxError::Serde(format!("failed to parse preview link: {e}")))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
