use std::path::{Component, Path};

use super::error::SandboxError;
use super::resolver::{StartWait, ensure_runnable};
use super::service::SandboxService;
use super::types::WORKSPACE_ROOT;

/// Anchor a caller path under the workspace root.
///
/// Leading separators are stripped, so `/src/a.txt` and `src/a.txt` both land
/// at `/workspace/src/a.txt`. Empty paths and `..` components are rejected.
pub fn workspace_path(path: &str) -> Result<String, SandboxError> {
    let relative = path.trim_start_matches('/');
    if relative.is_empty() {
        return Err(SandboxError::InvalidPath(format!("{path:?} names no file")));
    }
    if Path::new(relative)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(SandboxError::InvalidPath(format!(
            "{path} escapes {WORKSPACE_ROOT}"
        )));
    }
    Ok(format!("{WORKSPACE_ROOT}/{relative}"))
}

/// Upload `content` as UTF-8 to `path` under the workspace. Returns the
/// absolute path written.
pub async fn write_file(
    service: &dyn SandboxService,
    sandbox_id: &str,
    path: &str,
    content: &str,
    wait: StartWait,
) -> Result<String, SandboxError> {
    let full_path = workspace_path(path)?;
    let sandbox = ensure_runnable(service, sandbox_id, wait).await?;

    service
        .upload_file(&sandbox, content.as_bytes().to_vec(), &full_path)
        .await?;

    tracing::info!(
        sandbox_id = %sandbox_id,
        path = %full_path,
        bytes = content.len(),
        "file written"
    );
    Ok(full_path)
}
