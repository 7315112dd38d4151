use super::error::SandboxError;
use super::service::SandboxService;

/// Delete a sandbox. Not idempotent: deleting an unknown or already deleted
/// id returns whatever the service reports, normally `NotFound`.
pub async fn delete(service: &dyn SandboxService, sandbox_id: &str) -> Result<(), SandboxError> {
    let sandbox = service.get(sandbox_id).await?;
    service.delete(&sandbox).await
}
