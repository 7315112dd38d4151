use serde::Serialize;

use super::error::SandboxError;
use super::outcome::Outcome;

/// The one structured record every operation produces.
///
/// Failures carry `error` (message plus causal trace); degraded successes
/// carry `warnings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vnc_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OpResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failure(err: SandboxError) -> Self {
        Self {
            success: false,
            error: Some(err.trace()),
            ..Default::default()
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn warning(mut self, reason: Option<String>) -> Self {
        self.warnings.extend(reason);
        self
    }

    /// Fold an operation result into a record, filling successes with `fill`.
    pub fn from_result<T>(
        result: Result<Outcome<T>, SandboxError>,
        fill: impl FnOnce(T) -> OpResult,
    ) -> Self {
        match result {
            Ok(outcome) => {
                let (value, reason) = outcome.into_parts();
                fill(value).warning(reason)
            }
            Err(e) => {
                tracing::error!(error = %e, "operation failed");
                OpResult::failure(e)
            }
        }
    }
}
