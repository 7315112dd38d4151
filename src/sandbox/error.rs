use std::time::Duration;

/// Errors from sandbox operations.
///
/// `Service` and `Transport` are both provider failures; `Transport` keeps the
/// underlying HTTP error as its source so the causal chain survives into the
/// reported trace.
#[derive(thiserror::Error, Debug)]
pub enum SandboxError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("sandbox not found: {0}")]
    NotFound(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("{context}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("serialization: {0}")]
    Serde(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("sandbox {id} did not become runnable within {waited:?}")]
    StartTimeout { id: String, waited: Duration },
}

impl SandboxError {
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        SandboxError::Transport {
            context: context.into(),
            source,
        }
    }

    /// True for failures that originate at the remote provider.
    pub fn is_service(&self) -> bool {
        matches!(
            self,
            SandboxError::Service(_) | SandboxError::Transport { .. } | SandboxError::Serde(_)
        )
    }

    /// Message followed by its `Caused by:` chain.
    pub fn trace(self) -> String {
        format!("{:?}", anyhow::Error::from(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_displays_id() {
        let err = SandboxError::NotFound("sbx-123".into());
        assert_eq!(err.to_string(), "sandbox not found: sbx-123");
    }

    #[test]
    fn configuration_displays_message() {
        let err = SandboxError::Configuration("DAYTONA_API_KEY is required".into());
        assert_eq!(
            err.to_string(),
            "configuration error: DAYTONA_API_KEY is required"
        );
    }

    #[test]
    fn start_timeout_displays_id_and_wait() {
        let err = SandboxError::StartTimeout {
            id: "sbx-1".into(),
            waited: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "sandbox sbx-1 did not become runnable within 5s");
    }

    #[test]
    fn service_classification() {
        assert!(SandboxError::Service("502".into()).is_service());
        assert!(SandboxError::Serde("bad json".into()).is_service());
        assert!(!SandboxError::NotFound("x".into()).is_service());
        assert!(!SandboxError::InvalidPath("..".into()).is_service());
    }

    #[test]
    fn trace_starts_with_message() {
        let trace = SandboxError::Service("upstream returned 500".into()).trace();
        assert!(trace.starts_with("service error: upstream returned 500"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SandboxError>();
    }
}
