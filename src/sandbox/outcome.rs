/// Result of a step that may succeed in a reduced form.
///
/// Paired with `Result<_, SandboxError>` this gives three observable cases:
/// `Ok(Outcome::Ok)`, `Ok(Outcome::Degraded)` and `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Ok(T),
    Degraded { value: T, reason: String },
}

impl<T> Outcome<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Outcome::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Ok(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    /// Split into the value and the degradation reason, if any.
    pub fn into_parts(self) -> (T, Option<String>) {
        match self {
            Outcome::Ok(value) => (value, None),
            Outcome::Degraded { value, reason } => (value, Some(reason)),
        }
    }
}
