//! Shell command construction for the session exec API.
//!
//! The remote API only accepts a command string, so quoting happens here and
//! nowhere else.

/// A command to submit to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Caller-supplied shell text; wrapped in `sh -c` unless it already is.
    Raw(String),
    /// Program and arguments; each argument is quoted individually.
    Argv(Vec<String>),
}

impl ShellCommand {
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ShellCommand::Argv(args.into_iter().map(Into::into).collect())
    }

    /// The string sent over the wire.
    pub fn render(&self) -> String {
        match self {
            ShellCommand::Raw(command) => normalize(command),
            ShellCommand::Argv(args) => args.iter().map(|a| quote(a)).collect::<Vec<_>>().join(" "),
        }
    }
}

impl From<&str> for ShellCommand {
    fn from(command: &str) -> Self {
        ShellCommand::Raw(command.to_string())
    }
}

/// Wrap `command` as `sh -c '<command>'` so pipes and redirection behave the
/// same whatever the session shell is. Explicit shell invocations pass through.
pub fn normalize(command: &str) -> String {
    if command.starts_with("sh -c") || command.starts_with("/bin/sh") {
        return command.to_string();
    }
    format!("sh -c {}", single_quote(command))
}

/// Quote an argument only when it contains characters the shell would interpret.
pub fn quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@+%".contains(c));
    if safe {
        arg.to_string()
    } else {
        single_quote(arg)
    }
}

fn single_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
