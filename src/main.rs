use std::ffi::OsString;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use sandboxctl::config::Config;
use sandboxctl::sandbox::{OpResult, SandboxClient};

#[derive(Parser)]
#[command(name = "sandboxctl", version, about = "Drive remote Daytona desktop sandboxes")]
enum Cli {
    /// Provision a sandbox and print its preview URLs
    Create {
        /// VNC password (defaults to DAYTONA_VNC_PASSWORD)
        password: Option<String>,
        /// Project label attached to the sandbox
        project_label: Option<String>,
    },
    /// Write a UTF-8 file under /workspace
    #[command(name = "write_file")]
    WriteFile {
        sandbox_id: String,
        path: String,
        content: String,
    },
    /// Run a shell command in /workspace
    #[command(name = "run_command")]
    RunCommand {
        sandbox_id: String,
        command: String,
        /// Wait for completion when "true"
        #[arg(default_value = "false")]
        blocking: String,
        /// Seconds to wait in blocking mode
        #[arg(default_value_t = 60)]
        timeout: u64,
    },
    /// Delete a sandbox
    Delete { sandbox_id: String },
}

/// What to do before any remote call is made.
enum Startup {
    Run(Cli, Config),
    /// `--help` or `--version`: clap prints it and exits normally.
    Print(clap::Error),
    /// Argument or configuration error, reported as JSON on stderr.
    Fail(String),
}

/// Parse arguments, then load configuration. Argument errors win over
/// configuration errors.
fn startup<I, T>(args: I, lookup: impl Fn(&str) -> Option<String>) -> Startup
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return Startup::Print(e);
        }
        Err(e) => return Startup::Fail(e.to_string().trim().to_string()),
    };

    match Config::from_lookup(lookup) {
        Ok(config) => Startup::Run(cli, config),
        Err(e) => Startup::Fail(e.to_string()),
    }
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

fn fail(message: impl std::fmt::Display) -> ExitCode {
    eprintln!("{}", error_json(&message.to_string()));
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let (cli, config) = match startup(std::env::args_os(), |key| std::env::var(key).ok()) {
        Startup::Run(cli, config) => (cli, config),
        Startup::Print(e) => e.exit(),
        Startup::Fail(message) => return fail(message),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sandboxctl=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_tree::HierarchicalLayer::new(2)
                .with_writer(std::io::stderr)
                .with_targets(true)
                .with_bracketed_fields(false),
        )
        .with(sentry::integrations::tracing::layer().event_filter(
            |metadata| match *metadata.level() {
                tracing::Level::ERROR => sentry::integrations::tracing::EventFilter::Event,
                tracing::Level::WARN | tracing::Level::INFO => {
                    sentry::integrations::tracing::EventFilter::Breadcrumb
                }
                _ => sentry::integrations::tracing::EventFilter::Ignore,
            },
        ))
        .init();

    let _guard = sentry::init((
        config.sentry_dsn.clone().unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.environment.clone().into()),
            enable_logs: true,
            ..Default::default()
        },
    ));

    let result = match run(cli, &config).await {
        Ok(result) => result,
        Err(e) => return fail(format!("{e:#}")),
    };

    match serde_json::to_string(&result) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Only the literal `true` (any case) selects blocking mode.
fn is_blocking(arg: &str) -> bool {
    arg.eq_ignore_ascii_case("true")
}

async fn run(cli: Cli, config: &Config) -> Result<OpResult> {
    let http_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(60))
        .build()
        .context("failed to build HTTP client")?;
    let client = SandboxClient::from_config(config, http_client);

    let result = match cli {
        Cli::Create {
            password,
            project_label,
        } => client.create(password.as_deref(), project_label.as_deref()).await,
        Cli::WriteFile {
            sandbox_id,
            path,
            content,
        } => client.write_file(&sandbox_id, &path, &content).await,
        Cli::RunCommand {
            sandbox_id,
            command,
            blocking,
            timeout,
        } => {
            client
                .run_command(&sandbox_id, &command, is_blocking(&blocking), timeout)
                .await
        }
        Cli::Delete { sandbox_id } => client.delete(&sandbox_id).await,
    };
    Ok(result)
}

// ── Tests ───────────────────────────────────────────────────────────
