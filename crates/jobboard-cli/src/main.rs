// Job board command-line client.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (log to file, not terminal)
// 3. Load config
// 4. Restore the saved session (skipped with --anonymous)
// 5. Build the client factory and run the command

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use jobboard_app::JobBoard;
use jobboard_cli::cli::Cli;
use jobboard_cli::commands;
use jobboard_core::config::{self, Config};
use jobboard_core::{Session, SessionStore};
use jobboard_graphql::ClientFactory;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("warning: logging disabled: {e:#}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        graphql = %config.endpoints.graphql_url,
        ws = %config.endpoints.ws_url,
        "config loaded"
    );

    let factory = if cli.anonymous {
        ClientFactory::ephemeral(config.endpoints.clone())
    } else {
        let session = open_session(&config)?;
        ClientFactory::interactive(config.endpoints.clone(), session)
    };
    let board = JobBoard::from_factory(&factory);

    let mut stdout = std::io::stdout();
    commands::run(cli.command, &board, &mut stdout).await
}

fn open_session(config: &Config) -> anyhow::Result<Session> {
    let Some(path) = &config.session_path else {
        warn!("no session path available, session will not be saved");
        return Ok(Session::new());
    };
    let store = SessionStore::open(path)
        .with_context(|| format!("failed to open session store at {}", path.display()))?;
    let session = Session::with_store(store).context("failed to restore session")?;
    info!(path = %path.display(), authenticated = session.is_authenticated(), "session ready");
    Ok(session)
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("jobboard.log"))?;

    let filter = EnvFilter::try_from_env("JOBBOARD_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("jobboard=info,warn"));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
