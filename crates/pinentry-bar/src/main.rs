//! pinentry-bar - Single-line PIN and confirmation prompt.
//!
//! Shows a one-line bar on the terminal, reads a secret (or a yes/no answer)
//! while holding the terminal exclusively, and reports the result the way
//! askpass callers expect it.
//!
//! # Usage
//!
//! ```bash
//! # As SSH askpass (the prompt text is the argument)
//! export SSH_ASKPASS=/path/to/pinentry-bar
//! export SSH_ASKPASS_REQUIRE=prefer
//!
//! # Ask a question; exit status 0 means "yes"
//! pinentry-bar --confirm "Allow use of key SHA256:...?"
//!
//! # Give up after 30 seconds, bar at the bottom
//! pinentry-bar --timeout 30 --bottom "Enter PIN"
//! ```
//!
//! The PIN is printed to stdout without a trailing newline. Exit status is 0
//! on success, 1 on refusal, cancellation or timeout, and 2 when the prompt
//! could not be shown safely.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use pinentry_bar_core::{
    run_prompt, Config, PromptMode, PromptRequest, ResponseSlot, STATUS_OK,
};
use secrecy::ExposeSecret;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit status for refusal, cancellation and timeout.
const EXIT_NOT_OK: u8 = 1;

/// Exit status when the prompt could not run.
const EXIT_FATAL: u8 = 2;

/// Single-line PIN and confirmation prompt.
#[derive(Parser, Debug)]
#[command(name = "pinentry-bar")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file [default: ~/.config/pinentry-bar/config.toml]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ask a yes/no question instead of reading a secret
    #[arg(long)]
    confirm: bool,

    /// Primary prompt shown before the input field
    #[arg(short, long, value_name = "TEXT")]
    prompt: Option<String>,

    /// Give up after this many seconds (0 = never)
    #[arg(short, long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Monitor index to show the bar on
    #[arg(short, long, value_name = "INDEX")]
    monitor: Option<usize>,

    /// Anchor the bar at the bottom
    #[arg(short, long)]
    bottom: bool,

    /// Render inside this host window instead of taking the terminal
    #[arg(short, long, value_name = "WINDOW", value_parser = parse_window_id)]
    embed: Option<u64>,

    /// Terminal device to use; must be the terminal on stdin [default: /dev/tty]
    #[arg(long, value_name = "PATH")]
    tty: Option<PathBuf>,

    /// Increase log verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long)]
    quiet: bool,

    /// Description shown in the bar (askpass callers pass the prompt here)
    #[arg(value_name = "DESCRIPTION")]
    description: Vec<String>,
}

/// Parse a window id given in decimal or `0x` hex.
fn parse_window_id(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid window id {:?}: {}", value, e))
}

fn setup_logging(level: &str) {
    // Use RUST_LOG=debug for verbose output, or CLI flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Check if stderr goes to the journal
    if std::env::var("JOURNAL_STREAM").is_ok() {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(journald_layer)
                .with(filter)
                .init();
            return;
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration from specified path");
            Config::load_from(path).context("Failed to load configuration")
        }
        None => Config::load().context("Failed to load configuration"),
    }
}

/// Build the prompt request from flags, environment and config.
///
/// `askpass_prompt` is the value of `SSH_ASKPASS_PROMPT`; OpenSSH sets it
/// to `confirm` when it wants a yes/no answer.
fn build_request(cli: &Cli, config: &Config, askpass_prompt: Option<&str>) -> PromptRequest {
    let mode = if cli.confirm || askpass_prompt == Some("confirm") {
        PromptMode::Confirm
    } else {
        PromptMode::Password
    };

    PromptRequest {
        display: cli.tty.as_ref().map(|p| p.display().to_string()),
        embed: cli.embed,
        prompt: cli.prompt.clone().unwrap_or_default(),
        description: cli.description.join(" "),
        timeout: cli.timeout.map(Duration::from_secs).unwrap_or_else(|| config.timeout()),
        mode,
        monitor: cli.monitor.or(config.bar.monitor),
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    let askpass_prompt = std::env::var("SSH_ASKPASS_PROMPT").ok();
    let request = build_request(&cli, &config, askpass_prompt.as_deref());

    let mut options = config.session_options();
    if cli.bottom {
        options.top_bar = false;
    }

    let outcome = {
        let tty = request.display.as_deref().map(Path::new);
        let mut terminal =
            pinentry_bar::open(tty, request.mode).context("Failed to open terminal")?;
        run_prompt(&request, &options, &mut terminal)
            .await
            .context("Cannot show prompt")?
        // Terminal restored here, before anything is printed.
    };

    let mut slot = ResponseSlot::new();
    let status = slot.deliver(outcome);

    if slot.timed_out {
        info!(timeout_secs = request.timeout.as_secs(), "Prompt timed out");
    } else if slot.canceled {
        debug!("Prompt cancelled");
    }

    if let Some(pin) = &slot.pin {
        // No trailing newline: callers take stdout verbatim
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(pin.expose_secret().as_bytes())
            .and_then(|()| stdout.flush())
            .context("Failed to write PIN")?;
    }

    Ok(if status == STATUS_OK {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_NOT_OK)
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };
    setup_logging(log_level);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "pinentry-bar failed");
            eprintln!("pinentry-bar: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}
