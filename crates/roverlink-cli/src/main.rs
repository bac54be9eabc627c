//! `roverlink` – remote-control terminal for a small wheeled robot.
//!
//! This binary:
//!
//! 1. Checks for `~/.roverlink/config.toml`; runs a short **First-Run
//!    setup** when the file is absent.
//! 2. Opens a WebSocket session to the robot and sends the startup
//!    sequence.
//! 3. Drops the user into an **interactive REPL** (`left`, `speed 3`,
//!    `light`, `range`, `say`, `state`, `quit`).
//! 4. Streams robot traffic and safety warnings to the terminal while
//!    the REPL runs.

mod config;
mod repl;
mod terminal;

use colored::Colorize;
use std::time::Duration;
use tracing::warn;

use roverlink_client::{session, ws_url_from_page, SessionConfig};
use terminal::Channel;

#[tokio::main]
async fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // Initialise tracing-subscriber using RUST_LOG (defaults to "info").
    // Set ROVERLINK_LOG_FORMAT=json to emit newline-delimited JSON logs
    // suitable for log aggregators. User-facing output still uses println!
    // for UX consistency.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("ROVERLINK_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => run_first_run_setup(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let url = ws_url_from_page(&cfg.robot_url);
    println!("  Robot endpoint: {} ({} framing)\n", url.bold(), cfg.framing);

    // ── Session ───────────────────────────────────────────────────────────
    let session_cfg = SessionConfig {
        url,
        framing: cfg.framing,
        cutoff_cm: cfg.proximity_cutoff_cm,
        range_poll: Duration::from_millis(cfg.range_poll_ms),
    };
    let (driver, handle) = session(session_cfg);

    let driver_task = tokio::spawn(driver.run());

    // ── Event printer ─────────────────────────────────────────────────────
    let mut events = handle.subscribe();
    let verbosity = cfg.log_level;
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let closed = matches!(event, roverlink_client::SessionEvent::Closed);
                    if let Some((channel, line)) = terminal::render(&event, verbosity) {
                        match channel {
                            Channel::ToRobot => println!("{}", line.dimmed()),
                            Channel::FromRobot => println!("{}", line.green()),
                            Channel::Warn => println!("{}", line.red().bold()),
                            Channel::Status => println!("{}", line.cyan()),
                        }
                    }
                    if closed {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Event printer lagged; some lines were dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("  Type {} for a list of commands.\n", "help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    let repl_handle = handle.clone();
    let repl_task = tokio::task::spawn_blocking(move || repl::run(repl_handle));
    let _ = repl_task.await;

    // ── Shutdown ──────────────────────────────────────────────────────────
    let _ = handle.shutdown();
    match driver_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => println!("{}: {}", "Session ended with error".red(), e),
        Err(e) => println!("{}: {}", "Session task panicked".red(), e),
    }
    let _ = printer.await;

    println!("{}", "  Goodbye.".dimmed());
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run setup
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_setup() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║        RoverLink First-Run Setup     ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up RoverLink.\n");

    let mut cfg = config::Config::default();

    let url = prompt_line(
        &format!("  Robot URL [{}]: ", cfg.robot_url),
        &cfg.robot_url.clone(),
    );
    cfg.robot_url = url.trim().to_string();

    let framing = prompt_line("  Framing, pipe or json [json]: ", "json");
    if framing.trim().eq_ignore_ascii_case("pipe") {
        cfg.framing = roverlink_codec::Framing::Pipe;
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }

    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ___                    __   _       __  "#.bold().cyan());
    println!("{}", r#"  / _ \___ _  _____ ____ / /  (_)___  / /__"#.bold().cyan());
    println!("{}", r#" / , _/ _ \ |/ / -_) __// /__/ / _ \/  '_/"#.bold().cyan());
    println!("{}", r#"/_/|_|\___/___/\__/_/  /____/_/_//_/_/\_\ "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "RoverLink".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Remote control for a small wheeled robot");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
