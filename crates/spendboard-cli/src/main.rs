//! Spendboard - a terminal front-end for the expense dashboard.
//!
//! Every command goes through the same session and route guards as the
//! dashboard itself: `open /dashboard` while logged out lands on the login
//! route, `login` while logged in is redirected to the dashboard.

mod render;

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spendboard_core::api::ApiError;
use spendboard_core::{AppContext, Config, Navigation, Route, SessionState, StoreError};

// ============================================================================
// Constants
// ============================================================================

/// Directory for daily rolling log files; file logging is off when unset
const LOG_DIR_ENV: &str = "SPENDBOARD_LOG_DIR";

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "spendboard.log";

/// Login email override
const EMAIL_ENV: &str = "SPENDBOARD_EMAIL";

/// Login password override (skips the prompt)
const PASSWORD_ENV: &str = "SPENDBOARD_PASSWORD";

#[derive(Debug, PartialEq)]
enum Command {
    Login(Option<String>),
    Logout,
    Status,
    Open { path: String, json: bool },
    Help,
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };

    match command.as_str() {
        "login" => Ok(Command::Login(args.get(1).cloned())),
        "logout" => Ok(Command::Logout),
        "status" => Ok(Command::Status),
        "open" => {
            let json = args.iter().skip(1).any(|a| a == "--json");
            let path = args
                .iter()
                .skip(1)
                .find(|a| !a.starts_with("--"))
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("`open` needs a path, e.g. `spendboard open /dashboard`"))?;
            Ok(Command::Open { path, json })
        }
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(anyhow::anyhow!("Unknown command `{}`. Run `spendboard help`.", other)),
    }
}

fn print_usage() {
    println!("Usage: spendboard <command>");
    println!();
    println!("Commands:");
    println!("  login [email]        Sign in and start a 24 hour session");
    println!("  logout               End the session");
    println!("  status               Show the current session");
    println!("  open <path> [--json] Navigate to a route and show its data");
    println!();
    println!("Routes: / /register /dashboard /dashboard/expense/ /dashboard/category/");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;
    if command == Command::Help {
        print_usage();
        return Ok(());
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    let mut ctx = AppContext::new(config)?;
    info!(state = ?ctx.session.state(), "Spendboard starting");

    match command {
        Command::Login(email) => login(&mut ctx, email).await,
        Command::Logout => {
            ctx.logout();
            println!("Logged out.");
            Ok(())
        }
        Command::Status => {
            status(&ctx);
            Ok(())
        }
        Command::Open { path, json } => open(&mut ctx, &path, json).await,
        Command::Help => Ok(()),
    }
}

fn prompt_email() -> Result<String> {
    print!("Email: ");
    io::stdout().flush()?;

    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    Ok(email.trim().to_string())
}

async fn login(ctx: &mut AppContext, email: Option<String>) -> Result<()> {
    // The login route is anonymous-only; a redirect means we are signed in
    if let Navigation::Redirected { .. } = ctx.navigate_to(Route::Login) {
        println!(
            "Already logged in as {}. Run `spendboard logout` first.",
            ctx.session.username().unwrap_or("unknown user")
        );
        return Ok(());
    }

    let email = match email
        .or_else(|| std::env::var(EMAIL_ENV).ok())
        .or_else(|| ctx.config.last_email.clone())
    {
        Some(email) => email,
        None => prompt_email()?,
    };
    if email.is_empty() {
        anyhow::bail!("Email is required");
    }

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    eprintln!("Authenticating...");
    if let Err(e) = ctx.login(&email, &password).await {
        error!(error = %e, "Login failed");
        anyhow::bail!(e.user_message());
    }

    if let Err(e) = ctx.config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!(
        "Logged in as {} <{}>.",
        ctx.session.username().unwrap_or_default(),
        ctx.session.email().unwrap_or_default()
    );
    Ok(())
}

fn status(ctx: &AppContext) {
    let state = match ctx.session.state() {
        SessionState::Anonymous => "logged out",
        SessionState::Authenticated => "logged in",
        SessionState::Expired => "expired",
    };
    println!("Session:  {}", state);
    if let Some(username) = ctx.session.username() {
        println!("User:     {} <{}>", username, ctx.session.email().unwrap_or("-"));
    }
    if let Some(minutes) = ctx.session.minutes_until_expiry() {
        println!("Expires:  in {}h {}m", minutes / 60, minutes % 60);
    }
    println!("API:      {}", ctx.api.base_url());
}

async fn open(ctx: &mut AppContext, path: &str, json: bool) -> Result<()> {
    let navigation = ctx.navigate(path);
    match &navigation {
        Navigation::Proceeded(route) => eprintln!("-> {} ({})", route, route.name()),
        Navigation::Redirected { requested, landed } => {
            eprintln!("-> {} is not available, redirected to {}", requested, landed)
        }
        Navigation::NotFound(path) => anyhow::bail!("No route matches {}", path),
        Navigation::Aborted { requested } => anyhow::bail!("Navigation to {} was aborted", requested),
    }

    let view = match navigation.landed() {
        Some(Route::Dashboard(view)) => view,
        Some(Route::Login) => {
            println!("Not logged in. Run `spendboard login` to sign in.");
            return Ok(());
        }
        Some(Route::Register) => {
            println!("Registration is not available from the terminal.");
            return Ok(());
        }
        None => return Ok(()),
    };

    let subscriptions = render::report_events(&ctx.bus);
    let result = ctx.dashboard.refresh(view).await;
    for (channel, id) in subscriptions {
        ctx.bus.off(channel, id);
    }

    if let Err(e) = result {
        if let StoreError::Api(ApiError::Unauthorized) = e {
            anyhow::bail!("The server rejected the session. Run `spendboard login` again.");
        }
        anyhow::bail!("Failed to load {}: {}", view_label(view), e);
    }

    if json {
        println!("{}", render::view_json(view, &ctx.dashboard)?);
    } else {
        render::view(view, &ctx.dashboard);
    }
    Ok(())
}

fn view_label(view: spendboard_core::DashboardView) -> &'static str {
    Route::Dashboard(view).name()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_commands() {
        assert_eq!(parse_args(&args(&[])).unwrap(), Command::Help);
        assert_eq!(parse_args(&args(&["logout"])).unwrap(), Command::Logout);
        assert_eq!(parse_args(&args(&["status"])).unwrap(), Command::Status);
        assert_eq!(
            parse_args(&args(&["login", "a@x.io"])).unwrap(),
            Command::Login(Some("a@x.io".to_string()))
        );
        assert_eq!(parse_args(&args(&["login"])).unwrap(), Command::Login(None));
    }

    #[test]
    fn test_parse_args_open() {
        assert_eq!(
            parse_args(&args(&["open", "/dashboard", "--json"])).unwrap(),
            Command::Open {
                path: "/dashboard".to_string(),
                json: true
            }
        );
        assert_eq!(
            parse_args(&args(&["open", "--json", "/dashboard/expense/"])).unwrap(),
            Command::Open {
                path: "/dashboard/expense/".to_string(),
                json: true
            }
        );
        assert!(parse_args(&args(&["open"])).is_err());
    }

    #[test]
    fn test_parse_args_unknown() {
        assert!(parse_args(&args(&["frobnicate"])).is_err());
    }
}
