// Pulsewatch - Status monitoring client for the service API
// Main entry point

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::prelude::*;

use pulsewatch::client::{CredentialSlot, StatusService, Transport};
use pulsewatch::config::{config_path, load_config, Config};
use pulsewatch::errors::{api_unreachable_error, wrap_error_with_suggestion, ApiError};
use pulsewatch::monitor::StatusMonitor;
use pulsewatch::notifications::NotificationManager;
use pulsewatch::storage::{FileStore, PreferenceStore};
use pulsewatch::sync::{ResourceKey, StatusSync};
use pulsewatch::theme::{TerminalAppearance, Theme, ThemeResolver};

#[derive(Parser, Debug)]
#[command(name = "pulsewatch")]
#[command(about = "Status monitoring client for the service API", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll every status endpoint and report changes until Ctrl-C
    Watch,
    /// Fetch one or all status endpoints once and print JSON
    Check {
        /// health, ready, live, config or all
        #[arg(default_value = "all")]
        target: String,
    },
    /// Report whether a server feature flag is enabled
    Feature {
        name: String,
    },
    /// Show or change the display theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeCommand>,
    },
    /// Manage the stored bearer credential
    Token {
        #[command(subcommand)]
        action: TokenCommand,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand, Debug)]
enum ThemeCommand {
    Get,
    Set {
        /// light, dark or system
        theme: Theme,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    Set { token: String },
    Clear,
}

/// Everything a command needs, built from the effective configuration
struct App {
    config: Config,
    store: Arc<dyn PreferenceStore>,
    service: StatusService,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn PreferenceStore> = Arc::new(FileStore::new(config.preferences_path()));
        let credentials = CredentialSlot::new(Arc::clone(&store));
        let transport = Transport::new(&config.client, credentials)?;

        Ok(Self {
            config,
            store,
            service: StatusService::new(transport),
        })
    }

    fn sync(&self) -> StatusSync {
        StatusSync::new(self.service.clone(), &self.config.sync)
    }

    /// Explain connectivity failures instead of printing a bare kind
    fn describe(&self, err: &ApiError) -> String {
        if err.is_connectivity() {
            format!("{}\n\n{}", err, api_unreachable_error(&self.config.client.base_url))
        } else {
            err.to_string()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config()?;
    init_tracing(config.debug);
    tracing::debug!(base_url = %config.client.base_url, "Configuration loaded");

    let app = App::new(config)?;

    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => run_watch(&app).await,
        Command::Check { target } => run_check(&app, &target).await,
        Command::Feature { name } => run_feature(&app, &name).await,
        Command::Theme { action } => run_theme(&app, action),
        Command::Token { action } => run_token(&app, action),
        Command::Config => run_config(&app),
    }
}

async fn run_watch(app: &App) -> Result<()> {
    let sync = app.sync();
    let notifications = NotificationManager::from_settings(&app.config.notifications);
    let monitor = StatusMonitor::start(&sync, notifications.clone());

    let mut status = monitor.watch();
    let mut visible = notifications.subscribe();
    let mut seen: Vec<String> = Vec::new();

    eprintln!(
        "Watching {} (refresh every {} ms). Press Enter to revalidate, Ctrl-C to stop.",
        app.config.client.base_url, app.config.sync.refresh_interval_ms
    );
    println!("{}", monitor.status());

    // Enter in the terminal plays the role of a window regaining focus
    let signals = sync.signals().clone();
    let stdin_task = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            signals.focus();
        }
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                println!("{}", current);
            }
            changed = visible.changed() => {
                if changed.is_err() {
                    break;
                }
                let list = visible.borrow_and_update().clone();
                for notification in list.iter().filter(|n| !seen.contains(&n.id)) {
                    match &notification.message {
                        Some(message) => println!(
                            "[{}] {}: {}",
                            notification.kind.label(),
                            notification.title,
                            message
                        ),
                        None => println!("[{}] {}", notification.kind.label(), notification.title),
                    }
                }
                seen = list.into_iter().map(|n| n.id).collect();
            }
        }
    }

    stdin_task.abort();
    notifications.clear();
    Ok(())
}

async fn run_check(app: &App, target: &str) -> Result<()> {
    let sync = app.sync();
    let keys = if target.eq_ignore_ascii_case("all") {
        sync.keys()
    } else {
        let key: ResourceKey = target.parse().map_err(anyhow::Error::msg)?;
        vec![key]
    };

    let mut report = serde_json::Map::new();
    let mut failures = Vec::new();

    for key in keys {
        let value = match key {
            ResourceKey::Health => to_report(sync.health().revalidate().await),
            ResourceKey::Readiness => to_report(sync.readiness().revalidate().await),
            ResourceKey::Liveness => to_report(sync.liveness().revalidate().await),
            ResourceKey::Config => to_report(sync.config().revalidate().await),
        };

        match value {
            Ok(data) => {
                report.insert(key.name().to_string(), data);
            }
            Err(err) => {
                report.insert(key.name().to_string(), json!({ "error": &err }));
                failures.push((key, err));
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&Value::Object(report))?);

    if let Some((key, err)) = failures.first() {
        bail!("{} check failed: {}", key, app.describe(err));
    }
    Ok(())
}

fn to_report<T: serde::Serialize>(
    snapshot: pulsewatch::sync::Snapshot<T>,
) -> Result<Value, ApiError> {
    if let Some(err) = snapshot.error {
        return Err(err);
    }
    serde_json::to_value(&snapshot.data).map_err(|e| ApiError::client(e.to_string()))
}

async fn run_feature(app: &App, name: &str) -> Result<()> {
    match app.service.is_feature_enabled(name).await {
        Ok(enabled) => {
            println!("{}: {}", name, if enabled { "enabled" } else { "disabled" });
            Ok(())
        }
        Err(err) => bail!(app.describe(&err)),
    }
}

fn run_theme(app: &App, action: Option<ThemeCommand>) -> Result<()> {
    let resolver = ThemeResolver::new(
        Arc::clone(&app.store),
        Arc::new(TerminalAppearance::detect()),
    );

    if let Some(ThemeCommand::Set { theme }) = action {
        resolver.set(theme);
    }

    let state = resolver.get();
    println!("theme: {} (resolved: {})", state.theme, state.resolved_theme);
    Ok(())
}

fn run_token(app: &App, action: TokenCommand) -> Result<()> {
    match action {
        TokenCommand::Set { token } => {
            if token.trim().is_empty() {
                bail!(wrap_error_with_suggestion(
                    "Token must not be empty",
                    "use `pulsewatch token clear` to remove the stored credential"
                ));
            }
            app.service.transport().set_credential(token.trim());
            eprintln!("Credential stored in {}", app.config.preferences_path().display());
        }
        TokenCommand::Clear => {
            app.service.transport().clear_credential();
            eprintln!("Credential cleared");
        }
    }
    Ok(())
}

fn run_config(app: &App) -> Result<()> {
    let path = config_path()?;
    let rendered = toml::to_string_pretty(&app.config).context("Failed to render configuration")?;

    println!("# {}", path.display());
    println!(
        "# credential: {}",
        if app.service.transport().credentials().token().is_some() {
            "set"
        } else {
            "not set"
        }
    );
    print!("{}", rendered);
    Ok(())
}

fn init_tracing(debug: bool) {
    // RUST_LOG wins unless debug is forced by PULSEWATCH_DEBUG or the config
    let env_filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
