#![forbid(unsafe_code)]

//! `parcel-locker` command-line client.
//!
//! Drives the same workflows as the dashboard: list parcels, register,
//! unlock and lock boxes, collect with weight check, and watch live
//! notifications.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use parcel_locker_client::app::LockerApp;
use parcel_locker_client::config::GlobalConfig;
use parcel_locker_client::models::attempt::CollectionOutcome;
use parcel_locker_client::models::parcel::ParcelStatus;
use parcel_locker_client::realtime::client::ConnectOutcome;
use parcel_locker_client::ui::board::ListView;
use parcel_locker_client::ui::{Notice, UiEvent};
use parcel_locker_client::{AppError, Result};

/// How long `collect` waits for the notification channel before asking.
const CHANNEL_CONNECT_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "parcel-locker", about = "Smart parcel locker client", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the active parcel list, or history with `--history`.
    List {
        /// Show collected parcels instead of active ones.
        #[arg(long)]
        history: bool,
    },
    /// Register a parcel id to the configured user.
    Register {
        /// Parcel identifier printed on the label.
        parcel_id: String,
    },
    /// Unlock the box holding a delivered parcel.
    Unlock {
        /// Parcel identifier.
        parcel_id: String,
        /// Box identifier.
        box_id: String,
    },
    /// Lock a box again.
    Lock {
        /// Parcel identifier.
        parcel_id: String,
        /// Box identifier.
        box_id: String,
    },
    /// Mark a parcel collected, with weight check.
    Collect {
        /// Parcel identifier.
        parcel_id: String,
        /// Collect even if the box still reports weight, without asking.
        #[arg(long)]
        yes: bool,
    },
    /// Stay subscribed and print notifications until interrupted.
    Watch,
    /// Query backend health.
    Health,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.load_credentials().await?;
    info!(user_id = %config.user_id, "configuration loaded");

    let (app, events) = LockerApp::from_config(config)?;

    let ct = CancellationToken::new();
    let printer = tokio::spawn(print_events(events, ct.clone()));

    let result = execute(&app, args.command).await;

    app.shutdown().await;
    ct.cancel();
    if let Err(err) = printer.await {
        warn!(%err, "event printer ended abnormally");
    }

    if let Err(ref err) = result {
        error!(%err, "command failed");
    }
    result
}

async fn execute(app: &LockerApp, command: Command) -> Result<()> {
    match command {
        Command::List { history } => {
            let status = if history {
                ParcelStatus::History
            } else {
                ParcelStatus::Active
            };
            let fetched = match status {
                ParcelStatus::Active => app.parcels().fetch_active().await,
                ParcelStatus::History => app.parcels().fetch_history().await,
            };
            fetched?;
            print_list(app, status).await;
            Ok(())
        }
        Command::Register { parcel_id } => app.parcels().register(&parcel_id).await,
        Command::Unlock { parcel_id, box_id } => app.parcels().unlock(&parcel_id, &box_id).await,
        Command::Lock { parcel_id, box_id } => app.parcels().lock(&parcel_id, &box_id).await,
        Command::Collect { parcel_id, yes } => collect(app, &parcel_id, yes).await,
        Command::Watch => {
            if app.start().await == ConnectOutcome::Disabled {
                return Err(AppError::Config(
                    "real-time notifications are not configured".into(),
                ));
            }
            print_list(app, ParcelStatus::Active).await;
            info!("watching for notifications; press ctrl-c to stop");
            shutdown_signal().await;
            info!("shutdown signal received");
            Ok(())
        }
        Command::Health => {
            let health = app.backend().health().await?;
            if health.is_healthy() {
                println!(
                    "healthy (database: {})",
                    health.database.as_deref().unwrap_or("unknown")
                );
                Ok(())
            } else {
                Err(AppError::Domain(
                    health
                        .error
                        .unwrap_or_else(|| format!("backend reports {}", health.status)),
                ))
            }
        }
    }
}

async fn collect(app: &LockerApp, parcel_id: &str, yes: bool) -> Result<()> {
    // Weight readings arrive on the notification channel.
    if app.connect_notifications().await == ConnectOutcome::Disabled {
        warn!("notifications disabled; a weight check cannot complete");
    } else if !app
        .notifications()
        .wait_connected(CHANNEL_CONNECT_WAIT)
        .await
    {
        warn!("notification channel not connected yet; a weight reading may be missed");
    }

    let attempt = app.collection().collect(parcel_id);
    let outcome = tokio::select! {
        outcome = attempt => outcome?,
        () = shutdown_signal() => {
            return Err(AppError::Io("interrupted while collecting".into()));
        }
    };

    match outcome {
        CollectionOutcome::Collected => Ok(()),
        CollectionOutcome::ConfirmationRequired => {
            if yes || confirm("The box still reports weight. Collect anyway? [y/N] ").await? {
                app.collection().confirm_override(parcel_id).await.map(|_| ())
            } else {
                app.collection().cancel(parcel_id).await;
                println!("collection cancelled");
                Ok(())
            }
        }
    }
}

/// Ask a yes/no question on stdin.
async fn confirm(question: &'static str) -> Result<bool> {
    let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
        let mut stdout = io::stdout();
        stdout.write_all(question.as_bytes())?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    })
    .await
    .map_err(|err| AppError::Io(format!("prompt task failed: {err}")))??;

    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}

async fn print_list(app: &LockerApp, status: ParcelStatus) {
    let board = app.ui().board().await;
    match board.list(status) {
        ListView::Cleared => {}
        ListView::Empty => println!("no parcels"),
        ListView::Entries(cards) => {
            for card in cards {
                let parcel = &card.parcel;
                println!(
                    "{}\t{}\t{}\t{:?}\t{:?}",
                    parcel.id,
                    parcel.parcel_name,
                    parcel.box_name.as_deref().unwrap_or("-"),
                    card.state,
                    card.controls,
                );
            }
        }
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<UiEvent>, ct: CancellationToken) {
    loop {
        tokio::select! {
            () = ct.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => return,
            },
        }
    }
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
}

fn print_event(event: &UiEvent) {
    match event {
        UiEvent::Toast(notice)
        | UiEvent::Message {
            notice: Some(notice),
            ..
        } => print_notice(notice),
        UiEvent::ConfirmOverride { parcel_id } => {
            println!("parcel {parcel_id}: box still reports weight");
        }
        UiEvent::CardRemoving { parcel_id } => println!("parcel {parcel_id} collected"),
        UiEvent::ControlsChanged {
            parcel_id,
            controls,
        } => println!("parcel {parcel_id}: {controls:?}"),
        UiEvent::Message { notice: None, .. }
        | UiEvent::ListUpdated(_)
        | UiEvent::ConfirmClosed { .. }
        | UiEvent::RegisterInputCleared => {}
    }
}

fn print_notice(notice: &Notice) {
    println!("[{:?}] {}", notice.level, notice.text);
}

/// Wait for ctrl-c or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
