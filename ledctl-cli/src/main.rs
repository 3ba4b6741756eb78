//! ledctl: interactive client for the CoAP LED controller
//!
//! Usage: `ledctl [device-name | host[:port]]`
//!
//! Logs go to a file under the user cache dir so they never mix with the menu.

mod app;
mod input;
mod ui;

use ledctl_core::{Client, CoapTransport, Config};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::{App, AppResult};
use crate::input::{parse_choice, Prompt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing to file (not stdout, would interfere with the menu)
    let log_file = dirs::cache_dir()
        .map(|d| d.join("ledctl").join("ledctl.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp/ledctl.log"));

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        log_file.parent().unwrap_or(std::path::Path::new("/tmp")),
        log_file.file_name().unwrap_or(std::ffi::OsStr::new("ledctl.log")),
    );

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "ledctl=debug,ledctl_core=debug".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(file_appender))
        .init();

    // Load config
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    });

    let target = std::env::args().nth(1);
    let device = match config.resolve(target.as_deref()) {
        Ok(device) => device,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Usage: ledctl <device-name | host[:port]>");
            eprintln!("Example: ledctl 192.168.1.100");
            std::process::exit(1);
        }
    };

    println!("\n{}", "=".repeat(50));
    println!("  CoAP LED Control System - Client");
    println!("{}\n", "=".repeat(50));
    println!("Connecting to CoAP server at: {}:{}", device.host, device.port);

    let transport = CoapTransport::resolve(&device.host, device.port).await?;
    tracing::info!(device = %device.name, addr = %transport.server_addr(), "Using device");

    // Ctrl-C aborts any request in flight and ends the session
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        });
    }

    let client = Client::new(transport)
        .with_timeout(config.client.timeout())
        .with_cancellation(shutdown.clone());
    let app = App::new(config, device, client);

    let result = run_app(&app, &shutdown).await;
    println!("\nGoodbye!");
    result
}

/// Main menu loop
async fn run_app(app: &App<CoapTransport>, shutdown: &CancellationToken) -> anyhow::Result<()> {
    let mut prompt = Prompt::stdin(shutdown.clone());

    loop {
        println!("{}", ui::menu(app.client.username().await.as_deref()));

        // End of input or Ctrl-C
        let Some(line) = prompt.ask("\nEnter choice (1-9): ").await? else {
            return Ok(());
        };

        let Some(action) = parse_choice(&line) else {
            println!("{}", ui::failure("Invalid choice! Please enter 1-9"));
            continue;
        };

        match app.handle(action, &mut prompt).await? {
            AppResult::Continue => {}
            AppResult::Quit => return Ok(()),
        }

        if shutdown.is_cancelled() {
            return Ok(());
        }
    }
}
