//! Chat Room Console - Entry Point
//!
//! Starts the dispatcher actor and runs the console on stdin/stdout.

use std::io::BufReader;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_rooms::{
    run_console_until, spawn_line_reader, Cli, Context, Dispatcher, Output, RoomRegistry,
    Settings, Wire,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout carries only chat output
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_rooms=trace,audit=info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chat_rooms=info,audit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from(Cli::parse());
    info!(
        default_transport = %settings.default_transport,
        format = ?settings.format,
        audit = settings.audit,
        send_timeout_ms = settings.send_timeout.as_millis() as u64,
        "Starting chat room console"
    );

    let output = Output::stdout();
    let ctx = Context {
        registry: RoomRegistry::init_global(settings.send_timeout),
        wire: Wire::new(output.clone()),
        console: output.clone(),
        settings,
    };

    let (dispatcher, handle) = Dispatcher::new(ctx);
    let dispatcher_task = tokio::spawn(dispatcher.run());

    // stdin is read on its own thread; a pending read never blocks exit
    let input = spawn_line_reader(BufReader::new(std::io::stdin()))?;
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = run_console_until(input, output, handle.clone(), interrupt).await {
        error!("Console error: {}", e);
    }

    drop(handle);
    dispatcher_task.await?;
    info!("Exiting the application.");

    Ok(())
}
