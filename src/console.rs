//! Console loop
//!
//! Reads command lines from a channel, submits them to the dispatcher and
//! prints each outcome. Parse and operation errors are printed and the loop
//! carries on; only exit, end of input, an interrupt, or a stopped dispatcher
//! end it.
//!
//! Blocking input (stdin) is read on a dedicated OS thread that feeds the
//! channel. That thread is never joined, so a read that never returns cannot
//! keep the process alive after the dispatcher has stopped.

use std::future::Future;
use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::dispatcher::DispatcherHandle;
use crate::operation::Outcome;
use crate::output::Output;

/// Prompt printed before each command
pub const PROMPT: &str = "Enter command (create/join/leave/send/recv/inbound/exit):";

/// Lines buffered between the reader thread and the console loop
pub const INPUT_BUFFER_SIZE: usize = 64;

/// Read `input` line by line on a dedicated thread
///
/// The returned receiver closes when `input` hits end of file, fails, or the
/// receiver is dropped and another line arrives.
pub fn spawn_line_reader<R>(input: R) -> std::io::Result<mpsc::Receiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(INPUT_BUFFER_SIZE);

    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if sender.blocking_send(line).is_err() {
                            debug!("Console gone, input reader stopping");
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Input read failed");
                        return;
                    }
                }
            }
            debug!("Input reached end of file");
        })?;

    Ok(receiver)
}

/// Run the console until exit or end of input
///
/// End of input is treated as an exit command.
pub async fn run_console(
    mut input: mpsc::Receiver<String>,
    output: Output,
    handle: DispatcherHandle,
) -> std::io::Result<()> {
    loop {
        output.write_line(PROMPT)?;

        let Some(line) = input.recv().await else {
            debug!("End of input, shutting down");
            if let Err(e) = handle.shutdown().await {
                debug!(error = %e, "Dispatcher already stopped");
            }
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!(input = %line.trim(), error = %e, "Rejected command");
                output.write_line(&format!("Error: {}", e))?;
                continue;
            }
        };

        match handle.submit(command).await {
            Ok(Outcome::Shutdown) => {
                output.write_line(&Outcome::Shutdown.to_string())?;
                break;
            }
            Ok(outcome) => output.write_line(&outcome.to_string())?,
            Err(e) if handle.is_closed() => {
                error!(error = %e, "Dispatcher stopped, leaving console");
                break;
            }
            Err(e) => output.write_line(&format!("Error: {}", e))?,
        }
    }

    Ok(())
}

/// Run the console until it ends on its own or `interrupt` completes
///
/// On interrupt the console is abandoned mid-read and the dispatcher is told
/// to shut down, so the dispatcher task always finishes.
pub async fn run_console_until<F>(
    input: mpsc::Receiver<String>,
    output: Output,
    handle: DispatcherHandle,
    interrupt: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        result = run_console(input, output, handle.clone()) => result,
        _ = interrupt => {
            info!("Interrupted, shutting down");
            if let Err(e) = handle.shutdown().await {
                debug!(error = %e, "Dispatcher already stopped");
            }
            Ok(())
        }
    }
}
