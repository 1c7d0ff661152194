//! Dispatcher actor implementation
//!
//! The central actor that turns commands into operations and runs them.
//! Command sources (the console, tests, or any other front end) talk to it
//! through a cloneable `DispatcherHandle`; every request gets exactly one
//! reply, and no error escapes the loop.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::error::AppError;
use crate::operation::{Context, Operation, Outcome};

/// Channel buffer size for dispatcher requests
pub const CHANNEL_BUFFER_SIZE: usize = 256;

/// A command plus the channel its result goes back on
#[derive(Debug)]
pub struct Request {
    pub command: Command,
    pub reply: oneshot::Sender<Result<Outcome, AppError>>,
}

/// The operation dispatcher actor
pub struct Dispatcher {
    ctx: Context,
    receiver: mpsc::Receiver<Request>,
}

impl Dispatcher {
    /// Create a dispatcher and the handle used to reach it
    pub fn new(ctx: Context) -> (Self, DispatcherHandle) {
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        (Self { ctx, receiver }, DispatcherHandle { sender })
    }

    /// Run the dispatcher event loop
    ///
    /// Processes requests until a shutdown operation succeeds or all handles
    /// are dropped.
    pub async fn run(mut self) {
        info!("Dispatcher started");

        while let Some(Request { command, reply }) = self.receiver.recv().await {
            let result = self.dispatch(command).await;
            let shutdown = matches!(result, Ok(Outcome::Shutdown));

            if reply.send(result).is_err() {
                debug!("Requester went away before the reply");
            }
            if shutdown {
                break;
            }
        }

        info!("Dispatcher shutting down");
    }

    /// Build, optionally audit, and execute one command
    async fn dispatch(&self, command: Command) -> Result<Outcome, AppError> {
        let result = match command.into_operation(self.ctx.clone()) {
            Ok(operation) if self.ctx.settings.audit => operation.audited().execute().await,
            Ok(operation) => operation.execute().await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = &result {
            match e {
                AppError::Internal(_) => error!(error = %e, "Operation hit an internal error"),
                _ => warn!(kind = e.kind(), error = %e, "Operation failed"),
            }
        }
        result
    }
}

/// Cheap-to-clone handle for submitting commands
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<Request>,
}

impl DispatcherHandle {
    /// Submit a command and wait for its result
    ///
    /// Returns an internal error if the dispatcher has stopped.
    pub async fn submit(&self, command: Command) -> Result<Outcome, AppError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Request { command, reply })
            .await
            .map_err(|_| AppError::Internal("dispatcher is not running".to_string()))?;

        response
            .await
            .map_err(|_| AppError::Internal("dispatcher dropped the request".to_string()))?
    }

    /// Ask the dispatcher to stop
    pub async fn shutdown(&self) -> Result<Outcome, AppError> {
        self.submit(Command::Exit).await
    }

    /// Check if the dispatcher has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
