//! Chat Room Registry Library
//!
//! Named chat rooms with pluggable message transports, driven by a
//! line-oriented command console.
//!
//! # Features
//! - Process-wide room registry with atomic get-or-create
//! - Ordered, name-keyed room membership
//! - Broadcast: transport send first, then local delivery to a membership snapshot
//! - Two interchangeable transports (`direct`, `framed`) with an inbound queue
//! - Operations with an audit-log decorator
//! - Console commands in word or JSON form
//!
//! # Architecture
//! - `RoomRegistry` and `Room` are `Send + Sync`, locked per registry map and
//!   per room membership (never held across an await)
//! - `Dispatcher` is an actor: command sources talk to it over `mpsc` and get
//!   replies over `oneshot`
//! - Every operation result is either an `Outcome` or a classified `AppError`
//!
//! # Example
//! ```ignore
//! use std::io::BufReader;
//! use chat_rooms::{run_console, spawn_line_reader, Context, Dispatcher, Output, Settings, Wire};
//!
//! #[tokio::main]
//! async fn main() {
//!     let output = Output::stdout();
//!     let ctx = Context::new(Wire::new(output.clone()), output.clone(), Settings::default());
//!     let (dispatcher, handle) = Dispatcher::new(ctx);
//!     let task = tokio::spawn(dispatcher.run());
//!
//!     let input = spawn_line_reader(BufReader::new(std::io::stdin())).unwrap();
//!     run_console(input, output, handle).await.unwrap();
//!     task.await.unwrap();
//! }
//! ```

pub mod command;
pub mod config;
pub mod console;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod member;
pub mod message;
pub mod operation;
pub mod output;
pub mod registry;
pub mod room;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use command::Command;
pub use config::{Cli, Settings};
pub use console::{run_console, run_console_until, spawn_line_reader};
pub use dispatcher::{Dispatcher, DispatcherHandle};
pub use error::{AppError, SendError, TransportError, ValidationError};
pub use format::MessageFormat;
pub use member::{ChannelMember, ConsoleMember, Member};
pub use message::{Delivery, Frame, InboundMessage, Message};
pub use operation::{Audited, Context, Operation, Outcome};
pub use output::{Captured, Output};
pub use registry::RoomRegistry;
pub use room::{BroadcastSummary, Room};
pub use transport::{DirectTransport, FramedTransport, Transport, TransportKind, Wire};
pub use types::{MemberName, MessageId, RoomId};
