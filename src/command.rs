//! Console command protocol
//!
//! Commands arrive one per line, either as words (`send room1 hello`) or as a
//! JSON object using a serde tagged enum (`{"type":"send",...}`). Missing
//! arguments are kept as empty strings so the operation constructors report
//! them as validation errors.

use serde::Deserialize;

use crate::error::ValidationError;
use crate::operation::{
    Context, CreateRoom, InjectMessage, JoinRoom, LeaveRoom, Operation, ReceiveMessage,
    SendMessage, Shutdown,
};

/// Operator → dispatcher command
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Create a room bound to a transport kind
    Create {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        transport: String,
    },
    /// Join a room
    Join {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        member: String,
    },
    /// Leave a room
    Leave {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        member: String,
    },
    /// Broadcast a message
    Send {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        content: String,
    },
    /// Poll a room's transport
    #[serde(alias = "receive")]
    Recv {
        #[serde(default)]
        room_id: String,
    },
    /// Queue content on a room's transport as if a peer sent it
    Inbound {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        content: String,
    },
    /// Stop the loop
    #[serde(alias = "quit")]
    Exit,
}

impl Command {
    /// Parse one input line
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>, ValidationError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if line.starts_with('{') {
            return serde_json::from_str(line)
                .map(Some)
                .map_err(|e| ValidationError::MalformedCommand(e.to_string()));
        }

        let (verb, rest) = next_word(line);
        let command = match verb.to_ascii_lowercase().as_str() {
            "create" => {
                let (room_id, rest) = next_word(rest);
                let (transport, _) = next_word(rest);
                Command::Create {
                    room_id: room_id.to_string(),
                    transport: transport.to_string(),
                }
            }
            "join" => {
                let (room_id, member) = next_word(rest);
                Command::Join {
                    room_id: room_id.to_string(),
                    member: member.trim().to_string(),
                }
            }
            "leave" => {
                let (room_id, member) = next_word(rest);
                Command::Leave {
                    room_id: room_id.to_string(),
                    member: member.trim().to_string(),
                }
            }
            "send" => {
                let (room_id, content) = next_word(rest);
                Command::Send {
                    room_id: room_id.to_string(),
                    content: content.trim().to_string(),
                }
            }
            "recv" | "receive" => {
                let (room_id, _) = next_word(rest);
                Command::Recv {
                    room_id: room_id.to_string(),
                }
            }
            "inbound" => {
                let (room_id, content) = next_word(rest);
                Command::Inbound {
                    room_id: room_id.to_string(),
                    content: content.trim().to_string(),
                }
            }
            "exit" | "quit" => Command::Exit,
            _ => return Err(ValidationError::UnknownCommand(verb.to_string())),
        };
        Ok(Some(command))
    }

    /// Validate arguments and build the matching operation
    pub fn into_operation(self, ctx: Context) -> Result<Box<dyn Operation>, ValidationError> {
        let operation: Box<dyn Operation> = match self {
            Command::Create { room_id, transport } => {
                Box::new(CreateRoom::new(ctx, &room_id, &transport)?)
            }
            Command::Join { room_id, member } => Box::new(JoinRoom::new(ctx, &room_id, &member)?),
            Command::Leave { room_id, member } => {
                Box::new(LeaveRoom::new(ctx, &room_id, &member)?)
            }
            Command::Send { room_id, content } => {
                Box::new(SendMessage::new(ctx, &room_id, &content)?)
            }
            Command::Recv { room_id } => Box::new(ReceiveMessage::new(ctx, &room_id)?),
            Command::Inbound { room_id, content } => {
                Box::new(InjectMessage::new(ctx, &room_id, &content)?)
            }
            Command::Exit => Box::new(Shutdown),
        };
        Ok(operation)
    }
}

/// Split off the first whitespace-separated word
fn next_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    }
}
