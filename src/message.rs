//! Message value types
//!
//! `Message` is the immutable unit distributed by a room. `Frame` is the JSON
//! wire record written and read by the framed transport.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{MessageId, RoomId};

/// Chat message
///
/// Plain value: cloning yields an independent copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    content: String,
}

impl Message {
    /// Create a message with a fresh ID
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            content: content.into(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A message handed to a member by a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub room: RoomId,
    pub message: Message,
}

/// Framed transport wire record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    pub room: String,
    pub content: String,
}

/// Message polled from a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub room: RoomId,
    pub content: String,
    /// Present when the transport carries message IDs
    pub id: Option<Uuid>,
}
