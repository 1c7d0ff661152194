//! Room members
//!
//! A member is anything that can take a `Delivery` from a room. Rooms hold
//! members as `Arc<dyn Member>` and compare them by name.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::Delivery;
use crate::output::Output;
use crate::types::MemberName;

/// Receiver capability
#[async_trait]
pub trait Member: Send + Sync {
    /// Membership key within a room
    fn name(&self) -> &MemberName;

    /// Take one delivered message
    async fn deliver(&self, delivery: &Delivery) -> Result<(), SendError>;
}

/// Member that prints each delivery as a notification line
#[derive(Debug, Clone)]
pub struct ConsoleMember {
    name: MemberName,
    output: Output,
}

impl ConsoleMember {
    pub fn new(name: MemberName, output: Output) -> Self {
        Self { name, output }
    }
}

#[async_trait]
impl Member for ConsoleMember {
    fn name(&self) -> &MemberName {
        &self.name
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<(), SendError> {
        self.output.write_line(&format!(
            "{} received a new message in {}: {}",
            self.name,
            delivery.room,
            delivery.message.content()
        ))?;
        Ok(())
    }
}

/// Member backed by an mpsc channel
///
/// Used when deliveries are consumed by another task, e.g. a connection
/// writer.
#[derive(Debug, Clone)]
pub struct ChannelMember {
    name: MemberName,
    sender: mpsc::Sender<Delivery>,
}

impl ChannelMember {
    pub fn new(name: MemberName, sender: mpsc::Sender<Delivery>) -> Self {
        Self { name, sender }
    }

    /// Create a member together with the receiving end of its channel
    pub fn channel(name: MemberName, buffer: usize) -> (Self, mpsc::Receiver<Delivery>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self::new(name, sender), receiver)
    }
}

#[async_trait]
impl Member for ChannelMember {
    fn name(&self) -> &MemberName {
        &self.name
    }

    /// Returns an error if the channel is closed (receiver dropped).
    async fn deliver(&self, delivery: &Delivery) -> Result<(), SendError> {
        self.sender
            .send(delivery.clone())
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}
