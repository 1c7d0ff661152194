//! Operation layer
//!
//! Each console command becomes an `Operation`: a unit of work whose inputs
//! are validated at construction and which runs against a shared `Context`.
//! `Audited` wraps any operation with before/after logging without touching
//! its result.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{AppError, ValidationError};
use crate::member::ConsoleMember;
use crate::message::InboundMessage;
use crate::output::Output;
use crate::registry::RoomRegistry;
use crate::room::Room;
use crate::transport::{TransportKind, Wire};
use crate::types::{MemberName, RoomId};

/// Shared state every operation runs against
#[derive(Debug, Clone)]
pub struct Context {
    pub registry: Arc<RoomRegistry>,
    /// Medium behind every transport adapter
    pub wire: Wire,
    /// Where console members print their notifications
    pub console: Output,
    pub settings: Settings,
}

impl Context {
    /// Build a context with a fresh registry configured from `settings`
    pub fn new(wire: Wire, console: Output, settings: Settings) -> Self {
        Self {
            registry: Arc::new(RoomRegistry::with_send_timeout(settings.send_timeout)),
            wire,
            console,
            settings,
        }
    }

    /// Resolve `id`, creating it with the default transport if absent
    fn resolve_default(&self, id: &RoomId) -> Result<Arc<Room>, AppError> {
        let kind = self.settings.default_transport;
        let (room, created) = self.registry.get_or_create(id, || kind.build(&self.wire))?;
        if created {
            info!(room = %id, transport = %kind, "Room auto-created with default transport");
        }
        Ok(room)
    }
}

/// Success value of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    RoomReady {
        room: RoomId,
        transport: TransportKind,
        created: bool,
    },
    Joined {
        room: RoomId,
        member: MemberName,
        added: bool,
    },
    Left {
        room: RoomId,
        member: MemberName,
        removed: bool,
    },
    Sent {
        room: RoomId,
        delivered: usize,
        failed: usize,
    },
    Received {
        room: RoomId,
        message: Option<InboundMessage>,
    },
    Queued {
        room: RoomId,
    },
    Shutdown,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::RoomReady {
                room,
                transport,
                created: true,
            } => write!(f, "Chat room {} created ({}).", room, transport),
            Outcome::RoomReady { room, transport, .. } => {
                write!(f, "Chat room {} already exists ({}).", room, transport)
            }
            Outcome::Joined {
                room,
                member,
                added: true,
            } => write!(f, "{} has joined {}", member, room),
            Outcome::Joined { room, member, .. } => write!(f, "{} is already in {}", member, room),
            Outcome::Left {
                room,
                member,
                removed: true,
            } => write!(f, "{} has left {}", member, room),
            Outcome::Left { room, member, .. } => write!(f, "{} is not in {}", member, room),
            Outcome::Sent {
                room,
                delivered,
                failed: 0,
            } => write!(f, "Message sent to {} ({} delivered)", room, delivered),
            Outcome::Sent {
                room,
                delivered,
                failed,
            } => write!(
                f,
                "Message sent to {} ({} delivered, {} failed)",
                room, delivered, failed
            ),
            Outcome::Received {
                room,
                message: Some(msg),
            } => write!(f, "Message Received in {}: {}", room, msg.content),
            Outcome::Received { room, message: None } => write!(f, "No messages in {}", room),
            Outcome::Queued { room } => write!(f, "Inbound message queued for {}", room),
            Outcome::Shutdown => write!(f, "Exiting the application."),
        }
    }
}

/// A validated, executable unit of work
#[async_trait]
pub trait Operation: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn execute(&self) -> Result<Outcome, AppError>;

    /// Wrap this operation with audit logging
    fn audited(self) -> Audited<Self>
    where
        Self: Sized,
    {
        Audited::new(self)
    }
}

#[async_trait]
impl<O: Operation + ?Sized> Operation for Box<O> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn execute(&self) -> Result<Outcome, AppError> {
        (**self).execute().await
    }
}

/// Audit-log decorator
///
/// Logs under the `audit` target before and after the inner operation and
/// returns its result unchanged.
pub struct Audited<O> {
    inner: O,
}

impl<O: Operation> Audited<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

#[async_trait]
impl<O: Operation> Operation for Audited<O> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn execute(&self) -> Result<Outcome, AppError> {
        let operation = self.inner.name();
        let started = Instant::now();
        info!(target: "audit", operation, "Executing operation");

        let result = self.inner.execute().await;

        let elapsed_us = started.elapsed().as_micros() as u64;
        match &result {
            Ok(outcome) => {
                info!(target: "audit", operation, elapsed_us, outcome = %outcome, "Operation succeeded")
            }
            Err(e) => {
                warn!(target: "audit", operation, elapsed_us, kind = e.kind(), error = %e, "Operation failed")
            }
        }
        result
    }
}

/// Create a room bound to a chosen transport
#[derive(Debug)]
pub struct CreateRoom {
    ctx: Context,
    room: RoomId,
    transport: TransportKind,
}

impl CreateRoom {
    pub fn new(ctx: Context, room_id: &str, transport: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            room: RoomId::new(room_id)?,
            transport: transport.parse()?,
            ctx,
        })
    }
}

#[async_trait]
impl Operation for CreateRoom {
    fn name(&self) -> &'static str {
        "create"
    }

    async fn execute(&self) -> Result<Outcome, AppError> {
        let kind = self.transport;
        let (room, created) = self
            .ctx
            .registry
            .get_or_create(&self.room, || kind.build(&self.ctx.wire))?;

        if !created && room.transport_kind() != kind {
            info!(
                room = %self.room,
                requested = %kind,
                bound = %room.transport_kind(),
                "Room exists, keeping its transport"
            );
        }

        Ok(Outcome::RoomReady {
            room: self.room.clone(),
            transport: room.transport_kind(),
            created,
        })
    }
}

/// Add a console member to a room
#[derive(Debug)]
pub struct JoinRoom {
    ctx: Context,
    room: RoomId,
    member: MemberName,
}

impl JoinRoom {
    pub fn new(ctx: Context, room_id: &str, member: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            room: RoomId::new(room_id)?,
            member: MemberName::new(member)?,
            ctx,
        })
    }
}

#[async_trait]
impl Operation for JoinRoom {
    fn name(&self) -> &'static str {
        "join"
    }

    async fn execute(&self) -> Result<Outcome, AppError> {
        let room = self.ctx.resolve_default(&self.room)?;
        let member = ConsoleMember::new(self.member.clone(), self.ctx.console.clone());
        let added = room.add_member(Arc::new(member))?;

        Ok(Outcome::Joined {
            room: self.room.clone(),
            member: self.member.clone(),
            added,
        })
    }
}

/// Remove a member from a room
#[derive(Debug)]
pub struct LeaveRoom {
    ctx: Context,
    room: RoomId,
    member: MemberName,
}

impl LeaveRoom {
    pub fn new(ctx: Context, room_id: &str, member: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            room: RoomId::new(room_id)?,
            member: MemberName::new(member)?,
            ctx,
        })
    }
}

#[async_trait]
impl Operation for LeaveRoom {
    fn name(&self) -> &'static str {
        "leave"
    }

    async fn execute(&self) -> Result<Outcome, AppError> {
        let removed = match self.ctx.registry.get(&self.room)? {
            Some(room) => room.remove_member(&self.member)?,
            None => false,
        };

        Ok(Outcome::Left {
            room: self.room.clone(),
            member: self.member.clone(),
            removed,
        })
    }
}

/// Format content and broadcast it in a room
#[derive(Debug)]
pub struct SendMessage {
    ctx: Context,
    room: RoomId,
    content: String,
}

impl SendMessage {
    pub fn new(ctx: Context, room_id: &str, content: &str) -> Result<Self, ValidationError> {
        let room = RoomId::new(room_id)?;
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(Self {
            ctx,
            room,
            content: content.to_string(),
        })
    }
}

#[async_trait]
impl Operation for SendMessage {
    fn name(&self) -> &'static str {
        "send"
    }

    async fn execute(&self) -> Result<Outcome, AppError> {
        let content = self.ctx.settings.format.apply(&self.content);
        let room = self.ctx.resolve_default(&self.room)?;
        let summary = room.broadcast(&content).await?;

        Ok(Outcome::Sent {
            room: self.room.clone(),
            delivered: summary.delivered,
            failed: summary.failed,
        })
    }
}

/// Poll a room's transport once
#[derive(Debug)]
pub struct ReceiveMessage {
    ctx: Context,
    room: RoomId,
}

impl ReceiveMessage {
    pub fn new(ctx: Context, room_id: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            room: RoomId::new(room_id)?,
            ctx,
        })
    }
}

#[async_trait]
impl Operation for ReceiveMessage {
    fn name(&self) -> &'static str {
        "recv"
    }

    async fn execute(&self) -> Result<Outcome, AppError> {
        let message = match self.ctx.registry.get(&self.room)? {
            Some(room) => room.receive().await?,
            None => None,
        };

        Ok(Outcome::Received {
            room: self.room.clone(),
            message,
        })
    }
}

/// Queue inbound content on a room's transport
///
/// The content is encoded by the room's adapter, so a later `recv` reads it
/// back the same way it would read data from a peer.
#[derive(Debug)]
pub struct InjectMessage {
    ctx: Context,
    room: RoomId,
    content: String,
}

impl InjectMessage {
    pub fn new(ctx: Context, room_id: &str, content: &str) -> Result<Self, ValidationError> {
        let room = RoomId::new(room_id)?;
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(Self {
            ctx,
            room,
            content: content.to_string(),
        })
    }
}

#[async_trait]
impl Operation for InjectMessage {
    fn name(&self) -> &'static str {
        "inbound"
    }

    async fn execute(&self) -> Result<Outcome, AppError> {
        let room = self.ctx.resolve_default(&self.room)?;
        room.inject(&self.content).await?;

        Ok(Outcome::Queued {
            room: self.room.clone(),
        })
    }
}

/// Stop the operation loop
#[derive(Debug, Default)]
pub struct Shutdown;

#[async_trait]
impl Operation for Shutdown {
    fn name(&self) -> &'static str {
        "exit"
    }

    async fn execute(&self) -> Result<Outcome, AppError> {
        Ok(Outcome::Shutdown)
    }
}
