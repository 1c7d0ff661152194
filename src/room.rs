//! Room struct definition
//!
//! A room owns one transport adapter and an ordered membership set.
//! Broadcasting first emits through the transport and only then delivers to
//! the members captured at the start of the call.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, TransportError};
use crate::member::Member;
use crate::message::{Delivery, InboundMessage, Message};
use crate::transport::{Transport, TransportKind};
use crate::types::{MemberName, MessageId, RoomId};

/// Upper bound for a single transport call or member delivery
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a successful broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub message_id: MessageId,
    /// Members that took the message
    pub delivered: usize,
    /// Members whose delivery failed or timed out
    pub failed: usize,
}

/// Chat room
///
/// Membership is a set keyed by member name, iterated in insertion order.
/// The transport is fixed for the lifetime of the room.
pub struct Room {
    id: RoomId,
    transport: Box<dyn Transport>,
    members: Mutex<Vec<Arc<dyn Member>>>,
    send_timeout: Duration,
    created_at: Instant,
}

impl Room {
    /// Create a new room bound to `transport`
    pub fn new(id: RoomId, transport: Box<dyn Transport>) -> Self {
        Self {
            id,
            transport,
            members: Mutex::new(Vec::new()),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            created_at: Instant::now(),
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Add a member
    ///
    /// Returns false (and changes nothing) if a member with the same name is
    /// already present.
    pub fn add_member(&self, member: Arc<dyn Member>) -> Result<bool, AppError> {
        let mut members = self.lock_members()?;
        if members.iter().any(|m| m.name() == member.name()) {
            debug!(room = %self.id, member = %member.name(), "Member already in room");
            return Ok(false);
        }

        info!(room = %self.id, member = %member.name(), "Member joined");
        members.push(member);
        Ok(true)
    }

    /// Remove a member by name
    ///
    /// Returns false if no such member was present.
    pub fn remove_member(&self, name: &MemberName) -> Result<bool, AppError> {
        let mut members = self.lock_members()?;
        let before = members.len();
        members.retain(|m| m.name() != name);

        let removed = members.len() != before;
        if removed {
            info!(room = %self.id, member = %name, "Member left");
        }
        Ok(removed)
    }

    /// Check if a member is in this room
    pub fn contains(&self, name: &MemberName) -> Result<bool, AppError> {
        Ok(self.lock_members()?.iter().any(|m| m.name() == name))
    }

    /// Member names in insertion order
    pub fn member_names(&self) -> Result<Vec<MemberName>, AppError> {
        Ok(self
            .lock_members()?
            .iter()
            .map(|m| m.name().clone())
            .collect())
    }

    pub fn member_count(&self) -> Result<usize, AppError> {
        Ok(self.lock_members()?.len())
    }

    /// Send `content` through the transport, then deliver it to every member
    ///
    /// Membership is captured before the transport call. If the transport
    /// fails or times out nobody receives the message. A failing member is
    /// logged and skipped.
    pub async fn broadcast(&self, content: &str) -> Result<BroadcastSummary, AppError> {
        let snapshot: Vec<Arc<dyn Member>> = {
            let members = self.lock_members()?;
            members.clone()
        };

        match timeout(self.send_timeout, self.transport.send(content, &self.id)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(room = %self.id, error = %e, "Transport send failed, broadcast aborted");
                return Err(e.into());
            }
            Err(_) => {
                warn!(room = %self.id, "Transport send timed out, broadcast aborted");
                return Err(TransportError::Timeout(self.send_timeout).into());
            }
        }

        let delivery = Delivery {
            room: self.id.clone(),
            message: Message::new(content),
        };

        let mut delivered = 0;
        let mut failed = 0;
        for member in &snapshot {
            match timeout(self.send_timeout, member.deliver(&delivery)).await {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    warn!(room = %self.id, member = %member.name(), error = %e, "Delivery failed");
                }
                Err(_) => {
                    failed += 1;
                    warn!(room = %self.id, member = %member.name(), "Delivery timed out");
                }
            }
        }

        debug!(
            room = %self.id,
            message_id = %delivery.message.id(),
            delivered,
            failed,
            "Broadcast complete"
        );

        Ok(BroadcastSummary {
            message_id: delivery.message.id(),
            delivered,
            failed,
        })
    }

    /// Poll the transport once for an inbound message
    pub async fn receive(&self) -> Result<Option<InboundMessage>, AppError> {
        let inbound = match timeout(self.send_timeout, self.transport.receive(&self.id)).await {
            Ok(result) => result?,
            Err(_) => return Err(TransportError::Timeout(self.send_timeout).into()),
        };

        match &inbound {
            Some(msg) => info!(room = %self.id, content = %msg.content, "Message received"),
            None => debug!(room = %self.id, "Nothing to receive"),
        }
        Ok(inbound)
    }

    /// Queue `content` on the transport as if a peer had sent it
    pub async fn inject(&self, content: &str) -> Result<(), AppError> {
        match timeout(self.send_timeout, self.transport.inject(content, &self.id)).await {
            Ok(result) => result?,
            Err(_) => return Err(TransportError::Timeout(self.send_timeout).into()),
        }

        debug!(room = %self.id, "Inbound message queued");
        Ok(())
    }

    fn lock_members(&self) -> Result<MutexGuard<'_, Vec<Arc<dyn Member>>>, AppError> {
        self.members.lock().map_err(|_| {
            error!(room = %self.id, "Membership lock poisoned");
            AppError::Internal(format!("membership of room '{}' is corrupted", self.id))
        })
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("transport", &self.transport.kind())
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SendError;
    use crate::member::ChannelMember;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Records every send; optionally fails all of them
    #[derive(Default)]
    struct RecordingTransport {
        sent: Arc<Mutex<Vec<(String, String)>>>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Direct
        }

        async fn send(&self, content: &str, room: &RoomId) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Unavailable("link down".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((room.to_string(), content.to_string()));
            Ok(())
        }

        async fn receive(&self, _room: &RoomId) -> Result<Option<InboundMessage>, TransportError> {
            Ok(None)
        }

        async fn inject(&self, _content: &str, _room: &RoomId) -> Result<(), TransportError> {
            Ok(())
        }
    }

    /// Blocks inside send until released
    struct GatedTransport {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Framed
        }

        async fn send(&self, _content: &str, _room: &RoomId) -> Result<(), TransportError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }

        async fn receive(&self, _room: &RoomId) -> Result<Option<InboundMessage>, TransportError> {
            Ok(None)
        }

        async fn inject(&self, _content: &str, _room: &RoomId) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct StalledTransport;

    #[async_trait]
    impl Transport for StalledTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Direct
        }

        async fn send(&self, _content: &str, _room: &RoomId) -> Result<(), TransportError> {
            std::future::pending().await
        }

        async fn receive(&self, _room: &RoomId) -> Result<Option<InboundMessage>, TransportError> {
            std::future::pending().await
        }

        async fn inject(&self, _content: &str, _room: &RoomId) -> Result<(), TransportError> {
            std::future::pending().await
        }
    }

    /// Appends its name to a shared log on every delivery
    struct LoggingMember {
        name: MemberName,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Member for LoggingMember {
        fn name(&self) -> &MemberName {
            &self.name
        }

        async fn deliver(&self, delivery: &Delivery) -> Result<(), SendError> {
            self.log.lock().unwrap().push(format!(
                "{}:{}",
                self.name,
                delivery.message.content()
            ));
            Ok(())
        }
    }

    fn name(n: &str) -> MemberName {
        MemberName::new(n).unwrap()
    }

    fn recording_room(id: &str) -> (Room, Arc<Mutex<Vec<(String, String)>>>) {
        let transport = RecordingTransport::default();
        let sent = transport.sent.clone();
        (Room::new(RoomId::new(id).unwrap(), Box::new(transport)), sent)
    }

    fn logging_member(n: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Member> {
        Arc::new(LoggingMember {
            name: name(n),
            log: log.clone(),
        })
    }

    #[test]
    fn test_room_creation() {
        let (room, _) = recording_room("room1");
        assert_eq!(room.id().as_str(), "room1");
        assert_eq!(room.transport_kind(), TransportKind::Direct);
        assert_eq!(room.member_count().unwrap(), 0);
    }

    #[test]
    fn test_add_member_twice_is_noop() {
        let (room, _) = recording_room("room1");
        let (alice, _rx) = ChannelMember::channel(name("alice"), 4);
        let alice: Arc<dyn Member> = Arc::new(alice);

        assert!(room.add_member(alice.clone()).unwrap());
        assert!(!room.add_member(alice).unwrap());
        assert_eq!(room.member_count().unwrap(), 1);
    }

    #[test]
    fn test_same_name_counts_as_same_member() {
        let (room, _) = recording_room("room1");
        let (first, _rx1) = ChannelMember::channel(name("alice"), 4);
        let (second, _rx2) = ChannelMember::channel(name("alice"), 4);

        assert!(room.add_member(Arc::new(first)).unwrap());
        assert!(!room.add_member(Arc::new(second)).unwrap());
        assert_eq!(room.member_count().unwrap(), 1);
    }

    #[test]
    fn test_remove_absent_member_is_noop() {
        let (room, _) = recording_room("room1");
        let (alice, _rx) = ChannelMember::channel(name("alice"), 4);
        room.add_member(Arc::new(alice)).unwrap();

        assert!(!room.remove_member(&name("bob")).unwrap());
        assert_eq!(room.member_names().unwrap(), vec![name("alice")]);

        assert!(room.remove_member(&name("alice")).unwrap());
        assert!(!room.contains(&name("alice")).unwrap());
    }

    #[tokio::test]
    async fn test_broadcast_in_insertion_order() {
        let (room, sent) = recording_room("room1");
        let log = Arc::new(Mutex::new(Vec::new()));
        for n in ["carol", "alice", "bob"] {
            room.add_member(logging_member(n, &log)).unwrap();
        }

        let summary = room.broadcast("hi").await.unwrap();

        assert_eq!(summary.delivered, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(*log.lock().unwrap(), vec!["carol:hi", "alice:hi", "bob:hi"]);
        assert_eq!(
            *sent.lock().unwrap(),
            vec![("room1".to_string(), "hi".to_string())]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_delivers_nothing() {
        let transport = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        let room = Room::new(RoomId::new("room1").unwrap(), Box::new(transport));
        let log = Arc::new(Mutex::new(Vec::new()));
        room.add_member(logging_member("alice", &log)).unwrap();

        let err = room.broadcast("hi").await.unwrap_err();

        assert!(matches!(err, AppError::Transport(TransportError::Unavailable(_))));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_timeout_aborts_broadcast() {
        let room = Room::new(RoomId::new("room1").unwrap(), Box::new(StalledTransport))
            .with_send_timeout(Duration::from_millis(20));
        let log = Arc::new(Mutex::new(Vec::new()));
        room.add_member(logging_member("alice", &log)).unwrap();

        let err = room.broadcast("hi").await.unwrap_err();

        assert!(matches!(err, AppError::Transport(TransportError::Timeout(_))));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_member_added_during_broadcast_misses_it() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let transport = GatedTransport {
            entered: entered.clone(),
            release: release.clone(),
        };
        let room = Arc::new(Room::new(RoomId::new("room1").unwrap(), Box::new(transport)));
        let log = Arc::new(Mutex::new(Vec::new()));
        room.add_member(logging_member("alice", &log)).unwrap();

        let task = {
            let room = room.clone();
            tokio::spawn(async move { room.broadcast("hi").await })
        };

        entered.notified().await;
        room.add_member(logging_member("late", &log)).unwrap();
        release.notify_one();

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.delivered, 1);
        assert_eq!(*log.lock().unwrap(), vec!["alice:hi"]);
        assert_eq!(room.member_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_member_removed_during_broadcast_still_receives_it() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let transport = GatedTransport {
            entered: entered.clone(),
            release: release.clone(),
        };
        let room = Arc::new(Room::new(RoomId::new("room1").unwrap(), Box::new(transport)));
        let log = Arc::new(Mutex::new(Vec::new()));
        room.add_member(logging_member("alice", &log)).unwrap();
        room.add_member(logging_member("bob", &log)).unwrap();

        let task = {
            let room = room.clone();
            tokio::spawn(async move { room.broadcast("hi").await })
        };

        entered.notified().await;
        assert!(room.remove_member(&name("bob")).unwrap());
        release.notify_one();

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.delivered, 2);
        assert_eq!(*log.lock().unwrap(), vec!["alice:hi", "bob:hi"]);
        assert_eq!(room.member_count().unwrap(), 1);
        assert!(!room.contains(&name("bob")).unwrap());
    }

    #[tokio::test]
    async fn test_closed_member_is_skipped() {
        let (room, _) = recording_room("room1");
        let (gone, rx) = ChannelMember::channel(name("gone"), 4);
        drop(rx);
        let (bob, mut bob_rx) = ChannelMember::channel(name("bob"), 4);
        room.add_member(Arc::new(gone)).unwrap();
        room.add_member(Arc::new(bob)).unwrap();

        let summary = room.broadcast("hi").await.unwrap();

        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(bob_rx.recv().await.unwrap().message.content(), "hi");
    }

    #[tokio::test]
    async fn test_receive_times_out() {
        let room = Room::new(RoomId::new("room1").unwrap(), Box::new(StalledTransport))
            .with_send_timeout(Duration::from_millis(20));

        let err = room.receive().await.unwrap_err();
        assert!(matches!(err, AppError::Transport(TransportError::Timeout(_))));

        let err = room.inject("hello").await.unwrap_err();
        assert!(matches!(err, AppError::Transport(TransportError::Timeout(_))));
    }
}
