//! Room registry
//!
//! Get-or-create store mapping `RoomId` to `Room`. The map lock is held only
//! for lookup and insert, so a transport factory runs at most once per room
//! even when first accesses race. Rooms are never removed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::room::{Room, DEFAULT_SEND_TIMEOUT};
use crate::transport::Transport;
use crate::types::RoomId;

static GLOBAL: OnceLock<Arc<RoomRegistry>> = OnceLock::new();

/// Registry of all rooms
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, Arc<Room>>>,
    /// Send timeout given to rooms created by this registry
    send_timeout: Duration,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::with_send_timeout(DEFAULT_SEND_TIMEOUT)
    }

    pub fn with_send_timeout(send_timeout: Duration) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            send_timeout,
        }
    }

    /// Process-wide registry, created on first use
    pub fn global() -> Arc<RoomRegistry> {
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Initialise the process-wide registry with `send_timeout`
    ///
    /// Only the first initialisation takes effect. A later call returns the
    /// existing registry and warns if it asked for a different timeout.
    pub fn init_global(send_timeout: Duration) -> Arc<RoomRegistry> {
        let registry = GLOBAL
            .get_or_init(|| Arc::new(Self::with_send_timeout(send_timeout)))
            .clone();
        if registry.send_timeout != send_timeout {
            warn!(
                requested_ms = send_timeout.as_millis() as u64,
                active_ms = registry.send_timeout.as_millis() as u64,
                "Global registry already initialised, send timeout not applied"
            );
        }
        registry
    }

    /// Send timeout given to rooms created by this registry
    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Return the room for `id`, creating it with `factory` if absent
    pub fn resolve<F>(&self, id: &RoomId, factory: F) -> Result<Arc<Room>, AppError>
    where
        F: FnOnce() -> Box<dyn Transport>,
    {
        self.get_or_create(id, factory).map(|(room, _)| room)
    }

    /// Like `resolve`, also reporting whether this call created the room
    pub fn get_or_create<F>(&self, id: &RoomId, factory: F) -> Result<(Arc<Room>, bool), AppError>
    where
        F: FnOnce() -> Box<dyn Transport>,
    {
        let mut rooms = self.lock_rooms()?;
        if let Some(room) = rooms.get(id) {
            debug!(room = %id, "Room resolved");
            return Ok((room.clone(), false));
        }

        let room = Arc::new(Room::new(id.clone(), factory()).with_send_timeout(self.send_timeout));
        rooms.insert(id.clone(), room.clone());
        info!(room = %id, transport = %room.transport_kind(), total_rooms = rooms.len(), "Room created");
        Ok((room, true))
    }

    /// Look up an existing room
    pub fn get(&self, id: &RoomId) -> Result<Option<Arc<Room>>, AppError> {
        Ok(self.lock_rooms()?.get(id).cloned())
    }

    pub fn len(&self) -> Result<usize, AppError> {
        Ok(self.lock_rooms()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.lock_rooms()?.is_empty())
    }

    /// All room IDs, sorted
    pub fn room_ids(&self) -> Result<Vec<RoomId>, AppError> {
        let mut ids: Vec<RoomId> = self.lock_rooms()?.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    fn lock_rooms(&self) -> Result<MutexGuard<'_, HashMap<RoomId, Arc<Room>>>, AppError> {
        self.rooms.lock().map_err(|_| {
            error!("Room registry lock poisoned");
            AppError::Internal("room registry is corrupted".to_string())
        })
    }
}
