//! In-memory allocation service for testing.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::RoomId;
use parking_lot::Mutex;

use crate::client::AllocationClient;
use crate::error::AllocationError;

#[derive(Debug, Default)]
struct InMemoryAllocationState {
    inventory: VecDeque<RoomId>,
    held: HashSet<RoomId>,
    confirmed: HashSet<RoomId>,
    released: Vec<RoomId>,
    allocate_calls: u32,
    confirm_calls: u32,
    release_calls: u32,
    fail_allocate: u32,
    fail_confirm: u32,
    fail_release: u32,
    reject_confirm: bool,
    confirm_delay: Option<Duration>,
}

/// In-memory allocation service for testing.
///
/// Hands out rooms from a fixed inventory and counts every call that reaches
/// it. Failures can be scripted per operation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAllocationService {
    state: Arc<Mutex<InMemoryAllocationState>>,
}

impl InMemoryAllocationService {
    /// Creates a service with no inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service that will hand out `rooms` in order.
    pub fn with_rooms(rooms: impl IntoIterator<Item = i64>) -> Self {
        let service = Self::new();
        service.state.lock().inventory = rooms.into_iter().map(RoomId::new).collect();
        service
    }

    /// The next `times` allocate calls fail with `RemoteUnavailable`.
    pub fn set_fail_on_allocate(&self, times: u32) {
        self.state.lock().fail_allocate = times;
    }

    /// The next `times` confirm calls fail with `RemoteUnavailable`.
    pub fn set_fail_on_confirm(&self, times: u32) {
        self.state.lock().fail_confirm = times;
    }

    /// The next `times` release calls fail with `RemoteUnavailable`.
    pub fn set_fail_on_release(&self, times: u32) {
        self.state.lock().fail_release = times;
    }

    /// Confirm calls answer with a 409 rejection.
    pub fn set_reject_confirm(&self, reject: bool) {
        self.state.lock().reject_confirm = reject;
    }

    /// Confirm calls take `delay` before answering.
    pub fn set_confirm_delay(&self, delay: Option<Duration>) {
        self.state.lock().confirm_delay = delay;
    }

    pub fn allocate_calls(&self) -> u32 {
        self.state.lock().allocate_calls
    }

    pub fn confirm_calls(&self) -> u32 {
        self.state.lock().confirm_calls
    }

    pub fn release_calls(&self) -> u32 {
        self.state.lock().release_calls
    }

    /// Rooms successfully released, in order.
    pub fn released_rooms(&self) -> Vec<RoomId> {
        self.state.lock().released.clone()
    }

    /// Returns true if the room was allocated and neither confirmed nor released.
    pub fn is_held(&self, room_id: RoomId) -> bool {
        self.state.lock().held.contains(&room_id)
    }

    pub fn is_confirmed(&self, room_id: RoomId) -> bool {
        self.state.lock().confirmed.contains(&room_id)
    }

    /// Rooms still available for allocation.
    pub fn available_rooms(&self) -> usize {
        self.state.lock().inventory.len()
    }
}

#[async_trait]
impl AllocationClient for InMemoryAllocationService {
    async fn allocate(&self) -> Result<Option<RoomId>, AllocationError> {
        let mut state = self.state.lock();
        state.allocate_calls += 1;

        if state.fail_allocate > 0 {
            state.fail_allocate -= 1;
            return Err(AllocationError::RemoteUnavailable(
                "allocate: connection refused".to_string(),
            ));
        }

        let room = state.inventory.pop_front();
        if let Some(room) = room {
            state.held.insert(room);
        }
        Ok(room)
    }

    async fn confirm(&self, room_id: RoomId) -> Result<(), AllocationError> {
        let delay = {
            let mut state = self.state.lock();
            state.confirm_calls += 1;
            state.confirm_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.fail_confirm > 0 {
            state.fail_confirm -= 1;
            return Err(AllocationError::RemoteUnavailable(
                "confirm: read timed out".to_string(),
            ));
        }
        if state.reject_confirm || !state.held.contains(&room_id) {
            return Err(AllocationError::Rejected {
                operation: "confirm",
                status: 409,
            });
        }

        state.held.remove(&room_id);
        state.confirmed.insert(room_id);
        Ok(())
    }

    async fn release(&self, room_id: RoomId) -> Result<(), AllocationError> {
        let mut state = self.state.lock();
        state.release_calls += 1;

        if state.fail_release > 0 {
            state.fail_release -= 1;
            return Err(AllocationError::RemoteUnavailable(
                "release: connection reset".to_string(),
            ));
        }

        if state.held.remove(&room_id) {
            state.inventory.push_back(room_id);
        }
        state.released.push(room_id);
        Ok(())
    }
}
