//! Allocation client contract.

use async_trait::async_trait;
use common::RoomId;

use crate::error::AllocationError;

/// Protocol client for the remote room allocation service.
///
/// Every method is a single round trip with no retries of its own; retry and
/// circuit breaking are layered on top by the caller.
#[async_trait]
pub trait AllocationClient: Send + Sync {
    /// Asks for any available room. `None` means there is no inventory.
    async fn allocate(&self) -> Result<Option<RoomId>, AllocationError>;

    /// Finalizes the hold on a previously allocated room.
    async fn confirm(&self, room_id: RoomId) -> Result<(), AllocationError>;

    /// Gives a previously allocated room back.
    async fn release(&self, room_id: RoomId) -> Result<(), AllocationError>;
}
