use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, CorrelationId};
use domain::{Booking, BookingStatus, NewBooking};
use tokio::sync::RwLock;

use crate::{BookingStore, Result, StoreError};

#[derive(Default)]
struct Tables {
    bookings: HashMap<BookingId, Booking>,
    by_correlation_id: HashMap<CorrelationId, BookingId>,
    next_id: i64,
}

/// In-memory booking store.
///
/// Provides the same uniqueness guarantee on `correlation_id` as the
/// PostgreSQL implementation. Both indexes live behind one lock so an insert
/// is atomic with respect to concurrent lookups.
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
    fail_inserts: Arc<AtomicBool>,
    fail_updates: Arc<AtomicBool>,
}

impl InMemoryBookingStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of bookings stored.
    pub async fn booking_count(&self) -> usize {
        self.tables.read().await.bookings.len()
    }

    /// Makes every subsequent operation fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes inserts fail as if the database were down. Reads still work.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes updates fail as if the database were down. Reads still work.
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        Self::fail_if(&self.unavailable)
    }

    fn fail_if(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn find_by_correlation_id(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Option<Booking>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .by_correlation_id
            .get(correlation_id)
            .and_then(|id| tables.bookings.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>> {
        self.check_available()?;
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn insert(&self, booking: NewBooking) -> Result<Booking> {
        self.check_available()?;
        Self::fail_if(&self.fail_inserts)?;
        let mut tables = self.tables.write().await;

        if tables.by_correlation_id.contains_key(&booking.correlation_id) {
            return Err(StoreError::DuplicateCorrelationId(booking.correlation_id));
        }

        tables.next_id += 1;
        let id = BookingId::new(tables.next_id);
        let booking = booking.into_booking(id, Utc::now());

        tables
            .by_correlation_id
            .insert(booking.correlation_id.clone(), id);
        tables.bookings.insert(id, booking.clone());

        Ok(booking)
    }

    async fn update(&self, booking: &Booking) -> Result<Booking> {
        self.check_available()?;
        Self::fail_if(&self.fail_updates)?;
        let mut tables = self.tables.write().await;

        let stored = tables
            .bookings
            .get_mut(&booking.id)
            .ok_or(StoreError::NotFound(booking.id))?;
        stored.status = booking.status;
        stored.room_id = booking.room_id;

        Ok(stored.clone())
    }

    async fn find_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut pending: Vec<_> = tables
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .cloned()
            .collect();
        pending.sort_by_key(|b| (b.created_at, b.id));
        Ok(pending)
    }
}
