//! Integration tests for the booking saga.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use allocation::InMemoryAllocationService;
use booking_store::{BookingStore, InMemoryBookingStore};
use chrono::NaiveDate;
use common::{CorrelationId, RoomId, UserId};
use domain::{BookingRequest, BookingStatus};
use futures_util::future::join_all;
use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig, RetryPolicy};
use saga::{BookingError, BookingOrchestrator};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

type TestOrchestrator = BookingOrchestrator<InMemoryBookingStore, InMemoryAllocationService>;

struct TestHarness {
    orchestrator: TestOrchestrator,
    store: InMemoryBookingStore,
    service: InMemoryAllocationService,
}

impl TestHarness {
    fn new(rooms: impl IntoIterator<Item = i64>) -> Self {
        Self::with_breaker(rooms, CircuitBreakerConfig::default())
    }

    fn with_breaker(rooms: impl IntoIterator<Item = i64>, config: CircuitBreakerConfig) -> Self {
        let store = InMemoryBookingStore::new();
        let service = InMemoryAllocationService::with_rooms(rooms);
        let orchestrator = BookingOrchestrator::new(
            store.clone(),
            service.clone(),
            Arc::new(CircuitBreaker::new("allocation", config)),
            RetryPolicy::new(RetryConfig::default()),
        );

        Self {
            orchestrator,
            store,
            service,
        }
    }
}

fn request(key: Option<&str>) -> BookingRequest {
    let request = BookingRequest::new(
        NaiveDate::from_ymd_opt(2026, 12, 20).unwrap(),
        NaiveDate::from_ymd_opt(2026, 12, 27).unwrap(),
    );
    match key {
        Some(key) => request.with_correlation_id(key),
        None => request,
    }
}

#[tokio::test(start_paused = true)]
async fn transient_allocation_failures_are_retried_with_backoff() {
    let harness = TestHarness::new([55]);
    harness.service.set_fail_on_allocate(2);
    let start = Instant::now();

    let booking = harness
        .orchestrator
        .create_booking(request(None), UserId::new(7), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.room_id, Some(RoomId::new(55)));
    assert_eq!(harness.service.allocate_calls(), 3);
    // 1s after the first failure, 2s after the second.
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn exhausted_allocation_cancels_without_compensation() {
    let harness = TestHarness::new([55]);
    harness.service.set_fail_on_allocate(3);

    let booking = harness
        .orchestrator
        .create_booking(request(None), UserId::new(7), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(booking.room_id, None);
    assert_eq!(harness.service.allocate_calls(), 3);
    assert_eq!(harness.service.confirm_calls(), 0);
    assert_eq!(harness.service.release_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn open_breaker_short_circuits_until_cooldown() {
    let harness = TestHarness::with_breaker(
        [9],
        CircuitBreakerConfig {
            failure_rate_threshold: 0.5,
            window_size: 2,
            minimum_calls: 2,
            cooldown: Duration::from_secs(30),
        },
    );
    harness.service.set_fail_on_allocate(100);
    let cancel = CancellationToken::new();

    // Two failures trip the breaker; the third attempt is rejected locally.
    let first = harness
        .orchestrator
        .create_booking(request(None), UserId::new(1), &cancel)
        .await
        .unwrap();
    assert_eq!(first.status, BookingStatus::Cancelled);
    assert_eq!(harness.service.allocate_calls(), 2);
    assert_eq!(harness.orchestrator.breaker().state(), CircuitState::Open);

    let second = harness
        .orchestrator
        .create_booking(request(None), UserId::new(2), &cancel)
        .await
        .unwrap();
    assert_eq!(second.status, BookingStatus::Cancelled);
    assert_eq!(second.room_id, None);
    assert_eq!(harness.service.allocate_calls(), 2);

    harness.service.set_fail_on_allocate(0);
    tokio::time::advance(Duration::from_secs(31)).await;

    let third = harness
        .orchestrator
        .create_booking(request(None), UserId::new(3), &cancel)
        .await
        .unwrap();
    assert_eq!(third.status, BookingStatus::Confirmed);
    assert_eq!(third.room_id, Some(RoomId::new(9)));
    assert_eq!(harness.orchestrator.breaker().state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn room_is_released_when_confirm_failures_open_the_breaker() {
    let harness = TestHarness::with_breaker(
        [77],
        CircuitBreakerConfig {
            failure_rate_threshold: 0.5,
            window_size: 4,
            minimum_calls: 3,
            cooldown: Duration::from_secs(30),
        },
    );
    harness.service.set_fail_on_confirm(3);

    let booking = harness
        .orchestrator
        .create_booking(request(None), UserId::new(1), &CancellationToken::new())
        .await
        .unwrap();

    // allocate ok, then two confirm failures open the circuit; the third
    // confirm attempt is rejected locally.
    assert_eq!(harness.orchestrator.breaker().state(), CircuitState::Open);
    assert_eq!(harness.service.confirm_calls(), 2);
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(booking.room_id, Some(RoomId::new(77)));
    assert_eq!(harness.service.release_calls(), 1);
    assert_eq!(harness.service.released_rooms(), vec![RoomId::new(77)]);
    assert!(!harness.service.is_held(RoomId::new(77)));
}

#[tokio::test(start_paused = true)]
async fn failed_pending_insert_releases_room_and_surfaces_error() {
    let harness = TestHarness::new([55]);
    harness.store.set_fail_inserts(true);

    let result = harness
        .orchestrator
        .create_booking(request(Some("lost")), UserId::new(1), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(BookingError::StoreUnavailable(_))));
    assert_eq!(harness.service.allocate_calls(), 1);
    assert_eq!(harness.service.confirm_calls(), 0);
    assert_eq!(harness.service.release_calls(), 1);
    assert_eq!(harness.service.available_rooms(), 1);
    assert_eq!(harness.store.booking_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_final_update_leaves_pending_record() {
    let harness = TestHarness::new([55]);
    harness.store.set_fail_updates(true);

    let result = harness
        .orchestrator
        .create_booking(request(Some("half")), UserId::new(1), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(BookingError::StoreUnavailable(_))));
    assert!(harness.service.is_confirmed(RoomId::new(55)));
    assert_eq!(harness.service.release_calls(), 0);

    let stored = harness
        .store
        .find_by_correlation_id(&CorrelationId::from("half"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, BookingStatus::Pending);
    assert_eq!(stored.room_id, Some(RoomId::new(55)));
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_with_same_key_share_one_booking() {
    let harness = TestHarness::new(1..=5);
    let cancel = CancellationToken::new();

    let attempts = (0..4).map(|_| {
        harness
            .orchestrator
            .create_booking(request(Some("dup-1")), UserId::new(1), &cancel)
    });
    let results = join_all(attempts).await;

    let ids: HashSet<_> = results
        .into_iter()
        .map(|result| result.unwrap().id)
        .collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(harness.store.booking_count().await, 1);

    let stored = harness
        .store
        .find_by_correlation_id(&CorrelationId::from("dup-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);

    // Rooms taken by the losers went back to the pool.
    assert_eq!(harness.service.available_rooms(), 4);
}

#[tokio::test(start_paused = true)]
async fn distinct_keys_get_distinct_rooms() {
    let harness = TestHarness::new([1, 2, 3]);
    let cancel = CancellationToken::new();

    let requests = ["a", "b", "c"].map(|key| {
        harness
            .orchestrator
            .create_booking(request(Some(key)), UserId::new(1), &cancel)
    });
    let bookings: Vec<_> = join_all(requests)
        .await
        .into_iter()
        .map(|result| result.unwrap())
        .collect();

    let rooms: HashSet<_> = bookings.iter().filter_map(|b| b.room_id).collect();
    assert_eq!(rooms.len(), 3);
    assert!(
        bookings
            .iter()
            .all(|b| b.status == BookingStatus::Confirmed)
    );
    assert_eq!(harness.store.booking_count().await, 3);
}

#[tokio::test(start_paused = true)]
async fn stale_pending_bookings_are_visible_for_reconciliation() {
    let harness = TestHarness::new([55]);
    harness
        .service
        .set_confirm_delay(Some(Duration::from_secs(600)));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let result = harness
        .orchestrator
        .create_booking(request(Some("stuck")), UserId::new(1), &cancel)
        .await;
    assert!(result.is_err());

    let pending = harness
        .store
        .find_pending_older_than(chrono::Utc::now() + chrono::Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].correlation_id, CorrelationId::from("stuck"));
    assert_eq!(pending[0].room_id, Some(RoomId::new(55)));
}
