//! Cross-component tests for the dispatch engine.
//!
//! Individual components have inline `#[cfg(test)]` modules. These tests
//! drive the coordinator, dispatcher, allocator and store together, with
//! an emphasis on concurrent callers:
//!
//! 1. Concurrent call-next never double-claims
//! 2. Concurrent dispenses never overdraw a shared lot
//! 3. Full lifecycle with a mixed-priority queue
//! 4. KPI summary over real outcomes

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use u_dispense::clock::ManualClock;
use u_dispense::kpi::DispenseKpi;
use u_dispense::models::{LineItem, Priority, RequestState, StockLot};
use u_dispense::{DispatchConfig, DispatchCoordinator, DispatchError, InMemoryStore};

// ═══════════════════════════════════════════════════════════════════════════
// Test helpers
// ═══════════════════════════════════════════════════════════════════════════

fn coordinator(store: &Arc<InMemoryStore>) -> Arc<DispatchCoordinator<InMemoryStore>> {
    coordinator_with(store, DispatchConfig::default())
}

fn coordinator_with(
    store: &Arc<InMemoryStore>,
    config: DispatchConfig,
) -> Arc<DispatchCoordinator<InMemoryStore>> {
    Arc::new(
        DispatchCoordinator::new(store.clone(), config)
            .expect("default config is valid")
            .with_clock(Arc::new(ManualClock::new(0))),
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// 1. Concurrent call-next
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn fifty_callers_ten_requests_claim_each_exactly_once() {
    let store = Arc::new(InMemoryStore::new());
    let coordinator = coordinator(&store);
    for i in 0..10 {
        let priority = Priority::ALL[i % Priority::ALL.len()];
        coordinator.enqueue(&format!("RX-{i}"), priority).unwrap();
    }

    let barrier = Arc::new(Barrier::new(50));
    let handles: Vec<_> = (0..50)
        .map(|_| {
            let coordinator = coordinator.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                coordinator.call_next().unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let claimed: Vec<_> = results.iter().flatten().collect();
    let empty = results.iter().filter(|r| r.is_none()).count();

    let distinct: HashSet<_> = claimed.iter().map(|r| r.id).collect();
    assert_eq!(claimed.len(), 10);
    assert_eq!(distinct.len(), 10);
    assert_eq!(empty, 40);
    assert_eq!(store.count_in_state(RequestState::Claimed), 10);
    assert_eq!(store.count_in_state(RequestState::Waiting), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// 2. Concurrent dispenses against shared lots
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn concurrent_dispenses_never_overdraw_shared_lots() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_lot(StockLot::new("P-1", "paracetamol", 40, 1_000));
    store.insert_lot(StockLot::new("P-2", "paracetamol", 35, 2_000));
    // Every conflict means another desk committed, so 20 desks need at
    // most 20 retries.
    let coordinator = coordinator_with(
        &store,
        DispatchConfig::default().with_max_commit_retries(20),
    );

    // 20 prescriptions × 5 units = 100 demanded, 75 on hand.
    for i in 0..20 {
        let reference = format!("RX-{i}");
        store.set_line_items(&reference, vec![LineItem::new(0, "paracetamol", 5)]);
        coordinator.enqueue(&reference, Priority::Normal).unwrap();
    }
    let mut references = Vec::new();
    while let Some(request) = coordinator.call_next().unwrap() {
        references.push(request.reference_id);
    }
    assert_eq!(references.len(), 20);

    let barrier = Arc::new(Barrier::new(references.len()));
    let handles: Vec<_> = references
        .into_iter()
        .map(|reference| {
            let coordinator = coordinator.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                coordinator.dispense(&reference).unwrap()
            })
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let dispensed: u64 = outcomes.iter().map(|o| o.total_dispensed()).sum();
    let unmet: u64 = outcomes.iter().map(|o| o.total_unmet()).sum();
    assert_eq!(dispensed, 75);
    assert_eq!(unmet, 25);
    assert_eq!(store.lot("P-1").unwrap().quantity_available, 0);
    assert_eq!(store.lot("P-2").unwrap().quantity_available, 0);
    assert_eq!(store.count_in_state(RequestState::Completed), 20);

    let kpi = DispenseKpi::calculate(&outcomes);
    assert!((kpi.fill_rate - 0.75).abs() < 1e-10);
    assert_eq!(kpi.full_count + kpi.partial_count, 20);
}

// ═══════════════════════════════════════════════════════════════════════════
// 3. Lifecycle
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn lifecycle_is_waiting_claimed_completed() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_lot(StockLot::new("A-1", "A", 5, 1_000));
    store.insert_lot(StockLot::new("A-2", "A", 5, 2_000));
    store.insert_lot(StockLot::new("A-3", "A", 5, 3_000));
    store.set_line_items("RX-routine", vec![LineItem::new(0, "A", 12)]);
    store.set_line_items("RX-stat", vec![LineItem::new(0, "A", 2)]);
    let coordinator = coordinator(&store);

    let routine = coordinator.enqueue("RX-routine", Priority::Low).unwrap();
    coordinator.enqueue("RX-stat", Priority::Emergency).unwrap();

    // Waiting → dispense rejected, stock untouched.
    assert!(matches!(
        coordinator.dispense("RX-routine"),
        Err(DispatchError::NotClaimed { .. })
    ));
    assert_eq!(store.lot("A-1").unwrap().quantity_available, 5);

    // Emergency first.
    let first = coordinator.call_next().unwrap().unwrap();
    assert_eq!(first.reference_id, "RX-stat");
    let stat = coordinator.dispense("RX-stat").unwrap();
    assert!(stat.is_full());

    let second = coordinator.call_next().unwrap().unwrap();
    assert_eq!(second.id, routine);
    let outcome = coordinator.dispense("RX-routine").unwrap();
    assert!(outcome.is_full());
    assert_eq!(outcome.total_dispensed(), 12);

    // 15 - 2 - 12 = 1 left, in the latest-expiring lot.
    assert_eq!(store.lot("A-1").unwrap().quantity_available, 0);
    assert_eq!(store.lot("A-2").unwrap().quantity_available, 0);
    assert_eq!(store.lot("A-3").unwrap().quantity_available, 1);

    // Completed → dispense rejected, stock untouched.
    assert!(matches!(
        coordinator.dispense("RX-routine"),
        Err(DispatchError::NotClaimed {
            state: RequestState::Completed,
            ..
        })
    ));
    assert_eq!(store.lot("A-3").unwrap().quantity_available, 1);
    assert!(coordinator.call_next().unwrap().is_none());
}

#[test]
fn requeued_reference_is_served_again() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_lot(StockLot::new("A-1", "A", 3, 1_000));
    store.set_line_items("RX-1", vec![LineItem::new(0, "A", 5)]);
    let coordinator = coordinator(&store);

    coordinator.enqueue("RX-1", Priority::Normal).unwrap();
    coordinator.call_next().unwrap().unwrap();
    let first = coordinator.dispense("RX-1").unwrap();
    assert_eq!(first.total_unmet(), 2);

    // Restock and queue the balance as a fresh request.
    store.insert_lot(StockLot::new("A-2", "A", 10, 2_000));
    store.set_line_items("RX-1", vec![LineItem::new(0, "A", 2)]);
    let again = coordinator.enqueue("RX-1", Priority::High).unwrap();
    assert_ne!(again, first.request_id);

    assert_eq!(coordinator.call_next().unwrap().unwrap().id, again);
    let second = coordinator.dispense("RX-1").unwrap();
    assert!(second.is_full());
    assert_eq!(store.lot("A-2").unwrap().quantity_available, 8);
}
