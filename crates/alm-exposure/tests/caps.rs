use std::sync::Arc;

use alm_core::{Clock, FakeClock};
use alm_exposure::{
    CapReached, ExposureCaps, ExposureGovernor, FileKvStore, KvStore, MemoryKvStore, STORE_KEY,
};
use chrono::{DateTime, Duration, Local, TimeZone};
use pretty_assertions::assert_eq;

const SLOTS: [&str; 3] = ["plan", "report", "history"];

fn monday_evening() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 3, 2, 21, 30, 0).unwrap()
}

fn governor(clock: &FakeClock) -> ExposureGovernor {
    let clock: Arc<dyn Clock> = Arc::new(clock.clone());
    ExposureGovernor::new(
        Arc::new(MemoryKvStore::new()),
        ExposureCaps::default(),
        clock,
    )
}

#[test]
fn daily_cap_blocks_every_slot_until_midnight() {
    let clock = FakeClock::at(monday_evening());
    let gov = governor(&clock);

    gov.record_exposure("plan").unwrap();
    gov.record_exposure("report").unwrap();
    gov.record_exposure("history").unwrap();

    for slot in SLOTS {
        assert!(!gov.can_expose(slot).unwrap(), "{slot} should be capped");
    }
    assert_eq!(gov.evaluate("plan").unwrap().blocked_by, Some(CapReached::Daily));

    // 00:00:01 the next day.
    clock.set(Local.with_ymd_and_hms(2026, 3, 3, 0, 0, 1).unwrap());
    for slot in SLOTS {
        assert!(gov.can_expose(slot).unwrap(), "{slot} should reopen");
    }
    let state = gov.snapshot().unwrap();
    assert_eq!(state.daily_total, 0);
    assert!(state.daily_by_slot.is_empty());
    assert_eq!(state.weekly_total, 3);
}

#[test]
fn per_slot_cap_applies_before_daily_total() {
    let clock = FakeClock::at(monday_evening());
    let gov = governor(&clock);

    gov.record_exposure("plan").unwrap();
    assert!(gov.can_expose("plan").unwrap());
    gov.record_exposure("plan").unwrap();

    let decision = gov.evaluate("plan").unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.blocked_by, Some(CapReached::SlotDaily));
    assert_eq!(decision.daily_total, 2);
    assert!(gov.can_expose("report").unwrap());
    assert!(gov.can_expose("history").unwrap());
}

#[test]
fn weekly_cap_spans_days() {
    let clock = FakeClock::at(monday_evening());
    let gov = governor(&clock);

    // Monday through Thursday, three a day.
    for _ in 0..4 {
        for slot in SLOTS {
            gov.record_exposure(slot).unwrap();
        }
        clock.advance(Duration::days(1));
    }

    // Friday: daily counters are fresh but the week is spent.
    let decision = gov.evaluate("plan").unwrap();
    assert_eq!(decision.daily_total, 0);
    assert_eq!(decision.weekly_total, 12);
    assert_eq!(decision.blocked_by, Some(CapReached::Weekly));

    // Next Monday.
    clock.advance(Duration::days(3));
    assert!(gov.can_expose("plan").unwrap());
    assert_eq!(gov.snapshot().unwrap().weekly_total, 0);
}

#[test]
fn checking_never_counts() {
    let clock = FakeClock::at(monday_evening());
    let gov = governor(&clock);

    for _ in 0..10 {
        assert!(gov.can_expose("plan").unwrap());
    }
    assert_eq!(gov.snapshot().unwrap().daily_total, 0);
}

#[test]
fn state_survives_restart_in_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exposure.json");
    let clock = FakeClock::at(monday_evening());
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());

    let first = ExposureGovernor::new(
        Arc::new(FileKvStore::new(&path)),
        ExposureCaps::default(),
        Arc::clone(&shared),
    );
    first.record_exposure("plan").unwrap();
    first.record_exposure("plan").unwrap();
    drop(first);

    let second = ExposureGovernor::new(
        Arc::new(FileKvStore::new(&path)),
        ExposureCaps::default(),
        shared,
    );
    assert!(!second.can_expose("plan").unwrap());
    assert_eq!(second.snapshot().unwrap().daily_for("plan"), 2);
}

#[test]
fn rollover_on_read_is_not_persisted() {
    let store = Arc::new(MemoryKvStore::new());
    let clock = FakeClock::at(monday_evening());
    let gov = ExposureGovernor::new(
        Arc::clone(&store) as Arc<dyn KvStore>,
        ExposureCaps::default(),
        Arc::new(clock.clone()),
    );
    gov.record_exposure("plan").unwrap();

    clock.advance(Duration::days(1));
    assert_eq!(gov.snapshot().unwrap().daily_total, 0);

    let stored = store.get(STORE_KEY).unwrap().unwrap();
    assert_eq!(stored["day_key"], "2026-03-02");
    assert_eq!(stored["daily_total"], 1);
}

#[test]
fn corrupt_store_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exposure.json");
    std::fs::write(&path, "{ not json").unwrap();
    let clock = FakeClock::at(monday_evening());
    let gov = ExposureGovernor::new(
        Arc::new(FileKvStore::new(&path)),
        ExposureCaps::default(),
        Arc::new(clock),
    );

    assert!(gov.can_expose("plan").unwrap());
    let state = gov.record_exposure("plan").unwrap();
    assert_eq!(state.daily_total, 1);
    assert_eq!(gov.snapshot().unwrap().daily_total, 1);
}

#[test]
fn invalid_state_shape_starts_fresh() {
    let store = Arc::new(MemoryKvStore::new());
    store
        .set(STORE_KEY, serde_json::json!({ "daily_total": "lots" }))
        .unwrap();
    let gov = ExposureGovernor::new(
        store,
        ExposureCaps::default(),
        Arc::new(FakeClock::at(monday_evening())),
    );
    assert_eq!(gov.snapshot().unwrap().daily_total, 0);
    assert!(gov.can_expose("plan").unwrap());
}
