//! Integration tests for the full ledger pipeline.
//!
//! Tests: record_trip → EventStore → in-memory state → restore
//!
//! Verifies:
//! - The reference trip scenarios (petrol 50 km, diesel 30 km after a day)
//! - Concurrent writers on one account never lose an update
//! - A restored ledger matches the one that wrote the events

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use carbonledger_core::{AccountId, DomainError, ManualClock, SystemClock};
    use carbonledger_emissions::{EmissionFactorTable, FuelType, VehicleMode};

    use crate::event_store::{EventStore, InMemoryEventStore};
    use crate::ledger::EmissionLedger;

    fn test_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 6, 45, 0).unwrap()
    }

    fn setup() -> (
        EmissionLedger<Arc<InMemoryEventStore>, Arc<ManualClock>>,
        Arc<InMemoryEventStore>,
        Arc<ManualClock>,
    ) {
        let store = Arc::new(InMemoryEventStore::new());
        let clock = Arc::new(ManualClock::new(test_start()));
        let ledger = EmissionLedger::new(
            Arc::new(EmissionFactorTable::standard()),
            store.clone(),
            clock.clone(),
        );
        (ledger, store, clock)
    }

    #[test]
    fn personal_vehicle_trip_then_reset_after_a_day() {
        let (ledger, _, clock) = setup();
        let owner = AccountId::new();

        // Petrol is code 0.
        ledger.record_trip_code(owner, 0, 0, 50).unwrap();
        assert_eq!(ledger.trip_count(owner), 1);
        assert_eq!(ledger.trip(owner, 0).unwrap().co2_emitted, 50 * 192);
        assert_eq!(ledger.daily_emissions(owner), 50 * 192);

        clock.advance(Duration::seconds(86_400));

        // Diesel is code 1.
        ledger.record_trip_code(owner, 0, 1, 30).unwrap();
        assert_eq!(ledger.daily_emissions(owner), 30 * 171);
        assert_eq!(ledger.trip_count(owner), 2);

        assert!(matches!(
            ledger.trip(owner, 5).unwrap_err().as_domain(),
            Some(DomainError::OutOfRange { .. })
        ));
    }

    #[test]
    fn every_travel_mode_can_be_recorded() {
        let (ledger, _, _) = setup();
        let owner = AccountId::new();

        ledger
            .record_trip(owner, VehicleMode::PersonalVehicle, FuelType::Electric, 20)
            .unwrap();
        ledger
            .record_trip(owner, VehicleMode::Roadways, FuelType::Cng, 40)
            .unwrap();
        ledger
            .record_trip(owner, VehicleMode::Railways, FuelType::Electric, 300)
            .unwrap();
        ledger
            .record_trip(owner, VehicleMode::Airways, FuelType::JetFuel, 1_100)
            .unwrap();

        let expected = 20 * 53 + 40 * 90 + 300 * 6 + 1_100 * 255;
        assert_eq!(ledger.daily_emissions(owner), expected);
        assert_eq!(ledger.total_emissions(owner), expected);

        let modes: Vec<VehicleMode> = ledger.trips(owner).iter().map(|t| t.vehicle_mode).collect();
        assert_eq!(modes, VehicleMode::ALL.to_vec());
    }

    #[test]
    fn concurrent_writers_on_one_account_do_not_lose_updates() {
        let (ledger, store, _) = setup();
        let owner = AccountId::new();
        const THREADS: usize = 8;
        const TRIPS_PER_THREAD: usize = 50;

        thread::scope(|scope| {
            for worker in 0..THREADS {
                let ledger = &ledger;
                scope.spawn(move || {
                    for _ in 0..TRIPS_PER_THREAD {
                        let fuel = if worker % 2 == 0 { 0 } else { 1 };
                        ledger.record_trip_code(owner, 0, fuel, 10).unwrap();
                    }
                });
            }
        });

        let total_trips = THREADS * TRIPS_PER_THREAD;
        let half = (total_trips / 2) as u64;
        assert_eq!(ledger.trip_count(owner), total_trips);
        assert_eq!(ledger.daily_emissions(owner), half * 10 * 192 + half * 10 * 171);

        // Indices are gapless and match the persisted sequence.
        let stream = store.load_stream(owner).unwrap();
        assert_eq!(stream.len(), total_trips);
        for (idx, stored) in stream.iter().enumerate() {
            assert_eq!(stored.sequence_number, idx as u64 + 1);
        }
    }

    #[test]
    fn different_accounts_record_in_parallel() {
        let ledger = EmissionLedger::new(
            Arc::new(EmissionFactorTable::standard()),
            InMemoryEventStore::new(),
            SystemClock,
        );
        let owners: Vec<AccountId> = (0..6).map(|_| AccountId::new()).collect();

        thread::scope(|scope| {
            for owner in &owners {
                let ledger = &ledger;
                scope.spawn(move || {
                    for km in 1..=25 {
                        ledger
                            .record_trip(*owner, VehicleMode::Roadways, FuelType::Diesel, km)
                            .unwrap();
                    }
                });
            }
        });

        let per_account: u64 = (1..=25u64).map(|km| km * 105).sum();
        for owner in &owners {
            assert_eq!(ledger.trip_count(*owner), 25);
            assert_eq!(ledger.total_emissions(*owner), per_account);
        }
        assert_eq!(ledger.accounts().len(), owners.len());
    }

    #[test]
    fn restored_ledger_matches_original() {
        let (ledger, store, clock) = setup();
        let a = AccountId::new();
        let b = AccountId::new();

        ledger.record_trip_code(a, 0, 0, 50).unwrap();
        ledger.record_trip_code(b, 2, 3, 120).unwrap();
        clock.advance(Duration::hours(25));
        ledger.record_trip_code(a, 0, 1, 30).unwrap();
        ledger.record_trip_code(a, 1, 1, 8).unwrap();

        // The restored ledger gets a clock far in the future; replay must not read it.
        let restored = EmissionLedger::restore(
            Arc::new(EmissionFactorTable::standard()),
            store.clone(),
            Arc::new(ManualClock::new(test_start() + Duration::days(365))),
        )
        .unwrap();

        for owner in [a, b] {
            assert_eq!(restored.trips(owner), ledger.trips(owner));
            assert_eq!(restored.daily_emissions(owner), ledger.daily_emissions(owner));
            assert_eq!(
                restored.daily_state(owner).unwrap(),
                ledger.daily_state(owner).unwrap()
            );
        }
        assert_eq!(restored.accounts(), ledger.accounts());

        // Writes continue at the right stream version.
        let index = restored.record_trip_code(a, 0, 0, 1).unwrap();
        assert_eq!(index, 3);
        assert_eq!(restored.daily_emissions(a), 192);
        assert_eq!(store.load_stream(a).unwrap().len(), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: replaying the event log reproduces every account's state.
        #[test]
        fn restore_reproduces_state(
            trips in prop::collection::vec((0usize..3, 0u8..2, 0i64..400, 0i64..50_000), 1..30)
        ) {
            let (ledger, store, clock) = setup();
            let owners = [AccountId::new(), AccountId::new(), AccountId::new()];

            for (who, fuel, distance, gap_secs) in trips {
                clock.advance(Duration::seconds(gap_secs));
                ledger.record_trip_code(owners[who], 0, fuel, distance).unwrap();
            }

            let restored = EmissionLedger::restore(
                Arc::new(EmissionFactorTable::standard()),
                store,
                Arc::new(ManualClock::new(test_start())),
            ).unwrap();

            for owner in owners {
                prop_assert_eq!(restored.trip_count(owner), ledger.trip_count(owner));
                prop_assert_eq!(restored.trips(owner), ledger.trips(owner));
                prop_assert_eq!(restored.daily_emissions(owner), ledger.daily_emissions(owner));
                prop_assert_eq!(restored.total_emissions(owner), ledger.total_emissions(owner));
            }
        }
    }
}
