use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carbonledger_core::{AccountId, Aggregate, AggregateRoot, DomainError, DomainResult};
use carbonledger_events::Event;

use crate::daily::DailyEmissionState;
use crate::factors::{EmissionFactorTable, FuelType, VehicleMode};
use crate::trip::{Trip, TripIndex};

/// Aggregate root: one account's trip log and daily emission window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEmissions {
    id: AccountId,
    factors: Arc<EmissionFactorTable>,
    trips: Vec<Trip>,
    daily: Option<DailyEmissionState>,
    total_co2: u64,
    version: u64,
}

impl AccountEmissions {
    /// Empty aggregate (no trips yet) for a first command or for rehydration.
    pub fn empty(id: AccountId, factors: Arc<EmissionFactorTable>) -> Self {
        Self {
            id,
            factors,
            trips: Vec::new(),
            daily: None,
            total_co2: 0,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> AccountId {
        self.id
    }

    pub fn has_trips(&self) -> bool {
        !self.trips.is_empty()
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    pub fn trip(&self, index: TripIndex) -> DomainResult<&Trip> {
        self.trips
            .get(index)
            .ok_or_else(|| DomainError::out_of_range(index, self.trips.len()))
    }

    /// Trips in recording order.
    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    /// CO2 accumulated in the current window (0 before the first trip).
    pub fn daily_emissions(&self) -> u64 {
        self.daily.map(|d| d.accumulated_co2()).unwrap_or(0)
    }

    pub fn daily_state(&self) -> DomainResult<DailyEmissionState> {
        self.daily.ok_or(DomainError::unknown_account(self.id))
    }

    /// Lifetime CO2 across every recorded trip.
    pub fn total_emissions(&self) -> u64 {
        self.total_co2
    }
}

impl AggregateRoot for AccountEmissions {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordTrip.
///
/// `distance_km` is signed so that a negative distance coming from an
/// untyped caller is rejected by the domain rather than wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTrip {
    pub account_id: AccountId,
    pub vehicle_mode: VehicleMode,
    pub fuel_type: FuelType,
    pub distance_km: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountCommand {
    RecordTrip(RecordTrip),
}

/// Event: TripRecorded.
///
/// Carries the resulting daily window so that replay never recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRecorded {
    pub account_id: AccountId,
    pub trip_index: TripIndex,
    pub vehicle_mode: VehicleMode,
    pub fuel_type: FuelType,
    pub distance_km: u64,
    pub co2_emitted: u64,
    pub daily_total: u64,
    pub window_start: DateTime<Utc>,
    pub window_reset: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    TripRecorded(TripRecorded),
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::TripRecorded(_) => "emissions.trip.recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::TripRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for AccountEmissions {
    type Command = AccountCommand;
    type Event = AccountEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccountEvent::TripRecorded(e) => {
                self.id = e.account_id;
                self.trips.push(Trip {
                    vehicle_mode: e.vehicle_mode,
                    fuel_type: e.fuel_type,
                    distance_km: e.distance_km,
                    co2_emitted: e.co2_emitted,
                    recorded_at: e.occurred_at,
                });
                self.daily = Some(DailyEmissionState::open(e.daily_total, e.window_start));
                self.total_co2 = self.total_co2.saturating_add(e.co2_emitted);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::RecordTrip(cmd) => self.handle_record(cmd),
        }
    }
}

impl AccountEmissions {
    fn ensure_account_id(&self, account_id: AccountId) -> Result<(), DomainError> {
        if self.id != account_id {
            return Err(DomainError::invariant("account_id mismatch"));
        }
        Ok(())
    }

    fn handle_record(&self, cmd: &RecordTrip) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_account_id(cmd.account_id)?;

        let distance_km = u64::try_from(cmd.distance_km).map_err(|_| {
            DomainError::invalid_input(format!(
                "distance_km must not be negative (got {})",
                cmd.distance_km
            ))
        })?;

        let co2_emitted = self
            .factors
            .emission_for(cmd.vehicle_mode, cmd.fuel_type, distance_km)?;

        let (daily, window_reset) =
            DailyEmissionState::advance(self.daily.as_ref(), co2_emitted, cmd.occurred_at)?;

        if self.total_co2.checked_add(co2_emitted).is_none() {
            return Err(DomainError::invalid_input("lifetime CO2 total would overflow"));
        }

        Ok(vec![AccountEvent::TripRecorded(TripRecorded {
            account_id: cmd.account_id,
            trip_index: self.trips.len(),
            vehicle_mode: cmd.vehicle_mode,
            fuel_type: cmd.fuel_type,
            distance_km,
            co2_emitted,
            daily_total: daily.accumulated_co2(),
            window_start: daily.window_start(),
            window_reset,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daily::daily_window;
    use carbonledger_events::execute;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 9, 30, 0).unwrap()
    }

    fn test_account() -> AccountEmissions {
        AccountEmissions::empty(AccountId::new(), Arc::new(EmissionFactorTable::standard()))
    }

    fn record(
        account: &AccountEmissions,
        fuel_type: FuelType,
        distance_km: i64,
        occurred_at: DateTime<Utc>,
    ) -> AccountCommand {
        AccountCommand::RecordTrip(RecordTrip {
            account_id: account.id_typed(),
            vehicle_mode: VehicleMode::PersonalVehicle,
            fuel_type,
            distance_km,
            occurred_at,
        })
    }

    #[test]
    fn petrol_trip_emits_event_with_exact_co2() {
        let account = test_account();
        let events = account
            .handle(&record(&account, FuelType::Petrol, 50, test_time()))
            .unwrap();

        assert_eq!(events.len(), 1);
        let AccountEvent::TripRecorded(e) = &events[0];
        assert_eq!(e.trip_index, 0);
        assert_eq!(e.co2_emitted, 50 * 192);
        assert_eq!(e.daily_total, 9_600);
        assert_eq!(e.window_start, test_time());
        assert!(!e.window_reset);
    }

    #[test]
    fn recording_updates_count_and_daily_total() {
        let mut account = test_account();
        let cmd = record(&account, FuelType::Petrol, 50, test_time());
        execute(&mut account, &cmd).unwrap();

        assert_eq!(account.trip_count(), 1);
        assert_eq!(account.version(), 1);
        assert_eq!(account.trip(0).unwrap().co2_emitted, 9_600);
        assert_eq!(account.daily_emissions(), 9_600);
    }

    #[test]
    fn trip_after_a_day_resets_daily_total() {
        let mut account = test_account();
        let first = record(&account, FuelType::Petrol, 50, test_time());
        execute(&mut account, &first).unwrap();

        let later = test_time() + Duration::seconds(86_400);
        let second = record(&account, FuelType::Diesel, 30, later);
        let events = execute(&mut account, &second).unwrap();

        let AccountEvent::TripRecorded(e) = &events[0];
        assert!(e.window_reset);
        assert_eq!(account.daily_emissions(), 30 * 171);
        assert_eq!(account.daily_state().unwrap().window_start(), later);
        assert_eq!(account.total_emissions(), 9_600 + 5_130);
        assert_eq!(account.trip_count(), 2);
    }

    #[test]
    fn trips_within_a_day_accumulate() {
        let mut account = test_account();
        let first = record(&account, FuelType::Petrol, 50, test_time());
        execute(&mut account, &first).unwrap();
        let second = record(&account, FuelType::Diesel, 30, test_time() + Duration::hours(23));
        execute(&mut account, &second).unwrap();

        assert_eq!(account.daily_emissions(), 9_600 + 5_130);
        assert_eq!(account.daily_state().unwrap().window_start(), test_time());
    }

    #[test]
    fn negative_distance_is_rejected_without_state_change() {
        let mut account = test_account();
        let cmd = record(&account, FuelType::Petrol, -1, test_time());
        let err = execute(&mut account, &cmd).unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(account.trip_count(), 0);
        assert_eq!(account.version(), 0);
    }

    #[test]
    fn unsupported_mode_fuel_pair_is_rejected() {
        let account = test_account();
        let cmd = AccountCommand::RecordTrip(RecordTrip {
            account_id: account.id_typed(),
            vehicle_mode: VehicleMode::Airways,
            fuel_type: FuelType::Diesel,
            distance_km: 800,
            occurred_at: test_time(),
        });
        assert!(matches!(account.handle(&cmd), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn command_for_another_account_is_rejected() {
        let account = test_account();
        let cmd = AccountCommand::RecordTrip(RecordTrip {
            account_id: AccountId::new(),
            vehicle_mode: VehicleMode::PersonalVehicle,
            fuel_type: FuelType::Petrol,
            distance_km: 5,
            occurred_at: test_time(),
        });
        assert!(matches!(
            account.handle(&cmd),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn out_of_range_index_and_unknown_daily_state() {
        let mut account = test_account();
        assert_eq!(account.daily_emissions(), 0);
        assert_eq!(
            account.daily_state(),
            Err(DomainError::UnknownAccount(account.id_typed()))
        );

        let cmd = record(&account, FuelType::Petrol, 50, test_time());
        execute(&mut account, &cmd).unwrap();
        assert_eq!(account.trip(5), Err(DomainError::out_of_range(5, 1)));
    }

    #[test]
    fn event_type_is_stable() {
        let account = test_account();
        let events = account
            .handle(&record(&account, FuelType::Petrol, 1, test_time()))
            .unwrap();
        assert_eq!(events[0].event_type(), "emissions.trip.recorded");
        assert_eq!(events[0].occurred_at(), test_time());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every recorded trip's CO2 is exactly distance * factor.
        #[test]
        fn co2_is_distance_times_factor(
            mode_code in 0u8..4,
            fuel_code in 0u8..5,
            distance in 0i64..10_000_000,
        ) {
            let factors = EmissionFactorTable::standard();
            let mode = VehicleMode::try_from(mode_code).unwrap();
            let fuel = FuelType::try_from(fuel_code).unwrap();
            let mut account = AccountEmissions::empty(AccountId::new(), Arc::new(factors.clone()));
            let cmd = AccountCommand::RecordTrip(RecordTrip {
                account_id: account.id_typed(),
                vehicle_mode: mode,
                fuel_type: fuel,
                distance_km: distance,
                occurred_at: test_time(),
            });

            match factors.grams_per_km(mode, fuel) {
                Ok(grams) => {
                    execute(&mut account, &cmd).unwrap();
                    prop_assert_eq!(account.trip(0).unwrap().co2_emitted, distance as u64 * grams);
                }
                Err(_) => {
                    prop_assert!(execute(&mut account, &cmd).is_err());
                    prop_assert_eq!(account.trip_count(), 0);
                }
            }
        }

        /// Property: the daily total equals the sum of trips since the window opened.
        #[test]
        fn daily_total_matches_trips_since_window_start(
            trips in prop::collection::vec((0i64..5_000, 0i64..30_000), 1..40)
        ) {
            let mut account = test_account();
            let mut now = test_time();

            for (distance, gap_secs) in trips {
                now += Duration::seconds(gap_secs);
                let cmd = record(&account, FuelType::Petrol, distance, now);
                execute(&mut account, &cmd).unwrap();

                let window = account.daily_state().unwrap();
                let expected: u64 = account
                    .trips()
                    .iter()
                    .filter(|t| t.recorded_at >= window.window_start())
                    .map(|t| t.co2_emitted)
                    .sum();
                prop_assert_eq!(account.daily_emissions(), expected);
                prop_assert!(now < window.window_start() + daily_window());
            }
        }
    }
}
