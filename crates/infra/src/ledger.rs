//! The emission ledger: per-account trip logs behind single-writer locks.
//!
//! ```text
//! record_trip(account, ...)
//!   ↓
//! 1. Find the account slot; an unknown account gets one only after its
//!    first trip passes validation
//!   ↓
//! 2. Lock the account; stamp the command with clock.now()
//!   ↓
//! 3. Decide events (pure, may fail with InvalidInput)
//!   ↓
//! 4. Append to the event store (ExpectedVersion::Exact)
//!   ↓
//! 5. Apply events to the in-memory aggregate, release the lock
//! ```
//!
//! A failure in steps 3 or 4 leaves the account exactly as it was.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use carbonledger_core::{
    AccountId, Aggregate, AggregateRoot, Clock, DomainError, EventId, ExpectedVersion,
};
use carbonledger_emissions::{
    AccountCommand, AccountEmissions, AccountEvent, DailyEmissionState, EmissionFactorTable,
    FuelType, RecordTrip, Trip, TripIndex, VehicleMode,
};
use carbonledger_events::EventEnvelope;

use crate::error::LedgerError;
use crate::event_store::{EventStore, StoredEvent, UncommittedEvent};

/// Stream type of every account stream in the event store.
pub const ACCOUNT_STREAM: &str = "emissions.account";

type AccountSlot = Arc<Mutex<AccountEmissions>>;

fn lock(slot: &AccountSlot) -> MutexGuard<'_, AccountEmissions> {
    // State changes only after a successful append; a poisoned lock still guards a consistent aggregate.
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-account trip store with daily emission windows.
///
/// - Writes to one account are serialized by that account's mutex.
/// - Different accounts never contend beyond a brief map lookup.
/// - The factor table is fixed at construction.
#[derive(Debug)]
pub struct EmissionLedger<S, C> {
    factors: Arc<EmissionFactorTable>,
    store: S,
    clock: C,
    accounts: RwLock<HashMap<AccountId, AccountSlot>>,
}

impl<S, C> EmissionLedger<S, C>
where
    S: EventStore,
    C: Clock,
{
    pub fn new(factors: Arc<EmissionFactorTable>, store: S, clock: C) -> Self {
        Self {
            factors,
            store,
            clock,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild a ledger from every account stream already in `store`.
    ///
    /// Streams are validated (account id, stream type, gapless sequence) and
    /// replayed in order; the clock is not consulted.
    pub fn restore(
        factors: Arc<EmissionFactorTable>,
        store: S,
        clock: C,
    ) -> Result<Self, LedgerError> {
        let ledger = Self::new(factors, store, clock);

        let mut restored = HashMap::new();
        for account_id in ledger.store.streams()? {
            let history = ledger.store.load_stream(account_id)?;
            validate_loaded_stream(account_id, &history)?;

            let mut account = AccountEmissions::empty(account_id, ledger.factors.clone());
            for stored in &history {
                let envelope = stored.decode::<AccountEvent>()?;
                validate_trip_index(account_id, account.trip_count(), envelope.payload())?;
                account.apply(envelope.payload());
            }
            restored.insert(account_id, Arc::new(Mutex::new(account)));
        }

        tracing::info!(accounts = restored.len(), "emission ledger restored");
        *ledger
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner) = restored;

        Ok(ledger)
    }

    pub fn factors(&self) -> &EmissionFactorTable {
        &self.factors
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a trip and return its zero-based index in the account's log.
    pub fn record_trip(
        &self,
        account_id: AccountId,
        vehicle_mode: VehicleMode,
        fuel_type: FuelType,
        distance_km: i64,
    ) -> Result<TripIndex, LedgerError> {
        let command = |occurred_at| {
            AccountCommand::RecordTrip(RecordTrip {
                account_id,
                vehicle_mode,
                fuel_type,
                distance_km,
                occurred_at,
            })
        };
        let rejected = |err: &DomainError| {
            tracing::debug!(%account_id, %vehicle_mode, %fuel_type, distance_km, error = %err, "trip rejected");
        };

        let slot = match self.slot(account_id) {
            Some(slot) => slot,
            None => {
                // Unknown accounts get a slot only once their first trip validates.
                AccountEmissions::empty(account_id, self.factors.clone())
                    .handle(&command(self.clock.now()))
                    .inspect_err(&rejected)?;
                self.slot_or_insert(account_id)
            }
        };
        let mut account = lock(&slot);

        let events = account
            .handle(&command(self.clock.now()))
            .inspect_err(&rejected)?;

        let uncommitted = events
            .iter()
            .map(|ev| UncommittedEvent::from_typed(account_id, ACCOUNT_STREAM, EventId::new(), ev))
            .collect::<Result<Vec<_>, _>>()?;
        self.store
            .append(uncommitted, ExpectedVersion::Exact(account.version()))?;

        let mut index = account.trip_count();
        for ev in &events {
            account.apply(ev);
            let AccountEvent::TripRecorded(e) = ev;
            index = e.trip_index;
            if e.window_reset {
                tracing::info!(%account_id, window_start = %e.window_start, "daily emission window reset");
            }
            tracing::info!(
                %account_id,
                trip_index = e.trip_index,
                vehicle_mode = %e.vehicle_mode,
                fuel_type = %e.fuel_type,
                distance_km = e.distance_km,
                co2_emitted = e.co2_emitted,
                daily_total = e.daily_total,
                "trip recorded"
            );
        }

        Ok(index)
    }

    /// Record a trip given raw numeric codes (`FuelType` 0 = petrol, 1 = diesel, ...).
    pub fn record_trip_code(
        &self,
        account_id: AccountId,
        vehicle_mode: u8,
        fuel_type: u8,
        distance_km: i64,
    ) -> Result<TripIndex, LedgerError> {
        let vehicle_mode = VehicleMode::try_from(vehicle_mode)?;
        let fuel_type = FuelType::try_from(fuel_type)?;
        self.record_trip(account_id, vehicle_mode, fuel_type, distance_km)
    }

    /// Number of trips ever recorded (0 for an account with none).
    pub fn trip_count(&self, account_id: AccountId) -> usize {
        self.with_account(account_id, AccountEmissions::trip_count)
            .unwrap_or(0)
    }

    pub fn trip(&self, account_id: AccountId, index: TripIndex) -> Result<Trip, LedgerError> {
        self.with_account(account_id, |account| account.trip(index).cloned())
            .unwrap_or(Err(DomainError::out_of_range(index, 0)))
            .map_err(LedgerError::from)
    }

    pub fn trips(&self, account_id: AccountId) -> Vec<Trip> {
        self.with_account(account_id, |account| account.trips().to_vec())
            .unwrap_or_default()
    }

    /// CO2 accumulated in the account's current window, as of its last trip.
    pub fn daily_emissions(&self, account_id: AccountId) -> u64 {
        self.with_account(account_id, AccountEmissions::daily_emissions)
            .unwrap_or(0)
    }

    pub fn daily_state(&self, account_id: AccountId) -> Result<DailyEmissionState, LedgerError> {
        self.with_account(account_id, AccountEmissions::daily_state)
            .unwrap_or(Err(DomainError::unknown_account(account_id)))
            .map_err(LedgerError::from)
    }

    pub fn total_emissions(&self, account_id: AccountId) -> u64 {
        self.with_account(account_id, AccountEmissions::total_emissions)
            .unwrap_or(0)
    }

    /// Accounts with at least one recorded trip, sorted.
    pub fn accounts(&self) -> Vec<AccountId> {
        let slots: Vec<(AccountId, AccountSlot)> = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, slot)| (*id, slot.clone()))
            .collect();

        let mut ids: Vec<AccountId> = slots
            .into_iter()
            .filter(|(_, slot)| lock(slot).has_trips())
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    /// The account's persisted `TripRecorded` events, oldest first.
    pub fn history(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<EventEnvelope<AccountEvent>>, LedgerError> {
        let stream = self.store.load_stream(account_id)?;
        stream
            .iter()
            .map(|stored| stored.decode::<AccountEvent>().map_err(LedgerError::from))
            .collect()
    }

    fn slot(&self, account_id: AccountId) -> Option<AccountSlot> {
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&account_id)
            .cloned()
    }

    fn slot_or_insert(&self, account_id: AccountId) -> AccountSlot {
        if let Some(slot) = self.slot(account_id) {
            return slot;
        }

        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        accounts
            .entry(account_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(AccountEmissions::empty(
                    account_id,
                    self.factors.clone(),
                )))
            })
            .clone()
    }

    fn with_account<T>(
        &self,
        account_id: AccountId,
        f: impl FnOnce(&AccountEmissions) -> T,
    ) -> Option<T> {
        let slot = self.slot(account_id)?;
        let account = lock(&slot);
        Some(f(&account))
    }
}

fn validate_loaded_stream(account_id: AccountId, stream: &[StoredEvent]) -> Result<(), LedgerError> {
    // Sequence numbers must run 1, 2, 3, ... so the rebuilt version matches the store.
    for (idx, e) in stream.iter().enumerate() {
        let corrupt = |reason: String| LedgerError::CorruptStream { account_id, reason };

        if e.account_id != account_id {
            tracing::warn!(%account_id, index = idx, "stream contains foreign account_id");
            return Err(corrupt(format!("wrong account_id at index {idx}")));
        }
        if e.stream_type != ACCOUNT_STREAM {
            return Err(corrupt(format!(
                "unexpected stream type '{}' at index {idx}",
                e.stream_type
            )));
        }
        let expected = idx as u64 + 1;
        if e.sequence_number != expected {
            tracing::warn!(%account_id, expected, found = e.sequence_number, "stream has a sequence gap");
            return Err(corrupt(format!(
                "expected sequence_number {expected}, found {}",
                e.sequence_number
            )));
        }
    }
    Ok(())
}

fn validate_trip_index(
    account_id: AccountId,
    expected: TripIndex,
    event: &AccountEvent,
) -> Result<(), LedgerError> {
    let AccountEvent::TripRecorded(e) = event;
    if e.trip_index != expected {
        tracing::warn!(%account_id, expected, found = e.trip_index, "trip index out of order");
        return Err(LedgerError::CorruptStream {
            account_id,
            reason: format!("expected trip_index {expected}, found {}", e.trip_index),
        });
    }
    Ok(())
}
