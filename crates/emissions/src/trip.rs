use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carbonledger_core::ValueObject;

use crate::factors::{FuelType, VehicleMode};

/// Zero-based position of a trip in its account's log.
pub type TripIndex = usize;

/// A recorded trip (immutable once appended to an account's log).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub vehicle_mode: VehicleMode,
    pub fuel_type: FuelType,
    pub distance_km: u64,
    /// Grams of CO2 (`distance_km * grams_per_km`).
    pub co2_emitted: u64,
    pub recorded_at: DateTime<Utc>,
}

impl ValueObject for Trip {}
