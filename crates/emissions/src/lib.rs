//! Emissions domain module (event-sourced).
//!
//! Trip recording, CO2 computation and daily-window accounting, implemented
//! purely as deterministic domain logic (no IO, no clock reads, no storage).

pub mod account;
pub mod daily;
pub mod factors;
pub mod trip;

pub use account::{AccountCommand, AccountEmissions, AccountEvent, RecordTrip, TripRecorded};
pub use daily::{DAILY_WINDOW_SECS, DailyEmissionState, daily_window};
pub use factors::{EmissionFactor, EmissionFactorTable, FuelType, VehicleMode};
pub use trip::{Trip, TripIndex};
