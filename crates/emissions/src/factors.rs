use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use carbonledger_core::{DomainError, DomainResult, ValueObject};

/// Travel mode of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleMode {
    PersonalVehicle,
    Roadways,
    Railways,
    Airways,
}

impl VehicleMode {
    pub const ALL: [VehicleMode; 4] = [
        VehicleMode::PersonalVehicle,
        VehicleMode::Roadways,
        VehicleMode::Railways,
        VehicleMode::Airways,
    ];

    /// Stable numeric code (0-based, declaration order).
    pub fn code(self) -> u8 {
        match self {
            VehicleMode::PersonalVehicle => 0,
            VehicleMode::Roadways => 1,
            VehicleMode::Railways => 2,
            VehicleMode::Airways => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleMode::PersonalVehicle => "personal_vehicle",
            VehicleMode::Roadways => "roadways",
            VehicleMode::Railways => "railways",
            VehicleMode::Airways => "airways",
        }
    }
}

impl TryFrom<u8> for VehicleMode {
    type Error = DomainError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        VehicleMode::ALL
            .into_iter()
            .find(|mode| mode.code() == code)
            .ok_or_else(|| DomainError::invalid_input(format!("unknown vehicle mode code {code}")))
    }
}

impl FromStr for VehicleMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VehicleMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| DomainError::invalid_input(format!("unknown vehicle mode '{s}'")))
    }
}

impl core::fmt::Display for VehicleMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fuel (or energy source) powering a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Petrol,
    Diesel,
    Cng,
    Electric,
    JetFuel,
}

impl FuelType {
    pub const ALL: [FuelType; 5] = [
        FuelType::Petrol,
        FuelType::Diesel,
        FuelType::Cng,
        FuelType::Electric,
        FuelType::JetFuel,
    ];

    /// Stable numeric code (Petrol = 0, Diesel = 1, ...).
    pub fn code(self) -> u8 {
        match self {
            FuelType::Petrol => 0,
            FuelType::Diesel => 1,
            FuelType::Cng => 2,
            FuelType::Electric => 3,
            FuelType::JetFuel => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FuelType::Petrol => "petrol",
            FuelType::Diesel => "diesel",
            FuelType::Cng => "cng",
            FuelType::Electric => "electric",
            FuelType::JetFuel => "jet_fuel",
        }
    }
}

impl TryFrom<u8> for FuelType {
    type Error = DomainError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        FuelType::ALL
            .into_iter()
            .find(|fuel| fuel.code() == code)
            .ok_or_else(|| DomainError::invalid_input(format!("unknown fuel type code {code}")))
    }
}

impl FromStr for FuelType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FuelType::ALL
            .into_iter()
            .find(|fuel| fuel.as_str() == s)
            .ok_or_else(|| DomainError::invalid_input(format!("unknown fuel type '{s}'")))
    }
}

impl core::fmt::Display for FuelType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the factor table: grams of CO2 per kilometre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionFactor {
    pub vehicle_mode: VehicleMode,
    pub fuel_type: FuelType,
    pub grams_per_km: u64,
}

impl ValueObject for EmissionFactor {}

const STANDARD_FACTORS: &[(VehicleMode, FuelType, u64)] = &[
    (VehicleMode::PersonalVehicle, FuelType::Petrol, 192),
    (VehicleMode::PersonalVehicle, FuelType::Diesel, 171),
    (VehicleMode::PersonalVehicle, FuelType::Cng, 141),
    (VehicleMode::PersonalVehicle, FuelType::Electric, 53),
    (VehicleMode::Roadways, FuelType::Diesel, 105),
    (VehicleMode::Roadways, FuelType::Cng, 90),
    (VehicleMode::Roadways, FuelType::Electric, 35),
    (VehicleMode::Railways, FuelType::Diesel, 41),
    (VehicleMode::Railways, FuelType::Electric, 6),
    (VehicleMode::Airways, FuelType::JetFuel, 255),
];

/// Immutable `(vehicle mode, fuel type) -> g/km` table.
///
/// Built once and shared (`Arc`) by everything that computes emissions. There
/// is no mutation API; a different table means constructing a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<EmissionFactor>", into = "Vec<EmissionFactor>")]
pub struct EmissionFactorTable {
    factors: BTreeMap<(VehicleMode, FuelType), u64>,
}

impl EmissionFactorTable {
    /// The built-in table (personal petrol car = 192 g/km, diesel = 171 g/km, ...).
    pub fn standard() -> Self {
        let factors = STANDARD_FACTORS
            .iter()
            .map(|&(mode, fuel, grams)| ((mode, fuel), grams))
            .collect();
        Self { factors }
    }

    /// Build a table from explicit rows.
    ///
    /// Rejects an empty table, zero factors and duplicate `(mode, fuel)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = EmissionFactor>) -> DomainResult<Self> {
        let mut factors = BTreeMap::new();
        for entry in entries {
            if entry.grams_per_km == 0 {
                return Err(DomainError::invalid_input(format!(
                    "emission factor for {}/{} must be positive",
                    entry.vehicle_mode, entry.fuel_type
                )));
            }
            let key = (entry.vehicle_mode, entry.fuel_type);
            if factors.insert(key, entry.grams_per_km).is_some() {
                return Err(DomainError::invalid_input(format!(
                    "duplicate emission factor for {}/{}",
                    entry.vehicle_mode, entry.fuel_type
                )));
            }
        }
        if factors.is_empty() {
            return Err(DomainError::invalid_input("emission factor table is empty"));
        }
        Ok(Self { factors })
    }

    pub fn grams_per_km(&self, vehicle_mode: VehicleMode, fuel_type: FuelType) -> DomainResult<u64> {
        self.factors
            .get(&(vehicle_mode, fuel_type))
            .copied()
            .ok_or_else(|| {
                DomainError::invalid_input(format!(
                    "no emission factor for {vehicle_mode} running on {fuel_type}"
                ))
            })
    }

    /// CO2 in grams for `distance_km` kilometres (exact integer product).
    pub fn emission_for(
        &self,
        vehicle_mode: VehicleMode,
        fuel_type: FuelType,
        distance_km: u64,
    ) -> DomainResult<u64> {
        let grams_per_km = self.grams_per_km(vehicle_mode, fuel_type)?;
        distance_km.checked_mul(grams_per_km).ok_or_else(|| {
            DomainError::invalid_input(format!("distance {distance_km} km overflows CO2 total"))
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = EmissionFactor> + '_ {
        self.factors
            .iter()
            .map(|(&(vehicle_mode, fuel_type), &grams_per_km)| EmissionFactor {
                vehicle_mode,
                fuel_type,
                grams_per_km,
            })
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

impl Default for EmissionFactorTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<EmissionFactor>> for EmissionFactorTable {
    type Error = DomainError;

    fn try_from(entries: Vec<EmissionFactor>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<EmissionFactorTable> for Vec<EmissionFactor> {
    fn from(table: EmissionFactorTable) -> Self {
        table.entries().collect()
    }
}
