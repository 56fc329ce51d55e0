use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

/// Errors raised while building ride requests
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("search radius must be greater than zero")]
    ZeroRadius,

    #[error("unknown vehicle kind: {0}")]
    UnknownVehicle(String),
}

/// Kind of vehicle a rider can order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum VehicleKind {
    Bike,
    Scooter,
    Car,
}

impl VehicleKind {
    /// Search radius used by the vehicle's HTTP route
    pub fn default_radius(self) -> SearchRadius {
        let r = match self {
            Self::Bike => 1,
            Self::Scooter => 2,
            Self::Car => 3,
        };
        SearchRadius(r)
    }

    /// Static HTML fragment returned once the ride is dispatched
    pub fn ordered_html(self) -> &'static str {
        match self {
            Self::Bike => "<p>Bike ordered</p>",
            Self::Scooter => "<p>Scooter ordered</p>",
            Self::Car => "<p>Car ordered</p>",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        s.parse()
            .map_err(|_| DomainError::UnknownVehicle(s.to_string()))
    }
}

/// Multiplier applied to the unit wait; always positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SearchRadius(u32);

impl SearchRadius {
    pub fn new(radius: u32) -> Result<Self, DomainError> {
        if radius == 0 {
            return Err(DomainError::ZeroRadius);
        }
        Ok(Self(radius))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for SearchRadius {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for SearchRadius {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = u32::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for SearchRadius {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
