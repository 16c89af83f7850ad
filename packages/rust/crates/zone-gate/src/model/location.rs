//! Coordinates and captured location snapshots.

use serde::{Deserialize, Serialize};

use crate::error::GatingFailure;

/// A validated WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees, within `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, within `[-180, 180]`.
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GatingFailure> {
        let coordinates = Self {
            latitude,
            longitude,
        };
        coordinates.validate()?;
        Ok(coordinates)
    }

    /// Check range constraints on an already-built value (e.g. one returned by a gateway).
    pub fn validate(&self) -> Result<(), GatingFailure> {
        let latitude_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let longitude_ok =
            self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if latitude_ok && longitude_ok {
            Ok(())
        } else {
            Err(GatingFailure::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Immutable location capture. Address fields are optional: a coordinates-only
/// snapshot is a valid intermediate result before reverse geocoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    /// Captured point.
    pub coordinates: Coordinates,
    /// Street-level address line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// City or locality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State or administrative area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Country name or code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl LocationSnapshot {
    /// Coordinates-only capture.
    pub fn from_coordinates(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            address: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
        }
    }

    /// Capture synthesized from a manually entered address.
    pub fn manual(coordinates: Coordinates, address: impl Into<String>) -> Self {
        let address = address.into();
        let trimmed = address.trim();
        Self {
            address: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            ..Self::from_coordinates(coordinates)
        }
    }

    /// Keep these coordinates but take every address field from `enriched`.
    #[must_use]
    pub fn with_address_from(&self, enriched: LocationSnapshot) -> Self {
        Self {
            coordinates: self.coordinates,
            address: enriched.address,
            city: enriched.city,
            state: enriched.state,
            postal_code: enriched.postal_code,
            country: enriched.country,
        }
    }

    /// Whether any address field is present.
    pub fn has_address(&self) -> bool {
        self.address.is_some()
            || self.city.is_some()
            || self.state.is_some()
            || self.postal_code.is_some()
            || self.country.is_some()
    }

    /// Single-line label for "last known location" display; falls back to coordinates.
    pub fn display_label(&self) -> String {
        let parts: Vec<&str> = [
            self.address.as_deref(),
            self.city.as_deref(),
            self.state.as_deref(),
            self.postal_code.as_deref(),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect();
        if parts.is_empty() {
            self.coordinates.to_string()
        } else {
            parts.join(", ")
        }
    }
}
