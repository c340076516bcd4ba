//! Run parameters, the value list handed to the plume model, and its sanity checks.

use crate::common::constants::SQUARE_METERS_PER_ACRE;
use crate::domain::{PlumeError, PlumeResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::warn;

/// Number of values the model reads from `plume_namelist`.
pub const NAMELIST_VALUE_COUNT: usize = 6;
/// Position the first sounding height is injected at.
pub const SURFACE_HEIGHT_SLOT: usize = 2;

pub const MIN_PLAUSIBLE_HEAT_FLUX: f64 = 1.0e-6;
pub const MAX_PLAUSIBLE_HEAT_FLUX: f64 = 10_000.0;
pub const MIN_PLAUSIBLE_BURN_AREA: f64 = 4.0e4;
pub const MAX_PLAUSIBLE_BURN_AREA: f64 = 4.0e8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParameters {
    /// kW/m2
    pub heat_flux: f64,
    /// m2
    pub burn_area: f64,
    pub wind_shear: bool,
    pub entrainment: f64,
    /// Passed through to the model, which currently ignores it.
    pub fuel_moisture: f64,
}

impl RunParameters {
    pub const DEFAULT_ENTRAINMENT: f64 = 0.05;
    pub const DEFAULT_FUEL_MOISTURE: f64 = 10.0;

    /// The five user-facing values in namelist order, before the sounding height is injected.
    pub fn user_values(&self) -> Vec<f64> {
        vec![
            self.heat_flux,
            self.burn_area,
            if self.wind_shear { 1.0 } else { 0.0 },
            self.entrainment,
            self.fuel_moisture,
        ]
    }

    pub fn to_namelist(&self, surface_height: f64) -> PlumeNamelist {
        PlumeNamelist::with_surface_height(self.user_values(), surface_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    HeatFluxTooSmall,
    HeatFluxTooLarge,
    BurnAreaTooSmall,
    BurnAreaTooLarge,
}

/// Non-fatal notice that a parameter sits outside its plausible physical range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl Display for ParameterWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(WARNING) {}", self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlumeNamelist {
    values: Vec<f64>,
}

impl PlumeNamelist {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Inserts the surface height into the user values at [`SURFACE_HEIGHT_SLOT`].
    pub fn with_surface_height(mut user_values: Vec<f64>, surface_height: f64) -> Self {
        let slot = SURFACE_HEIGHT_SLOT.min(user_values.len());
        user_values.insert(slot, surface_height);
        Self::new(user_values)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn heat_flux(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn burn_area(&self) -> Option<f64> {
        self.values.get(1).copied()
    }

    /// Fails on a wrong value count or non-finite values; returns range warnings otherwise.
    pub fn validate(&self) -> PlumeResult<Vec<ParameterWarning>> {
        if self.values.len() != NAMELIST_VALUE_COUNT {
            return Err(PlumeError::input_validation(
                "INPUT.NAMELIST_LENGTH",
                format!(
                    "namelist should contain {} parameters; {} provided",
                    NAMELIST_VALUE_COUNT - 1,
                    self.values.len().saturating_sub(1)
                ),
            ));
        }

        if let Some(index) = self.values.iter().position(|value| !value.is_finite()) {
            return Err(PlumeError::input_validation(
                "INPUT.NAMELIST_VALUE",
                format!("namelist value {} is not finite", index),
            ));
        }

        let heat_flux = self.values[0];
        let burn_area = self.values[1];
        let mut warnings = Vec::new();

        if heat_flux < MIN_PLAUSIBLE_HEAT_FLUX {
            warnings.push(ParameterWarning {
                kind: WarningKind::HeatFluxTooSmall,
                message: format!(
                    "The heat flux provided is very small ({} kW/m2)! Is this the correct value?",
                    heat_flux
                ),
            });
        } else if heat_flux > MAX_PLAUSIBLE_HEAT_FLUX {
            warnings.push(ParameterWarning {
                kind: WarningKind::HeatFluxTooLarge,
                message: format!(
                    "The heat flux provided is very large ({} kW/m2)! Is this the correct value?",
                    heat_flux
                ),
            });
        }

        let area_acres = burn_area / SQUARE_METERS_PER_ACRE;
        if burn_area < MIN_PLAUSIBLE_BURN_AREA {
            warnings.push(ParameterWarning {
                kind: WarningKind::BurnAreaTooSmall,
                message: format!(
                    "The fire area provided is very small ({:.2} acres)! Is this the correct value?",
                    area_acres
                ),
            });
        } else if burn_area > MAX_PLAUSIBLE_BURN_AREA {
            warnings.push(ParameterWarning {
                kind: WarningKind::BurnAreaTooLarge,
                message: format!(
                    "The fire area provided is very large ({:.2} acres)! Is this the correct value?",
                    area_acres
                ),
            });
        }

        for warning in &warnings {
            warn!(kind = ?warning.kind, "{}", warning.message);
        }

        Ok(warnings)
    }

    /// One value per line; integral values print without a fractional part.
    pub fn render(&self) -> String {
        let mut content = String::new();
        for value in &self.values {
            content.push_str(&value.to_string());
            content.push('\n');
        }
        content
    }
}
