use crate::common::constants::{
    DRY_AIR_GAS_CONSTANT, INTERFACE_BASE_HEIGHT, INTERFACE_TOP_HEIGHT, LAYER_THICKNESS,
    METERS_PER_KILOMETER, PASCALS_PER_MILLIBAR, PLUME_TOP_VELOCITY_THRESHOLD,
};
use crate::domain::{PlumeError, PlumeResult};
use crate::modules::trace::PlumeTrace;
use crate::numerics::{Boundary, resample};
use std::f64::consts::PI;

/// Mass budget of one model level, SI units throughout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelBudget {
    /// m
    pub height: f64,
    /// Pa
    pub pressure: f64,
    /// m/s
    pub vertical_velocity: f64,
    /// m
    pub radius: f64,
    /// kg/m3
    pub density: f64,
    /// m2
    pub area: f64,
    /// Air mass in a nominal 100 m layer, kg.
    pub layer_mass: f64,
    /// Mass entrained into the layer, kg/s.
    pub entrained_flux: f64,
    /// Vertical mass flux through the interface below, kg/s.
    pub inbound_flux: f64,
    /// Vertical mass flux through the interface above, kg/s.
    pub outbound_flux: f64,
}

impl LevelBudget {
    /// Conservation residual: what comes in and is not carried upward leaves the plume here.
    pub fn detrainment(&self) -> f64 {
        self.inbound_flux + self.entrained_flux - self.outbound_flux
    }
}

/// Fixed interface grid for the vertical mass flux: 25 m, then every 100 m up to 19800 m.
pub fn interface_heights() -> Vec<f64> {
    let steps = (INTERFACE_TOP_HEIGHT / LAYER_THICKNESS) as usize;
    std::iter::once(INTERFACE_BASE_HEIGHT)
        .chain((1..=steps).map(|step| step as f64 * LAYER_THICKNESS))
        .collect()
}

/// Height of the first level, scanning upward, where the plume slows below 1 m/s.
///
/// A non-monotonic velocity profile yields the lowest such crossing.
pub fn plume_top_height(heights: &[f64], vertical_velocities: &[f64]) -> PlumeResult<f64> {
    heights
        .iter()
        .zip(vertical_velocities)
        .find(|(_, velocity)| **velocity < PLUME_TOP_VELOCITY_THRESHOLD)
        .map(|(height, _)| *height)
        .ok_or_else(|| {
            PlumeError::input_validation(
                "INPUT.PLUME_TOP_NOT_FOUND",
                format!(
                    "vertical velocity never drops below {} m/s; the plume does not detrain",
                    PLUME_TOP_VELOCITY_THRESHOLD
                ),
            )
        })
}

/// Converts the trace to SI units and attaches per-level entrainment and interface fluxes.
///
/// A level draws its inbound flux from the highest interface strictly below it (zero when
/// none is) and sends its outbound flux through the lowest interface at or above it (zero
/// above the top of the interface grid).
pub fn level_budgets(trace: &PlumeTrace) -> PlumeResult<Vec<LevelBudget>> {
    if trace.len() < 2 {
        return Err(PlumeError::input_validation(
            "INPUT.TRACE_TOO_SHORT",
            format!(
                "plume trace needs at least 2 levels to interpolate; {} provided",
                trace.len()
            ),
        ));
    }

    let mut budgets = trace
        .levels()
        .iter()
        .map(|level| {
            let height = level.height_km * METERS_PER_KILOMETER;
            let radius = level.radius_km * METERS_PER_KILOMETER;
            let pressure = level.pressure_mb * PASCALS_PER_MILLIBAR;
            let density = pressure / (level.plume_temperature * DRY_AIR_GAS_CONSTANT);
            let area = PI * radius * radius;
            let layer_mass = LAYER_THICKNESS * area * density;
            let net_entrainment_rate = -level.entrainment * level.vertical_velocity;
            LevelBudget {
                height,
                pressure,
                vertical_velocity: level.vertical_velocity,
                radius,
                density,
                area,
                layer_mass,
                entrained_flux: net_entrainment_rate * layer_mass,
                inbound_flux: 0.0,
                outbound_flux: 0.0,
            }
        })
        .collect::<Vec<_>>();

    if let Some(index) = budgets
        .windows(2)
        .position(|pair| pair[1].height <= pair[0].height)
    {
        return Err(PlumeError::input_validation(
            "INPUT.TRACE_ORDER",
            format!(
                "plume trace heights must be strictly increasing; {} m follows {} m at level {}",
                budgets[index + 1].height,
                budgets[index].height,
                index + 1
            ),
        ));
    }

    let interfaces = interface_heights();
    let interface_fluxes = interface_mass_fluxes(&budgets, &interfaces)?;
    for budget in budgets.iter_mut() {
        let (below, above) = bracketing_interfaces(&interfaces, budget.height);
        budget.inbound_flux = below.map_or(0.0, |index| interface_fluxes[index]);
        budget.outbound_flux = above.map_or(0.0, |index| interface_fluxes[index]);
    }

    Ok(budgets)
}

/// Keeps levels at or below `plume_top + 100 m` and closes the budget at the top level.
pub fn truncate_at_plume_top(mut budgets: Vec<LevelBudget>, plume_top: f64) -> Vec<LevelBudget> {
    let ceiling = plume_top + LAYER_THICKNESS;
    budgets.retain(|budget| budget.height <= ceiling);
    if let Some(top) = budgets.last_mut() {
        top.outbound_flux = 0.0;
    }
    budgets
}

pub fn clamp_negative(values: &mut [f64]) {
    for value in values.iter_mut() {
        if *value < 0.0 {
            *value = 0.0;
        }
    }
}

/// Scales `values` so they sum to one.
pub fn normalize_weights(values: &[f64]) -> PlumeResult<Vec<f64>> {
    let total = values.iter().sum::<f64>();
    if !total.is_finite() {
        return Err(PlumeError::computation(
            "RUN.DETRAIN_NON_FINITE",
            "detrainment weights sum to a non-finite value",
        ));
    }
    if total <= 0.0 {
        return Err(PlumeError::computation(
            "RUN.DETRAIN_ZERO_SUM",
            "detrainment weights sum to zero; the profile cannot be normalized",
        ));
    }
    Ok(values.iter().map(|value| value / total).collect())
}

/// Indices into `interfaces` of the interface below and the interface at or above `height`.
pub fn bracketing_interfaces(interfaces: &[f64], height: f64) -> (Option<usize>, Option<usize>) {
    let split = interfaces.partition_point(|interface| *interface < height);
    let below = split.checked_sub(1);
    let above = (split < interfaces.len()).then_some(split);
    (below, above)
}

fn interface_mass_fluxes(budgets: &[LevelBudget], interfaces: &[f64]) -> PlumeResult<Vec<f64>> {
    let heights = budgets.iter().map(|budget| budget.height).collect::<Vec<_>>();
    let velocities = budgets
        .iter()
        .map(|budget| budget.vertical_velocity)
        .collect::<Vec<_>>();
    let densities = budgets.iter().map(|budget| budget.density).collect::<Vec<_>>();
    let radii = budgets.iter().map(|budget| budget.radius).collect::<Vec<_>>();

    let resampled = |values: &[f64]| {
        resample(&heights, values, interfaces, Boundary::Extrapolate).ok_or_else(|| {
            PlumeError::internal(
                "SYS.INTERFACE_RESAMPLE",
                "failed to resample plume trace onto the interface grid",
            )
        })
    };

    let velocity_at = resampled(&velocities)?;
    let density_at = resampled(&densities)?;
    let radius_at = resampled(&radii)?;

    Ok(velocity_at
        .iter()
        .zip(&density_at)
        .zip(&radius_at)
        .map(|((velocity, density), radius)| density * velocity * PI * radius * radius)
        .collect())
}
