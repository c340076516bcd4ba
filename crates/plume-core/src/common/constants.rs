//! Physical constants and fixed file names shared by the run stages.
//!
//! File names are dictated by the plume model binary, which reads and writes
//! them in its working directory.

/// Dry-air gas constant used for plume density, J/(kg K).
pub const DRY_AIR_GAS_CONSTANT: f64 = 287.0;
pub const METERS_PER_KILOMETER: f64 = 1000.0;
pub const PASCALS_PER_MILLIBAR: f64 = 100.0;
pub const METERS_PER_SECOND_PER_KNOT: f64 = 0.514444;
pub const SQUARE_METERS_PER_ACRE: f64 = 4047.0;

/// Vertical velocity below which the plume is considered to have stopped rising, m/s.
pub const PLUME_TOP_VELOCITY_THRESHOLD: f64 = 1.0;
/// Thickness of the nominal model layer used for layer mass and truncation, m.
pub const LAYER_THICKNESS: f64 = 100.0;
/// Lowest interface of the mass-flux grid, m.
pub const INTERFACE_BASE_HEIGHT: f64 = 25.0;
/// Top interface of the mass-flux grid, m (inclusive).
pub const INTERFACE_TOP_HEIGHT: f64 = 19800.0;

pub const NAMELIST_FILE: &str = "plume_namelist";
pub const MET_INPUT_FILE: &str = "env_met_input.dat";
pub const FINAL_PLUME_FILE: &str = "final_plume.dat";
pub const PLUME_EVOLUTION_FILE: &str = "plumegen.dat";
pub const LEGACY_GRADS_FILE: &str = "plumegen.gra";
pub const RUN_LOG_FILE: &str = "plume_log";
pub const DETRAIN_PROFILE_FILE: &str = "detrain_profile.dat";
pub const MODEL_STDOUT_CAPTURE: &str = ".model-stdout";
pub const MODEL_STDERR_CAPTURE: &str = ".model-stderr";

#[cfg(test)]
mod tests {
    use super::{
        INTERFACE_BASE_HEIGHT, INTERFACE_TOP_HEIGHT, LAYER_THICKNESS, METERS_PER_KILOMETER,
        PASCALS_PER_MILLIBAR,
    };

    #[test]
    fn unit_factors_match_expected_conversions() {
        assert_eq!(1.0 * METERS_PER_KILOMETER, 1000.0);
        assert_eq!(900.0 * PASCALS_PER_MILLIBAR, 90000.0);
    }

    #[test]
    fn interface_grid_bounds_align_with_layer_thickness() {
        assert!(INTERFACE_BASE_HEIGHT < LAYER_THICKNESS);
        assert_eq!(INTERFACE_TOP_HEIGHT % LAYER_THICKNESS, 0.0);
    }
}
