//! Mass-balance detrainment profile derived from a steady-state plume trace.
//!
//! The trace is converted to SI units, the vertical mass flux is evaluated on a fixed
//! interface grid, and each level's detrainment is the residual of what flows in from
//! below plus what it entrains, minus what it passes upward. The residuals are clamped
//! at zero and normalized into weights that sum to one.

mod model;

use crate::common::constants::DETRAIN_PROFILE_FILE;
use crate::domain::{PlumeError, PlumeResult, TargetHeights, validate_target_heights};
use crate::modules::serialization::{render_delimited_table, write_text_artifact};
use crate::modules::trace::PlumeTrace;
use crate::numerics::{Boundary, resample};
use serde::Serialize;
use std::path::Path;

pub use model::{
    LevelBudget, bracketing_interfaces, clamp_negative, interface_heights, level_budgets, normalize_weights,
    plume_top_height, truncate_at_plume_top,
};

pub const PROFILE_HEADER: [&str; 2] = ["height(mAGL)", "detrain(unitless)"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetrainmentLevel {
    /// m AGL
    pub height: f64,
    pub weight: f64,
}

/// Normalized detrainment weights; non-negative and summing to one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetrainmentProfile {
    plume_top_height: f64,
    levels: Vec<DetrainmentLevel>,
}

impl DetrainmentProfile {
    pub fn levels(&self) -> &[DetrainmentLevel] {
        &self.levels
    }

    pub fn heights(&self) -> Vec<f64> {
        self.levels.iter().map(|level| level.height).collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.levels.iter().map(|level| level.weight).collect()
    }

    /// First height where the plume slowed below 1 m/s, m.
    pub fn plume_top_height(&self) -> f64 {
        self.plume_top_height
    }

    pub fn render(&self) -> String {
        let header = PROFILE_HEADER.map(str::to_string);
        render_delimited_table(
            &header,
            self.levels.iter().map(|level| [level.height, level.weight]),
            4,
        )
    }

    pub fn write(&self, path: &Path) -> PlumeResult<()> {
        write_text_artifact(path, &self.render())
    }

    pub fn write_into(&self, directory: &Path) -> PlumeResult<()> {
        self.write(&directory.join(DETRAIN_PROFILE_FILE))
    }
}

pub fn compute_detrainment_profile(
    trace: &PlumeTrace,
    targets: &TargetHeights,
) -> PlumeResult<DetrainmentProfile> {
    let budgets = level_budgets(trace)?;

    let heights = budgets.iter().map(|budget| budget.height).collect::<Vec<_>>();
    let velocities = budgets
        .iter()
        .map(|budget| budget.vertical_velocity)
        .collect::<Vec<_>>();
    let plume_top = plume_top_height(&heights, &velocities)?;

    let retained = truncate_at_plume_top(budgets, plume_top);
    let retained_heights = retained
        .iter()
        .map(|budget| budget.height)
        .collect::<Vec<_>>();
    let residuals = retained
        .iter()
        .map(LevelBudget::detrainment)
        .collect::<Vec<_>>();
    ensure_finite(&residuals)?;

    let (profile_heights, mut values) = match targets {
        TargetHeights::Native => (retained_heights, residuals),
        TargetHeights::Custom(target_heights) => {
            validate_target_heights(target_heights)?;
            let values = resample(&retained_heights, &residuals, target_heights, Boundary::Clamp)
                .ok_or_else(|| {
                    PlumeError::internal(
                        "SYS.DETRAIN_RESAMPLE",
                        "failed to resample detrainment onto target heights",
                    )
                })?;
            (target_heights.clone(), values)
        }
    };

    clamp_negative(&mut values);
    let weights = normalize_weights(&values)?;

    Ok(DetrainmentProfile {
        plume_top_height: plume_top,
        levels: profile_heights
            .into_iter()
            .zip(weights)
            .map(|(height, weight)| DetrainmentLevel { height, weight })
            .collect(),
    })
}

fn ensure_finite(values: &[f64]) -> PlumeResult<()> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(PlumeError::computation(
            "RUN.DETRAIN_NON_FINITE",
            format!(
                "detrainment residual at retained level {} is not finite; check plume temperature and radius",
                index
            ),
        )),
        None => Ok(()),
    }
}
