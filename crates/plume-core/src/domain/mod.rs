pub mod errors;

pub use errors::{PlumeError, PlumeErrorCategory, PlumeResult};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Heights (m AGL) the detrainment profile is reported on.
///
/// `Native` keeps the model's own levels up to the plume top; `Custom` resamples
/// onto caller-supplied heights.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TargetHeights {
    #[default]
    Native,
    Custom(Vec<f64>),
}

impl TargetHeights {
    pub fn custom(heights: Vec<f64>) -> PlumeResult<Self> {
        validate_target_heights(&heights)?;
        Ok(Self::Custom(heights))
    }

    /// Upper bound on the number of levels a height range may expand to.
    pub const MAX_TARGET_LEVELS: usize = 100_000;

    /// Half-open `[start, stop)` range with a fixed step, matching `numpy.arange`.
    pub fn arange(start: f64, stop: f64, step: f64) -> PlumeResult<Self> {
        if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
            return Err(PlumeError::input_validation(
                "INPUT.TARGET_HEIGHTS",
                format!(
                    "height range {}:{}:{} must be finite",
                    start, stop, step
                ),
            ));
        }
        if step <= 0.0 || stop <= start {
            return Err(PlumeError::input_validation(
                "INPUT.TARGET_HEIGHTS",
                format!(
                    "height range {}:{}:{} must have a positive step and stop above start",
                    start, stop, step
                ),
            ));
        }

        let count = ((stop - start) / step).ceil();
        if count > Self::MAX_TARGET_LEVELS as f64 {
            return Err(PlumeError::input_validation(
                "INPUT.TARGET_HEIGHTS",
                format!(
                    "height range {}:{}:{} yields more than {} levels",
                    start, stop, step, Self::MAX_TARGET_LEVELS
                ),
            ));
        }
        let count = count as usize;
        let heights = (0..count)
            .map(|index| start + index as f64 * step)
            .collect::<Vec<_>>();
        Self::custom(heights)
    }

    /// Parses `start:stop:step` as used on the command line.
    pub fn parse_range(range: &str) -> PlumeResult<Self> {
        let parts = range
            .split(':')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| {
                PlumeError::input_validation(
                    "INPUT.TARGET_HEIGHTS",
                    format!("invalid height range '{}': {}", range, source),
                )
            })?;

        match parts.as_slice() {
            [start, stop, step] => Self::arange(*start, *stop, *step),
            _ => Err(PlumeError::input_validation(
                "INPUT.TARGET_HEIGHTS",
                format!(
                    "height range '{}' should have the form start:stop:step",
                    range
                ),
            )),
        }
    }

    /// Parses whitespace- or newline-separated heights from a text source.
    pub fn parse_list(source: &str) -> PlumeResult<Self> {
        let heights = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .flat_map(|line| line.split(|c: char| c.is_whitespace() || c == ','))
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<f64>().map_err(|source| {
                    PlumeError::input_validation(
                        "INPUT.TARGET_HEIGHTS",
                        format!("invalid target height '{}': {}", token, source),
                    )
                })
            })
            .collect::<PlumeResult<Vec<_>>>()?;
        Self::custom(heights)
    }

    pub fn heights(&self) -> Option<&[f64]> {
        match self {
            Self::Native => None,
            Self::Custom(heights) => Some(heights),
        }
    }
}

pub fn validate_target_heights(heights: &[f64]) -> PlumeResult<()> {
    if heights.is_empty() {
        return Err(PlumeError::input_validation(
            "INPUT.TARGET_HEIGHTS",
            "custom target heights must not be empty",
        ));
    }

    if let Some(index) = heights.iter().position(|height| !height.is_finite()) {
        return Err(PlumeError::input_validation(
            "INPUT.TARGET_HEIGHTS",
            format!("target height at index {} is not finite", index),
        ));
    }

    if let Some(index) = heights.windows(2).position(|pair| pair[1] <= pair[0]) {
        return Err(PlumeError::input_validation(
            "INPUT.TARGET_HEIGHTS",
            format!(
                "target heights must be strictly increasing; {} follows {} at index {}",
                heights[index + 1],
                heights[index],
                index + 1
            ),
        ));
    }

    Ok(())
}

/// Run ids name the per-run output directory, so they must be a single path component.
pub fn validate_run_id(run_id: &str) -> PlumeResult<()> {
    let trimmed = run_id.trim();
    if trimmed.is_empty() || trimmed != run_id {
        return Err(PlumeError::input_validation(
            "INPUT.RUN_ID",
            format!("run id '{}' must be non-empty without surrounding whitespace", run_id),
        ));
    }
    if run_id == "." || run_id == ".." || run_id.contains(['/', '\\']) {
        return Err(PlumeError::input_validation(
            "INPUT.RUN_ID",
            format!("run id '{}' must not contain path separators", run_id),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArtifact {
    pub relative_path: PathBuf,
}

impl RunArtifact {
    pub fn new(relative_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PlumeErrorCategory, TargetHeights, validate_run_id};

    #[test]
    fn arange_excludes_stop_like_numpy() {
        let heights = TargetHeights::arange(50.0, 20000.0, 100.0).expect("range should build");
        let values = heights.heights().expect("custom heights");
        assert_eq!(values.len(), 200);
        assert_eq!(values[0], 50.0);
        assert_eq!(values[199], 19950.0);
    }

    #[test]
    fn oversized_ranges_are_rejected_instead_of_allocated() {
        let error = TargetHeights::arange(0.0, 1.0e300, 1.0e-300).expect_err("too many levels");
        assert_eq!(error.placeholder(), "INPUT.TARGET_HEIGHTS");
        assert!(error.message().contains("more than 100000 levels"));

        let error = TargetHeights::parse_range("0:1e9:0.001").expect_err("too many levels");
        assert_eq!(error.category(), PlumeErrorCategory::InputValidationError);

        let heights = TargetHeights::arange(0.0, 100_000.0, 1.0).expect("limit is inclusive");
        assert_eq!(heights.heights().map(<[f64]>::len), Some(TargetHeights::MAX_TARGET_LEVELS));
    }

    #[test]
    fn range_parses_and_rejects_bad_shapes() {
        let heights = TargetHeights::parse_range("0:300:100").expect("range should parse");
        assert_eq!(heights.heights(), Some(&[0.0, 100.0, 200.0][..]));

        let error = TargetHeights::parse_range("0:300").expect_err("two parts should fail");
        assert_eq!(error.placeholder(), "INPUT.TARGET_HEIGHTS");

        let error = TargetHeights::parse_range("0:300:-5").expect_err("negative step should fail");
        assert_eq!(error.category(), PlumeErrorCategory::InputValidationError);
    }

    #[test]
    fn custom_heights_must_increase_strictly() {
        let error = TargetHeights::custom(vec![0.0, 100.0, 100.0])
            .expect_err("duplicate heights should fail");
        assert!(error.message().contains("strictly increasing"));

        assert!(TargetHeights::custom(Vec::new()).is_err());
        assert!(TargetHeights::custom(vec![0.0, f64::NAN]).is_err());
    }

    #[test]
    fn list_source_accepts_mixed_separators_and_comments() {
        let heights = TargetHeights::parse_list("# heights\n50 150\n250,350\n\n")
            .expect("list should parse");
        assert_eq!(heights.heights(), Some(&[50.0, 150.0, 250.0, 350.0][..]));
    }

    #[test]
    fn run_ids_must_be_single_path_components() {
        assert!(validate_run_id("Creek_fire_09062020-00z_0.05").is_ok());
        for bad in ["", " padded", "..", "nested/run", "win\\run"] {
            let error = validate_run_id(bad).expect_err("bad run id should fail");
            assert_eq!(error.placeholder(), "INPUT.RUN_ID");
        }
    }

    #[test]
    fn native_is_the_default_sentinel() {
        assert_eq!(TargetHeights::default(), TargetHeights::Native);
        assert!(TargetHeights::Native.heights().is_none());
    }
}
