use super::CliError;
use anyhow::Context;
use plume_core::domain::{PlumeError, TargetHeights};
use plume_core::modules::detrainment::DetrainmentProfile;
use plume_core::modules::namelist::ParameterWarning;
use plume_core::modules::sounding::{Sounding, SoundingFormat};
use std::fs;
use std::path::{Path, PathBuf};

/// `--heights` and `--heights-file` are mutually exclusive; neither means native levels.
#[derive(clap::Args, Debug, Default)]
#[group(multiple = false)]
pub(super) struct HeightArgs {
    /// Report heights as start:stop:step in m AGL (stop excluded)
    #[arg(long, value_name = "START:STOP:STEP")]
    heights: Option<String>,

    /// File of report heights in m AGL, whitespace or comma separated
    #[arg(long, value_name = "PATH")]
    heights_file: Option<PathBuf>,
}

impl HeightArgs {
    pub(super) fn target_heights(&self) -> Result<TargetHeights, CliError> {
        if let Some(range) = &self.heights {
            return TargetHeights::parse_range(range).map_err(CliError::Compute);
        }
        if let Some(path) = &self.heights_file {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read heights file '{}'", path.display()))?;
            return TargetHeights::parse_list(&source).map_err(CliError::Compute);
        }
        Ok(TargetHeights::Native)
    }
}

pub(super) fn load_sounding(path: &Path, format: SoundingFormat) -> Result<Sounding, CliError> {
    Sounding::read(path, format).map_err(CliError::Compute)
}

pub(super) fn compute_error(error: PlumeError) -> CliError {
    CliError::Compute(error)
}

pub(super) fn print_warnings(warnings: &[ParameterWarning]) {
    for warning in warnings {
        println!("{}", warning);
    }
}

pub(super) fn profile_summary_line(profile: &DetrainmentProfile) -> String {
    format!(
        "Plume top: {:.0} m AGL ({} profile levels)",
        profile.plume_top_height(),
        profile.levels().len()
    )
}
