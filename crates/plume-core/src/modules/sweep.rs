//! Entrainment-coefficient sensitivity sweep driven by a JSON config.

use crate::domain::{PlumeError, PlumeResult, TargetHeights};
use crate::modules::model_runner::{DEFAULT_MODEL_BINARY, ExternalPlumeModel};
use crate::modules::namelist::RunParameters;
use crate::modules::run::{RunRequest, execute_run};
use crate::modules::serialization::write_text_artifact;
use crate::modules::sounding::{Sounding, SoundingFormat};
use crate::modules::traits::PlumeModel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info};

pub const SWEEP_REPORT_FILE: &str = "sweep-report.json";
pub const DEFAULT_ENTRAINMENT_COEFFICIENTS: [f64; 10] =
    [0.01, 0.02, 0.03, 0.04, 0.05, 0.06, 0.07, 0.08, 0.09, 0.10];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepConfig {
    pub run_prefix: String,
    /// kW/m2
    pub heat_flux: f64,
    /// m2
    pub burn_area: f64,
    #[serde(default = "default_true")]
    pub wind_shear: bool,
    #[serde(default = "default_entrainment_coefficients")]
    pub entrainment_coefficients: Vec<f64>,
    #[serde(default = "default_fuel_moisture")]
    pub fuel_moisture: f64,
    #[serde(default)]
    pub vertical_profile: Option<VerticalProfile>,
    pub sounding: SoundingSource,
    #[serde(default = "default_model_binary")]
    pub model_binary: PathBuf,
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    #[serde(default)]
    pub keep_plume_evolution: bool,
    #[serde(default = "default_true")]
    pub create_image: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerticalProfile {
    Range { start: f64, stop: f64, step: f64 },
    Heights(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundingSource {
    pub path: PathBuf,
    #[serde(default)]
    pub format: SoundingFormat,
}

#[derive(Debug, thiserror::Error)]
pub enum SweepConfigError {
    #[error("failed to read sweep config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse sweep config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid sweep config: {0}")]
    Invalid(String),
}

impl From<SweepConfigError> for PlumeError {
    fn from(error: SweepConfigError) -> Self {
        let message = error.to_string();
        match error {
            SweepConfigError::Read { .. } => PlumeError::io_system("IO.SWEEP_CONFIG", message),
            SweepConfigError::Parse { .. } | SweepConfigError::Invalid(_) => {
                PlumeError::input_validation("INPUT.SWEEP_CONFIG", message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepCase {
    pub run_id: String,
    pub parameters: RunParameters,
}

impl SweepConfig {
    /// Reads and validates a config; relative paths are resolved against the config's directory.
    pub fn load(path: &Path) -> Result<Self, SweepConfigError> {
        let source = fs::read_to_string(path).map_err(|source| SweepConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&source).map_err(|source| SweepConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let config = config.resolve_paths(base_dir);
        config.validate()?;
        Ok(config)
    }

    pub fn resolve_paths(mut self, base_dir: &Path) -> Self {
        self.sounding.path = resolve_path(base_dir, &self.sounding.path);
        self.output_directory = resolve_path(base_dir, &self.output_directory);
        if self.model_binary.components().count() > 1 || self.model_binary.is_absolute() {
            self.model_binary = resolve_path(base_dir, &self.model_binary);
        }
        self
    }

    pub fn validate(&self) -> Result<(), SweepConfigError> {
        if self.run_prefix.trim().is_empty() {
            return Err(SweepConfigError::Invalid(
                "runPrefix must not be empty".to_string(),
            ));
        }
        if self.entrainment_coefficients.is_empty() {
            return Err(SweepConfigError::Invalid(
                "entrainmentCoefficients must list at least one value".to_string(),
            ));
        }
        if let Some(value) = self
            .entrainment_coefficients
            .iter()
            .find(|value| !value.is_finite() || **value < 0.0)
        {
            return Err(SweepConfigError::Invalid(format!(
                "entrainment coefficient {} must be finite and non-negative",
                value
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(SweepConfigError::Invalid(
                "timeoutSeconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cases(&self) -> Vec<SweepCase> {
        self.entrainment_coefficients
            .iter()
            .map(|entrainment| SweepCase {
                run_id: format!("{}_{}", self.run_prefix, entrainment),
                parameters: RunParameters {
                    heat_flux: self.heat_flux,
                    burn_area: self.burn_area,
                    wind_shear: self.wind_shear,
                    entrainment: *entrainment,
                    fuel_moisture: self.fuel_moisture,
                },
            })
            .collect()
    }

    pub fn target_heights(&self) -> PlumeResult<TargetHeights> {
        match &self.vertical_profile {
            None => Ok(TargetHeights::Native),
            Some(VerticalProfile::Range { start, stop, step }) => {
                TargetHeights::arange(*start, *stop, *step)
            }
            Some(VerticalProfile::Heights(heights)) => TargetHeights::custom(heights.clone()),
        }
    }

    pub fn model(&self) -> ExternalPlumeModel {
        ExternalPlumeModel::new(&self.model_binary)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_directory.join(SWEEP_REPORT_FILE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub generated_at_unix_seconds: u64,
    pub passed: bool,
    pub case_count: usize,
    pub passed_case_count: usize,
    pub failed_case_count: usize,
    pub cases: Vec<CaseReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub run_id: String,
    pub entrainment: f64,
    /// The case produced a profile and the model wrote nothing to stderr.
    pub passed: bool,
    pub model_passed: bool,
    pub warnings: Vec<String>,
    pub plume_top_m: Option<f64>,
    pub output_directory: Option<String>,
    pub error: Option<String>,
}

/// Runs every case in order. A failing case is recorded in the report and the sweep moves on;
/// only problems shared by all cases (sounding, target heights, report writing) abort it.
pub fn run_sweep<M>(model: &M, config: &SweepConfig) -> PlumeResult<SweepReport>
where
    M: PlumeModel + ?Sized,
{
    let sounding = Sounding::read(&config.sounding.path, config.sounding.format)?;
    let target_heights = config.target_heights()?;

    let cases = config.cases();
    let mut case_reports = Vec::with_capacity(cases.len());
    for case in cases {
        info!(
            entrainment = case.parameters.entrainment,
            run_id = %case.run_id,
            "working on entrainment constant"
        );
        let request = RunRequest {
            run_id: case.run_id.clone(),
            parameters: case.parameters,
            sounding: sounding.clone(),
            target_heights: target_heights.clone(),
            output_root: config.output_directory.clone(),
            keep_plume_evolution: config.keep_plume_evolution,
            create_image: config.create_image,
        };

        let report = match execute_run(model, &request) {
            Ok(outcome) => CaseReport {
                run_id: outcome.run_id,
                entrainment: case.parameters.entrainment,
                passed: outcome.model_passed,
                model_passed: outcome.model_passed,
                warnings: outcome
                    .warnings
                    .iter()
                    .map(|warning| warning.message.clone())
                    .collect(),
                plume_top_m: Some(outcome.profile.plume_top_height()),
                output_directory: Some(normalize_path(&outcome.archive.directory)),
                error: None,
            },
            Err(run_error) => {
                error!(run_id = %case.run_id, "{}", run_error.diagnostic_line());
                CaseReport {
                    run_id: case.run_id,
                    entrainment: case.parameters.entrainment,
                    passed: false,
                    model_passed: false,
                    warnings: Vec::new(),
                    plume_top_m: None,
                    output_directory: None,
                    error: Some(run_error.to_string()),
                }
            }
        };
        case_reports.push(report);
    }

    let case_count = case_reports.len();
    let passed_case_count = case_reports.iter().filter(|case| case.passed).count();
    let failed_case_count = case_count.saturating_sub(passed_case_count);
    let report = SweepReport {
        generated_at_unix_seconds: current_unix_timestamp_seconds(),
        passed: failed_case_count == 0,
        case_count,
        passed_case_count,
        failed_case_count,
        cases: case_reports,
    };

    write_report_file(&config.report_path(), &report)?;
    Ok(report)
}

pub fn render_human_summary(report: &SweepReport) -> String {
    let mut lines = Vec::new();
    let status = if report.passed { "PASS" } else { "FAIL" };
    lines.push(format!("Sweep status: {}", status));
    lines.push(format!(
        "Cases: {} total ({} passed, {} failed)",
        report.case_count, report.passed_case_count, report.failed_case_count
    ));

    for case in &report.cases {
        let case_status = if case.passed { "PASS" } else { "FAIL" };
        let detail = match (&case.error, case.plume_top_m) {
            (Some(error), _) => error.clone(),
            (None, Some(top)) if case.model_passed => format!("plume top {:.0} m", top),
            (None, Some(top)) => format!("plume top {:.0} m, model reported errors", top),
            (None, None) => "no profile".to_string(),
        };
        lines.push(format!(
            "Case {} (entrainment={}): {} ({})",
            case.run_id, case.entrainment, case_status, detail
        ));
        for warning in &case.warnings {
            lines.push(format!("  warning: {}", warning));
        }
    }

    lines.join("\n")
}

fn write_report_file(report_path: &Path, report: &SweepReport) -> PlumeResult<()> {
    if let Some(parent_dir) = report_path.parent() {
        fs::create_dir_all(parent_dir).map_err(|source| {
            PlumeError::io_system(
                "IO.SWEEP_REPORT",
                format!(
                    "failed to create report directory '{}': {}",
                    parent_dir.display(),
                    source
                ),
            )
        })?;
    }

    let report_json = serde_json::to_string_pretty(report).map_err(|source| {
        PlumeError::internal(
            "SYS.SWEEP_REPORT",
            format!(
                "failed to serialize sweep report '{}': {}",
                report_path.display(),
                source
            ),
        )
    })?;
    write_text_artifact(report_path, &report_json)
}

fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn current_unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn default_true() -> bool {
    true
}

fn default_entrainment_coefficients() -> Vec<f64> {
    DEFAULT_ENTRAINMENT_COEFFICIENTS.to_vec()
}

fn default_fuel_moisture() -> f64 {
    RunParameters::DEFAULT_FUEL_MOISTURE
}

fn default_model_binary() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_BINARY)
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("./output")
}

fn default_timeout_seconds() -> u64 {
    3600
}
