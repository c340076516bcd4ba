use super::CliError;
use super::helpers::*;
use plume_core::domain::PlumeError;
use plume_core::modules::detrainment::compute_detrainment_profile;
use plume_core::modules::model_runner::{DEFAULT_MODEL_BINARY, ExternalPlumeModel};
use plume_core::modules::namelist::RunParameters;
use plume_core::modules::run::{RunRequest, execute_run};
use plume_core::modules::sounding::SoundingFormat;
use plume_core::modules::sweep::{SweepConfig, render_human_summary, run_sweep};
use plume_core::modules::trace::PlumeTrace;
use std::path::PathBuf;
use std::time::Duration;

#[derive(clap::Args)]
pub(super) struct ParameterArgs {
    /// Fire heat flux, kW/m2
    #[arg(long)]
    heat_flux: f64,

    /// Burn area, m2
    #[arg(long)]
    burn_area: f64,

    /// Disable wind shear effects in the plume model
    #[arg(long)]
    no_wind_shear: bool,

    /// Entrainment coefficient
    #[arg(long, default_value_t = RunParameters::DEFAULT_ENTRAINMENT)]
    entrainment: f64,

    /// Fuel moisture, percent (passed through to the model)
    #[arg(long, default_value_t = RunParameters::DEFAULT_FUEL_MOISTURE)]
    fuel_moisture: f64,
}

impl ParameterArgs {
    fn parameters(&self) -> RunParameters {
        RunParameters {
            heat_flux: self.heat_flux,
            burn_area: self.burn_area,
            wind_shear: !self.no_wind_shear,
            entrainment: self.entrainment,
            fuel_moisture: self.fuel_moisture,
        }
    }
}

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Sounding file
    #[arg(long)]
    sounding: PathBuf,

    /// Sounding layout: profile or wyoming
    #[arg(long, default_value = "profile")]
    sounding_format: SoundingFormat,

    /// Run identifier, used as the output subdirectory name
    #[arg(long)]
    run_id: String,

    #[command(flatten)]
    parameters: ParameterArgs,

    #[command(flatten)]
    heights: HeightArgs,

    /// Plume model executable
    #[arg(long, default_value = DEFAULT_MODEL_BINARY)]
    model_binary: PathBuf,

    /// Root directory for run outputs
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Keep the plume evolution file (plumegen.dat)
    #[arg(long)]
    keep_plume_evolution: bool,

    /// Write an SVG chart of the profile
    #[arg(long)]
    plot: bool,

    /// Seconds to wait for the model before terminating it
    #[arg(long, default_value_t = 3600)]
    timeout_seconds: u64,
}

#[derive(clap::Args)]
pub(super) struct SweepArgs {
    /// Sweep config JSON path
    #[arg(long)]
    config: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct DetrainArgs {
    /// Plume trace (final_plume.dat, raw or archived)
    #[arg(long)]
    trace: PathBuf,

    #[command(flatten)]
    heights: HeightArgs,

    /// Write the profile here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct ValidateArgs {
    #[command(flatten)]
    parameters: ParameterArgs,

    /// Sounding file providing the surface height
    #[arg(long)]
    sounding: Option<PathBuf>,

    /// Sounding layout: profile or wyoming
    #[arg(long, default_value = "profile")]
    sounding_format: SoundingFormat,
}

pub(super) fn run_run_command(args: RunArgs) -> Result<i32, CliError> {
    if args.timeout_seconds == 0 {
        return Err(CliError::Usage(
            "--timeout-seconds must be positive".to_string(),
        ));
    }
    let sounding = load_sounding(&args.sounding, args.sounding_format)?;
    let request = RunRequest {
        run_id: args.run_id,
        parameters: args.parameters.parameters(),
        sounding,
        target_heights: args.heights.target_heights()?,
        output_root: args.output_dir,
        keep_plume_evolution: args.keep_plume_evolution,
        create_image: args.plot,
    };
    let model = ExternalPlumeModel::new(args.model_binary)
        .with_timeout(Duration::from_secs(args.timeout_seconds));

    let outcome = execute_run(&model, &request).map_err(compute_error)?;
    print_warnings(&outcome.warnings);
    let status = if outcome.model_passed { "PASS" } else { "FAIL" };
    println!("Run {}: {}", outcome.run_id, status);
    println!("{}", profile_summary_line(&outcome.profile));
    println!("Output directory: {}", outcome.archive.directory.display());
    if let Some(plot) = &outcome.plot {
        println!("Plot: {}", plot.display());
    }
    if !outcome.model_passed {
        println!("Plume model reported errors; check plume_log");
    }

    if outcome.model_passed { Ok(0) } else { Ok(1) }
}

pub(super) fn run_sweep_command(args: SweepArgs) -> Result<i32, CliError> {
    let config = SweepConfig::load(&args.config)
        .map_err(|error| compute_error(PlumeError::from(error)))?;
    let report = run_sweep(&config.model(), &config).map_err(compute_error)?;
    println!("{}", render_human_summary(&report));
    println!("JSON report: {}", config.report_path().display());

    if report.passed { Ok(0) } else { Ok(1) }
}

pub(super) fn run_detrain_command(args: DetrainArgs) -> Result<i32, CliError> {
    let trace = PlumeTrace::read(&args.trace).map_err(compute_error)?;
    let targets = args.heights.target_heights()?;
    let profile = compute_detrainment_profile(&trace, &targets).map_err(compute_error)?;

    match &args.output {
        Some(path) => {
            profile.write(path).map_err(compute_error)?;
            println!("{}", profile_summary_line(&profile));
            println!("Detrainment profile: {}", path.display());
        }
        None => print!("{}", profile.render()),
    }
    Ok(0)
}

pub(super) fn run_validate_command(args: ValidateArgs) -> Result<i32, CliError> {
    let surface_height = match &args.sounding {
        Some(path) => load_sounding(path, args.sounding_format)?.surface_height(),
        None => 0.0,
    };
    let namelist = args.parameters.parameters().to_namelist(surface_height);
    let warnings = namelist.validate().map_err(compute_error)?;
    print_warnings(&warnings);
    println!(
        "Parameters valid ({} warning{})",
        warnings.len(),
        if warnings.len() == 1 { "" } else { "s" }
    );
    Ok(0)
}
