//! One plume-rise run: validate, stage inputs, run the model, post-process, archive.

use crate::common::constants::{FINAL_PLUME_FILE, MET_INPUT_FILE, NAMELIST_FILE};
use crate::domain::{PlumeError, PlumeResult, TargetHeights, validate_run_id};
use crate::modules::archive::{ArchiveRequest, ArchivedRun, archive_run, preserve_failed_run};
use crate::modules::detrainment::{DetrainmentProfile, compute_detrainment_profile};
use crate::modules::namelist::{ParameterWarning, PlumeNamelist, RunParameters};
use crate::modules::plot::write_profile_plot;
use crate::modules::serialization::write_text_artifact;
use crate::modules::sounding::Sounding;
use crate::modules::trace::PlumeTrace;
use crate::modules::traits::PlumeModel;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub run_id: String,
    pub parameters: RunParameters,
    pub sounding: Sounding,
    pub target_heights: TargetHeights,
    pub output_root: PathBuf,
    pub keep_plume_evolution: bool,
    pub create_image: bool,
}

impl RunRequest {
    pub fn new(
        run_id: impl Into<String>,
        parameters: RunParameters,
        sounding: Sounding,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            parameters,
            sounding,
            target_heights: TargetHeights::Native,
            output_root: output_root.into(),
            keep_plume_evolution: false,
            create_image: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: String,
    /// False when the model wrote to its error stream; post-processing still ran.
    pub model_passed: bool,
    pub warnings: Vec<ParameterWarning>,
    pub profile: DetrainmentProfile,
    pub archive: ArchivedRun,
    pub plot: Option<PathBuf>,
}

pub fn execute_run<M>(model: &M, request: &RunRequest) -> PlumeResult<RunOutcome>
where
    M: PlumeModel + ?Sized,
{
    let _span = info_span!("plume_run", run_id = %request.run_id).entered();

    validate_run_id(&request.run_id)?;
    let namelist = request
        .parameters
        .to_namelist(request.sounding.surface_height());
    let warnings = namelist.validate()?;

    fs::create_dir_all(&request.output_root).map_err(|source| {
        PlumeError::io_system(
            "IO.OUTPUT_DIRECTORY",
            format!(
                "failed to create output directory '{}': {}",
                request.output_root.display(),
                source
            ),
        )
    })?;
    let staging = tempfile::Builder::new()
        .prefix(&format!(".staging-{}-", request.run_id))
        .tempdir_in(&request.output_root)
        .map_err(|source| {
            PlumeError::io_system(
                "IO.STAGING_DIRECTORY",
                format!(
                    "failed to create staging directory under '{}': {}",
                    request.output_root.display(),
                    source
                ),
            )
        })?;

    stage_inputs(staging.path(), &namelist, &request.sounding)?;

    let archive_request = ArchiveRequest {
        run_id: &request.run_id,
        staging_dir: staging.path(),
        output_root: &request.output_root,
        keep_plume_evolution: request.keep_plume_evolution,
    };
    let completed = match simulate_and_archive(model, request, &archive_request) {
        Ok(completed) => completed,
        Err(error) => {
            match preserve_failed_run(&archive_request) {
                Ok(preserved) => warn!(
                    directory = %preserved.directory.display(),
                    "run failed; model log and inputs preserved"
                ),
                Err(source) => warn!(error = %source, "failed to preserve files of failed run"),
            }
            return Err(error);
        }
    };
    let CompletedRun {
        model_passed,
        profile,
        archive,
        plot,
    } = completed;

    info!(directory = %archive.directory.display(), "run archived");
    Ok(RunOutcome {
        run_id: request.run_id.clone(),
        model_passed,
        warnings,
        profile,
        archive,
        plot,
    })
}

struct CompletedRun {
    model_passed: bool,
    profile: DetrainmentProfile,
    archive: ArchivedRun,
    plot: Option<PathBuf>,
}

fn simulate_and_archive<M>(
    model: &M,
    request: &RunRequest,
    archive_request: &ArchiveRequest<'_>,
) -> PlumeResult<CompletedRun>
where
    M: PlumeModel + ?Sized,
{
    let work_dir = archive_request.staging_dir;
    info!("running plume model");
    let log = model.simulate(work_dir)?;
    log.write_into(work_dir)?;
    let model_passed = log.passed();
    if model_passed {
        info!("plume model run successful");
    } else {
        warn!("plume model run failed; check log file");
    }

    let trace = PlumeTrace::read(&work_dir.join(FINAL_PLUME_FILE))?;
    let profile = compute_detrainment_profile(&trace, &request.target_heights)?;
    info!(
        plume_top_m = profile.plume_top_height(),
        level_count = profile.levels().len(),
        "computed detrainment profile"
    );

    let archive = archive_run(archive_request, &trace, &profile)?;
    let plot = if request.create_image {
        Some(write_profile_plot(
            &archive.directory,
            &request.run_id,
            &profile,
        )?)
    } else {
        None
    };

    Ok(CompletedRun {
        model_passed,
        profile,
        archive,
        plot,
    })
}

/// Writes the two files the model reads from its working directory.
pub fn stage_inputs(work_dir: &Path, namelist: &PlumeNamelist, sounding: &Sounding) -> PlumeResult<()> {
    write_text_artifact(&work_dir.join(NAMELIST_FILE), &namelist.render())?;
    write_text_artifact(&work_dir.join(MET_INPUT_FILE), &sounding.render_met_input())
}
