//! Collects one run's inputs and outputs into `<output_root>/<run_id>/`.

use crate::common::constants::{
    DETRAIN_PROFILE_FILE, FINAL_PLUME_FILE, LEGACY_GRADS_FILE, MET_INPUT_FILE, NAMELIST_FILE,
    PLUME_EVOLUTION_FILE, RUN_LOG_FILE,
};
use crate::domain::{PlumeError, PlumeResult, RunArtifact, validate_run_id};
use crate::modules::detrainment::DetrainmentProfile;
use crate::modules::serialization::write_text_artifact;
use crate::modules::trace::PlumeTrace;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files moved verbatim from the staging directory when present.
const MOVED_FILES: [&str; 3] = [RUN_LOG_FILE, NAMELIST_FILE, MET_INPUT_FILE];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest<'a> {
    pub run_id: &'a str,
    pub staging_dir: &'a Path,
    pub output_root: &'a Path,
    pub keep_plume_evolution: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedRun {
    pub directory: PathBuf,
    /// Paths relative to `directory`, in the order they were produced.
    pub artifacts: Vec<RunArtifact>,
}

impl ArchivedRun {
    pub fn contains(&self, file_name: &str) -> bool {
        self.artifacts
            .iter()
            .any(|artifact| artifact.relative_path == Path::new(file_name))
    }
}

pub fn run_output_directory(output_root: &Path, run_id: &str) -> PathBuf {
    output_root.join(run_id)
}

pub fn archive_run(
    request: &ArchiveRequest<'_>,
    trace: &PlumeTrace,
    profile: &DetrainmentProfile,
) -> PlumeResult<ArchivedRun> {
    let directory = create_run_directory(request)?;
    let mut artifacts = Vec::new();

    write_text_artifact(&directory.join(FINAL_PLUME_FILE), &trace.render_labelled())?;
    artifacts.push(RunArtifact::new(FINAL_PLUME_FILE));
    profile.write_into(&directory)?;
    artifacts.push(RunArtifact::new(DETRAIN_PROFILE_FILE));

    for file_name in MOVED_FILES {
        if move_if_present(
            &request.staging_dir.join(file_name),
            &directory.join(file_name),
        )? {
            artifacts.push(RunArtifact::new(file_name));
        }
    }

    let evolution = request.staging_dir.join(PLUME_EVOLUTION_FILE);
    if request.keep_plume_evolution {
        if move_if_present(&evolution, &directory.join(PLUME_EVOLUTION_FILE))? {
            artifacts.push(RunArtifact::new(PLUME_EVOLUTION_FILE));
        }
    } else {
        remove_if_present(&evolution)?;
    }
    remove_if_present(&request.staging_dir.join(LEGACY_GRADS_FILE))?;

    debug!(
        directory = %directory.display(),
        artifact_count = artifacts.len(),
        "archived run outputs"
    );
    Ok(ArchivedRun {
        directory,
        artifacts,
    })
}

/// Keeps the model log and staged inputs of a run that failed after staging, so the
/// failure can be diagnosed from `<output_root>/<run_id>/`.
pub fn preserve_failed_run(request: &ArchiveRequest<'_>) -> PlumeResult<ArchivedRun> {
    let directory = create_run_directory(request)?;
    let mut artifacts = Vec::new();
    for file_name in MOVED_FILES {
        if move_if_present(
            &request.staging_dir.join(file_name),
            &directory.join(file_name),
        )? {
            artifacts.push(RunArtifact::new(file_name));
        }
    }

    debug!(
        directory = %directory.display(),
        artifact_count = artifacts.len(),
        "preserved failed run files"
    );
    Ok(ArchivedRun {
        directory,
        artifacts,
    })
}

fn create_run_directory(request: &ArchiveRequest<'_>) -> PlumeResult<PathBuf> {
    validate_run_id(request.run_id)?;
    let directory = run_output_directory(request.output_root, request.run_id);
    fs::create_dir_all(&directory).map_err(|source| {
        PlumeError::io_system(
            "IO.OUTPUT_DIRECTORY",
            format!(
                "failed to create run output directory '{}': {}",
                directory.display(),
                source
            ),
        )
    })?;
    Ok(directory)
}

/// Renames `source` to `destination`, copying across filesystems when a rename is refused.
/// Returns `false` when `source` does not exist.
pub fn move_if_present(source: &Path, destination: &Path) -> PlumeResult<bool> {
    if !source.is_file() {
        debug!(path = %source.display(), "skipping missing run file");
        return Ok(false);
    }

    if fs::rename(source, destination).is_ok() {
        debug!(from = %source.display(), to = %destination.display(), "moved run file");
        return Ok(true);
    }

    fs::copy(source, destination)
        .and_then(|_| fs::remove_file(source))
        .map_err(|error| {
            PlumeError::io_system(
                "IO.ARCHIVE_MOVE",
                format!(
                    "failed to move '{}' to '{}': {}",
                    source.display(),
                    destination.display(),
                    error
                ),
            )
        })?;
    debug!(from = %source.display(), to = %destination.display(), "copied run file");
    Ok(true)
}

fn remove_if_present(path: &Path) -> PlumeResult<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "discarded run file");
            Ok(())
        }
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(error) => Err(PlumeError::io_system(
            "IO.ARCHIVE_REMOVE",
            format!("failed to remove '{}': {}", path.display(), error),
        )),
    }
}
