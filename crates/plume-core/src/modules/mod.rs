pub mod archive;
pub mod detrainment;
pub mod model_runner;
pub mod namelist;
pub mod plot;
pub mod run;
pub mod serialization;
pub mod sounding;
pub mod sweep;
pub mod trace;

mod traits;

pub use detrainment::{DetrainmentLevel, DetrainmentProfile, compute_detrainment_profile};
pub use model_runner::{ExternalPlumeModel, ModelRunLog};
pub use run::{RunOutcome, RunRequest, execute_run};
pub use sweep::{SweepConfig, SweepReport, render_human_summary, run_sweep};
pub use traits::PlumeModel;
