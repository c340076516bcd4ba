use crate::domain::PlumeResult;
use crate::modules::model_runner::ModelRunLog;
use std::path::Path;

/// Runs the plume model inside a prepared working directory.
///
/// `plume_namelist` and `env_met_input.dat` are present in `work_dir` when this is called;
/// implementations leave `final_plume.dat` (and optionally `plumegen.dat`/`plumegen.gra`) there.
pub trait PlumeModel {
    fn simulate(&self, work_dir: &Path) -> PlumeResult<ModelRunLog>;
}

impl<T> PlumeModel for &T
where
    T: PlumeModel + ?Sized,
{
    fn simulate(&self, work_dir: &Path) -> PlumeResult<ModelRunLog> {
        (**self).simulate(work_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::PlumeModel;
    use crate::domain::{PlumeError, PlumeErrorCategory, PlumeResult};
    use crate::modules::model_runner::ModelRunLog;
    use std::path::Path;

    struct FailingModel;

    impl PlumeModel for FailingModel {
        fn simulate(&self, _work_dir: &Path) -> PlumeResult<ModelRunLog> {
            Err(PlumeError::computation("RUN.MODEL", "model execution failed"))
        }
    }

    #[test]
    fn plume_model_uses_shared_error_types() {
        let error = FailingModel
            .simulate(Path::new("unused"))
            .expect_err("model should fail");
        assert_eq!(error.category(), PlumeErrorCategory::ComputationError);
        assert_eq!(error.exit_code(), 4);
        assert_eq!(error.placeholder(), "RUN.MODEL");
    }

    #[test]
    fn references_forward_to_the_model() {
        let model = FailingModel;
        let borrowed: &dyn PlumeModel = &model;
        let error = (&borrowed)
            .simulate(Path::new("unused"))
            .expect_err("forwarded model should fail");
        assert_eq!(error.placeholder(), "RUN.MODEL");
    }
}
