use std::fmt::Display;
use std::path::PathBuf;

use sweep_grid::TaskIndex;

use crate::gather::OutputLocator;
use crate::scheduler::JobId;

/// `<job>-<array job id>-r<index>.out`, the name the emitted script gives each
/// run's output.
pub fn output_file_name(
    job_name: impl Display,
    array_job_id: impl Display,
    index: impl Display,
) -> String {
    format!("{job_name}-{array_job_id}-r{index}.out")
}

/// Scheduler log file pattern for array tasks (Slurm `%x` job name, `%A`
/// array job id, `%a` array task id).
pub fn array_log_pattern(extension: &str) -> String {
    format!("%x-%A-j%a.{extension}")
}

/// Output location of every task of one submitted array job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Directory the tasks write into.
    pub dir: PathBuf,
    /// Job name baked into the script.
    pub job_name: String,
    /// Array job id assigned at submission.
    pub array_job_id: JobId,
}

impl OutputLayout {
    /// Path of the output artifact for `index`.
    pub fn path_for(&self, index: TaskIndex) -> PathBuf {
        self.dir
            .join(output_file_name(&self.job_name, &self.array_job_id, index))
    }
}

impl OutputLocator for OutputLayout {
    fn locate(&self, index: TaskIndex) -> PathBuf {
        self.path_for(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_follow_job_and_index() {
        let layout = OutputLayout {
            dir: PathBuf::from("/scratch/out"),
            job_name: "scan".into(),
            array_job_id: JobId::new("4242"),
        };
        assert_eq!(
            layout.path_for(TaskIndex::from_raw(7)),
            PathBuf::from("/scratch/out/scan-4242-r7.out")
        );
        assert_eq!(array_log_pattern("err"), "%x-%A-j%a.err");
    }
}
