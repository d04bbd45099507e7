use sweep_core::{ErrorInfo, SweepError};
use sweep_job::{
    submit_chain, Dependency, DependencyCondition, JobDescriptor, JobId, Scheduler,
    SlurmScheduler, SubmitRequest,
};

#[derive(Default)]
struct RecordingScheduler {
    submitted: Vec<(String, Option<Dependency>)>,
    reject: Option<String>,
}

impl Scheduler for RecordingScheduler {
    fn submit(&mut self, request: &SubmitRequest<'_>) -> Result<JobId, SweepError> {
        self.submitted
            .push((request.job.name.clone(), request.dependency.cloned()));
        if self.reject.as_deref() == Some(request.job.name.as_str()) {
            return Err(SweepError::Submission(ErrorInfo::new(
                "scheduler_rejected",
                "sbatch: error: invalid partition",
            )));
        }
        Ok(JobId::new(format!("{}", 100 + self.submitted.len())))
    }
}

fn jobs() -> (JobDescriptor, JobDescriptor) {
    let mut primary = JobDescriptor::wrap("scan", "true", None);
    primary.array_tasks = Some(24);
    let gather = JobDescriptor::wrap("scan-gather", "sweep gather", None);
    (primary, gather)
}

#[test]
fn gather_waits_on_the_array_job() {
    let (primary, gather) = jobs();
    let mut scheduler = RecordingScheduler::default();
    let receipt =
        submit_chain(&mut scheduler, &primary, &gather, DependencyCondition::default())
            .expect("chain");

    assert_eq!(receipt.primary, JobId::new("101"));
    assert_eq!(receipt.gather, JobId::new("102"));
    assert_eq!(receipt.link.primary, receipt.primary);
    assert_eq!(receipt.link.dependent, receipt.gather);
    assert_eq!(receipt.link.condition, DependencyCondition::AfterAny);
    assert_eq!(
        scheduler.submitted,
        vec![
            ("scan".to_string(), None),
            (
                "scan-gather".to_string(),
                Some(Dependency {
                    on: JobId::new("101"),
                    condition: DependencyCondition::AfterAny,
                })
            ),
        ]
    );
}

#[test]
fn rejected_primary_never_submits_gather() {
    let (primary, gather) = jobs();
    let mut scheduler = RecordingScheduler {
        reject: Some("scan".into()),
        ..RecordingScheduler::default()
    };
    let err = submit_chain(&mut scheduler, &primary, &gather, DependencyCondition::AfterOk)
        .expect_err("rejected");
    assert!(matches!(err, SweepError::Submission(_)));
    assert_eq!(scheduler.submitted.len(), 1);
    assert_eq!(scheduler.submitted[0].0, "scan");
}

#[test]
fn rejected_gather_reports_the_primary_id() {
    let (primary, gather) = jobs();
    let mut scheduler = RecordingScheduler {
        reject: Some("scan-gather".into()),
        ..RecordingScheduler::default()
    };
    let err = submit_chain(&mut scheduler, &primary, &gather, DependencyCondition::AfterAny)
        .expect_err("rejected");
    assert_eq!(err.code(), "scheduler_rejected");
    assert_eq!(
        err.info().context.get("primary_job").map(String::as_str),
        Some("101")
    );
}

#[test]
fn conditions_parse_and_serialize_in_kebab_case() {
    for (text, condition) in [
        ("after-any", DependencyCondition::AfterAny),
        ("afterok", DependencyCondition::AfterOk),
        ("after_not_ok", DependencyCondition::AfterNotOk),
    ] {
        assert_eq!(text.parse::<DependencyCondition>().expect("parse"), condition);
    }
    assert_eq!(
        serde_json::to_string(&DependencyCondition::AfterNotOk).expect("json"),
        "\"after-not-ok\""
    );
    assert!("after-lunch".parse::<DependencyCondition>().is_err());
}

#[test]
fn slurm_arguments_carry_dependency_and_primary_id() {
    let (primary, gather) = jobs();
    let args = SlurmScheduler::arguments(&SubmitRequest {
        job: &primary,
        dependency: None,
    });
    assert_eq!(args, vec!["--parsable", "--job-name=scan", "--array=0-23"]);

    let dependency = Dependency {
        on: JobId::new("4242"),
        condition: DependencyCondition::AfterAny,
    };
    let args = SlurmScheduler::arguments(&SubmitRequest {
        job: &gather,
        dependency: Some(&dependency),
    });
    assert_eq!(
        args,
        vec![
            "--parsable",
            "--job-name=scan-gather",
            "--dependency=afterany:4242",
            "--export=ALL,SWEEP_PRIMARY_JOB_ID=4242",
        ]
    );
}

#[cfg(unix)]
mod fake_sbatch {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use super::*;
    use tempfile::tempdir;

    fn install(dir: &Path, body: &str) -> String {
        let path = dir.join("sbatch");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path.display().to_string()
    }

    #[test]
    fn script_is_piped_and_id_parsed() {
        let dir = tempdir().expect("tempdir");
        let captured = dir.path().join("captured.sh");
        let program = install(
            dir.path(),
            &format!("cat > '{}'\necho '5150;cluster'", captured.display()),
        );
        let (primary, gather) = jobs();
        let mut scheduler = SlurmScheduler::new(program);
        let receipt = submit_chain(&mut scheduler, &primary, &gather, DependencyCondition::AfterAny)
            .expect("chain");
        assert_eq!(receipt.primary, JobId::new("5150"));
        assert_eq!(
            fs::read_to_string(&captured).expect("captured"),
            gather.script
        );
    }

    #[test]
    fn scheduler_failure_becomes_submission_error() {
        let dir = tempdir().expect("tempdir");
        let program = install(
            dir.path(),
            "cat > /dev/null\necho 'sbatch: error: invalid account' >&2\nexit 1",
        );
        let (primary, gather) = jobs();
        let mut scheduler = SlurmScheduler::new(program);
        let err = submit_chain(&mut scheduler, &primary, &gather, DependencyCondition::AfterAny)
            .expect_err("rejected");
        assert_eq!(err.code(), "scheduler_rejected");
        assert_eq!(err.info().message, "sbatch: error: invalid account");
    }

    #[test]
    fn missing_program_is_reported() {
        let dir = tempdir().expect("tempdir");
        let mut scheduler =
            SlurmScheduler::new(dir.path().join("no-such-sbatch").display().to_string());
        let (primary, gather) = jobs();
        let err = submit_chain(&mut scheduler, &primary, &gather, DependencyCondition::AfterAny)
            .expect_err("spawn");
        assert_eq!(err.code(), "scheduler_spawn");
    }
}
