use tracing::{debug, warn};

use crate::ast::Pipeline;
use crate::error::{Result, ShellError};
use crate::job_control::{ChildProcess, SpawnedSet};
use crate::pipes::PipeChain;
use crate::spawn::{self, PreparedStage};
use crate::status::ExitOutcome;

/// Every stage of a pipeline that made it to `fork`, plus the stages that
/// did not.
#[derive(Debug)]
pub struct Launched {
    pub children: SpawnedSet,
    pub failures: Vec<ShellError>,
    last_stage: usize,
}

/// Result of running a pipeline in the foreground.
#[derive(Debug, Default)]
pub struct PipelineRun {
    /// Outcome of the final stage; `None` if it never started.
    pub last: Option<ExitOutcome>,
    /// Stages that were suspended instead of finishing; still alive.
    pub stopped: Vec<(libc::pid_t, ExitOutcome)>,
    pub failures: Vec<ShellError>,
}

impl PipelineRun {
    /// Exit code the prompt reports for this pipeline.
    pub fn code(&self) -> i32 {
        self.last.map_or(1, ExitOutcome::code)
    }
}

/// Fork every stage, left to right, before waiting on any of them.
///
/// Conversion to C strings happens for all stages first, so a bad argument
/// aborts the line before anything runs. A stage that fails to fork is
/// recorded and skipped; its neighbours still start.
pub fn launch(pipeline: &Pipeline) -> Result<Launched> {
    let prepared = pipeline
        .stages
        .iter()
        .enumerate()
        .map(|(index, stage)| PreparedStage::new(index, stage))
        .collect::<Result<Vec<_>>>()?;
    if prepared.is_empty() {
        return Err(ShellError::EmptyStage);
    }

    let chain = PipeChain::for_stages(prepared.len())?;
    let pipe_fds = chain.raw_fds();
    debug_assert_eq!(chain.len(), pipeline.pipe_count());
    debug!(stages = prepared.len(), pipes = chain.len(), "launching pipeline");

    let mut children = SpawnedSet::new();
    let mut failures = Vec::new();
    for stage in &prepared {
        match spawn::spawn(stage, chain.wiring(stage.index()), &pipe_fds) {
            Ok(child) => children.push(child),
            Err(e) => {
                warn!(stage = stage.index(), program = stage.program(), "stage not started");
                failures.push(e);
            }
        }
    }
    // Children hold their own copies now; ours would keep readers from EOF.
    drop(chain);

    Ok(Launched {
        children,
        failures,
        last_stage: prepared.len() - 1,
    })
}

/// Launch a pipeline and wait for all of its stages.
pub fn run_pipeline(pipeline: &Pipeline) -> Result<PipelineRun> {
    let Launched { children, mut failures, last_stage } = launch(pipeline)?;
    let mut run = PipelineRun::default();

    for (child, result) in children.wait_all() {
        match result {
            Ok(outcome) => {
                if !outcome.is_terminal() {
                    run.stopped.push((child.pid, outcome));
                }
                if child.stage == last_stage {
                    run.last = Some(outcome);
                }
            }
            Err(e) => failures.push(e),
        }
    }

    run.failures = failures;
    Ok(run)
}

/// Launch a pipeline without waiting; its children are left for `wait`.
pub fn start_pipeline(pipeline: &Pipeline) -> Result<(Vec<ChildProcess>, Vec<ShellError>)> {
    let launched = launch(pipeline)?;
    Ok((launched.children.detach(), launched.failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_control::wait_for;
    use crate::parser::parse_line;

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("pish_exec_{}_{name}", std::process::id()))
            .to_str()
            .unwrap()
            .to_string()
    }

    fn run(line: &str) -> PipelineRun {
        let pipeline = parse_line(line).unwrap().unwrap();
        run_pipeline(&pipeline).unwrap()
    }

    #[test]
    fn single_stage_exit_status() {
        assert_eq!(run("true").last, Some(ExitOutcome::Exited(0)));
        assert_eq!(run("false").last, Some(ExitOutcome::Exited(1)));
        assert_eq!(run("false").code(), 1);
    }

    #[test]
    fn last_stage_that_never_started_reports_failure() {
        let run = PipelineRun {
            last: None,
            failures: vec![ShellError::ForkFailed {
                stage: 1,
                reason: std::io::Error::from_raw_os_error(libc::EAGAIN),
            }],
            ..PipelineRun::default()
        };
        assert_eq!(run.code(), 1);

        let signalled = PipelineRun {
            last: Some(ExitOutcome::Signaled(libc::SIGPIPE)),
            ..PipelineRun::default()
        };
        assert_eq!(signalled.code(), 128 + libc::SIGPIPE);
    }

    #[test]
    fn two_stage_pipe_carries_output() {
        let out = temp_path("two_stage");
        let result = run(&format!("printf a\\nb\\nc\\n | wc -l > {out}"));
        assert_eq!(result.last, Some(ExitOutcome::Exited(0)));
        assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "3");
        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn first_and_last_stages_use_files() {
        let input = temp_path("three_in");
        let out = temp_path("three_out");
        std::fs::write(&input, "pear\napple\npear\nfig\napple\n").unwrap();

        let result = run(&format!("cat < {input} | sort | uniq > {out}"));
        assert!(result.failures.is_empty());
        assert_eq!(result.last, Some(ExitOutcome::Exited(0)));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "apple\nfig\npear\n");

        let _ = std::fs::remove_file(&input);
        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn explicit_input_redirect_beats_the_pipe() {
        let input = temp_path("precedence_in");
        let out = temp_path("precedence_out");
        std::fs::write(&input, "from file\n").unwrap();

        run(&format!("echo from-pipe | cat < {input} > {out}"));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "from file\n");

        let _ = std::fs::remove_file(&input);
        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn explicit_output_redirect_beats_the_pipe() {
        let side = temp_path("precedence_side");
        let out = temp_path("precedence_downstream");

        run(&format!("echo diverted > {side} | wc -c > {out}"));
        assert_eq!(std::fs::read_to_string(&side).unwrap(), "diverted\n");
        assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "0");

        let _ = std::fs::remove_file(&side);
        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn status_comes_from_the_last_stage() {
        assert_eq!(run("false | true").last, Some(ExitOutcome::Exited(0)));
        assert_eq!(run("true | false").last, Some(ExitOutcome::Exited(1)));
    }

    #[test]
    fn long_pipeline_reaches_eof() {
        let input = temp_path("long_in");
        let out = temp_path("long_out");
        std::fs::write(&input, "x\ny\n").unwrap();
        let middle = vec!["cat"; 12].join(" | ");

        let result = run(&format!("cat < {input} | {middle} | cat > {out}"));
        assert_eq!(result.last, Some(ExitOutcome::Exited(0)));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "x\ny\n");

        let _ = std::fs::remove_file(&input);
        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn exec_failure_in_the_middle_is_local_to_that_stage() {
        let out = temp_path("exec_fail_out");
        let result = run(&format!("echo hi | pish-test-no-such-program | cat > {out}"));
        assert!(result.failures.is_empty());
        assert_eq!(result.last, Some(ExitOutcome::Exited(0)));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn exec_failure_in_the_last_stage_sets_the_status() {
        let result = run("echo hi | pish-test-no-such-program");
        assert_eq!(result.last, Some(ExitOutcome::Exited(spawn::EXIT_NOT_FOUND)));
        assert_eq!(result.code(), 127);
    }

    #[test]
    fn bad_argument_aborts_before_spawning() {
        let pipeline = crate::ast::Pipeline {
            stages: vec![crate::ast::Stage {
                argv: vec!["echo".into(), "a\0b".into()],
                ..Default::default()
            }],
        };
        assert!(matches!(run_pipeline(&pipeline), Err(ShellError::InteriorNul(_))));
    }

    #[test]
    fn started_pipeline_is_not_waited_on() {
        let out = temp_path("started_out");
        let pipeline = parse_line(&format!("echo started | cat > {out}")).unwrap().unwrap();
        let (children, failures) = start_pipeline(&pipeline).unwrap();
        assert!(failures.is_empty());
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].stage, 1);

        for child in &children {
            assert_eq!(wait_for(child.pid).unwrap(), ExitOutcome::Exited(0));
        }
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "started\n");
        let _ = std::fs::remove_file(&out);
    }
}
