use std::io::Write;

use tracing::debug;

use crate::ast::Pipeline;
use crate::error::{Result, ShellError};
use crate::executor;
use crate::job_control::{self, SignalKind};
use crate::parser;

/// Names handled by the interpreter itself; any other first word runs as a
/// program.
pub const COMMANDS: &[&str] = &["start", "wait", "run", "kill", "stop", "continue"];

pub fn is_command(name: &str) -> bool {
    COMMANDS.contains(&name)
}

/// Parse and execute one input line. Returns the status for the prompt.
///
/// Every error is written to `stderr`; nothing here ends the session.
pub fn execute_line(line: &str, stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    match dispatch(line, stdout, stderr) {
        Ok(code) => code,
        Err(e) => {
            if e.is_syntax() {
                debug!(line, "rejected line");
            }
            let _ = writeln!(stderr, "pish: {e}");
            1
        }
    }
}

fn dispatch(line: &str, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<i32> {
    let Some(pipeline) = parser::parse_line(line)? else {
        return Ok(0);
    };

    let name = pipeline.first().program().unwrap_or_default().to_string();
    debug!(command = %name, builtin = is_command(&name), stages = pipeline.len(), "dispatching");
    match name.as_str() {
        "start" => start(without_command_word(pipeline, &name)?, stdout, stderr),
        "run" => run(without_command_word(pipeline, &name)?, stdout, stderr),
        "wait" => {
            expect_args(&pipeline, &name, 0, "wait")?;
            wait(stdout)
        }
        "kill" => send(&pipeline, &name, SignalKind::Terminate, stdout),
        "stop" => send(&pipeline, &name, SignalKind::Suspend, stdout),
        "continue" => send(&pipeline, &name, SignalKind::Resume, stdout),
        _ => run(pipeline, stdout, stderr),
    }
}

/// `start`/`run` carry a pipeline after their own name.
fn without_command_word(mut pipeline: Pipeline, name: &str) -> Result<Pipeline> {
    let inner = pipeline.stages[0].without_command_word();
    if inner.argv.is_empty() {
        return Err(ShellError::Usage(format!(
            "{name}: usage: {name} <program> [args...]"
        )));
    }
    pipeline.stages[0] = inner;
    Ok(pipeline)
}

/// Check a built-in's arity; built-ins take neither pipes nor redirects.
fn expect_args<'a>(
    pipeline: &'a Pipeline,
    name: &str,
    count: usize,
    usage: &str,
) -> Result<&'a [String]> {
    let stage = pipeline.first();
    if pipeline.len() > 1 || stage.has_redirects() {
        return Err(ShellError::Usage(format!(
            "{name}: pipes and redirections are not supported"
        )));
    }
    let args = stage.args();
    if args.len() != count {
        return Err(ShellError::Usage(format!("{name}: usage: {usage}")));
    }
    Ok(args)
}

fn run(pipeline: Pipeline, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<i32> {
    let outcome = executor::run_pipeline(&pipeline)?;
    for e in &outcome.failures {
        let _ = writeln!(stderr, "pish: {e}");
    }
    for (pid, state) in &outcome.stopped {
        let _ = writeln!(stdout, "process {pid} {state}");
    }
    Ok(outcome.code())
}

fn start(pipeline: Pipeline, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<i32> {
    let (children, failures) = executor::start_pipeline(&pipeline)?;
    for e in &failures {
        let _ = writeln!(stderr, "pish: {e}");
    }
    for child in &children {
        let _ = writeln!(stdout, "process {} started", child.pid);
    }
    Ok(if failures.is_empty() { 0 } else { 1 })
}

fn wait(stdout: &mut dyn Write) -> Result<i32> {
    match job_control::wait_any() {
        Ok((pid, outcome)) => {
            let _ = writeln!(stdout, "process {pid} {outcome}");
            Ok(outcome.code())
        }
        Err(ShellError::NoChildren) => {
            let _ = writeln!(stdout, "{}", ShellError::NoChildren);
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

fn send(pipeline: &Pipeline, name: &str, kind: SignalKind, stdout: &mut dyn Write) -> Result<i32> {
    let usage = format!("{name} <pid>");
    let args = expect_args(pipeline, name, 1, &usage)?;
    let pid = job_control::parse_pid(&args[0])?;
    job_control::signal(pid, kind)?;
    let _ = writeln!(stdout, "process {pid} {}", kind.verb());
    Ok(0)
}
