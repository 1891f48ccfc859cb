//! Synchronous execution of a single external step.
//!
//! Script problems (missing file, exec failure, non-zero exit) come back as a
//! failed [`StepOutcome`] rather than an error; the controller decides what a
//! failure means for the run.
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::io::{self, BufRead, BufReader, PipeReader};
use std::path::Path;
use std::process::{Command, Stdio};

/// Number of trailing output lines kept in step metadata.
pub const OUTPUT_TAIL_LINES: usize = 50;

/// What to run and how.
#[derive(Debug, Clone)]
pub struct StepInvocation<'a> {
    /// Working directory; relative script paths resolve against it.
    pub root: &'a Path,
    pub script: &'a str,
    pub args: &'a [String],
    /// Merged over the inherited environment; these win.
    pub env: &'a BTreeMap<String, String>,
    /// Variables removed from the child environment after merging.
    pub env_remove: &'a [&'a str],
    /// Run the script through an interpreter (e.g. `bash`) instead of directly.
    pub interpreter: Option<&'a str>,
}

/// Progress emitted while a step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent<'a> {
    /// Shell-quoted command line, emitted once before spawning.
    Command(&'a str),
    /// One line of combined stdout/stderr.
    Output(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub success: bool,
    pub meta: Value,
}

#[derive(Debug, Serialize)]
struct CompletedMeta<'a> {
    script: &'a str,
    args: &'a [String],
    returncode: Option<i32>,
    output_tail: Vec<String>,
}

/// Run one step to completion, forwarding events to `sink` as they arrive.
pub fn run_step(
    invocation: &StepInvocation<'_>,
    sink: &mut dyn FnMut(StepEvent<'_>),
) -> StepOutcome {
    let script_path = invocation.root.join(invocation.script);
    if !script_path.exists() {
        tracing::warn!(script = invocation.script, "step script not found");
        return failure(json!({
            "error": "script_not_found",
            "script": invocation.script,
            "path": script_path.display().to_string(),
        }));
    }
    let script_path = script_path.canonicalize().unwrap_or(script_path);
    make_executable(&script_path);

    let mut argv: Vec<String> = Vec::with_capacity(invocation.args.len() + 2);
    if let Some(interpreter) = invocation.interpreter {
        argv.push(interpreter.to_string());
    }
    argv.push(script_path.display().to_string());
    argv.extend(invocation.args.iter().cloned());
    let command_line = shell_words::join(&argv);
    sink(StepEvent::Command(&command_line));

    let (reader, stdout, stderr) = match combined_pipe() {
        Ok(ends) => ends,
        Err(err) => {
            tracing::warn!(script = invocation.script, error = %err, "create output pipe failed");
            return failure(json!({
                "error": "spawn_failed",
                "script": invocation.script,
                "args": invocation.args,
                "detail": err.to_string(),
            }));
        }
    };

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..])
        .current_dir(invocation.root)
        .envs(invocation.env)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr);
    for key in invocation.env_remove {
        cmd.env_remove(key);
    }

    let spawned = cmd.spawn();
    // The parent's write ends live in `cmd`; close them so EOF arrives.
    drop(cmd);
    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(script = invocation.script, error = %err, "spawn step failed");
            return failure(json!({
                "error": "spawn_failed",
                "script": invocation.script,
                "args": invocation.args,
                "detail": err.to_string(),
            }));
        }
    };

    let mut tail: VecDeque<String> = VecDeque::with_capacity(OUTPUT_TAIL_LINES);
    let mut lines = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match lines.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(script = invocation.script, error = %err, "read step output failed");
                break;
            }
        }
        let decoded = String::from_utf8_lossy(&buf);
        let line = decoded.trim_end_matches(['\n', '\r']).to_string();
        sink(StepEvent::Output(&line));
        if tail.len() == OUTPUT_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    let status = match child.wait() {
        Ok(status) => status,
        Err(err) => {
            return failure(json!({
                "error": "wait_failed",
                "script": invocation.script,
                "args": invocation.args,
                "detail": err.to_string(),
                "output_tail": Vec::from(tail),
            }));
        }
    };
    let returncode = status.code();
    tracing::info!(
        script = invocation.script,
        returncode = ?returncode,
        "step process exited"
    );
    let meta = CompletedMeta {
        script: invocation.script,
        args: invocation.args,
        returncode,
        output_tail: Vec::from(tail),
    };
    StepOutcome {
        success: status.success(),
        meta: serde_json::to_value(&meta).unwrap_or(Value::Null),
    }
}

fn failure(meta: Value) -> StepOutcome {
    StepOutcome {
        success: false,
        meta,
    }
}

/// One pipe shared by the child's stdout and stderr, so lines keep the order
/// they were written in.
fn combined_pipe() -> io::Result<(PipeReader, Stdio, Stdio)> {
    let (reader, writer) = io::pipe()?;
    let stdout = Stdio::from(writer.try_clone()?);
    Ok((reader, stdout, Stdio::from(writer)))
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path) {
        let mut perms = meta.permissions();
        perms.set_mode(perms.mode() | 0o111);
        let _ = fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

/// Most useful line of a failed step's output for a one-line summary.
///
/// Prefers the last line mentioning an error, else the last non-empty line.
pub fn failure_hint(meta: &Value) -> Option<String> {
    let tail = meta.get("output_tail")?.as_array()?;
    let lines: Vec<String> = tail
        .iter()
        .map(|line| match line {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect();
    lines
        .iter()
        .rev()
        .find(|line| line.contains("ERROR:") || line.contains("Got error:"))
        .cloned()
        .or_else(|| {
            lines
                .iter()
                .rev()
                .find(|line| !line.trim().is_empty())
                .map(|line| line.trim().to_string())
        })
}

#[cfg(all(test, unix))]
#[path = "runner_tests.rs"]
mod tests;
