use crate::models::error::{BackupError, Result};
use log::{debug, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind};
use std::process::{Command, ExitStatus, Stdio};

/// Runs external commands for the pipeline. The pipeline is generic over this
/// trait so tests can stand in for the container runtime and dump tools.
pub trait ProcessRunner: Send + Sync {
    /// Runs to completion, capturing stderr. Non-zero exit is an error that
    /// carries the captured stderr text.
    fn run_checked(&self, program: &str, args: &[String]) -> Result<()>;

    /// Runs to completion with stdout written straight into `sink`. Stderr is
    /// logged as it arrives and only a non-zero exit is an error.
    fn run_streaming(&self, program: &str, args: &[String], sink: File) -> Result<()>;
}

/// `ProcessRunner` backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run_checked(&self, program: &str, args: &[String]) -> Result<()> {
        let command = describe_command(program, args);
        debug!("Running: {}", command);

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|cause| BackupError::CommandSpawn {
                command: command.clone(),
                cause,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(BackupError::CommandFailed {
                command,
                code: describe_status(&output.status),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn run_streaming(&self, program: &str, args: &[String], sink: File) -> Result<()> {
        let command = describe_command(program, args);
        debug!("Streaming: {}", command);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(sink))
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|cause| BackupError::CommandSpawn {
                command: command.clone(),
                cause,
            })?;

        let mut stderr_text = String::new();
        if let Some(stderr) = child.stderr.take() {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(['\r', '\n']);
                        warn!("{}: {}", program, line);
                        stderr_text.push_str(line);
                        stderr_text.push('\n');
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        // Drain the rest so the child never hits SIGPIPE
                        warn!("Could not read stderr of {}: {}", program, e);
                        let _ = io::copy(&mut reader, &mut io::sink());
                        break;
                    }
                }
            }
        }

        let status = child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(BackupError::CommandFailed {
                command,
                code: describe_status(&status),
                stderr: stderr_text.trim().to_string(),
            })
        }
    }
}

/// Command line for logs and errors with credentials masked
pub fn describe_command(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    for arg in args {
        let shown = if arg.starts_with("-p") && arg.len() > 2 {
            "-p****".to_string()
        } else if arg.starts_with("--uri=") {
            "--uri=****".to_string()
        } else {
            arg.clone()
        };
        parts.push(shown);
    }
    parts.join(" ")
}

fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
