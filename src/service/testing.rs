//! Scripted stand-in for the container runtime and dump tools.

use crate::models::error::{BackupError, Result};
use crate::service::process::{describe_command, ProcessRunner};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub struct FakeRunner {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    failures: Vec<(String, String)>,
    partial_output: bool,
}

impl FakeRunner {
    pub const SQL_DUMP: &'static str = "-- MariaDB dump\nCREATE TABLE journals (id INT);\n";
    pub const STORE_ARCHIVE: &'static [u8] = b"\x1f\x8bfake-store-archive";
    pub const TRUNCATED_ARCHIVE: &'static [u8] = b"\x1f\x8btruncated";

    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Vec::new(),
            partial_output: false,
        }
    }

    /// Any command whose command line contains `pattern` exits 1 with `stderr`
    pub fn fail_on(mut self, pattern: &str, stderr: &str) -> Self {
        self.failures.push((pattern.to_string(), stderr.to_string()));
        self
    }

    /// Failing commands still write a truncated `--archive=` target first
    pub fn with_partial_output(mut self) -> Self {
        self.partial_output = true;
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called_with(&self, arg: &str) -> bool {
        self.calls().iter().any(|(_, args)| args.iter().any(|a| a == arg))
    }

    fn record(&self, program: &str, args: &[String]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));

        let line = format!("{} {}", program, args.join(" "));
        match self.failures.iter().find(|(pattern, _)| line.contains(pattern)) {
            Some((_, stderr)) => Err(BackupError::CommandFailed {
                command: describe_command(program, args),
                code: "exit code 1".to_string(),
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl ProcessRunner for FakeRunner {
    fn run_checked(&self, program: &str, args: &[String]) -> Result<()> {
        let archive = args.iter().find_map(|a| a.strip_prefix("--archive="));

        if let Err(e) = self.record(program, args) {
            if let (true, Some(archive)) = (self.partial_output, archive) {
                fs::write(archive, Self::TRUNCATED_ARCHIVE)?;
            }
            return Err(e);
        }

        if args.first().map(String::as_str) == Some("cp") {
            let dest = Path::new(&args[2]);
            fs::create_dir_all(dest.join("nested"))?;
            fs::write(dest.join("copied-from.txt"), &args[1])?;
            fs::write(dest.join("nested").join("inner.bin"), [7u8, 8, 9])?;
        }

        if let Some(archive) = archive {
            fs::write(archive, Self::STORE_ARCHIVE)?;
        }

        Ok(())
    }

    fn run_streaming(&self, program: &str, args: &[String], mut sink: File) -> Result<()> {
        self.record(program, args)?;
        sink.write_all(Self::SQL_DUMP.as_bytes())?;
        Ok(())
    }
}
