use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use anyhow::{bail, Context, Result};

/// Runs external programs on behalf of the buildpack.
///
/// `dir` is the working directory for the child; `None` inherits the current one.
/// Whatever the program prints is forwarded to `stdout` and `stderr`.
pub trait CommandRunner {
    fn execute(
        &self,
        dir: Option<&Path>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        program: &str,
        args: &[&str],
    ) -> Result<()>;
}

/// [`CommandRunner`] backed by [`std::process::Command`].
///
/// A program that cannot be spawned (e.g. not on `PATH`) or that exits with a
/// non-zero status is reported as an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommand;

impl CommandRunner for SystemCommand {
    fn execute(
        &self,
        dir: Option<&Path>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        program: &str,
        args: &[&str],
    ) -> Result<()> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        let output = command
            .output()
            .with_context(|| format!("Could not run `{}`", program))?;
        stdout.write_all(&output.stdout)?;
        stderr.write_all(&output.stderr)?;
        if !output.status.success() {
            match output.status.code() {
                Some(code) => bail!("`{} {}` exited with status {}", program, args.join(" "), code),
                None => bail!("`{} {}` was terminated by a signal", program, args.join(" ")),
            }
        }
        Ok(())
    }
}

/// Runs `<tool> --version` and returns its trimmed stdout.
///
/// # Errors
/// Propagates any failure from the runner, with the tool name attached.
pub fn probe_version(runner: &dyn CommandRunner, tool: &str) -> Result<String> {
    let mut stdout = Vec::new();
    let mut discard = std::io::sink();
    runner
        .execute(None, &mut stdout, &mut discard, tool, &["--version"])
        .with_context(|| format!("Could not probe version of {}", tool))?;
    Ok(String::from_utf8_lossy(&stdout).trim().to_string())
}
