//! Runs the compiled program.
//!
//! The program inherits our stdin/stdout/stderr and environment, so to the
//! user it looks as if the script itself was run.

use anyhow::anyhow;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Child, ExitStatus};

/// A running program.
pub struct RunHandle {
    child: Child,
}

/// Start `binary` with `args`.
pub fn start(binary: &Path, args: &[OsString]) -> anyhow::Result<RunHandle> {
    let child = std::process::Command::new(binary)
        .args(args)
        .spawn()
        .map_err(|err| anyhow!("could not execute {:?} {:?}: {}", binary, args, err))?;
    Ok(RunHandle { child })
}

impl RunHandle {
    /// Block until the program exits.
    pub fn wait(mut self) -> anyhow::Result<ExitStatus> {
        Ok(self.child.wait()?)
    }

    /// Check whether the program exited, without blocking.
    pub fn try_wait(&mut self) -> anyhow::Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Forcibly stop the program and reap it.
    pub fn kill(mut self) -> anyhow::Result<()> {
        if let Err(err) = self.child.kill() {
            // InvalidInput means it already exited.
            if err.kind() != std::io::ErrorKind::InvalidInput {
                return Err(err.into());
            }
        }
        self.child.wait()?;
        Ok(())
    }
}

/// The exit code to terminate with so the caller sees the program's status.
/// A program killed by a signal maps to 128 + the signal number, as shells
/// report it.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            if sig != libc::SIGINT {
                eprintln!("gorun: program terminated by signal {}", sig);
            }
            return 128 + sig;
        }
    }
    1
}
