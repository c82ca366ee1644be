//! Runs an external command line, capturing everything it prints.

#[cfg(unix)]
pub use crate::process_posix::run_command;

#[derive(Debug, PartialEq)]
pub enum Termination {
    Success,
    Interrupted,
    Failure,
}

/// Runs `cmdline` through `cmd /c`.  stdout and stderr can't share a pipe
/// here, so stderr is appended after stdout.
#[cfg(not(unix))]
pub fn run_command(cmdline: &str) -> anyhow::Result<(Termination, Vec<u8>)> {
    let mut cmd = std::process::Command::new("cmd")
        .arg("/c")
        .arg(cmdline)
        .stdin(std::process::Stdio::null())
        .output()?;
    let mut output = Vec::new();
    output.append(&mut cmd.stdout);
    output.append(&mut cmd.stderr);
    let termination = if cmd.status.success() {
        Termination::Success
    } else {
        Termination::Failure
    };
    Ok((termination, output))
}
