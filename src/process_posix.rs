//! Implements run_command on posix.
//!
//! Both stdout and stderr of the command are fed into the same pipe, so the
//! captured output interleaves exactly as the toolchain wrote it.  That can't
//! be expressed with Stdio::piped(), which gives each stream its own pipe.

use crate::process::Termination;
use std::io::Read;
use std::io::Write;
use std::os::fd::{FromRawFd, OwnedFd};
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;

fn check_posix(func: &str, ret: libc::c_int) -> anyhow::Result<()> {
    if ret < 0 {
        anyhow::bail!("{}: {}", func, std::io::Error::last_os_error());
    }
    Ok(())
}

/// Creates a pipe whose ends are not inherited across exec.
fn pipe() -> anyhow::Result<(OwnedFd, OwnedFd)> {
    unsafe {
        let mut fds: [libc::c_int; 2] = [0; 2];
        check_posix("pipe", libc::pipe(fds.as_mut_ptr()))?;
        let (read, write) = (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1]));
        for fd in fds {
            check_posix("fcntl", libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC))?;
        }
        Ok((read, write))
    }
}

pub fn run_command(cmdline: &str) -> anyhow::Result<(Termination, Vec<u8>)> {
    let (read, write) = pipe()?;
    let write_err = write.try_clone()?;

    // The Command (and with it the parent's copies of the write end) is
    // dropped at the end of this statement; otherwise read_to_end below
    // would never see EOF.
    let mut child = std::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(cmdline)
        .stdin(Stdio::null())
        .stdout(Stdio::from(write))
        .stderr(Stdio::from(write_err))
        .spawn()
        .map_err(|err| anyhow::anyhow!("spawn /bin/sh: {}", err))?;

    let mut output = Vec::new();
    std::fs::File::from(read).read_to_end(&mut output)?;
    let status = child.wait()?;

    let mut termination = Termination::Success;
    if !status.success() {
        termination = Termination::Failure;
        if let Some(sig) = status.signal() {
            match sig {
                libc::SIGINT => {
                    write!(output, "interrupted")?;
                    termination = Termination::Interrupted;
                }
                _ => write!(output, "signal {}", sig)?,
            }
        }
    }

    Ok((termination, output))
}
