//! SIGINT handling while a program runs under us.
//!
//! Ctrl-C is delivered to the whole foreground process group, so the program
//! and gorun both receive it.  The program decides what an interrupt means;
//! gorun has to outlive it to pass its exit status on.

/// Sets the SIGINT disposition, returning the raw sigaction() result.
/// Only calls async-signal-safe functions, so handlers may use it.
fn set_sigint(disposition: libc::sighandler_t) -> libc::c_int {
    // Safety: the sigaction struct is fully initialized before use.
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        libc::sigemptyset(&mut sa.sa_mask);
        sa.sa_sigaction = disposition;
        libc::sigaction(libc::SIGINT, &sa, std::ptr::null_mut())
    }
}

/// Swallows the first interrupt.  A second Ctrl-C gets the default action
/// and terminates gorun, in case the program ignores interrupts.
extern "C" fn on_first_sigint(_sig: libc::c_int) {
    set_sigint(libc::SIG_DFL);
}

/// Arrange for gorun to survive the first Ctrl-C.
pub fn register_sigint() -> anyhow::Result<()> {
    if set_sigint(on_first_sigint as libc::sighandler_t) < 0 {
        anyhow::bail!("sigaction: {}", std::io::Error::last_os_error());
    }
    Ok(())
}
