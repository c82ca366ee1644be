pub mod cache;
pub mod config;
pub mod fs;
pub mod hashbang;
mod logging;
mod process;
#[cfg(unix)]
mod process_posix;
pub mod run;
pub mod runner;
pub mod scanner;
pub mod script;
#[cfg(unix)]
mod signal;
pub mod supervisor;
pub mod toolchain;
pub mod watch;

#[cfg(not(any(windows, target_arch = "wasm32")))]
use jemallocator::Jemalloc;

#[cfg(not(any(windows, target_arch = "wasm32")))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;
