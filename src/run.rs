//! Command-line entry point: resolve, build if needed, run.

use crate::cache::{self, BinaryRef};
use crate::config::{Config, Flags};
use crate::runner::{self, RunHandle};
use crate::script::ScriptRef;
use crate::supervisor::{self, Launcher};
use crate::{fs, logging, toolchain, watch};
use argh::FromArgs;
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

const USAGE: &str = "usage: gorun [-f] [-b] [-r] [-R] [-v] <script> [args...]

To run a script directly, make \"#!/usr/bin/env gorun\" its first line
and set its executable bit.  Try gorun --help for the options.
";

#[derive(FromArgs)]
/// Run a Go source file like a script.  The compiled program is cached and
/// only rebuilt when the source changes.
struct Args {
    /// force compilation
    #[argh(switch, short = 'f')]
    force: bool,

    /// build the script's whole directory rather than the script alone
    #[argh(switch, short = 'b')]
    whole_directory: bool,

    /// rebuild and restart the program when the script changes (implies -f)
    #[argh(switch, short = 'r')]
    reload: bool,

    /// like -r, but watch the script's whole directory tree
    #[argh(switch, short = 'R')]
    reload_recursive: bool,

    /// print toolchain command lines and cache decisions
    #[argh(switch, short = 'v')]
    verbose: bool,
}

/// Split the command line into our options, the script, and the script's
/// own arguments.  Options only come before the script, so anything after it
/// (even "-f") belongs to the script.
fn split_args(args: Vec<OsString>) -> (Vec<OsString>, Option<OsString>, Vec<OsString>) {
    let mut args = args.into_iter();
    let mut opts = Vec::new();
    let mut script = None;
    for arg in args.by_ref() {
        if arg == "--" {
            script = args.next();
            break;
        }
        let is_opt = arg.to_str().map_or(false, |s| s.starts_with('-') && s.len() > 1);
        if !is_opt {
            script = Some(arg);
            break;
        }
        opts.push(arg);
    }
    (opts, script, args.collect())
}

/// Build, copying toolchain output to stderr on failure.
fn build(script: &ScriptRef, binary: &BinaryRef, config: &Config) -> anyhow::Result<bool> {
    tracing::debug!("building {}", script.path.display());
    let outcome = toolchain::build(script, binary, config)?;
    if !outcome.success {
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(&outcome.output)?;
        stderr.flush()?;
    }
    Ok(outcome.success)
}

/// Builds and starts the script for the hot reload supervisor.
struct ScriptLauncher<'a> {
    script: &'a ScriptRef,
    binary: &'a BinaryRef,
    config: &'a Config,
    args: &'a [OsString],
    /// When the last build started.  Anything modified later is not part of
    /// the running binary.
    built_at: Option<SystemTime>,
}

impl<'a> Launcher for ScriptLauncher<'a> {
    fn rebuild(&mut self) -> anyhow::Result<bool> {
        self.built_at = Some(SystemTime::now());
        build(self.script, self.binary, self.config)
    }

    fn start(&mut self) -> anyhow::Result<RunHandle> {
        runner::start(&self.binary.path, self.args)
    }

    fn is_stale(&self, path: &Path) -> bool {
        match self.built_at {
            Some(t) => fs::changed_since(path, t).unwrap_or(true),
            None => true,
        }
    }
}

fn hot_reload(
    script: &ScriptRef,
    binary: &BinaryRef,
    config: &Config,
    args: &[OsString],
) -> anyhow::Result<i32> {
    let mut launcher = ScriptLauncher {
        script,
        binary,
        config,
        args,
        built_at: None,
    };
    if !launcher.rebuild()? {
        return Ok(1);
    }
    let (tx, rx) = std::sync::mpsc::channel();
    let _watcher = watch::watch(script, config, tx)?;
    let status = supervisor::supervise(&mut launcher, &rx)?;
    Ok(runner::exit_code(status))
}

fn run_impl() -> anyhow::Result<i32> {
    let (opts, script, script_args) = split_args(std::env::args_os().skip(1).collect());

    let mut opt_strs = Vec::new();
    for opt in &opts {
        match opt.to_str() {
            Some(s) => opt_strs.push(s),
            None => {
                eprintln!("gorun: invalid option {:?}", opt);
                return Ok(2);
            }
        }
    }
    let args = match Args::from_args(&["gorun"], &opt_strs) {
        Ok(args) => args,
        Err(exit) => {
            return Ok(match exit.status {
                Ok(()) => {
                    println!("{}", exit.output);
                    0
                }
                Err(()) => {
                    eprintln!("{}", exit.output);
                    2
                }
            });
        }
    };
    logging::init(args.verbose);

    let script = match script {
        Some(script) => script,
        None => {
            eprint!("{}", USAGE);
            return Ok(2);
        }
    };
    let script = ScriptRef::resolve(Path::new(&script))?;

    let flags = Flags {
        force_compile: args.force,
        whole_directory_build: args.whole_directory,
        hot_reload: args.reload,
        hot_reload_recursive: args.reload_recursive,
    };
    let config = Config::load(&script.dir, &flags)?;
    let binary = cache::locate(&script, &config)?;

    #[cfg(unix)]
    crate::signal::register_sigint()?;

    if config.hot_reload {
        return hot_reload(&script, &binary, &config, &script_args);
    }

    if fs::needs_build(&script.path, &binary.path, config.force_compile)? {
        if !build(&script, &binary, &config)? {
            return Ok(1);
        }
    } else {
        tracing::debug!("{} is up to date", binary.path.display());
    }

    let status = runner::start(&binary.path, &script_args)?.wait()?;
    Ok(runner::exit_code(status))
}

pub fn run() -> anyhow::Result<i32> {
    run_impl()
}
