//! Support code for e2e tests, which run gorun as a binary.
//!
//! The scripts are Rust rather than Go so the tests only need the Rust
//! toolchain: each TestSpace gets a .gorunrc pointing the compile, link and
//! build commands at rustc.

mod basic;
mod reload;

pub fn gorun_binary() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_gorun"))
}

pub fn gorun_command(args: Vec<&str>) -> std::process::Command {
    let mut cmd = std::process::Command::new(gorun_binary());
    cmd.args(args);
    cmd
}

fn print_output(out: &std::process::Output) {
    // Gross: use print! instead of writing to stdout so Rust test
    // framework can capture it.
    print!("{}", String::from_utf8_lossy(&out.stdout));
    print!("{}", String::from_utf8_lossy(&out.stderr));
}

pub fn assert_stderr_contains(out: &std::process::Output, text: &str) {
    let err = String::from_utf8_lossy(&out.stderr);
    if !err.contains(text) {
        panic!(
            "assertion failed; expected stderr to contain {:?} but got:\n{}",
            text, err
        );
    }
}

/// Toolchain config for Rust scripts.  The compile step already produces a
/// runnable program, so "linking" is a copy.  Every compile is logged to
/// builds.log in the working directory so tests can count builds.
pub const RUSTC_CONFIG: &str = "
compile-command     echo build >> builds.log; rustc --edition 2018 -o $out $in
link-command        cp $in $out
build-command       echo build >> builds.log; rustc --edition 2018 -o $out $in
watched-extensions  rs
";

/// Manages a temporary directory for invoking gorun.  The directory is also
/// HOME, so no config from the real home directory leaks in.
pub struct TestSpace {
    dir: tempfile::TempDir,
}
impl TestSpace {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let space = TestSpace { dir };
        space.write(".gorunrc", RUSTC_CONFIG)?;
        Ok(space)
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Write a file into the working space.
    pub fn write(&self, path: &str, content: &str) -> std::io::Result<()> {
        std::fs::write(self.dir.path().join(path), content)
    }

    /// Read a file from the working space.
    pub fn read(&self, path: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.dir.path().join(path))
    }

    /// Write an executable script.
    #[cfg(unix)]
    pub fn write_executable(&self, path: &str, content: &str) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        self.write(path, content)?;
        let path = self.dir.path().join(path);
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
    }

    /// How many times the toolchain compiled something.
    pub fn build_count(&self) -> usize {
        match self.read("builds.log") {
            Ok(log) => log.split(|&c| c == b'\n').filter(|l| !l.is_empty()).count(),
            Err(_) => 0,
        }
    }

    /// Set up a command to run inside the space.
    pub fn prepare<'a>(
        &self,
        cmd: &'a mut std::process::Command,
    ) -> &'a mut std::process::Command {
        cmd.current_dir(self.dir.path())
            .env("HOME", self.dir.path())
            .env_remove("GORUN_LOG")
    }

    /// Invoke gorun, returning process output.
    pub fn run(&self, cmd: &mut std::process::Command) -> std::io::Result<std::process::Output> {
        self.prepare(cmd).output()
    }

    /// Like run, but also print output if gorun failed.
    pub fn run_expect(
        &self,
        cmd: &mut std::process::Command,
    ) -> anyhow::Result<std::process::Output> {
        let out = self.run(cmd)?;
        if !out.status.success() {
            print_output(&out);
            anyhow::bail!("gorun failed, status {}", out.status);
        }
        Ok(out)
    }

    /// Persist the temp dir locally and abort the test.  Debugging helper.
    #[allow(dead_code)]
    pub fn eject(self) -> ! {
        panic!("ejected at {:?}", self.dir.into_path());
    }
}
