use crate::e2e::*;
use std::io::BufRead;
use std::sync::mpsc;
use std::time::Duration;

const LOOP: &str = "#!/usr/bin/env gorun
const STOP: bool = false;

fn main() {
    println!(\"Start!\");
    while !STOP {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    println!(\"Stop!\");
}
";

/// A gorun process whose stdout is read line by line on another thread, so
/// a test can give up instead of hanging when a reload never happens.
struct Supervised {
    child: std::process::Child,
    lines: mpsc::Receiver<String>,
}

impl Supervised {
    fn spawn(space: &TestSpace, args: Vec<&str>) -> anyhow::Result<Self> {
        let mut cmd = gorun_command(args);
        let mut child = space
            .prepare(&mut cmd)
            .stdout(std::process::Stdio::piped())
            .spawn()?;
        let stdout = child.stdout.take().unwrap();
        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in std::io::BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        Ok(Supervised { child, lines })
    }

    fn expect_line(&mut self, want: &str) {
        match self.lines.recv_timeout(Duration::from_secs(60)) {
            Ok(line) => assert_eq!(line, want),
            Err(err) => {
                let _ = self.child.kill();
                panic!("waiting for {:?}: {}", want, err);
            }
        }
    }

    fn wait(mut self) -> anyhow::Result<std::process::ExitStatus> {
        Ok(self.child.wait()?)
    }
}

#[cfg(unix)]
#[test]
fn restart_on_edit() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("loop.rs", LOOP)?;

    let mut gorun = Supervised::spawn(&space, vec!["-r", "loop.rs"])?;
    gorun.expect_line("Start!");

    // Give the watch a moment, and the edit a later mtime than the build.
    std::thread::sleep(Duration::from_millis(1100));
    let stopping = LOOP.replace("STOP: bool = false", "STOP: bool = true");
    space.write("loop.rs", &stopping)?;

    gorun.expect_line("Start!");
    gorun.expect_line("Stop!");
    assert!(gorun.wait()?.success());
    assert_eq!(space.read("loop.rs")?, stopping.as_bytes());
    Ok(())
}

#[cfg(unix)]
#[test]
fn recursive_reload_watches_other_files() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "main.rs",
        "#!/usr/bin/env gorun
mod flag;

fn main() {
    println!(\"Start!\");
    while !flag::STOP {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    println!(\"Stop!\");
}
",
    )?;
    space.write("flag.rs", "pub const STOP: bool = false;\n")?;

    let mut gorun = Supervised::spawn(&space, vec!["-R", "main.rs"])?;
    gorun.expect_line("Start!");

    std::thread::sleep(Duration::from_millis(1100));
    space.write("flag.rs", "pub const STOP: bool = true;\n")?;

    gorun.expect_line("Start!");
    gorun.expect_line("Stop!");
    assert!(gorun.wait()?.success());
    Ok(())
}

#[cfg(unix)]
#[test]
fn program_exit_ends_reload() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("quick.rs", "fn main() {\n    std::process::exit(3);\n}\n")?;
    let out = space.run(&mut gorun_command(vec!["-r", "quick.rs"]))?;
    assert_eq!(out.status.code(), Some(3));
    Ok(())
}
