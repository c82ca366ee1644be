use crate::e2e::*;

const OUTPUT: &str = "#!/usr/bin/env gorun
fn main() {
    println!(\"The night is all magic\");
}
";

const INPUT: &str = "#!/usr/bin/env gorun
use std::io::BufRead;

fn main() {
    println!(\"(Write and press Enter to finish)\");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).unwrap();
    print!(\"{}\", line);
}
";

const PARAMETERS: &str = "#!/usr/bin/env gorun
fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    println!(\"Parameters: {}\", args.len());
    for arg in args {
        println!(\"{}\", arg);
    }
}
";

#[cfg(unix)]
#[test]
fn cached_after_first_run() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("output.rs", OUTPUT)?;

    let out = space.run_expect(&mut gorun_command(vec!["output.rs"]))?;
    assert_eq!(out.stdout, b"The night is all magic\n");
    assert_eq!(space.build_count(), 1);

    let out = space.run_expect(&mut gorun_command(vec!["output.rs"]))?;
    assert_eq!(out.stdout, b"The night is all magic\n");
    assert_eq!(space.build_count(), 1);

    // The hashbang was only hidden while compiling.
    assert_eq!(space.read("output.rs")?, OUTPUT.as_bytes());
    Ok(())
}

#[cfg(unix)]
#[test]
fn rebuild_on_change() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("output.rs", OUTPUT)?;
    space.run_expect(&mut gorun_command(vec!["output.rs"]))?;
    assert_eq!(space.build_count(), 1);

    space.write("output.rs", &OUTPUT.replace("all magic", "young"))?;
    // Make sure the edit is visibly newer than the cached binary.
    let later = filetime::FileTime::from_system_time(
        std::time::SystemTime::now() + std::time::Duration::from_secs(5),
    );
    filetime::set_file_mtime(space.path().join("output.rs"), later)?;

    let out = space.run_expect(&mut gorun_command(vec!["output.rs"]))?;
    assert_eq!(out.stdout, b"The night is young\n");
    assert_eq!(space.build_count(), 2);
    Ok(())
}

#[cfg(unix)]
#[test]
fn force_compile() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("output.rs", OUTPUT)?;
    space.run_expect(&mut gorun_command(vec!["output.rs"]))?;
    let out = space.run_expect(&mut gorun_command(vec!["-f", "output.rs"]))?;
    assert_eq!(out.stdout, b"The night is all magic\n");
    assert_eq!(space.build_count(), 2);
    Ok(())
}

#[cfg(unix)]
#[test]
fn stdin_passes_through() -> anyhow::Result<()> {
    use std::io::Write;

    let space = TestSpace::new()?;
    space.write("input.rs", INPUT)?;
    let mut cmd = gorun_command(vec!["input.rs"]);
    let mut child = space
        .prepare(&mut cmd)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .spawn()?;
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Hello, World!\n")?;
    let out = child.wait_with_output()?;
    assert!(out.status.success());
    assert_eq!(
        std::str::from_utf8(&out.stdout)?,
        "(Write and press Enter to finish)\nHello, World!\n"
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn script_arguments() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("parameters.rs", PARAMETERS)?;

    let out = space.run_expect(&mut gorun_command(vec!["parameters.rs"]))?;
    assert_eq!(std::str::from_utf8(&out.stdout)?, "Parameters: 0\n");

    // Options after the script belong to the script.
    let out = space.run_expect(&mut gorun_command(vec!["parameters.rs", "-f", "One", "Two"]))?;
    assert_eq!(
        std::str::from_utf8(&out.stdout)?,
        "Parameters: 3\n-f\nOne\nTwo\n"
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn run_through_hashbang() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write_executable("parameters.rs", PARAMETERS)?;

    let bin_dir = gorun_binary().parent().unwrap().to_path_buf();
    let mut paths = vec![bin_dir];
    if let Some(path) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&path));
    }
    let mut cmd = std::process::Command::new(space.path().join("parameters.rs"));
    cmd.arg("One").env("PATH", std::env::join_paths(paths)?);
    let out = space.run_expect(&mut cmd)?;
    assert_eq!(std::str::from_utf8(&out.stdout)?, "Parameters: 1\nOne\n");
    Ok(())
}

#[cfg(unix)]
#[test]
fn exit_code_propagates() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "fail.rs",
        "fn main() {\n    eprintln!(\"giving up\");\n    std::process::exit(7);\n}\n",
    )?;
    let out = space.run(&mut gorun_command(vec!["fail.rs"]))?;
    assert_eq!(out.status.code(), Some(7));
    assert_stderr_contains(&out, "giving up");
    Ok(())
}

#[cfg(unix)]
#[test]
fn compile_error() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let broken = "#!/usr/bin/env gorun\nfn main() {\n    let x: u32 = \"nope\";\n}\n";
    space.write("broken.rs", broken)?;
    let out = space.run(&mut gorun_command(vec!["broken.rs"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "mismatched types");
    assert!(out.stdout.is_empty());
    assert_eq!(space.read("broken.rs")?, broken.as_bytes());

    // Nothing was cached, so the next run tries again.
    space.run(&mut gorun_command(vec!["broken.rs"]))?;
    assert_eq!(space.build_count(), 2);
    Ok(())
}

#[cfg(unix)]
#[test]
fn usage() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut gorun_command(vec![]))?;
    assert_eq!(out.status.code(), Some(2));
    assert_stderr_contains(&out, "usage: gorun");

    let out = space.run(&mut gorun_command(vec!["-x", "output.rs"]))?;
    assert_eq!(out.status.code(), Some(2));
    Ok(())
}

#[cfg(unix)]
#[test]
fn missing_script() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut gorun_command(vec!["nowhere.rs"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "gorun: error: could not open script");
    Ok(())
}

#[cfg(unix)]
#[test]
fn bad_config() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("output.rs", OUTPUT)?;
    space.write(".gorunrc", "force-compile maybe\n")?;
    let out = space.run(&mut gorun_command(vec!["output.rs"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "maybe");
    Ok(())
}
