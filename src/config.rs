//! Settings, merged from defaults, config files and command-line flags.
//!
//! Config files hold one `key value` pair per line:
//!
//! ```text
//! # rebuild and restart when sources change
//! hot-reload          yes
//! watched-extensions  go,tmpl
//! cache-directory     /var/cache/gorun
//! ```

use crate::scanner::{ParseResult, Scanner};
use anyhow::anyhow;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

/// Systemwide config file, read first.
pub const SYSTEM_CONFIG: &str = "/etc/gorunrc";
/// Name of the config file looked up in the user's home directory and in the
/// script's directory.
pub const CONFIG_NAME: &str = ".gorunrc";

pub const DEFAULT_CACHE_DIRECTORY: &str = ".gorun";
pub const DEFAULT_COMPILE_COMMAND: &str = "go tool compile -p main -o $out $in";
pub const DEFAULT_LINK_COMMAND: &str = "go tool link -o $out $in";
pub const DEFAULT_BUILD_COMMAND: &str = "go build -o $out";

/// Options given on the command line.  These can only switch settings on.
#[derive(Debug, Default, Clone, Copy)]
pub struct Flags {
    pub force_compile: bool,
    pub whole_directory_build: bool,
    pub hot_reload: bool,
    pub hot_reload_recursive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub force_compile: bool,
    pub whole_directory_build: bool,
    pub hot_reload: bool,
    pub hot_reload_recursive: bool,
    /// Extensions (without the dot) of files whose changes trigger a reload.
    pub watched_extensions: FxHashSet<String>,
    /// Where binaries are cached.  Relative paths are taken relative to the
    /// script's directory.
    pub cache_directory: PathBuf,
    pub compile_command: String,
    pub link_command: String,
    pub build_command: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut watched_extensions = FxHashSet::default();
        watched_extensions.insert("go".to_string());
        Config {
            force_compile: false,
            whole_directory_build: false,
            hot_reload: false,
            hot_reload_recursive: false,
            watched_extensions,
            cache_directory: PathBuf::from(DEFAULT_CACHE_DIRECTORY),
            compile_command: DEFAULT_COMPILE_COMMAND.to_string(),
            link_command: DEFAULT_LINK_COMMAND.to_string(),
            build_command: DEFAULT_BUILD_COMMAND.to_string(),
        }
    }
}

fn parse_bool(scanner: &Scanner, value: &str, ofs: usize) -> ParseResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Ok(true),
        "no" | "false" | "off" | "0" => Ok(false),
        _ => scanner.parse_error_at(ofs, format!("expected yes or no, got {:?}", value)),
    }
}

/// Normalize a key for matching: case-insensitive, ignoring '-' and '_'.
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|&c| c != '-' && c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl Config {
    /// Build the configuration for a script in `script_dir`: defaults, then
    /// the system, user and per-directory config files, then `flags`.
    pub fn load(script_dir: &Path, flags: &Flags) -> anyhow::Result<Config> {
        let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(CONFIG_NAME));
        }
        paths.push(script_dir.join(CONFIG_NAME));

        let mut config = Config::default();
        for path in &paths {
            if config.read_file(path)? {
                tracing::debug!("loaded config {}", path.display());
            }
        }
        config.apply_flags(flags);
        Ok(config)
    }

    /// Overlay the settings found in a config file.  Returns false if the
    /// file doesn't exist.
    pub fn read_file(&mut self, path: &Path) -> anyhow::Result<bool> {
        let mut bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => anyhow::bail!("read {}: {}", path.display(), err),
        };
        if let Err(err) = std::str::from_utf8(&bytes) {
            anyhow::bail!("read {}: {}", path.display(), err);
        }
        bytes.push(0);
        self.parse(&bytes)
            .map_err(|err| anyhow!(Scanner::new(&bytes).format_parse_error(path, err)))?;
        Ok(true)
    }

    /// Overlay settings from config text.  The buffer must be UTF-8 and
    /// nul-terminated.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<()> {
        let mut scanner = Scanner::new(buf);
        while !scanner.at_end() {
            scanner.skip_spaces();
            if scanner.peek() == '#' {
                scanner.skip_to_eol();
                continue;
            }

            let line = scanner.line;
            let key_start = scanner.ofs;
            while !scanner.at_end()
                && !scanner.peek_newline()
                && scanner.peek() != ' '
                && scanner.peek() != '\t'
            {
                scanner.next();
            }
            let key = scanner.slice(key_start, scanner.ofs);
            scanner.skip_spaces();
            let value_start = scanner.ofs;
            let value_end = scanner.skip_to_eol();
            let value = scanner.slice(value_start, value_end).trim_end();

            if key.is_empty() || value.is_empty() {
                continue;
            }
            self.set(&scanner, line, key, value, value_start)?;
        }
        Ok(())
    }

    fn set(
        &mut self,
        scanner: &Scanner,
        line: usize,
        key: &str,
        value: &str,
        ofs: usize,
    ) -> ParseResult<()> {
        match normalize_key(key).as_str() {
            "forcecompile" => self.force_compile = parse_bool(scanner, value, ofs)?,
            "wholedirectorybuild" => self.whole_directory_build = parse_bool(scanner, value, ofs)?,
            "hotreload" => self.hot_reload = parse_bool(scanner, value, ofs)?,
            "hotreloadrecursive" => self.hot_reload_recursive = parse_bool(scanner, value, ofs)?,
            "watchedextensions" => {
                self.watched_extensions = value
                    .split(',')
                    .map(|ext| ext.trim().trim_start_matches('.'))
                    .filter(|ext| !ext.is_empty())
                    .map(|ext| ext.to_string())
                    .collect();
            }
            "cachedirectory" => self.cache_directory = PathBuf::from(value),
            "compilecommand" => self.compile_command = value.to_string(),
            "linkcommand" => self.link_command = value.to_string(),
            "buildcommand" => self.build_command = value.to_string(),
            _ => tracing::warn!("line {}: ignoring unknown config key {:?}", line, key),
        }
        Ok(())
    }

    /// Apply command-line flags and the implications between settings.
    pub fn apply_flags(&mut self, flags: &Flags) {
        self.force_compile |= flags.force_compile;
        self.whole_directory_build |= flags.whole_directory_build;
        self.hot_reload |= flags.hot_reload;
        self.hot_reload_recursive |= flags.hot_reload_recursive;

        if self.hot_reload_recursive {
            self.hot_reload = true;
        }
        if self.hot_reload {
            self.force_compile = true;
        }
    }

    /// Whether changes to a file with this extension should trigger a reload.
    pub fn watches_extension(&self, ext: &str) -> bool {
        self.watched_extensions.contains(ext)
    }

    /// Whether the whole directory tree under the script is watched, rather
    /// than the script alone.
    pub fn watches_tree(&self) -> bool {
        self.whole_directory_build || self.hot_reload_recursive
    }
}
