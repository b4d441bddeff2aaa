// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `hotrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "hotrun",
    version,
    about = "Rebuild and restart a program whenever its sources change.",
    long_about = None
)]
pub struct CliArgs {
    /// Package directory or `main.go` to build.
    ///
    /// When omitted, a single `main.go` under the root is picked up
    /// automatically.
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Path to the config file (TOML). A missing file means "all defaults".
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Directory to watch and build in.
    #[arg(long, value_name = "DIR")]
    pub root: Option<String>,

    /// Comma separated directory names to ignore, e.g. ".git,tmp,vendor".
    #[arg(long, visible_alias = "excludeDir", value_name = "DIRS")]
    pub exclude_dir: Option<String>,

    /// Comma separated file extensions that trigger a rebuild, e.g. "go,html".
    #[arg(long, visible_alias = "includeExt", value_name = "EXTS")]
    pub include_ext: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `HOTRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Arguments passed through to the program after `--`.
    #[arg(last = true, value_name = "ARGS")]
    pub app_args: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Split a comma separated flag value, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_camel_case_flags_are_accepted() {
        let args = CliArgs::try_parse_from([
            "hotrun",
            "--excludeDir",
            ".git,tmp",
            "--includeExt",
            "go",
            "./cmd/server",
            "--",
            "-port",
            "8080",
        ])
        .unwrap();

        assert_eq!(args.exclude_dir.as_deref(), Some(".git,tmp"));
        assert_eq!(args.include_ext.as_deref(), Some("go"));
        assert_eq!(args.target.as_deref(), Some("./cmd/server"));
        assert_eq!(args.app_args, vec!["-port", "8080"]);
    }

    #[test]
    fn config_path_defaults_to_hotrun_toml() {
        let args = CliArgs::try_parse_from(["hotrun"]).unwrap();
        assert_eq!(args.config, default_config_path());

        let args = CliArgs::try_parse_from(["hotrun", "--config", "dev/Hotrun.toml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("dev/Hotrun.toml"));
    }

    #[test]
    fn split_list_ignores_blanks() {
        assert_eq!(split_list(" go, ,html,"), vec!["go", "html"]);
    }
}
