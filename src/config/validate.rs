// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, WatchConfig};
use crate::errors::{HotrunError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = HotrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let watch = WatchConfig::new(
            raw.watch.root.clone(),
            raw.watch.exclude_dirs.iter().map(|d| d.trim().to_string()),
            raw.watch.include_exts.iter().map(|e| e.trim().to_string()),
        );
        Ok(ConfigFile::new_unchecked(watch, raw.build, raw.run))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_root(cfg)?;
    validate_exclude_dirs(cfg)?;
    validate_include_exts(cfg)?;
    validate_build(cfg)?;
    Ok(())
}

fn validate_root(cfg: &RawConfigFile) -> Result<()> {
    let root = &cfg.watch.root;
    if !root.is_dir() {
        return Err(HotrunError::ConfigError(format!(
            "[watch].root '{}' is not a directory",
            root.display()
        )));
    }
    Ok(())
}

fn validate_exclude_dirs(cfg: &RawConfigFile) -> Result<()> {
    for dir in &cfg.watch.exclude_dirs {
        let dir = dir.trim();
        if dir.is_empty() {
            return Err(HotrunError::ConfigError(
                "[watch].exclude_dirs contains an empty entry".to_string(),
            ));
        }
        if dir.contains('/') || dir.contains('\\') {
            return Err(HotrunError::ConfigError(format!(
                "[watch].exclude_dirs entry '{dir}' must be a single directory name, not a path"
            )));
        }
    }
    Ok(())
}

fn validate_include_exts(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.include_exts.is_empty() {
        return Err(HotrunError::ConfigError(
            "[watch].include_exts must list at least one extension".to_string(),
        ));
    }
    for ext in &cfg.watch.include_exts {
        if ext.trim().trim_start_matches('.').is_empty() {
            return Err(HotrunError::ConfigError(
                "[watch].include_exts contains an empty entry".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_build(cfg: &RawConfigFile) -> Result<()> {
    if let Some(cmd) = &cfg.build.cmd {
        if cmd.trim().is_empty() {
            return Err(HotrunError::ConfigError(
                "[build].cmd must not be empty".to_string(),
            ));
        }
    }
    if cfg.build.artifact.as_os_str().is_empty() {
        return Err(HotrunError::ConfigError(
            "[build].artifact must not be empty".to_string(),
        ));
    }
    Ok(())
}
