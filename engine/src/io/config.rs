//! Engine configuration stored as TOML.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::scheduler::{DEFAULT_PENDING_TTL, SchedulerConfig};

/// Engine configuration (TOML).
///
/// Missing fields default to the values the think loop was tuned for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerSection,
    pub think: ThinkSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerSection {
    /// Pending actions older than this many seconds are dropped.
    pub pending_ttl_secs: f64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            pending_ttl_secs: DEFAULT_PENDING_TTL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThinkSection {
    /// Delay between think ticks.
    pub interval_secs: f64,

    /// Ticks run by `engine run` when `--ticks` is not given.
    pub max_ticks: u64,
}

impl Default for ThinkSection {
    fn default() -> Self {
        Self {
            interval_secs: 0.1,
            max_ticks: 100,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        let ttl = self.scheduler.pending_ttl_secs;
        if !ttl.is_finite() || ttl <= 0.0 {
            return Err(anyhow!("scheduler.pending_ttl_secs must be > 0"));
        }
        let interval = self.think.interval_secs;
        if !interval.is_finite() || interval < 0.0 {
            return Err(anyhow!("think.interval_secs must be >= 0"));
        }
        self.think_interval()?;
        if self.think.max_ticks == 0 {
            return Err(anyhow!("think.max_ticks must be > 0"));
        }
        Ok(())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            pending_ttl: self.scheduler.pending_ttl_secs,
        }
    }

    pub fn think_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.think.interval_secs)
            .map_err(|err| anyhow!("think.interval_secs out of range: {err}"))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
