use serde::Deserialize;

use crate::error::Result;
use crate::storage::disk::DiskType;

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    /// Which disk manager backs the buffer pool.
    pub disk: DiskType,
    /// Database file path, used by the file disk manager.
    pub path: String,
    /// Number of frames in the buffer pool.
    pub pool_size: usize,
    /// History depth of the LRU-K replacer.
    pub replacer_k: usize,
}

impl Config {
    pub fn new(file: &str) -> Result<Config> {
        let mut cfg = config::Config::builder()
            .set_default("log_level", "debug")?
            .set_default("disk", "memory")?
            .set_default("path", "data/pagebox.db")?
            .set_default("pool_size", 64)?
            .set_default("replacer_k", 2)?;
        if !file.is_empty() {
            cfg = cfg.add_source(config::File::with_name(file))
        }
        cfg = cfg.add_source(config::Environment::with_prefix("PAGEBOX"));
        Ok(cfg.build()?.try_deserialize()?)
    }
}
