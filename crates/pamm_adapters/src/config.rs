//! Configuration stores
//!
//! File format (all numbers are decimal strings):
//!
//! ```toml
//! [params]
//! alpha_bar = "1.0"
//! xu_bar    = "0.3"
//! theta_bar = "0.6"
//!
//! [desk]
//! outflow_memory   = "0.999993123563518195"
//! region_tolerance = "0"
//! ```
//!
//! `[desk]` is optional: no outflow decay and a zero region tolerance.

use std::fs;
use std::path::{Path, PathBuf};

use pamm_model::{Fp, Params};
use serde::Deserialize;

use crate::error::{AdapterError, Result};

/// Parameters and desk settings for a PAMM deployment.
pub trait ConfigStore {
    fn pamm_params(&self) -> Result<Params>;

    /// Per-block factor the redemption level decays by, in `(0, 1]`
    fn outflow_memory(&self) -> Result<Fp>;

    fn region_tolerance(&self) -> Result<Fp>;
}

/// Default parameters `(1.0, 0.3, 0.6)`
pub fn default_params() -> Result<Params> {
    Ok(Params::new(
        Fp::one(),
        Fp::from_raw(300_000_000_000_000_000),
        Fp::from_raw(600_000_000_000_000_000),
    )?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticConfig {
    params: Params,
    outflow_memory: Fp,
    region_tolerance: Fp,
}

impl StaticConfig {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            outflow_memory: Fp::one(),
            region_tolerance: Fp::zero(),
        }
    }

    pub fn with_outflow_memory(mut self, memory: Fp) -> Result<Self> {
        check_outflow_memory(memory)?;
        self.outflow_memory = memory;
        Ok(self)
    }

    pub fn with_region_tolerance(mut self, tolerance: Fp) -> Result<Self> {
        if tolerance.is_negative() {
            return Err(AdapterError::Config(format!(
                "region_tolerance must be non-negative, got {tolerance}"
            )));
        }
        self.region_tolerance = tolerance;
        Ok(self)
    }
}

impl ConfigStore for StaticConfig {
    fn pamm_params(&self) -> Result<Params> {
        Ok(self.params)
    }

    fn outflow_memory(&self) -> Result<Fp> {
        Ok(self.outflow_memory)
    }

    fn region_tolerance(&self) -> Result<Fp> {
        Ok(self.region_tolerance)
    }
}

pub(crate) fn check_outflow_memory(memory: Fp) -> Result<()> {
    if !memory.is_positive() || memory > Fp::one() {
        return Err(AdapterError::Config(format!(
            "outflow_memory must lie in (0, 1], got {memory}"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    params: ParamsSection,
    #[serde(default)]
    desk: DeskSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParamsSection {
    alpha_bar: Fp,
    xu_bar: Fp,
    theta_bar: Fp,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeskSection {
    #[serde(default = "Fp::one")]
    outflow_memory: Fp,
    #[serde(default)]
    region_tolerance: Fp,
}

impl Default for DeskSection {
    fn default() -> Self {
        Self {
            outflow_memory: Fp::one(),
            region_tolerance: Fp::zero(),
        }
    }
}

/// Configuration loaded and validated from a TOML file.
#[derive(Debug, Clone)]
pub struct FileConfig {
    path: PathBuf,
    inner: StaticConfig,
}

impl FileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| AdapterError::io(path, e))?;
        Self::parse(path, &text)
    }

    /// Parse `text` as if read from `path`.
    pub fn parse(path: impl AsRef<Path>, text: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file: ConfigFile = toml::from_str(text).map_err(|source| AdapterError::Toml {
            path: path.clone(),
            source,
        })?;
        let params = Params::new(
            file.params.alpha_bar,
            file.params.xu_bar,
            file.params.theta_bar,
        )?;
        let inner = StaticConfig::new(params)
            .with_outflow_memory(file.desk.outflow_memory)?
            .with_region_tolerance(file.desk.region_tolerance)?;
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfig {
    fn pamm_params(&self) -> Result<Params> {
        self.inner.pamm_params()
    }

    fn outflow_memory(&self) -> Result<Fp> {
        self.inner.outflow_memory()
    }

    fn region_tolerance(&self) -> Result<Fp> {
        self.inner.region_tolerance()
    }
}
