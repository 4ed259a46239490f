//! Configuration loading for the CLI

use anyhow::{Context, Result};
use pamm_adapters::{default_params, ConfigStore, FileConfig, StaticConfig};
use pamm_model::{Fp, Pamm, Params};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub struct CliConfig {
    pub params: Params,
    pub outflow_memory: Fp,
    pub region_tolerance: Fp,
    /// Config file the settings came from, `None` for the defaults
    pub path: Option<PathBuf>,
}

impl CliConfig {
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let Some(raw) = config_path else {
            let store = StaticConfig::new(default_params()?);
            return Self::from_store(&store, None);
        };

        let expanded = shellexpand::tilde(&raw.to_string_lossy()).into_owned();
        let path = PathBuf::from(expanded);
        let store = FileConfig::load(&path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?;
        Self::from_store(&store, Some(path))
    }

    fn from_store(store: &impl ConfigStore, path: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            params: store.pamm_params()?,
            outflow_memory: store.outflow_memory()?,
            region_tolerance: store.region_tolerance()?,
            path,
        })
    }

    /// A PAMM with these settings at state `(x, y, b)`
    pub fn pamm_at(&self, x: Fp, b: Fp, y: Fp) -> Result<Pamm> {
        let mut pamm = Pamm::new(self.params)?.with_region_tolerance(self.region_tolerance)?;
        pamm.update_state(x, b, y)?;
        Ok(pamm)
    }

    /// The settings in config file form
    pub fn to_toml(&self) -> Result<String> {
        let file = ConfigFile {
            params: ParamsSection {
                alpha_bar: self.params.alpha_bar(),
                xu_bar: self.params.xu_bar(),
                theta_bar: self.params.theta_bar(),
            },
            desk: DeskSection {
                outflow_memory: self.outflow_memory,
                region_tolerance: self.region_tolerance,
            },
        };
        toml::to_string(&file).context("Failed to render config as TOML")
    }
}

#[derive(Serialize)]
struct ConfigFile {
    params: ParamsSection,
    desk: DeskSection,
}

#[derive(Serialize)]
struct ParamsSection {
    alpha_bar: Fp,
    xu_bar: Fp,
    theta_bar: Fp,
}

#[derive(Serialize)]
struct DeskSection {
    outflow_memory: Fp,
    region_tolerance: Fp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fp(s: &str) -> Fp {
        s.parse().unwrap()
    }

    #[test]
    fn test_defaults_without_config() {
        let config = CliConfig::new(None).unwrap();
        assert_eq!(config.params.alpha_bar(), fp("1"));
        assert_eq!(config.params.xu_bar(), fp("0.3"));
        assert_eq!(config.params.theta_bar(), fp("0.6"));
        assert_eq!(config.outflow_memory, Fp::one());
        assert!(config.region_tolerance.is_zero());
        assert!(config.path.is_none());
    }

    #[test]
    fn test_toml_output_loads_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[params]\nalpha_bar = \"0.5\"\nxu_bar = \"0.2\"\ntheta_bar = \"0.7\"\n\n[desk]\noutflow_memory = \"0.99\"\n"
        )
        .unwrap();
        let config = CliConfig::new(Some(file.path())).unwrap();
        assert_eq!(config.params.alpha_bar(), fp("0.5"));
        assert_eq!(config.outflow_memory, fp("0.99"));

        let rendered = config.to_toml().unwrap();
        let reloaded = FileConfig::parse("rendered.toml", &rendered).unwrap();
        assert_eq!(reloaded.pamm_params().unwrap(), config.params);
        assert_eq!(reloaded.outflow_memory().unwrap(), fp("0.99"));
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = CliConfig::new(Some(path.as_path())).err().unwrap();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_pamm_at_validates_state() {
        let config = CliConfig::new(None).unwrap();
        let pamm = config.pamm_at(fp("0.1"), fp("0.8"), fp("0.9")).unwrap();
        assert_eq!(pamm.state().b, fp("0.8"));
        assert!(config.pamm_at(fp("-0.1"), fp("0.8"), fp("0.9")).is_err());
    }
}
