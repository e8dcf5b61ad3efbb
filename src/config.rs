//! Region registry: regions, indicators and color scales from TOML.
//!
//! The default registry is baked into the binary at compile time via
//! [`include_str!`]; `--config` swaps in another file with the same layout.
//! The registry is built once at startup and handed to the loaders by
//! reference.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::color::ColorScale;

/// Registry shipped with the binary.
const EMBEDDED_REGISTRY: &str = include_str!("../config/regions.toml");

/// Errors that can occur while building the registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The registry file could not be read.
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML syntax or schema error.
    #[error("TOML error: {0}")]
    Parse(#[from] toml::de::Error),

    /// An indicator refers to a color scale that is not defined.
    #[error("indicator {indicator} uses unknown color scale {scale}")]
    UnknownScale { indicator: String, scale: String },

    /// A color scale token is not a hex color.
    #[error("color scale {scale}: {source}")]
    InvalidColor {
        scale: String,
        source: palette::rgb::FromHexError,
    },

    /// A color scale lists no color at all.
    #[error("color scale {0} is empty")]
    EmptyScale(String),
}

/// One overseas department (or collectivity) served by the dashboard.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RegionConfig {
    /// Display name, e.g. `GUADELOUPE`.
    pub name: String,
    pub available_years: Vec<i64>,
    /// Îlot geometry (GeoJSON), relative to the data directory.
    pub geom_file: Option<String>,
    /// Per-year building snapshot extract.
    pub level_file: Option<String>,
    /// Between-years evolution extract.
    pub evol_file: Option<String>,
    /// Map center as `[lat, lon]`.
    pub center: Option<[f64; 2]>,
}

/// A mappable statistic and how to present it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Indicator {
    /// Property name in the geometry / column name in the extracts.
    pub indicator: String,
    pub label: String,
    pub color_scale: String,
    pub unit: String,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    quantile_probs: Vec<f64>,
    color_scales: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    indicators: Vec<Indicator>,
    #[serde(default)]
    regions: BTreeMap<String, RegionConfig>,
}

/// Validated registry of regions, indicators and color scales.
#[derive(Debug, Clone)]
pub struct Registry {
    quantile_probs: Vec<f64>,
    color_scales: BTreeMap<String, ColorScale>,
    indicators: Vec<Indicator>,
    regions: BTreeMap<String, RegionConfig>,
}

impl Registry {
    /// The registry compiled into the binary.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml(EMBEDDED_REGISTRY)
    }

    /// Read and validate a registry file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = toml::from_str(text)?;

        let mut color_scales = BTreeMap::new();
        for (name, tokens) in &file.color_scales {
            let scale = ColorScale::from_hex(name, tokens.as_slice()).map_err(|source| {
                ConfigError::InvalidColor {
                    scale: name.clone(),
                    source,
                }
            })?;
            if scale.is_empty() {
                return Err(ConfigError::EmptyScale(name.clone()));
            }
            color_scales.insert(name.clone(), scale);
        }

        for ind in &file.indicators {
            if !color_scales.contains_key(&ind.color_scale) {
                return Err(ConfigError::UnknownScale {
                    indicator: ind.indicator.clone(),
                    scale: ind.color_scale.clone(),
                });
            }
        }

        log::debug!(
            "Registry: {} regions, {} indicators, {} color scales",
            file.regions.len(),
            file.indicators.len(),
            color_scales.len()
        );

        Ok(Self {
            quantile_probs: file.quantile_probs,
            color_scales,
            indicators: file.indicators,
            regions: file.regions,
        })
    }

    /// Look up a region by id. Unknown ids are logged and yield `None`.
    pub fn region(&self, id: &str) -> Option<&RegionConfig> {
        let region = self.regions.get(id);
        if region.is_none() {
            log::error!("Region {id} does not exist in the configuration.");
        }
        region
    }

    /// All regions, ordered by id.
    pub fn regions(&self) -> impl Iterator<Item = (&str, &RegionConfig)> {
        self.regions.iter().map(|(id, cfg)| (id.as_str(), cfg))
    }

    /// Look up an indicator by column name. Unknown names are logged.
    pub fn indicator(&self, name: &str) -> Option<&Indicator> {
        let indicator = self.indicators.iter().find(|i| i.indicator == name);
        if indicator.is_none() {
            log::error!("Indicator {name} does not exist in the configuration.");
        }
        indicator
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    /// The color scale of `indicator`. Validated at load time.
    pub fn scale_for(&self, indicator: &Indicator) -> Option<&ColorScale> {
        self.color_scales.get(&indicator.color_scale)
    }

    pub fn quantile_probs(&self) -> &[f64] {
        &self.quantile_probs
    }
}
