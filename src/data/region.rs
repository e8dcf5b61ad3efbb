//! Per-region loading on top of the registry.
//!
//! Every lookup degrades to `None` instead of failing: an unknown region is
//! reported by the registry, a missing file binding means the region simply
//! has no such layer, and a load failure is logged so the remaining regions
//! can still be rendered.

use std::path::{Path, PathBuf};

use geojson::FeatureCollection;

use super::loader::{load_file, load_geometry};
use super::model::Table;
use crate::config::{RegionConfig, Registry};

/// Loads the attachments of a region from a data directory.
pub struct RegionLoader<'a> {
    registry: &'a Registry,
    data_dir: PathBuf,
}

impl<'a> RegionLoader<'a> {
    pub fn new(registry: &'a Registry, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            data_dir: data_dir.into(),
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Îlot geometry of `region`.
    pub fn geometry(&self, region: &str) -> Option<FeatureCollection> {
        self.load(region, "geometry", |cfg| cfg.geom_file.as_deref(), load_geometry)
    }

    /// Per-year building snapshot of `region`.
    pub fn level(&self, region: &str) -> Option<Table> {
        self.load(region, "level", |cfg| cfg.level_file.as_deref(), load_file)
    }

    /// Between-years evolution extract of `region`.
    pub fn evol(&self, region: &str) -> Option<Table> {
        self.load(region, "evolution", |cfg| cfg.evol_file.as_deref(), load_file)
    }

    fn load<T>(
        &self,
        region: &str,
        kind: &str,
        binding: impl Fn(&RegionConfig) -> Option<&str>,
        loader: impl Fn(&Path) -> anyhow::Result<T>,
    ) -> Option<T> {
        let cfg = self.registry.region(region)?;
        let Some(file) = binding(cfg) else {
            log::info!("No {kind} file configured for {region}");
            return None;
        };
        match loader(&self.data_dir.join(file)) {
            Ok(data) => Some(data),
            Err(e) => {
                log::warn!("No {kind} data found for {region}: {e:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r##"
        quantile_probs = [0.0, 1.0]

        [color_scales]
        mono = ["#000000"]

        [regions.island]
        name = "ISLAND"
        available_years = [2020]
        level_file = "island_level.json"
        evol_file = "island_evol_missing.json"
    "##;

    #[test]
    fn loads_bound_files_and_degrades_otherwise() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("island_level.json"),
            r#"[{"code":"0001","depcom_2018":"97101","year":2020}]"#,
        )
        .unwrap();

        let registry = Registry::from_toml(REGISTRY).unwrap();
        let loader = RegionLoader::new(&registry, dir.path());

        let level = loader.level("island").unwrap();
        assert_eq!(level.len(), 1);
        // configured but absent on disk
        assert!(loader.evol("island").is_none());
        // no binding
        assert!(loader.geometry("island").is_none());
        // unknown region
        assert!(loader.level("atlantis").is_none());
    }
}
