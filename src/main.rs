mod classify;
mod color;
mod config;
mod data;
mod export;
mod join;
mod map;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use classify::{classify, compute_quantiles};
use color::ColorScale;
use config::Registry;
use data::filter::filter_object;
use data::loader::load_geometry;
use data::model::Record;
use data::region::RegionLoader;
use join::join_level_evol;
use map::centroid::ilot_centroid;
use map::layer::{attach_records, BoundaryLayer, ChoroplethLayer};

#[derive(Parser)]
#[command(
    name = "footprint-map",
    about = "Building-footprint change statistics and choropleth layers"
)]
struct Cli {
    /// Region registry (TOML). Defaults to the built-in registry.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the geometry and statistics files.
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List configured regions.
    Regions,

    /// Join the level snapshot of YEAR_END with the YEAR_START → YEAR_END evolution.
    Join {
        #[arg(long)]
        region: String,
        #[arg(long = "from")]
        year_start: i64,
        #[arg(long = "to")]
        year_end: i64,
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Comma-separated fields to keep, in output order.
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,
        /// Output file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the quantile breakpoints of an indicator over a region's îlots.
    Quantiles {
        #[arg(long)]
        region: String,
        #[arg(long)]
        indicator: String,
        /// Comma-separated probabilities; defaults to the registry's.
        #[arg(long, value_delimiter = ',')]
        probs: Option<Vec<f64>>,
        /// Also print the bucket color of this value.
        #[arg(long)]
        value: Option<f64>,
    },

    /// Write the choropleth layer, its legend and the îlot outlines.
    Map {
        #[arg(long)]
        region: String,
        #[arg(long)]
        indicator: String,
        /// Attach the joined statistics of this period to the îlots first.
        #[arg(long = "from", requires = "year_end")]
        year_start: Option<i64>,
        #[arg(long = "to", requires = "year_start")]
        year_end: Option<i64>,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        /// NUTS cluster boundaries (GeoJSON) to write as an outline layer.
        #[arg(long)]
        clusters: Option<PathBuf>,
    },

    /// Print the `[lat, lon]` center of an îlot.
    Centroid {
        #[arg(long)]
        region: String,
        #[arg(long)]
        depcom: String,
        #[arg(long)]
        code: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let registry = match &cli.config {
        Some(path) => Registry::from_path(path)?,
        None => Registry::embedded()?,
    };
    let loader = RegionLoader::new(&registry, &cli.data_dir);

    match cli.command {
        Command::Regions => list_regions(&registry),
        Command::Join {
            region,
            year_start,
            year_end,
            format,
            columns,
            output,
        } => {
            let period = (year_start, year_end);
            run_join(&loader, &region, period, format, columns, output.as_deref())
        }
        Command::Quantiles {
            region,
            indicator,
            probs,
            value,
        } => run_quantiles(&loader, &region, &indicator, probs, value),
        Command::Map {
            region,
            indicator,
            year_start,
            year_end,
            output_dir,
            clusters,
        } => {
            let period = year_start.zip(year_end);
            run_map(&loader, &region, &indicator, period, &output_dir)?;
            match clusters {
                Some(path) => write_clusters(&region, &path, &output_dir),
                None => Ok(()),
            }
        }
        Command::Centroid {
            region,
            depcom,
            code,
        } => run_centroid(&loader, &region, &depcom, &code),
    }
}

fn list_regions(registry: &Registry) -> Result<()> {
    let mut out = io::stdout().lock();
    for (id, cfg) in registry.regions() {
        let years: Vec<String> = cfg.available_years.iter().map(i64::to_string).collect();
        let center = cfg
            .center
            .map(|[lat, lon]| format!("{lat}, {lon}"))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{id:<14} {:<14} {:<22} {}",
            cfg.name,
            center,
            years.join(", ")
        )?;
    }
    writeln!(out)?;
    for ind in registry.indicators() {
        let scale = registry.scale_for(ind).map_or("-", |s| s.name());
        writeln!(
            out,
            "{:<32} {} ({}) [{scale}]",
            ind.indicator, ind.label, ind.unit
        )?;
    }
    Ok(())
}

fn output_writer(output: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

/// Level and evolution rows of `region` joined for one period.
fn joined_records(
    loader: &RegionLoader<'_>,
    region: &str,
    year_start: i64,
    year_end: i64,
) -> Result<Vec<Record>> {
    let level = loader
        .level(region)
        .ok_or_else(|| anyhow!("no level data for {region}"))?;
    // Missing evolution data is the "not computed yet" case, not an error.
    let evol = loader.evol(region).unwrap_or_default();
    if evol.is_empty() {
        log::info!("{region}: no evolution rows, level measures only");
    }

    let available = level.years_in("year");
    if !available.contains(&year_end) {
        log::warn!("{region}: no level rows for {year_end} (years present: {available:?})");
    }
    Ok(join_level_evol(&level, &evol, year_start, year_end))
}

fn run_join(
    loader: &RegionLoader<'_>,
    region: &str,
    (year_start, year_end): (i64, i64),
    format: Format,
    columns: Option<Vec<String>>,
    output: Option<&Path>,
) -> Result<()> {
    let mut records = joined_records(loader, region, year_start, year_end)?;
    log::info!("{region}: {} joined records", records.len());

    if let Some(columns) = columns {
        let unknown: Vec<&str> = columns
            .iter()
            .map(String::as_str)
            .filter(|c| !records.iter().any(|rec| rec.contains_key(c)))
            .collect();
        if !unknown.is_empty() {
            log::warn!("{region}: no joined field named {unknown:?}");
        }
        records = records
            .iter()
            .map(|rec| filter_object(rec, columns.as_slice()))
            .collect();
        if !records.is_empty() && records.iter().all(Record::is_empty) {
            bail!("none of the requested columns exist for {region}");
        }
    }

    let out = output_writer(output)?;
    match format {
        Format::Csv => export::write_csv(&records, out),
        Format::Json => export::write_json(&records, out),
    }
}

fn run_quantiles(
    loader: &RegionLoader<'_>,
    region: &str,
    indicator: &str,
    probs: Option<Vec<f64>>,
    value: Option<f64>,
) -> Result<()> {
    let geometry = loader
        .geometry(region)
        .ok_or_else(|| anyhow!("no geometry for {region}"))?;
    let probs = probs.unwrap_or_else(|| loader.registry().quantile_probs().to_vec());

    let values: Vec<f64> = geometry
        .features
        .iter()
        .filter_map(|f| map::style::indicator_value(f, indicator))
        .collect();
    let breakpoints = compute_quantiles(&values, &probs)?;

    let mut out = io::stdout().lock();
    for (q, v) in probs.iter().zip(breakpoints.values()) {
        writeln!(out, "{q:>5}\t{v}")?;
    }

    if let Some(value) = value {
        let registry = loader.registry();
        let buckets = breakpoints.bucket_count();
        // Custom probabilities rarely fit the configured palette.
        let scale = registry
            .indicator(indicator)
            .and_then(|ind| registry.scale_for(ind))
            .filter(|s| s.len() == buckets || s.len() == buckets + 1)
            .cloned()
            .unwrap_or_else(|| ColorScale::ramp(buckets));
        let color = classify(Some(value), &breakpoints, &scale)?;
        writeln!(out, "{value}\t{color}")?;
    }
    Ok(())
}

fn run_map(
    loader: &RegionLoader<'_>,
    region: &str,
    indicator: &str,
    period: Option<(i64, i64)>,
    output_dir: &Path,
) -> Result<()> {
    let registry = loader.registry();
    let indicator = registry
        .indicator(indicator)
        .ok_or_else(|| anyhow!("unknown indicator {indicator}"))?;
    let scale = registry
        .scale_for(indicator)
        .ok_or_else(|| anyhow!("no color scale for {}", indicator.indicator))?;

    let mut geometry = loader
        .geometry(region)
        .ok_or_else(|| anyhow!("no geometry for {region}"))?;

    if let Some((year_start, year_end)) = period {
        let records = joined_records(loader, region, year_start, year_end)?;
        let matched = attach_records(&mut geometry, &records);
        log::info!("{region}: statistics attached to {matched} îlots");
    }

    let layer = ChoroplethLayer::build(&geometry, indicator, registry.quantile_probs(), scale)
        .with_context(|| format!("classifying {} for {region}", indicator.indicator))?;
    let outlines = BoundaryLayer::ilots(&geometry);

    if !output_dir.is_dir() {
        bail!("{} is not a directory", output_dir.display());
    }
    let stem = format!("{region}_{}", indicator.indicator);
    write_file(
        &output_dir.join(format!("{stem}.geojson")),
        &serde_json::to_string(&layer.features)?,
    )?;
    write_file(
        &output_dir.join(format!("{stem}_legend.html")),
        &layer.legend_html(),
    )?;
    write_file(
        &output_dir.join(format!("{region}_ilots.geojson")),
        &serde_json::to_string(&outlines)?,
    )?;
    Ok(())
}

fn write_clusters(region: &str, path: &Path, output_dir: &Path) -> Result<()> {
    let clusters = load_geometry(path)?;
    let outlines = BoundaryLayer::clusters(&clusters);
    write_file(
        &output_dir.join(format!("{region}_clusters.geojson")),
        &serde_json::to_string(&outlines)?,
    )
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

fn run_centroid(loader: &RegionLoader<'_>, region: &str, depcom: &str, code: &str) -> Result<()> {
    let geometry = loader
        .geometry(region)
        .ok_or_else(|| anyhow!("no geometry for {region}"))?;
    let [lat, lon] = ilot_centroid(&geometry, depcom, code)
        .ok_or_else(|| anyhow!("îlot {depcom}/{code} not found in {region}"))?;
    println!("{lat}, {lon}");
    Ok(())
}
