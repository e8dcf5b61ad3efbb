use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use parquet::arrow::ArrowWriter;

/// Writes a synthetic region: îlot geometry plus level and evolution extracts.
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Region id used to name the files (`<region>_clusters_*`).
    #[arg(long, default_value = "mayotte")]
    region: String,
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,
    /// Reporting years, ascending.
    #[arg(long, value_delimiter = ',', default_value = "2018,2020,2022")]
    years: Vec<i64>,
    /// Îlots per side of the generated grid.
    #[arg(long, default_value_t = 12)]
    grid: usize,
}

const COMMUNES: [&str; 3] = ["97611", "97612", "97617"];
/// South-west corner of the grid (lon, lat).
const ORIGIN: (f64, f64) = (45.10, -12.90);
const CELL_DEG: f64 = 0.004;
/// Îlot area in m², constant across years.
const CLUSTER_AREA: f64 = 160_000.0;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }
}

/// One generated îlot with its built area per year.
struct Ilot {
    code: String,
    depcom: &'static str,
    col: usize,
    row: usize,
    area_by_year: Vec<f64>,
}

fn generate_ilots(args: &Args, rng: &mut SimpleRng) -> Vec<Ilot> {
    let mut ilots = Vec::with_capacity(args.grid * args.grid);
    for row in 0..args.grid {
        for col in 0..args.grid {
            let initial = rng.uniform(0.0, 0.35) * CLUSTER_AREA;
            // Some îlots densify quickly, most barely move, a few lose buildings.
            let yearly_growth = rng.uniform(-0.03, 0.12);
            let first_year = args.years[0];
            let area_by_year = args
                .years
                .iter()
                .map(|&year| {
                    let elapsed = (year - first_year) as i32;
                    let noise = rng.uniform(-0.01, 0.01) * CLUSTER_AREA;
                    (initial * (1.0 + yearly_growth).powi(elapsed) + noise).clamp(0.0, CLUSTER_AREA)
                })
                .collect();
            ilots.push(Ilot {
                code: format!("{:04}", ilots.len() + 1),
                depcom: COMMUNES[(row * COMMUNES.len()) / args.grid],
                col,
                row,
                area_by_year,
            });
        }
    }
    ilots
}

fn write_parquet(path: &Path, columns: Vec<(&str, ArrayRef)>) -> Result<()> {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let batch = RecordBatch::try_new(
        schema.clone(),
        columns.into_iter().map(|(_, array)| array).collect(),
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    log::info!("Wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}

fn write_level(path: &Path, args: &Args, ilots: &[Ilot]) -> Result<()> {
    let mut index = Vec::new();
    let mut code = Vec::new();
    let mut depcom = Vec::new();
    let mut area = Vec::new();
    let mut pct = Vec::new();
    let mut year = Vec::new();

    for (y, &yr) in args.years.iter().enumerate() {
        for ilot in ilots {
            index.push(index.len() as i64);
            code.push(ilot.code.as_str());
            depcom.push(ilot.depcom);
            area.push(ilot.area_by_year[y]);
            pct.push(ilot.area_by_year[y] / CLUSTER_AREA * 100.0);
            year.push(yr);
        }
    }

    write_parquet(
        path,
        vec![
            ("code", Arc::new(StringArray::from(code)) as ArrayRef),
            ("depcom_2018", Arc::new(StringArray::from(depcom))),
            ("area_building", Arc::new(Float64Array::from(area))),
            ("pct_building", Arc::new(Float64Array::from(pct))),
            ("year", Arc::new(Int64Array::from(year))),
            ("__index_level_0__", Arc::new(Int64Array::from(index))),
        ],
    )
}

/// Absolute and relative change of one îlot between two year indices.
fn change(ilot: &Ilot, start: usize, end: usize) -> (f64, Option<f64>) {
    let before = ilot.area_by_year[start];
    let absolute = ilot.area_by_year[end] - before;
    let relative = (before > 0.0).then(|| absolute / before * 100.0);
    (absolute, relative)
}

fn write_evol(path: &Path, args: &Args, ilots: &[Ilot]) -> Result<()> {
    let mut code = Vec::new();
    let mut depcom = Vec::new();
    let mut absolute = Vec::new();
    let mut relative = Vec::new();
    let mut year_start = Vec::new();
    let mut year_end = Vec::new();

    for start in 0..args.years.len() {
        for end in start + 1..args.years.len() {
            for ilot in ilots {
                let (abs, rel) = change(ilot, start, end);
                code.push(ilot.code.as_str());
                depcom.push(ilot.depcom);
                absolute.push(abs);
                relative.push(rel);
                year_start.push(args.years[start].to_string());
                year_end.push(args.years[end].to_string());
            }
        }
    }

    write_parquet(
        path,
        vec![
            ("code", Arc::new(StringArray::from(code)) as ArrayRef),
            ("depcom_2018", Arc::new(StringArray::from(depcom))),
            ("area_building_change_absolute", Arc::new(Float64Array::from(absolute))),
            ("area_building_change_relative", Arc::new(Float64Array::from(relative))),
            ("year_start", Arc::new(StringArray::from(year_start))),
            ("year_end", Arc::new(StringArray::from(year_end))),
        ],
    )
}

/// Square îlots carrying the first→last year change as properties.
fn write_geometry(path: &Path, args: &Args, ilots: &[Ilot]) -> Result<()> {
    let last = args.years.len() - 1;
    let features = ilots
        .iter()
        .map(|ilot| {
            let (lon, lat) = (
                ORIGIN.0 + ilot.col as f64 * CELL_DEG,
                ORIGIN.1 + ilot.row as f64 * CELL_DEG,
            );
            let ring = vec![
                vec![lon, lat],
                vec![lon + CELL_DEG, lat],
                vec![lon + CELL_DEG, lat + CELL_DEG],
                vec![lon, lat + CELL_DEG],
                vec![lon, lat],
            ];
            let (abs, rel) = change(ilot, 0, last);

            let mut properties = JsonObject::new();
            properties.insert("code".into(), JsonValue::from(ilot.code.clone()));
            properties.insert("depcom_2018".into(), JsonValue::from(ilot.depcom));
            properties.insert("area_building_change_absolute".into(), JsonValue::from(abs));
            properties.insert("area_building_change_relative".into(), JsonValue::from(rel));

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::Polygon(vec![ring]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    let text = serde_json::to_string(&collection).context("serializing GeoJSON")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote {} îlots to {}", ilots.len(), path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.years.len() < 2 || args.years.windows(2).any(|w| w[0] >= w[1]) {
        bail!("--years needs at least two ascending years");
    }
    if args.grid == 0 {
        bail!("--grid must be positive");
    }
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let ilots = generate_ilots(&args, &mut rng);

    let file = |kind: &str| args.output_dir.join(format!("{}_clusters_{kind}", args.region));
    write_geometry(&file("geom.json"), &args, &ilots)?;
    write_level(&file("level.parquet"), &args, &ilots)?;
    write_evol(&file("evol.parquet"), &args, &ilots)?;

    println!(
        "Wrote {} îlots over {} years for {} to {}",
        ilots.len(),
        args.years.len(),
        args.region,
        args.output_dir.display()
    );
    Ok(())
}
