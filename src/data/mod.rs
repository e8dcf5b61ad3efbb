/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv            *_geom.json
///        │                                 │
///        ▼                                 ▼
///   ┌──────────┐                   ┌───────────────┐
///   │  loader   │  file → Table    │ loader (geo)   │ → FeatureCollection
///   └──────────┘                   └───────────────┘
///        │                                 ▲
///        ▼                                 │
///   ┌──────────┐                   ┌───────────────┐
///   │  Table    │  Vec<Record>     │ region         │  registry + data dir
///   └──────────┘                   └───────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  period filters, key projection
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod region;
