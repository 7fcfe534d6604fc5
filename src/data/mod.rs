/// Data layer: raw store model, interpolation functions, loading, and filtering.
///
/// Architecture:
/// ```text
///  .parquet / .csv / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse files → RawStore
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────────────────┐
///   │ RawStore                      │  tables, labels, InterpolationBank
///   └──────────────────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  class subsets, missing-target rows
///   └──────────┘
/// ```

pub mod filter;
pub mod interp;
pub mod loader;
pub mod model;
