//! Pipeline stages, in the order `run` executes them.
//!
//! | Stage | Module | Input | Output |
//! |-------|--------|-------|--------|
//! | Fetch | [`fetch`] | LOC JSON API | `<raw_dir>/<collection>_raw.json` |
//! | Flatten | [`flatten`] | raw JSON array | `<processed_dir>/<collection>.csv` |
//! | Clean | [`clean`] | flattened CSV | cleaned and rejected CSVs |
//! | Schema | [`schema`] | | empty SQLite tables |
//! | Load | [`load`] | cleaned CSV | populated tables |
//! | Charts | [`charts`] | populated tables | reports under `reports_dir` |
//!
//! Each stage reads the previous stage's file, so any stage can be rerun on
//! its own from the command line.

pub mod charts;
pub mod clean;
pub mod fetch;
pub mod flatten;
pub mod load;
pub mod schema;
