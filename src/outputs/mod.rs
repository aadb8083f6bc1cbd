//! Report generation for chart series.
//!
//! # Submodules
//!
//! - [`json`]: writes every series to one `charts.json` bundle
//! - [`markdown`]: renders each series as a Markdown table with text bars,
//!   plus an `index.md` linking them
//!
//! # Output Structure
//!
//! ```text
//! reports_dir/
//! ├── charts.json
//! ├── index.md
//! ├── issues_per_year.md
//! ├── issues_per_state.md
//! ├── language_frequency.md
//! └── pages_per_issue.md
//! ```
//!
//! Series without data are left out of the Markdown output.

pub mod json;
pub mod markdown;
