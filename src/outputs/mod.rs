//! Output writers.
//!
//! - [`json`]: run reports, one JSON file per run under a date directory
//! - [`store`]: [`store::JsonlStore`], an append-only JSON Lines news store
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── news.jsonl               # every saved NewsRecord, one per line
//! └── 2025-05-06/
//!     ├── cohorts.json
//!     ├── site_sweep.json
//!     └── faculty_search.json
//! ```

pub mod json;
pub mod store;
