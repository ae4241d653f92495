//! logsearch - per-user search keyword rankings from log snapshots.
//!
//! logsearch reads parquet snapshots of a streaming service's search log,
//! ranks each user's keywords overall and per month, writes the rankings as
//! CSV tables, and classifies the most popular keywords into content
//! categories through an OpenAI-compatible text-generation service.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use logsearch::{OutputDir, rank, sink, source};
//!
//! let output_dir = OutputDir::resolve(None).unwrap();
//! let table = source::read_events(Path::new("logs"), "*.parquet").unwrap();
//!
//! let top3 = rank::top_k_per_user(&table.events, 3);
//! sink::write_ranked(&output_dir.top_keywords_dir(), &top3).unwrap();
//!
//! let pivot =
//!     rank::top_keyword_by_month(&table.events, &rank::MonthSelection::Observed);
//! for row in &pivot.rows {
//!     println!("{}: {:?}", row.user_id, row.top_keywords);
//! }
//! ```

pub mod category;
pub mod classify;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod output_dir;
pub mod rank;
pub mod retry;
pub mod sink;
pub mod source;
pub mod walker;

pub use category::Category;
pub use classify::Classifier;
pub use error::{Error, Result};
pub use event::SearchEvent;
pub use output_dir::OutputDir;
pub use rank::{MonthSelection, MonthlyPivot, RankedKeyword};
