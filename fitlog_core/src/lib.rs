#![forbid(unsafe_code)]

//! Core domain model and business logic for fitlog.
//!
//! This crate provides:
//! - Domain types (food entries, workouts, personal records, logs)
//! - The table store boundary and its in-memory and JSONL backends
//! - Nutrition totals, PR reduction and workout decomposition
//! - Onboarding, reminders, the dashboard view and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod store;
pub mod jsonl;
pub mod nutrition;
pub mod records;
pub mod workout;
pub mod profile;
pub mod logs;
pub mod reminders;
pub mod dashboard;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::{MemoryStore, Order, Query, Record, TableStore};
pub use jsonl::JsonlStore;
pub use nutrition::{summarize, MacroSummary};
pub use records::best_per_exercise;
pub use workout::{decompose, log_workout, WorkoutSubmission};
pub use profile::Route;
pub use dashboard::{load_dashboard, Dashboard};
pub use export::export_csv;
