//! Diary aggregation
//!
//! The engine plus the two collaborators it consults: the food catalog for pricing
//! entries and the diary store for persistence.

pub mod catalog;
pub mod engine;
pub mod locks;
pub mod store;

pub use catalog::FoodCatalog;
pub use engine::{ConsistencyReport, DiaryEngine};
pub use locks::DiaryLocks;
pub use store::DiaryStore;

/// The engine wired to SQLite for both collaborators
pub type SqliteDiaryEngine = DiaryEngine<crate::db::Database, crate::db::Database>;
