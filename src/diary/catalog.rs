//! Food catalog collaborator
//!
//! The engine only ever reads the catalog: lookup by id to price an entry, and
//! name search for callers picking a food.

use crate::db::Database;
use crate::error::CoreResult;
use crate::models::FoodItem;

pub trait FoodCatalog: Send + Sync {
    fn find_by_id(&self, id: i64) -> CoreResult<Option<FoodItem>>;

    /// Case-insensitive substring match on name
    fn search(&self, query: &str) -> CoreResult<Vec<FoodItem>>;
}

impl FoodCatalog for Database {
    fn find_by_id(&self, id: i64) -> CoreResult<Option<FoodItem>> {
        Ok(self.with_conn(|conn| FoodItem::get_by_id(conn, id))?)
    }

    fn search(&self, query: &str) -> CoreResult<Vec<FoodItem>> {
        Ok(self.with_conn(|conn| FoodItem::search(conn, query))?)
    }
}
