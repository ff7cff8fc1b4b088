//! Food Item model
//!
//! Catalog reference data: nutrients per serving, looked up by diary entries.

use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::error::CoreError;
use super::Nutrition;

/// Food category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodCategory {
    Protein,
    Carb,
    Fat,
    Vegetable,
    Fruit,
    Dairy,
    Other,
}

impl FoodCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodCategory::Protein => "protein",
            FoodCategory::Carb => "carb",
            FoodCategory::Fat => "fat",
            FoodCategory::Vegetable => "vegetable",
            FoodCategory::Fruit => "fruit",
            FoodCategory::Dairy => "dairy",
            FoodCategory::Other => "other",
        }
    }
}

impl FromStr for FoodCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "protein" => Ok(FoodCategory::Protein),
            "carb" => Ok(FoodCategory::Carb),
            "fat" => Ok(FoodCategory::Fat),
            "vegetable" => Ok(FoodCategory::Vegetable),
            "fruit" => Ok(FoodCategory::Fruit),
            "dairy" => Ok(FoodCategory::Dairy),
            "other" => Ok(FoodCategory::Other),
            other => Err(CoreError::validation(format!(
                "Unknown food category '{}' (expected protein, carb, fat, vegetable, fruit, dairy or other)",
                other
            ))),
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A food item with per-serving nutrition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: i64,
    pub name: String,
    pub serving_size: f64,
    pub serving_unit: String,
    pub category: FoodCategory,
    pub nutrition: Nutrition,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new food item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodItemCreate {
    pub name: String,
    pub serving_size: f64,
    pub serving_unit: String,
    pub category: FoodCategory,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

/// Data for updating a food item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodItemUpdate {
    pub name: Option<String>,
    pub serving_size: Option<f64>,
    pub serving_unit: Option<String>,
    pub category: Option<FoodCategory>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
}

impl FoodItem {
    /// Create a FoodItem from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let category: String = row.get("category")?;
        let category = category.parse::<FoodCategory>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            serving_size: row.get("serving_size")?,
            serving_unit: row.get("serving_unit")?,
            category,
            nutrition: Nutrition {
                calories: row.get("calories")?,
                protein: row.get("protein")?,
                carbs: row.get("carbs")?,
                fats: row.get("fats")?,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Nutrition for `quantity` expressed in this item's serving unit
    pub fn portion(&self, quantity: f64) -> Nutrition {
        self.nutrition.scale(quantity / self.serving_size)
    }

    /// Insert a new food item into the database
    pub fn create(conn: &Connection, data: &FoodItemCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO food_items (
                name, name_key, serving_size, serving_unit, category,
                calories, protein, carbs, fats
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                data.name,
                name_key(&data.name),
                data.serving_size,
                data.serving_unit,
                data.category.as_str(),
                data.calories,
                data.protein,
                data.carbs,
                data.fats,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get a food item by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM food_items WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a food item by name (case-insensitive exact match, Unicode aware)
    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM food_items WHERE name_key = ?1")?;

        let result = stmt.query_row([name_key(name)], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Case-insensitive substring search on name, unbounded
    pub fn search(conn: &Connection, query: &str) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM food_items
            WHERE ?1 = '' OR instr(name_key, ?1) > 0
            ORDER BY name ASC
            "#,
        )?;

        let items = stmt
            .query_map([name_key(query)], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// List every food item, optionally restricted to one category
    pub fn list(conn: &Connection, category: Option<FoodCategory>) -> DbResult<Vec<Self>> {
        let items = match category {
            Some(category) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM food_items WHERE category = ?1 ORDER BY name ASC",
                )?;
                let rows = stmt.query_map([category.as_str()], Self::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare("SELECT * FROM food_items ORDER BY name ASC")?;
                let rows = stmt.query_map([], Self::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(items)
    }

    /// Update a food item
    pub fn update(conn: &Connection, id: i64, data: &FoodItemUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($field:ident, $col:expr) => {
                if let Some(ref val) = data.$field {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(val.clone()));
                }
            };
        }

        add_update!(name, "name");
        if let Some(ref name) = data.name {
            updates.push(format!("name_key = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name_key(name)));
        }
        add_update!(serving_size, "serving_size");
        add_update!(serving_unit, "serving_unit");
        add_update!(calories, "calories");
        add_update!(protein, "protein");
        add_update!(carbs, "carbs");
        add_update!(fats, "fats");

        if let Some(category) = data.category {
            updates.push(format!("category = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(category.as_str()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE food_items SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Number of diary entries, across all users and days, that reference this item
    pub fn get_diary_usage_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM diary_entries WHERE food_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a food item. Returns Ok(false) if not found
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM food_items WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

/// Lookup key for names: full Unicode lowercase, so "CRÈME" and "Crème" collide
fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
