//! Food Catalog MCP Tools
//!
//! Tools for managing food items in the database.

use serde::Serialize;

use crate::db::{Database, DbError};
use crate::diary::FoodCatalog;
use crate::error::{CoreError, CoreResult};
use crate::models::{FoodCategory, FoodItem, FoodItemCreate, FoodItemUpdate};

/// Food item as returned to callers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodResponse {
    pub id: i64,
    pub name: String,
    pub serving_size: f64,
    pub serving_unit: String,
    pub category: FoodCategory,
    pub calories_per_serving: f64,
    pub protein_per_serving: f64,
    pub carbs_per_serving: f64,
    pub fats_per_serving: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<FoodItem> for FoodResponse {
    fn from(item: FoodItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            serving_size: item.serving_size,
            serving_unit: item.serving_unit,
            category: item.category,
            calories_per_serving: item.nutrition.calories,
            protein_per_serving: item.nutrition.protein,
            carbs_per_serving: item.nutrition.carbs,
            fats_per_serving: item.nutrition.fats,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Response for get_food
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodDetailResponse {
    #[serde(flatten)]
    pub food: FoodResponse,
    /// Diary entries referencing this food, across all users and days
    pub diary_usage_count: i64,
}

/// Response for list_foods / search_foods
#[derive(Debug, Serialize)]
pub struct FoodListResponse {
    pub items: Vec<FoodResponse>,
    pub total: usize,
}

impl From<Vec<FoodItem>> for FoodListResponse {
    fn from(items: Vec<FoodItem>) -> Self {
        let items: Vec<FoodResponse> = items.into_iter().map(FoodResponse::from).collect();
        let total = items.len();
        Self { items, total }
    }
}

/// Response for update_food
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFoodResponse {
    #[serde(flatten)]
    pub food: FoodResponse,
    /// Logged entries that will be priced with the new values when removed
    pub diary_usage_count: i64,
}

/// Response for delete_food
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFoodResponse {
    pub success: bool,
    pub deleted_id: i64,
}

fn validate_name(name: &str) -> CoreResult<()> {
    if name.trim().is_empty() {
        return Err(CoreError::validation("Food item name cannot be empty"));
    }
    Ok(())
}

fn validate_serving_size(serving_size: f64) -> CoreResult<()> {
    if !serving_size.is_finite() || serving_size <= 0.0 {
        return Err(CoreError::validation("serving_size must be greater than 0"));
    }
    Ok(())
}

fn validate_serving_unit(serving_unit: &str) -> CoreResult<()> {
    if serving_unit.trim().is_empty() {
        return Err(CoreError::validation("serving_unit cannot be empty"));
    }
    Ok(())
}

fn validate_nutrient(field: &str, value: f64) -> CoreResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::validation(format!("{} cannot be negative", field)));
    }
    Ok(())
}

/// Reject a name already used by another item (names are unique ignoring case)
fn ensure_name_free(conn: &rusqlite::Connection, name: &str, except_id: Option<i64>) -> CoreResult<()> {
    if let Some(existing) = FoodItem::get_by_name(conn, name.trim())? {
        if Some(existing.id) != except_id {
            return Err(CoreError::validation(format!(
                "A food item named '{}' already exists (id {})",
                existing.name, existing.id
            )));
        }
    }
    Ok(())
}

/// A concurrent writer can claim the name between `ensure_name_free` and the write;
/// the UNIQUE index on the name key then rejects it and this reports it as a validation error
fn map_name_conflict(e: DbError, name: &str) -> CoreError {
    match e {
        DbError::Sqlite(rusqlite::Error::SqliteFailure(ref failure, _))
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            CoreError::validation(format!("A food item named '{}' already exists", name))
        }
        other => CoreError::Database(other),
    }
}

/// Add a new food item to the catalog
pub fn add_food(db: &Database, mut data: FoodItemCreate) -> CoreResult<FoodResponse> {
    validate_name(&data.name)?;
    validate_serving_size(data.serving_size)?;
    validate_serving_unit(&data.serving_unit)?;
    validate_nutrient("calories", data.calories)?;
    validate_nutrient("protein", data.protein)?;
    validate_nutrient("carbs", data.carbs)?;
    validate_nutrient("fats", data.fats)?;

    data.name = data.name.trim().to_string();
    data.serving_unit = data.serving_unit.trim().to_string();

    let conn = db.get_conn()?;
    ensure_name_free(&conn, &data.name, None)?;
    let item = FoodItem::create(&conn, &data).map_err(|e| map_name_conflict(e, &data.name))?;

    tracing::info!(id = item.id, name = %item.name, "Added food item");
    Ok(FoodResponse::from(item))
}

/// Get a food item by ID with usage information
pub fn get_food(db: &Database, id: i64) -> CoreResult<FoodDetailResponse> {
    let conn = db.get_conn()?;
    let item = FoodItem::get_by_id(&conn, id)?
        .ok_or_else(|| CoreError::not_found(format!("Food item not found with id: {}", id)))?;
    let diary_usage_count = FoodItem::get_diary_usage_count(&conn, id)?;

    Ok(FoodDetailResponse {
        food: FoodResponse::from(item),
        diary_usage_count,
    })
}

/// List the whole catalog, optionally filtered by category
pub fn list_foods(db: &Database, category: Option<&str>) -> CoreResult<FoodListResponse> {
    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::parse::<FoodCategory>)
        .transpose()?;

    let items = db.with_conn(|conn| FoodItem::list(conn, category))?;
    Ok(FoodListResponse::from(items))
}

/// Case-insensitive substring search on name
pub fn search_foods<C: FoodCatalog>(catalog: &C, query: &str) -> CoreResult<FoodListResponse> {
    Ok(FoodListResponse::from(catalog.search(query.trim())?))
}

/// Partially update a food item
pub fn update_food(db: &Database, id: i64, mut data: FoodItemUpdate) -> CoreResult<UpdateFoodResponse> {
    if let Some(name) = &data.name {
        validate_name(name)?;
    }
    if let Some(serving_size) = data.serving_size {
        validate_serving_size(serving_size)?;
    }
    if let Some(unit) = &data.serving_unit {
        validate_serving_unit(unit)?;
    }
    for (field, value) in [
        ("calories", data.calories),
        ("protein", data.protein),
        ("carbs", data.carbs),
        ("fats", data.fats),
    ] {
        if let Some(value) = value {
            validate_nutrient(field, value)?;
        }
    }

    data.name = data.name.map(|n| n.trim().to_string());
    data.serving_unit = data.serving_unit.map(|u| u.trim().to_string());

    let conn = db.get_conn()?;
    if let Some(name) = &data.name {
        ensure_name_free(&conn, name, Some(id))?;
    }

    let item = FoodItem::update(&conn, id, &data)
        .map_err(|e| map_name_conflict(e, data.name.as_deref().unwrap_or_default()))?
        .ok_or_else(|| CoreError::not_found(format!("Food item not found with id: {}", id)))?;
    let diary_usage_count = FoodItem::get_diary_usage_count(&conn, id)?;

    tracing::info!(id, diary_usage_count, "Updated food item");
    Ok(UpdateFoodResponse {
        food: FoodResponse::from(item),
        diary_usage_count,
    })
}

/// Delete a food item. Refused while any diary entry still references it.
pub fn delete_food(db: &Database, id: i64) -> CoreResult<DeleteFoodResponse> {
    let conn = db.get_conn()?;

    if FoodItem::get_by_id(&conn, id)?.is_none() {
        return Err(CoreError::not_found(format!("Food item not found with id: {}", id)));
    }

    let usage_count = FoodItem::get_diary_usage_count(&conn, id)?;
    if usage_count > 0 {
        return Err(CoreError::validation(format!(
            "Cannot delete food item {}: referenced by {} diary entr{}",
            id,
            usage_count,
            if usage_count == 1 { "y" } else { "ies" }
        )));
    }

    FoodItem::delete(&conn, id)?;
    tracing::info!(id, "Deleted food item");

    Ok(DeleteFoodResponse {
        success: true,
        deleted_id: id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;
    use crate::diary::DiaryEngine;
    use crate::models::MealType;
    use chrono::NaiveDate;

    fn salmon() -> FoodItemCreate {
        FoodItemCreate {
            name: "  Salmon fillet ".to_string(),
            serving_size: 100.0,
            serving_unit: "g".to_string(),
            category: FoodCategory::Protein,
            calories: 208.0,
            protein: 20.0,
            carbs: 0.0,
            fats: 13.0,
        }
    }

    #[test]
    fn test_add_validates_input() {
        let (_dir, db) = temp_database();

        let added = add_food(&db, salmon()).unwrap();
        assert_eq!(added.name, "Salmon fillet");

        let cases = [
            FoodItemCreate { name: " ".to_string(), ..salmon() },
            FoodItemCreate { serving_size: 0.0, ..salmon() },
            FoodItemCreate { serving_unit: String::new(), ..salmon() },
            FoodItemCreate { fats: -1.0, ..salmon() },
            // Duplicate, ignoring case
            FoodItemCreate { name: "SALMON FILLET".to_string(), ..salmon() },
        ];
        for case in cases {
            assert!(matches!(add_food(&db, case), Err(CoreError::Validation(_))));
        }
    }

    #[test]
    fn test_unique_violation_reported_as_validation() {
        let (_dir, db) = temp_database();
        let conn = db.get_conn().unwrap();
        FoodItem::create(&conn, &salmon()).unwrap();

        // Writer that skipped the pre-check, as a racing insert would
        let err = FoodItem::create(&conn, &FoodItemCreate { name: "SALMON FILLET".to_string(), ..salmon() })
            .unwrap_err();
        assert!(matches!(map_name_conflict(err, "SALMON FILLET"), CoreError::Validation(_)));

        let other = FoodItem::create(&conn, &FoodItemCreate { name: "Trout".to_string(), ..salmon() }).unwrap();
        let rename = FoodItemUpdate { name: Some("salmon FILLET".to_string()), ..Default::default() };
        let err = FoodItem::update(&conn, other.id, &rename).unwrap_err();
        assert!(matches!(map_name_conflict(err, "salmon FILLET"), CoreError::Validation(_)));

        let unrelated = DbError::Corrupt("bad row".to_string());
        assert!(matches!(map_name_conflict(unrelated, "x"), CoreError::Database(_)));
    }

    #[test]
    fn test_search_and_list() {
        let (_dir, db) = temp_database();
        add_food(&db, salmon()).unwrap();
        add_food(
            &db,
            FoodItemCreate {
                name: "Brown rice".to_string(),
                category: FoodCategory::Carb,
                ..salmon()
            },
        )
        .unwrap();

        assert_eq!(search_foods(&db, "SALM").unwrap().total, 1);
        assert_eq!(search_foods(&db, "i").unwrap().total, 2);
        assert_eq!(search_foods(&db, "100%").unwrap().total, 0);
        assert_eq!(list_foods(&db, None).unwrap().total, 2);
        assert_eq!(list_foods(&db, Some("carb")).unwrap().items[0].name, "Brown rice");
        assert!(matches!(list_foods(&db, Some("candy")), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_update_partial() {
        let (_dir, db) = temp_database();
        let id = add_food(&db, salmon()).unwrap().id;

        let updated = update_food(
            &db,
            id,
            FoodItemUpdate { calories: Some(200.0), ..Default::default() },
        )
        .unwrap();
        assert_eq!(updated.food.calories_per_serving, 200.0);
        assert_eq!(updated.food.protein_per_serving, 20.0);

        assert!(matches!(
            update_food(&db, id, FoodItemUpdate { serving_size: Some(-2.0), ..Default::default() }),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            update_food(&db, 404, FoodItemUpdate::default()),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_refused_while_referenced() {
        let (_dir, db) = temp_database();
        let id = add_food(&db, salmon()).unwrap().id;
        let engine = DiaryEngine::new(db.clone(), db.clone());
        let date = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();

        engine.add_entry("u1", date, MealType::Dinner, id, 150.0, "g").unwrap();
        assert_eq!(get_food(&db, id).unwrap().diary_usage_count, 1);
        assert!(matches!(delete_food(&db, id), Err(CoreError::Validation(_))));

        engine.remove_entry("u1", date, id).unwrap();
        assert!(delete_food(&db, id).unwrap().success);
        assert!(matches!(get_food(&db, id), Err(CoreError::NotFound(_))));
        assert!(matches!(delete_food(&db, id), Err(CoreError::NotFound(_))));
    }
}
