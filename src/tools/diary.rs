//! Diary MCP Tools
//!
//! Thin wrappers over the diary engine: parse caller input, pick the target date,
//! shape the response.

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::diary::{ConsistencyReport, DiaryEngine, DiaryStore, FoodCatalog};
use crate::error::{CoreError, CoreResult};
use crate::models::{parse_date, DailyDiary, MealType};

/// Diary as returned to callers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryResponse {
    pub user_id: String,
    pub date: String,
    pub meals: Vec<MealResponse>,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fats: f64,
}

#[derive(Debug, Serialize)]
pub struct MealResponse {
    #[serde(rename = "type")]
    pub meal_type: MealType,
    pub foods: Vec<EntryResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub entry_id: i64,
    pub food_id: i64,
    pub quantity: f64,
    pub unit: String,
}

impl From<&DailyDiary> for DiaryResponse {
    fn from(diary: &DailyDiary) -> Self {
        Self {
            user_id: diary.user_id.clone(),
            date: diary.date.to_string(),
            meals: diary
                .meals
                .iter()
                .map(|(meal_type, entries)| MealResponse {
                    meal_type,
                    foods: entries
                        .iter()
                        .map(|entry| EntryResponse {
                            entry_id: entry.id,
                            food_id: entry.food_id,
                            quantity: entry.quantity,
                            unit: entry.unit.clone(),
                        })
                        .collect(),
                })
                .collect(),
            total_calories: diary.totals.calories,
            total_protein: diary.totals.protein,
            total_carbs: diary.totals.carbs,
            total_fats: diary.totals.fats,
        }
    }
}

/// Explicit YYYY-MM-DD date, or the server's local calendar day
pub fn resolve_date(date: Option<&str>) -> CoreResult<NaiveDate> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(date) => parse_date(date),
        None => Ok(Local::now().date_naive()),
    }
}

/// Trimmed user id; blank ids are rejected so nothing is stored under ""
fn require_user_id(user_id: &str) -> CoreResult<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(CoreError::validation("user_id cannot be empty"));
    }
    Ok(user_id)
}

pub fn get_diary<C: FoodCatalog, S: DiaryStore>(
    engine: &DiaryEngine<C, S>,
    user_id: &str,
    date: Option<&str>,
) -> CoreResult<DiaryResponse> {
    let user_id = require_user_id(user_id)?;
    let date = resolve_date(date)?;
    Ok(DiaryResponse::from(&engine.get_diary(user_id, date)?))
}

pub fn add_entry<C: FoodCatalog, S: DiaryStore>(
    engine: &DiaryEngine<C, S>,
    user_id: &str,
    date: Option<&str>,
    meal_type: &str,
    food_id: i64,
    quantity: f64,
    unit: &str,
) -> CoreResult<DiaryResponse> {
    let user_id = require_user_id(user_id)?;
    let meal_type: MealType = meal_type.parse()?;
    let date = resolve_date(date)?;
    let diary = engine.add_entry(user_id, date, meal_type, food_id, quantity, unit)?;
    Ok(DiaryResponse::from(&diary))
}

/// Remove the first logged instance of a food
pub fn remove_entry<C: FoodCatalog, S: DiaryStore>(
    engine: &DiaryEngine<C, S>,
    user_id: &str,
    date: Option<&str>,
    food_id: i64,
) -> CoreResult<DiaryResponse> {
    let user_id = require_user_id(user_id)?;
    let date = resolve_date(date)?;
    Ok(DiaryResponse::from(&engine.remove_entry(user_id, date, food_id)?))
}

pub fn remove_entry_by_id<C: FoodCatalog, S: DiaryStore>(
    engine: &DiaryEngine<C, S>,
    user_id: &str,
    date: Option<&str>,
    entry_id: i64,
) -> CoreResult<DiaryResponse> {
    let user_id = require_user_id(user_id)?;
    let date = resolve_date(date)?;
    Ok(DiaryResponse::from(&engine.remove_entry_by_id(user_id, date, entry_id)?))
}

pub fn verify_diary<C: FoodCatalog, S: DiaryStore>(
    engine: &DiaryEngine<C, S>,
    user_id: &str,
    date: Option<&str>,
) -> CoreResult<ConsistencyReport> {
    let user_id = require_user_id(user_id)?;
    let date = resolve_date(date)?;
    engine.verify_totals(user_id, date)
}
