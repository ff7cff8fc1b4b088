//! Daily diary model
//!
//! One diary per (user, calendar day): up to four meals, each an ordered list of
//! entries, plus running nutrient totals maintained incrementally.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::error::CoreError;
use super::Nutrition;

/// Meal type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Fixed scan and display order
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    fn index(&self) -> usize {
        match self {
            MealType::Breakfast => 0,
            MealType::Lunch => 1,
            MealType::Dinner => 2,
            MealType::Snack => 3,
        }
    }
}

impl FromStr for MealType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => Err(CoreError::validation(format!(
                "Unknown meal type '{}' (expected breakfast, lunch, dinner or snack)",
                other
            ))),
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged portion of a catalog food
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Unique within the owning diary, never reused
    pub id: i64,
    /// Weak reference into the food catalog
    pub food_id: i64,
    pub quantity: f64,
    pub unit: String,
}

/// Meals keyed directly by type. `None` means the meal was never started that day;
/// `Some(vec![])` is a meal whose entries have all been removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meals {
    slots: [Option<Vec<DiaryEntry>>; 4],
}

impl Meals {
    pub fn get(&self, meal_type: MealType) -> Option<&[DiaryEntry]> {
        self.slots[meal_type.index()].as_deref()
    }

    /// Entries of a meal, creating the meal if absent
    pub fn entries_mut(&mut self, meal_type: MealType) -> &mut Vec<DiaryEntry> {
        self.slots[meal_type.index()].get_or_insert_with(Vec::new)
    }

    /// Started meals in fixed order
    pub fn iter(&self) -> impl Iterator<Item = (MealType, &[DiaryEntry])> + '_ {
        MealType::ALL
            .into_iter()
            .filter_map(move |meal_type| self.get(meal_type).map(|entries| (meal_type, entries)))
    }

    pub fn entries(&self) -> impl Iterator<Item = (MealType, &DiaryEntry)> + '_ {
        self.iter()
            .flat_map(|(meal_type, entries)| entries.iter().map(move |entry| (meal_type, entry)))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn entry_count(&self) -> usize {
        self.iter().map(|(_, entries)| entries.len()).sum()
    }

    /// Remove and return the first entry matching `pred`, scanning meals in fixed order
    fn take_first<F>(&mut self, mut pred: F) -> Option<(MealType, DiaryEntry)>
    where
        F: FnMut(&DiaryEntry) -> bool,
    {
        for meal_type in MealType::ALL {
            if let Some(entries) = self.slots[meal_type.index()].as_mut() {
                if let Some(pos) = entries.iter().position(&mut pred) {
                    return Some((meal_type, entries.remove(pos)));
                }
            }
        }
        None
    }
}

/// A user's diary for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDiary {
    pub user_id: String,
    pub date: NaiveDate,
    pub meals: Meals,
    pub totals: Nutrition,
    /// Next per-entry identifier to hand out
    pub next_entry_id: i64,
}

impl DailyDiary {
    /// A zero-totals diary with no meals; nothing is persisted
    pub fn empty(user_id: &str, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            meals: Meals::default(),
            totals: Nutrition::zero(),
            next_entry_id: 1,
        }
    }

    /// Append an entry to its meal and add its contribution to the totals in one step
    pub fn add_entry(
        &mut self,
        meal_type: MealType,
        food_id: i64,
        quantity: f64,
        unit: &str,
        contribution: &Nutrition,
    ) -> i64 {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        self.meals.entries_mut(meal_type).push(DiaryEntry {
            id,
            food_id,
            quantity,
            unit: unit.to_string(),
        });
        self.totals = self.totals + *contribution;
        id
    }

    /// First entry for `food_id` in meal scan order, without removing it
    pub fn find_first_by_food(&self, food_id: i64) -> Option<(MealType, &DiaryEntry)> {
        self.meals.entries().find(|(_, entry)| entry.food_id == food_id)
    }

    pub fn find_entry(&self, entry_id: i64) -> Option<(MealType, &DiaryEntry)> {
        self.meals.entries().find(|(_, entry)| entry.id == entry_id)
    }

    /// Remove an entry by id and subtract `contribution` from the totals in one step
    pub fn remove_entry(
        &mut self,
        entry_id: i64,
        contribution: &Nutrition,
    ) -> Option<(MealType, DiaryEntry)> {
        let removed = self.meals.take_first(|entry| entry.id == entry_id)?;
        self.totals = self.totals - *contribution;
        Some(removed)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn header_from_row(row: &Row) -> rusqlite::Result<(i64, Self)> {
        let date: String = row.get("date")?;
        let date = parse_date(&date).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let diary = Self {
            user_id: row.get("user_id")?,
            date,
            meals: Meals::default(),
            totals: Nutrition {
                calories: row.get("total_calories")?,
                protein: row.get("total_protein")?,
                carbs: row.get("total_carbs")?,
                fats: row.get("total_fats")?,
            },
            next_entry_id: row.get("next_entry_id")?,
        };
        Ok((row.get("id")?, diary))
    }

    /// Load meals and entries for an already-read diary header
    fn load_meals(conn: &Connection, diary_id: i64, diary: &mut Self) -> DbResult<()> {
        let mut stmt = conn.prepare("SELECT meal_type FROM diary_meals WHERE diary_id = ?1")?;
        let meal_types = stmt
            .query_map([diary_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for meal_type in meal_types {
            diary.meals.entries_mut(parse_meal_type(&meal_type)?);
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT entry_id, meal_type, food_id, quantity, unit
            FROM diary_entries
            WHERE diary_id = ?1
            ORDER BY position, entry_id
            "#,
        )?;
        let rows = stmt
            .query_map([diary_id], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    DiaryEntry {
                        id: row.get(0)?,
                        food_id: row.get(2)?,
                        quantity: row.get(3)?,
                        unit: row.get(4)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (meal_type, entry) in rows {
            diary.meals.entries_mut(parse_meal_type(&meal_type)?).push(entry);
        }

        Ok(())
    }

    /// Get the diary for a (user, date)
    pub fn get_for_date(conn: &Connection, user_id: &str, date: NaiveDate) -> DbResult<Option<Self>> {
        let header = conn
            .query_row(
                "SELECT * FROM diaries WHERE user_id = ?1 AND date = ?2",
                params![user_id, date.to_string()],
                Self::header_from_row,
            )
            .optional()?;

        match header {
            Some((diary_id, mut diary)) => {
                Self::load_meals(conn, diary_id, &mut diary)?;
                Ok(Some(diary))
            }
            None => Ok(None),
        }
    }

    /// Every stored diary for a date, across users
    pub fn list_for_date(conn: &Connection, date: NaiveDate) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM diaries WHERE date = ?1 ORDER BY user_id")?;
        let headers = stmt
            .query_map([date.to_string()], Self::header_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut diaries = Vec::with_capacity(headers.len());
        for (diary_id, mut diary) in headers {
            Self::load_meals(conn, diary_id, &mut diary)?;
            diaries.push(diary);
        }
        Ok(diaries)
    }

    /// Insert or replace the whole diary atomically.
    ///
    /// The (user_id, date) uniqueness constraint makes creation idempotent: a second
    /// writer for the same key updates the existing row instead of adding another.
    pub fn upsert(conn: &mut Connection, diary: &Self) -> DbResult<Self> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let diary_id: i64 = tx.query_row(
            r#"
            INSERT INTO diaries (
                user_id, date, total_calories, total_protein, total_carbs, total_fats, next_entry_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id, date) DO UPDATE SET
                total_calories = excluded.total_calories,
                total_protein = excluded.total_protein,
                total_carbs = excluded.total_carbs,
                total_fats = excluded.total_fats,
                next_entry_id = excluded.next_entry_id,
                updated_at = datetime('now')
            RETURNING id
            "#,
            params![
                diary.user_id,
                diary.date.to_string(),
                diary.totals.calories,
                diary.totals.protein,
                diary.totals.carbs,
                diary.totals.fats,
                diary.next_entry_id,
            ],
            |row| row.get(0),
        )?;

        tx.execute("DELETE FROM diary_entries WHERE diary_id = ?1", [diary_id])?;
        tx.execute("DELETE FROM diary_meals WHERE diary_id = ?1", [diary_id])?;

        {
            let mut insert_meal =
                tx.prepare("INSERT INTO diary_meals (diary_id, meal_type) VALUES (?1, ?2)")?;
            let mut insert_entry = tx.prepare(
                r#"
                INSERT INTO diary_entries (diary_id, entry_id, meal_type, food_id, quantity, unit, position)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;

            for (meal_type, entries) in diary.meals.iter() {
                insert_meal.execute(params![diary_id, meal_type.as_str()])?;
                for (position, entry) in entries.iter().enumerate() {
                    insert_entry.execute(params![
                        diary_id,
                        entry.id,
                        meal_type.as_str(),
                        entry.food_id,
                        entry.quantity,
                        entry.unit,
                        position as i64,
                    ])?;
                }
            }
        }

        tx.commit()?;

        Self::get_for_date(conn, &diary.user_id, diary.date)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }
}

/// Parse an ISO calendar date: "2025-01-09"
pub fn parse_date(s: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CoreError::validation(format!("Invalid date '{}' (expected YYYY-MM-DD)", s)))
}

fn parse_meal_type(s: &str) -> DbResult<MealType> {
    s.parse()
        .map_err(|_| DbError::Corrupt(format!("unknown meal type '{}' in diary_meals", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 9).unwrap()
    }

    fn portion(calories: f64) -> Nutrition {
        Nutrition { calories, protein: calories / 10.0, carbs: calories / 5.0, fats: calories / 20.0 }
    }

    #[test]
    fn test_meal_type_parse() {
        assert_eq!("Dinner".parse::<MealType>().unwrap(), MealType::Dinner);
        assert!(matches!("brunch".parse::<MealType>(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_add_creates_meal_lazily() {
        let mut diary = DailyDiary::empty("u1", date());
        assert!(diary.meals.is_empty());

        let id = diary.add_entry(MealType::Lunch, 7, 150.0, "g", &portion(300.0));
        assert_eq!(id, 1);
        assert!(diary.meals.get(MealType::Breakfast).is_none());
        assert_eq!(diary.meals.get(MealType::Lunch).unwrap().len(), 1);
        assert_eq!(diary.totals.calories, 300.0);
    }

    #[test]
    fn test_find_first_by_food_uses_fixed_meal_order() {
        let mut diary = DailyDiary::empty("u1", date());
        diary.add_entry(MealType::Snack, 3, 10.0, "g", &portion(10.0));
        diary.add_entry(MealType::Breakfast, 3, 20.0, "g", &portion(20.0));
        diary.add_entry(MealType::Breakfast, 3, 30.0, "g", &portion(30.0));

        let (meal_type, entry) = diary.find_first_by_food(3).unwrap();
        assert_eq!(meal_type, MealType::Breakfast);
        assert_eq!(entry.quantity, 20.0);
    }

    #[test]
    fn test_remove_keeps_empty_meal_and_never_reuses_ids() {
        let mut diary = DailyDiary::empty("u1", date());
        let id = diary.add_entry(MealType::Dinner, 5, 100.0, "g", &portion(100.0));
        let (meal_type, removed) = diary.remove_entry(id, &portion(100.0)).unwrap();
        assert_eq!(meal_type, MealType::Dinner);
        assert_eq!(removed.food_id, 5);
        assert_eq!(diary.meals.get(MealType::Dinner), Some(&[][..]));
        assert!(diary.totals.approx_eq(&Nutrition::zero()));

        let next = diary.add_entry(MealType::Dinner, 5, 100.0, "g", &portion(100.0));
        assert_eq!(next, 2);
        assert!(diary.remove_entry(99, &portion(1.0)).is_none());
    }

    #[test]
    fn test_upsert_round_trip_preserves_structure() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let mut diary = DailyDiary::empty("u1", date());
        diary.add_entry(MealType::Lunch, 1, 150.0, "g", &portion(300.0));
        diary.add_entry(MealType::Breakfast, 2, 1.0, "count", &portion(70.0));
        diary.add_entry(MealType::Lunch, 3, 50.0, "g", &portion(25.0));
        let removed = diary.add_entry(MealType::Snack, 4, 20.0, "g", &portion(90.0));
        diary.remove_entry(removed, &portion(90.0));

        let stored = DailyDiary::upsert(&mut conn, &diary).unwrap();
        assert_eq!(stored, diary);
        let lunch: Vec<i64> = stored.meals.get(MealType::Lunch).unwrap().iter().map(|e| e.food_id).collect();
        assert_eq!(lunch, vec![1, 3]);
        assert_eq!(stored.meals.get(MealType::Snack), Some(&[][..]));

        // Second upsert for the same key updates in place
        diary.add_entry(MealType::Dinner, 9, 10.0, "g", &portion(5.0));
        DailyDiary::upsert(&mut conn, &diary).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM diaries WHERE user_id = 'u1'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(DailyDiary::list_for_date(&conn, date()).unwrap().len(), 1);
    }

    #[test]
    fn test_get_for_date_absent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert!(DailyDiary::get_for_date(&conn, "nobody", date()).unwrap().is_none());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2025-01-09").unwrap(), date());
        assert!(matches!(parse_date("09/01/2025"), Err(CoreError::Validation(_))));
    }
}
