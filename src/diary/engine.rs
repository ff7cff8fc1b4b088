//! Diary aggregation engine
//!
//! Keeps each (user, day) diary's running totals equal to the sum of its entries'
//! contributions. Totals are updated incrementally in the same step that adds or
//! removes the entry, and every mutation runs under the per-(user, date) lock so
//! concurrent callers cannot lose an update or create a second diary.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::catalog::FoodCatalog;
use super::locks::DiaryLocks;
use super::store::DiaryStore;
use crate::error::{CoreError, CoreResult};
use crate::models::{DailyDiary, FoodItem, MealType, Nutrition};

/// Incremental totals side by side with a from-scratch recomputation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    pub user_id: String,
    pub date: NaiveDate,
    pub incremental: Nutrition,
    pub recomputed: Nutrition,
    pub consistent: bool,
}

pub struct DiaryEngine<C, S> {
    catalog: C,
    store: S,
    locks: DiaryLocks,
}

impl<C: FoodCatalog, S: DiaryStore> DiaryEngine<C, S> {
    pub fn new(catalog: C, store: S) -> Self {
        Self {
            catalog,
            store,
            locks: DiaryLocks::new(),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    fn resolve_food(&self, food_id: i64) -> CoreResult<FoodItem> {
        self.catalog
            .find_by_id(food_id)?
            .ok_or_else(|| CoreError::not_found(format!("Food item {} not found", food_id)))
    }

    /// Stored diary, or an empty unsaved one when nothing was logged that day
    pub fn get_diary(&self, user_id: &str, date: NaiveDate) -> CoreResult<DailyDiary> {
        Ok(self
            .store
            .get_diary_for_date(user_id, date)?
            .unwrap_or_else(|| DailyDiary::empty(user_id, date)))
    }

    pub fn add_entry(
        &self,
        user_id: &str,
        date: NaiveDate,
        meal_type: MealType,
        food_id: i64,
        quantity: f64,
        unit: &str,
    ) -> CoreResult<DailyDiary> {
        let food = self.resolve_food(food_id)?;

        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(CoreError::validation(format!(
                "quantity must be greater than 0 (got {})",
                quantity
            )));
        }
        if food.serving_size == 0.0 {
            return Err(CoreError::validation(format!(
                "Food item {} has a zero serving size",
                food_id
            )));
        }
        let unit = unit.trim();
        if unit.is_empty() {
            return Err(CoreError::validation("unit cannot be empty"));
        }

        let contribution = food.portion(quantity);

        self.locks.with_lock(user_id, date, || {
            let mut diary = self.get_diary(user_id, date)?;
            let entry_id = diary.add_entry(meal_type, food_id, quantity, unit, &contribution);
            let diary = self.store.upsert_diary(&diary)?;

            info!(
                user_id,
                %date,
                meal = %meal_type,
                food_id,
                entry_id,
                quantity,
                calories = contribution.calories,
                "Added diary entry"
            );
            Ok(diary)
        })
    }

    /// Remove the first entry for `food_id`, scanning breakfast, lunch, dinner, snack.
    ///
    /// Only one instance is removed when the food was logged more than once.
    pub fn remove_entry(&self, user_id: &str, date: NaiveDate, food_id: i64) -> CoreResult<DailyDiary> {
        self.locks.with_lock(user_id, date, || {
            let diary = self.load_existing(user_id, date)?;
            let entry_id = diary
                .find_first_by_food(food_id)
                .map(|(_, entry)| entry.id)
                .ok_or_else(|| {
                    CoreError::not_found(format!(
                        "No entry for food item {} in diary for {} on {}",
                        food_id, user_id, date
                    ))
                })?;
            self.remove_locked(diary, entry_id)
        })
    }

    pub fn remove_entry_by_id(&self, user_id: &str, date: NaiveDate, entry_id: i64) -> CoreResult<DailyDiary> {
        self.locks.with_lock(user_id, date, || {
            let diary = self.load_existing(user_id, date)?;
            if diary.find_entry(entry_id).is_none() {
                return Err(CoreError::not_found(format!(
                    "No entry {} in diary for {} on {}",
                    entry_id, user_id, date
                )));
            }
            self.remove_locked(diary, entry_id)
        })
    }

    fn load_existing(&self, user_id: &str, date: NaiveDate) -> CoreResult<DailyDiary> {
        self.store.get_diary_for_date(user_id, date)?.ok_or_else(|| {
            CoreError::not_found(format!("No diary for {} on {}", user_id, date))
        })
    }

    /// Caller holds the lock and has checked that `entry_id` exists.
    /// The contribution is priced from the food's current catalog values.
    fn remove_locked(&self, mut diary: DailyDiary, entry_id: i64) -> CoreResult<DailyDiary> {
        let (food_id, quantity) = diary
            .find_entry(entry_id)
            .map(|(_, entry)| (entry.food_id, entry.quantity))
            .ok_or_else(|| CoreError::not_found(format!("No entry {}", entry_id)))?;

        let contribution = self.resolve_food(food_id)?.portion(quantity);
        let (meal_type, _) = diary
            .remove_entry(entry_id, &contribution)
            .ok_or_else(|| CoreError::not_found(format!("No entry {}", entry_id)))?;
        let diary = self.store.upsert_diary(&diary)?;

        info!(
            user_id = %diary.user_id,
            date = %diary.date,
            meal = %meal_type,
            food_id,
            entry_id,
            calories = contribution.calories,
            "Removed diary entry"
        );
        Ok(diary)
    }

    /// Recompute totals from scratch with current catalog values. Never writes.
    pub fn verify_totals(&self, user_id: &str, date: NaiveDate) -> CoreResult<ConsistencyReport> {
        let diary = self.get_diary(user_id, date)?;
        self.verify(&diary)
    }

    pub fn verify(&self, diary: &DailyDiary) -> CoreResult<ConsistencyReport> {
        let recomputed = diary
            .meals
            .entries()
            .map(|(_, entry)| -> CoreResult<Nutrition> {
                Ok(self.resolve_food(entry.food_id)?.portion(entry.quantity))
            })
            .sum::<CoreResult<Nutrition>>()?;

        let consistent = diary.totals.approx_eq(&recomputed);
        if !consistent {
            warn!(
                user_id = %diary.user_id,
                date = %diary.date,
                incremental = diary.totals.calories,
                recomputed = recomputed.calories,
                "Diary totals diverge from recomputation"
            );
        }

        Ok(ConsistencyReport {
            user_id: diary.user_id.clone(),
            date: diary.date,
            incremental: diary.totals,
            recomputed,
            consistent,
        })
    }

    /// Like `verify_totals` but divergence is an error
    pub fn ensure_consistent(&self, user_id: &str, date: NaiveDate) -> CoreResult<()> {
        let report = self.verify_totals(user_id, date)?;
        match report.incremental.first_divergence(&report.recomputed) {
            Some((field, incremental, recomputed)) => Err(CoreError::Consistency {
                field,
                incremental,
                recomputed,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    use crate::db::test_support::temp_database;
    use crate::db::Database;
    use crate::models::{approx_eq, FoodCategory, FoodItemCreate, FoodItemUpdate};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 9).unwrap()
    }

    fn add_food(db: &Database, name: &str, serving_size: f64, calories: f64, protein: f64, carbs: f64, fats: f64) -> i64 {
        let data = FoodItemCreate {
            name: name.to_string(),
            serving_size,
            serving_unit: "g".to_string(),
            category: FoodCategory::Other,
            calories,
            protein,
            carbs,
            fats,
        };
        db.with_conn(|conn| FoodItem::create(conn, &data)).unwrap().id
    }

    fn engine(db: &Database) -> DiaryEngine<Database, Database> {
        DiaryEngine::new(db.clone(), db.clone())
    }

    /// Sum of quantity / serving_size * per-serving values over all entries
    fn expected_totals(db: &Database, diary: &DailyDiary) -> Nutrition {
        diary
            .meals
            .entries()
            .map(|(_, entry)| {
                let food = db
                    .with_conn(|conn| FoodItem::get_by_id(conn, entry.food_id))
                    .unwrap()
                    .unwrap();
                food.nutrition * (entry.quantity / food.serving_size)
            })
            .sum()
    }

    #[test]
    fn test_get_diary_absent_is_empty() {
        let (_dir, db) = temp_database();
        let diary = engine(&db).get_diary("nobody", day()).unwrap();
        assert!(diary.meals.is_empty());
        assert_eq!(diary.totals, Nutrition::zero());
        assert!(db.get_diary_for_date("nobody", day()).unwrap().is_none());
    }

    #[test]
    fn test_totals_track_sum_of_entries() {
        let (_dir, db) = temp_database();
        let engine = engine(&db);
        let rice = add_food(&db, "Rice", 100.0, 130.0, 2.7, 28.0, 0.3);
        let egg = add_food(&db, "Egg", 50.0, 72.0, 6.3, 0.4, 4.8);
        let oil = add_food(&db, "Olive oil", 15.0, 119.0, 0.0, 0.0, 13.5);

        let steps = [
            (MealType::Breakfast, egg, 100.0),
            (MealType::Lunch, rice, 185.0),
            (MealType::Lunch, oil, 7.5),
            (MealType::Snack, egg, 33.3),
            (MealType::Dinner, rice, 0.1),
        ];
        let mut diary = DailyDiary::empty("u1", day());
        for (meal_type, food_id, quantity) in steps {
            diary = engine.add_entry("u1", day(), meal_type, food_id, quantity, "g").unwrap();
            assert!(diary.totals.approx_eq(&expected_totals(&db, &diary)));
        }
        assert_eq!(diary.meals.entry_count(), 5);
        assert!(engine.verify_totals("u1", day()).unwrap().consistent);
    }

    #[test]
    fn test_portion_scaling_and_meal_isolation() {
        let (_dir, db) = temp_database();
        let engine = engine(&db);
        let food = add_food(&db, "Granola", 100.0, 200.0, 10.0, 20.0, 5.0);
        let other = add_food(&db, "Apple", 1.0, 95.0, 0.5, 25.0, 0.3);

        let diary = engine.add_entry("u1", day(), MealType::Breakfast, food, 150.0, "g").unwrap();
        assert_eq!(diary.totals.calories, 300.0);
        let breakfast = diary.meals.get(MealType::Breakfast).unwrap().to_vec();

        let diary = engine.add_entry("u1", day(), MealType::Snack, other, 1.0, "count").unwrap();
        assert_eq!(diary.meals.get(MealType::Breakfast).unwrap(), &breakfast[..]);
        assert_eq!(diary.totals.calories, 395.0);
        assert!(approx_eq(diary.totals.carbs, 30.0 + 25.0));
    }

    #[test]
    fn test_add_then_remove_restores_totals() {
        let (_dir, db) = temp_database();
        let engine = engine(&db);
        let base = add_food(&db, "Oats", 40.0, 150.0, 5.0, 27.0, 2.5);
        let extra = add_food(&db, "Peanut butter", 32.0, 190.0, 7.0, 7.0, 16.0);

        let before = engine.add_entry("u1", day(), MealType::Breakfast, base, 60.0, "g").unwrap();
        engine.add_entry("u1", day(), MealType::Lunch, extra, 17.0, "g").unwrap();
        let after = engine.remove_entry("u1", day(), extra).unwrap();

        assert!(after.totals.approx_eq(&before.totals));
        assert_eq!(after.meals.get(MealType::Lunch), Some(&[][..]));
    }

    #[test]
    fn test_remove_duplicate_food_removes_one_instance() {
        let (_dir, db) = temp_database();
        let engine = engine(&db);
        let bread = add_food(&db, "Bread", 30.0, 80.0, 3.0, 15.0, 1.0);

        engine.add_entry("u1", day(), MealType::Dinner, bread, 60.0, "g").unwrap();
        engine.add_entry("u1", day(), MealType::Breakfast, bread, 30.0, "g").unwrap();

        let diary = engine.remove_entry("u1", day(), bread).unwrap();
        // Breakfast is scanned first
        assert_eq!(diary.meals.get(MealType::Breakfast).unwrap().len(), 0);
        assert_eq!(diary.meals.get(MealType::Dinner).unwrap().len(), 1);
        assert!(approx_eq(diary.totals.calories, 160.0));
    }

    #[test]
    fn test_remove_by_entry_id() {
        let (_dir, db) = temp_database();
        let engine = engine(&db);
        let bread = add_food(&db, "Bread", 30.0, 80.0, 3.0, 15.0, 1.0);

        engine.add_entry("u1", day(), MealType::Breakfast, bread, 30.0, "g").unwrap();
        let diary = engine.add_entry("u1", day(), MealType::Breakfast, bread, 90.0, "g").unwrap();
        let second = diary.meals.get(MealType::Breakfast).unwrap()[1].id;

        let diary = engine.remove_entry_by_id("u1", day(), second).unwrap();
        let remaining = diary.meals.get(MealType::Breakfast).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].quantity, 30.0);
        assert!(approx_eq(diary.totals.calories, 80.0));

        assert!(matches!(
            engine.remove_entry_by_id("u1", day(), second),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_dates_are_independent() {
        let (_dir, db) = temp_database();
        let engine = engine(&db);
        let food = add_food(&db, "Yogurt", 100.0, 60.0, 10.0, 4.0, 0.4);
        let yesterday = day().pred_opt().unwrap();

        engine.add_entry("u1", yesterday, MealType::Snack, food, 200.0, "g").unwrap();
        engine.add_entry("u1", day(), MealType::Snack, food, 100.0, "g").unwrap();
        engine.remove_entry("u1", yesterday, food).unwrap();

        assert_eq!(engine.get_diary("u1", yesterday).unwrap().totals.calories, 0.0);
        assert_eq!(engine.get_diary("u1", day()).unwrap().totals.calories, 60.0);
        assert_eq!(engine.get_diary("u2", day()).unwrap().totals.calories, 0.0);
    }

    #[test]
    fn test_error_kinds() {
        let (_dir, db) = temp_database();
        let engine = engine(&db);
        let food = add_food(&db, "Milk", 250.0, 150.0, 8.0, 12.0, 8.0);

        assert!(matches!(
            engine.add_entry("u1", day(), MealType::Lunch, 999, 1.0, "g"),
            Err(CoreError::NotFound(_))
        ));
        for quantity in [0.0, -5.0, f64::NAN] {
            assert!(matches!(
                engine.add_entry("u1", day(), MealType::Lunch, food, quantity, "ml"),
                Err(CoreError::Validation(_))
            ));
        }
        assert!(matches!(
            engine.add_entry("u1", day(), MealType::Lunch, food, 10.0, "  "),
            Err(CoreError::Validation(_))
        ));
        // No diary yet
        assert!(matches!(engine.remove_entry("u1", day(), food), Err(CoreError::NotFound(_))));

        engine.add_entry("u1", day(), MealType::Lunch, food, 250.0, "ml").unwrap();
        let other = add_food(&db, "Tea", 250.0, 2.0, 0.0, 0.5, 0.0);
        assert!(matches!(engine.remove_entry("u1", day(), other), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_repricing_is_reported_not_rewritten() {
        let (_dir, db) = temp_database();
        let engine = engine(&db);
        let food = add_food(&db, "Cheese", 30.0, 120.0, 7.0, 0.5, 10.0);
        engine.add_entry("u1", day(), MealType::Lunch, food, 30.0, "g").unwrap();

        let update = FoodItemUpdate { calories: Some(100.0), ..Default::default() };
        db.with_conn(|conn| FoodItem::update(conn, food, &update)).unwrap();

        let report = engine.verify_totals("u1", day()).unwrap();
        assert!(!report.consistent);
        assert_eq!(report.incremental.calories, 120.0);
        assert_eq!(report.recomputed.calories, 100.0);
        assert!(matches!(
            engine.ensure_consistent("u1", day()),
            Err(CoreError::Consistency { field: "calories", .. })
        ));
        // Still stored as logged
        assert_eq!(engine.get_diary("u1", day()).unwrap().totals.calories, 120.0);
    }

    #[test]
    fn test_remove_prices_with_current_catalog_values() {
        let (_dir, db) = temp_database();
        let engine = engine(&db);
        let food = add_food(&db, "Cheese", 30.0, 120.0, 7.0, 0.5, 10.0);
        engine.add_entry("u1", day(), MealType::Lunch, food, 30.0, "g").unwrap();

        let update = FoodItemUpdate { calories: Some(100.0), ..Default::default() };
        db.with_conn(|conn| FoodItem::update(conn, food, &update)).unwrap();

        let diary = engine.remove_entry("u1", day(), food).unwrap();
        assert_eq!(diary.meals.entry_count(), 0);
        assert_eq!(diary.meals.get(MealType::Lunch), Some(&[][..]));
        // 120 logged, 100 subtracted: the drift stays in the stored totals
        assert!(approx_eq(diary.totals.calories, 20.0));
        assert!(approx_eq(diary.totals.protein, 0.0));

        let stored = engine.get_diary("u1", day()).unwrap();
        assert!(approx_eq(stored.totals.calories, 20.0));
        assert!(!engine.verify_totals("u1", day()).unwrap().consistent);
    }

    #[test]
    fn test_concurrent_adds_to_same_day() {
        let (_dir, db) = temp_database();
        let food = add_food(&db, "Almonds", 28.0, 164.0, 6.0, 6.0, 14.0);
        let engine = Arc::new(engine(&db));

        let threads = 6;
        let per_thread = 10;
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let meal_type = MealType::ALL[i % MealType::ALL.len()];
                    for _ in 0..per_thread {
                        engine.add_entry("shared", day(), meal_type, food, 28.0, "g").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let count: i64 = db
            .with_conn(|conn| -> crate::db::DbResult<i64> {
                Ok(conn.query_row("SELECT COUNT(*) FROM diaries WHERE user_id = 'shared'", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);

        let diary = engine.get_diary("shared", day()).unwrap();
        let expected = (threads * per_thread) as f64;
        assert_eq!(diary.meals.entry_count(), threads * per_thread);
        assert!(approx_eq(diary.totals.calories, 164.0 * expected));
        assert_eq!(diary.next_entry_id, expected as i64 + 1);
        assert!(engine.locks.is_empty());
    }
}
