//! Utility to check every diary for a date against a from-scratch recomputation
//!
//! Usage: verify_diaries [YYYY-MM-DD]   (defaults to today)
//! Exits with status 1 when any diary's running totals have drifted.

use calorie_tracker::config::Config;
use calorie_tracker::db::{self, DbResult};
use calorie_tracker::diary::{ConsistencyReport, DiaryEngine, DiaryStore, FoodCatalog, SqliteDiaryEngine};
use calorie_tracker::error::CoreError;
use calorie_tracker::models::DailyDiary;
use calorie_tracker::tools::diary::resolve_date;

enum Verdict {
    Consistent,
    Drifted(ConsistencyReport),
    /// Recomputation failed, e.g. an entry points at a food no longer in the catalog
    Unresolved(CoreError),
}

fn check_diary<C: FoodCatalog, S: DiaryStore>(engine: &DiaryEngine<C, S>, diary: &DailyDiary) -> Verdict {
    match engine.verify(diary) {
        Ok(report) if report.consistent => Verdict::Consistent,
        Ok(report) => Verdict::Drifted(report),
        Err(e) => Verdict::Unresolved(e),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let date_arg = std::env::args().nth(1);
    let date = resolve_date(date_arg.as_deref())?;

    let config = Config::from_env();
    println!("Database path: {}", config.database_path.display());
    println!("Date: {}", date);

    let database = db::Database::with_pool_size(&config.database_path, config.pool_size)?;
    database.with_conn(|conn| db::migrations::run_migrations(conn))?;

    let diaries = database.with_conn(|conn| -> DbResult<Vec<DailyDiary>> {
        DailyDiary::list_for_date(conn, date)
    })?;
    let engine = SqliteDiaryEngine::new(database.clone(), database);

    let mut drifted = 0;
    for diary in &diaries {
        match check_diary(&engine, diary) {
            Verdict::Consistent => {
                println!("  ok    {} ({} entries)", diary.user_id, diary.meals.entry_count());
            }
            Verdict::Drifted(report) => {
                drifted += 1;
                println!("  DRIFT {}", report.user_id);
                for ((field, incremental), (_, recomputed)) in
                    report.incremental.fields().into_iter().zip(report.recomputed.fields())
                {
                    println!("        {:<8} stored {:>10.3}  recomputed {:>10.3}", field, incremental, recomputed);
                }
            }
            Verdict::Unresolved(e) => {
                drifted += 1;
                println!("  DRIFT {} (cannot recompute: {})", diary.user_id, e);
            }
        }
    }

    println!("{} diar{} checked, {} drifted", diaries.len(), if diaries.len() == 1 { "y" } else { "ies" }, drifted);

    if drifted > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calorie_tracker::models::{FoodCategory, FoodItem, FoodItemCreate, MealType};
    use chrono::NaiveDate;

    #[test]
    fn test_missing_food_does_not_stop_other_diaries() {
        let dir = tempfile::tempdir().unwrap();
        let database = db::Database::new(dir.path().join("verify.db")).unwrap();
        database.with_conn(|conn| db::migrations::run_migrations(conn)).unwrap();

        let new_food = |name: &str| FoodItemCreate {
            name: name.to_string(),
            serving_size: 1.0,
            serving_unit: "count".to_string(),
            category: FoodCategory::Fruit,
            calories: 100.0,
            protein: 1.0,
            carbs: 20.0,
            fats: 0.5,
        };
        let (pear, plum) = database
            .with_conn(|conn| -> DbResult<_> {
                Ok((FoodItem::create(conn, &new_food("Pear"))?, FoodItem::create(conn, &new_food("Plum"))?))
            })
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        let engine = SqliteDiaryEngine::new(database.clone(), database.clone());
        engine.add_entry("alice", date, MealType::Snack, pear.id, 1.0, "count").unwrap();
        engine.add_entry("bob", date, MealType::Snack, plum.id, 2.0, "count").unwrap();
        database.with_conn(|conn| FoodItem::delete(conn, pear.id)).unwrap();

        let diaries = database
            .with_conn(|conn| -> DbResult<Vec<DailyDiary>> { DailyDiary::list_for_date(conn, date) })
            .unwrap();
        let verdicts: Vec<(String, Verdict)> = diaries
            .iter()
            .map(|diary| (diary.user_id.clone(), check_diary(&engine, diary)))
            .collect();

        assert_eq!(verdicts.len(), 2);
        for (user_id, verdict) in &verdicts {
            match user_id.as_str() {
                "alice" => assert!(matches!(verdict, Verdict::Unresolved(CoreError::NotFound(_)))),
                "bob" => assert!(matches!(verdict, Verdict::Consistent)),
                other => panic!("unexpected diary for {}", other),
            }
        }
    }
}
