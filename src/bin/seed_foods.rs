//! Utility to seed a starter food catalog
//!
//! Items whose name already exists are left untouched, so it is safe to rerun.

use calorie_tracker::config::Config;
use calorie_tracker::db::{self, DbResult};
use calorie_tracker::models::{FoodCategory, FoodItem, FoodItemCreate};

/// name, serving size, unit, category, calories, protein, carbs, fats (per serving)
const STARTER_FOODS: &[(&str, f64, &str, FoodCategory, f64, f64, f64, f64)] = &[
    ("Chicken breast", 100.0, "g", FoodCategory::Protein, 165.0, 31.0, 0.0, 3.6),
    ("Egg", 1.0, "count", FoodCategory::Protein, 72.0, 6.3, 0.4, 4.8),
    ("Salmon", 100.0, "g", FoodCategory::Protein, 208.0, 20.0, 0.0, 13.0),
    ("White rice, cooked", 100.0, "g", FoodCategory::Carb, 130.0, 2.7, 28.0, 0.3),
    ("Rolled oats", 40.0, "g", FoodCategory::Carb, 150.0, 5.0, 27.0, 2.5),
    ("Whole wheat bread", 1.0, "slice", FoodCategory::Carb, 80.0, 4.0, 14.0, 1.1),
    ("Olive oil", 15.0, "ml", FoodCategory::Fat, 119.0, 0.0, 0.0, 13.5),
    ("Almonds", 28.0, "g", FoodCategory::Fat, 164.0, 6.0, 6.1, 14.2),
    ("Broccoli", 100.0, "g", FoodCategory::Vegetable, 34.0, 2.8, 6.6, 0.4),
    ("Spinach", 100.0, "g", FoodCategory::Vegetable, 23.0, 2.9, 3.6, 0.4),
    ("Banana", 1.0, "count", FoodCategory::Fruit, 105.0, 1.3, 27.0, 0.4),
    ("Apple", 1.0, "count", FoodCategory::Fruit, 95.0, 0.5, 25.0, 0.3),
    ("Greek yogurt, plain", 170.0, "g", FoodCategory::Dairy, 100.0, 17.0, 6.0, 0.7),
    ("Milk, 2%", 240.0, "ml", FoodCategory::Dairy, 122.0, 8.1, 11.7, 4.8),
    ("Dark chocolate", 28.0, "g", FoodCategory::Other, 170.0, 2.2, 13.0, 12.0),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    println!("Database path: {}", config.database_path.display());

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = db::Database::with_pool_size(&config.database_path, config.pool_size)?;

    database.with_conn(|conn| db::migrations::run_migrations(conn))?;

    let (added, skipped) = database.with_conn(|conn| -> DbResult<(usize, usize)> {
        let mut added = 0;
        let mut skipped = 0;

        for &(name, serving_size, serving_unit, category, calories, protein, carbs, fats) in STARTER_FOODS {
            if FoodItem::get_by_name(conn, name)?.is_some() {
                skipped += 1;
                continue;
            }

            let item = FoodItem::create(
                conn,
                &FoodItemCreate {
                    name: name.to_string(),
                    serving_size,
                    serving_unit: serving_unit.to_string(),
                    category,
                    calories,
                    protein,
                    carbs,
                    fats,
                },
            )?;
            println!("  + [{}] {} ({} {})", item.id, item.name, item.serving_size, item.serving_unit);
            added += 1;
        }

        Ok((added, skipped))
    })?;

    println!("Seeded {} food item(s), {} already present", added, skipped);
    Ok(())
}
