//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- FOOD ITEMS
        -- Catalog reference data, nutrients per serving
        -- ============================================
        CREATE TABLE food_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            -- Unicode lowercase of name, computed in Rust; SQLite NOCASE only folds ASCII
            name_key TEXT NOT NULL UNIQUE,
            serving_size REAL NOT NULL CHECK(serving_size > 0),
            serving_unit TEXT NOT NULL,
            category TEXT NOT NULL CHECK(category IN
                ('protein', 'carb', 'fat', 'vegetable', 'fruit', 'dairy', 'other')),

            calories REAL NOT NULL DEFAULT 0,
            protein REAL NOT NULL DEFAULT 0,     -- grams
            carbs REAL NOT NULL DEFAULT 0,       -- grams
            fats REAL NOT NULL DEFAULT 0,        -- grams

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- PROFILES
        -- Biometric inputs plus derived daily targets
        -- ============================================
        CREATE TABLE profiles (
            user_id TEXT PRIMARY KEY,
            height REAL NOT NULL,                -- cm
            weight REAL NOT NULL,                -- kg
            age REAL NOT NULL,                   -- years
            gender TEXT NOT NULL CHECK(gender IN ('male', 'female', 'other')),
            activity_level TEXT NOT NULL CHECK(activity_level IN
                ('sedentary', 'light', 'moderate', 'very_active', 'extra_active')),
            goal TEXT NOT NULL CHECK(goal IN ('lose', 'maintain', 'gain')),

            -- Derived by the target calculator, never written directly
            daily_calories REAL NOT NULL,
            protein_target REAL NOT NULL,
            carbs_target REAL NOT NULL,
            fats_target REAL NOT NULL,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- DIARIES
        -- One per (user, calendar day) with running totals
        -- ============================================
        CREATE TABLE diaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            date TEXT NOT NULL,                  -- ISO date: "2025-01-09"

            total_calories REAL NOT NULL DEFAULT 0,
            total_protein REAL NOT NULL DEFAULT 0,
            total_carbs REAL NOT NULL DEFAULT 0,
            total_fats REAL NOT NULL DEFAULT 0,

            next_entry_id INTEGER NOT NULL DEFAULT 1,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),

            UNIQUE(user_id, date)
        );

        CREATE TABLE diary_meals (
            diary_id INTEGER NOT NULL REFERENCES diaries(id) ON DELETE CASCADE,
            meal_type TEXT NOT NULL CHECK(meal_type IN ('breakfast', 'lunch', 'dinner', 'snack')),
            PRIMARY KEY (diary_id, meal_type)
        );

        -- food_id is a weak reference into food_items, not a foreign key
        CREATE TABLE diary_entries (
            diary_id INTEGER NOT NULL,
            entry_id INTEGER NOT NULL,
            meal_type TEXT NOT NULL,
            food_id INTEGER NOT NULL,
            quantity REAL NOT NULL CHECK(quantity > 0),
            unit TEXT NOT NULL,
            position INTEGER NOT NULL,

            PRIMARY KEY (diary_id, entry_id),
            FOREIGN KEY (diary_id, meal_type)
                REFERENCES diary_meals(diary_id, meal_type) ON DELETE CASCADE
        );

        CREATE INDEX idx_diary_entries_food ON diary_entries(food_id);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}
