//! Profile model
//!
//! Biometric inputs for one user, stored together with the targets derived from them.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::nutrition::{BiometricProfile, MacroTargets, NutritionTargets};

/// A user's nutrition profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionProfile {
    pub user_id: String,
    pub biometrics: BiometricProfile,
    pub targets: NutritionTargets,
    pub created_at: String,
    pub updated_at: String,
}

fn conversion_error(e: crate::error::CoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

impl NutritionProfile {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let gender: String = row.get("gender")?;
        let activity_level: String = row.get("activity_level")?;
        let goal: String = row.get("goal")?;

        let biometrics = BiometricProfile {
            height: row.get("height")?,
            weight: row.get("weight")?,
            age: row.get("age")?,
            gender: gender.parse().map_err(conversion_error)?,
            activity_level: activity_level.parse().map_err(conversion_error)?,
            goal: goal.parse().map_err(conversion_error)?,
        };

        // bmr/tdee are cheap and not stored
        let bmr = crate::nutrition::basal_metabolic_rate(&biometrics);
        let targets = NutritionTargets {
            daily_calories: row.get("daily_calories")?,
            macros: MacroTargets {
                protein: row.get("protein_target")?,
                carbs: row.get("carbs_target")?,
                fats: row.get("fats_target")?,
            },
            bmr,
            tdee: bmr * biometrics.activity_level.multiplier(),
        };

        Ok(Self {
            user_id: row.get("user_id")?,
            biometrics,
            targets,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn get(conn: &Connection, user_id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM profiles WHERE user_id = ?1")?;

        let result = stmt.query_row([user_id], Self::from_row);
        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set or replace a profile (upsert). Targets must come from the calculator.
    pub fn set(
        conn: &Connection,
        user_id: &str,
        biometrics: &BiometricProfile,
        targets: &NutritionTargets,
    ) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO profiles (
                user_id, height, weight, age, gender, activity_level, goal,
                daily_calories, protein_target, carbs_target, fats_target
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(user_id) DO UPDATE SET
                height = excluded.height,
                weight = excluded.weight,
                age = excluded.age,
                gender = excluded.gender,
                activity_level = excluded.activity_level,
                goal = excluded.goal,
                daily_calories = excluded.daily_calories,
                protein_target = excluded.protein_target,
                carbs_target = excluded.carbs_target,
                fats_target = excluded.fats_target,
                updated_at = datetime('now')
            "#,
            params![
                user_id,
                biometrics.height,
                biometrics.weight,
                biometrics.age,
                biometrics.gender.as_str(),
                biometrics.activity_level.as_str(),
                biometrics.goal.as_str(),
                targets.daily_calories,
                targets.macros.protein,
                targets.macros.carbs,
                targets.macros.fats,
            ],
        )?;

        Self::get(conn, user_id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }
}
