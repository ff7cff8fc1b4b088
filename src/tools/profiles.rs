//! Profile and Target MCP Tools

use serde::Serialize;

use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::NutritionProfile;
use crate::nutrition::{self, ActivityLevel, BiometricProfile, Gender, Goal, NutritionTargets};

/// Raw calculator inputs as received from callers
#[derive(Debug, Clone)]
pub struct ProfileInput<'a> {
    pub height: f64,
    pub weight: f64,
    pub age: f64,
    pub gender: &'a str,
    pub activity_level: &'a str,
    pub goal: &'a str,
}

impl ProfileInput<'_> {
    fn parse(&self) -> CoreResult<BiometricProfile> {
        BiometricProfile::parse(
            self.height,
            self.weight,
            self.age,
            self.gender,
            self.activity_level,
            self.goal,
        )
    }
}

/// Response for set_profile / get_profile
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: String,
    pub height: f64,
    pub weight: f64,
    pub age: f64,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    #[serde(flatten)]
    pub targets: NutritionTargets,
    pub updated_at: String,
}

impl From<NutritionProfile> for ProfileResponse {
    fn from(profile: NutritionProfile) -> Self {
        let biometrics = profile.biometrics;
        Self {
            user_id: profile.user_id,
            height: biometrics.height,
            weight: biometrics.weight,
            age: biometrics.age,
            gender: biometrics.gender,
            activity_level: biometrics.activity_level,
            goal: biometrics.goal,
            targets: profile.targets,
            updated_at: profile.updated_at,
        }
    }
}

/// Run the calculator without storing anything
pub fn compute_targets(input: &ProfileInput) -> CoreResult<NutritionTargets> {
    nutrition::compute_targets(&input.parse()?)
}

/// Validate inputs, derive targets and store both for the user
pub fn set_profile(db: &Database, user_id: &str, input: &ProfileInput) -> CoreResult<ProfileResponse> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(CoreError::validation("user_id cannot be empty"));
    }

    let biometrics = input.parse()?;
    let targets = nutrition::compute_targets(&biometrics)?;
    let profile = db.with_conn(|conn| NutritionProfile::set(conn, user_id, &biometrics, &targets))?;

    tracing::info!(
        user_id,
        daily_calories = targets.daily_calories,
        goal = %biometrics.goal,
        "Stored nutrition profile"
    );
    Ok(ProfileResponse::from(profile))
}

pub fn get_profile(db: &Database, user_id: &str) -> CoreResult<ProfileResponse> {
    db.with_conn(|conn| NutritionProfile::get(conn, user_id.trim()))?
        .map(ProfileResponse::from)
        .ok_or_else(|| CoreError::not_found(format!("No profile for user {}", user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;

    fn input() -> ProfileInput<'static> {
        ProfileInput {
            height: 180.0,
            weight: 80.0,
            age: 25.0,
            gender: "male",
            activity_level: "moderate",
            goal: "maintain",
        }
    }

    #[test]
    fn test_compute_targets_shape() {
        let targets = compute_targets(&input()).unwrap();
        let json = serde_json::to_value(targets).unwrap();
        assert_eq!(json["dailyCalories"], 2797.75);
        assert_eq!(json["macros"]["protein"], 210.0);
        assert_eq!(json["macros"]["carbs"], 280.0);
        assert_eq!(json["macros"]["fats"], 93.0);
    }

    #[test]
    fn test_compute_targets_rejects_unknown_values() {
        for bad in [
            ProfileInput { activity_level: "couch", ..input() },
            ProfileInput { goal: "bulk", ..input() },
            ProfileInput { gender: "", ..input() },
            ProfileInput { age: 0.0, ..input() },
        ] {
            assert!(matches!(compute_targets(&bad), Err(CoreError::Validation(_))));
        }
    }

    #[test]
    fn test_profile_round_trip() {
        let (_dir, db) = temp_database();
        assert!(matches!(get_profile(&db, "u1"), Err(CoreError::NotFound(_))));

        let stored = set_profile(&db, "u1", &input()).unwrap();
        assert_eq!(stored.targets.daily_calories, 2797.75);

        let fetched = get_profile(&db, "u1").unwrap();
        assert_eq!(fetched.gender, Gender::Male);
        assert_eq!(fetched.activity_level, ActivityLevel::Moderate);
        assert_eq!(fetched.targets.macros, stored.targets.macros);

        let json = serde_json::to_value(&fetched).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["activityLevel"], "moderate");
        assert_eq!(json["macros"]["fats"], 93.0);

        assert!(matches!(set_profile(&db, " ", &input()), Err(CoreError::Validation(_))));
    }
}
