//! Daily calorie and macronutrient targets
//!
//! BMR uses the Mifflin-St Jeor equation; TDEE scales it by an activity factor;
//! the goal shifts TDEE by a fixed 500 kcal; macros follow a 30/40/30 calorie split.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// kcal per gram of protein or carbohydrate
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;
/// kcal per gram of fat
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Share of daily calories assigned to each macronutrient
pub const PROTEIN_SHARE: f64 = 0.3;
pub const CARBS_SHARE: f64 = 0.4;
pub const FATS_SHARE: f64 = 0.3;

/// Daily adjustment applied for lose/gain goals
pub const GOAL_ADJUSTMENT_KCAL: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    /// Mifflin-St Jeor constant term. `Other` uses the female constant.
    fn bmr_constant(&self) -> f64 {
        match self {
            Gender::Male => 5.0,
            Gender::Female | Gender::Other => -161.0,
        }
    }
}

impl FromStr for Gender {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(CoreError::validation(format!(
                "Unknown gender '{}' (expected male, female or other)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    VeryActive,
    ExtraActive,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::VeryActive => "very_active",
            ActivityLevel::ExtraActive => "extra_active",
        }
    }

    /// TDEE multiplier applied to BMR
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::VeryActive => 1.725,
            ActivityLevel::ExtraActive => 1.9,
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" => Ok(ActivityLevel::Light),
            "moderate" => Ok(ActivityLevel::Moderate),
            "very_active" => Ok(ActivityLevel::VeryActive),
            "extra_active" => Ok(ActivityLevel::ExtraActive),
            other => Err(CoreError::validation(format!(
                "Unknown activity level '{}' (expected sedentary, light, moderate, very_active or extra_active)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    Lose,
    Maintain,
    Gain,
}

impl Goal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::Lose => "lose",
            Goal::Maintain => "maintain",
            Goal::Gain => "gain",
        }
    }

    fn adjust(&self, tdee: f64) -> f64 {
        match self {
            Goal::Lose => tdee - GOAL_ADJUSTMENT_KCAL,
            Goal::Maintain => tdee,
            Goal::Gain => tdee + GOAL_ADJUSTMENT_KCAL,
        }
    }
}

impl FromStr for Goal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lose" => Ok(Goal::Lose),
            "maintain" => Ok(Goal::Maintain),
            "gain" => Ok(Goal::Gain),
            other => Err(CoreError::validation(format!(
                "Unknown goal '{}' (expected lose, maintain or gain)",
                other
            ))),
        }
    }
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(Gender, ActivityLevel, Goal);

/// Calculator inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiometricProfile {
    pub height: f64, // cm
    pub weight: f64, // kg
    pub age: f64,    // years
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
}

impl BiometricProfile {
    /// Build from boundary strings, rejecting values outside the enumerated sets
    pub fn parse(
        height: f64,
        weight: f64,
        age: f64,
        gender: &str,
        activity_level: &str,
        goal: &str,
    ) -> CoreResult<Self> {
        let profile = Self {
            height,
            weight,
            age,
            gender: gender.parse()?,
            activity_level: activity_level.parse()?,
            goal: goal.parse()?,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> CoreResult<()> {
        for (name, value) in [("height", self.height), ("weight", self.weight), ("age", self.age)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::validation(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Gram targets per day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

/// Calculator output. Serialises as `{dailyCalories, macros: {protein, carbs, fats}, bmr, tdee}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionTargets {
    pub daily_calories: f64,
    pub macros: MacroTargets,
    pub bmr: f64,
    pub tdee: f64,
}

/// Mifflin-St Jeor basal metabolic rate, kcal/day
pub fn basal_metabolic_rate(profile: &BiometricProfile) -> f64 {
    10.0 * profile.weight + 6.25 * profile.height - 5.0 * profile.age
        + profile.gender.bmr_constant()
}

/// Split daily calories 30/40/30 into whole grams
pub fn macro_split(daily_calories: f64) -> MacroTargets {
    MacroTargets {
        protein: (daily_calories * PROTEIN_SHARE / KCAL_PER_G_PROTEIN).round(),
        carbs: (daily_calories * CARBS_SHARE / KCAL_PER_G_CARBS).round(),
        fats: (daily_calories * FATS_SHARE / KCAL_PER_G_FAT).round(),
    }
}

/// Derive daily calories and macro targets. Pure: same profile, same result.
pub fn compute_targets(profile: &BiometricProfile) -> CoreResult<NutritionTargets> {
    profile.validate()?;

    let bmr = basal_metabolic_rate(profile);
    let tdee = bmr * profile.activity_level.multiplier();
    let daily_calories = profile.goal.adjust(tdee);

    Ok(NutritionTargets {
        daily_calories,
        macros: macro_split(daily_calories),
        bmr,
        tdee,
    })
}
