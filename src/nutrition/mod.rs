//! Nutrition calculation module
//!
//! Daily target derivation from biometric inputs.

pub mod targets;

pub use targets::{
    basal_metabolic_rate, compute_targets, macro_split, ActivityLevel, BiometricProfile, Gender,
    Goal, MacroTargets, NutritionTargets,
};
