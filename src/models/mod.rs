//! Data models
//!
//! Rust structs representing database entities.

mod diary;
mod food_item;
mod nutrition;
mod profile;

pub use diary::{parse_date, DailyDiary, DiaryEntry, MealType, Meals};
pub use food_item::{FoodCategory, FoodItem, FoodItemCreate, FoodItemUpdate};
pub use nutrition::{approx_eq, Nutrition, TOTALS_TOLERANCE};
pub use profile::NutritionProfile;
