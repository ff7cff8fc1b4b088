//! Shared nutrition data structure
//!
//! Used by food items (per serving), diary entries (per portion) and diaries (running totals).

use serde::{Deserialize, Serialize};

/// Relative tolerance used when comparing accumulated totals
pub const TOTALS_TOLERANCE: f64 = 1e-6;

/// Energy and macronutrient amounts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64, // grams
    pub carbs: f64,   // grams
    pub fats: f64,    // grams
}

impl Nutrition {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale nutrition values by a multiplier
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            calories: self.calories * multiplier,
            protein: self.protein * multiplier,
            carbs: self.carbs * multiplier,
            fats: self.fats * multiplier,
        }
    }

    pub fn add(&self, other: &Nutrition) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fats: self.fats + other.fats,
        }
    }

    pub fn subtract(&self, other: &Nutrition) -> Self {
        Self {
            calories: self.calories - other.calories,
            protein: self.protein - other.protein,
            carbs: self.carbs - other.carbs,
            fats: self.fats - other.fats,
        }
    }

    /// Named fields, in a stable order, for reporting
    pub fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fats", self.fats),
        ]
    }

    /// First field whose values differ beyond `TOTALS_TOLERANCE`, relative to magnitude
    pub fn first_divergence(&self, other: &Nutrition) -> Option<(&'static str, f64, f64)> {
        self.fields()
            .into_iter()
            .zip(other.fields())
            .find(|((_, a), (_, b))| !approx_eq(*a, *b))
            .map(|((name, a), (_, b))| (name, a, b))
    }

    pub fn approx_eq(&self, other: &Nutrition) -> bool {
        self.first_divergence(other).is_none()
    }
}

/// Relative comparison with an absolute floor of 1.0 so values near zero compare sanely
pub fn approx_eq(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= TOTALS_TOLERANCE * scale
}

impl std::ops::Add for Nutrition {
    type Output = Nutrition;

    fn add(self, other: Nutrition) -> Nutrition {
        Nutrition::add(&self, &other)
    }
}

impl std::ops::Sub for Nutrition {
    type Output = Nutrition;

    fn sub(self, other: Nutrition) -> Nutrition {
        Nutrition::subtract(&self, &other)
    }
}

impl std::ops::Mul<f64> for Nutrition {
    type Output = Nutrition;

    fn mul(self, multiplier: f64) -> Nutrition {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for Nutrition {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Nutrition::zero(), |acc, n| acc + n)
    }
}
