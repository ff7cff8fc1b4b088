//! Calorie Tracker Library
//!
//! Nutrition targets and per-day food diaries with incrementally maintained totals.

pub mod build_info;
pub mod config;
pub mod db;
pub mod diary;
pub mod error;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;
