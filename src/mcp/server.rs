//! Calorie Tracker MCP Server Implementation
//!
//! Implements the MCP server with all Calorie Tracker tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::diary::SqliteDiaryEngine;
use crate::error::CoreError;
use crate::models::{FoodCategory, FoodItemCreate, FoodItemUpdate};
use crate::tools::diary;
use crate::tools::foods;
use crate::tools::profiles::{self, ProfileInput};
use crate::tools::status::StatusTracker;

/// Calorie Tracker MCP Service
#[derive(Clone)]
pub struct CalorieTrackerService {
    status_tracker: Arc<StatusTracker>,
    database: Database,
    engine: Arc<SqliteDiaryEngine>,
    tool_router: ToolRouter<CalorieTrackerService>,
}

impl CalorieTrackerService {
    pub fn new(database_path: PathBuf, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(StatusTracker::new(database_path)),
            engine: Arc::new(SqliteDiaryEngine::new(database.clone(), database.clone())),
            database,
            tool_router: Self::tool_router(),
        }
    }
}

/// Map core error kinds onto MCP error codes
fn to_mcp_error(e: CoreError) -> McpError {
    match e {
        CoreError::Validation(message) => McpError::invalid_params(message, None),
        CoreError::NotFound(message) => McpError::resource_not_found(message, None),
        other => {
            tracing::error!(error = %other, "Tool failed");
            McpError::internal_error(other.to_string(), None)
        }
    }
}

fn json_result<T: Serialize>(result: Result<T, CoreError>) -> Result<CallToolResult, McpError> {
    let value = result.map_err(to_mcp_error)?;
    let json = serde_json::to_string_pretty(&value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Profile Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ComputeTargetsParams {
    /// Height in centimetres
    pub height: f64,
    /// Weight in kilograms
    pub weight: f64,
    /// Age in years
    pub age: f64,
    /// male, female or other
    pub gender: String,
    /// sedentary, light, moderate, very_active or extra_active
    pub activity_level: String,
    /// lose, maintain or gain
    pub goal: String,
}

impl ComputeTargetsParams {
    fn input(&self) -> ProfileInput<'_> {
        ProfileInput {
            height: self.height,
            weight: self.weight,
            age: self.age,
            gender: &self.gender,
            activity_level: &self.activity_level,
            goal: &self.goal,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetProfileParams {
    /// Opaque user identifier
    pub user_id: String,
    #[serde(flatten)]
    pub profile: ComputeTargetsParams,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UserParams {
    /// Opaque user identifier
    pub user_id: String,
}

// ============================================================================
// Food Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddFoodParams {
    pub name: String,
    /// Serving size the nutrient values refer to, e.g. 100
    pub serving_size: f64,
    /// Unit of the serving size, e.g. "g", "ml", "count"
    pub serving_unit: String,
    /// protein, carb, fat, vegetable, fruit, dairy or other
    #[serde(default = "default_category")]
    pub category: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

fn default_category() -> String { "other".to_string() }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FoodIdParams {
    /// Food item ID
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListFoodsParams {
    /// Optional category filter
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchFoodsParams {
    /// Case-insensitive substring of the food name
    pub query: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateFoodParams {
    /// Food item ID
    pub id: i64,
    pub name: Option<String>,
    pub serving_size: Option<f64>,
    pub serving_unit: Option<String>,
    pub category: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
}

// ============================================================================
// Diary Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DiaryParams {
    /// Opaque user identifier
    pub user_id: String,
    /// Calendar date (YYYY-MM-DD); defaults to today
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddEntryParams {
    /// Opaque user identifier
    pub user_id: String,
    /// Calendar date (YYYY-MM-DD); defaults to today
    pub date: Option<String>,
    /// breakfast, lunch, dinner or snack
    pub meal_type: String,
    /// Food item ID from the catalog
    pub food_id: i64,
    /// Amount eaten, in the food's serving unit
    pub quantity: f64,
    pub unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveEntryParams {
    /// Opaque user identifier
    pub user_id: String,
    /// Calendar date (YYYY-MM-DD); defaults to today
    pub date: Option<String>,
    /// Food item ID; the first matching entry (breakfast, lunch, dinner, snack order) is removed
    pub food_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveEntryByIdParams {
    /// Opaque user identifier
    pub user_id: String,
    /// Calendar date (YYYY-MM-DD); defaults to today
    pub date: Option<String>,
    /// Entry ID as returned in the diary's foods list
    pub entry_id: i64,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl CalorieTrackerService {
    // --- Status ---

    #[tool(description = "Get the current status of the Calorie Tracker service including build info, database status, and process information")]
    fn service_status(&self) -> Result<CallToolResult, McpError> {
        json_result(Ok(self.status_tracker.get_status()))
    }

    // --- Targets & Profiles ---

    #[tool(description = "Compute daily calorie and macro targets (Mifflin-St Jeor BMR, activity multiplier, goal adjustment, 30/40/30 split) without storing anything")]
    fn compute_targets(&self, Parameters(p): Parameters<ComputeTargetsParams>) -> Result<CallToolResult, McpError> {
        json_result(profiles::compute_targets(&p.input()))
    }

    #[tool(description = "Store a user's biometric profile and the targets derived from it (replaces any existing profile)")]
    fn set_profile(&self, Parameters(p): Parameters<SetProfileParams>) -> Result<CallToolResult, McpError> {
        json_result(profiles::set_profile(&self.database, &p.user_id, &p.profile.input()))
    }

    #[tool(description = "Get a user's stored profile and nutrition targets")]
    fn get_profile(&self, Parameters(p): Parameters<UserParams>) -> Result<CallToolResult, McpError> {
        json_result(profiles::get_profile(&self.database, &p.user_id))
    }

    // --- Food Catalog ---

    #[tool(description = "Add a food item with nutrients per serving")]
    fn add_food(&self, Parameters(p): Parameters<AddFoodParams>) -> Result<CallToolResult, McpError> {
        let category: FoodCategory = p.category.parse().map_err(to_mcp_error)?;
        let data = FoodItemCreate {
            name: p.name,
            serving_size: p.serving_size,
            serving_unit: p.serving_unit,
            category,
            calories: p.calories,
            protein: p.protein,
            carbs: p.carbs,
            fats: p.fats,
        };
        json_result(foods::add_food(&self.database, data))
    }

    #[tool(description = "Get a food item by ID, including how many diary entries reference it")]
    fn get_food(&self, Parameters(p): Parameters<FoodIdParams>) -> Result<CallToolResult, McpError> {
        json_result(foods::get_food(&self.database, p.id))
    }

    #[tool(description = "List all food items, optionally filtered by category")]
    fn list_foods(&self, Parameters(p): Parameters<ListFoodsParams>) -> Result<CallToolResult, McpError> {
        json_result(foods::list_foods(&self.database, p.category.as_deref()))
    }

    #[tool(description = "Search food items by name (case-insensitive substring)")]
    fn search_foods(&self, Parameters(p): Parameters<SearchFoodsParams>) -> Result<CallToolResult, McpError> {
        json_result(foods::search_foods(self.engine.catalog(), &p.query))
    }

    #[tool(description = "Update a food item. Only provided fields are changed. Entries already logged keep their stored totals")]
    fn update_food(&self, Parameters(p): Parameters<UpdateFoodParams>) -> Result<CallToolResult, McpError> {
        let category = p
            .category
            .as_deref()
            .map(str::parse::<FoodCategory>)
            .transpose()
            .map_err(to_mcp_error)?;
        let data = FoodItemUpdate {
            name: p.name,
            serving_size: p.serving_size,
            serving_unit: p.serving_unit,
            category,
            calories: p.calories,
            protein: p.protein,
            carbs: p.carbs,
            fats: p.fats,
        };
        json_result(foods::update_food(&self.database, p.id, data))
    }

    #[tool(description = "Delete a food item. Refused while any diary entry references it")]
    fn delete_food(&self, Parameters(p): Parameters<FoodIdParams>) -> Result<CallToolResult, McpError> {
        json_result(foods::delete_food(&self.database, p.id))
    }

    // --- Diary ---

    #[tool(description = "Get a user's diary for a date: meals with their entries and running totals. Days with nothing logged return zero totals")]
    fn get_diary(&self, Parameters(p): Parameters<DiaryParams>) -> Result<CallToolResult, McpError> {
        json_result(diary::get_diary(&self.engine, &p.user_id, p.date.as_deref()))
    }

    #[tool(description = "Log a portion of a catalog food to a meal and update the day's totals")]
    fn add_entry(&self, Parameters(p): Parameters<AddEntryParams>) -> Result<CallToolResult, McpError> {
        json_result(diary::add_entry(
            &self.engine,
            &p.user_id,
            p.date.as_deref(),
            &p.meal_type,
            p.food_id,
            p.quantity,
            &p.unit,
        ))
    }

    #[tool(description = "Remove the first logged entry of a food (meals scanned breakfast, lunch, dinner, snack). Prefer remove_entry_by_id to target a specific entry")]
    fn remove_entry(&self, Parameters(p): Parameters<RemoveEntryParams>) -> Result<CallToolResult, McpError> {
        json_result(diary::remove_entry(&self.engine, &p.user_id, p.date.as_deref(), p.food_id))
    }

    #[tool(description = "Remove one specific diary entry by its entry ID")]
    fn remove_entry_by_id(&self, Parameters(p): Parameters<RemoveEntryByIdParams>) -> Result<CallToolResult, McpError> {
        json_result(diary::remove_entry_by_id(&self.engine, &p.user_id, p.date.as_deref(), p.entry_id))
    }

    #[tool(description = "Recompute a diary's totals from current catalog values and compare them with the stored running totals. Read-only")]
    fn verify_diary(&self, Parameters(p): Parameters<DiaryParams>) -> Result<CallToolResult, McpError> {
        json_result(diary::verify_diary(&self.engine, &p.user_id, p.date.as_deref()))
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for CalorieTrackerService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: crate::build_info::NAME.into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Calorie Tracker".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Calorie Tracker - food diary and nutrition targets. \
                 Targets: compute_targets, set_profile/get_profile. \
                 Foods: add/get/list/search/update/delete_food (nutrients are per serving). \
                 Diary: get_diary, add_entry, remove_entry (first match by food), remove_entry_by_id, verify_diary. \
                 Diary tools take an optional date (YYYY-MM-DD) and default to today."
                    .into(),
            ),
        }
    }
}
