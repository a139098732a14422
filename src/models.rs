use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Domain entities ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Lenient parse for filter input. Unknown strings are `None`, not an
    /// error — filters ignore vocabulary they don't recognize.
    pub fn parse(s: &str) -> Option<Priority> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// A todo — the unit of work.
///
/// `completed_at` is Some iff `completed` is true; the only two places that
/// flip `completed` (the complete/uncomplete handlers) maintain both fields
/// together. `created_at` is set at insert and never touched again.
///
/// This is the stored record: it goes through postcard, which is positional,
/// so no field-skipping serde attrs here. JSON shaping lives in
/// `TodoResponse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    pub id: u64,
    pub content: String,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    /// Estimated effort in minutes.
    pub estimated_time: Option<u32>,
    /// Actual effort in minutes.
    pub actual_time: Option<u32>,
}

impl Todo {
    /// Overdue = due date strictly in the past and not completed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => !self.completed && due < now,
            None => false,
        }
    }

    /// Whole days until the due date. None when completed or undated.
    pub fn days_until_due(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.completed {
            return None;
        }
        self.due_date.map(|due| (due - now).num_days())
    }

    /// Minutes from creation to completion, for completed todos.
    pub fn completion_time(&self) -> Option<i64> {
        self.completed_at
            .map(|done| (done - self.created_at).num_seconds() / 60)
    }
}

/// Stored record, postcard-encoded like `Todo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

// ── API request/response types ────────────────────────────────

/// Due dates arrive as strings so the lenient multi-format parser can run
/// on request bodies too, not just query strings.
#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub content: String,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    pub due_date: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub estimated_time: Option<u32>,
}

fn default_priority() -> Priority {
    Priority::Medium
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub content: Option<String>,
    pub priority: Option<Priority>,
    /// Absent leaves the due date alone; an explicit null (or empty string)
    /// clears it. The double Option keeps those two cases apart.
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub estimated_time: Option<u32>,
    pub actual_time: Option<u32>,
}

fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::deserialize(de).map(Some)
}

#[derive(Debug, Clone, Serialize)]
pub struct TodoResponse {
    pub id: u64,
    pub content: String,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub estimated_time: Option<u32>,
    pub actual_time: Option<u32>,
    pub is_overdue: bool,
    pub days_until_due: Option<i64>,
    pub completion_time: Option<i64>,
}

impl TodoResponse {
    pub fn from_todo(todo: Todo, now: DateTime<Utc>) -> Self {
        let is_overdue = todo.is_overdue(now);
        let days_until_due = todo.days_until_due(now);
        let completion_time = todo.completion_time();
        TodoResponse {
            id: todo.id,
            content: todo.content,
            completed: todo.completed,
            priority: todo.priority,
            created_at: todo.created_at,
            completed_at: todo.completed_at,
            due_date: todo.due_date,
            category: todo.category,
            tags: todo.tags,
            notes: todo.notes,
            estimated_time: todo.estimated_time,
            actual_time: todo.actual_time,
            is_overdue,
            days_until_due,
            completion_time,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default = "default_category_color")]
    pub color: String,
    pub description: Option<String>,
}

fn default_category_color() -> String {
    "#667eea".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: u64,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub todo_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    #[serde(default = "default_tag_color")]
    pub color: String,
}

fn default_tag_color() -> String {
    "#6c757d".to_string()
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    pub ids: Vec<u64>,
    pub updates: UpdateTodoRequest,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub struct TodoTimes {
    pub created_formatted: String,
    pub created_relative: String,
    pub completed_formatted: Option<String>,
    pub completed_relative: Option<String>,
}
