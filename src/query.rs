//! Filtering, sorting and statistics over an in-memory todo list.
//!
//! Pure data-in/data-out: callers load todos from the store, run them
//! through here, and serialize the result. Nothing in this module touches
//! the database or the clock — `now` is always passed in, which keeps the
//! tests deterministic.

use crate::models::{Priority, Todo};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

// ── Filtering ─────────────────────────────────────────────────

/// Predicates combine with AND. A `None`/`false` field means "don't care".
/// Unrecognized values never make it in here — the API layer drops them
/// while parsing the query string.
#[derive(Debug, Default, Clone)]
pub struct TodoFilter {
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub overdue: bool,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl TodoFilter {
    pub fn matches(&self, todo: &Todo, now: DateTime<Utc>) -> bool {
        if let Some(completed) = self.completed {
            if todo.completed != completed {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if todo.priority != priority {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if todo.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !todo.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if self.overdue && !todo.is_overdue(now) {
            return false;
        }
        if let Some(from) = self.created_from {
            if todo.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if todo.created_at > to {
                return false;
            }
        }
        true
    }
}

/// Keep the todos satisfying every predicate, in their original order.
pub fn filter_todos(todos: Vec<Todo>, filter: &TodoFilter, now: DateTime<Utc>) -> Vec<Todo> {
    todos
        .into_iter()
        .filter(|t| filter.matches(t, now))
        .collect()
}

// ── Sorting ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Priority,
    CreatedAt,
    DueDate,
    Completed,
}

impl SortKey {
    /// Unknown keys are `None`; the caller then leaves the list untouched.
    pub fn parse(s: &str) -> Option<SortKey> {
        match s {
            "priority" => Some(SortKey::Priority),
            "created_at" => Some(SortKey::CreatedAt),
            "due_date" => Some(SortKey::DueDate),
            "completed" => Some(SortKey::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> SortOrder {
        if s.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    fn apply(&self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// Stable in-place sort. `key == None` (unknown sort key) is a no-op so the
/// filtered order survives unchanged.
///
/// Two deliberate asymmetries, both display-driven:
/// - priority ties break by `created_at` ascending whatever the direction;
/// - todos without a due date go last whatever the direction.
pub fn sort_todos(todos: &mut [Todo], key: Option<SortKey>, order: SortOrder) {
    let Some(key) = key else { return };

    match key {
        SortKey::Priority => todos.sort_by(|a, b| {
            // Priority derives Ord as Low < Medium < High, but "ascending"
            // here means most urgent first.
            order
                .apply(b.priority.cmp(&a.priority))
                .then_with(|| a.created_at.cmp(&b.created_at))
        }),
        SortKey::CreatedAt => todos.sort_by(|a, b| order.apply(a.created_at.cmp(&b.created_at))),
        SortKey::DueDate => todos.sort_by(|a, b| match (a.due_date, b.due_date) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => order.apply(x.cmp(&y)),
        }),
        SortKey::Completed => todos.sort_by(|a, b| order.apply(a.completed.cmp(&b.completed))),
    }
}

// ── Statistics ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityStats {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub completion_rate: f64,
    pub priority_stats: PriorityStats,
    pub overdue: usize,
    pub today: usize,
}

/// Aggregate counts over a todo collection. Defined for the empty case:
/// everything zero, completion_rate 0.0 (no division).
///
/// "Today" means the UTC calendar date of `now`.
pub fn compute_stats(todos: &[Todo], now: DateTime<Utc>) -> Stats {
    let total = todos.len();
    let completed = todos.iter().filter(|t| t.completed).count();
    let pending = total - completed;

    let completion_rate = if total > 0 {
        round1(completed as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    let priority_stats = PriorityStats {
        high: todos.iter().filter(|t| t.priority == Priority::High).count(),
        medium: todos
            .iter()
            .filter(|t| t.priority == Priority::Medium)
            .count(),
        low: todos.iter().filter(|t| t.priority == Priority::Low).count(),
    };

    let overdue = todos.iter().filter(|t| t.is_overdue(now)).count();

    let today_date = now.date_naive();
    let today = todos
        .iter()
        .filter(|t| t.created_at.date_naive() == today_date)
        .count();

    Stats {
        total,
        completed,
        pending,
        completion_rate,
        priority_stats,
        overdue,
        today,
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

// ── Tests ──────────────────────────────────────────────────────
