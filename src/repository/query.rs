//! Filtering, sorting and pagination of todo listings.
//!
//! A [`ListOptions`] value fully determines a listing: the predicate
//! ([`TodoFilters`]), a total order ([`Sort`], always finished with an `id`
//! tie-break) and a window ([`Pagination`]). The PostgreSQL gateway renders it
//! as SQL; [`ListOptions::apply`] evaluates the same rules in memory.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::todo::{Todo, TodoPriority, TodoStatus};
use crate::models::ValidationError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Each present filter narrows the listing; all of them are AND-ed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoFilters {
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub user_id: Option<Uuid>,
    /// Match-any; empty means no tag filter.
    pub tags: Vec<String>,
    /// Exclusive lower bound on the due date.
    pub due_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the due date.
    pub due_before: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the title or description.
    pub search: Option<String>,
}

impl TodoFilters {
    pub fn matches(&self, todo: &Todo) -> bool {
        if self.status.is_some_and(|status| todo.status != status) {
            return false;
        }
        if self.priority.is_some_and(|priority| todo.priority != priority) {
            return false;
        }
        if self.user_id.is_some() && todo.user_id != self.user_id {
            return false;
        }
        if !self.tags.is_empty() && !todo.tags.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }
        if let Some(after) = self.due_after {
            if !todo.due_date.is_some_and(|due| due > after) {
                return false;
            }
        }
        if let Some(before) = self.due_before {
            if !todo.due_date.is_some_and(|due| due < before) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = todo.title.to_lowercase().contains(&needle);
            let in_description = todo
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}

/// `ILIKE` pattern matching `search` literally anywhere in the text.
pub fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Status,
    Priority,
    CreatedAt,
    UpdatedAt,
    DueDate,
}

impl SortField {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "title" => Some(SortField::Title),
            "status" => Some(SortField::Status),
            "priority" => Some(SortField::Priority),
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            "dueDate" => Some(SortField::DueDate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Sort {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl Sort {
    /// Parses `field[:direction]`. Unknown fields fall back to the default
    /// order; any direction other than `desc` (any case) is ascending.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(':');
        let field = parts.next().map(str::trim).and_then(SortField::from_token);
        let direction = match parts.next() {
            Some(token) if token.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        match field {
            Some(field) => Sort { field, direction },
            None => Sort::default(),
        }
    }

    /// Total order matching the SQL rendering: the requested column (missing
    /// due dates sort after every date, as PostgreSQL does), then `id`
    /// ascending.
    pub fn compare(&self, a: &Todo, b: &Todo) -> Ordering {
        let primary = match self.field {
            SortField::Title => a.title.cmp(&b.title),
            SortField::Status => a.status.cmp(&b.status),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::DueDate => match (a.due_date, b.due_date) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: i64,
    limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Out-of-range values are rejected, never clamped.
    pub fn new(page: i64, limit: i64) -> Result<Self, ValidationError> {
        if page < 1 {
            return Err(ValidationError::new("page must be a positive integer"));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ValidationError::new(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        Ok(Pagination { page, limit })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub pagination: Pagination,
    pub sort: Sort,
    pub filters: TodoFilters,
}

impl ListOptions {
    /// Filters, sorts and windows `todos`, returning the window and the
    /// number of matches before windowing.
    pub fn apply<'a, I>(&self, todos: I) -> (Vec<&'a Todo>, i64)
    where
        I: IntoIterator<Item = &'a Todo>,
    {
        let mut matching: Vec<&Todo> = todos
            .into_iter()
            .filter(|todo| self.filters.matches(todo))
            .collect();
        matching.sort_by(|a, b| self.sort.compare(a, b));

        let total = matching.len() as i64;
        let offset = usize::try_from(self.pagination.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.pagination.limit()).unwrap_or(usize::MAX);
        let window = matching.into_iter().skip(offset).take(limit).collect();
        (window, total)
    }
}

/// The list envelope: one window of a listing plus its unwindowed total.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        let has_more = pagination.offset().saturating_add(items.len() as i64) < total;
        Page {
            items,
            total,
            page: pagination.page(),
            limit: pagination.limit(),
            has_more,
        }
    }
}
