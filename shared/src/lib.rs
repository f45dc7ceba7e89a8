use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const TITLE_MAX_CHARS: usize = 255;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(
    feature = "db",
    derive(sea_orm::EnumIter, sea_orm::DeriveActiveEnum),
    sea_orm(rs_type = "i32", db_type = "Integer")
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[cfg_attr(feature = "db", sea_orm(num_value = 0))]
    Low,
    #[default]
    #[cfg_attr(feature = "db", sea_orm(num_value = 1))]
    Medium,
    #[cfg_attr(feature = "db", sea_orm(num_value = 2))]
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} '{value}', expected one of: {expected}")]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(ParseEnumError {
                field: "priority",
                value: s.to_string(),
                expected: "low, medium, high",
            }),
        }
    }
}

/// A todo item as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/tasks`. `title` is optional here so a missing title
/// surfaces as a validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Body of `PUT /api/tasks/:id`. Omitted fields are left untouched.
///
/// `due_date` distinguishes "absent" (`None`) from an explicit `null`
/// (`Some(None)`), which clears the stored due date. `title`, `completed`
/// and `priority` cannot be null; `description: null` reads as omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(
        default,
        deserialize_with = "non_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed: Option<bool>,
    #[serde(
        default,
        deserialize_with = "non_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority: Option<Priority>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = DateTime))]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// A present field must hold a value; only absence maps to `None`.
fn non_null<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    CreatedAt,
    UpdatedAt,
    DueDate,
    Priority,
    Title,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::CreatedAt => "created_at",
            SortBy::UpdatedAt => "updated_at",
            SortBy::DueDate => "due_date",
            SortBy::Priority => "priority",
            SortBy::Title => "title",
        }
    }
}

impl FromStr for SortBy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" | "createdAt" => Ok(SortBy::CreatedAt),
            "updated_at" | "updatedAt" => Ok(SortBy::UpdatedAt),
            "due_date" | "dueDate" => Ok(SortBy::DueDate),
            "priority" => Ok(SortBy::Priority),
            "title" => Ok(SortBy::Title),
            _ => Err(ParseEnumError {
                field: "sortBy",
                value: s.to_string(),
                expected: "created_at, updated_at, due_date, priority, title",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortOrder::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortOrder::Desc)
        } else {
            Err(ParseEnumError {
                field: "sortOrder",
                value: s.to_string(),
                expected: "ASC, DESC",
            })
        }
    }
}

/// Typed form of the `GET /api/tasks` query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListQuery {
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    /// 1-based.
    pub page: u64,
    pub limit: u64,
}

impl Default for TaskListQuery {
    fn default() -> Self {
        Self {
            completed: None,
            priority: None,
            search: None,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TaskListQuery {
    /// Query-string pairs in the names the server expects. Values are not
    /// percent-encoded.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("sortBy", self.sort_by.as_str().to_string()),
            ("sortOrder", self.sort_order.as_str().to_string()),
        ];
        if let Some(completed) = self.completed {
            pairs.push(("completed", completed.to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TitleError {
    #[error("Title must not be empty")]
    Empty,
    #[error("Title must be at most {max} characters (got {len})")]
    TooLong { max: usize, len: usize },
}

pub fn validate_title(title: &str) -> Result<(), TitleError> {
    if title.trim().is_empty() {
        return Err(TitleError::Empty);
    }
    let len = title.chars().count();
    if len > TITLE_MAX_CHARS {
        return Err(TitleError::TooLong {
            max: TITLE_MAX_CHARS,
            len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serializes_with_camel_case_keys() {
        let now = Utc::now();
        let task = Task {
            id: 7,
            title: "Homework".to_string(),
            description: String::new(),
            completed: false,
            priority: Priority::High,
            due_date: None,
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["priority"], "high");
        assert!(value.get("dueDate").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("due_date").is_none());
    }

    #[test]
    fn update_request_distinguishes_missing_and_null_due_date() {
        let missing: UpdateTaskRequest = serde_json::from_str(r#"{"completed":true}"#).unwrap();
        assert_eq!(missing.due_date, None);
        assert_eq!(missing.completed, Some(true));

        let cleared: UpdateTaskRequest = serde_json::from_str(r#"{"dueDate":null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let set: UpdateTaskRequest =
            serde_json::from_str(r#"{"dueDate":"2024-01-15T23:59:59.999Z"}"#).unwrap();
        assert!(matches!(set.due_date, Some(Some(_))));
    }

    #[test]
    fn update_request_rejects_null_for_required_fields() {
        for body in [
            r#"{"title":null}"#,
            r#"{"completed":null}"#,
            r#"{"priority":null}"#,
        ] {
            assert!(serde_json::from_str::<UpdateTaskRequest>(body).is_err(), "{body}");
        }

        let request: UpdateTaskRequest =
            serde_json::from_str(r#"{"description":null,"title":"Read"}"#).unwrap();
        assert_eq!(request.description, None);
        assert_eq!(request.title.as_deref(), Some("Read"));
    }

    #[test]
    fn update_request_serializes_only_provided_fields() {
        let request = UpdateTaskRequest {
            completed: Some(true),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"completed":true}"#
        );
    }

    #[test]
    fn unknown_priority_is_rejected() {
        assert!(serde_json::from_str::<CreateTaskRequest>(r#"{"title":"a","priority":"urgent"}"#)
            .is_err());
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!("low".parse::<Priority>(), Ok(Priority::Low));
    }

    #[test]
    fn priority_orders_low_to_high() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn sort_parsing_accepts_aliases_and_any_case() {
        assert_eq!("dueDate".parse::<SortBy>(), Ok(SortBy::DueDate));
        assert_eq!("due_date".parse::<SortBy>(), Ok(SortBy::DueDate));
        assert!("id".parse::<SortBy>().is_err());
        assert_eq!("asc".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert_eq!("DeSc".parse::<SortOrder>(), Ok(SortOrder::Desc));
        assert!("up".parse::<SortOrder>().is_err());
    }

    #[test]
    fn title_validation() {
        assert_eq!(validate_title(""), Err(TitleError::Empty));
        assert_eq!(validate_title("   \t"), Err(TitleError::Empty));
        assert!(validate_title("A").is_ok());
        assert!(validate_title(&"é".repeat(TITLE_MAX_CHARS)).is_ok());
        assert_eq!(
            validate_title(&"x".repeat(TITLE_MAX_CHARS + 1)),
            Err(TitleError::TooLong {
                max: TITLE_MAX_CHARS,
                len: TITLE_MAX_CHARS + 1
            })
        );
    }

    #[test]
    fn query_pairs_skip_unset_filters() {
        let query = TaskListQuery {
            completed: Some(false),
            page: 2,
            limit: 5,
            ..Default::default()
        };
        let pairs = query.query_pairs();
        assert!(pairs.contains(&("completed", "false".to_string())));
        assert!(pairs.contains(&("page", "2".to_string())));
        assert!(pairs.contains(&("limit", "5".to_string())));
        assert!(!pairs.iter().any(|(key, _)| *key == "priority" || *key == "search"));
    }
}
