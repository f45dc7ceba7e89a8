//! Filtered, sorted and paginated reads over the `tasks` table.

use sea_orm::{
    sea_query::{Expr, LikeExpr, Order, SimpleExpr},
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::Deserialize;
use utoipa::IntoParams;
use shared::{
    ParseEnumError, Priority, SortBy, SortOrder, Task, TaskListQuery, TaskPage, MAX_PAGE_SIZE,
};

use super::task::{fold_case, TaskError};
use crate::entities::task;

const LIKE_ESCAPE: char = '\\';

/// Raw `GET /api/tasks` query string. Everything is kept as text so bad
/// values turn into a `TaskError::Validation` with a useful message.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TaskListParams {
    /// `true` or `false`
    pub completed: Option<String>,
    /// `low`, `medium` or `high`
    pub priority: Option<String>,
    /// Case-insensitive substring of the title or description
    pub search: Option<String>,
    /// `created_at` (default), `updated_at`, `due_date`, `priority` or `title`
    pub sort_by: Option<String>,
    /// `ASC` or `DESC` (default)
    pub sort_order: Option<String>,
    /// 1-based page number, default 1
    pub page: Option<String>,
    /// Page size between 1 and 100, default 10
    pub limit: Option<String>,
}

impl TaskListParams {
    pub fn into_query(self) -> Result<TaskListQuery, TaskError> {
        let defaults = TaskListQuery::default();

        let completed = match self.completed.as_deref() {
            None => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => {
                return Err(TaskError::Validation(format!(
                    "invalid completed '{other}', expected true or false"
                )))
            }
        };

        let priority = self
            .priority
            .map(|p| p.parse::<Priority>())
            .transpose()
            .map_err(invalid)?;
        let sort_by = self
            .sort_by
            .map(|s| s.parse::<SortBy>())
            .transpose()
            .map_err(invalid)?
            .unwrap_or(defaults.sort_by);
        let sort_order = self
            .sort_order
            .map(|s| s.parse::<SortOrder>())
            .transpose()
            .map_err(invalid)?
            .unwrap_or(defaults.sort_order);

        let page =
            parse_bounded("page", self.page.as_deref(), 1, u64::MAX)?.unwrap_or(defaults.page);
        let limit = parse_bounded("limit", self.limit.as_deref(), 1, MAX_PAGE_SIZE)?
            .unwrap_or(defaults.limit);

        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(TaskListQuery {
            completed,
            priority,
            search,
            sort_by,
            sort_order,
            page,
            limit,
        })
    }
}

fn invalid(err: ParseEnumError) -> TaskError {
    TaskError::Validation(err.to_string())
}

fn parse_bounded(
    name: &str,
    raw: Option<&str>,
    min: u64,
    max: u64,
) -> Result<Option<u64>, TaskError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if (min..=max).contains(&value) => Ok(Some(value)),
        _ if max == u64::MAX => Err(TaskError::Validation(format!(
            "{name} must be an integer >= {min} (got '{raw}')"
        ))),
        _ => Err(TaskError::Validation(format!(
            "{name} must be an integer between {min} and {max} (got '{raw}')"
        ))),
    }
}

fn sort_column(sort_by: SortBy) -> task::Column {
    match sort_by {
        SortBy::CreatedAt => task::Column::CreatedAt,
        SortBy::UpdatedAt => task::Column::UpdatedAt,
        SortBy::DueDate => task::Column::DueDate,
        SortBy::Priority => task::Column::Priority,
        SortBy::Title => task::Column::Title,
    }
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

fn like_escaped(column: task::Column, pattern: &str) -> SimpleExpr {
    Expr::col(column).like(LikeExpr::new(pattern.to_string()).escape(LIKE_ESCAPE))
}

fn build_condition(query: &TaskListQuery) -> Condition {
    let mut condition = Condition::all();
    if let Some(completed) = query.completed {
        condition = condition.add(task::Column::Completed.eq(completed));
    }
    if let Some(priority) = query.priority {
        condition = condition.add(task::Column::Priority.eq(priority));
    }
    if let Some(search) = &query.search {
        // the search columns are stored folded
        let pattern = format!("%{}%", escape_like(&fold_case(search)));
        condition = condition.add(
            Condition::any()
                .add(like_escaped(task::Column::TitleSearch, &pattern))
                .add(like_escaped(task::Column::DescriptionSearch, &pattern)),
        );
    }
    condition
}

pub async fn list<C: ConnectionTrait>(db: &C, query: &TaskListQuery) -> Result<TaskPage, DbErr> {
    let order = match query.sort_order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    };

    // id breaks ties so rows never move between pages
    let paginator = task::Entity::find()
        .filter(build_condition(query))
        .order_by(sort_column(query.sort_by), order.clone())
        .order_by(task::Column::Id, order)
        .paginate(db, query.limit);

    let total = paginator.num_items().await?;
    let offset = query.page.saturating_sub(1).saturating_mul(query.limit);
    let tasks = if offset >= total {
        Vec::new()
    } else {
        paginator
            .fetch_page(query.page - 1)
            .await?
            .into_iter()
            .map(Task::from)
            .collect::<Vec<_>>()
    };

    tracing::debug!(
        total,
        returned = tasks.len(),
        page = query.page,
        limit = query.limit,
        "Listed tasks"
    );

    Ok(TaskPage {
        tasks,
        total,
        total_pages: total.div_ceil(query.limit),
        current_page: query.page,
    })
}

#[cfg(test)]
mod tests {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};
    use shared::{CreateTaskRequest, UpdateTaskRequest};

    use super::*;
    use crate::models::task as tasks;

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed(
        db: &DatabaseConnection,
        title: &str,
        description: &str,
        priority: Priority,
    ) -> Task {
        tasks::create(
            db,
            &CreateTaskRequest {
                title: Some(title.to_string()),
                description: Some(description.to_string()),
                priority: Some(priority),
                due_date: None,
            },
        )
        .await
        .unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> TaskListParams {
        let mut params = TaskListParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "completed" => params.completed = value,
                "priority" => params.priority = value,
                "search" => params.search = value,
                "sortBy" => params.sort_by = value,
                "sortOrder" => params.sort_order = value,
                "page" => params.page = value,
                "limit" => params.limit = value,
                other => panic!("unknown param {other}"),
            }
        }
        params
    }

    #[test]
    fn empty_params_use_defaults() {
        let query = TaskListParams::default().into_query().unwrap();
        assert_eq!(query, TaskListQuery::default());
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);
        assert_eq!(query.sort_by, SortBy::CreatedAt);
        assert_eq!(query.sort_order, SortOrder::Desc);
    }

    #[test]
    fn params_parse_into_typed_query() {
        let query = params(&[
            ("completed", "false"),
            ("priority", "high"),
            ("search", "  math "),
            ("sortBy", "title"),
            ("sortOrder", "asc"),
            ("page", "3"),
            ("limit", "100"),
        ])
        .into_query()
        .unwrap();

        assert_eq!(query.completed, Some(false));
        assert_eq!(query.priority, Some(Priority::High));
        assert_eq!(query.search.as_deref(), Some("math"));
        assert_eq!(query.sort_by, SortBy::Title);
        assert_eq!(query.sort_order, SortOrder::Asc);
        assert_eq!(query.page, 3);
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = params(&[("search", "   ")]).into_query().unwrap();
        assert_eq!(query.search, None);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for pairs in [
            [("limit", "0")],
            [("limit", "101")],
            [("limit", "abc")],
            [("page", "0")],
            [("page", "-1")],
            [("completed", "yes")],
            [("priority", "urgent")],
            [("sortBy", "id")],
            [("sortOrder", "sideways")],
        ] {
            let err = params(&pairs).into_query().unwrap_err();
            assert!(matches!(err, TaskError::Validation(_)), "{pairs:?}");
        }
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn twelve_tasks_with_limit_five_make_three_pages() {
        let db = setup_db().await;
        for i in 0..12 {
            seed(&db, &format!("Task {i}"), "", Priority::Medium).await;
        }

        let mut query = TaskListQuery {
            limit: 5,
            ..Default::default()
        };
        let first = list(&db, &query).await.unwrap();
        assert_eq!(first.total, 12);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.current_page, 1);
        assert_eq!(first.tasks.len(), 5);

        query.page = 3;
        let last = list(&db, &query).await.unwrap();
        assert_eq!(last.tasks.len(), 2);
        assert_eq!(last.current_page, 3);

        query.page = 4;
        let past_end = list(&db, &query).await.unwrap();
        assert!(past_end.tasks.is_empty());
        assert_eq!(past_end.total, 12);
        assert_eq!(past_end.total_pages, 3);
        assert_eq!(past_end.current_page, 4);
    }

    #[tokio::test]
    async fn default_order_is_newest_first() {
        let db = setup_db().await;
        let first = seed(&db, "first", "", Priority::Medium).await;
        let second = seed(&db, "second", "", Priority::Medium).await;

        let page = list(&db, &TaskListQuery::default()).await.unwrap();
        let ids: Vec<i64> = page.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn no_matches_yield_zero_pages() {
        let db = setup_db().await;

        let page = list(&db, &TaskListQuery::default()).await.unwrap();
        assert!(page.tasks.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.current_page, 1);

        seed(&db, "Groceries", "milk", Priority::Low).await;
        let page = list(
            &db,
            &TaskListQuery {
                search: Some("nothing like this".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_over_title_and_description() {
        let db = setup_db().await;
        let homework = seed(&db, "Homework", "Do the Math exercises", Priority::Medium).await;
        let exam = seed(&db, "MATH exam", "", Priority::High).await;
        seed(&db, "Groceries", "milk, bread", Priority::Low).await;

        let page = list(
            &db,
            &TaskListQuery {
                search: Some("math".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut ids: Vec<i64> = page.tasks.iter().map(|t| t.id).collect();
        ids.sort();
        assert_eq!(ids, vec![homework.id, exam.id]);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn search_folds_non_ascii_case() {
        let db = setup_db().await;
        let homework = seed(&db, "Домашнее задание", "Упражнения по Математике", Priority::Medium).await;
        let exam = seed(&db, "ЭКЗАМЕН", "", Priority::High).await;
        seed(&db, "Покупки", "молоко", Priority::Low).await;

        for needle in ["математике", "Математике", "МАТЕМАТИКЕ"] {
            let page = list(
                &db,
                &TaskListQuery {
                    search: Some(needle.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            assert_eq!(page.total, 1, "{needle}");
            assert_eq!(page.tasks[0].id, homework.id);
        }

        let page = list(
            &db,
            &TaskListQuery {
                search: Some("экзамен".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tasks[0].id, exam.id);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let db = setup_db().await;
        let sale = seed(&db, "50% off", "", Priority::Medium).await;
        seed(&db, "500 items", "", Priority::Medium).await;

        let page = list(
            &db,
            &TaskListQuery {
                search: Some("0%".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tasks[0].id, sale.id);
    }

    #[tokio::test]
    async fn filters_combine_with_search() {
        let db = setup_db().await;
        let done = seed(&db, "Read book", "", Priority::High).await;
        seed(&db, "Read paper", "", Priority::High).await;
        seed(&db, "Read news", "", Priority::Low).await;
        tasks::update(
            &db,
            done.id,
            &UpdateTaskRequest {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let completed = list(
            &db,
            &TaskListQuery {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(completed.total, 1);
        assert_eq!(completed.tasks[0].id, done.id);

        let active_high = list(
            &db,
            &TaskListQuery {
                completed: Some(false),
                priority: Some(Priority::High),
                search: Some("read".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(active_high.total, 1);
        assert_eq!(active_high.tasks[0].title, "Read paper");
    }

    #[tokio::test]
    async fn priority_sort_follows_ordinal_order() {
        let db = setup_db().await;
        seed(&db, "medium", "", Priority::Medium).await;
        seed(&db, "high", "", Priority::High).await;
        seed(&db, "low", "", Priority::Low).await;

        let asc = list(
            &db,
            &TaskListQuery {
                sort_by: SortBy::Priority,
                sort_order: SortOrder::Asc,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let priorities: Vec<Priority> = asc.tasks.iter().map(|t| t.priority).collect();
        assert_eq!(priorities, vec![Priority::Low, Priority::Medium, Priority::High]);

        let desc = list(
            &db,
            &TaskListQuery {
                sort_by: SortBy::Priority,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(desc.tasks[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn title_sort_ascending() {
        let db = setup_db().await;
        for title in ["banana", "apple", "cherry"] {
            seed(&db, title, "", Priority::Medium).await;
        }

        let page = list(
            &db,
            &TaskListQuery {
                sort_by: SortBy::Title,
                sort_order: SortOrder::Asc,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let titles: Vec<&str> = page.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["apple", "banana", "cherry"]);
    }
}
