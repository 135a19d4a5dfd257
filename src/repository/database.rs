use std::collections::HashMap;

use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::dsl::sql;
use diesel::r2d2::{self, ConnectionManager, PooledConnection};
use diesel::sql_types::Varchar;
use tracing::debug;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::subtask::{NewSubTask, SubTask};
use crate::models::todo::{NewTodo, Todo, TodoInput, TodoItemData, TodoPatch};
use crate::models::user::User;
use crate::models::{next_update, now};
use crate::repository::query::{like_pattern, ListOptions, Sort, SortDirection, SortField, TodoFilters};
use crate::repository::rows::{
    SubTaskRow, TodoChanges, TodoPriorityColumn, TodoRow, TodoStatusColumn, UserRow,
};
use crate::repository::schema::{subtasks, todos, users};
use crate::repository::{RepositoryError, RepositoryResult, TodoRepository};

type DBPool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DBPool,
}

impl Database {
    /// Builds the pool, failing if no connection can be established.
    pub fn new(config: &DatabaseConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.url);
        let pool: DBPool = r2d2::Pool::builder()
            .max_size(config.pool_size)
            .build(manager)?;
        Ok(Database { pool })
    }

    fn conn(&self) -> RepositoryResult<PooledConnection<ConnectionManager<PgConnection>>> {
        Ok(self.pool.get()?)
    }
}

fn filtered(filters: &TodoFilters) -> todos::BoxedQuery<'static, Pg> {
    let mut query = todos::table.into_boxed();
    if let Some(status) = filters.status {
        query = query.filter(todos::status.eq(TodoStatusColumn(status)));
    }
    if let Some(priority) = filters.priority {
        query = query.filter(todos::priority.eq(TodoPriorityColumn(priority)));
    }
    if let Some(owner) = filters.user_id {
        query = query.filter(todos::user_id.eq(owner));
    }
    if !filters.tags.is_empty() {
        query = query.filter(todos::tags.overlaps_with(filters.tags.clone()));
    }
    if let Some(after) = filters.due_after {
        query = query.filter(todos::due_date.gt(after));
    }
    if let Some(before) = filters.due_before {
        query = query.filter(todos::due_date.lt(before));
    }
    if let Some(search) = &filters.search {
        let pattern = like_pattern(search);
        query = query.filter(
            todos::title
                .ilike(pattern.clone())
                .or(todos::description.ilike(pattern)),
        );
    }
    query
}

fn sorted(query: todos::BoxedQuery<'static, Pg>, sort: Sort) -> todos::BoxedQuery<'static, Pg> {
    macro_rules! by {
        ($column:expr) => {
            match sort.direction {
                SortDirection::Asc => query.order($column.asc()),
                SortDirection::Desc => query.order($column.desc()),
            }
        };
    }
    let query = match sort.field {
        // byte order, independent of the database's default collation
        SortField::Title => by!(sql::<Varchar>(r#""title" COLLATE "C""#)),
        SortField::Status => by!(todos::status),
        SortField::Priority => by!(todos::priority),
        SortField::CreatedAt => by!(todos::created_at),
        SortField::UpdatedAt => by!(todos::updated_at),
        SortField::DueDate => by!(todos::due_date),
    };
    query.then_order_by(todos::id.asc())
}

/// Attaches subtasks and owners to `rows`, keeping their order.
fn resolve(conn: &mut PgConnection, rows: Vec<TodoRow>) -> RepositoryResult<Vec<TodoItemData>> {
    let children = SubTaskRow::belonging_to(&rows)
        .select(SubTaskRow::as_select())
        .order((subtasks::created_at.asc(), subtasks::id.asc()))
        .load::<SubTaskRow>(conn)?
        .grouped_by(&rows);

    let owner_ids: Vec<Uuid> = rows.iter().filter_map(|row| row.user_id).collect();
    let owners: HashMap<Uuid, User> = if owner_ids.is_empty() {
        HashMap::new()
    } else {
        users::table
            .filter(users::id.eq_any(owner_ids))
            .select(UserRow::as_select())
            .load::<UserRow>(conn)?
            .into_iter()
            .map(|row| (row.id, User::from(row)))
            .collect()
    };

    Ok(rows
        .into_iter()
        .zip(children)
        .map(|(row, children)| {
            let todo = Todo::from(row);
            let user = todo.user_id.and_then(|id| owners.get(&id).cloned());
            TodoItemData {
                todo,
                sub_tasks: children.into_iter().map(SubTask::from).collect(),
                user,
            }
        })
        .collect())
}

fn resolve_one(conn: &mut PgConnection, row: TodoRow) -> RepositoryResult<TodoItemData> {
    resolve(conn, vec![row])?
        .pop()
        .ok_or(RepositoryError::Query(diesel::result::Error::NotFound))
}

fn lock_todo(conn: &mut PgConnection, todo_id: Uuid) -> RepositoryResult<Option<Todo>> {
    let row = todos::table
        .find(todo_id)
        .select(TodoRow::as_select())
        .for_update()
        .first::<TodoRow>(conn)
        .optional()?;
    Ok(row.map(Todo::from))
}

fn store(conn: &mut PgConnection, todo: &Todo) -> RepositoryResult<TodoRow> {
    let row = diesel::update(todos::table.find(todo.id))
        .set(TodoChanges::from(todo))
        .returning(TodoRow::as_returning())
        .get_result(conn)?;
    Ok(row)
}

fn todo_exists(conn: &mut PgConnection, todo_id: Uuid) -> RepositoryResult<bool> {
    let exists = diesel::select(diesel::dsl::exists(todos::table.find(todo_id))).get_result(conn)?;
    Ok(exists)
}

impl TodoRepository for Database {
    fn find_all(&self, options: &ListOptions) -> RepositoryResult<(Vec<TodoItemData>, i64)> {
        let mut conn = self.conn()?;
        conn.build_transaction()
            .read_only()
            .repeatable_read()
            .run(|conn| {
                let total: i64 = filtered(&options.filters).count().get_result(conn)?;
                let rows = sorted(filtered(&options.filters), options.sort)
                    .offset(options.pagination.offset())
                    .limit(options.pagination.limit())
                    .select(TodoRow::as_select())
                    .load::<TodoRow>(conn)?;
                debug!(total, rows = rows.len(), "Loaded todo page");
                Ok((resolve(conn, rows)?, total))
            })
    }

    fn find_by_id(&self, todo_id: Uuid) -> RepositoryResult<Option<TodoItemData>> {
        let mut conn = self.conn()?;
        let row = todos::table
            .find(todo_id)
            .select(TodoRow::as_select())
            .first::<TodoRow>(&mut conn)
            .optional()?;
        row.map(|row| resolve_one(&mut conn, row)).transpose()
    }

    fn create(&self, new_todo: NewTodo) -> RepositoryResult<TodoItemData> {
        let at = now();
        let todo = Todo::new(Uuid::new_v4(), new_todo.todo, at);
        let children: Vec<SubTaskRow> = new_todo
            .sub_tasks
            .into_iter()
            .map(|input| SubTaskRow::from(&SubTask::new(Uuid::new_v4(), todo.id, input, at)))
            .collect();

        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let row = diesel::insert_into(todos::table)
                .values(TodoRow::from(&todo))
                .returning(TodoRow::as_returning())
                .get_result(conn)?;
            if !children.is_empty() {
                diesel::insert_into(subtasks::table)
                    .values(children)
                    .execute(conn)?;
            }
            resolve_one(conn, row)
        })
    }

    fn replace(&self, todo_id: Uuid, input: TodoInput) -> RepositoryResult<Option<TodoItemData>> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let Some(mut todo) = lock_todo(conn, todo_id)? else {
                return Ok(None);
            };
            let at = next_update(todo.updated_at);
            todo.replace_with(input, at);
            let row = store(conn, &todo)?;
            resolve_one(conn, row).map(Some)
        })
    }

    fn patch(&self, todo_id: Uuid, patch: TodoPatch) -> RepositoryResult<Option<TodoItemData>> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let Some(mut todo) = lock_todo(conn, todo_id)? else {
                return Ok(None);
            };
            let at = next_update(todo.updated_at);
            patch.apply(&mut todo, at);
            let row = store(conn, &todo)?;
            resolve_one(conn, row).map(Some)
        })
    }

    fn delete(&self, todo_id: Uuid) -> RepositoryResult<bool> {
        let count = diesel::delete(todos::table.find(todo_id)).execute(&mut self.conn()?)?;
        Ok(count > 0)
    }

    fn find_subtasks(&self, todo_id: Uuid) -> RepositoryResult<Option<Vec<SubTask>>> {
        let mut conn = self.conn()?;
        conn.build_transaction()
            .read_only()
            .run(|conn| {
                if !todo_exists(conn, todo_id)? {
                    return Ok(None);
                }
                let children = subtasks::table
                    .filter(subtasks::todo_id.eq(todo_id))
                    .order((subtasks::created_at.asc(), subtasks::id.asc()))
                    .select(SubTaskRow::as_select())
                    .load::<SubTaskRow>(conn)?;
                Ok(Some(children.into_iter().map(SubTask::from).collect()))
            })
    }

    fn add_subtask(&self, todo_id: Uuid, input: NewSubTask) -> RepositoryResult<Option<SubTask>> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            if !todo_exists(conn, todo_id)? {
                return Ok(None);
            }
            let subtask = SubTask::new(Uuid::new_v4(), todo_id, input, now());
            let row = diesel::insert_into(subtasks::table)
                .values(SubTaskRow::from(&subtask))
                .returning(SubTaskRow::as_returning())
                .get_result(conn)?;
            Ok(Some(SubTask::from(row)))
        })
    }

    fn find_subtask_by_id(&self, subtask_id: Uuid) -> RepositoryResult<Option<SubTask>> {
        let row = subtasks::table
            .find(subtask_id)
            .select(SubTaskRow::as_select())
            .first::<SubTaskRow>(&mut self.conn()?)
            .optional()?;
        Ok(row.map(SubTask::from))
    }

    fn ping(&self) -> RepositoryResult<()> {
        diesel::sql_query("SELECT 1").execute(&mut self.conn()?)?;
        Ok(())
    }
}
