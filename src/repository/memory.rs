use std::sync::{Arc, Mutex};

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::models::subtask::{NewSubTask, SubTask};
use crate::models::todo::{NewTodo, Todo, TodoInput, TodoItemData, TodoPatch};
use crate::models::user::User;
use crate::models::{next_update, now};
use crate::repository::query::ListOptions;
use crate::repository::{RepositoryError, RepositoryResult, TodoRepository};

#[derive(Default)]
struct Store {
    todos: Vec<Todo>,
    subtasks: Vec<SubTask>,
    users: Vec<User>,
}

impl Store {
    fn resolve(&self, todo: &Todo) -> TodoItemData {
        let mut sub_tasks: Vec<SubTask> = self
            .subtasks
            .iter()
            .filter(|subtask| subtask.todo_id == todo.id)
            .cloned()
            .collect();
        sub_tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let user = todo
            .user_id
            .and_then(|id| self.users.iter().find(|user| user.id == id).cloned());
        TodoItemData {
            todo: todo.clone(),
            sub_tasks,
            user,
        }
    }

    /// Fails like the `todos.user_id` foreign key when `owner` names no user.
    fn check_owner(&self, owner: Option<Uuid>) -> RepositoryResult<()> {
        match owner {
            Some(id) if !self.users.iter().any(|user| user.id == id) => {
                Err(RepositoryError::Query(DieselError::DatabaseError(
                    DatabaseErrorKind::ForeignKeyViolation,
                    Box::new(format!("user {id} does not exist")),
                )))
            }
            _ => Ok(()),
        }
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.todos.iter().position(|todo| todo.id == id)
    }
}

/// Process-local gateway with the same semantics as the PostgreSQL one.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.store.lock().unwrap().users.push(user);
    }
}

impl TodoRepository for InMemoryRepository {
    fn find_all(&self, options: &ListOptions) -> RepositoryResult<(Vec<TodoItemData>, i64)> {
        let store = self.store.lock().unwrap();
        let (window, total) = options.apply(&store.todos);
        Ok((window.into_iter().map(|todo| store.resolve(todo)).collect(), total))
    }

    fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<TodoItemData>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .todos
            .iter()
            .find(|todo| todo.id == id)
            .map(|todo| store.resolve(todo)))
    }

    fn create(&self, new_todo: NewTodo) -> RepositoryResult<TodoItemData> {
        let mut store = self.store.lock().unwrap();
        store.check_owner(new_todo.todo.user_id)?;
        let at = now();
        let todo = Todo::new(Uuid::new_v4(), new_todo.todo, at);
        for input in new_todo.sub_tasks {
            store
                .subtasks
                .push(SubTask::new(Uuid::new_v4(), todo.id, input, at));
        }
        store.todos.push(todo.clone());
        Ok(store.resolve(&todo))
    }

    fn replace(&self, id: Uuid, input: TodoInput) -> RepositoryResult<Option<TodoItemData>> {
        let mut store = self.store.lock().unwrap();
        let Some(index) = store.position(id) else {
            return Ok(None);
        };
        store.check_owner(input.user_id)?;
        let at = next_update(store.todos[index].updated_at);
        store.todos[index].replace_with(input, at);
        let todo = store.todos[index].clone();
        Ok(Some(store.resolve(&todo)))
    }

    fn patch(&self, id: Uuid, patch: TodoPatch) -> RepositoryResult<Option<TodoItemData>> {
        let mut store = self.store.lock().unwrap();
        let Some(index) = store.position(id) else {
            return Ok(None);
        };
        if let Some(owner) = patch.user_id {
            store.check_owner(owner)?;
        }
        let at = next_update(store.todos[index].updated_at);
        patch.apply(&mut store.todos[index], at);
        let todo = store.todos[index].clone();
        Ok(Some(store.resolve(&todo)))
    }

    fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let mut store = self.store.lock().unwrap();
        let Some(index) = store.position(id) else {
            return Ok(false);
        };
        store.todos.remove(index);
        store.subtasks.retain(|subtask| subtask.todo_id != id);
        Ok(true)
    }

    fn find_subtasks(&self, todo_id: Uuid) -> RepositoryResult<Option<Vec<SubTask>>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .todos
            .iter()
            .find(|todo| todo.id == todo_id)
            .map(|todo| store.resolve(todo).sub_tasks))
    }

    fn add_subtask(&self, todo_id: Uuid, input: NewSubTask) -> RepositoryResult<Option<SubTask>> {
        let mut store = self.store.lock().unwrap();
        if store.position(todo_id).is_none() {
            return Ok(None);
        }
        let subtask = SubTask::new(Uuid::new_v4(), todo_id, input, now());
        store.subtasks.push(subtask.clone());
        Ok(Some(subtask))
    }

    fn find_subtask_by_id(&self, id: Uuid) -> RepositoryResult<Option<SubTask>> {
        let store = self.store.lock().unwrap();
        Ok(store.subtasks.iter().find(|subtask| subtask.id == id).cloned())
    }

    fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subtask::NewSubTask;
    use crate::models::todo::{TodoPriority, TodoStatus};
    use crate::repository::query::{Pagination, Sort, TodoFilters};

    fn new_todo(title: &str) -> NewTodo {
        NewTodo {
            todo: TodoInput {
                title: Some(title.into()),
                ..Default::default()
            },
            sub_tasks: vec![],
        }
    }

    #[test]
    fn create_then_find_applies_defaults() {
        let repo = InMemoryRepository::new();
        let mut input = new_todo("T");
        input.todo.priority = Some(TodoPriority::High);
        let created = repo.create(input).unwrap();

        let found = repo.find_by_id(created.todo.id).unwrap().unwrap();
        assert_eq!(found.todo.status, TodoStatus::Pending);
        assert_eq!(found.todo.priority, TodoPriority::High);
        assert_eq!(found, created);
    }

    #[test]
    fn delete_cascades_to_subtasks() {
        let repo = InMemoryRepository::new();
        let mut input = new_todo("parent");
        input.sub_tasks = vec![
            NewSubTask {
                title: Some("one".into()),
                ..Default::default()
            },
            NewSubTask {
                title: Some("two".into()),
                ..Default::default()
            },
        ];
        let created = repo.create(input).unwrap();
        assert_eq!(created.sub_tasks.len(), 2);

        assert!(repo.delete(created.todo.id).unwrap());
        for subtask in &created.sub_tasks {
            assert_eq!(repo.find_subtask_by_id(subtask.id).unwrap(), None);
        }
        assert!(!repo.delete(created.todo.id).unwrap());
    }

    #[test]
    fn missing_ids_report_absence() {
        let repo = InMemoryRepository::new();
        let id = Uuid::new_v4();
        assert_eq!(repo.find_by_id(id).unwrap(), None);
        assert_eq!(repo.replace(id, TodoInput::default()).unwrap(), None);
        assert_eq!(repo.patch(id, TodoPatch::default()).unwrap(), None);
        assert_eq!(repo.find_subtasks(id).unwrap(), None);
        assert_eq!(repo.add_subtask(id, NewSubTask::default()).unwrap(), None);
    }

    #[test]
    fn unknown_owners_are_rejected_like_a_foreign_key() {
        let repo = InMemoryRepository::new();
        let stranger = Uuid::new_v4();
        let mut input = new_todo("orphan");
        input.todo.user_id = Some(stranger);
        assert!(matches!(
            repo.create(input),
            Err(RepositoryError::Query(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                _
            )))
        ));
        let (_, total) = repo.find_all(&ListOptions::default()).unwrap();
        assert_eq!(total, 0);

        let created = repo.create(new_todo("owned later")).unwrap();
        let patch = TodoPatch {
            user_id: Some(Some(stranger)),
            ..Default::default()
        };
        assert!(repo.patch(created.todo.id, patch).is_err());
        let cleared = TodoPatch {
            user_id: Some(None),
            ..Default::default()
        };
        assert!(repo.patch(created.todo.id, cleared).unwrap().is_some());
        assert_eq!(repo.find_by_id(created.todo.id).unwrap().unwrap().todo.user_id, None);
    }

    #[test]
    fn find_all_resolves_owner_and_counts_before_windowing() {
        let repo = InMemoryRepository::new();
        let owner = User {
            id: Uuid::new_v4(),
            email: "demo@example.com".into(),
            password_hash: String::new(),
            first_name: "Demo".into(),
            last_name: "User".into(),
        };
        repo.insert_user(owner.clone());
        for i in 0..5 {
            let mut input = new_todo(&format!("todo {i}"));
            input.todo.user_id = (i % 2 == 0).then_some(owner.id);
            repo.create(input).unwrap();
        }

        let options = ListOptions {
            pagination: Pagination::new(1, 2).unwrap(),
            sort: Sort::parse("title:asc"),
            filters: TodoFilters {
                user_id: Some(owner.id),
                ..Default::default()
            },
        };
        let (items, total) = repo.find_all(&options).unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].todo.title, "todo 0");
        assert_eq!(items[0].user.as_ref(), Some(&owner));
    }
}
