//! redb persistence for todos, categories and tags.
//!
//! One embedded database file, opened at boot and shared behind an Arc.
//! Integer ids come from counters in the meta table, so they are unique and
//! monotonic for the lifetime of the file — deleted ids are never reused.
//! Values are postcard-encoded records keyed by id; redb orders u64 keys
//! numerically, so iteration yields creation order.

use crate::models::{Category, Tag, Todo};
use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use std::sync::Arc;
use thiserror::Error;

const TODOS: TableDefinition<u64, &[u8]> = TableDefinition::new("todos");
const CATEGORIES: TableDefinition<u64, &[u8]> = TableDefinition::new("categories");
const TAGS: TableDefinition<u64, &[u8]> = TableDefinition::new("tags");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const TODO_ID_KEY: &str = "next_todo_id";
const CATEGORY_ID_KEY: &str = "next_category_id";
const TAG_ID_KEY: &str = "next_tag_id";

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(String),
    #[error("codec: {0}")]
    Codec(#[from] postcard::Error),
    #[error("name already in use: {0}")]
    NameTaken(String),
    #[error("category is used by {0} todo(s)")]
    CategoryInUse(usize),
    #[error("tag is used by {0} todo(s)")]
    TagInUse(usize),
}

// redb 2.x has many error types. Blanket them all into StoreError::Db.
macro_rules! from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for StoreError {
            fn from(e: $t) -> Self { StoreError::Db(e.to_string()) }
        })*
    };
}

from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError
);

// ── Store ──────────────────────────────────────────────────────

/// Thin handle to the redb file. Cloneable (Arc inside).
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (or create) the database at the given path, ensuring tables exist.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(TODOS)?;
            let _ = txn.open_table(CATEGORIES)?;
            let _ = txn.open_table(TAGS)?;
            let _ = txn.open_table(META)?;
        }
        txn.commit()?;

        Ok(Store { db: Arc::new(db) })
    }

    // ── Todos ──────────────────────────────────────────────────

    /// Insert a new todo, assigning its id. Returns the stored record.
    pub fn create_todo(&self, mut todo: Todo) -> Result<Todo, StoreError> {
        let txn = self.db.begin_write()?;
        {
            // Bump the id counter inside the same transaction as the insert.
            let mut meta = txn.open_table(META)?;
            let next = meta.get(TODO_ID_KEY)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(TODO_ID_KEY, next + 1)?;
            todo.id = next;

            let mut todos = txn.open_table(TODOS)?;
            let bytes = postcard::to_allocvec(&todo)?;
            todos.insert(todo.id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(todo)
    }

    pub fn get_todo(&self, id: u64) -> Result<Option<Todo>, StoreError> {
        let txn = self.db.begin_read()?;
        let todos = txn.open_table(TODOS)?;
        match todos.get(id)? {
            Some(data) => Ok(Some(postcard::from_bytes(data.value())?)),
            None => Ok(None),
        }
    }

    /// All todos in id (= creation) order.
    pub fn list_todos(&self) -> Result<Vec<Todo>, StoreError> {
        let txn = self.db.begin_read()?;
        let todos = txn.open_table(TODOS)?;
        let mut out = Vec::new();
        for entry in todos.iter()? {
            let (_, value) = entry?;
            out.push(postcard::from_bytes(value.value())?);
        }
        Ok(out)
    }

    /// Write back an existing todo under its id.
    pub fn update_todo(&self, todo: &Todo) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut todos = txn.open_table(TODOS)?;
            let bytes = postcard::to_allocvec(todo)?;
            todos.insert(todo.id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn delete_todo(&self, id: u64) -> Result<bool, StoreError> {
        let txn = self.db.begin_write()?;
        let deleted;
        {
            let mut todos = txn.open_table(TODOS)?;
            deleted = todos.remove(id)?.is_some();
        }
        txn.commit()?;
        Ok(deleted)
    }

    /// How many todos carry the given category label.
    pub fn todos_in_category(&self, name: &str) -> Result<usize, StoreError> {
        Ok(self
            .list_todos()?
            .iter()
            .filter(|t| t.category.as_deref() == Some(name))
            .count())
    }

    /// How many todos carry the given tag label.
    pub fn todos_with_tag(&self, name: &str) -> Result<usize, StoreError> {
        Ok(self
            .list_todos()?
            .iter()
            .filter(|t| t.tags.iter().any(|tag| tag == name))
            .count())
    }

    // ── Categories ─────────────────────────────────────────────

    pub fn create_category(
        &self,
        name: &str,
        color: String,
        description: Option<String>,
    ) -> Result<Category, StoreError> {
        let name = name.trim();
        let txn = self.db.begin_write()?;
        let category;
        {
            let mut categories = txn.open_table(CATEGORIES)?;
            for entry in categories.iter()? {
                let (_, value) = entry?;
                let existing: Category = postcard::from_bytes(value.value())?;
                if existing.name == name {
                    return Err(StoreError::NameTaken(name.to_string()));
                }
            }

            let mut meta = txn.open_table(META)?;
            let next = meta.get(CATEGORY_ID_KEY)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(CATEGORY_ID_KEY, next + 1)?;

            category = Category {
                id: next,
                name: name.to_string(),
                color,
                description,
                created_at: Utc::now(),
            };
            let bytes = postcard::to_allocvec(&category)?;
            categories.insert(category.id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(category)
    }

    pub fn get_category(&self, id: u64) -> Result<Option<Category>, StoreError> {
        let txn = self.db.begin_read()?;
        let categories = txn.open_table(CATEGORIES)?;
        match categories.get(id)? {
            Some(data) => Ok(Some(postcard::from_bytes(data.value())?)),
            None => Ok(None),
        }
    }

    /// All categories, name order.
    pub fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let txn = self.db.begin_read()?;
        let categories = txn.open_table(CATEGORIES)?;
        let mut out: Vec<Category> = Vec::new();
        for entry in categories.iter()? {
            let (_, value) = entry?;
            out.push(postcard::from_bytes(value.value())?);
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    /// Write back an edited category; the name must stay unique.
    pub fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut categories = txn.open_table(CATEGORIES)?;
            for entry in categories.iter()? {
                let (key, value) = entry?;
                if key.value() == category.id {
                    continue;
                }
                let existing: Category = postcard::from_bytes(value.value())?;
                if existing.name == category.name {
                    return Err(StoreError::NameTaken(category.name.clone()));
                }
            }
            let bytes = postcard::to_allocvec(category)?;
            categories.insert(category.id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Delete a category unless some todo still references it by name.
    pub fn delete_category(&self, id: u64) -> Result<bool, StoreError> {
        let Some(category) = self.get_category(id)? else {
            return Ok(false);
        };
        let in_use = self.todos_in_category(&category.name)?;
        if in_use > 0 {
            return Err(StoreError::CategoryInUse(in_use));
        }

        let txn = self.db.begin_write()?;
        let deleted;
        {
            let mut categories = txn.open_table(CATEGORIES)?;
            deleted = categories.remove(id)?.is_some();
        }
        txn.commit()?;
        Ok(deleted)
    }

    // ── Tags ───────────────────────────────────────────────────

    pub fn create_tag(&self, name: &str, color: String) -> Result<Tag, StoreError> {
        let name = name.trim();
        let txn = self.db.begin_write()?;
        let tag;
        {
            let mut tags = txn.open_table(TAGS)?;
            for entry in tags.iter()? {
                let (_, value) = entry?;
                let existing: Tag = postcard::from_bytes(value.value())?;
                if existing.name == name {
                    return Err(StoreError::NameTaken(name.to_string()));
                }
            }

            let mut meta = txn.open_table(META)?;
            let next = meta.get(TAG_ID_KEY)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(TAG_ID_KEY, next + 1)?;

            tag = Tag {
                id: next,
                name: name.to_string(),
                color,
                created_at: Utc::now(),
            };
            let bytes = postcard::to_allocvec(&tag)?;
            tags.insert(tag.id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(tag)
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let txn = self.db.begin_read()?;
        let tags = txn.open_table(TAGS)?;
        let mut out: Vec<Tag> = Vec::new();
        for entry in tags.iter()? {
            let (_, value) = entry?;
            out.push(postcard::from_bytes(value.value())?);
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    /// Delete a tag unless some todo still carries it.
    pub fn delete_tag(&self, id: u64) -> Result<bool, StoreError> {
        let tag = {
            let txn = self.db.begin_read()?;
            let tags = txn.open_table(TAGS)?;
            match tags.get(id)? {
                Some(data) => postcard::from_bytes::<Tag>(data.value())?,
                None => return Ok(false),
            }
        };
        let in_use = self.todos_with_tag(&tag.name)?;
        if in_use > 0 {
            return Err(StoreError::TagInUse(in_use));
        }

        let txn = self.db.begin_write()?;
        let deleted;
        {
            let mut tags = txn.open_table(TAGS)?;
            deleted = tags.remove(id)?.is_some();
        }
        txn.commit()?;
        Ok(deleted)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use std::fs;

    /// Create a temp database file that each test cleans up.
    fn temp_store(name: &str) -> (Store, String) {
        let path = format!("/tmp/todo_test_{name}_{}.redb", std::process::id());
        let _ = fs::remove_file(&path);
        let store = Store::open(&path).unwrap();
        (store, path)
    }

    fn cleanup(path: &str) {
        let _ = fs::remove_file(path);
    }

    fn draft(content: &str) -> Todo {
        Todo {
            id: 0,
            content: content.to_string(),
            completed: false,
            priority: Priority::Medium,
            created_at: Utc::now(),
            completed_at: None,
            due_date: None,
            category: None,
            tags: vec![],
            notes: None,
            estimated_time: None,
            actual_time: None,
        }
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let (store, path) = temp_store("ids");

        let a = store.create_todo(draft("first")).unwrap();
        let b = store.create_todo(draft("second")).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);

        store.delete_todo(b.id).unwrap();
        let c = store.create_todo(draft("third")).unwrap();
        assert_eq!(c.id, 3);

        cleanup(&path);
    }

    #[test]
    fn round_trip_and_reload() {
        let (store, path) = temp_store("reload");

        let mut todo = draft("persisted");
        todo.tags = vec!["work".into()];
        todo.notes = Some("some notes".into());
        let created = store.create_todo(todo).unwrap();

        drop(store);
        let store = Store::open(&path).unwrap();

        let loaded = store.get_todo(created.id).unwrap().unwrap();
        assert_eq!(loaded.content, "persisted");
        assert_eq!(loaded.tags, vec!["work".to_string()]);
        assert_eq!(loaded.notes.as_deref(), Some("some notes"));

        // Counter survives reopen too.
        let next = store.create_todo(draft("after reopen")).unwrap();
        assert_eq!(next.id, created.id + 1);

        cleanup(&path);
    }

    #[test]
    fn todo_with_absent_optionals_round_trips() {
        // Every optional field unset — the common shape of real records.
        let (store, path) = temp_store("sparse");

        let created = store.create_todo(draft("bare")).unwrap();
        let loaded = store.get_todo(created.id).unwrap().unwrap();
        assert_eq!(loaded.content, "bare");
        assert_eq!(loaded.due_date, None);
        assert_eq!(loaded.category, None);
        assert_eq!(loaded.notes, None);
        assert!(loaded.tags.is_empty());

        cleanup(&path);
    }

    #[test]
    fn list_returns_creation_order() {
        let (store, path) = temp_store("order");

        for i in 0..5 {
            store.create_todo(draft(&format!("todo {i}"))).unwrap();
        }
        let ids: Vec<u64> = store.list_todos().unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        cleanup(&path);
    }

    #[test]
    fn update_and_delete() {
        let (store, path) = temp_store("update");

        let mut todo = store.create_todo(draft("original")).unwrap();
        todo.content = "edited".into();
        todo.completed = true;
        todo.completed_at = Some(Utc::now());
        store.update_todo(&todo).unwrap();

        let loaded = store.get_todo(todo.id).unwrap().unwrap();
        assert_eq!(loaded.content, "edited");
        assert!(loaded.completed);
        assert!(loaded.completed_at.is_some());

        assert!(store.delete_todo(todo.id).unwrap());
        assert!(!store.delete_todo(todo.id).unwrap());
        assert!(store.get_todo(todo.id).unwrap().is_none());

        cleanup(&path);
    }

    #[test]
    fn category_names_are_unique() {
        let (store, path) = temp_store("cat_unique");

        store
            .create_category("errands", "#667eea".into(), None)
            .unwrap();
        let dup = store.create_category("errands", "#000000".into(), None);
        assert!(matches!(dup, Err(StoreError::NameTaken(_))));

        cleanup(&path);
    }

    #[test]
    fn category_in_use_cannot_be_deleted() {
        let (store, path) = temp_store("cat_guard");

        let cat = store
            .create_category("errands", "#667eea".into(), None)
            .unwrap();
        let mut todo = draft("buy milk");
        todo.category = Some("errands".into());
        let todo = store.create_todo(todo).unwrap();

        assert!(matches!(
            store.delete_category(cat.id),
            Err(StoreError::CategoryInUse(1))
        ));

        store.delete_todo(todo.id).unwrap();
        assert!(store.delete_category(cat.id).unwrap());

        cleanup(&path);
    }

    #[test]
    fn categories_list_in_name_order() {
        let (store, path) = temp_store("cat_order");

        store.create_category("zeta", "#fff".into(), None).unwrap();
        store.create_category("alpha", "#fff".into(), None).unwrap();
        let names: Vec<String> = store
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        cleanup(&path);
    }

    #[test]
    fn tag_in_use_cannot_be_deleted() {
        let (store, path) = temp_store("tag_guard");

        let tag = store.create_tag("work", "#6c757d".into()).unwrap();
        let mut todo = draft("send report");
        todo.tags = vec!["work".into()];
        let todo = store.create_todo(todo).unwrap();

        assert!(matches!(
            store.delete_tag(tag.id),
            Err(StoreError::TagInUse(1))
        ));

        store.delete_todo(todo.id).unwrap();
        assert!(store.delete_tag(tag.id).unwrap());
        assert!(!store.delete_tag(tag.id).unwrap());

        cleanup(&path);
    }

    #[test]
    fn missing_rows_read_as_none() {
        let (store, path) = temp_store("missing");
        assert!(store.get_todo(42).unwrap().is_none());
        assert!(store.get_category(42).unwrap().is_none());
        cleanup(&path);
    }
}
