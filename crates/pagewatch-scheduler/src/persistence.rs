//! SQLite-backed store for watch tasks, owners, and execution history.
//! Nested structures (channel configs, filter, last-execution snapshot)
//! live as JSON in TEXT columns; the columns the queries filter on are
//! real columns.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use pagewatch_core::error::{PagewatchError, Result};
use pagewatch_core::traits::{ExecutionHistory, OwnerStore, TaskStore};
use pagewatch_core::types::{ExecutionResult, Owner, WatchTask};

pub struct WatchDb {
    conn: Mutex<Connection>,
}

impl WatchDb {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(store_err)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS owners (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL DEFAULT '',
                notifications TEXT NOT NULL DEFAULT '[]',  -- JSON array of channel configs
                filter TEXT                                -- JSON word filter, NULL = none
            );

            CREATE TABLE IF NOT EXISTS watch_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL,
                cadence_minutes INTEGER NOT NULL DEFAULT 1,
                only_changed INTEGER NOT NULL DEFAULT 0,
                only_unique INTEGER NOT NULL DEFAULT 0,
                is_dependency INTEGER NOT NULL DEFAULT 0,
                notifications TEXT NOT NULL DEFAULT '[]',  -- JSON array of channel configs
                filter TEXT,                               -- JSON word filter, NULL = none
                owner_id INTEGER REFERENCES owners(id),
                last_execution TEXT                        -- JSON snapshot, NULL = never ran
            );

            CREATE TABLE IF NOT EXISTS executions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                is_success INTEGER NOT NULL,
                hash_target TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_executions_url_hash
                ON executions(url, hash_target);
         ",
            )
            .map_err(store_err)?;
        Ok(())
    }

    /// Insert an owner and return its id (wiring and tests).
    pub fn insert_owner(&self, owner: &Owner) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO owners (name, notifications, filter) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                owner.name,
                to_json(&owner.notifications)?,
                owner.filter.as_ref().map(to_json).transpose()?,
            ],
        )
        .map_err(store_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn tasks_where(&self, clause: &str) -> Result<Vec<WatchTask>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT id, name, url, cadence_minutes, only_changed, only_unique, \
             is_dependency, notifications, filter, owner_id, last_execution \
             FROM watch_tasks {clause} ORDER BY id"
        );
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let rows = stmt
            .query_map([], task_from_row)
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?;
        Ok(rows)
    }
}

impl TaskStore for WatchDb {
    fn load_eligible(&self) -> Result<Vec<WatchTask>> {
        self.tasks_where("WHERE is_dependency = 0")
    }

    fn list(&self) -> Result<Vec<WatchTask>> {
        self.tasks_where("")
    }

    fn get(&self, id: i64) -> Result<Option<WatchTask>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, url, cadence_minutes, only_changed, only_unique, \
                 is_dependency, notifications, filter, owner_id, last_execution \
                 FROM watch_tasks WHERE id = ?1",
            )
            .map_err(store_err)?;
        let mut rows = stmt
            .query_map([id], task_from_row)
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    fn insert(&self, task: &WatchTask) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO watch_tasks (name, url, cadence_minutes, only_changed, \
             only_unique, is_dependency, notifications, filter, owner_id, last_execution) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                task.name,
                task.url,
                task.options.cadence_minutes,
                task.options.only_changed,
                task.options.only_unique,
                task.options.is_dependency,
                to_json(&task.notifications)?,
                task.filter.as_ref().map(to_json).transpose()?,
                task.owner_id,
                task.last_execution.as_ref().map(to_json).transpose()?,
            ],
        )
        .map_err(store_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn save(&self, task: &WatchTask) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE watch_tasks SET name = ?1, url = ?2, cadence_minutes = ?3, \
                 only_changed = ?4, only_unique = ?5, is_dependency = ?6, \
                 notifications = ?7, filter = ?8, owner_id = ?9, last_execution = ?10 \
                 WHERE id = ?11",
                rusqlite::params![
                    task.name,
                    task.url,
                    task.options.cadence_minutes,
                    task.options.only_changed,
                    task.options.only_unique,
                    task.options.is_dependency,
                    to_json(&task.notifications)?,
                    task.filter.as_ref().map(to_json).transpose()?,
                    task.owner_id,
                    task.last_execution.as_ref().map(to_json).transpose()?,
                    task.id,
                ],
            )
            .map_err(store_err)?;
        if changed == 0 {
            return Err(PagewatchError::Store(format!(
                "no task with id {} to save",
                task.id
            )));
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute("DELETE FROM watch_tasks WHERE id = ?1", [id])
            .map_err(store_err)?;
        Ok(changed > 0)
    }
}

impl OwnerStore for WatchDb {
    fn owner(&self, id: i64) -> Result<Option<Owner>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, name, notifications, filter FROM owners WHERE id = ?1")
            .map_err(store_err)?;
        let mut rows = stmt
            .query_map([id], |row| {
                let notifications: String = row.get(2)?;
                let filter: Option<String> = row.get(3)?;
                Ok(Owner {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    notifications: from_json(&notifications)?,
                    filter: filter.as_deref().map(from_json).transpose()?,
                })
            })
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }
}

impl ExecutionHistory for WatchDb {
    fn record(&self, url: &str, result: &ExecutionResult) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        match result {
            ExecutionResult::Success {
                hash_target,
                created_at,
                ..
            } => conn.execute(
                "INSERT INTO executions (url, is_success, hash_target, created_at) \
                 VALUES (?1, 1, ?2, ?3)",
                rusqlite::params![url, hash_target, created_at.to_rfc3339()],
            ),
            ExecutionResult::Failure {
                error_message,
                created_at,
            } => conn.execute(
                "INSERT INTO executions (url, is_success, error_message, created_at) \
                 VALUES (?1, 0, ?2, ?3)",
                rusqlite::params![url, error_message, created_at.to_rfc3339()],
            ),
        }
        .map_err(store_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn count_by_hash(&self, url: &str, hash: &str, exclude_id: Option<i64>) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: u64 = conn
            .query_row(
                "SELECT COUNT(*) FROM executions \
                 WHERE url = ?1 AND hash_target = ?2 AND id != COALESCE(?3, -1)",
                rusqlite::params![url, hash, exclude_id],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        Ok(count)
    }
}

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WatchTask> {
    let notifications: String = row.get(7)?;
    let filter: Option<String> = row.get(8)?;
    let last_execution: Option<String> = row.get(10)?;
    Ok(WatchTask {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        options: pagewatch_core::types::WatchOptions {
            cadence_minutes: row.get(3)?,
            only_changed: row.get(4)?,
            only_unique: row.get(5)?,
            is_dependency: row.get(6)?,
        },
        notifications: from_json(&notifications)?,
        filter: filter.as_deref().map(from_json).transpose()?,
        owner_id: row.get(9)?,
        last_execution: last_execution.as_deref().map(from_json).transpose()?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| PagewatchError::Store(format!("serialize: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> rusqlite::Result<T> {
    serde_json::from_str(json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn store_err(e: rusqlite::Error) -> PagewatchError {
    PagewatchError::Store(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder;
    use pagewatch_core::types::{ChannelConfig, WatchOptions, WordFilter};

    fn sample_task() -> WatchTask {
        let mut task = WatchTask::new("https://a.test/page");
        task.name = "frontpage".into();
        task.options = WatchOptions {
            cadence_minutes: 5,
            only_changed: true,
            only_unique: false,
            is_dependency: false,
        };
        task.notifications = vec![ChannelConfig::Webhook {
            url: "https://hooks.test/x".into(),
            template: Some("{name} changed".into()),
        }];
        task.filter = Some(WordFilter {
            words: vec!["price".into()],
            threshold: 0.9,
        });
        task
    }

    #[test]
    fn insert_get_roundtrip() {
        let db = WatchDb::open_in_memory().unwrap();
        let mut task = sample_task();
        task.id = db.insert(&task).unwrap();

        let loaded = db.get(task.id).unwrap().unwrap();
        assert_eq!(loaded.url, task.url);
        assert_eq!(loaded.options.cadence_minutes, 5);
        assert!(loaded.options.only_changed);
        assert_eq!(loaded.notifications.len(), 1);
        assert_eq!(loaded.filter.unwrap().words, vec!["price".to_string()]);
        assert!(loaded.last_execution.is_none());
    }

    #[test]
    fn save_persists_snapshot() {
        let db = WatchDb::open_in_memory().unwrap();
        let mut task = sample_task();
        task.id = db.insert(&task).unwrap();

        recorder::apply(&mut task, &ExecutionResult::success("h1", "t", "c"));
        db.save(&task).unwrap();

        let loaded = db.get(task.id).unwrap().unwrap();
        let last = loaded.last_execution.unwrap();
        assert_eq!(last.hash_target.as_deref(), Some("h1"));
        assert!(last.hash_changed);
    }

    #[test]
    fn save_unknown_task_is_an_error() {
        let db = WatchDb::open_in_memory().unwrap();
        let mut task = sample_task();
        task.id = 999;
        assert!(db.save(&task).is_err());
    }

    #[test]
    fn eligibility_excludes_dependency_tasks() {
        let db = WatchDb::open_in_memory().unwrap();
        let root = sample_task();
        db.insert(&root).unwrap();
        let mut dep = sample_task();
        dep.options.is_dependency = true;
        db.insert(&dep).unwrap();

        let eligible = db.load_eligible().unwrap();
        assert_eq!(eligible.len(), 1);
        assert!(!eligible[0].options.is_dependency);
        assert_eq!(db.list().unwrap().len(), 2);
    }

    #[test]
    fn delete_removes_task() {
        let db = WatchDb::open_in_memory().unwrap();
        let id = db.insert(&sample_task()).unwrap();
        assert!(db.delete(id).unwrap());
        assert!(!db.delete(id).unwrap());
        assert!(db.get(id).unwrap().is_none());
    }

    #[test]
    fn owner_roundtrip() {
        let db = WatchDb::open_in_memory().unwrap();
        let owner = Owner {
            id: 0,
            name: "ana".into(),
            notifications: vec![ChannelConfig::Email {
                to: "ana@example.test".into(),
                template: None,
            }],
            filter: None,
        };
        let id = db.insert_owner(&owner).unwrap();

        let loaded = db.owner(id).unwrap().unwrap();
        assert_eq!(loaded.name, "ana");
        assert_eq!(loaded.notifications.len(), 1);
        assert!(loaded.filter.is_none());
        assert!(db.owner(id + 1).unwrap().is_none());
    }

    #[test]
    fn uniqueness_count_excludes_the_given_record() {
        let db = WatchDb::open_in_memory().unwrap();
        let url = "https://a.test/page";
        let first = db.record(url, &ExecutionResult::success("h1", "t", "c")).unwrap();
        assert_eq!(db.count_by_hash(url, "h1", Some(first)).unwrap(), 0);

        let second = db.record(url, &ExecutionResult::success("h1", "t", "c")).unwrap();
        assert_eq!(db.count_by_hash(url, "h1", Some(second)).unwrap(), 1);
        assert_eq!(db.count_by_hash(url, "h1", None).unwrap(), 2);
        assert_eq!(db.count_by_hash(url, "h2", None).unwrap(), 0);

        // Failures record no hash and never count.
        db.record(url, &ExecutionResult::failure("boom")).unwrap();
        assert_eq!(db.count_by_hash(url, "h1", None).unwrap(), 2);
    }
}
