use crate::item::Item;
use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, Row, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Persistence boundary for review items
pub trait ItemStore {
    /// Fetch an item, but only if it belongs to `user_id`
    fn get(&self, item_id: &str, user_id: &str) -> Result<Option<Item>>;

    /// All items owned by a user
    fn list(&self, user_id: &str) -> Result<Vec<Item>>;

    /// Insert a new item. Returns false if the user already has an item
    /// for that flashcard.
    fn insert(&self, item: &Item) -> Result<bool>;

    /// Insert or overwrite an item
    fn put(&self, item: &Item) -> Result<()>;

    /// Replace `expected` with `new` only if the stored record still equals
    /// `expected`. Returns false when someone else got there first.
    fn put_if_unchanged(&self, expected: &Item, new: &Item) -> Result<bool>;
}

const ITEM_COLUMNS: &str = "id, user_id, flashcard_id, easiness_factor, actual_times_repeated,
    times_repeated, last_repetition, next_repetition, previous_days_change, extra_repeat_today";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        user_id: row.get(1)?,
        flashcard_id: row.get(2)?,
        easiness_factor: row.get(3)?,
        actual_times_repeated: row.get(4)?,
        times_repeated: row.get(5)?,
        last_repetition: row.get(6)?,
        next_repetition: row.get(7)?,
        previous_days_change: row.get(8)?,
        extra_repeat_today: row.get(9)?,
    })
}

/// SQLite-backed item store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        let store = SqliteStore { conn };
        store.init_schema()?;
        tracing::debug!(path = %path.display(), "Opened item database");

        Ok(store)
    }

    /// Private database that lives as long as the store
    pub fn open_in_memory() -> Result<Self> {
        let store = SqliteStore {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                flashcard_id TEXT NOT NULL,
                easiness_factor REAL NOT NULL,
                actual_times_repeated INTEGER NOT NULL DEFAULT 0,
                times_repeated INTEGER NOT NULL DEFAULT 0,
                last_repetition INTEGER NOT NULL DEFAULT 0,
                next_repetition INTEGER NOT NULL DEFAULT 0,
                previous_days_change INTEGER NOT NULL DEFAULT 0,
                extra_repeat_today INTEGER NOT NULL DEFAULT 0,
                UNIQUE(user_id, flashcard_id)
            );

            CREATE INDEX IF NOT EXISTS idx_items_user ON items(user_id);
            CREATE INDEX IF NOT EXISTS idx_items_next ON items(user_id, next_repetition);
            ",
        )?;

        Ok(())
    }
}

impl ItemStore for SqliteStore {
    fn get(&self, item_id: &str, user_id: &str) -> Result<Option<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1 AND user_id = ?2"
        ))?;

        match stmt.query_row(params![item_id, user_id], item_from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, user_id: &str) -> Result<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE user_id = ?1 ORDER BY next_repetition ASC, id ASC"
        ))?;

        let items = stmt
            .query_map(params![user_id], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn insert(&self, item: &Item) -> Result<bool> {
        let inserted = self.conn.execute(
            &format!(
                "INSERT INTO items ({ITEM_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(user_id, flashcard_id) DO NOTHING"
            ),
            params![
                item.id,
                item.user_id,
                item.flashcard_id,
                item.easiness_factor,
                item.actual_times_repeated,
                item.times_repeated,
                item.last_repetition,
                item.next_repetition,
                item.previous_days_change,
                item.extra_repeat_today,
            ],
        )?;

        Ok(inserted > 0)
    }

    fn put(&self, item: &Item) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO items ({ITEM_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    easiness_factor = ?4,
                    actual_times_repeated = ?5,
                    times_repeated = ?6,
                    last_repetition = ?7,
                    next_repetition = ?8,
                    previous_days_change = ?9,
                    extra_repeat_today = ?10"
            ),
            params![
                item.id,
                item.user_id,
                item.flashcard_id,
                item.easiness_factor,
                item.actual_times_repeated,
                item.times_repeated,
                item.last_repetition,
                item.next_repetition,
                item.previous_days_change,
                item.extra_repeat_today,
            ],
        )?;

        Ok(())
    }

    fn put_if_unchanged(&self, expected: &Item, new: &Item) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE items SET
                easiness_factor = ?1,
                actual_times_repeated = ?2,
                times_repeated = ?3,
                last_repetition = ?4,
                next_repetition = ?5,
                previous_days_change = ?6,
                extra_repeat_today = ?7
             WHERE id = ?8 AND user_id = ?9
                AND flashcard_id = ?10
                AND easiness_factor = ?11
                AND actual_times_repeated = ?12
                AND times_repeated = ?13
                AND last_repetition = ?14
                AND next_repetition = ?15
                AND previous_days_change = ?16
                AND extra_repeat_today = ?17",
            params![
                new.easiness_factor,
                new.actual_times_repeated,
                new.times_repeated,
                new.last_repetition,
                new.next_repetition,
                new.previous_days_change,
                new.extra_repeat_today,
                expected.id,
                expected.user_id,
                expected.flashcard_id,
                expected.easiness_factor,
                expected.actual_times_repeated,
                expected.times_repeated,
                expected.last_repetition,
                expected.next_repetition,
                expected.previous_days_change,
                expected.extra_repeat_today,
            ],
        )?;

        Ok(updated == 1)
    }
}

/// Item store kept in process memory
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Item>>> {
        self.items
            .lock()
            .map_err(|_| anyhow!("Item store lock poisoned"))
    }
}

impl ItemStore for MemoryStore {
    fn get(&self, item_id: &str, user_id: &str) -> Result<Option<Item>> {
        Ok(self
            .lock()?
            .get(item_id)
            .filter(|item| item.user_id == user_id)
            .cloned())
    }

    fn list(&self, user_id: &str) -> Result<Vec<Item>> {
        let mut items: Vec<Item> = self
            .lock()?
            .values()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.next_repetition
                .cmp(&b.next_repetition)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(items)
    }

    fn insert(&self, item: &Item) -> Result<bool> {
        let mut items = self.lock()?;
        let taken = items.values().any(|existing| {
            existing.user_id == item.user_id && existing.flashcard_id == item.flashcard_id
        });
        if taken {
            return Ok(false);
        }
        if items.contains_key(&item.id) {
            anyhow::bail!("Item id already in use: {}", item.id);
        }
        items.insert(item.id.clone(), item.clone());
        Ok(true)
    }

    fn put(&self, item: &Item) -> Result<()> {
        self.lock()?.insert(item.id.clone(), item.clone());
        Ok(())
    }

    fn put_if_unchanged(&self, expected: &Item, new: &Item) -> Result<bool> {
        let mut items = self.lock()?;
        match items.get_mut(&expected.id) {
            Some(current) if current == expected => {
                *current = new.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reviewed(item: &Item) -> Item {
        Item {
            actual_times_repeated: 1,
            times_repeated: 1,
            last_repetition: 1_700_000_000,
            next_repetition: 1_700_086_400,
            previous_days_change: 1,
            ..item.clone()
        }
    }

    fn exercise_store(store: &dyn ItemStore) {
        let a = Item::with_id("a", "alice", "card-1");
        let b = Item::with_id("b", "alice", "card-2");
        let c = Item::with_id("c", "bob", "card-1");

        assert!(store.insert(&a).unwrap());
        assert!(store.insert(&b).unwrap());
        assert!(store.insert(&c).unwrap());

        // One item per user and flashcard
        assert!(!store.insert(&Item::with_id("d", "alice", "card-1")).unwrap());

        assert_eq!(store.get("a", "alice").unwrap(), Some(a.clone()));
        assert_eq!(store.get("a", "bob").unwrap(), None);
        assert_eq!(store.get("missing", "alice").unwrap(), None);

        let alice = store.list("alice").unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|item| item.user_id == "alice"));

        let a2 = reviewed(&a);
        assert!(store.put_if_unchanged(&a, &a2).unwrap());
        assert_eq!(store.get("a", "alice").unwrap(), Some(a2.clone()));

        // Stale expectation loses
        assert!(!store.put_if_unchanged(&a, &reviewed(&a2)).unwrap());
        assert_eq!(store.get("a", "alice").unwrap(), Some(a2.clone()));

        let mut b2 = reviewed(&b);
        b2.extra_repeat_today = true;
        b2.easiness_factor = 2.18;
        store.put(&b2).unwrap();
        assert_eq!(store.get("b", "alice").unwrap(), Some(b2));
    }

    #[test]
    fn test_sqlite_store() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&dir.path().join("items.db")).unwrap();
        exercise_store(&store);
    }

    #[test]
    fn test_sqlite_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.db");
        let item = Item::with_id("a", "alice", "card-1");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(&item).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list("alice").unwrap(), vec![item]);
    }

    #[test]
    fn test_sqlite_in_memory() {
        let store = SqliteStore::open_in_memory().unwrap();
        exercise_store(&store);
    }

    #[test]
    fn test_memory_store() {
        exercise_store(&MemoryStore::new());
    }
}
