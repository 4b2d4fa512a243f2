//! SQLite inventory store: teas, storage locations, and the per-tea
//! per-location remaining amounts that the admin page and the brew flow
//! both read and write.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use teashelf_core::{BrewPick, Location, LocationSummary, NewTea, Tea, TeaInventory, TeaUpdate};

/// Locations present after first run. INSERT OR IGNORE keeps this idempotent.
const DEFAULT_LOCATIONS: &[(&str, &str)] = &[
    ("home", "Home"),
    ("work", "Work"),
    ("parents", "Parents"),
];

const CONNECT_ATTEMPTS: u32 = 3;

/// The inventory database.
/// Thread-safe: wraps the connection in a Mutex so it can be shared via
/// `Arc<InventoryDb>` across request handlers.
pub struct InventoryDb {
    conn: Mutex<Connection>,
}

impl InventoryDb {
    /// Open (or create) the database at `path`, creating parent directories,
    /// then run migrations and seed the default locations.
    pub fn open_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir for {}", path.display()))?;
        }
        let conn = connect_with_retry(path)?;
        run_migrations(&conn)?;
        seed_default_locations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("inventory db mutex poisoned")
    }

    /// Trivial query used by the health probe.
    pub fn ping(&self) -> Result<()> {
        let one: i64 = self.conn().query_row("SELECT 1", [], |row| row.get(0))?;
        anyhow::ensure!(one == 1, "unexpected ping result: {one}");
        Ok(())
    }

    // ── Teas ───────────────────────────────────────────────────────────

    /// Insert a tea and fan out one zero-amount `tea_location` row per
    /// existing location.
    pub fn add_tea(&self, tea: &NewTea) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO tea (name, type, default_dose, notes, seller, price_per_gram, grams_bought) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &tea.name,
                &tea.kind,
                tea.default_dose,
                &tea.notes,
                &tea.seller,
                tea.price_per_gram,
                tea.grams_bought,
            ],
        )?;
        let tea_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO tea_location (tea_id, location_id, amount) \
             SELECT ?1, id, 0 FROM locations",
            params![tea_id],
        )?;
        tx.commit()?;
        Ok(tea_id)
    }

    /// Delete a tea; its `tea_location` rows go with it via cascade.
    pub fn remove_tea(&self, tea_id: i64) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM tea WHERE id = ?1", params![tea_id])?;
        Ok(deleted > 0)
    }

    /// All tea ids, ascending. The bulk-update form is keyed off this list.
    pub fn tea_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM tea ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    pub fn get_tea(&self, tea_id: i64) -> Result<Option<Tea>> {
        let tea = self
            .conn()
            .query_row(
                "SELECT id, name, type, default_dose, notes, seller, \
                        price_per_gram, grams_bought, created_at \
                 FROM tea WHERE id = ?1",
                params![tea_id],
                row_to_tea,
            )
            .optional()?;
        Ok(tea)
    }

    /// Apply the admin bulk update in one transaction: scalar columns per
    /// tea, then the per-location amounts (upserted, so a missing join row
    /// is created on the spot). All rows commit together or not at all.
    pub fn update_teas(&self, updates: &[TeaUpdate]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for update in updates {
            tx.execute(
                "UPDATE tea SET name = ?1, type = ?2, default_dose = ?3, notes = ?4, \
                 seller = ?5, price_per_gram = ?6, grams_bought = ?7 WHERE id = ?8",
                params![
                    &update.name,
                    &update.kind,
                    update.default_dose,
                    &update.notes,
                    &update.seller,
                    update.price_per_gram,
                    update.grams_bought,
                    update.id,
                ],
            )?;
            for &(location_id, amount) in &update.amounts {
                tx.execute(
                    "INSERT OR REPLACE INTO tea_location (tea_id, location_id, amount) \
                     VALUES (?1, ?2, ?3)",
                    params![update.id, location_id, amount],
                )?;
            }
        }
        tx.commit()?;
        Ok(updates.len())
    }

    /// Teas newest-first, each joined with its remaining grams per location.
    pub fn list_teas(&self) -> Result<Vec<TeaInventory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, type, default_dose, notes, seller, \
                    price_per_gram, grams_bought, created_at \
             FROM tea ORDER BY id DESC",
        )?;
        let teas = stmt
            .query_map([], row_to_tea)?
            .collect::<rusqlite::Result<Vec<Tea>>>()?;

        let mut stmt = conn.prepare("SELECT tea_id, location_id, amount FROM tea_location")?;
        let mut amounts: HashMap<i64, HashMap<i64, f64>> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
            ))
        })?;
        for row in rows {
            let (tea_id, location_id, amount) = row?;
            amounts.entry(tea_id).or_default().insert(location_id, amount);
        }

        Ok(teas
            .into_iter()
            .map(|tea| {
                let amounts = amounts.remove(&tea.id).unwrap_or_default();
                TeaInventory { tea, amounts }
            })
            .collect())
    }

    // ── Locations ──────────────────────────────────────────────────────

    /// Insert a location (unique name; duplicates return `None`) and fan
    /// out one zero-amount `tea_location` row per existing tea.
    pub fn add_location(&self, name: &str, description: &str) -> Result<Option<i64>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO locations (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        if inserted == 0 {
            return Ok(None);
        }
        let location_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT OR IGNORE INTO tea_location (tea_id, location_id, amount) \
             SELECT id, ?1, 0 FROM tea",
            params![location_id],
        )?;
        tx.commit()?;
        Ok(Some(location_id))
    }

    pub fn list_locations(&self) -> Result<Vec<Location>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, name, description FROM locations ORDER BY name")?;
        let locations = stmt
            .query_map([], row_to_location)?
            .collect::<rusqlite::Result<Vec<Location>>>()?;
        Ok(locations)
    }

    pub fn location(&self, location_id: i64) -> Result<Option<Location>> {
        let location = self
            .conn()
            .query_row(
                "SELECT id, name, description FROM locations WHERE id = ?1",
                params![location_id],
                row_to_location,
            )
            .optional()?;
        Ok(location)
    }

    /// Locations with a count of teas that still have a positive amount
    /// there, for the brew location chooser.
    pub fn location_summaries(&self) -> Result<Vec<LocationSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT l.id, l.name, l.description, COALESCE(SUM(tl.amount > 0), 0) AS tea_count \
             FROM locations l \
             LEFT JOIN tea_location tl ON l.id = tl.location_id \
             GROUP BY l.id \
             ORDER BY l.name",
        )?;
        let summaries = stmt
            .query_map([], |row| {
                Ok(LocationSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    tea_count: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<LocationSummary>>>()?;
        Ok(summaries)
    }

    // ── Brewing ────────────────────────────────────────────────────────

    /// The tea with the largest positive amount at the location, ties
    /// broken by name ascending. `None` when nothing is left to brew.
    pub fn best_tea_at(&self, location_id: i64) -> Result<Option<BrewPick>> {
        let pick = self
            .conn()
            .query_row(
                "SELECT t.id, t.name, t.type, t.default_dose, t.notes, tl.amount \
                 FROM tea t \
                 JOIN tea_location tl ON t.id = tl.tea_id \
                 WHERE tl.location_id = ?1 AND tl.amount > 0 \
                 ORDER BY tl.amount DESC, t.name ASC \
                 LIMIT 1",
                params![location_id],
                |row| {
                    Ok(BrewPick {
                        tea_id: row.get(0)?,
                        name: row.get(1)?,
                        kind: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        default_dose: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                        notes: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                        amount: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(pick)
    }

    /// Confirm a brew: subtract the dose from the remaining amount (floored
    /// at 0) and, when a review was written, append it to the tea's notes
    /// tagged with the location description.
    pub fn record_brew(&self, pick: &BrewPick, location: &Location, review: &str) -> Result<()> {
        let new_amount = (pick.amount - pick.dose()).max(0.0);
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE tea_location SET amount = ?1 WHERE tea_id = ?2 AND location_id = ?3",
            params![new_amount, pick.tea_id, location.id],
        )?;
        if !review.is_empty() {
            let notes: Option<String> = tx.query_row(
                "SELECT notes FROM tea WHERE id = ?1",
                params![pick.tea_id],
                |row| row.get(0),
            )?;
            let notes = notes.unwrap_or_default();
            let updated = format!("{notes}\n[{}] {review}", location.description)
                .trim()
                .to_string();
            tx.execute(
                "UPDATE tea SET notes = ?1 WHERE id = ?2",
                params![updated, pick.tea_id],
            )?;
        }
        tx.commit()?;
        tracing::info!(tea = %pick.name, location = %location.description, "brewed");
        Ok(())
    }
}

fn connect_with_retry(path: &Path) -> Result<Connection> {
    let mut attempt = 1;
    loop {
        match open_connection(path) {
            Ok(conn) => return Ok(conn),
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                tracing::error!("db connection attempt {attempt} failed: {e}");
                std::thread::sleep(Duration::from_millis(500 * u64::from(attempt)));
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("open db {}", path.display()));
            }
        }
    }
}

fn open_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    conn.execute_batch("PRAGMA busy_timeout=5000;")?;
    Ok(conn)
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let migrations = [("0001_init", include_str!("../../../migrations/0001_init.sql"))];

    for (name, sql) in migrations {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("applied migration: {name}");
        }
    }

    Ok(())
}

fn seed_default_locations(conn: &Connection) -> Result<()> {
    for (name, description) in DEFAULT_LOCATIONS {
        conn.execute(
            "INSERT OR IGNORE INTO locations (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
    }
    Ok(())
}

fn row_to_tea(row: &rusqlite::Row) -> rusqlite::Result<Tea> {
    Ok(Tea {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        default_dose: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
        notes: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        seller: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        price_per_gram: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
        grams_bought: row.get(7)?,
        created_at: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
    })
}

fn row_to_location(row: &rusqlite::Row) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> InventoryDb {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.keep().join("test.db");
        InventoryDb::open_path(&path).unwrap()
    }

    fn new_tea(name: &str, dose: f64) -> NewTea {
        NewTea {
            name: name.to_string(),
            kind: "green".to_string(),
            default_dose: dose,
            ..NewTea::default()
        }
    }

    fn join_row_count(db: &InventoryDb) -> i64 {
        db.conn()
            .query_row("SELECT COUNT(*) FROM tea_location", [], |row| row.get(0))
            .unwrap()
    }

    fn set_amount(db: &InventoryDb, tea_id: i64, location_id: i64, amount: f64) {
        db.conn()
            .execute(
                "UPDATE tea_location SET amount = ?1 WHERE tea_id = ?2 AND location_id = ?3",
                params![amount, tea_id, location_id],
            )
            .unwrap();
    }

    #[test]
    fn open_seeds_default_locations() {
        let db = test_db();
        let names: Vec<String> = db
            .list_locations()
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["home", "parents", "work"]);
        db.ping().unwrap();
    }

    #[test]
    fn add_tea_fans_out_one_row_per_location() {
        let db = test_db();
        let tea_id = db.add_tea(&new_tea("sencha", 4.0)).unwrap();

        assert_eq!(join_row_count(&db), 3);
        let teas = db.list_teas().unwrap();
        assert_eq!(teas.len(), 1);
        assert_eq!(teas[0].tea.id, tea_id);
        for location in db.list_locations().unwrap() {
            assert_eq!(teas[0].amount_at(location.id), 0.0);
        }
    }

    #[test]
    fn add_location_fans_out_one_row_per_tea() {
        let db = test_db();
        db.add_tea(&new_tea("sencha", 4.0)).unwrap();
        db.add_tea(&new_tea("assam", 5.0)).unwrap();
        assert_eq!(join_row_count(&db), 6);

        let loc_id = db.add_location("office", "The office").unwrap().unwrap();
        assert_eq!(join_row_count(&db), 8);
        for tea in db.list_teas().unwrap() {
            assert_eq!(tea.amount_at(loc_id), 0.0);
        }
    }

    #[test]
    fn add_location_ignores_duplicate_name() {
        let db = test_db();
        assert!(db.add_location("home", "Elsewhere").unwrap().is_none());
        assert_eq!(db.list_locations().unwrap().len(), 3);
    }

    #[test]
    fn remove_tea_cascades_to_join_rows() {
        let db = test_db();
        let tea_id = db.add_tea(&new_tea("sencha", 4.0)).unwrap();
        assert_eq!(join_row_count(&db), 3);

        assert!(db.remove_tea(tea_id).unwrap());
        assert_eq!(join_row_count(&db), 0);
        assert!(db.list_teas().unwrap().is_empty());
        assert!(!db.remove_tea(tea_id).unwrap());
    }

    #[test]
    fn update_teas_writes_scalars_and_amounts() {
        let db = test_db();
        let tea_id = db.add_tea(&new_tea("sencha", 4.0)).unwrap();
        let home = db.list_locations().unwrap()[0].clone();

        db.update_teas(&[TeaUpdate {
            id: tea_id,
            name: "gyokuro".to_string(),
            kind: "green".to_string(),
            default_dose: 6.0,
            notes: "shade grown".to_string(),
            seller: "Ippodo".to_string(),
            price_per_gram: 0.8,
            grams_bought: 100.0,
            amounts: vec![(home.id, 42.0)],
        }])
        .unwrap();

        let tea = db.get_tea(tea_id).unwrap().unwrap();
        assert_eq!(tea.name, "gyokuro");
        assert_eq!(tea.default_dose, 6.0);
        assert_eq!(tea.seller, "Ippodo");
        let teas = db.list_teas().unwrap();
        assert_eq!(teas[0].amount_at(home.id), 42.0);
    }

    #[test]
    fn list_teas_is_newest_first() {
        let db = test_db();
        db.add_tea(&new_tea("first", 4.0)).unwrap();
        db.add_tea(&new_tea("second", 4.0)).unwrap();
        let names: Vec<String> = db
            .list_teas()
            .unwrap()
            .into_iter()
            .map(|t| t.tea.name)
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn best_tea_prefers_largest_amount() {
        let db = test_db();
        let a = db.add_tea(&new_tea("assam", 4.0)).unwrap();
        let b = db.add_tea(&new_tea("sencha", 4.0)).unwrap();
        let home = db.list_locations().unwrap()[0].clone();
        set_amount(&db, a, home.id, 10.0);
        set_amount(&db, b, home.id, 25.0);

        let pick = db.best_tea_at(home.id).unwrap().unwrap();
        assert_eq!(pick.tea_id, b);
        assert_eq!(pick.amount, 25.0);
    }

    #[test]
    fn best_tea_breaks_ties_by_name() {
        let db = test_db();
        let z = db.add_tea(&new_tea("zhu cha", 4.0)).unwrap();
        let a = db.add_tea(&new_tea("assam", 4.0)).unwrap();
        let home = db.list_locations().unwrap()[0].clone();
        set_amount(&db, z, home.id, 10.0);
        set_amount(&db, a, home.id, 10.0);

        let pick = db.best_tea_at(home.id).unwrap().unwrap();
        assert_eq!(pick.tea_id, a);
    }

    #[test]
    fn best_tea_ignores_empty_and_other_locations() {
        let db = test_db();
        let tea_id = db.add_tea(&new_tea("sencha", 4.0)).unwrap();
        let locations = db.list_locations().unwrap();
        let (home, work) = (locations[0].clone(), locations[2].clone());
        assert!(db.best_tea_at(home.id).unwrap().is_none());

        set_amount(&db, tea_id, work.id, 12.0);
        assert!(db.best_tea_at(home.id).unwrap().is_none());
        assert!(db.best_tea_at(work.id).unwrap().is_some());
    }

    #[test]
    fn record_brew_decrements_and_floors_at_zero() {
        let db = test_db();
        let tea_id = db.add_tea(&new_tea("sencha", 4.0)).unwrap();
        let home = db.list_locations().unwrap()[0].clone();
        set_amount(&db, tea_id, home.id, 10.0);

        // 10 -> 6 -> 2 -> 0, then nothing left to pick.
        for expected in [6.0, 2.0, 0.0] {
            let pick = db.best_tea_at(home.id).unwrap().unwrap();
            db.record_brew(&pick, &home, "").unwrap();
            let teas = db.list_teas().unwrap();
            assert_eq!(teas[0].amount_at(home.id), expected);
        }
        assert!(db.best_tea_at(home.id).unwrap().is_none());
    }

    #[test]
    fn record_brew_uses_fallback_dose_when_unset() {
        let db = test_db();
        let tea_id = db.add_tea(&new_tea("mystery", 0.0)).unwrap();
        let home = db.list_locations().unwrap()[0].clone();
        set_amount(&db, tea_id, home.id, 10.0);

        let pick = db.best_tea_at(home.id).unwrap().unwrap();
        db.record_brew(&pick, &home, "").unwrap();
        assert_eq!(db.list_teas().unwrap()[0].amount_at(home.id), 6.0);
    }

    #[test]
    fn record_brew_appends_tagged_review() {
        let db = test_db();
        let tea_id = db.add_tea(&new_tea("sencha", 4.0)).unwrap();
        let home = db.list_locations().unwrap()[0].clone();
        set_amount(&db, tea_id, home.id, 10.0);

        let pick = db.best_tea_at(home.id).unwrap().unwrap();
        db.record_brew(&pick, &home, "grassy, a bit strong").unwrap();
        let notes = db.get_tea(tea_id).unwrap().unwrap().notes;
        assert_eq!(notes, "[Home] grassy, a bit strong");

        let pick = db.best_tea_at(home.id).unwrap().unwrap();
        db.record_brew(&pick, &home, "better at 70C").unwrap();
        let notes = db.get_tea(tea_id).unwrap().unwrap().notes;
        assert_eq!(notes, "[Home] grassy, a bit strong\n[Home] better at 70C");
    }

    #[test]
    fn record_brew_without_review_leaves_notes_alone() {
        let db = test_db();
        let tea_id = db
            .add_tea(&NewTea {
                notes: "existing note".to_string(),
                ..new_tea("sencha", 4.0)
            })
            .unwrap();
        let home = db.list_locations().unwrap()[0].clone();
        set_amount(&db, tea_id, home.id, 10.0);

        let pick = db.best_tea_at(home.id).unwrap().unwrap();
        db.record_brew(&pick, &home, "").unwrap();
        assert_eq!(db.get_tea(tea_id).unwrap().unwrap().notes, "existing note");
    }

    #[test]
    fn location_summaries_count_positive_amounts() {
        let db = test_db();
        let a = db.add_tea(&new_tea("assam", 4.0)).unwrap();
        let b = db.add_tea(&new_tea("sencha", 4.0)).unwrap();
        let locations = db.list_locations().unwrap();
        let home = locations[0].clone();
        set_amount(&db, a, home.id, 5.0);
        set_amount(&db, b, home.id, 3.0);

        let summaries = db.location_summaries().unwrap();
        assert_eq!(summaries.len(), 3);
        let by_name: HashMap<String, i64> = summaries
            .into_iter()
            .map(|s| (s.name, s.tea_count))
            .collect();
        assert_eq!(by_name["home"], 2);
        assert_eq!(by_name["work"], 0);
        assert_eq!(by_name["parents"], 0);
    }

    #[test]
    fn reopening_keeps_data_and_reruns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.keep().join("test.db");
        let tea_id = {
            let db = InventoryDb::open_path(&path).unwrap();
            db.add_tea(&new_tea("sencha", 4.0)).unwrap()
        };
        let db = InventoryDb::open_path(&path).unwrap();
        assert!(db.get_tea(tea_id).unwrap().is_some());
        assert_eq!(db.list_locations().unwrap().len(), 3);
    }
}
