use crate::corpus::RecipeRecord;
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Result, Transaction};
use std::path::Path;

pub const META_BUILT_AT: &str = "built_at";
pub const META_RECIPE_COUNT: &str = "recipe_count";

/// SQLite file holding one artifact bundle: metadata, vocabulary, recipes and
/// their precomputed vectors.
pub struct BundleDatabase {
    conn: Connection,
}

/// Raw vocabulary row as stored.
#[derive(Debug, Clone)]
pub struct VocabularyRow {
    pub idx: i64,
    pub term: String,
    pub idf: f64,
}

/// Raw vector row as stored.
#[derive(Debug, Clone)]
pub struct VectorRow {
    pub recipe_idx: i64,
    pub dim: i64,
    pub blob: Vec<u8>,
}

pub struct BundleWriteSession<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> BundleWriteSession<'conn> {
    pub fn set_meta(&mut self, key: &str, value: &str) -> Result<()> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO bundle_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        )?;
        stmt.execute(params![key, value])?;
        Ok(())
    }

    /// Stamp the bundle with its build time.
    pub fn stamp_built_at(&mut self) -> Result<()> {
        self.set_meta(META_BUILT_AT, &Utc::now().to_rfc3339())
    }

    pub fn set_recipe_count(&mut self, count: usize) -> Result<()> {
        self.set_meta(META_RECIPE_COUNT, &count.to_string())
    }

    pub fn insert_term(&mut self, idx: usize, term: &str, idf: f32) -> Result<()> {
        let mut stmt = self
            .tx
            .prepare_cached("INSERT INTO vocabulary (idx, term, idf) VALUES (?1, ?2, ?3)")?;
        stmt.execute(params![idx as i64, term, idf as f64])?;
        Ok(())
    }

    pub fn insert_recipe(
        &mut self,
        idx: usize,
        record: &RecipeRecord,
        vector: &[f32],
    ) -> Result<()> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO recipes (idx, name, image, total_time, ingredients, instructions, calories)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        stmt.execute(params![
            idx as i64,
            record.name,
            record.image,
            record.total_time,
            record.ingredients,
            record.instructions,
            record.calories,
        ])?;

        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO recipe_vectors (recipe_idx, dim, vector) VALUES (?1, ?2, ?3)",
        )?;
        let bytes: &[u8] = bytemuck::cast_slice(vector);
        stmt.execute(params![idx as i64, vector.len() as i64, bytes])?;
        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()
    }
}

impl BundleDatabase {
    /// Open (creating if needed) a bundle for writing.
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = BundleDatabase { conn };
        db.create_tables()?;
        Ok(db)
    }

    /// Open an existing bundle without write access.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(BundleDatabase { conn })
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS bundle_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS vocabulary (
                idx INTEGER PRIMARY KEY,
                term TEXT NOT NULL UNIQUE,
                idf REAL NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS recipes (
                idx INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                image TEXT NOT NULL,
                total_time TEXT NOT NULL,
                ingredients TEXT NOT NULL,
                instructions TEXT NOT NULL,
                calories REAL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS recipe_vectors (
                recipe_idx INTEGER PRIMARY KEY,
                dim INTEGER NOT NULL,
                vector BLOB NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub fn start_write(&mut self) -> Result<BundleWriteSession<'_>> {
        let tx = self.conn.transaction()?;
        Ok(BundleWriteSession { tx })
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM bundle_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
    }

    pub fn get_vocabulary(&self) -> Result<Vec<VocabularyRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT idx, term, idf FROM vocabulary ORDER BY idx")?;

        let rows = stmt.query_map([], |row| {
            Ok(VocabularyRow {
                idx: row.get(0)?,
                term: row.get(1)?,
                idf: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    /// Recipes in corpus order, paired with their stored index.
    pub fn get_recipes(&self) -> Result<Vec<(i64, RecipeRecord)>> {
        let mut stmt = self.conn.prepare(
            "SELECT idx, name, image, total_time, ingredients, instructions, calories
             FROM recipes ORDER BY idx",
        )?;

        let rows = stmt.query_map([], |row| {
            let record = RecipeRecord::new(
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<f64>>(6)?,
            );
            Ok((row.get(0)?, record))
        })?;

        rows.collect()
    }

    pub fn get_vectors(&self) -> Result<Vec<VectorRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT recipe_idx, dim, vector FROM recipe_vectors ORDER BY recipe_idx")?;

        let rows = stmt.query_map([], |row| {
            Ok(VectorRow {
                recipe_idx: row.get(0)?,
                dim: row.get(1)?,
                blob: row.get(2)?,
            })
        })?;

        rows.collect()
    }
}
