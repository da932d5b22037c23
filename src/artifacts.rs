use crate::corpus::{Corpus, RecipeRecord, VectorMatrix};
use crate::database::{
    BundleDatabase, VectorRow, VocabularyRow, META_BUILT_AT, META_RECIPE_COUNT,
};
use crate::error::ArtifactLoadError;
use crate::vectorizer::VectorizerModel;
use log::{debug, info};
use std::path::Path;

/// Everything a recommendation engine needs, loaded once and read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    corpus: Corpus,
    vectorizer: VectorizerModel,
    built_at: Option<String>,
}

impl Artifacts {
    /// Assemble artifacts from in-memory parts, checking that every corpus
    /// vector has the vectorizer's dimension.
    pub fn new(corpus: Corpus, vectorizer: VectorizerModel) -> Result<Self, ArtifactLoadError> {
        if corpus.vectors().dim() != vectorizer.dim() {
            return Err(ArtifactLoadError::DimensionMismatch {
                recipe: 0,
                expected: vectorizer.dim(),
                actual: corpus.vectors().dim(),
            });
        }
        Ok(Self {
            corpus,
            vectorizer,
            built_at: None,
        })
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn vectorizer(&self) -> &VectorizerModel {
        &self.vectorizer
    }

    /// RFC 3339 build timestamp recorded in the bundle, if any.
    pub fn built_at(&self) -> Option<&str> {
        self.built_at.as_deref()
    }
}

/// Read an artifact bundle from disk.
///
/// The bundle is opened read-only, so calling this again on the same file
/// returns the same logical data. A bundle without a build stamp, or whose
/// recipe table disagrees with its recorded recipe count, is rejected.
pub fn load_artifacts(path: &Path) -> Result<Artifacts, ArtifactLoadError> {
    if !path.is_file() {
        return Err(ArtifactLoadError::Missing(path.to_path_buf()));
    }

    info!("Loading artifact bundle from {}", path.display());
    let db = BundleDatabase::open_read_only(path)?;

    let built_at = db
        .get_meta(META_BUILT_AT)?
        .ok_or_else(|| ArtifactLoadError::Corrupt("bundle has no build stamp".to_string()))?;
    let expected_records = db
        .get_meta(META_RECIPE_COUNT)?
        .and_then(|value| value.parse::<usize>().ok())
        .ok_or_else(|| {
            ArtifactLoadError::Corrupt("bundle has no valid recipe count".to_string())
        })?;

    let vectorizer = decode_vocabulary(db.get_vocabulary()?)?;
    let records = decode_recipes(db.get_recipes()?)?;
    if records.len() != expected_records {
        return Err(ArtifactLoadError::Corrupt(format!(
            "bundle records {} recipes but holds {}",
            expected_records,
            records.len()
        )));
    }
    let vectors = decode_vectors(db.get_vectors()?, records.len(), vectorizer.dim())?;

    let record_count = records.len();
    let corpus = Corpus::new(records, vectors).ok_or_else(|| {
        ArtifactLoadError::Corrupt("recipe table and vectors are not aligned".to_string())
    })?;
    let mut artifacts = Artifacts::new(corpus, vectorizer)?;
    artifacts.built_at = Some(built_at);

    info!(
        "Loaded {} recipes with {}-term vocabulary (built {})",
        record_count,
        artifacts.vectorizer.dim(),
        artifacts.built_at().unwrap_or_default()
    );

    Ok(artifacts)
}

fn decode_vocabulary(rows: Vec<VocabularyRow>) -> Result<VectorizerModel, ArtifactLoadError> {
    let mut entries = Vec::with_capacity(rows.len());
    for (position, row) in rows.into_iter().enumerate() {
        if row.idx != position as i64 {
            return Err(ArtifactLoadError::Corrupt(format!(
                "vocabulary index {} found at position {}",
                row.idx, position
            )));
        }
        if !row.idf.is_finite() {
            return Err(ArtifactLoadError::Corrupt(format!(
                "non-finite weight for term '{}'",
                row.term
            )));
        }
        entries.push((row.term, row.idf as f32));
    }
    debug!("Decoded {} vocabulary terms", entries.len());
    Ok(VectorizerModel::from_parts(entries))
}

fn decode_recipes(rows: Vec<(i64, RecipeRecord)>) -> Result<Vec<RecipeRecord>, ArtifactLoadError> {
    rows.into_iter()
        .enumerate()
        .map(|(position, (idx, record))| {
            if idx == position as i64 {
                Ok(record)
            } else {
                Err(ArtifactLoadError::Corrupt(format!(
                    "recipe index {} found at position {}",
                    idx, position
                )))
            }
        })
        .collect()
}

fn decode_vectors(
    rows: Vec<VectorRow>,
    record_count: usize,
    dim: usize,
) -> Result<VectorMatrix, ArtifactLoadError> {
    if rows.len() != record_count {
        return Err(ArtifactLoadError::VectorCountMismatch {
            records: record_count,
            vectors: rows.len(),
        });
    }

    let mut matrix = VectorMatrix::with_capacity(dim, record_count);
    for (position, row) in rows.iter().enumerate() {
        if row.recipe_idx != position as i64 {
            return Err(ArtifactLoadError::Corrupt(format!(
                "missing vector for recipe {}",
                position
            )));
        }
        if row.dim != dim as i64 {
            return Err(ArtifactLoadError::DimensionMismatch {
                recipe: position,
                expected: dim,
                actual: row.dim.max(0) as usize,
            });
        }
        let values = decode_blob(&row.blob).ok_or_else(|| {
            ArtifactLoadError::Corrupt(format!("malformed vector blob for recipe {}", position))
        })?;
        matrix
            .push_row(&values)
            .map_err(|actual| ArtifactLoadError::DimensionMismatch {
                recipe: position,
                expected: dim,
                actual,
            })?;
    }
    Ok(matrix)
}

fn decode_blob(blob: &[u8]) -> Option<Vec<f32>> {
    const WIDTH: usize = std::mem::size_of::<f32>();
    if blob.len() % WIDTH != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(WIDTH)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};
    use tempfile::TempDir;

    fn write_bundle(path: &Path) {
        let mut db = BundleDatabase::create(path).unwrap();
        let mut session = db.start_write().unwrap();
        session.stamp_built_at().unwrap();
        session.set_recipe_count(2).unwrap();
        session.insert_term(0, "chicken", 1.0).unwrap();
        session.insert_term(1, "rice", 1.5).unwrap();
        let record = RecipeRecord::new("Chicken Rice", "img.jpg", "PT30M", "rice", "", None);
        session.insert_recipe(0, &record, &[0.6, 0.8]).unwrap();
        let record = RecipeRecord::new("Plain Rice", "", "20 min", "rice", "Boil.", Some(150.0));
        session.insert_recipe(1, &record, &[0.0, 1.0]).unwrap();
        session.commit().unwrap();
    }

    #[test]
    fn loads_consistent_bundle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.db");
        write_bundle(&path);

        let artifacts = load_artifacts(&path).expect("bundle loads");
        assert_eq!(artifacts.vectorizer().dim(), 2);
        assert_eq!(artifacts.corpus().len(), 2);
        assert_eq!(artifacts.corpus().vectors().row(0), &[0.6, 0.8]);
        assert_eq!(artifacts.corpus().records()[0].total_minutes, Some(30));
        assert_eq!(artifacts.corpus().records()[1].calories, Some(150.0));
        assert!(artifacts.built_at().is_some());

        let again = load_artifacts(&path).expect("bundle loads twice");
        assert_eq!(again, artifacts);
    }

    #[test]
    fn missing_bundle_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = load_artifacts(&dir.path().join("absent.db")).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Missing(_)));
    }

    #[test]
    fn non_sqlite_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, b"definitely not a database file, just some bytes").unwrap();
        assert!(matches!(
            load_artifacts(&path).unwrap_err(),
            ArtifactLoadError::Database(_)
        ));
    }

    #[test]
    fn vector_count_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.db");
        write_bundle(&path);
        let conn = Connection::open(&path).unwrap();
        conn.execute("DELETE FROM recipe_vectors WHERE recipe_idx = 1", [])
            .unwrap();
        drop(conn);

        assert!(matches!(
            load_artifacts(&path).unwrap_err(),
            ArtifactLoadError::VectorCountMismatch {
                records: 2,
                vectors: 1
            }
        ));
    }

    #[test]
    fn bundle_missing_recipes_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.db");
        write_bundle(&path);
        let conn = Connection::open(&path).unwrap();
        conn.execute("DELETE FROM recipes WHERE idx = 1", []).unwrap();
        conn.execute("DELETE FROM recipe_vectors WHERE recipe_idx = 1", [])
            .unwrap();
        drop(conn);

        let err = load_artifacts(&path).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Corrupt(ref msg) if msg.contains("2 recipes")));
    }

    #[test]
    fn schema_only_bundle_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.db");
        drop(BundleDatabase::create(&path).unwrap());

        assert!(matches!(
            load_artifacts(&path).unwrap_err(),
            ArtifactLoadError::Corrupt(_)
        ));
    }

    #[test]
    fn bundle_without_build_stamp_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.db");
        write_bundle(&path);
        let conn = Connection::open(&path).unwrap();
        conn.execute("DELETE FROM bundle_meta WHERE key = 'built_at'", [])
            .unwrap();
        drop(conn);

        assert!(matches!(
            load_artifacts(&path).unwrap_err(),
            ArtifactLoadError::Corrupt(_)
        ));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.db");
        write_bundle(&path);
        let conn = Connection::open(&path).unwrap();
        conn.execute("DELETE FROM vocabulary WHERE idx = 1", []).unwrap();
        drop(conn);

        assert!(matches!(
            load_artifacts(&path).unwrap_err(),
            ArtifactLoadError::DimensionMismatch {
                recipe: 0,
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn truncated_blob_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.db");
        write_bundle(&path);
        let conn = Connection::open(&path).unwrap();
        conn.execute(
            "UPDATE recipe_vectors SET vector = ?1 WHERE recipe_idx = 0",
            params![vec![0u8; 7]],
        )
        .unwrap();
        drop(conn);

        assert!(matches!(
            load_artifacts(&path).unwrap_err(),
            ArtifactLoadError::Corrupt(_)
        ));
    }
}
