use crate::duration::parse_minutes;
use serde::Serialize;

/// One recipe row, normalized once at the loading boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeRecord {
    pub name: String,
    pub image: String,
    pub total_time: String,
    pub ingredients: String,
    pub instructions: String,
    pub calories: Option<f64>,
    /// `total_time` parsed to minutes; `None` when unparseable.
    #[serde(skip)]
    pub total_minutes: Option<u32>,
}

impl RecipeRecord {
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        total_time: impl Into<String>,
        ingredients: impl Into<String>,
        instructions: impl Into<String>,
        calories: Option<f64>,
    ) -> Self {
        let total_time = total_time.into();
        let total_minutes = parse_minutes(&total_time);
        RecipeRecord {
            name: name.into(),
            image: image.into(),
            total_time,
            ingredients: ingredients.into(),
            instructions: instructions.into(),
            calories: calories.filter(|c| c.is_finite()),
            total_minutes,
        }
    }

    /// Text the vectorizer sees for this record at build time.
    pub fn document_text(&self) -> String {
        format!("{} {}", self.name, self.ingredients)
    }
}

/// Dense row-major matrix of precomputed corpus vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorMatrix {
    dim: usize,
    rows: usize,
    data: Vec<f32>,
}

impl VectorMatrix {
    pub fn new(dim: usize) -> Self {
        Self::with_capacity(dim, 0)
    }

    pub fn with_capacity(dim: usize, rows: usize) -> Self {
        Self {
            dim,
            rows: 0,
            data: Vec::with_capacity(dim * rows),
        }
    }

    /// Append one row. Fails with the offending length when it differs from `dim`.
    pub fn push_row(&mut self, row: &[f32]) -> Result<(), usize> {
        if row.len() != self.dim {
            return Err(row.len());
        }
        self.data.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }
}

/// Immutable recipe table plus the vector of each record, index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    records: Vec<RecipeRecord>,
    vectors: VectorMatrix,
}

impl Corpus {
    /// Pair records with vectors. Returns `None` when the counts differ.
    pub fn new(records: Vec<RecipeRecord>, vectors: VectorMatrix) -> Option<Self> {
        (records.len() == vectors.rows()).then_some(Self { records, vectors })
    }

    pub fn records(&self) -> &[RecipeRecord] {
        &self.records
    }

    pub fn vectors(&self) -> &VectorMatrix {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_parses_time_and_drops_non_finite_calories() {
        let record = RecipeRecord::new("Soup", "", "1 hr 10 min", "", "", Some(f64::NAN));
        assert_eq!(record.total_minutes, Some(70));
        assert_eq!(record.calories, None);

        let record = RecipeRecord::new("Soup", "", "whenever", "", "", Some(120.0));
        assert_eq!(record.total_minutes, None);
        assert_eq!(record.calories, Some(120.0));
    }

    #[test]
    fn matrix_rejects_wrong_width_rows() {
        let mut matrix = VectorMatrix::new(2);
        assert!(matrix.push_row(&[1.0, 0.0]).is_ok());
        assert_eq!(matrix.push_row(&[1.0]), Err(1));
        assert_eq!(matrix.rows(), 1);
        assert_eq!(matrix.row(0), &[1.0, 0.0]);
    }

    #[test]
    fn zero_width_matrix_still_counts_rows() {
        let mut matrix = VectorMatrix::new(0);
        matrix.push_row(&[]).unwrap();
        matrix.push_row(&[]).unwrap();
        assert_eq!(matrix.rows(), 2);
        assert!(matrix.row(1).is_empty());
    }

    #[test]
    fn corpus_requires_aligned_vectors() {
        let records = vec![RecipeRecord::new("A", "", "", "", "", None)];
        assert!(Corpus::new(records.clone(), VectorMatrix::new(3)).is_none());

        let mut vectors = VectorMatrix::new(1);
        vectors.push_row(&[1.0]).unwrap();
        let corpus = Corpus::new(records, vectors).expect("aligned corpus");
        assert_eq!(corpus.len(), 1);
    }
}
