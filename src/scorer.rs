use crate::corpus::VectorMatrix;
use rayon::prelude::*;

/// Cosine similarity of `query` against every row of `matrix`, in row order.
///
/// A row scores 0 when either vector has zero norm or the arithmetic is not
/// finite, so degenerate rows never surface NaN or infinity. `query` must
/// have the matrix dimension.
pub fn score(query: &[f32], matrix: &VectorMatrix) -> Vec<f32> {
    debug_assert_eq!(query.len(), matrix.dim(), "query dimension");
    let rows = matrix.rows();
    if rows == 0 {
        return Vec::new();
    }

    let query_norm = norm(query);
    if query_norm == 0.0 || !query_norm.is_finite() {
        return vec![0.0; rows];
    }

    (0..rows)
        .into_par_iter()
        .map(|i| cosine(query, query_norm, matrix.row(i)))
        .collect()
}

fn cosine(query: &[f32], query_norm: f32, row: &[f32]) -> f32 {
    let row_norm = norm(row);
    if row_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(row).map(|(q, r)| q * r).sum();
    let similarity = dot / (query_norm * row_norm);
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}
