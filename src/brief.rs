use crate::engine::{Field, ProjectedRecord};
use serde::Serialize;

const MAX_INGREDIENT_CHARS: usize = 1000;
const MAX_INSTRUCTION_CHARS: usize = 1500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeBrief {
    pub query: String,
    pub name: String,
    pub ingredients: String,
    pub instructions: String,
    pub similarity: Option<f64>,
}

impl RecipeBrief {
    /// Brief for the first result, or `None` when nothing was recommended.
    pub fn from_results(results: &[ProjectedRecord], query: &str) -> Option<Self> {
        let top = results.first()?;
        Some(RecipeBrief {
            query: query.to_string(),
            name: text_or(top, Field::Name, "Unknown Recipe"),
            ingredients: truncate(
                &text_or(top, Field::Ingredients, "No ingredients"),
                MAX_INGREDIENT_CHARS,
            ),
            instructions: truncate(
                &text_or(top, Field::Instructions, "No instructions"),
                MAX_INSTRUCTION_CHARS,
            ),
            similarity: top.number(Field::Similarity),
        })
    }
}

fn text_or(record: &ProjectedRecord, field: Field, fallback: &str) -> String {
    record
        .text(field)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
