use crate::corpus::RecipeRecord;
use crate::error::BuildError;
use csv::{ReaderBuilder, StringRecord};
use log::warn;
use std::fs;
use std::fs::File;
use std::path::Path;

const NAME_ALIASES: &[&str] = &["name"];
const IMAGE_ALIASES: &[&str] = &["image_first", "images", "image"];
const TIME_ALIASES: &[&str] = &["totaltime_str", "totaltime", "total_time"];
const INGREDIENT_ALIASES: &[&str] = &[
    "ingredients_clean",
    "recipeingredientparts",
    "ingredients",
];
const INSTRUCTION_ALIASES: &[&str] = &[
    "recipe_instructions_clean",
    "recipeinstructions",
    "instructions",
];
const CALORIE_ALIASES: &[&str] = &["calories"];

#[derive(Debug, Clone)]
pub struct RecipeLoadReport {
    pub processed: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub records: Vec<RecipeRecord>,
}

/// Column positions resolved once from the CSV header row.
struct ColumnMap {
    name: usize,
    image: Option<usize>,
    total_time: Option<usize>,
    ingredients: Option<usize>,
    instructions: Option<usize>,
    calories: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, BuildError> {
        let find = |aliases: &[&str]| {
            aliases.iter().find_map(|alias| {
                headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(alias))
            })
        };

        Ok(ColumnMap {
            name: find(NAME_ALIASES).ok_or(BuildError::MissingColumn("Name"))?,
            image: find(IMAGE_ALIASES),
            total_time: find(TIME_ALIASES),
            ingredients: find(INGREDIENT_ALIASES),
            instructions: find(INSTRUCTION_ALIASES),
            calories: find(CALORIE_ALIASES),
        })
    }

    fn text(record: &StringRecord, index: Option<usize>) -> String {
        index
            .and_then(|i| record.get(i))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    }
}

pub struct RecipeLoader;

impl RecipeLoader {
    pub fn new() -> Self {
        RecipeLoader
    }

    /// Read recipes from a CSV file.
    ///
    /// Only a name column is required; other columns are matched by alias
    /// and default to empty text or absent calories.
    pub fn load_from_csv_with_progress<F>(
        &self,
        csv_path: &Path,
        mut progress_callback: Option<F>,
    ) -> Result<RecipeLoadReport, BuildError>
    where
        F: FnMut(usize, u64, u64),
    {
        let total_bytes = fs::metadata(csv_path)?.len().max(1);
        let file = File::open(csv_path)?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);
        let columns = ColumnMap::from_headers(reader.headers()?)?;

        let mut processed = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();
        let mut records = Vec::new();

        let mut row = StringRecord::new();
        let mut line_index = 0usize;

        loop {
            match reader.read_record(&mut row) {
                Ok(true) => {
                    processed += 1;
                    let display_line = line_index + 2;

                    let name = ColumnMap::text(&row, Some(columns.name));
                    if name.is_empty() {
                        skipped += 1;
                        errors.push(format!("Line {}: Empty recipe name", display_line));
                    } else {
                        let raw_calories = ColumnMap::text(&row, columns.calories);
                        let calories = parse_calories(&raw_calories);
                        if calories.is_none() && !raw_calories.is_empty() {
                            warn!(
                                "Line {}: unparseable calories '{}' for '{}'",
                                display_line, raw_calories, name
                            );
                        }
                        records.push(RecipeRecord::new(
                            name,
                            ColumnMap::text(&row, columns.image),
                            ColumnMap::text(&row, columns.total_time),
                            ColumnMap::text(&row, columns.ingredients),
                            ColumnMap::text(&row, columns.instructions),
                            calories,
                        ));
                    }

                    line_index += 1;
                }
                Ok(false) => break,
                Err(e) => {
                    processed += 1;
                    skipped += 1;
                    errors.push(format!("Line {}: {}", line_index + 2, e));
                    line_index += 1;
                }
            }

            if let Some(cb) = progress_callback.as_mut() {
                cb(processed, reader.position().byte(), total_bytes);
            }
        }

        Ok(RecipeLoadReport {
            processed,
            inserted: records.len(),
            skipped,
            errors,
            records,
        })
    }

    pub fn load_from_csv(&self, csv_path: &Path) -> Result<RecipeLoadReport, BuildError> {
        self.load_from_csv_with_progress(csv_path, Option::<fn(usize, u64, u64)>::None)
    }
}

impl Default for RecipeLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_calories(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}
