use crate::artifacts::Artifacts;
use crate::corpus::RecipeRecord;
use crate::error::InvalidQueryError;
use crate::scorer;
use log::{debug, info};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Output column of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Image,
    TotalTime,
    Ingredients,
    Instructions,
    Calories,
    Similarity,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Name,
        Field::Image,
        Field::TotalTime,
        Field::Ingredients,
        Field::Instructions,
        Field::Calories,
        Field::Similarity,
    ];

    /// Key used when the record is serialized.
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Image => "image",
            Field::TotalTime => "total_time",
            Field::Ingredients => "ingredients",
            Field::Instructions => "instructions",
            Field::Calories => "calories",
            Field::Similarity => "similarity",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Name => &["name"],
            Field::Image => &["image", "image_first", "images"],
            Field::TotalTime => &["total_time", "totaltime_str", "totaltime", "time"],
            Field::Ingredients => &["ingredients", "ingredients_clean"],
            Field::Instructions => &["instructions", "recipe_instructions_clean"],
            Field::Calories => &["calories"],
            Field::Similarity => &["similarity", "score"],
        }
    }
}

impl FromStr for Field {
    type Err = InvalidQueryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let needle = raw.trim().to_lowercase();
        Field::ALL
            .into_iter()
            .find(|field| field.aliases().contains(&needle.as_str()))
            .ok_or_else(|| InvalidQueryError::UnknownColumn(raw.to_string()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Resolve column names (aliases accepted, case-insensitive) to fields.
pub fn parse_columns<S: AsRef<str>>(names: &[S]) -> Result<Vec<Field>, InvalidQueryError> {
    names.iter().map(|name| name.as_ref().parse()).collect()
}

/// One recommendation call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub query: String,
    /// Maximum total time in minutes.
    pub time_pref: Option<u32>,
    /// Maximum calorie count.
    pub calorie_pref: Option<f64>,
    pub top_n: i64,
    pub columns: Vec<Field>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, top_n: i64) -> Self {
        QueryRequest {
            query: query.into(),
            time_pref: None,
            calorie_pref: None,
            top_n,
            columns: Field::ALL.to_vec(),
        }
    }

    pub fn with_time_pref(mut self, max_minutes: Option<u32>) -> Self {
        self.time_pref = max_minutes;
        self
    }

    pub fn with_calorie_pref(mut self, max_calories: Option<f64>) -> Self {
        self.calorie_pref = max_calories;
        self
    }

    pub fn with_columns(mut self, columns: Vec<Field>) -> Self {
        self.columns = columns;
        self
    }

    fn validate(&self) -> Result<usize, InvalidQueryError> {
        if self.top_n <= 0 {
            return Err(InvalidQueryError::NonPositiveTopN(self.top_n));
        }
        if self.columns.is_empty() {
            return Err(InvalidQueryError::NoColumns);
        }
        if let Some(max) = self.calorie_pref {
            if !max.is_finite() || max < 0.0 {
                return Err(InvalidQueryError::InvalidCaloriePreference(max));
            }
        }
        Ok(usize::try_from(self.top_n).unwrap_or(usize::MAX))
    }
}

/// Value of one projected column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    /// Always finite when present.
    Number(Option<f64>),
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(text) => serializer.serialize_str(text),
            FieldValue::Number(Some(value)) => serializer.serialize_f64(*value),
            FieldValue::Number(None) => serializer.serialize_none(),
        }
    }
}

/// A ranked recipe projected to the requested columns, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRecord {
    fields: Vec<(Field, FieldValue)>,
}

impl ProjectedRecord {
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, value)| value)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match self.get(field) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn number(&self, field: Field) -> Option<f64> {
        match self.get(field) {
            Some(FieldValue::Number(value)) => *value,
            _ => None,
        }
    }

    pub fn fields(&self) -> &[(Field, FieldValue)] {
        &self.fields
    }
}

impl Serialize for ProjectedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field.key(), value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy)]
struct ScoredCandidate {
    index: usize,
    score: f32,
}

/// Query handle over one loaded artifact snapshot.
///
/// Cloning shares the snapshot; every call is independent and reads only.
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    artifacts: Arc<Artifacts>,
}

impl RecommendationEngine {
    pub fn new(artifacts: Artifacts) -> Self {
        Self::from_shared(Arc::new(artifacts))
    }

    pub fn from_shared(artifacts: Arc<Artifacts>) -> Self {
        RecommendationEngine { artifacts }
    }

    /// Recommend with every column returned.
    pub fn recommend_default(
        &self,
        query: &str,
        time_pref: Option<u32>,
        calorie_pref: Option<f64>,
        top_n: i64,
    ) -> Result<Vec<ProjectedRecord>, InvalidQueryError> {
        let request = QueryRequest::new(query, top_n)
            .with_time_pref(time_pref)
            .with_calorie_pref(calorie_pref);
        self.recommend(&request)
    }

    /// Rank the corpus against `request`.
    ///
    /// An empty result is a valid answer: the corpus was empty or no recipe
    /// passed the filters.
    pub fn recommend(
        &self,
        request: &QueryRequest,
    ) -> Result<Vec<ProjectedRecord>, InvalidQueryError> {
        let top_n = request.validate()?;
        let corpus = self.artifacts.corpus();
        if corpus.is_empty() {
            info!("Recommendation skipped: corpus is empty");
            return Ok(Vec::new());
        }

        let query_vector = self.artifacts.vectorizer().vectorize(&request.query);
        let scores = scorer::score(&query_vector, corpus.vectors());
        let records = corpus.records();

        let mut candidates: Vec<ScoredCandidate> = scores
            .into_iter()
            .enumerate()
            .filter(|(index, _)| passes_filters(&records[*index], request))
            .map(|(index, score)| ScoredCandidate { index, score })
            .collect();

        // `sort_by` is stable, so equal scores keep corpus order.
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut seen: HashSet<&str> = HashSet::new();
        let results: Vec<ProjectedRecord> = candidates
            .into_iter()
            .filter(|candidate| seen.insert(records[candidate.index].name.as_str()))
            .take(top_n)
            .map(|candidate| {
                project(
                    &records[candidate.index],
                    candidate.score,
                    &request.columns,
                )
            })
            .collect();

        debug!(
            "Query {:?} (max {:?} min, max {:?} kcal) returned {} of {} recipes",
            request.query,
            request.time_pref,
            request.calorie_pref,
            results.len(),
            corpus.len()
        );

        Ok(results)
    }
}

fn passes_filters(record: &RecipeRecord, request: &QueryRequest) -> bool {
    if let Some(max_minutes) = request.time_pref {
        match record.total_minutes {
            Some(minutes) if minutes <= max_minutes => {}
            _ => return false,
        }
    }
    if let Some(max_calories) = request.calorie_pref {
        match record.calories {
            Some(calories) if calories.is_finite() && calories <= max_calories => {}
            _ => return false,
        }
    }
    true
}

fn project(record: &RecipeRecord, score: f32, columns: &[Field]) -> ProjectedRecord {
    let fields = columns
        .iter()
        .map(|&field| {
            let value = match field {
                Field::Name => FieldValue::Text(record.name.clone()),
                Field::Image => FieldValue::Text(record.image.clone()),
                Field::TotalTime => FieldValue::Text(record.total_time.clone()),
                Field::Ingredients => FieldValue::Text(record.ingredients.clone()),
                Field::Instructions => FieldValue::Text(record.instructions.clone()),
                Field::Calories => FieldValue::Number(finite(record.calories)),
                Field::Similarity => FieldValue::Number(finite(Some(f64::from(score)))),
            };
            (field, value)
        })
        .collect();
    ProjectedRecord { fields }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
