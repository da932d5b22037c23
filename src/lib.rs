pub mod artifacts;
pub mod brief;
pub mod builder;
pub mod config;
pub mod corpus;
pub mod database;
pub mod duration;
pub mod engine;
pub mod error;
pub mod recipe_loader;
pub mod scorer;
pub mod vectorizer;

pub use artifacts::{load_artifacts, Artifacts};
pub use brief::RecipeBrief;
pub use builder::{build_bundle, BuildOptions, BuildReport};
pub use corpus::{Corpus, RecipeRecord, VectorMatrix};
pub use engine::{
    parse_columns, Field, FieldValue, ProjectedRecord, QueryRequest, RecommendationEngine,
};
pub use error::{ArtifactLoadError, BuildError, InvalidQueryError};
pub use vectorizer::{FitOptions, VectorizerModel};
