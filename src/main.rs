use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use recipe_recommender::config::Settings;
use recipe_recommender::{
    build_bundle, load_artifacts, parse_columns, BuildOptions, Field, FitOptions, QueryRequest,
    RecipeBrief, RecommendationEngine,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "recipe-recommender", about = "Recommend recipes from free-text preferences")]
struct Cli {
    /// Artifact bundle path (defaults to RECIPE_BUNDLE or data/recipes.db)
    #[arg(long, global = true)]
    bundle: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an artifact bundle from a recipe CSV
    Build {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        min_df: Option<usize>,
        #[arg(long)]
        max_features: Option<usize>,
    },
    /// Print ranked recipes as JSON
    Recommend(QueryArgs),
    /// Print the top recipe as a JSON brief for the critique step
    Brief(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// Ingredients and preferences, free text
    query: String,
    /// Only recipes ready within this many minutes
    #[arg(long)]
    max_minutes: Option<u32>,
    /// Only recipes with at most this many calories
    #[arg(long)]
    max_calories: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    top_n: Option<i64>,
    /// Comma-separated output columns
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
}

fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();

    let cli = Cli::parse();
    let settings = Settings::from_env();
    let bundle = cli.bundle.unwrap_or_else(|| settings.bundle_path.clone());

    match cli.command {
        Command::Build {
            csv,
            min_df,
            max_features,
        } => {
            let options = BuildOptions {
                fit: FitOptions {
                    min_df: min_df.unwrap_or(settings.min_df),
                    max_features: max_features.or(settings.max_features),
                },
            };
            if let Some(parent) = bundle.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let report = build_bundle(&csv, &bundle, &options)
                .with_context(|| format!("Failed to build bundle from {}", csv.display()))?;
            info!(
                "Build finished: {} processed, {} inserted, {} skipped, {} terms",
                report.processed, report.inserted, report.skipped, report.vocabulary_size
            );
        }
        Command::Recommend(args) => {
            let engine = open_engine(&bundle)?;
            let request = query_request(&args, &settings)?;
            let results = engine.recommend(&request)?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Brief(args) => {
            let engine = open_engine(&bundle)?;
            let request = query_request(&args, &settings)?.with_columns(Field::ALL.to_vec());
            let results = engine.recommend(&request)?;
            let brief = RecipeBrief::from_results(&results, &request.query);
            println!("{}", serde_json::to_string_pretty(&brief)?);
        }
    }

    Ok(())
}

fn open_engine(bundle: &Path) -> Result<RecommendationEngine> {
    let artifacts = load_artifacts(bundle)
        .with_context(|| format!("Failed to load artifact bundle {}", bundle.display()))?;
    Ok(RecommendationEngine::new(artifacts))
}

fn query_request(args: &QueryArgs, settings: &Settings) -> Result<QueryRequest> {
    let mut request = QueryRequest::new(args.query.clone(), args.top_n.unwrap_or(settings.top_n))
        .with_time_pref(args.max_minutes)
        .with_calorie_pref(args.max_calories);
    if !args.columns.is_empty() {
        request = request.with_columns(parse_columns(&args.columns)?);
    }
    Ok(request)
}
