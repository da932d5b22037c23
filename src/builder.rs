use crate::corpus::RecipeRecord;
use crate::database::BundleDatabase;
use crate::error::BuildError;
use crate::recipe_loader::RecipeLoader;
use crate::vectorizer::{FitOptions, VectorizerModel};
use log::{info, warn};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub type ProgressCallback = Arc<Mutex<dyn FnMut(usize, usize) + Send>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub fit: FitOptions,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub processed: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub vocabulary_size: usize,
    pub errors: Vec<String>,
}

/// Build an artifact bundle at `bundle_path` from a recipe CSV.
///
/// The bundle is written to a staging file in the same directory and renamed
/// over `bundle_path` only after the write commits. A failed build leaves any
/// previous bundle untouched.
pub fn build_bundle(
    csv_path: &Path,
    bundle_path: &Path,
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    info!("Reading recipes from {}", csv_path.display());
    let report = RecipeLoader::new().load_from_csv_with_progress(
        csv_path,
        Some(make_byte_progress_logger("CSV import")),
    )?;
    for error in &report.errors {
        warn!("Skipped row: {}", error);
    }
    if report.records.is_empty() {
        return Err(BuildError::Empty);
    }

    let documents: Vec<String> = report
        .records
        .par_iter()
        .map(RecipeRecord::document_text)
        .collect();
    let vectorizer = VectorizerModel::fit(&documents, options.fit);
    info!(
        "Fitted vocabulary of {} terms over {} recipes",
        vectorizer.dim(),
        documents.len()
    );

    let vectors = vectorize_corpus(
        &vectorizer,
        &documents,
        Some(make_logging_progress_callback(
            "Vectorizing",
            "recipes",
            documents.len(),
        )),
    );

    replace_bundle(bundle_path, |db| {
        let mut session = db.start_write()?;
        session.stamp_built_at()?;
        session.set_recipe_count(report.records.len())?;
        for (idx, (term, idf)) in vectorizer
            .terms()
            .iter()
            .zip(vectorizer.idf().iter())
            .enumerate()
        {
            session.insert_term(idx, term, *idf)?;
        }
        for (idx, (record, vector)) in report.records.iter().zip(&vectors).enumerate() {
            session.insert_recipe(idx, record, vector)?;
        }
        session.commit()?;
        Ok(())
    })?;

    info!(
        "Wrote bundle {} ({} recipes, {} skipped)",
        bundle_path.display(),
        report.inserted,
        report.skipped
    );

    Ok(BuildReport {
        processed: report.processed,
        inserted: report.inserted,
        skipped: report.skipped,
        vocabulary_size: vectorizer.dim(),
        errors: report.errors,
    })
}

/// Run `write` against a fresh staging database, then move it over
/// `bundle_path`. The staging file is removed if `write` fails.
fn replace_bundle<F>(bundle_path: &Path, write: F) -> Result<(), BuildError>
where
    F: FnOnce(&mut BundleDatabase) -> Result<(), BuildError>,
{
    let dir = match bundle_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(".bundle-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    {
        let mut db = BundleDatabase::create(staging.path())?;
        write(&mut db)?;
    }

    staging
        .persist(bundle_path)
        .map_err(|err| BuildError::Io(err.error))?;
    Ok(())
}

/// Vectorize every document in parallel, preserving input order.
pub fn vectorize_corpus(
    vectorizer: &VectorizerModel,
    documents: &[String],
    progress_callback: Option<ProgressCallback>,
) -> Vec<Vec<f32>> {
    let total = documents.len();
    let processed = AtomicUsize::new(0);

    documents
        .par_chunks(256)
        .flat_map_iter(|chunk| {
            let vectors: Vec<Vec<f32>> = chunk.iter().map(|d| vectorizer.vectorize(d)).collect();

            if let Some(ref callback) = progress_callback {
                let completed = processed.fetch_add(chunk.len(), Ordering::Relaxed) + chunk.len();
                if let Ok(mut cb) = callback.lock() {
                    cb(completed.min(total), total);
                }
            }

            vectors
        })
        .collect()
}

fn make_logging_progress_callback(
    activity: &'static str,
    unit_label: &'static str,
    total_hint: usize,
) -> ProgressCallback {
    let mut last_percent: Option<usize> = None;
    Arc::new(Mutex::new(move |completed: usize, total: usize| {
        let total_units = if total == 0 { total_hint.max(1) } else { total };
        let done_units = completed.min(total_units);
        let percent = ((done_units as f64 / total_units as f64) * 100.0)
            .round()
            .clamp(0.0, 100.0) as usize;

        let should_log = match last_percent {
            Some(prev) => percent >= prev.saturating_add(5) || (percent == 100 && percent != prev),
            None => true,
        };

        if should_log {
            info!(
                "{} progress: {}% ({} / {} {})",
                activity, percent, done_units, total_units, unit_label
            );
            last_percent = Some(percent);
        }
    }))
}

fn make_byte_progress_logger(activity: &'static str) -> impl FnMut(usize, u64, u64) {
    let mut last_percent: Option<u64> = None;
    move |rows: usize, read: u64, total: u64| {
        let percent = (read.min(total) * 100) / total.max(1);
        let should_log = match last_percent {
            Some(prev) => percent >= prev + 5,
            None => true,
        };
        if should_log {
            info!("{} progress: {}% ({} rows)", activity, percent, rows);
            last_percent = Some(percent);
        }
    }
}
