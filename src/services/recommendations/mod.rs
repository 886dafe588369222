//! Personalised recommendation pipeline
//!
//! favourites + full list -> seeds -> batched fan-out -> refinement -> diversity re-rank
//!
//! Each run builds its candidate map and profile from scratch; nothing is
//! shared between runs.
use std::sync::Arc;
use std::time::Instant;

use crate::{
    error::{AppError, AppResult},
    models::{PipelineOutcome, Recommendation},
    services::catalog::CatalogClient,
};

pub mod diversity;
pub mod fanout;
pub mod profile;
pub mod refine;
pub mod seeds;

use profile::UserProfile;
use refine::ListIndex;

/// Tunables of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub favourite_seed_cap: usize,
    pub rated_seed_cap: usize,
    pub favourite_weight: f64,
    pub rated_weight: f64,
    pub diversity_cap: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            favourite_seed_cap: 25,
            rated_seed_cap: 15,
            favourite_weight: 2.0,
            rated_weight: 1.0,
            diversity_cap: diversity::DIVERSITY_CAP,
        }
    }
}

#[derive(Clone)]
pub struct RecommendationPipeline {
    catalog: Arc<dyn CatalogClient>,
    settings: PipelineSettings,
}

impl RecommendationPipeline {
    pub fn new(catalog: Arc<dyn CatalogClient>, settings: PipelineSettings) -> Self {
        Self { catalog, settings }
    }

    /// Runs the whole pipeline for one user.
    ///
    /// Favourites and the full list are required inputs: their failures abort
    /// the run. Recommendation batches fail individually without aborting.
    pub async fn run(&self, user: &str) -> AppResult<PipelineOutcome> {
        let user = user.trim();
        if user.is_empty() {
            return Err(AppError::InvalidInput(
                "User name cannot be empty".to_string(),
            ));
        }

        let start = Instant::now();
        let (favourites, entries) = tokio::try_join!(
            self.catalog.fetch_favourites(user),
            self.catalog.fetch_full_list(user)
        )
        .map_err(|e| {
            tracing::error!(user = %user, error = %e, "Failed to load user inputs");
            e
        })?;

        let seeds = seeds::select_seeds(&favourites, &entries, &self.settings);
        tracing::info!(
            user = %user,
            favourites = favourites.len(),
            entries = entries.len(),
            seeds = seeds.len(),
            "Seeds selected"
        );

        if seeds.is_empty() {
            tracing::info!(user = %user, "No seeds, nothing to recommend");
            return Ok(PipelineOutcome::Empty);
        }

        let profile = UserProfile::build(&entries);
        let list = ListIndex::build(&entries);

        let report = fanout::aggregate(self.catalog.as_ref(), &seeds).await;
        if report.skipped_batches == report.batches {
            tracing::warn!(user = %user, batches = report.batches, "Every recommendation batch failed");
        }

        let refined = refine::refine(report.candidates.into_entries(), &list, &profile);
        let ranked = diversity::diversify(refined, self.settings.diversity_cap);

        tracing::info!(
            user = %user,
            results = ranked.len(),
            skipped_batches = report.skipped_batches,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Recommendation pipeline completed"
        );

        if ranked.is_empty() {
            return Ok(PipelineOutcome::Empty);
        }

        Ok(PipelineOutcome::Ranked(
            ranked.into_iter().map(Recommendation::from).collect(),
        ))
    }
}
