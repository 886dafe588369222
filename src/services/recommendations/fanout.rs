use std::collections::HashMap;

use crate::{
    models::{CandidateEntry, Reason, Seed, Title, TitleId},
    services::catalog::{CatalogClient, RECOMMENDATION_BATCH_SIZE},
};

/// Candidates keyed by title id, kept in first-recommended order
#[derive(Debug, Default)]
pub struct CandidateMap {
    entries: Vec<CandidateEntry>,
    index: HashMap<TitleId, usize>,
}

impl CandidateMap {
    /// Folds one (seed, recommended title) pair into the map.
    ///
    /// The first payload seen for a title is kept.
    pub fn record(&mut self, seed: &Seed, title: Title) {
        let slot = match self.index.get(&title.id) {
            Some(&i) => i,
            None => {
                self.index.insert(title.id, self.entries.len());
                self.entries.push(CandidateEntry::new(title));
                self.entries.len() - 1
            }
        };

        let candidate = &mut self.entries[slot];
        candidate.base_score += seed.weight;
        candidate.reasons.push(Reason {
            source_title: seed.source_title.clone(),
            weight_class: seed.weight_class,
            weight: seed.weight,
        });
    }

    pub fn get(&self, id: TitleId) -> Option<&CandidateEntry> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<CandidateEntry> {
        self.entries
    }
}

/// What the fan-out produced
#[derive(Debug, Default)]
pub struct FanoutReport {
    pub candidates: CandidateMap,
    pub batches: usize,
    pub skipped_batches: usize,
}

/// Requests recommendations for every seed, one batch after another.
///
/// Batches never run concurrently: they share the catalog's rate limit. A
/// failed batch is logged and skipped; the remaining batches still run.
pub async fn aggregate(client: &dyn CatalogClient, seeds: &[Seed]) -> FanoutReport {
    let mut report = FanoutReport::default();

    for (batch_no, batch) in seeds.chunks(RECOMMENDATION_BATCH_SIZE).enumerate() {
        report.batches += 1;
        let ids: Vec<TitleId> = batch.iter().map(|seed| seed.id).collect();

        let mut results = match client.fetch_recommendation_batch(&ids).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    remote = e.is_remote(),
                    batch = batch_no,
                    seeds = ids.len(),
                    provider = client.name(),
                    "Recommendation batch failed, skipping"
                );
                report.skipped_batches += 1;
                continue;
            }
        };

        for seed in batch {
            let titles = results.remove(&seed.id).unwrap_or_default();
            for title in titles {
                report.candidates.record(seed, title);
            }
        }
    }

    tracing::info!(
        seeds = seeds.len(),
        batches = report.batches,
        skipped = report.skipped_batches,
        candidates = report.candidates.len(),
        "Recommendation fan-out completed"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::fixtures::title;
    use crate::models::WeightClass;
    use crate::services::catalog::MockCatalogClient;
    use mockall::Sequence;

    fn seed(id: TitleId, weight_class: WeightClass, weight: f64) -> Seed {
        Seed {
            id,
            source_title: format!("Seed {}", id),
            weight_class,
            weight,
        }
    }

    fn recs(pairs: &[(TitleId, Vec<TitleId>)]) -> HashMap<TitleId, Vec<Title>> {
        pairs
            .iter()
            .map(|(seed, ids)| (*seed, ids.iter().map(|id| title(*id, &[], &[])).collect()))
            .collect()
    }

    #[test]
    fn test_first_payload_wins() {
        let mut map = CandidateMap::default();
        let s = seed(1, WeightClass::Favourite, 2.0);

        let mut first = title(50, &["Drama"], &[]);
        first.english_name = Some("First".to_string());
        let mut second = title(50, &["Comedy"], &[]);
        second.english_name = Some("Second".to_string());

        map.record(&s, first);
        map.record(&s, second);

        let entry = map.get(50).unwrap();
        assert_eq!(entry.title.display_name(), "First");
        assert_eq!(entry.base_score, 4.0);
        assert_eq!(entry.reasons.len(), 2);
    }

    #[tokio::test]
    async fn test_weighted_aggregation_scenario() {
        // A and B are favourites (weight 2), C is top-rated (weight 1).
        // A -> X, B -> X and Y, C -> Y.
        let seeds = vec![
            seed(1, WeightClass::Favourite, 2.0),
            seed(2, WeightClass::Favourite, 2.0),
            seed(3, WeightClass::TopRated, 1.0),
        ];

        let mut mock = MockCatalogClient::new();
        mock.expect_fetch_recommendation_batch()
            .times(1)
            .returning(|_| Ok(recs(&[(1, vec![100]), (2, vec![100, 200]), (3, vec![200])])));
        mock.expect_name().return_const("mock");

        let report = aggregate(&mock, &seeds).await;
        let x = report.candidates.get(100).unwrap();
        let y = report.candidates.get(200).unwrap();

        assert_eq!(x.base_score, 4.0);
        assert_eq!(x.reasons.len(), 2);
        assert_eq!(y.base_score, 3.0);
        assert_eq!(y.reasons.len(), 2);
        assert_eq!(y.reasons[0].source_title, "Seed 2");
        assert_eq!(y.reasons[1].weight_class, WeightClass::TopRated);
    }

    #[tokio::test]
    async fn test_seeds_are_chunked_into_sequential_batches() {
        let seeds: Vec<Seed> = (1..=25)
            .map(|id| seed(id, WeightClass::TopRated, 1.0))
            .collect();

        let mut seq = Sequence::new();
        let mut mock = MockCatalogClient::new();
        for expected in [12usize, 12, 1] {
            mock.expect_fetch_recommendation_batch()
                .withf(move |ids| ids.len() == expected)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|ids| Ok(ids.iter().map(|id| (*id, vec![title(999, &[], &[])])).collect()));
        }
        mock.expect_name().return_const("mock");

        let report = aggregate(&mock, &seeds).await;

        assert_eq!(report.batches, 3);
        assert_eq!(report.skipped_batches, 0);
        let shared = report.candidates.get(999).unwrap();
        assert_eq!(shared.reasons.len(), 25);
        assert_eq!(shared.base_score, 25.0);
    }

    #[tokio::test]
    async fn test_failed_batch_is_skipped() {
        let seeds: Vec<Seed> = (1..=13)
            .map(|id| seed(id, WeightClass::TopRated, 1.0))
            .collect();

        let mut seq = Sequence::new();
        let mut mock = MockCatalogClient::new();
        mock.expect_fetch_recommendation_batch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::Protocol("truncated body".into())));
        mock.expect_fetch_recommendation_batch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(recs(&[(13, vec![500])])));
        mock.expect_name().return_const("mock");

        let report = aggregate(&mock, &seeds).await;

        assert_eq!(report.batches, 2);
        assert_eq!(report.skipped_batches, 1);
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates.get(500).unwrap().base_score, 1.0);
    }

    #[tokio::test]
    async fn test_seed_without_recommendations_contributes_nothing() {
        let seeds = vec![
            seed(1, WeightClass::Favourite, 2.0),
            seed(2, WeightClass::Favourite, 2.0),
        ];

        let mut mock = MockCatalogClient::new();
        mock.expect_fetch_recommendation_batch()
            .returning(|_| Ok(recs(&[(1, vec![])])));
        mock.expect_name().return_const("mock");

        let report = aggregate(&mock, &seeds).await;
        assert!(report.candidates.is_empty());
        assert_eq!(report.skipped_batches, 0);
    }

    #[tokio::test]
    async fn test_base_score_is_order_independent() {
        let forward = vec![
            seed(1, WeightClass::Favourite, 2.0),
            seed(2, WeightClass::TopRated, 1.0),
            seed(3, WeightClass::TopRated, 1.0),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let mut scores = Vec::new();
        for seeds in [forward, reversed] {
            let mut mock = MockCatalogClient::new();
            mock.expect_fetch_recommendation_batch()
                .returning(|_| Ok(recs(&[(1, vec![7, 8]), (2, vec![7]), (3, vec![8, 7])])));
            mock.expect_name().return_const("mock");

            let report = aggregate(&mock, &seeds).await;
            scores.push((
                report.candidates.get(7).unwrap().base_score,
                report.candidates.get(8).unwrap().base_score,
            ));
        }

        assert_eq!(scores[0], (4.0, 3.0));
        assert_eq!(scores[0], scores[1]);
    }
}
