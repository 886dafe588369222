use std::collections::HashSet;

use crate::models::{Favourite, ListEntry, ListStatus, Seed, WeightClass};

use super::PipelineSettings;

/// Derives the seed set from favourites and the full list.
///
/// Favourites come first in catalog order, followed by the best-rated
/// entries that are neither favourites nor planned. Rated entries are
/// ordered by score descending; equal scores keep list order.
pub fn select_seeds(
    favourites: &[Favourite],
    entries: &[ListEntry],
    settings: &PipelineSettings,
) -> Vec<Seed> {
    let favourite_ids: HashSet<_> = favourites.iter().map(|f| f.id).collect();

    let mut seeds: Vec<Seed> = favourites
        .iter()
        .take(settings.favourite_seed_cap)
        .map(|favourite| Seed {
            id: favourite.id,
            source_title: favourite.display_name.clone(),
            weight_class: WeightClass::Favourite,
            weight: settings.favourite_weight,
        })
        .collect();

    let mut rated: Vec<&ListEntry> = entries
        .iter()
        .filter(|entry| {
            entry.is_rated()
                && entry.status != ListStatus::Planning
                && !favourite_ids.contains(&entry.title.id)
        })
        .collect();
    rated.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut taken = HashSet::new();
    seeds.extend(
        rated
            .into_iter()
            .filter(|entry| taken.insert(entry.title.id))
            .take(settings.rated_seed_cap)
            .map(|entry| Seed {
                id: entry.title.id,
                source_title: entry.title.display_name(),
                weight_class: WeightClass::TopRated,
                weight: settings.rated_weight,
            }),
    );

    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::entry;

    fn favourite(id: i64) -> Favourite {
        Favourite {
            id,
            display_name: format!("Fav {}", id),
        }
    }

    #[test]
    fn test_favourites_then_top_rated() {
        let settings = PipelineSettings::default();
        let favourites = vec![favourite(1), favourite(2)];
        let entries = vec![
            entry(1, ListStatus::Completed, 10.0),
            entry(3, ListStatus::Completed, 7.0),
            entry(4, ListStatus::Completed, 9.0),
            entry(5, ListStatus::Completed, 0.0),
        ];

        let seeds = select_seeds(&favourites, &entries, &settings);
        let ids: Vec<i64> = seeds.iter().map(|s| s.id).collect();

        assert_eq!(ids, vec![1, 2, 4, 3]);
        assert_eq!(seeds[0].weight_class, WeightClass::Favourite);
        assert_eq!(seeds[0].weight, settings.favourite_weight);
        assert_eq!(seeds[0].source_title, "Fav 1");
        assert_eq!(seeds[2].weight_class, WeightClass::TopRated);
        assert_eq!(seeds[2].weight, settings.rated_weight);
        assert_eq!(seeds[2].source_title, "Title 4");
    }

    #[test]
    fn test_planning_and_unrated_entries_are_not_seeds() {
        let settings = PipelineSettings::default();
        let entries = vec![
            entry(1, ListStatus::Planning, 8.0),
            entry(2, ListStatus::Current, 0.0),
            entry(3, ListStatus::Dropped, 3.0),
        ];

        let seeds = select_seeds(&[], &entries, &settings);
        let ids: Vec<i64> = seeds.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_ties_keep_list_order_and_caps_apply() {
        let settings = PipelineSettings {
            favourite_seed_cap: 1,
            rated_seed_cap: 2,
            ..PipelineSettings::default()
        };
        let favourites = vec![favourite(100), favourite(101)];
        let entries = vec![
            entry(10, ListStatus::Completed, 8.0),
            entry(11, ListStatus::Completed, 9.0),
            entry(12, ListStatus::Completed, 8.0),
            entry(13, ListStatus::Completed, 8.0),
        ];

        let seeds = select_seeds(&favourites, &entries, &settings);
        let ids: Vec<i64> = seeds.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![100, 11, 10]);
    }

    #[test]
    fn test_empty_inputs_give_no_seeds() {
        assert!(select_seeds(&[], &[], &PipelineSettings::default()).is_empty());
    }
}
