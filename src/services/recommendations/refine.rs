use std::collections::HashSet;

use crate::models::{CandidateEntry, CommonTag, ListEntry, TitleId};

use super::profile::UserProfile;

/// Shared tags listed on a candidate
pub const MAX_DISPLAYED_TAGS: usize = 5;
/// Shared tags that count towards the score
pub const MAX_SCORED_TAGS: usize = 3;
pub const TAG_BONUS_STEP: f64 = 0.5;
pub const TAG_BONUS_CAP: f64 = 1.5;

pub const MAX_SCORED_GENRES: usize = 3;
pub const GENRE_BONUS_STEP: f64 = 0.3;
pub const GENRE_BONUS_CAP: f64 = 0.9;

/// Titles the user already has on their list, split by whether they count as seen
#[derive(Debug, Default)]
pub struct ListIndex {
    seen: HashSet<TitleId>,
    planning: HashSet<TitleId>,
}

impl ListIndex {
    pub fn build(entries: &[ListEntry]) -> Self {
        let mut index = Self::default();
        for entry in entries {
            if entry.status.is_seen() {
                index.seen.insert(entry.title.id);
            } else {
                index.planning.insert(entry.title.id);
            }
        }
        index
    }

    pub fn is_seen(&self, id: TitleId) -> bool {
        self.seen.contains(&id)
    }

    pub fn is_planning(&self, id: TitleId) -> bool {
        self.planning.contains(&id)
    }
}

/// Shared tags ordered by profile strength, strongest first.
/// Equal strengths keep the candidate's tag order.
pub fn common_tags(candidate: &CandidateEntry, profile: &UserProfile) -> Vec<CommonTag> {
    let mut matches: Vec<CommonTag> = candidate
        .title
        .tags
        .iter()
        .filter_map(|tag| {
            profile.average_rank(&tag.name).map(|strength| CommonTag {
                name: tag.name.clone(),
                strength,
            })
        })
        .collect();
    matches.sort_by(|a, b| b.strength.cmp(&a.strength));
    matches
}

pub fn tag_bonus(match_count: usize) -> f64 {
    (match_count.min(MAX_SCORED_TAGS) as f64 * TAG_BONUS_STEP).min(TAG_BONUS_CAP)
}

/// Bonus for distinct candidate genres that are among the user's top genres
pub fn genre_bonus(candidate: &CandidateEntry, top_genres: &HashSet<String>) -> f64 {
    let distinct: HashSet<&str> = candidate
        .title
        .genres
        .iter()
        .map(String::as_str)
        .filter(|genre| top_genres.contains(*genre))
        .collect();
    let bonus = distinct.len().min(MAX_SCORED_GENRES) as f64 * GENRE_BONUS_STEP;
    round_score(bonus.min(GENRE_BONUS_CAP))
}

/// One decimal place
pub fn round_score(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Drops seen titles, flags planned ones and folds the profile bonuses into
/// each remaining candidate. Order is preserved.
pub fn refine(
    candidates: Vec<CandidateEntry>,
    list: &ListIndex,
    profile: &UserProfile,
) -> Vec<CandidateEntry> {
    let top_genres = profile.top_genre_set();
    let before = candidates.len();

    let refined: Vec<CandidateEntry> = candidates
        .into_iter()
        .filter(|candidate| !list.is_seen(candidate.title.id))
        .map(|mut candidate| {
            candidate.is_planning = list.is_planning(candidate.title.id);

            let mut shared = common_tags(&candidate, profile);
            let tags = tag_bonus(shared.len());
            shared.truncate(MAX_DISPLAYED_TAGS);
            candidate.common_tags = shared;

            let genres = genre_bonus(&candidate, &top_genres);
            candidate.tag_bonus = round_score(tags + genres);
            candidate.score = round_score(candidate.base_score + tags + genres);
            candidate
        })
        .collect();

    tracing::debug!(
        candidates = before,
        retained = refined.len(),
        excluded = before - refined.len(),
        "Candidates refined"
    );

    refined
}
