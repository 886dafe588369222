use std::collections::{HashMap, HashSet};

use crate::models::ListEntry;

/// Number of genres in the top-genre set
pub const TOP_GENRE_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagStats {
    pub total_rank: u64,
    pub count: u64,
}

impl TagStats {
    /// Rounded mean rank
    pub fn average_rank(&self) -> u32 {
        if self.count == 0 {
            return 0;
        }
        (self.total_rank as f64 / self.count as f64).round() as u32
    }
}

/// Tag and genre statistics over a user's whole list. Rebuilt on every run.
#[derive(Debug, Default)]
pub struct UserProfile {
    tags: HashMap<String, TagStats>,
    /// Genre counts in first-encountered order
    genres: Vec<(String, u64)>,
    genre_index: HashMap<String, usize>,
}

impl UserProfile {
    /// Single pass over every entry, regardless of status
    pub fn build(entries: &[ListEntry]) -> Self {
        let mut profile = Self::default();

        for entry in entries {
            for tag in &entry.title.tags {
                let stats = profile.tags.entry(tag.name.clone()).or_default();
                stats.total_rank += u64::from(tag.rank);
                stats.count += 1;
            }
            for genre in &entry.title.genres {
                profile.record_genre(genre);
            }
        }

        tracing::debug!(
            tags = profile.tags.len(),
            genres = profile.genres.len(),
            entries = entries.len(),
            "User profile built"
        );

        profile
    }

    fn record_genre(&mut self, genre: &str) {
        match self.genre_index.get(genre) {
            Some(&i) => self.genres[i].1 += 1,
            None => {
                self.genre_index.insert(genre.to_string(), self.genres.len());
                self.genres.push((genre.to_string(), 1));
            }
        }
    }

    pub fn tag_stats(&self, tag: &str) -> Option<TagStats> {
        self.tags.get(tag).copied()
    }

    pub fn average_rank(&self, tag: &str) -> Option<u32> {
        self.tags.get(tag).map(TagStats::average_rank)
    }

    pub fn genre_count(&self, genre: &str) -> u64 {
        self.genre_index
            .get(genre)
            .map(|&i| self.genres[i].1)
            .unwrap_or(0)
    }

    /// The `TOP_GENRE_COUNT` most frequent genres; ties go to the genre seen first
    pub fn top_genres(&self) -> Vec<String> {
        let mut ranked: Vec<&(String, u64)> = self.genres.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(TOP_GENRE_COUNT)
            .map(|(genre, _)| genre.clone())
            .collect()
    }

    pub fn top_genre_set(&self) -> HashSet<String> {
        self.top_genres().into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.genres.is_empty()
    }
}
