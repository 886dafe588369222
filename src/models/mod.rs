use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod anilist;

/// Numeric catalog identifier of a title
pub type TitleId = i64;

/// A tag attached to a title, with the catalog's relevance rank (0-100)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub rank: u32,
}

/// Format classifier reported by the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaFormat {
    Tv,
    TvShort,
    Movie,
    Special,
    Ova,
    Ona,
    Music,
    Unknown,
}

impl MediaFormat {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "TV" => MediaFormat::Tv,
            "TV_SHORT" => MediaFormat::TvShort,
            "MOVIE" => MediaFormat::Movie,
            "SPECIAL" => MediaFormat::Special,
            "OVA" => MediaFormat::Ova,
            "ONA" => MediaFormat::Ona,
            "MUSIC" => MediaFormat::Music,
            _ => MediaFormat::Unknown,
        }
    }
}

/// A catalog title as used by the scoring pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Title {
    pub id: TitleId,
    /// Localized (English) name
    pub english_name: Option<String>,
    /// Romanized name
    pub romaji_name: Option<String>,
    /// Ordered, duplicates possible
    pub genres: Vec<String>,
    pub tags: Vec<Tag>,
    pub format: MediaFormat,
    /// Mean community score as a percentage
    pub mean_score: Option<u32>,
    pub cover_image: Option<String>,
    pub episodes: Option<u32>,
    pub season_year: Option<i32>,
}

impl Title {
    /// Localized name, then romanized name, then `#<id>`
    pub fn display_name(&self) -> String {
        self.english_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                self.romaji_name
                    .as_deref()
                    .filter(|name| !name.trim().is_empty())
            })
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", self.id))
    }

    /// First listed genre, used as the diversity bucket
    pub fn primary_genre(&self) -> &str {
        self.genres
            .first()
            .map(String::as_str)
            .unwrap_or(UNKNOWN_GENRE)
    }
}

pub const UNKNOWN_GENRE: &str = "Unknown";

/// Status bucket of a list entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListStatus {
    Current,
    Planning,
    Completed,
    Dropped,
    Paused,
    Repeating,
}

impl ListStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CURRENT" => Some(ListStatus::Current),
            "PLANNING" => Some(ListStatus::Planning),
            "COMPLETED" => Some(ListStatus::Completed),
            "DROPPED" => Some(ListStatus::Dropped),
            "PAUSED" => Some(ListStatus::Paused),
            "REPEATING" => Some(ListStatus::Repeating),
            _ => None,
        }
    }

    /// Anything but planning counts as already seen
    pub fn is_seen(self) -> bool {
        self != ListStatus::Planning
    }
}

/// One entry of a user's full catalog list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListEntry {
    pub title: Title,
    pub status: ListStatus,
    /// 0-10, 0 means unrated
    pub score: f64,
}

impl ListEntry {
    pub fn is_rated(&self) -> bool {
        self.score > 0.0
    }
}

/// A favourite as returned by the favourites pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Favourite {
    pub id: TitleId,
    pub display_name: String,
}

/// Contribution class of a seed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WeightClass {
    Favourite,
    TopRated,
}

impl Display for WeightClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeightClass::Favourite => write!(f, "favourite"),
            WeightClass::TopRated => write!(f, "top_rated"),
        }
    }
}

/// A user-owned title used to request recommendations
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub id: TitleId,
    pub source_title: String,
    pub weight_class: WeightClass,
    pub weight: f64,
}

/// Why a candidate was recommended: one per contributing seed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reason {
    pub source_title: String,
    pub weight_class: WeightClass,
    pub weight: f64,
}

/// A tag shared between a candidate and the user's profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommonTag {
    pub name: String,
    /// Rounded average rank of the tag across the user's list
    pub strength: u32,
}

/// Accumulator for one recommended title during a single pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEntry {
    pub title: Title,
    pub base_score: f64,
    pub reasons: Vec<Reason>,
    pub common_tags: Vec<CommonTag>,
    /// Combined tag and genre bonus
    pub tag_bonus: f64,
    pub score: f64,
    pub is_planning: bool,
}

impl CandidateEntry {
    pub fn new(title: Title) -> Self {
        Self {
            title,
            base_score: 0.0,
            reasons: Vec::new(),
            common_tags: Vec::new(),
            tag_bonus: 0.0,
            score: 0.0,
            is_planning: false,
        }
    }
}

/// A ranked recommendation as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: TitleId,
    pub name: String,
    pub format: MediaFormat,
    pub genres: Vec<String>,
    pub mean_score: Option<u32>,
    pub cover_image: Option<String>,
    pub episodes: Option<u32>,
    pub season_year: Option<i32>,
    pub score: f64,
    pub base_score: f64,
    pub tag_bonus: f64,
    pub is_planning: bool,
    pub reasons: Vec<Reason>,
    pub common_tags: Vec<CommonTag>,
}

impl From<CandidateEntry> for Recommendation {
    fn from(entry: CandidateEntry) -> Self {
        let name = entry.title.display_name();
        Recommendation {
            id: entry.title.id,
            name,
            format: entry.title.format,
            genres: entry.title.genres,
            mean_score: entry.title.mean_score,
            cover_image: entry.title.cover_image,
            episodes: entry.title.episodes,
            season_year: entry.title.season_year,
            score: entry.score,
            base_score: entry.base_score,
            tag_bonus: entry.tag_bonus,
            is_planning: entry.is_planning,
            reasons: entry.reasons,
            common_tags: entry.common_tags,
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "recommendations", rename_all = "lowercase")]
pub enum PipelineOutcome {
    Ranked(Vec<Recommendation>),
    /// Completed without producing any candidate
    Empty,
}

/// A pipeline outcome stored in the result cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRecommendations {
    pub user: String,
    pub generated_at: DateTime<Utc>,
    pub outcome: PipelineOutcome,
}

impl CachedRecommendations {
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now.signed_duration_since(self.generated_at) < max_age
    }
}

/// Lowercased, trimmed user name used for cache keys
pub fn normalize_user(user: &str) -> String {
    user.trim().to_lowercase()
}


#[cfg(test)]
mod tests {
    use super::fixtures::title;
    use super::*;

    #[test]
    fn test_display_name_prefers_english() {
        let mut t = title(1, &[], &[]);
        t.english_name = Some("Cowboy Bebop".to_string());
        t.romaji_name = Some("Kaubooi Bibappu".to_string());
        assert_eq!(t.display_name(), "Cowboy Bebop");
    }

    #[test]
    fn test_display_name_falls_back_to_romaji_then_id() {
        let mut t = title(42, &[], &[]);
        t.english_name = None;
        t.romaji_name = Some("Shingeki no Kyojin".to_string());
        assert_eq!(t.display_name(), "Shingeki no Kyojin");

        t.romaji_name = Some("   ".to_string());
        assert_eq!(t.display_name(), "#42");
    }

    #[test]
    fn test_primary_genre() {
        assert_eq!(title(1, &["Drama", "Action"], &[]).primary_genre(), "Drama");
        assert_eq!(title(1, &[], &[]).primary_genre(), UNKNOWN_GENRE);
    }

    #[test]
    fn test_list_status_seen() {
        assert!(!ListStatus::Planning.is_seen());
        assert!(ListStatus::Dropped.is_seen());
        assert_eq!(ListStatus::parse("REPEATING"), Some(ListStatus::Repeating));
        assert_eq!(ListStatus::parse("CUSTOM"), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(PipelineOutcome::Empty).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "empty" }));

        let json = serde_json::to_value(PipelineOutcome::Ranked(vec![])).unwrap();
        assert_eq!(json["status"], "ranked");
        assert!(json["recommendations"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_cached_freshness() {
        let now = Utc::now();
        let cached = CachedRecommendations {
            user: "someone".to_string(),
            generated_at: now - chrono::Duration::hours(23),
            outcome: PipelineOutcome::Empty,
        };
        assert!(cached.is_fresh(now, chrono::Duration::hours(24)));
        assert!(!cached.is_fresh(now, chrono::Duration::hours(12)));
    }

    #[test]
    fn test_normalize_user() {
        assert_eq!(normalize_user("  SomeUser "), "someuser");
    }
}
