//! Raw AniList GraphQL payloads and their conversion into domain types.

use serde::Deserialize;
use std::collections::HashMap;

use super::{ListEntry, ListStatus, MediaFormat, Tag, Title, TitleId};

/// Top-level GraphQL response envelope
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMediaTitle {
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMediaTag {
    pub name: String,
    #[serde(default)]
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCoverImage {
    #[serde(default)]
    pub large: Option<String>,
}

/// Media node shared by every query
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMedia {
    pub id: TitleId,
    #[serde(default)]
    pub title: Option<ApiMediaTitle>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<ApiMediaTag>>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub mean_score: Option<u32>,
    #[serde(default)]
    pub cover_image: Option<ApiCoverImage>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub season_year: Option<i32>,
}

impl From<ApiMedia> for Title {
    fn from(media: ApiMedia) -> Self {
        let (english_name, romaji_name) = match media.title {
            Some(t) => (t.english, t.romaji),
            None => (None, None),
        };

        Title {
            id: media.id,
            english_name,
            romaji_name,
            genres: media.genres.unwrap_or_default(),
            tags: media
                .tags
                .unwrap_or_default()
                .into_iter()
                .map(|tag| Tag {
                    name: tag.name,
                    rank: tag.rank.unwrap_or(0).min(100),
                })
                .collect(),
            format: media
                .format
                .as_deref()
                .map(MediaFormat::parse)
                .unwrap_or(MediaFormat::Unknown),
            mean_score: media.mean_score,
            cover_image: media.cover_image.and_then(|c| c.large),
            episodes: media.episodes,
            season_year: media.season_year,
        }
    }
}

// ============================================================================
// Favourites
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FavouritesData {
    #[serde(rename = "User")]
    pub user: Option<ApiUserFavourites>,
}

#[derive(Debug, Deserialize)]
pub struct ApiUserFavourites {
    pub favourites: ApiFavourites,
}

#[derive(Debug, Deserialize)]
pub struct ApiFavourites {
    pub anime: ApiFavouritePage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFavouritePage {
    pub page_info: ApiPageInfo,
    #[serde(default)]
    pub nodes: Vec<ApiMedia>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPageInfo {
    #[serde(default)]
    pub has_next_page: bool,
}

// ============================================================================
// Full list
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FullListData {
    #[serde(rename = "MediaListCollection")]
    pub collection: Option<ApiListCollection>,
}

#[derive(Debug, Deserialize)]
pub struct ApiListCollection {
    #[serde(default)]
    pub lists: Vec<ApiListGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiListGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_custom_list: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub entries: Vec<ApiListEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ApiListEntry {
    #[serde(default)]
    pub score: Option<f64>,
    pub media: ApiMedia,
}

impl ApiListCollection {
    /// Flattens every status bucket into list entries tagged with the bucket's
    /// status. Custom lists duplicate entries of status buckets and are skipped.
    pub fn into_entries(self) -> Vec<ListEntry> {
        let mut entries = Vec::new();

        for group in self.lists {
            if group.is_custom_list {
                continue;
            }
            let Some(status) = group.status.as_deref().and_then(ListStatus::parse) else {
                tracing::debug!(list = ?group.name, "Skipping list without a known status");
                continue;
            };

            entries.extend(group.entries.into_iter().map(|entry| ListEntry {
                title: entry.media.into(),
                status,
                score: entry.score.unwrap_or(0.0).clamp(0.0, 10.0),
            }));
        }

        entries
    }
}

// ============================================================================
// Recommendations
// ============================================================================

/// Combined recommendation response: one aliased field per seed
pub type RecommendationsData = HashMap<String, Option<ApiSeedRecommendations>>;

#[derive(Debug, Deserialize)]
pub struct ApiSeedRecommendations {
    pub id: TitleId,
    pub recommendations: Option<ApiRecommendationConnection>,
}

#[derive(Debug, Deserialize)]
pub struct ApiRecommendationConnection {
    #[serde(default)]
    pub nodes: Vec<ApiRecommendationNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRecommendationNode {
    #[serde(default)]
    pub media_recommendation: Option<ApiMedia>,
}

impl ApiSeedRecommendations {
    pub fn into_titles(self) -> Vec<Title> {
        self.recommendations
            .map(|conn| {
                conn.nodes
                    .into_iter()
                    .filter_map(|node| node.media_recommendation)
                    .map(Title::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// Planning mutation
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SaveEntryData {
    #[serde(rename = "SaveMediaListEntry")]
    pub saved: Option<ApiSavedEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSavedEntry {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
}
