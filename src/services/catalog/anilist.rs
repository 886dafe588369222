/// AniList GraphQL catalog client
///
/// API Flow:
/// 1. Favourites: `User.favourites.anime`, paginated until `hasNextPage` is false
/// 2. Full list: `MediaListCollection`, every status bucket in one call
/// 3. Recommendations: one aliased `Media` sub-query per seed, up to
///    `RECOMMENDATION_BATCH_SIZE` seeds per request
///
/// Rate-limit responses are retried by `RetryPolicy`. An authentication
/// failure drops the held token so later calls go out anonymously.
use crate::{
    error::{AppError, AppResult},
    models::{
        anilist::{
            FavouritesData, FullListData, GraphQlError, GraphQlResponse, RecommendationsData,
            SaveEntryData,
        },
        Favourite, ListEntry, Title, TitleId,
    },
    services::catalog::{
        retry::{Attempt, RetryPolicy},
        CatalogClient, RECOMMENDATIONS_PER_SEED, RECOMMENDATION_BATCH_SIZE,
    },
};
use reqwest::{header, Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::RwLock;

const FAVOURITES_PER_PAGE: usize = 25;
/// Upper bound on favourites pages (1000 titles) so a server that keeps
/// reporting `hasNextPage` cannot loop us forever. Favourites past the bound
/// are not fetched and are not excluded from top-rated seeding.
const MAX_FAVOURITE_PAGES: u32 = 40;

const MEDIA_FIELDS: &str = r#"
fragment MediaFields on Media {
  id
  title { romaji english }
  genres
  tags { name rank }
  format
  meanScore
  coverImage { large }
  episodes
  seasonYear
}"#;

const FAVOURITES_QUERY: &str = r#"
query ($name: String, $page: Int, $perPage: Int) {
  User(name: $name) {
    favourites {
      anime(page: $page, perPage: $perPage) {
        pageInfo { hasNextPage }
        nodes { id title { romaji english } }
      }
    }
  }
}"#;

const FULL_LIST_QUERY: &str = r#"
query ($name: String) {
  MediaListCollection(userName: $name, type: ANIME) {
    lists {
      name
      isCustomList
      status
      entries {
        score(format: POINT_10)
        media { ...MediaFields }
      }
    }
  }
}"#;

const PLANNING_MUTATION: &str = r#"
mutation ($mediaId: Int) {
  SaveMediaListEntry(mediaId: $mediaId, status: PLANNING) { id status }
}"#;

/// Why a response could not be used
#[derive(Debug, PartialEq)]
enum Failure {
    RateLimited(Option<u64>),
    Unauthorized(String),
    NotFound(String),
    Malformed(String),
}

pub struct AniListClient {
    http_client: HttpClient,
    api_url: String,
    token: RwLock<Option<String>>,
    retry: RetryPolicy,
}

impl AniListClient {
    pub fn new(api_url: String, token: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            token: RwLock::new(token),
            retry,
        }
    }

    fn current_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|token| token.clone())
    }

    fn invalidate_token(&self) {
        if let Ok(mut token) = self.token.write() {
            if token.take().is_some() {
                tracing::warn!(provider = "anilist", "Catalog credential rejected and dropped");
            }
        }
    }

    /// Sends a GraphQL document, retrying on rate limits
    async fn execute<T: DeserializeOwned>(
        &self,
        label: &str,
        query: &str,
        variables: Value,
    ) -> AppResult<T> {
        let body = json!({ "query": query, "variables": variables });
        self.retry
            .run(label, |_| self.send_once::<T>(&body))
            .await
    }

    /// One request/response exchange, classified
    async fn send_once<T: DeserializeOwned>(&self, body: &Value) -> AppResult<Attempt<T>> {
        let mut request = self
            .http_client
            .post(&self.api_url)
            .header(header::ACCEPT, "application/json")
            .json(body);

        if let Some(token) = self.current_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let retry_after = parse_retry_after(response.headers().get(header::RETRY_AFTER));
        let text = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Attempt::RateLimited { retry_after });
        }

        let parsed: Result<GraphQlResponse<T>, _> = serde_json::from_str(&text);

        let envelope = match parsed {
            Ok(envelope) => envelope,
            Err(e) => {
                let failure = if status == StatusCode::UNAUTHORIZED {
                    Failure::Unauthorized(format!("catalog returned {}", status))
                } else if !status.is_success() {
                    Failure::Malformed(format!("catalog returned status {}: {}", status, text))
                } else {
                    tracing::error!(error = %e, response = %text, "Failed to deserialize catalog response");
                    Failure::Malformed(format!("Failed to parse catalog response: {}", e))
                };
                return self.fail(failure);
            }
        };

        match classify(status, &envelope.errors, envelope.data.is_some(), retry_after) {
            Some(failure) => self.fail(failure),
            None => {
                if !envelope.errors.is_empty() {
                    tracing::warn!(
                        errors = ?envelope.errors,
                        "Catalog returned partial data with errors"
                    );
                }
                match envelope.data {
                    Some(data) => Ok(Attempt::Done(data)),
                    None => self.fail(Failure::Malformed("response has no data".to_string())),
                }
            }
        }
    }

    fn fail<T>(&self, failure: Failure) -> AppResult<Attempt<T>> {
        match failure {
            Failure::RateLimited(retry_after) => Ok(Attempt::RateLimited { retry_after }),
            Failure::Unauthorized(msg) => {
                self.invalidate_token();
                Err(AppError::SessionExpired(msg))
            }
            Failure::NotFound(msg) => Err(AppError::NotFound(msg)),
            Failure::Malformed(msg) => Err(AppError::Protocol(msg)),
        }
    }
}

/// Maps a parsed response onto the failure taxonomy; `None` means usable
fn classify(
    status: StatusCode,
    errors: &[GraphQlError],
    has_data: bool,
    retry_after: Option<u64>,
) -> Option<Failure> {
    if status == StatusCode::TOO_MANY_REQUESTS || errors.iter().any(|e| e.status == Some(429)) {
        return Some(Failure::RateLimited(retry_after));
    }

    if status == StatusCode::UNAUTHORIZED
        || errors.iter().any(|e| {
            e.status == Some(401) || e.message.to_lowercase().contains("invalid token")
        })
    {
        let message = errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| format!("catalog returned {}", status));
        return Some(Failure::Unauthorized(message));
    }

    if has_data {
        return None;
    }

    if status == StatusCode::NOT_FOUND || errors.iter().any(|e| e.status == Some(404)) {
        return Some(Failure::NotFound(join_messages(errors)));
    }

    Some(Failure::Malformed(format!(
        "catalog returned status {} without data: {}",
        status,
        join_messages(errors)
    )))
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// `Retry-After` in whole seconds, when given as a number
fn parse_retry_after(value: Option<&header::HeaderValue>) -> Option<u64> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// One aliased `Media` sub-query per seed, sharing the media fragment
fn build_recommendation_query(seed_ids: &[TitleId]) -> String {
    let mut query = String::from("query {\n");
    for (i, id) in seed_ids.iter().enumerate() {
        query.push_str(&format!(
            "  s{i}: Media(id: {id}) {{ id recommendations(page: 1, perPage: {per_page}, sort: [RATING_DESC]) {{ nodes {{ mediaRecommendation {{ ...MediaFields }} }} }} }}\n",
            per_page = RECOMMENDATIONS_PER_SEED,
        ));
    }
    query.push('}');
    query.push_str(MEDIA_FIELDS);
    query
}

#[async_trait::async_trait]
impl CatalogClient for AniListClient {
    async fn fetch_favourites(&self, user: &str) -> AppResult<Vec<Favourite>> {
        let mut favourites = Vec::new();
        let mut page = 1;

        loop {
            let data: FavouritesData = self
                .execute(
                    "favourites",
                    FAVOURITES_QUERY,
                    json!({ "name": user, "page": page, "perPage": FAVOURITES_PER_PAGE }),
                )
                .await?;

            let user_data = data
                .user
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", user)))?;
            let anime = user_data.favourites.anime;

            favourites.extend(anime.nodes.into_iter().map(|media| {
                let title = Title::from(media);
                Favourite {
                    id: title.id,
                    display_name: title.display_name(),
                }
            }));

            if !anime.page_info.has_next_page {
                break;
            }
            if page >= MAX_FAVOURITE_PAGES {
                tracing::warn!(user = %user, pages = page, "Favourites pagination limit reached");
                break;
            }
            page += 1;
        }

        tracing::info!(
            user = %user,
            favourites = favourites.len(),
            provider = "anilist",
            "Favourites fetched"
        );

        Ok(favourites)
    }

    async fn fetch_full_list(&self, user: &str) -> AppResult<Vec<ListEntry>> {
        let query = format!("{}{}", FULL_LIST_QUERY, MEDIA_FIELDS);
        let data: FullListData = self
            .execute("full_list", &query, json!({ "name": user }))
            .await?;

        let entries = data
            .collection
            .ok_or_else(|| AppError::NotFound(format!("List for user {} not found", user)))?
            .into_entries();

        tracing::info!(
            user = %user,
            entries = entries.len(),
            provider = "anilist",
            "Full list fetched"
        );

        Ok(entries)
    }

    async fn fetch_recommendation_batch(
        &self,
        seed_ids: &[TitleId],
    ) -> AppResult<HashMap<TitleId, Vec<Title>>> {
        if seed_ids.len() > RECOMMENDATION_BATCH_SIZE {
            return Err(AppError::InvalidInput(format!(
                "At most {} seeds per batch, got {}",
                RECOMMENDATION_BATCH_SIZE,
                seed_ids.len()
            )));
        }
        if seed_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = build_recommendation_query(seed_ids);
        let data: RecommendationsData = self
            .execute("recommendations", &query, json!({}))
            .await?;

        let mut results = HashMap::new();
        for seed in data.into_values().flatten() {
            results.insert(seed.id, seed.into_titles());
        }

        tracing::debug!(
            seeds = seed_ids.len(),
            answered = results.len(),
            provider = "anilist",
            "Recommendation batch fetched"
        );

        Ok(results)
    }

    async fn submit_planning_add(&self, title_id: TitleId) -> AppResult<()> {
        if self.current_token().is_none() {
            return Err(AppError::SessionExpired(
                "No catalog credential held".to_string(),
            ));
        }

        let data: SaveEntryData = self
            .execute("planning_add", PLANNING_MUTATION, json!({ "mediaId": title_id }))
            .await?;

        let saved = data
            .saved
            .ok_or_else(|| AppError::Protocol("Planning mutation returned no entry".to_string()))?;

        tracing::info!(
            title_id = title_id,
            entry_id = saved.id,
            status = ?saved.status,
            provider = "anilist",
            "Title added to planning"
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "anilist"
    }
}
