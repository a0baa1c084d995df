//! News feed routes.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use herald_common::error::AppError;
use herald_common::types::{NewsType, PersonalNews, UnreadNewsCount};

use crate::middleware::user::RequestingUser;
use crate::state::AppState;

const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_LIMIT: u64 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/news/{type}", get(get_news))
        .route("/unread-news-count", get(unread_news_count))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsQuery {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    pub created_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadQuery {
    #[serde(default = "default_language")]
    pub language: String,
    pub created_after: Option<DateTime<Utc>>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

/// Without a cutoff nothing is considered viewed by age.
fn cutoff(created_after: Option<DateTime<Utc>>) -> DateTime<Utc> {
    created_after.unwrap_or(DateTime::UNIX_EPOCH)
}

/// GET /news/{type}: one page of the caller's news feed.
async fn get_news(
    State(state): State<AppState>,
    user: RequestingUser,
    Path(news_type): Path<String>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<Vec<PersonalNews>>, AppError> {
    let news_type: NewsType = news_type.parse().map_err(AppError::Validation)?;

    let news = state
        .news
        .get_news(
            &user.user_id,
            news_type,
            &query.language,
            query.limit,
            query.offset,
            cutoff(query.created_after),
        )
        .await?;
    Ok(Json(news))
}

/// GET /unread-news-count: how many news the caller has not opened yet.
async fn unread_news_count(
    State(state): State<AppState>,
    user: RequestingUser,
    Query(query): Query<UnreadQuery>,
) -> Result<Json<UnreadNewsCount>, AppError> {
    let count = state
        .news
        .unread_count(&user.user_id, &query.language, cutoff(query.created_after))
        .await?;
    Ok(Json(count))
}
