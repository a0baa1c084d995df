//! News feed reads for the HTTP surface.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use herald_common::error::AppError;
use herald_common::types::{NewsType, PersonalNews, UnreadNewsCount};

pub const MAX_PAGE_SIZE: u64 = 1000;

#[derive(Clone)]
pub struct NewsRepository {
    pool: PgPool,
    picture_base_url: String,
}

impl NewsRepository {
    pub fn new(pool: PgPool, picture_base_url: impl Into<String>) -> Self {
        Self {
            pool,
            picture_base_url: picture_base_url.into(),
        }
    }

    /// One page of news as seen by `user_id`.
    ///
    /// Unviewed regular news sorts first, then newest first. News created
    /// before `created_after` counts as viewed.
    pub async fn get_news(
        &self,
        user_id: &str,
        news_type: NewsType,
        language: &str,
        limit: u64,
        offset: u64,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<PersonalNews>, AppError> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let limit = i64::try_from(limit)
            .map_err(|_| AppError::Validation("limit out of range".to_string()))?;
        let offset = i64::try_from(offset)
            .map_err(|_| AppError::Validation("offset out of range".to_string()))?;

        let mut rows = sqlx::query_as::<_, PersonalNews>(
            r#"
            SELECT nvu.created_at IS NOT NULL AS viewed,
                   n.id, n.language, n.type, n.title, n.image_url, n.url, n.views, n.created_at
              FROM news n
              LEFT JOIN news_viewed_by_users nvu
                     ON nvu.language = n.language
                    AND nvu.news_id = n.id
                    AND nvu.user_id = $1
             WHERE n.language = $2
               AND n.type = $3
             ORDER BY (CASE WHEN n.type = 'regular' THEN nvu.created_at IS NULL ELSE FALSE END) DESC,
                      n.created_at DESC
             LIMIT $4 OFFSET $5
            "#,
        )
        .bind(user_id)
        .bind(language)
        .bind(news_type.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        for row in &mut rows {
            if row.viewed == Some(false) && row.created_at < created_after {
                row.viewed = Some(true);
            }
            row.image_url = self.download_url(&row.image_url);
        }

        Ok(rows)
    }

    /// Regular and featured news in `language` the user has not opened yet.
    pub async fn unread_count(
        &self,
        user_id: &str,
        language: &str,
        created_after: DateTime<Utc>,
    ) -> Result<UnreadNewsCount, AppError> {
        let count = sqlx::query_as::<_, UnreadNewsCount>(
            r#"
            SELECT COALESCE(COUNT(n.id), 0) AS count
              FROM news n
              LEFT JOIN news_viewed_by_users nvu
                     ON nvu.language = n.language
                    AND nvu.news_id = n.id
                    AND nvu.user_id = $1
             WHERE n.language = $2
               AND (n.type = $3 OR n.type = $4)
               AND n.created_at >= $5
               AND nvu.created_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(language)
        .bind(NewsType::Regular.as_str())
        .bind(NewsType::Featured.as_str())
        .bind(created_after)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    fn download_url(&self, image_url: &str) -> String {
        picture_url(&self.picture_base_url, image_url)
    }
}

/// Resolve a stored picture path against the CDN base URL.
pub fn picture_url(base_url: &str, image_url: &str) -> String {
    if image_url.is_empty() || image_url.starts_with("http://") || image_url.starts_with("https://")
    {
        return image_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        image_url.trim_start_matches('/')
    )
}
