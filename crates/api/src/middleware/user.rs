//! Requesting-user extractor.
//!
//! Authentication happens upstream; the gateway forwards the verified user id
//! in the `x-user-id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use herald_common::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request is made on behalf of.
///
/// ```ignore
/// async fn handler(user: RequestingUser) -> impl IntoResponse {
///     // user.user_id is the caller's id
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestingUser {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for RequestingUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        async move {
            user_id
                .map(|user_id| RequestingUser { user_id })
                .ok_or_else(|| AppError::Auth(format!("Missing {USER_ID_HEADER} header")))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<RequestingUser, AppError> {
        let (mut parts, _) = request.into_parts();
        RequestingUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_header_is_extracted() {
        let request = Request::builder()
            .header(USER_ID_HEADER, " u-1 ")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap().user_id, "u-1");
    }

    #[tokio::test]
    async fn test_missing_or_blank_header_is_rejected() {
        let missing = Request::builder().body(()).unwrap();
        assert!(matches!(extract(missing).await, Err(AppError::Auth(_))));

        let blank = Request::builder()
            .header(USER_ID_HEADER, "  ")
            .body(())
            .unwrap();
        assert!(matches!(extract(blank).await, Err(AppError::Auth(_))));
    }
}
