//! HTTP client implementation.
//!
//! Provides the REST collaborator for comments and article likes.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::api::{ArticleApi, CommentApi, PushRegistrar};
use super::config::{ClientConfig, Route};
use super::error::ClientError;
use crate::session::SessionGuard;
use crate::types::{
    ArticleLikeResponse, Comment, CommentLikeResponse, CommentPage, CreateCommentRequest,
    PushSubscription,
};

/// API error response format.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: String,
}

/// Single comment response.
#[derive(Debug, Deserialize)]
struct CommentResponse {
    comment: Comment,
}

/// Acknowledgement without a body entity.
#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct UpdateCommentRequest<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VapidKeyResponse {
    public_key: String,
}

#[derive(Debug, Serialize)]
struct SubscribeRequest<'a> {
    subscription: &'a PushSubscription,
}

/// HTTP client for the blog REST API.
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: ClientConfig,
    http: reqwest::Client,
    session: SessionGuard,
}

impl HttpClient {
    /// Creates a new client with the given configuration.
    ///
    /// Requests carry the session's bearer token. A 401 response expires
    /// the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: ClientConfig, session: SessionGuard) -> Result<Self, ClientError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(&config.user_agent)
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self {
            config,
            http,
            session,
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get<T: DeserializeOwned>(&self, route: Route<'_>) -> Result<T, ClientError> {
        self.request::<T, ()>(Method::GET, route, None).await
    }

    /// Makes a request with retry logic.
    ///
    /// Timeouts are retried only for idempotent methods; 429 is retried for
    /// every method since the server did not act on the request.
    async fn request<T, B>(
        &self,
        method: Method,
        route: Route<'_>,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let path = route.to_string();
        let url = self.config.url(&route);
        let idempotent = method != Method::POST;
        let mut last_error = None;
        let mut retry_count = 0;

        while retry_count <= self.config.max_retries {
            let mut builder = self.http.request(method.clone(), &url);
            if let Some(token) = self.session.token() {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            debug!(%method, %url, attempt = retry_count + 1, "sending request");

            match builder.send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        let body = resp
                            .text()
                            .await
                            .map_err(|e| ClientError::Deserialization(e.to_string()))?;

                        return serde_json::from_str(&body)
                            .map_err(|e| ClientError::Deserialization(e.to_string()));
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse().ok());

                        if retry_count < self.config.max_retries {
                            let wait_time = retry_after.unwrap_or(1);
                            tokio::time::sleep(Duration::from_secs(wait_time)).await;
                            retry_count += 1;
                            continue;
                        }

                        return Err(ClientError::RateLimited { retry_after });
                    }

                    if status == StatusCode::UNAUTHORIZED {
                        warn!(%url, "request unauthorized, expiring session");
                        self.session.expire();
                        return Err(ClientError::Unauthorized { path });
                    }

                    let body = resp.text().await.unwrap_or_default();
                    let message = serde_json::from_str::<ApiErrorResponse>(&body)
                        .map(|e| e.message)
                        .unwrap_or(body);

                    return Err(match status {
                        StatusCode::BAD_REQUEST => ClientError::Validation(message),
                        StatusCode::NOT_FOUND => ClientError::NotFound(path),
                        StatusCode::FORBIDDEN => ClientError::Forbidden(message),
                        _ => ClientError::Api {
                            status: status.as_u16(),
                            message,
                        },
                    });
                }
                Err(e) => {
                    if e.is_timeout() && idempotent && retry_count < self.config.max_retries {
                        retry_count += 1;
                        tokio::time::sleep(Duration::from_millis(100 * (1 << retry_count))).await;
                        last_error = Some(ClientError::from(e));
                        continue;
                    }
                    return Err(ClientError::from(e));
                }
            }
        }

        Err(last_error.unwrap_or(ClientError::Timeout))
    }
}

impl CommentApi for HttpClient {
    async fn list_by_article(
        &self,
        article_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<CommentPage, ClientError> {
        self.get(Route::ArticleComments {
            article_id,
            page,
            limit,
        })
        .await
    }

    async fn create(&self, request: &CreateCommentRequest) -> Result<Comment, ClientError> {
        let response: CommentResponse = self
            .request(Method::POST, Route::Comments, Some(request))
            .await?;
        Ok(response.comment)
    }

    async fn update(&self, comment_id: &str, content: &str) -> Result<Comment, ClientError> {
        let response: CommentResponse = self
            .request(
                Method::PUT,
                Route::Comment(comment_id),
                Some(&UpdateCommentRequest { content }),
            )
            .await?;
        Ok(response.comment)
    }

    async fn delete(&self, comment_id: &str) -> Result<(), ClientError> {
        let response: MessageResponse = self
            .request::<_, ()>(Method::DELETE, Route::Comment(comment_id), None)
            .await?;
        debug!(comment = comment_id, message = %response.message, "comment deleted");
        Ok(())
    }

    async fn toggle_like(&self, comment_id: &str) -> Result<CommentLikeResponse, ClientError> {
        self.request(
            Method::POST,
            Route::CommentLike(comment_id),
            Some(&serde_json::json!({})),
        )
        .await
    }

    async fn list_replies(
        &self,
        comment_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<CommentPage, ClientError> {
        self.get(Route::Replies {
            comment_id,
            page,
            limit,
        })
        .await
    }
}

impl ArticleApi for HttpClient {
    async fn toggle_article_like(&self, article_id: &str) -> Result<ArticleLikeResponse, ClientError> {
        self.request(
            Method::POST,
            Route::ArticleLike(article_id),
            Some(&serde_json::json!({})),
        )
        .await
    }
}

impl PushRegistrar for HttpClient {
    async fn vapid_public_key(&self) -> Result<String, ClientError> {
        let response: VapidKeyResponse = self.get(Route::VapidKey).await?;
        Ok(response.public_key)
    }

    async fn register(&self, subscription: &PushSubscription) -> Result<(), ClientError> {
        let _: MessageResponse = self
            .request(
                Method::POST,
                Route::PushSubscribe,
                Some(&SubscribeRequest { subscription }),
            )
            .await?;
        Ok(())
    }
}
