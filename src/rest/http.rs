//! REST client implementation.
//!
//! Typed client for the dashboard's request/response API: CRUD on bots and
//! list/clear on activity logs. The real-time layer never constructs REST
//! payloads itself; it reaches this client only through the
//! [`DashboardApi`](crate::reconcile::DashboardApi) refetch seam.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::config::RestConfig;
use super::error::RestError;
use crate::types::{ActivityLog, Bot, BotPatch, BotStatistics, NewActivityLog, NewBot, Order};

/// HTTP client for the dashboard REST API.
#[derive(Debug, Clone)]
pub struct RestClient {
    config: RestConfig,
    http: reqwest::Client,
}

impl RestClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: RestConfig) -> Result<Self, RestError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(&config.user_agent)
            .build()
            .map_err(RestError::Request)?;

        Ok(Self { config, http })
    }

    /// Creates a new client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, RestError> {
        Self::new(RestConfig::default())
    }

    /// Creates a new client with the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, RestError> {
        Self::new(RestConfig::new(base_url))
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Sends a request with retry on timeout and 429, returning the raw
    /// successful response.
    async fn send_with_retry<F>(&self, request_fn: F) -> Result<reqwest::Response, RestError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;
        let mut retry_count = 0;

        while retry_count <= self.config.max_retries {
            match request_fn().send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        return Ok(resp);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
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

                        return Err(RestError::RateLimited { retry_after });
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(RestError::NotFound("resource".to_string()));
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(RestError::Unauthorized);
                    }

                    let message = resp.text().await.unwrap_or_default();
                    return Err(RestError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(e) => {
                    if e.is_timeout() && retry_count < self.config.max_retries {
                        retry_count += 1;
                        tokio::time::sleep(Duration::from_millis(100 * (1 << retry_count))).await;
                        last_error = Some(RestError::from(e));
                        continue;
                    }
                    return Err(RestError::from(e));
                }
            }
        }

        Err(last_error.unwrap_or(RestError::Timeout))
    }

    async fn fetch_json<T, F>(&self, request_fn: F) -> Result<T, RestError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let resp = self.send_with_retry(request_fn).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| RestError::Deserialization(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| RestError::Deserialization(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RestError> {
        let url = self.url(path);
        self.fetch_json(|| self.http.get(&url)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, RestError> {
        let url = self.url(path);
        self.fetch_json(|| {
            let builder = self.http.post(&url);
            match body {
                Some(b) => builder.json(b),
                None => builder,
            }
        })
        .await
    }

    async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RestError> {
        let url = self.url(path);
        self.fetch_json(|| self.http.put(&url).json(body)).await
    }

    /// Lists all bots.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_bots(&self) -> Result<Vec<Bot>, RestError> {
        self.get("/bots/").await
    }

    /// Gets a single bot by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the bot is not found.
    pub async fn get_bot(&self, id: &str) -> Result<Bot, RestError> {
        self.get(&format!("/bots/{id}")).await
    }

    /// Creates a new bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or validation is rejected.
    pub async fn create_bot(&self, bot: &NewBot) -> Result<Bot, RestError> {
        self.post("/bots/", Some(bot)).await
    }

    /// Updates a bot's configuration. Only the fields present in `patch` are
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or validation is rejected.
    pub async fn update_bot(&self, id: &str, patch: &BotPatch) -> Result<Bot, RestError> {
        self.put(&format!("/bots/{id}"), patch).await
    }

    /// Deletes a bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_bot(&self, id: &str) -> Result<(), RestError> {
        let url = self.url(&format!("/bots/{id}"));
        self.send_with_retry(|| self.http.delete(&url)).await?;
        Ok(())
    }

    /// Starts a bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn start_bot(&self, id: &str) -> Result<Bot, RestError> {
        self.post::<Bot, ()>(&format!("/bots/{id}/start"), None).await
    }

    /// Stops a bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn stop_bot(&self, id: &str) -> Result<Bot, RestError> {
        self.post::<Bot, ()>(&format!("/bots/{id}/stop"), None).await
    }

    /// Toggles a bot between active and stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn toggle_bot(&self, id: &str) -> Result<Bot, RestError> {
        self.post::<Bot, ()>(&format!("/bots/{id}/toggle"), None).await
    }

    /// Stops every bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn stop_all_bots(&self) -> Result<(), RestError> {
        let url = self.url("/bots/stop-all");
        self.send_with_retry(|| self.http.post(&url)).await?;
        Ok(())
    }

    /// Gets aggregate bot statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_statistics(&self) -> Result<BotStatistics, RestError> {
        self.get("/bots/statistics/summary").await
    }

    /// Lists orders, newest first, up to `limit` entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_orders(&self, limit: Option<u32>) -> Result<Vec<Order>, RestError> {
        let path = match limit {
            Some(l) => format!("/orders/?limit={l}"),
            None => "/orders/".to_string(),
        };
        self.get(&path).await
    }

    /// Gets a single order by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the order is not found.
    pub async fn get_order(&self, id: &str) -> Result<Order, RestError> {
        self.get(&format!("/orders/{id}")).await
    }

    /// Lists a bot's open orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_bot_active_orders(&self, bot_id: &str) -> Result<Vec<Order>, RestError> {
        self.get(&format!("/orders/bot/{bot_id}/active")).await
    }

    /// Lists a bot's completed orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_bot_order_history(&self, bot_id: &str) -> Result<Vec<Order>, RestError> {
        self.get(&format!("/orders/bot/{bot_id}/history")).await
    }

    /// Lists activity logs, newest first, up to `limit` entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_logs(&self, limit: Option<u32>) -> Result<Vec<ActivityLog>, RestError> {
        let path = match limit {
            Some(l) => format!("/logs/?limit={l}"),
            None => "/logs/".to_string(),
        };
        self.get(&path).await
    }

    /// Creates an activity log entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_log(&self, log: &NewActivityLog) -> Result<ActivityLog, RestError> {
        self.post("/logs/", Some(log)).await
    }

    /// Clears all activity logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn clear_logs(&self) -> Result<(), RestError> {
        let url = self.url("/logs/");
        self.send_with_retry(|| self.http.delete(&url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_new() {
        let client = RestClient::new(RestConfig::new("https://api.example.com/v1"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_with_defaults() {
        assert!(RestClient::with_defaults().is_ok());
    }

    #[test]
    fn test_client_invalid_config() {
        assert!(RestClient::new(RestConfig::new("")).is_err());
    }

    #[test]
    fn test_client_config_access() {
        let client = RestClient::with_base_url("https://api.example.com/v1").expect("client");
        assert_eq!(client.config().base_url, "https://api.example.com/v1");
    }
}
