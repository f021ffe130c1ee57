//! Core HTTP client for the SportMonks Soccer API

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::response::{self, Pagination, PlanInfo};

/// Base URL of the Soccer API
pub const BASE_URL: &str = "https://soccer.sportmonks.com/api/v2.0/";

/// Environment variable consulted when no key is given explicitly
pub const API_KEY_ENV: &str = "SPORTMONKS_KEY";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TIMEZONE: &str = "UTC";

/// SportMonks API client
///
/// One instance holds the API token and a pooled HTTP client; endpoint
/// methods live in [`crate::endpoints`].
pub struct SportMonks {
    http: HttpClient,
    base_url: String,
    api_token: String,
    tz: String,
}

impl SportMonks {
    /// Create a client with the given API token and default settings
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_token, DEFAULT_TIMEOUT)
    }

    /// Create a client taking the API token from `SPORTMONKS_KEY`
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a client from `SPORTMONKS_KEY` with an explicit timeout
    pub fn from_env_with_timeout(timeout: Duration) -> Result<Self> {
        let api_token = std::env::var(API_KEY_ENV).map_err(|_| Error::MissingApiKey)?;
        Self::with_timeout(api_token, timeout)
    }

    /// Create a client with an explicit request timeout
    pub fn with_timeout(api_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: BASE_URL.to_string(),
            api_token: api_token.into(),
            tz: DEFAULT_TIMEZONE.to_string(),
        })
    }

    /// Set the timezone sent with every request
    pub fn set_timezone(&mut self, tz: impl Into<String>) {
        self.tz = tz.into();
    }

    /// Point the client at a different base URL (test servers)
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    /// Subscription plan details from the response metadata.
    ///
    /// The plan block rides along on every response; the continents endpoint
    /// is just the cheapest way to get one.
    pub async fn plan_info(&self) -> Result<PlanInfo> {
        let url = self.endpoint_url(&["continents"]);
        let (status, body) = self.request_page(&url, &self.base_query()).await?;
        response::check_api_error(status, &body)?;

        let plan = body
            .pointer("/meta/plan")
            .cloned()
            .ok_or_else(|| Error::UnexpectedResponse("response carried no plan metadata".into()))?;

        Ok(serde_json::from_value::<response::Plan>(plan)?.into())
    }

    /// Make a GET request against an endpoint and return the unwrapped data.
    ///
    /// Adds the token/timezone parameters, joins includes, follows
    /// pagination and collapses the include envelopes.
    pub(crate) async fn fetch(
        &self,
        path: &[&str],
        includes: &[&str],
        params: &[(&str, String)],
    ) -> Result<Value> {
        let url = self.endpoint_url(path);
        let mut query = self.base_query();

        for (key, value) in params {
            query.push(((*key).to_string(), value.clone()));
        }

        if !includes.is_empty() {
            query.push(("include".to_string(), includes.join(",")));
        }

        if !query.iter().any(|(key, _)| key == "page") {
            query.push(("page".to_string(), "1".to_string()));
        }

        debug!(%url, "requesting");

        let (status, mut body) = self.request_page(&url, &query).await?;
        response::check_api_error(status, &body)?;

        let pagination = body
            .pointer("/meta/pagination")
            .cloned()
            .and_then(|p| serde_json::from_value::<Pagination>(p).ok());

        let mut data = body.get_mut("data").map(Value::take).ok_or(Error::NoData)?;
        if data.is_null() || data.as_array().is_some_and(|a| a.is_empty()) {
            return Err(Error::NoData);
        }
        if !data.is_object() && !data.is_array() {
            return Err(Error::UnexpectedResponse(format!(
                "data is neither an object nor an array: {data}"
            )));
        }

        if let Some(pagination) = pagination {
            if pagination.total_pages > 1 {
                info!(total_pages = pagination.total_pages, "response is paginated");
                self.fetch_remaining_pages(&url, &query, &pagination, &mut data).await?;
            }
        }

        Ok(response::unnest_includes(data))
    }

    /// Fetch pages 2..=N and append their data arrays to `data`
    async fn fetch_remaining_pages(
        &self,
        url: &str,
        query: &[(String, String)],
        pagination: &Pagination,
        data: &mut Value,
    ) -> Result<()> {
        for page in 2..=pagination.total_pages {
            let mut page_query: Vec<(String, String)> =
                query.iter().filter(|(key, _)| key != "page").cloned().collect();
            page_query.push(("page".to_string(), page.to_string()));

            let (status, mut body) = self.request_page(url, &page_query).await?;
            response::check_api_error(status, &body)?;

            if let (Some(all), Some(more)) = (
                data.as_array_mut(),
                body.get_mut("data").and_then(Value::as_array_mut),
            ) {
                all.append(more);
            }
        }

        Ok(())
    }

    async fn request_page(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<(u16, Value)> {
        let resp = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body: Value = resp.json().await?;
        debug!(status, "got response");

        Ok((status, body))
    }

    /// Build the URL for an endpoint from its path segments
    fn endpoint_url(&self, path: &[&str]) -> String {
        format!("{}{}", self.base_url, path.join("/"))
    }

    /// Parameters sent with every request
    fn base_query(&self) -> Vec<(String, String)> {
        vec![
            ("api_token".to_string(), self.api_token.clone()),
            ("tz".to_string(), self.tz.clone()),
        ]
    }
}

/// Join a list of ids into the comma-separated form the API expects
pub(crate) fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SportMonks {
        SportMonks::new("test-token").unwrap()
    }

    #[test]
    fn endpoint_urls_join_path_segments() {
        let c = client();
        assert_eq!(
            c.endpoint_url(&["continents"]),
            "https://soccer.sportmonks.com/api/v2.0/continents"
        );
        assert_eq!(
            c.endpoint_url(&["fixtures", "between", "2020-01-01", "2020-01-31"]),
            "https://soccer.sportmonks.com/api/v2.0/fixtures/between/2020-01-01/2020-01-31"
        );
    }

    #[test]
    fn base_url_can_be_overridden() {
        let mut c = client();
        c.set_base_url("http://localhost:8080/");
        assert_eq!(c.endpoint_url(&["markets"]), "http://localhost:8080/markets");
    }

    #[test]
    fn base_query_carries_token_and_timezone() {
        let mut c = client();
        c.set_timezone("Europe/London");

        let query = c.base_query();
        assert!(query.contains(&("api_token".to_string(), "test-token".to_string())));
        assert!(query.contains(&("tz".to_string(), "Europe/London".to_string())));
    }

    #[test]
    fn from_env_without_key_is_an_error() {
        std::env::remove_var(API_KEY_ENV);
        assert!(matches!(SportMonks::from_env(), Err(Error::MissingApiKey)));
    }

    #[test]
    fn ids_join_with_commas() {
        assert_eq!(join_ids(&[1]), "1");
        assert_eq!(join_ids(&[8, 9, 564]), "8,9,564");
        assert_eq!(join_ids(&[]), "");
    }
}
