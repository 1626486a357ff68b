use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::DatabaseError;
use crate::query::PostgrestQuery;

pub type Result<T> = std::result::Result<T, DatabaseError>;

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&self.anon_key)
            .map_err(|_| DatabaseError::Auth("Supabase anon key is not a valid header value".to_string()))?;
        headers.insert("apikey", api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| DatabaseError::Auth("Auth token is not a valid header value".to_string()))?;
            headers.insert(AUTHORIZATION, bearer);
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);
            return Err(DatabaseError::from_status(status.as_u16(), error_text));
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// GET rows matching `query`.
    pub async fn select<T>(&self, query: &PostgrestQuery, auth_token: &str) -> Result<Vec<T>>
    where T: DeserializeOwned {
        self.request(Method::GET, &query.path(), Some(auth_token), None).await
    }

    /// Insert one row and return the stored representation.
    pub async fn insert<T, B>(&self, table: &str, row: &B, auth_token: &str) -> Result<T>
    where T: DeserializeOwned, B: Serialize {
        let body = serde_json::to_value(row)?;
        let path = format!("/rest/v1/{}", table);

        let mut rows: Vec<T> = self.request_with_headers(
            Method::POST,
            &path,
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await?;

        if rows.is_empty() {
            return Err(DatabaseError::Decode(format!("Insert into {} returned no rows", table)));
        }
        Ok(rows.swap_remove(0))
    }

    /// PATCH the rows matching `query` and return them as updated.
    pub async fn update<T, B>(&self, query: &PostgrestQuery, changes: &B, auth_token: &str) -> Result<Vec<T>>
    where T: DeserializeOwned, B: Serialize {
        let body = serde_json::to_value(changes)?;

        self.request_with_headers(
            Method::PATCH,
            &query.path(),
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await
    }

    /// DELETE the rows matching `query`, returning how many were removed.
    pub async fn delete(&self, query: &PostgrestQuery, auth_token: &str) -> Result<usize> {
        let removed: Vec<Value> = self.request_with_headers(
            Method::DELETE,
            &query.path(),
            Some(auth_token),
            None,
            Some(return_representation()),
        ).await?;

        Ok(removed.len())
    }
}

fn return_representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}
