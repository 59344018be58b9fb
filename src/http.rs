//! Shared blocking HTTP plumbing for every MAST endpoint: default headers,
//! token auth, bounded retries and the `invoke` service protocol.

use std::fs::File;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};

use crate::config::ResolvedConfig;
use crate::error::LkError;

const BASE_DELAY_MS: u64 = 200;
const PAGE_SIZE: u64 = 50_000;

#[derive(Debug, Clone, Copy)]
pub struct DownloadInfo {
    pub is_zip: bool,
    pub bytes: u64,
}

#[derive(Clone)]
pub struct MastHttp {
    client: Client,
    base_url: String,
    max_retries: usize,
}

impl MastHttp {
    pub fn new(config: &ResolvedConfig) -> Result<Self, LkError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("lksearch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LkError::Transport(err.to_string()))?,
        );
        if let Some(token) = &config.api_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("token {token}"))
                    .map_err(|err| LkError::Transport(err.to_string()))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| LkError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.mast_base_url.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One call to the MAST service gateway. Returns the whole response body.
    pub fn invoke(&self, service: &str, params: Value, page: u64) -> Result<Value, LkError> {
        let url = format!("{}/api/v0/invoke", self.base_url);
        let request = json!({
            "service": service,
            "params": params,
            "format": "json",
            "pagesize": PAGE_SIZE,
            "page": page,
            "removenullcolumns": true,
        })
        .to_string();

        tracing::debug!(service, page, "invoking MAST service");
        let response =
            self.send_with_retries(|| self.client.post(&url).form(&[("request", &request)]))?;
        let response = Self::handle_status(response)?;
        let body: Value = response
            .json()
            .map_err(|err| LkError::Transport(err.to_string()))?;

        if body.get("status").and_then(Value::as_str) == Some("ERROR") {
            let message = body
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("service reported an error")
                .to_string();
            return Err(LkError::Transport(format!("{service}: {message}")));
        }
        Ok(body)
    }

    /// Collects the `data` rows of every page of a service call.
    pub fn invoke_all(&self, service: &str, params: Value) -> Result<Vec<Value>, LkError> {
        let mut rows = Vec::new();
        let mut page = 1u64;
        loop {
            let body = self.invoke(service, params.clone(), page)?;
            if let Some(data) = body.get("data").and_then(Value::as_array) {
                rows.extend(data.iter().cloned());
            }
            let pages = body
                .get("paging")
                .and_then(|paging| paging.get("pagesFiltered"))
                .and_then(Value::as_u64)
                .unwrap_or(1);
            if page >= pages {
                break;
            }
            page += 1;
        }
        tracing::debug!(service, rows = rows.len(), "MAST service returned");
        Ok(rows)
    }

    pub fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, LkError> {
        let response = self.send_with_retries(|| self.client.get(url).query(query))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| LkError::Transport(err.to_string()))
    }

    /// Streams `url` into `destination`, which must already be writable.
    pub fn download_to(
        &self,
        url: &str,
        query: &[(&str, String)],
        destination: &Path,
    ) -> Result<DownloadInfo, LkError> {
        let response = self.send_with_retries(|| self.client.get(url).query(query))?;
        let mut response = Self::handle_status(response)?;
        let is_zip = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("zip"))
            .unwrap_or(false);

        let mut file =
            File::create(destination).map_err(|err| LkError::Filesystem(err.to_string()))?;
        let bytes =
            io::copy(&mut response, &mut file).map_err(|err| LkError::Transport(err.to_string()))?;
        Ok(DownloadInfo { is_zip, bytes })
    }

    fn handle_status(response: Response) -> Result<Response, LkError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "MAST request failed".to_string());
        Err(LkError::TransportStatus { status, message })
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, LkError>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        backoff(attempt, status.to_string());
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        backoff(attempt, err.to_string());
                        attempt += 1;
                        continue;
                    }
                    return Err(LkError::Transport(err.to_string()));
                }
            }
        }
    }
}

fn backoff(attempt: usize, reason: String) {
    let delay = BASE_DELAY_MS * (attempt as u64 + 1);
    tracing::debug!(attempt, delay_ms = delay, %reason, "retrying MAST request");
    thread::sleep(Duration::from_millis(delay));
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
