// SPDX-License-Identifier: Apache-2.0

use crate::IngestError;
use std::thread;
use std::time::Duration;

const MAX_RETRIES: u32 = 3;
const USER_AGENT: &str = concat!("amend-archive/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP client with bounded retry and exponential backoff.
///
/// 429 and 5xx responses and transport errors retry with 1s/2s/4s waits;
/// other 4xx responses fail immediately. A persistent failure is fatal to
/// the calling dataset's build step and names the dataset in its error.
pub struct FetchClient {
    source_name: String,
    http: reqwest::blocking::Client,
}

impl FetchClient {
    pub fn new(source_name: &str) -> Result<Self, IngestError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IngestError(format!("{source_name}: failed to build HTTP client: {e}")))?;
        Ok(Self {
            source_name: source_name.to_string(),
            http,
        })
    }

    pub fn get_text(&self, url: &str) -> Result<String, IngestError> {
        let resp = self.get_with_retry(url)?;
        resp.text()
            .map_err(|e| IngestError(format!("{}: body read failed: {e}", self.source_name)))
    }

    pub fn get_json(&self, url: &str) -> Result<serde_json::Value, IngestError> {
        let resp = self.get_with_retry(url)?;
        resp.json()
            .map_err(|e| IngestError(format!("{}: JSON decode failed: {e}", self.source_name)))
    }

    fn get_with_retry(&self, url: &str) -> Result<reqwest::blocking::Response, IngestError> {
        let mut backoff_secs = 1u64;
        for attempt in 0..=MAX_RETRIES {
            match self.http.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if status < 400 {
                        return Ok(resp);
                    }
                    if (400..500).contains(&status) && status != 429 {
                        return Err(IngestError(format!(
                            "{}: HTTP {status} for {url}",
                            self.source_name
                        )));
                    }
                    if attempt == MAX_RETRIES {
                        return Err(IngestError(format!(
                            "{}: HTTP {status} for {url} after {} attempts",
                            self.source_name,
                            MAX_RETRIES + 1
                        )));
                    }
                }
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        return Err(IngestError(format!(
                            "{}: request failed for {url} after {} attempts: {e}",
                            self.source_name,
                            MAX_RETRIES + 1
                        )));
                    }
                }
            }
            thread::sleep(Duration::from_secs(backoff_secs));
            backoff_secs *= 2;
        }
        unreachable!("retry loop always returns")
    }
}
