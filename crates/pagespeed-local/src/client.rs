use crate::config::ClientSettings;
use futures_util::StreamExt;
use pagespeed_core::{AnalysisRequest, Error, RawReport, ReportFetcher, Result};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Lighthouse categories requested on every call.
pub const CATEGORIES: [&str; 4] = ["performance", "seo", "accessibility", "best-practices"];

const ERROR_BODY_MAX_CHARS: usize = 300;

/// PageSpeed Insights v5 client.
#[derive(Debug, Clone)]
pub struct PsiClient {
    client: reqwest::Client,
    api_key: String,
    settings: ClientSettings,
}

impl PsiClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, settings: ClientSettings) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            settings,
        }
    }

    pub fn from_env(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::new(client, api_key, ClientSettings::from_env())
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn request_url(&self, req: &AnalysisRequest) -> Result<url::Url> {
        let mut params = vec![
            ("url", req.url.as_str()),
            ("strategy", req.strategy.as_str()),
            ("key", self.api_key.as_str()),
        ];
        params.extend(CATEGORIES.iter().map(|c| ("category", *c)));
        url::Url::parse_with_params(&self.settings.endpoint, &params)
            .map_err(|e| Error::NotConfigured(format!("invalid PSI endpoint: {e}")))
    }

    /// Map a reqwest failure without leaking the request URL (it carries the API key).
    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            return Error::Timeout {
                after_ms: self.settings.timeout_ms,
            };
        }
        let e = e.without_url();
        let mut msg = e.to_string();
        let mut src = std::error::Error::source(&e);
        while let Some(s) = src {
            msg.push_str(": ");
            msg.push_str(&s.to_string());
            src = s.source();
        }
        Error::Transport(msg)
    }

    async fn fetch_report(&self, req: &AnalysisRequest) -> Result<RawReport> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(self.request_url(req)?)
            .timeout(self.settings.timeout())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = match self.read_capped(resp).await {
                Ok((bytes, truncated)) => {
                    let text = String::from_utf8_lossy(&bytes);
                    let body = truncate_chars(&text, ERROR_BODY_MAX_CHARS);
                    if truncated && !body.ends_with("...") {
                        format!("{body}...")
                    } else {
                        body
                    }
                }
                Err(e) => format!("<error body unreadable: {e}>"),
            };
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        let (bytes, truncated) = self.read_capped(resp).await?;
        if truncated {
            return Err(Error::Transport(format!(
                "PSI response exceeded {} bytes",
                self.settings.max_body_bytes
            )));
        }

        debug!(
            url = %req.url,
            strategy = %req.strategy,
            bytes = bytes.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "PSI response received"
        );
        RawReport::from_slice(&bytes)
    }

    /// Read at most `max_body_bytes`; the flag is set when the body was cut short.
    async fn read_capped(&self, resp: reqwest::Response) -> Result<(Vec<u8>, bool)> {
        let max_bytes = self.settings.max_body_bytes as usize;
        let mut truncated = false;
        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.transport_error(e))?;
            if bytes.len().saturating_add(chunk.len()) > max_bytes {
                let can_take = max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                truncated = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok((bytes, truncated))
    }
}

#[async_trait::async_trait]
impl ReportFetcher for PsiClient {
    async fn fetch(&self, req: &AnalysisRequest, cancel: &CancellationToken) -> Result<RawReport> {
        cancel
            .run_until_cancelled(self.fetch_report(req))
            .await
            .unwrap_or(Err(Error::Cancelled))
    }
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}
