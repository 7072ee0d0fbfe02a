use std::collections::HashSet;
use std::time::Duration;

use opentelemetry::KeyValue;
use reqwest::StatusCode;
use url::Url;

use super::model::CityIntel;
use crate::telemetry::metrics::INTEL_LINK_CHECKS;

const USER_AGENT: &str = concat!("transit-intel/", env!("CARGO_PKG_VERSION"), " (link check)");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCheck {
    Reachable,
    Unreachable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLink {
    pub url: String,
    pub reason: String,
}

/// How a final HTTP status reflects on the existence of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Ok,
    /// Auth walls and rate limits still prove the resource exists.
    Guarded,
    Missing,
    Unexpected,
}

pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=399 => StatusClass::Ok,
        401 | 403 | 429 => StatusClass::Guarded,
        404 | 410 => StatusClass::Missing,
        _ => StatusClass::Unexpected,
    }
}

fn verdict_for(status: u16) -> LinkCheck {
    match classify_status(status) {
        StatusClass::Ok | StatusClass::Guarded => LinkCheck::Reachable,
        StatusClass::Missing if status == 410 => LinkCheck::Unreachable("HTTP 410 gone".to_string()),
        StatusClass::Missing | StatusClass::Unexpected => {
            LinkCheck::Unreachable(format!("HTTP {status}"))
        }
    }
}

/// Every URL in the record, first-seen order, exact-string deduplicated.
///
/// Order: each authority's website followed by its apps' store links, then
/// payment methods, airport connections and delay sources.
pub fn collect_urls(intel: &CityIntel) -> Vec<String> {
    let mut candidates: Vec<&str> = Vec::new();

    for authority in &intel.authorities {
        candidates.push(&authority.website);
        for app in &authority.apps {
            candidates.extend(app.ios_url.as_deref());
            candidates.extend(app.android_url.as_deref());
        }
    }
    candidates.extend(intel.payment_methods.iter().filter_map(|p| p.url.as_deref()));
    candidates.extend(
        intel
            .airport_connections
            .iter()
            .filter_map(|a| a.info_url.as_deref()),
    );
    candidates.extend(intel.delay_info.iter().map(|d| d.url.as_str()));

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|url| seen.insert(*url))
        .map(str::to_string)
        .collect()
}

#[async_trait::async_trait]
pub trait LinkChecker: Send + Sync {
    async fn check(&self, url: &str, timeout: Duration) -> LinkCheck;
}

/// Checks each URL of the record once, sequentially.
#[tracing::instrument(
    name = "intel.verify_links",
    skip(checker, intel),
    fields(links.total = tracing::field::Empty, links.invalid = tracing::field::Empty)
)]
pub async fn verify_links(
    checker: &dyn LinkChecker,
    intel: &CityIntel,
    timeout: Duration,
) -> Vec<InvalidLink> {
    let urls = collect_urls(intel);
    let mut invalid = Vec::new();

    for url in &urls {
        match checker.check(url, timeout).await {
            LinkCheck::Reachable => {
                INTEL_LINK_CHECKS.add(1, &[KeyValue::new("result", "reachable")]);
            }
            LinkCheck::Unreachable(reason) => {
                INTEL_LINK_CHECKS.add(1, &[KeyValue::new("result", "unreachable")]);
                tracing::debug!(url = %url, reason = %reason, "Link failed verification");
                invalid.push(InvalidLink {
                    url: url.clone(),
                    reason,
                });
            }
        }
    }

    let span = tracing::Span::current();
    span.record("links.total", urls.len());
    span.record("links.invalid", invalid.len());

    invalid
}

/// Live check: HEAD first, GET when the server refuses HEAD.
pub struct HttpLinkChecker {
    client: reqwest::Client,
}

impl HttpLinkChecker {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_status(&self, url: Url, timeout: Duration) -> Result<u16, reqwest::Error> {
        let head = self
            .client
            .head(url.clone())
            .timeout(timeout)
            .send()
            .await?;

        match head.status() {
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED => {
                let get = self.client.get(url).timeout(timeout).send().await?;
                Ok(get.status().as_u16())
            }
            status => Ok(status.as_u16()),
        }
    }
}

#[async_trait::async_trait]
impl LinkChecker for HttpLinkChecker {
    async fn check(&self, url: &str, timeout: Duration) -> LinkCheck {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => return LinkCheck::Unreachable(format!("invalid URL: {e}")),
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return LinkCheck::Unreachable(format!("unsupported scheme \"{}\"", parsed.scheme()));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return LinkCheck::Unreachable("missing host".to_string());
        }

        match self.fetch_status(parsed, timeout).await {
            Ok(status) => verdict_for(status),
            Err(e) if e.is_timeout() => LinkCheck::Unreachable("request timed out".to_string()),
            Err(e) if e.is_connect() => LinkCheck::Unreachable("connection failed".to_string()),
            Err(e) => LinkCheck::Unreachable(format!("request failed: {e}")),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    /// Reachable unless the URL was registered as broken; records every check.
    #[derive(Default)]
    pub(crate) struct StubLinkChecker {
        broken: HashMap<String, String>,
        checked: Mutex<Vec<String>>,
    }

    impl StubLinkChecker {
        pub(crate) fn with_broken(broken: &[(&str, &str)]) -> Self {
            Self {
                broken: broken
                    .iter()
                    .map(|(url, reason)| (url.to_string(), reason.to_string()))
                    .collect(),
                checked: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn checked(&self) -> Vec<String> {
            self.checked.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl LinkChecker for StubLinkChecker {
        async fn check(&self, url: &str, _timeout: Duration) -> LinkCheck {
            self.checked.lock().push(url.to_string());
            match self.broken.get(url) {
                Some(reason) => LinkCheck::Unreachable(reason.clone()),
                None => LinkCheck::Reachable,
            }
        }
    }
}
