//! ip-api.com geolocation client.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::debug;

use super::GeoLocator;

const DEFAULT_ENDPOINT: &str = "http://ip-api.com/json";
const DEFAULT_MEMO_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_MEMO_CAPACITY: usize = 100_000;

#[derive(Deserialize)]
struct IpApiResponse {
    status: String,
    country: Option<String>,
}

/// Outcome of a single remote lookup.
enum Lookup {
    /// The service answered, either with a country or a definite "fail".
    Answer(Option<String>),
    /// Network, HTTP or decoding trouble; worth retrying later.
    Transient,
}

/// Country lookups against ip-api.com.
///
/// Definite answers are memoized per IP for a bounded time, and the memo
/// holds at most a fixed number of addresses. Transport and decoding
/// failures are never memoized. Private and loopback addresses never leave
/// the process.
pub struct IpApiLocator {
    client: reqwest::Client,
    endpoint: String,
    memo: DashMap<String, (Option<String>, Instant)>,
    memo_ttl: Duration,
    memo_capacity: usize,
}

impl IpApiLocator {
    /// Builds a locator whose HTTP requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_endpoint(DEFAULT_ENDPOINT, timeout)
    }

    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            memo: DashMap::new(),
            memo_ttl: DEFAULT_MEMO_TTL,
            memo_capacity: DEFAULT_MEMO_CAPACITY,
        })
    }

    /// Overrides how long answers are kept and how many addresses are held.
    pub fn with_memo_limits(mut self, ttl: Duration, capacity: usize) -> Self {
        self.memo_ttl = ttl;
        self.memo_capacity = capacity.max(1);
        self
    }

    async fn fetch(&self, ip: &str) -> Lookup {
        let url = format!("{}/{}?fields=status,country", self.endpoint, ip);

        let resp = match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                debug!("geo lookup for {} returned HTTP {}", ip, resp.status());
                return Lookup::Transient;
            }
            Err(e) => {
                debug!("geo lookup network error for {}: {}", ip, e);
                return Lookup::Transient;
            }
        };

        let body: IpApiResponse = match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                debug!("geo lookup parse error for {}: {}", ip, e);
                return Lookup::Transient;
            }
        };

        match body.status.as_str() {
            "success" => Lookup::Answer(body.country.filter(|c| !c.is_empty())),
            "fail" => {
                debug!("geo lookup has no answer for {}", ip);
                Lookup::Answer(None)
            }
            other => {
                debug!("geo lookup returned unexpected status {:?} for {}", other, ip);
                Lookup::Transient
            }
        }
    }

    fn recall(&self, ip: &str) -> Option<Option<String>> {
        self.memo.get(ip).and_then(|entry| {
            let (answer, stored_at) = entry.value();
            (stored_at.elapsed() < self.memo_ttl).then(|| answer.clone())
        })
    }

    fn remember(&self, ip: &str, answer: Option<String>) {
        if self.memo.len() >= self.memo_capacity && !self.memo.contains_key(ip) {
            let ttl = self.memo_ttl;
            self.memo.retain(|_, (_, stored_at)| stored_at.elapsed() < ttl);

            if self.memo.len() >= self.memo_capacity {
                self.memo.clear();
            }
        }

        self.memo.insert(ip.to_owned(), (answer, Instant::now()));
    }
}

#[async_trait]
impl GeoLocator for IpApiLocator {
    async fn lookup_country(&self, ip: &str) -> Option<String> {
        if is_private(ip) {
            return None;
        }

        if let Some(answer) = self.recall(ip) {
            return answer;
        }

        match self.fetch(ip).await {
            Lookup::Answer(answer) => {
                self.remember(ip, answer.clone());
                answer
            }
            Lookup::Transient => None,
        }
    }
}

/// Returns true for addresses a public geolocation service cannot place:
/// loopback, link-local, private ranges, IPv6 special ranges and anything
/// that does not parse.
pub fn is_private(ip: &str) -> bool {
    let ip = ip.strip_prefix("::ffff:").unwrap_or(ip);

    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) => {
            addr.is_loopback()
                || addr.is_link_local()
                || addr.is_unspecified()
                || addr.is_broadcast()
                || addr.is_private()
        }
        Ok(IpAddr::V6(addr)) => {
            let first = addr.segments()[0];
            addr.is_loopback()
                || addr.is_unspecified()
                || (first & 0xffc0) == 0xfe80
                || (first & 0xfe00) == 0xfc00
        }
        Err(_) => true,
    }
}
