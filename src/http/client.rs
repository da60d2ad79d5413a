use anyhow::{anyhow, Result};
use rand::Rng;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::util::env::env_parse;

/// Typed rate-limit signal raised on HTTP 429.
///
/// Carried through `anyhow::Error` so callers that need the wait duration
/// can `downcast_ref::<RateLimited>()`; everyone else treats it as a normal
/// error.
#[derive(Debug, Clone, Copy)]
pub struct RateLimited {
    pub retry_after: Duration,
}

impl fmt::Display for RateLimited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rate limited by upstream; retry after {}s",
            self.retry_after.as_secs()
        )
    }
}

impl std::error::Error for RateLimited {}

/// One way of attaching credentials to an outbound request. Suppliers
/// document several interchangeable schemes; we try them in configured
/// order and advance only after a strategy fully fails.
#[derive(Debug, Clone)]
pub enum CredentialStrategy {
    Basic {
        username: String,
        password: String,
    },
    /// Account number + API key in supplier-specific headers.
    ApiKeyHeaders {
        account_header: String,
        account: String,
        key_header: String,
        key: String,
    },
    Bearer {
        token: String,
    },
}

impl CredentialStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            CredentialStrategy::Basic { .. } => "basic",
            CredentialStrategy::ApiKeyHeaders { .. } => "api-key-headers",
            CredentialStrategy::Bearer { .. } => "bearer",
        }
    }

    fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            CredentialStrategy::Basic { username, password } => {
                req.basic_auth(username, Some(password))
            }
            CredentialStrategy::ApiKeyHeaders {
                account_header,
                account,
                key_header,
                key,
            } => req
                .header(account_header.as_str(), account.as_str())
                .header(key_header.as_str(), key.as_str()),
            CredentialStrategy::Bearer { token } => req.bearer_auth(token),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Env-tunable policy, e.g. prefix "SS" reads SS_MAX_RETRIES /
    /// SS_BACKOFF_MS / SS_BACKOFF_CAP_MS.
    pub fn from_env(prefix: &str) -> Self {
        let d = Self::default();
        Self {
            max_attempts: env_parse(&format!("{prefix}_MAX_RETRIES"), d.max_attempts),
            base_delay: Duration::from_millis(env_parse(
                &format!("{prefix}_BACKOFF_MS"),
                d.base_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_millis(env_parse(
                &format!("{prefix}_BACKOFF_CAP_MS"),
                d.max_delay.as_millis() as u64,
            )),
        }
    }

    /// Exponential delay for the given attempt (1-based) with uniform
    /// jitter, capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(16));
        let capped = exp_ms.min(self.max_delay.as_millis() as u64);
        let jitter = rand::thread_rng().gen_range(0..=base_ms / 2 + 1);
        Duration::from_millis((capped + jitter).min(self.max_delay.as_millis() as u64))
    }
}

/// Response body plus the measured wall-clock latency of the winning attempt.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub text: String,
    pub latency: Duration,
}

impl FetchedBody {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.text).map_err(|e| anyhow!("response is not valid JSON: {e}"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    /// JSON request body (sent with content-type application/json).
    pub json_body: Option<Value>,
    /// Raw body with an explicit content type (used for the SOAP endpoint).
    pub raw_body: Option<(String, String)>,
}

/// Single outbound transport for every supplier call: timeout, credential
/// strategy rotation, exponential backoff with jitter, and rate-limit-aware
/// retry. Suppliers never talk to `reqwest` directly.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    strategies: Vec<CredentialStrategy>,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn new(
        timeout: Duration,
        strategies: Vec<CredentialStrategy>,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent("threadstock/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            strategies,
            policy,
        })
    }

    pub async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let opts = RequestOptions {
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        };
        self.request(Method::GET, url, opts).await?.json()
    }

    pub async fn post_raw(&self, url: &str, content_type: &str, body: String) -> Result<FetchedBody> {
        let opts = RequestOptions {
            raw_body: Some((content_type.to_string(), body)),
            ..Default::default()
        };
        self.request(Method::POST, url, opts).await
    }

    /// Perform one logical request. Tries each credential strategy in order;
    /// a strategy is abandoned only after its retry budget is exhausted on
    /// network error or non-2xx. A 429 sleeps for exactly the advertised
    /// `Retry-After` and retries the same strategy. Exhaustion surfaces the
    /// last underlying error unchanged.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        opts: RequestOptions,
    ) -> Result<FetchedBody> {
        let slots: Vec<Option<&CredentialStrategy>> = if self.strategies.is_empty() {
            vec![None]
        } else {
            self.strategies.iter().map(Some).collect()
        };

        let mut last_err: Option<anyhow::Error> = None;
        for strategy in slots {
            let label = strategy.map(|s| s.label()).unwrap_or("anonymous");
            let mut attempt: u32 = 0;
            let mut rate_limit_waits: u32 = 0;
            loop {
                let started = Instant::now();
                let req = self.build_request(&method, url, &opts, strategy);
                match req.send().await {
                    Ok(resp) => {
                        let status = resp.status();
                        if status == StatusCode::TOO_MANY_REQUESTS {
                            let wait = parse_retry_after(resp.headers())
                                .unwrap_or(self.policy.base_delay);
                            if rate_limit_waits >= self.policy.max_attempts {
                                return Err(anyhow::Error::new(RateLimited { retry_after: wait }));
                            }
                            rate_limit_waits += 1;
                            warn!(
                                url,
                                strategy = label,
                                wait_ms = wait.as_millis() as u64,
                                "429 from upstream; honoring Retry-After"
                            );
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                        if status.is_success() {
                            let latency = started.elapsed();
                            let text = resp.text().await?;
                            debug!(
                                url,
                                strategy = label,
                                latency_ms = latency.as_millis() as u64,
                                "fetch ok"
                            );
                            return Ok(FetchedBody { text, latency });
                        }
                        let body =
                            truncate_for_log(resp.text().await.unwrap_or_default(), 400);
                        let err = anyhow!("{method} {url} failed: {status} body={body}");
                        attempt += 1;
                        if attempt >= self.policy.max_attempts {
                            last_err = Some(err);
                            break;
                        }
                        let delay = self.policy.backoff_delay(attempt);
                        warn!(
                            url,
                            strategy = label,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            %status,
                            "retrying after upstream error"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => {
                        attempt += 1;
                        if attempt >= self.policy.max_attempts {
                            last_err = Some(e.into());
                            break;
                        }
                        let delay = self.policy.backoff_delay(attempt);
                        warn!(
                            url,
                            strategy = label,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "network error; backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("request to {url} failed with no attempts made")))
    }

    fn build_request(
        &self,
        method: &Method,
        url: &str,
        opts: &RequestOptions,
        strategy: Option<&CredentialStrategy>,
    ) -> RequestBuilder {
        let mut req = self
            .http
            .request(method.clone(), url)
            .header(header::ACCEPT, "application/json");
        if !opts.query.is_empty() {
            req = req.query(&opts.query);
        }
        if let Some(body) = &opts.json_body {
            req = req.json(body);
        }
        if let Some((content_type, body)) = &opts.raw_body {
            req = req
                .header(header::CONTENT_TYPE, content_type.as_str())
                .body(body.clone());
        }
        match strategy {
            Some(s) => s.apply(req),
            None => req,
        }
    }
}

pub(crate) fn parse_retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

pub(crate) fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        s.truncate(max_len);
        s.push('…');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
        };
        for attempt in 1..=10 {
            assert!(policy.backoff_delay(attempt) <= policy.max_delay);
        }
        // Early attempts grow roughly exponentially (jitter aside).
        assert!(policy.backoff_delay(1) >= Duration::from_millis(1000));
    }

    #[test]
    fn retry_after_parses_integer_seconds() {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::RETRY_AFTER, "2".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(2)));

        let mut bad = header::HeaderMap::new();
        bad.insert(header::RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(parse_retry_after(&bad), None);
    }

    #[test]
    fn rate_limited_survives_anyhow_downcast() {
        let err = anyhow::Error::new(RateLimited {
            retry_after: Duration::from_secs(2),
        });
        let rl = err.downcast_ref::<RateLimited>().unwrap();
        assert_eq!(rl.retry_after, Duration::from_secs(2));
    }

    #[test]
    fn basic_strategy_sets_authorization_header() {
        let client = Client::new();
        let strategy = CredentialStrategy::Basic {
            username: "acct".into(),
            password: "secret".into(),
        };
        let req = strategy
            .apply(client.get("http://localhost/x"))
            .build()
            .unwrap();
        assert!(req.headers().contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn api_key_strategy_sets_custom_headers() {
        let client = Client::new();
        let strategy = CredentialStrategy::ApiKeyHeaders {
            account_header: "X-Account".into(),
            account: "12345".into(),
            key_header: "X-Api-Key".into(),
            key: "k".into(),
        };
        let req = strategy
            .apply(client.get("http://localhost/x"))
            .build()
            .unwrap();
        assert_eq!(req.headers().get("X-Account").unwrap(), "12345");
        assert_eq!(req.headers().get("X-Api-Key").unwrap(), "k");
    }

    async fn stub_server(
        responses: Vec<&'static str>,
    ) -> (std::net::SocketAddr, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_writer = seen.clone();
        tokio::spawn(async move {
            for response in responses {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 4096];
                let n = sock.read(&mut buf).await.unwrap_or(0);
                seen_writer
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&buf[..n]).to_string());
                let _ = sock.write_all(response.as_bytes()).await;
            }
        });
        (addr, seen)
    }

    #[tokio::test]
    async fn honors_retry_after_exactly_before_retrying() {
        let (addr, _) = stub_server(vec![
            "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 1\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"ok\":true}",
        ])
        .await;

        let client = HttpClient::new(
            Duration::from_secs(5),
            vec![],
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(10),
                max_delay: Duration::from_secs(5),
            },
        )
        .unwrap();

        let started = std::time::Instant::now();
        let body = client
            .get_json(&format!("http://{addr}/v2/styles/"), &[])
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(body["ok"], true);
        // The wait matches Retry-After (1s), not the ~20ms backoff curve.
        assert!(elapsed >= Duration::from_millis(950), "waited only {elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "waited {elapsed:?}");
    }

    #[tokio::test]
    async fn advances_strategy_only_after_full_failure() {
        const UNAUTHORIZED: &str =
            "HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        let (addr, seen) = stub_server(vec![UNAUTHORIZED, UNAUTHORIZED]).await;

        let client = HttpClient::new(
            Duration::from_secs(5),
            vec![
                CredentialStrategy::Basic {
                    username: "acct".into(),
                    password: "secret".into(),
                },
                CredentialStrategy::ApiKeyHeaders {
                    account_header: "X-Account".into(),
                    account: "12345".into(),
                    key_header: "X-Api-Key".into(),
                    key: "k".into(),
                },
            ],
            RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(50),
            },
        )
        .unwrap();

        let err = client
            .get_json(&format!("http://{addr}/v2/styles/"), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let first = seen[0].to_ascii_lowercase();
        let second = seen[1].to_ascii_lowercase();
        assert!(first.contains("authorization: basic"));
        assert!(second.contains("x-api-key"));
        assert!(!second.contains("authorization: basic"));
    }

    #[test]
    fn fetched_body_decodes_json() {
        let body = FetchedBody {
            text: r#"{"ok":true}"#.into(),
            latency: Duration::from_millis(5),
        };
        assert_eq!(body.json().unwrap()["ok"], true);
        let bad = FetchedBody {
            text: "<html>".into(),
            latency: Duration::ZERO,
        };
        assert!(bad.json().is_err());
    }
}
