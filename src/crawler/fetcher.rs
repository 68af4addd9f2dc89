//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made on behalf of download tasks:
//! - Building HTTP clients for each connect-timeout tier
//! - Retrying connection-level failures a bounded number of times
//! - Fetching pages as text for plugins
//! - Streaming binary downloads to disk
//! - Classifying failures into task errors

use crate::crawler::context::TaskContext;
use crate::plugin::Credentials;
use crate::storage;
use crate::{TaskError, TaskResult};
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// One client per connect timeout the timeout policy can hand out
///
/// reqwest only supports a connect timeout per client, so the clients are
/// built up front and picked per request. Read timeouts are never degraded
/// and are the same for every tier.
#[derive(Debug)]
pub struct HttpClients {
    tiers: Vec<(Duration, Client)>,
    fallback: Client,
}

impl HttpClients {
    /// Builds a client for each distinct connect timeout in `connect_tiers`
    ///
    /// The first tier is the fallback for timeouts that have no client.
    pub fn new(
        user_agent: &str,
        connect_tiers: &[Duration],
        read_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let mut tiers: Vec<(Duration, Client)> = Vec::with_capacity(connect_tiers.len());
        for &connect in connect_tiers {
            if tiers.iter().any(|(existing, _)| *existing == connect) {
                continue;
            }
            tiers.push((connect, build_http_client(user_agent, connect, read_timeout)?));
        }

        let fallback = match tiers.first() {
            Some((_, client)) => client.clone(),
            None => build_http_client(user_agent, Duration::from_secs(10), read_timeout)?,
        };

        Ok(Self { tiers, fallback })
    }

    /// Returns the client built for `connect`, or the default client
    pub fn client_for(&self, connect: Duration) -> &Client {
        self.tiers
            .iter()
            .find(|(timeout, _)| *timeout == connect)
            .map(|(_, client)| client)
            .unwrap_or(&self.fallback)
    }

    /// Number of distinct clients
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

/// Builds an HTTP client with the given user agent and timeouts
pub fn build_http_client(
    user_agent: &str,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(connect_timeout)
        .read_timeout(read_timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Failure of a single attempt, as seen by [`retry_on_connect`]
#[derive(Debug)]
pub enum AttemptError<E> {
    /// Connection-level failure, retried while attempts remain
    Connect(E),
    /// Any other failure, returned immediately
    Fatal(E),
}

/// Runs `attempt` until it succeeds, fails with a non-connection error, or
/// `attempts` attempts have been made
///
/// The closure receives the 1-based attempt number. When every attempt fails
/// to connect the last connection error is returned.
pub async fn retry_on_connect<T, E, F, Fut>(
    attempts: u32,
    mut attempt: F,
) -> Result<T, AttemptError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
{
    let attempts = attempts.max(1);
    let mut number = 1;

    loop {
        match attempt(number).await {
            Err(AttemptError::Connect(_)) if number < attempts => {
                tracing::debug!("Connection attempt {}/{} failed, retrying", number, attempts);
                number += 1;
            }
            other => return other,
        }
    }
}

/// Maps a reqwest error onto the task error taxonomy
pub fn map_reqwest_error(err: &reqwest::Error) -> TaskError {
    if err.is_connect() || err.is_timeout() {
        TaskError::HttpConnect(err.to_string())
    } else {
        TaskError::HttpRequest(err.to_string())
    }
}

/// Returns true if a Content-Type header value denotes an HTML page
pub fn is_html_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .eq_ignore_ascii_case("text/html")
}

fn build_request(client: &Client, url: &str, credentials: Option<&Credentials>) -> RequestBuilder {
    let request = client.get(url);
    match credentials {
        Some(credentials) => credentials.apply(request),
        None => request,
    }
}

/// Runs `attempt` within the task's connect-attempt budget
///
/// Each connection failure counts against the URL's domain.
async fn retry_counting<T, E, F, Fut>(
    ctx: &TaskContext,
    url: &str,
    mut attempt: F,
) -> Result<T, AttemptError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
{
    retry_on_connect(ctx.connect_attempts(), |number| {
        let pending = attempt(number);
        async move {
            let result = pending.await;
            if matches!(result, Err(AttemptError::Connect(_))) {
                ctx.record_connect_failure(url);
            }
            result
        }
    })
    .await
}

/// Sends a GET for `url`, retrying connection failures
async fn send_with_retries(
    ctx: &TaskContext,
    url: &str,
    credentials: Option<&Credentials>,
) -> TaskResult<Response> {
    let client = ctx.client_for(url);

    let result = retry_counting(ctx, url, |_| {
        let request = build_request(client, url, credentials);
        async move {
            request.send().await.map_err(|err| {
                if err.is_connect() {
                    AttemptError::Connect(err)
                } else {
                    AttemptError::Fatal(err)
                }
            })
        }
    })
    .await;

    result.map_err(|err| match err {
        AttemptError::Connect(err) => TaskError::HttpConnect(format!(
            "{} after {} attempts: {}",
            url,
            ctx.connect_attempts(),
            err
        )),
        AttemptError::Fatal(err) => map_reqwest_error(&err),
    })
}

/// Fetches a page and returns its decoded body
///
/// See [`TaskContext::get_page`].
pub async fn get_page(
    ctx: &TaskContext,
    url: &str,
    credentials: Option<&Credentials>,
) -> TaskResult<String> {
    let client = ctx.client_for(url);
    let attempts = ctx.connect_attempts();
    let mut last_status = None;

    for attempt in 1..=attempts {
        match build_request(client, url, credentials).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                return response.text().await.map_err(|e| map_reqwest_error(&e));
            }
            Ok(response) => {
                tracing::debug!(
                    "Attempt {}/{} for {} returned {}",
                    attempt,
                    attempts,
                    url,
                    response.status()
                );
                last_status = Some(response.status());
            }
            Err(err) if err.is_connect() => {
                ctx.record_connect_failure(url);
                if attempt == attempts {
                    return Err(TaskError::HttpConnect(format!(
                        "{} after {} attempts: {}",
                        url, attempts, err
                    )));
                }
            }
            Err(err) => return Err(map_reqwest_error(&err)),
        }
    }

    Err(TaskError::HttpRequest(match last_status {
        Some(status) => format!("Request for {} failed with status {}", url, status),
        None => format!("Request for {} failed", url),
    }))
}

/// Downloads `url` into a new file at `save_path`
///
/// # Request Flow
///
/// 1. Fail with `FileExists` if `save_path` exists, before any network call
/// 2. Send GET, retrying connection failures up to `connect_attempts` times
/// 3. Reject `Content-Type: text/html`: the server sent a page, not the file
/// 4. Reject any status other than 200 (not retried)
/// 5. Stream the body to disk, checking `Content-Length` when present
///
/// # Returns
///
/// The number of bytes written
pub async fn download_file(
    ctx: &TaskContext,
    url: &str,
    save_path: &Path,
    credentials: Option<&Credentials>,
) -> TaskResult<u64> {
    tracing::info!("Downloading {} to {}", url, save_path.display());

    if tokio::fs::metadata(save_path).await.is_ok() {
        return Err(TaskError::FileExists(save_path.to_path_buf()));
    }

    let response = send_with_retries(ctx, url, credentials).await?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if is_html_content_type(content_type) {
        return Err(TaskError::HttpRequest(format!(
            "Got a page instead of a file from {}",
            url
        )));
    }

    let status = response.status();
    if status != StatusCode::OK {
        return Err(TaskError::HttpRequest(format!(
            "Request for {} failed with status {}",
            url, status
        )));
    }

    let expected_len = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    if expected_len.is_none() {
        tracing::warn!("No way of verifying file size for {}", url);
    }

    let body = Box::pin(
        response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| map_reqwest_error(&e))),
    );
    let written = storage::write_stream(save_path, body, expected_len).await?;

    tracing::debug!("Finished writing {} ({} bytes)", url, written);
    Ok(written)
}
