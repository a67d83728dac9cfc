//! HTTP GET with retry, backoff and read timeout.
//!
//! Uses async reqwest internally with tokio::time::timeout for stall detection,
//! but presents a sync interface for compatibility with rayon workers.

use std::io::{self, Cursor, Read};
use std::pin::Pin;
use std::sync::LazyLock;
use std::task::Context;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::FetchError;
use crate::retry::{SleepFn, retry_with_backoff, thread_sleep};

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Request settings shared by every fetch issued through one [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Bound on sending a request, and on each body read
    pub timeout: Duration,
    /// Total attempts per URL (values below 1 behave as 1)
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Successful HTTP response with a blocking body.
pub struct Response {
    status: u16,
    content_length: Option<u64>,
    body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl Response {
    /// Response whose body is already in memory
    pub fn from_bytes(status: u16, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            status,
            content_length: Some(bytes.len() as u64),
            body: Box::new(Cursor::new(bytes)),
        }
    }

    /// Response whose body is read lazily from `reader`
    pub fn from_reader(
        status: u16,
        content_length: Option<u64>,
        reader: impl Read + Send + 'static,
    ) -> Self {
        Self {
            status,
            content_length,
            body: Box::new(reader),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Body length announced by the server, if any
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Read the whole body as text (invalid UTF-8 is replaced).
    pub fn text(mut self) -> io::Result<String> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.body
    }
}

/// Source of HTTP responses.
///
/// `stream = false` buffers the whole body before returning; `stream = true`
/// hands back a reader so large documents never sit in memory.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, stream: bool) -> Result<Response, FetchError>;
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Blocking fetcher over a pooled async reqwest client.
///
/// Each URL is tried up to `max_retries` times; a non-success status, a
/// transport error, or a timeout counts as a failed attempt and is followed
/// by an exponential backoff pause. Exhaustion is reported as
/// [`FetchError::Exhausted`] and never panics.
pub struct HttpFetcher {
    client: reqwest::Client,
    config: HttpConfig,
    sleep: SleepFn,
}

impl HttpFetcher {
    pub fn new(config: HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .pool_max_idle_per_host(8)
            .user_agent(concat!("irbfetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::from_reqwest(&e))?;
        Ok(Self {
            client,
            config,
            sleep: thread_sleep(),
        })
    }

    /// Replace the backoff pause (tests record pauses instead of sleeping).
    pub fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.sleep = sleep;
        self
    }

    fn attempt(&self, url: &str, stream: bool) -> Result<Response, FetchError> {
        let timeout = self.config.timeout;
        SHARED_RUNTIME.handle().block_on(async {
            let response = tokio::time::timeout(timeout, self.client.get(url).send())
                .await
                .map_err(|_| FetchError::Timeout(timeout))?
                .map_err(|e| FetchError::from_reqwest(&e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            let content_length = response.content_length();

            if stream {
                let body = response
                    .bytes_stream()
                    .map(|result| result.map_err(io::Error::other));
                let reader = TimeoutReader::new(
                    Box::pin(tokio_util::io::StreamReader::new(body)),
                    timeout,
                );
                Ok(Response::from_reader(status.as_u16(), content_length, reader))
            } else {
                let bytes = tokio::time::timeout(timeout, response.bytes())
                    .await
                    .map_err(|_| FetchError::Timeout(timeout))?
                    .map_err(|e| FetchError::from_reqwest(&e))?;
                Ok(Response::from_bytes(status.as_u16(), bytes.to_vec()))
            }
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, stream: bool) -> Result<Response, FetchError> {
        let attempts = self.config.max_retries.max(1);
        retry_with_backoff(url, attempts, self.sleep.as_ref(), |_| {
            self.attempt(url, stream)
        })
        .map_err(|last| FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            last: Box::new(last),
        })
    }
}

/// Async-to-sync bridge with read timeout.
///
/// Wraps an async reader and provides sync Read interface.
/// Each read operation has a timeout - if no data arrives within
/// `timeout`, returns TimedOut error.
pub struct TimeoutReader {
    inner: Pin<Box<dyn AsyncRead + Send>>,
    timeout: Duration,
}

impl TimeoutReader {
    fn new(inner: Pin<Box<dyn AsyncRead + Send>>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl Read for TimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self.timeout;
        SHARED_RUNTIME.handle().block_on(async {
            let read_future = async {
                let mut read_buf = ReadBuf::new(buf);
                std::future::poll_fn(|cx: &mut Context<'_>| {
                    Pin::as_mut(&mut self.inner).poll_read(cx, &mut read_buf)
                })
                .await?;
                Ok::<_, io::Error>(read_buf.filled().len())
            };

            match tokio::time::timeout(timeout, read_future).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("read timeout ({}s with no data)", timeout.as_secs()),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server() -> (tokio::runtime::Runtime, MockServer) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        (rt, server)
    }

    fn recording_fetcher(config: HttpConfig) -> (HttpFetcher, Arc<Mutex<Vec<Duration>>>) {
        let pauses = Arc::new(Mutex::new(Vec::new()));
        let recorder = pauses.clone();
        let fetcher = HttpFetcher::new(config)
            .unwrap()
            .with_sleep(Arc::new(move |d: Duration| recorder.lock().unwrap().push(d)));
        (fetcher, pauses)
    }

    #[test]
    fn response_from_bytes_text() {
        let response = Response::from_bytes(200, b"hello".to_vec());
        assert_eq!(response.status(), 200);
        assert_eq!(response.content_length(), Some(5));
        assert_eq!(response.text().unwrap(), "hello");
    }

    #[test]
    fn response_text_replaces_invalid_utf8() {
        let response = Response::from_bytes(200, vec![b'a', 0xff, b'b']);
        assert_eq!(response.text().unwrap(), "a\u{fffd}b");
    }

    #[test]
    fn default_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn two_failures_then_success() {
        let (rt, server) = server();
        rt.block_on(async {
            Mock::given(method("GET"))
                .and(path("/listing"))
                .respond_with(ResponseTemplate::new(500))
                .up_to_n_times(2)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/listing"))
                .respond_with(ResponseTemplate::new(200).set_body_string("third time"))
                .mount(&server)
                .await;
        });

        let (fetcher, pauses) = recording_fetcher(HttpConfig::default());
        let response = fetcher
            .fetch(&format!("{}/listing", server.uri()), false)
            .unwrap();

        assert_eq!(response.text().unwrap(), "third time");
        assert_eq!(
            *pauses.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn persistent_failure_is_exhausted() {
        let (rt, server) = server();
        rt.block_on(
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .expect(3)
                .mount(&server),
        );

        let (fetcher, pauses) = recording_fetcher(HttpConfig::default());
        let err = fetcher
            .fetch(&format!("{}/missing.pdf", server.uri()), true)
            .unwrap_err();

        match &err {
            FetchError::Exhausted { attempts, .. } => assert_eq!(*attempts, 3),
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(err.status(), Some(404));
        assert_eq!(pauses.lock().unwrap().len(), 2);
        rt.block_on(server.verify());
    }

    #[test]
    fn streamed_body_is_readable() {
        let (rt, server) = server();
        let body = vec![7u8; 64 * 1024];
        rt.block_on(
            Mock::given(method("GET"))
                .and(path("/doc.pdf"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
                .mount(&server),
        );

        let (fetcher, _) = recording_fetcher(HttpConfig::default());
        let response = fetcher
            .fetch(&format!("{}/doc.pdf", server.uri()), true)
            .unwrap();
        assert_eq!(response.content_length(), Some(body.len() as u64));

        let mut read = Vec::new();
        response.into_reader().read_to_end(&mut read).unwrap();
        assert_eq!(read, body);
    }

    #[test]
    fn slow_response_times_out() {
        let (rt, server) = server();
        rt.block_on(
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
                .mount(&server),
        );

        let config = HttpConfig {
            timeout: Duration::from_millis(200),
            max_retries: 1,
        };
        let (fetcher, pauses) = recording_fetcher(config);
        let err = fetcher.fetch(&server.uri(), false).unwrap_err();

        match err {
            FetchError::Exhausted { last, .. } => {
                assert!(matches!(*last, FetchError::Timeout(_)));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert!(pauses.lock().unwrap().is_empty());
    }
}
