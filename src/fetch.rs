use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use url::Url;

use crate::config::Config;
use crate::error::ScrapeError;

const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

/// HTTP client preset with the browser headers Instagram expects.
///
/// Built once at startup and cloned into request handlers; nothing in it is
/// mutated after construction.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    page_timeout: Duration,
    media_timeout: Duration,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let mut builder = reqwest::ClientBuilder::new()
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers);

        if config.insecure_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| ScrapeError::Request(e.to_string()))?;

        Ok(Self {
            client,
            page_timeout: config.page_timeout,
            media_timeout: config.media_timeout,
        })
    }

    /// GET a post page and return its HTML.
    pub async fn fetch_page(&self, url: &Url) -> Result<String, ScrapeError> {
        let response = self
            .client
            .get(url.as_str())
            .header(ACCEPT, PAGE_ACCEPT)
            .timeout(self.page_timeout)
            .send()
            .await
            .map_err(request_error)?;

        let response = ensure_success(response)?;
        response.text().await.map_err(request_error)
    }

    /// GET a media file. The body is left unread so callers can stream it.
    pub async fn fetch_media(&self, url: &Url) -> Result<reqwest::Response, ScrapeError> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(self.media_timeout)
            .send()
            .await
            .map_err(request_error)?;

        ensure_success(response)
    }
}

fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ScrapeError> {
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(%status, url = %response.url(), "upstream returned an error");
        return Err(ScrapeError::Upstream { status });
    }
    Ok(response)
}

fn request_error(e: reqwest::Error) -> ScrapeError {
    if e.is_timeout() {
        ScrapeError::Request(format!("TimeoutError: {}", e))
    } else if e.is_connect() {
        ScrapeError::Request(format!("ConnectError: {}", e))
    } else {
        ScrapeError::Request(format!("RequestError: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(&Config::default()).unwrap()
    }

    #[tokio::test]
    async fn page_is_fetched_with_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/ABC/"))
            .and(header_exists("user-agent"))
            .and(header_exists("accept-language"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/p/ABC/", server.uri())).unwrap();
        let html = fetcher().fetch_page(&url).await.unwrap();
        assert_eq!(html, "<html>ok</html>");
    }

    #[tokio::test]
    async fn redirects_are_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reel/ABC/"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("location", format!("{}/p/ABC/", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p/ABC/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("landed"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/reel/ABC/", server.uri())).unwrap();
        assert_eq!(fetcher().fetch_page(&url).await.unwrap(), "landed");
    }

    #[tokio::test]
    async fn non_2xx_is_an_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/p/gone/", server.uri())).unwrap();
        let err = fetcher().fetch_page(&url).await.unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::Upstream { status } if status.as_u16() == 404
        ));
    }

    #[tokio::test]
    async fn connection_failure_is_a_request_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = Url::parse(&format!("http://127.0.0.1:{}/p/ABC/", port)).unwrap();

        let err = fetcher().fetch_page(&url).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Request(_)));
    }
}
