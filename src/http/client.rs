use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use thiserror::Error as ThisError;
use url::Url;

use super::problem::Problem;
use crate::settings::Upstream;

#[derive(Debug, ThisError)]
pub enum FetchError {
    #[error("invalid upstream url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("upstream responded with {0}")]
    Status(StatusCode),
}

impl FetchError {
    /// Upstream statuses are relayed as they are, every other failure is a 500.
    pub fn into_problem(self, status_context: &str, failure_context: &str) -> Problem {
        match self {
            FetchError::Status(status) => {
                Problem::text(status, format!("{}: {}", status_context, status.as_u16()))
            }
            e => Problem::text(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{}: {}", failure_context, e),
            ),
        }
    }
}

/// Client for everything the relay fetches upstream.
///
/// Requests never carry anything from the caller's request unless the caller
/// explicitly forwards it; the user agent is the configured one and reqwest
/// is told not to invent referers on redirects.
#[derive(Clone)]
pub struct UpstreamClient {
    inner: Client,
}

impl UpstreamClient {
    pub fn new(settings: &Upstream) -> reqwest::Result<Self> {
        let mut builder = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .referer(false);

        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(UpstreamClient {
            inner: builder.build()?,
        })
    }

    /// GETs `url` with the neutral identity, anything but 200 is an error.
    pub async fn fetch(&self, url: &Url) -> Result<Response, FetchError> {
        let response = self
            .inner
            .get(url.clone())
            .header(ACCEPT, "*/*")
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response)
    }

    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner.request(method, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_is_relayed() {
        let problem =
            FetchError::Status(StatusCode::NOT_FOUND).into_problem("Error fetching M3U8", "Failed");

        assert_eq!(problem.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(problem.detail(), "Error fetching M3U8: 404");
    }

    #[test]
    fn test_other_failures_are_internal_errors() {
        let problem = FetchError::from(Url::parse("segment.ts").unwrap_err())
            .into_problem("Error fetching segment", "Failed to fetch segment");

        assert_eq!(problem.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            problem.detail(),
            "Failed to fetch segment: invalid upstream url: relative URL without a base"
        );
    }
}
