use log::{debug, error};
use serde::Serialize;
use std::fmt;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::reply::{self, Reply, Response};
use warp::Rejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemFormat {
    Text,
    Json,
}

/// An error that ends a request with `status_code` and a readable `detail`.
#[derive(Debug)]
pub struct Problem {
    status_code: StatusCode,
    detail: String,
    format: ProblemFormat,
}

impl Problem {
    pub fn text(status_code: StatusCode, detail: impl Into<String>) -> Self {
        Problem {
            status_code,
            detail: detail.into(),
            format: ProblemFormat::Text,
        }
    }

    pub fn json(status_code: StatusCode, detail: impl Into<String>) -> Self {
        Problem {
            status_code,
            detail: detail.into(),
            format: ProblemFormat::Json,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    fn to_response(&self) -> Response {
        match self.format {
            ProblemFormat::Text => {
                reply::with_status(self.detail.clone(), self.status_code).into_response()
            }
            ProblemFormat::Json => reply::with_status(
                reply::json(&ErrorBody {
                    error: &self.detail,
                }),
                self.status_code,
            )
            .into_response(),
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HTTP StatusCode: {}: {}",
            self.status_code.as_u16(),
            self.detail
        )
    }
}

impl std::error::Error for Problem {}

impl Reject for Problem {}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Wraps an error chain into a json problem unless it already is one.
pub fn from_anyhow(e: anyhow::Error, status_code: StatusCode, context: &str) -> Problem {
    let e = match e.downcast::<Problem>() {
        Ok(problem) => return problem,
        Err(e) => e,
    };

    Problem::json(status_code, format!("{}: {:#}", context, e))
}

/// Renders problems, everything else is left to warp.
pub async fn recover(rejection: Rejection) -> Result<Response, Rejection> {
    match rejection.find::<Problem>() {
        Some(problem) => {
            error!("{}", problem);
            Ok(problem.to_response())
        }
        None => {
            debug!("Unhandled rejection: {:?}", rejection);
            Err(rejection)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_from_anyhow_keeps_existing_problem() {
        let problem = from_anyhow(
            anyhow::Error::new(Problem::text(StatusCode::BAD_GATEWAY, "upstream gone")),
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed",
        );

        assert_eq!(problem.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(problem.detail(), "upstream gone");
    }

    #[test]
    fn test_from_anyhow_includes_context_chain() {
        let problem = from_anyhow(
            anyhow!("connection refused").context("upstream request failed"),
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to proxy API request",
        );

        assert_eq!(problem.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            problem.detail(),
            "Failed to proxy API request: upstream request failed: connection refused"
        );
    }

    #[tokio::test]
    async fn test_recover_renders_json_problem() {
        let response = recover(warp::reject::custom(Problem::json(
            StatusCode::BAD_REQUEST,
            "Target URL is required as a query parameter",
        )))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(
            body.as_ref(),
            br#"{"error":"Target URL is required as a query parameter"}"#
        );
    }

    #[tokio::test]
    async fn test_recover_passes_on_other_rejections() {
        assert!(recover(warp::reject::not_found()).await.is_err());
    }
}
