use anyhow::Context;
use hyper::body::Bytes;
use hyper::Body;
use log::info;
use url::Url;
use warp::http::header::{HeaderMap, HeaderName, CONTENT_TYPE};
use warp::http::{Method, Response, StatusCode};
use warp::{reject, Rejection, Reply};

use super::client::UpstreamClient;
use super::problem::{from_anyhow, Problem};
use super::UrlQuery;

/// Caller headers that never reach the target. The user agent is replaced by
/// the client's own, encodings are left to the target's defaults so bodies
/// stay readable.
const DROPPED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "connection",
    "content-length",
    "user-agent",
    "accept-encoding",
];

/// Target headers that are not copied back; the body is re-encoded here.
const DROPPED_RESPONSE_HEADERS: &[&str] = &["connection", "transfer-encoding", "content-length"];

/// The relay sets its own CORS headers on every reply.
const CORS_HEADER_PREFIX: &str = "access-control-";

fn without(headers: &HeaderMap, dropped: &[&str]) -> HeaderMap {
    let mut headers = headers.clone();

    for name in dropped {
        headers.remove(*name);
    }

    headers
}

fn relayed_response_headers(headers: &HeaderMap) -> HeaderMap {
    let mut relayed = without(headers, DROPPED_RESPONSE_HEADERS);
    let cors_headers: Vec<HeaderName> = relayed
        .keys()
        .filter(|name| name.as_str().starts_with(CORS_HEADER_PREFIX))
        .cloned()
        .collect();

    for name in cors_headers {
        relayed.remove(name);
    }

    relayed
}

pub async fn forward(
    query: UrlQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
    upstream: UpstreamClient,
) -> Result<Box<dyn Reply>, Rejection> {
    let target = query.target().ok_or_else(|| {
        reject::custom(Problem::json(
            StatusCode::BAD_REQUEST,
            "Target URL is required as a query parameter",
        ))
    })?;

    info!("Proxying API request to: {}", target);
    info!("Method: {}", method);

    let response = proxy(&upstream, target, method, &headers, body)
        .await
        .map_err(|e| {
            reject::custom(from_anyhow(
                e,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to proxy API request",
            ))
        })?;

    Ok(Box::new(response))
}

async fn proxy(
    upstream: &UpstreamClient,
    target: &str,
    method: Method,
    headers: &HeaderMap,
    body: Bytes,
) -> anyhow::Result<Response<Body>> {
    let url = Url::parse(target).with_context(|| format!("Invalid target url `{}`", target))?;
    let has_body = !(method == Method::GET || method == Method::HEAD);

    let mut request = upstream
        .request(method, url)
        .headers(without(headers, DROPPED_REQUEST_HEADERS));

    if has_body {
        request = request.body(body);
    }

    let response = request
        .send()
        .await
        .with_context(|| format!("Request to `{}` failed", target))?;

    let status = response.status();
    let response_headers = relayed_response_headers(response.headers());
    let content_type = response_headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    let body = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read response body from `{}`", target))?;

    let body = if content_type.contains("application/json") {
        let json: serde_json::Value =
            serde_json::from_slice(&body).context("Target sent malformed json")?;
        serde_json::to_vec(&json)?
    } else if content_type.contains("text/") {
        String::from_utf8_lossy(&body).into_owned().into_bytes()
    } else {
        body.to_vec()
    };

    let mut reply = Response::new(Body::from(body));
    *reply.status_mut() = status;
    *reply.headers_mut() = response_headers;

    Ok(reply)
}
