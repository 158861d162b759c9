use std::fmt;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{reject, Filter, Rejection, Reply};

use super::access::AccessPolicy;
use super::problem::Problem;
use super::UrlQuery;
use crate::playlist::encode_url_component;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");
const EMBED_TEMPLATE: &str = include_str!("../../templates/embed.html");
const PLAYER_TEMPLATE: &str = include_str!("../../templates/player.html");

const SERVER_ORIGIN_PLACEHOLDER: &str = "{{server_origin}}";
const STREAM_URL_PLACEHOLDER: &str = "{{encoded_stream_url}}";

/// Scheme and host the caller used to reach the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOrigin(String);

impl ServerOrigin {
    fn new(forwarded_proto: Option<String>, host: Option<String>) -> Self {
        let proto = forwarded_proto
            .as_deref()
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("http")
            .to_string();
        let host = host.unwrap_or_else(|| "localhost".to_string());

        ServerOrigin(format!("{}://{}", proto, host))
    }
}

impl fmt::Display for ServerOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Proxies in front of the relay are trusted to report the original scheme.
pub fn server_origin() -> impl Filter<Extract = (ServerOrigin,), Error = Rejection> + Clone {
    warp::header::optional::<String>("x-forwarded-proto")
        .and(warp::header::optional::<String>("host"))
        .map(ServerOrigin::new)
}

fn render(template: &str, origin: &ServerOrigin, stream_url: Option<&str>) -> String {
    let page = template.replace(SERVER_ORIGIN_PLACEHOLDER, &origin.0);

    match stream_url {
        Some(stream_url) => {
            page.replace(STREAM_URL_PLACEHOLDER, &encode_url_component(stream_url))
        }
        None => page,
    }
}

fn required_stream_url(query: &UrlQuery) -> Result<&str, Rejection> {
    query.target().ok_or_else(|| {
        reject::custom(Problem::text(
            StatusCode::BAD_REQUEST,
            "Stream URL is required as a query parameter",
        ))
    })
}

pub fn index(origin: ServerOrigin) -> impl Reply {
    warp::reply::html(render(INDEX_TEMPLATE, &origin, None))
}

pub async fn embed(
    query: UrlQuery,
    origin: ServerOrigin,
    access_policy: Arc<dyn AccessPolicy>,
) -> Result<Box<dyn Reply>, Rejection> {
    let stream_url = required_stream_url(&query)?;
    let page = warp::reply::html(render(EMBED_TEMPLATE, &origin, Some(stream_url)));

    match access_policy.frame_ancestors() {
        Some(csp) => Ok(Box::new(warp::reply::with_header(
            page,
            "content-security-policy",
            csp,
        ))),
        None => Ok(Box::new(page)),
    }
}

pub async fn player(query: UrlQuery, origin: ServerOrigin) -> Result<Box<dyn Reply>, Rejection> {
    let stream_url = required_stream_url(&query)?;

    Ok(Box::new(warp::reply::html(render(
        PLAYER_TEMPLATE,
        &origin,
        Some(stream_url),
    ))))
}
