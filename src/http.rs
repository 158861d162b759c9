mod access;
mod api_proxy;
mod client;
mod cors;
mod pages;
mod problem;
mod relay;

pub use access::{
    caller_context, check_access, policy_from_settings, AccessPolicy, AllowAll, CallerContext,
    DomainAllowList,
};
pub use client::{FetchError, UpstreamClient};
pub use problem::{Problem, ProblemFormat};

use serde::Deserialize;
use std::sync::Arc;
use warp::{filters::BoxedFilter, Filter, Reply};

use crate::playlist::PlaylistRewriter;

/// The `url` query parameter every relay route takes.
#[derive(Debug, Default, Deserialize)]
pub struct UrlQuery {
    url: Option<String>,
}

impl UrlQuery {
    /// The target url, an empty value counts as missing.
    pub fn target(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

pub fn create_routes(
    upstream: UpstreamClient,
    playlist_rewriter: Arc<dyn PlaylistRewriter>,
    access_policy: Arc<dyn AccessPolicy>,
) -> BoxedFilter<(impl Reply,)> {
    let stream_access = check_access(Arc::clone(&access_policy));
    let upstream = warp::any().map(move || upstream.clone());
    let playlist_rewriter = warp::any().map(move || Arc::clone(&playlist_rewriter));
    let access_policy = warp::any().map(move || Arc::clone(&access_policy));
    let url_query = warp::query::<UrlQuery>();

    let index = warp::path::end()
        .and(warp::get())
        .and(pages::server_origin())
        .map(pages::index);

    let healthz = warp::path("healthz").map(|| "🧩");

    let get_stream = warp::path("stream")
        .and(warp::path::end())
        .and(warp::get())
        .and(stream_access)
        .and(url_query)
        .and(upstream.clone())
        .and(playlist_rewriter)
        .and_then(relay::get_stream);

    let get_segment = warp::path("segment")
        .and(warp::path::end())
        .and(warp::get())
        .and(url_query)
        .and(upstream.clone())
        .and_then(relay::get_segment);

    let get_key = warp::path("key")
        .and(warp::path::end())
        .and(warp::get())
        .and(url_query)
        .and(upstream.clone())
        .and_then(relay::get_key);

    let embed = warp::path("embed")
        .and(warp::path::end())
        .and(warp::get())
        .and(url_query)
        .and(pages::server_origin())
        .and(access_policy)
        .and_then(pages::embed);

    let player = warp::path("player")
        .and(warp::path::end())
        .and(warp::get())
        .and(url_query)
        .and(pages::server_origin())
        .and_then(pages::player);

    let api_proxy = warp::path("api-proxy")
        .and(warp::path::end())
        .and(url_query)
        .and(warp::method())
        .and(warp::header::headers_cloned())
        .and(warp::body::bytes())
        .and(upstream)
        .and_then(api_proxy::forward);

    cors::preflight()
        .or(index)
        .or(healthz)
        .or(get_stream)
        .or(get_segment)
        .or(get_key)
        .or(embed)
        .or(player)
        .or(api_proxy)
        .recover(problem::recover)
        .with(cors::allow_any_origin())
        .with(warp::log("hls_relay"))
        .boxed()
}
