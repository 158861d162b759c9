use futures::TryStreamExt;
use hyper::Body;
use log::{debug, info, warn};
use std::sync::Arc;
use url::Url;
use warp::http::header::{HeaderValue, CONTENT_TYPE};
use warp::http::{Response, StatusCode};
use warp::{reject, Rejection, Reply};

use super::client::{FetchError, UpstreamClient};
use super::problem::Problem;
use super::UrlQuery;
use crate::playlist::{PlaylistRewriter, PLAYLIST_CONTENT_TYPE};

const FRAGMENTED_MP4_CONTENT_TYPE: &str = "video/mp4";
const TRANSPORT_STREAM_CONTENT_TYPE: &str = "video/MP2T";
const KEY_CONTENT_TYPE: &str = "application/octet-stream";

fn required_url<'a>(query: &'a UrlQuery, message: &str) -> Result<&'a str, Rejection> {
    query
        .target()
        .ok_or_else(|| reject::custom(Problem::text(StatusCode::BAD_REQUEST, message)))
}

async fn fetch(upstream: &UpstreamClient, target: &str) -> Result<reqwest::Response, FetchError> {
    let url = Url::parse(target)?;

    upstream.fetch(&url).await
}

pub fn segment_content_type(url: &str) -> &'static str {
    let url = url.to_ascii_lowercase();

    if url.contains(".m4s") || url.contains(".mp4") {
        FRAGMENTED_MP4_CONTENT_TYPE
    } else {
        TRANSPORT_STREAM_CONTENT_TYPE
    }
}

pub async fn get_stream(
    query: UrlQuery,
    upstream: UpstreamClient,
    playlist_rewriter: Arc<dyn PlaylistRewriter>,
) -> Result<Box<dyn Reply>, Rejection> {
    let target = required_url(&query, "M3U8 URL is required")?;
    let to_problem = |e: FetchError| {
        reject::custom(e.into_problem("Error fetching M3U8", "Failed to fetch the stream"))
    };

    info!("Proxying stream from: {}", target);

    let response = fetch(&upstream, target).await.map_err(to_problem)?;
    // relative references resolve against the location that served the playlist
    let playlist_url = response.url().clone();
    let playlist = response
        .text()
        .await
        .map_err(|e| to_problem(FetchError::from(e)))?;

    debug!(
        "Rewriting playlist from `{}` ({} bytes)",
        playlist_url,
        playlist.len()
    );

    let rewritten = playlist_rewriter.rewrite_playlist(&playlist, &playlist_url);

    Ok(Box::new(warp::reply::with_header(
        rewritten,
        CONTENT_TYPE,
        PLAYLIST_CONTENT_TYPE,
    )))
}

pub async fn get_segment(
    query: UrlQuery,
    upstream: UpstreamClient,
) -> Result<Box<dyn Reply>, Rejection> {
    let target = required_url(&query, "Segment URL is required")?;

    info!("Fetching segment: {}", target);

    let response = fetch(&upstream, target).await.map_err(|e| {
        reject::custom(e.into_problem("Error fetching segment", "Failed to fetch segment"))
    })?;
    let segment_url = response.url().clone();

    let chunks = response.bytes_stream().map_err(move |e| {
        warn!("Segment stream from `{}` interrupted: {}", segment_url, e);
        e
    });

    let mut reply = Response::new(Body::wrap_stream(chunks));
    reply.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(segment_content_type(target)),
    );

    Ok(Box::new(reply))
}

pub async fn get_key(
    query: UrlQuery,
    upstream: UpstreamClient,
) -> Result<Box<dyn Reply>, Rejection> {
    let target = required_url(&query, "Key URL is required")?;
    let to_problem = |e: FetchError| {
        reject::custom(e.into_problem("Error fetching key", "Failed to fetch encryption key"))
    };

    info!("Fetching encryption key: {}", target);

    let response = fetch(&upstream, target).await.map_err(to_problem)?;
    let key = response
        .bytes()
        .await
        .map_err(|e| to_problem(FetchError::from(e)))?;

    Ok(Box::new(warp::reply::with_header(
        key.to_vec(),
        CONTENT_TYPE,
        KEY_CONTENT_TYPE,
    )))
}
