use hyper::Body;
use warp::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_MAX_AGE,
    VARY,
};
use warp::http::{Method, Response, StatusCode};
use warp::reply::with::WithHeader;
use warp::{reject, Filter, Rejection};

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Marks every reply as readable from any origin.
pub fn allow_any_origin() -> WithHeader {
    warp::reply::with::header("access-control-allow-origin", "*")
}

/// Answers every `OPTIONS` request as a CORS preflight.
///
/// Whatever headers the browser asks for are allowed, `/api-proxy` forwards
/// arbitrary caller headers.
pub fn preflight() -> impl Filter<Extract = (Response<Body>,), Error = Rejection> + Clone {
    warp::method()
        .and_then(|method: Method| async move {
            if method == Method::OPTIONS {
                Ok(())
            } else {
                Err(reject::not_found())
            }
        })
        .untuple_one()
        .and(warp::header::optional::<String>(
            "access-control-request-headers",
        ))
        .map(preflight_reply)
}

fn preflight_reply(requested_headers: Option<String>) -> Response<Body> {
    let mut reply = Response::new(Body::empty());
    *reply.status_mut() = StatusCode::NO_CONTENT;

    let headers = reply.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE),
    );
    headers.insert(VARY, HeaderValue::from_static("Access-Control-Request-Headers"));

    if let Some(requested) = requested_headers.and_then(|v| HeaderValue::from_str(&v).ok()) {
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested);
    }

    reply
}
