use log::{debug, warn};
use std::sync::Arc;
use url::Url;
use warp::http::StatusCode;
use warp::{reject, Filter, Rejection};

use super::problem::Problem;
use crate::settings::Access;

const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];

/// The request headers an access decision is based on.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    pub referer: Option<String>,
    pub origin: Option<String>,
    pub host: Option<String>,
}

impl CallerContext {
    /// Lowercased host of the page the request comes from.
    ///
    /// `Origin` wins over `Referer`. A header that is present but carries no
    /// usable host yields an empty string, which no policy allows.
    pub fn caller_host(&self) -> Option<String> {
        self.origin
            .as_deref()
            .or_else(|| self.referer.as_deref())
            .map(|value| {
                Url::parse(value)
                    .ok()
                    .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
                    .unwrap_or_default()
            })
    }

    /// Lowercased host the relay itself was addressed as, without port.
    pub fn relay_host(&self) -> Option<String> {
        let host = self.host.as_deref()?.trim();

        let host = if host.starts_with('[') {
            host.find(']').map_or(host, |end| &host[..=end])
        } else {
            host.split(':').next().unwrap_or(host)
        };

        Some(host.to_ascii_lowercase())
    }
}

fn is_loopback(host: &str) -> bool {
    LOOPBACK_HOSTS.contains(&host)
}

pub trait AccessPolicy: Send + Sync {
    fn is_allowed(&self, caller: &CallerContext) -> bool;

    /// Value for a `Content-Security-Policy` header on pages meant to be framed.
    fn frame_ancestors(&self) -> Option<String> {
        None
    }
}

pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn is_allowed(&self, _caller: &CallerContext) -> bool {
        true
    }
}

/// Lets through requests coming from one of `domains` (or their subdomains).
///
/// Requests without `Origin` and `Referer` are direct access; they are only
/// allowed when the relay itself is addressed via loopback or an allowed
/// domain. Loopback callers are allowed on a loopback relay.
pub struct DomainAllowList {
    domains: Vec<String>,
}

impl DomainAllowList {
    pub fn new<I>(domains: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        DomainAllowList {
            domains: domains
                .into_iter()
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    fn allows(&self, host: &str) -> bool {
        self.domains.iter().any(|domain| {
            host == domain
                || (host.ends_with(domain.as_str())
                    && host[..host.len() - domain.len()].ends_with('.'))
        })
    }
}

impl AccessPolicy for DomainAllowList {
    fn is_allowed(&self, caller: &CallerContext) -> bool {
        let relay_host = caller.relay_host();
        let relay_is_loopback = relay_host.as_deref().map_or(false, is_loopback);

        match caller.caller_host() {
            Some(caller_host) => {
                self.allows(&caller_host) || (relay_is_loopback && is_loopback(&caller_host))
            }
            None => relay_is_loopback || relay_host.as_deref().map_or(false, |h| self.allows(h)),
        }
    }

    fn frame_ancestors(&self) -> Option<String> {
        let sources: Vec<String> = std::iter::once(String::from("'self'"))
            .chain(self.domains.iter().map(|domain| format!("https://{}", domain)))
            .collect();

        Some(format!("frame-ancestors {}", sources.join(" ")))
    }
}

/// `AllowAll` when no domains are configured, a `DomainAllowList` otherwise.
pub fn policy_from_settings(access: &Access) -> Arc<dyn AccessPolicy> {
    if access.allowed_domains.is_empty() {
        Arc::new(AllowAll)
    } else {
        Arc::new(DomainAllowList::new(access.allowed_domains.iter().cloned()))
    }
}

pub fn caller_context() -> impl Filter<Extract = (CallerContext,), Error = Rejection> + Clone {
    warp::header::optional::<String>("referer")
        .and(warp::header::optional::<String>("origin"))
        .and(warp::header::optional::<String>("host"))
        .map(|referer, origin, host| CallerContext {
            referer,
            origin,
            host,
        })
}

pub fn check_access(
    policy: Arc<dyn AccessPolicy>,
) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    let policy = warp::any().map(move || Arc::clone(&policy));

    policy
        .and(caller_context())
        .and_then(validate)
        .untuple_one()
}

async fn validate(policy: Arc<dyn AccessPolicy>, caller: CallerContext) -> Result<(), Rejection> {
    debug!("Access check: {:?}", caller);

    if policy.is_allowed(&caller) {
        return Ok(());
    }

    warn!("Access denied for caller {:?}", caller);
    Err(reject::custom(Problem::text(
        StatusCode::FORBIDDEN,
        "Access denied. This service is only available to allowed domains",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(referer: Option<&str>, origin: Option<&str>, host: Option<&str>) -> CallerContext {
        CallerContext {
            referer: referer.map(String::from),
            origin: origin.map(String::from),
            host: host.map(String::from),
        }
    }

    fn sphub() -> DomainAllowList {
        DomainAllowList::new(vec![String::from("SPHub.tech")])
    }

    #[test]
    fn test_relay_host_strips_port() {
        assert_eq!(
            caller(None, None, Some("LocalHost:5000")).relay_host().as_deref(),
            Some("localhost")
        );
        assert_eq!(
            caller(None, None, Some("[::1]:5000")).relay_host().as_deref(),
            Some("[::1]")
        );
        assert_eq!(caller(None, None, None).relay_host(), None);
    }

    #[test]
    fn test_origin_wins_over_referer() {
        let caller = caller(
            Some("https://evil.example/page"),
            Some("https://www.sphub.tech"),
            None,
        );

        assert_eq!(caller.caller_host().as_deref(), Some("www.sphub.tech"));
    }

    #[test]
    fn test_allowed_domain_and_subdomains() {
        let policy = sphub();

        assert!(policy.is_allowed(&caller(
            Some("https://sphub.tech/watch/1"),
            None,
            Some("relay.example.net")
        )));
        assert!(policy.is_allowed(&caller(
            None,
            Some("https://cdn.sphub.tech"),
            Some("relay.example.net")
        )));
        assert!(!policy.is_allowed(&caller(
            None,
            Some("https://notsphub.tech"),
            Some("relay.example.net")
        )));
        assert!(!policy.is_allowed(&caller(
            Some("https://sphub.tech.evil.example/"),
            None,
            Some("relay.example.net")
        )));
    }

    #[test]
    fn test_direct_access() {
        let policy = sphub();

        assert!(policy.is_allowed(&caller(None, None, Some("localhost:5000"))));
        assert!(policy.is_allowed(&caller(None, None, Some("relay.sphub.tech"))));
        assert!(!policy.is_allowed(&caller(None, None, Some("relay.example.net"))));
        assert!(!policy.is_allowed(&caller(None, None, None)));
    }

    #[test]
    fn test_loopback_callers_only_on_loopback_relay() {
        let policy = sphub();

        assert!(policy.is_allowed(&caller(
            None,
            Some("http://localhost:3000"),
            Some("127.0.0.1:5000")
        )));
        assert!(!policy.is_allowed(&caller(
            None,
            Some("http://localhost:3000"),
            Some("relay.example.net")
        )));
    }

    #[test]
    fn test_unparsable_origin_is_denied() {
        assert!(!sphub().is_allowed(&caller(None, Some("null"), Some("localhost"))));
    }

    #[test]
    fn test_frame_ancestors() {
        assert_eq!(AllowAll.frame_ancestors(), None);
        assert_eq!(
            sphub().frame_ancestors().as_deref(),
            Some("frame-ancestors 'self' https://sphub.tech")
        );
    }

    #[test]
    fn test_policy_from_settings() {
        let open = policy_from_settings(&Access {
            allowed_domains: vec![],
        });
        let restricted = policy_from_settings(&Access {
            allowed_domains: vec![String::from("sphub.tech")],
        });
        let foreign = caller(None, Some("https://evil.example"), Some("relay.example.net"));

        assert!(open.is_allowed(&foreign));
        assert!(!restricted.is_allowed(&foreign));
    }
}
