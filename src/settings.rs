mod access;
mod error;
mod http;
mod upstream;

pub use access::*;
pub use error::*;
pub use http::*;
pub use upstream::*;

use log::info;
use std::env;
use std::fs::File;
use std::io::{BufReader, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::result::Result;

use serde::Deserialize;

const DEFAULT_HTTP_PORT: u16 = 5000;
const CONFIG_PATH_ENV: &str = "APP_CONFIG";
const PORT_ENV: &str = "PORT";

#[derive(Debug)]
pub struct Settings {
    pub http: Http,
    pub upstream: Upstream,
    pub access: Access,
}

impl Settings {
    /// Environment first, then the optional `APP_CONFIG` file, then defaults.
    pub fn load() -> Result<Self, SettingsError> {
        let mut sources = vec![PartialSettings::from_env()?];

        if let Some(path) = get_config_path() {
            sources.push(PartialSettings::from_file(&path)?);
        }

        sources.push(Default::default());
        Settings::merge(sources)
    }

    pub fn from_reader<T: Read>(reader: T) -> Result<Self, SettingsError> {
        Settings::merge(vec![PartialSettings::from_reader(reader)?, Default::default()])
    }

    /// Merges the sources field by field, earlier sources win.
    pub fn merge(mut sources: Vec<PartialSettings>) -> Result<Self, SettingsError> {
        let http_sources = sources.iter_mut().filter_map(|s| s.http.take()).collect();
        let upstream_sources = sources
            .iter_mut()
            .filter_map(|s| s.upstream.take())
            .collect();
        let access_sources = sources.iter_mut().filter_map(|s| s.access.take()).collect();

        Ok(Settings {
            http: Http::new(http_sources)?,
            upstream: Upstream::new(upstream_sources)?,
            access: Access::new(access_sources)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    http: Option<PartialHttp>,
    upstream: Option<PartialUpstream>,
    access: Option<PartialAccess>,
}

impl PartialSettings {
    pub fn from_file(file_path: &str) -> Result<Self, SettingsError> {
        let file = File::open(file_path).map_err(|e| SettingsError::FileParse {
            path: Some(file_path.to_string()),
            cause: Box::new(e),
        })?;

        PartialSettings::from_reader(BufReader::new(file)).map_err(|e| match e {
            SettingsError::FileParse { path: None, cause } => SettingsError::FileParse {
                path: Some(file_path.to_string()),
                cause,
            },
            e => e,
        })
    }

    pub fn from_reader<T: Read>(reader: T) -> Result<Self, SettingsError> {
        serde_yaml::from_reader(reader).map_err(|e| SettingsError::FileParse {
            path: None,
            cause: Box::new(e),
        })
    }

    pub fn from_env() -> Result<Self, SettingsError> {
        PartialSettings::from_env_lookup(|name| env::var(name).ok())
    }

    pub fn from_env_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(PORT_ENV) {
            None => None,
            Some(value) => Some(value.trim().parse::<u16>().map_err(|e| {
                SettingsError::InvalidEnv {
                    name: PORT_ENV.to_string(),
                    cause: Box::new(e),
                }
            })?),
        };

        Ok(PartialSettings {
            http: Some(PartialHttp { socket: None, port }),
            upstream: None,
            access: None,
        })
    }
}

impl Default for PartialSettings {
    fn default() -> Self {
        PartialSettings {
            http: Some(PartialHttp {
                socket: Some(SocketAddr::new(
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    DEFAULT_HTTP_PORT,
                )),
                port: None,
            }),
            upstream: Some(PartialUpstream {
                user_agent: Some(DEFAULT_USER_AGENT.to_string()),
                timeout: None,
            }),
            access: Some(PartialAccess {
                allowed_domains: Some(vec![]),
            }),
        }
    }
}

fn get_config_path() -> Option<String> {
    match env::var(CONFIG_PATH_ENV) {
        Ok(path) => Some(path),
        Err(e) => {
            info!(
                "Missing or invalid {} env var, running without config file; {:?}",
                CONFIG_PATH_ENV, e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::time::Duration;

    #[test]
    fn test_defaults_only() {
        let settings = Settings::merge(vec![Default::default()]).unwrap();

        assert_eq!(
            settings.http.socket,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_HTTP_PORT)
        );
        assert_eq!(settings.upstream.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(settings.upstream.timeout, None);
        assert!(settings.access.allowed_domains.is_empty());
    }

    #[test]
    fn test_override_defaults() {
        let yml = r#"
http:
    socket: 127.0.0.1:8080
upstream:
    user_agent: "relay/1.0"
    timeout: 30s
access:
    allowed_domains:
        - sphub.tech
        - Example.COM
"#;

        let settings = Settings::from_reader(yml.as_bytes()).unwrap();

        assert_eq!(
            settings.http.socket,
            SocketAddr::new(IpAddr::from_str("127.0.0.1").unwrap(), 8080)
        );
        assert_eq!(settings.upstream.user_agent, "relay/1.0");
        assert_eq!(settings.upstream.timeout, Some(Duration::from_secs(30)));
        assert_eq!(
            settings.access.allowed_domains,
            vec!["sphub.tech".to_string(), "example.com".to_string()]
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let yml = r#"
upstream:
    timeout: 2m
"#;

        let settings = Settings::from_reader(yml.as_bytes()).unwrap();

        assert_eq!(settings.http.socket.port(), DEFAULT_HTTP_PORT);
        assert_eq!(settings.upstream.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(settings.upstream.timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_port_env_overrides_file_socket() {
        let env = PartialSettings::from_env_lookup(|name| match name {
            "PORT" => Some("7000".to_string()),
            _ => None,
        })
        .unwrap();
        let file = PartialSettings::from_reader(
            r#"
http:
    socket: 127.0.0.1:8080
"#
            .as_bytes(),
        )
        .unwrap();

        let settings = Settings::merge(vec![env, file, Default::default()]).unwrap();

        assert_eq!(
            settings.http.socket,
            SocketAddr::new(IpAddr::from_str("127.0.0.1").unwrap(), 7000)
        );
    }

    #[test]
    fn test_invalid_port_env() {
        let result = PartialSettings::from_env_lookup(|_| Some("fivethousand".to_string()));

        match result {
            Err(SettingsError::InvalidEnv { name, .. }) => assert_eq!(name, "PORT"),
            other => panic!("expected invalid env error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_values() {
        let result = Settings::merge(vec![PartialSettings {
            http: None,
            upstream: None,
            access: None,
        }]);

        assert!(matches!(result, Err(SettingsError::MissingValue(_))));
    }

    #[test]
    fn test_malformed_file() {
        let result = Settings::from_reader("http: [".as_bytes());

        assert!(matches!(
            result,
            Err(SettingsError::FileParse { path: None, .. })
        ));
    }
}
