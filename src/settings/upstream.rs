use serde::Deserialize;
use std::time::Duration;

use super::SettingsError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Identity and limits of the requests the relay sends upstream.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub user_agent: String,
    pub timeout: Option<Duration>,
}

impl Upstream {
    pub fn new(sources: Vec<PartialUpstream>) -> Result<Self, SettingsError> {
        let merged: PartialUpstream =
            sources
                .into_iter()
                .fold(Default::default(), |acc, x| PartialUpstream {
                    user_agent: acc.user_agent.or(x.user_agent),
                    timeout: acc.timeout.or(x.timeout),
                });

        Ok(Upstream {
            user_agent: merged
                .user_agent
                .ok_or_else(|| SettingsError::MissingValue("upstream.user_agent".to_string()))?,
            timeout: merged.timeout,
        })
    }
}

impl Default for Upstream {
    fn default() -> Self {
        Upstream {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialUpstream {
    pub user_agent: Option<String>,

    #[serde(default)]
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}
