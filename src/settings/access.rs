use serde::Deserialize;

use super::SettingsError;

#[derive(Debug)]
pub struct Access {
    /// Domains allowed to pull playlists through the relay; empty allows everyone.
    pub allowed_domains: Vec<String>,
}

impl Access {
    pub fn new(sources: Vec<PartialAccess>) -> Result<Self, SettingsError> {
        let merged: PartialAccess =
            sources
                .into_iter()
                .fold(Default::default(), |acc, x| PartialAccess {
                    allowed_domains: acc.allowed_domains.or(x.allowed_domains),
                });

        let allowed_domains = merged
            .allowed_domains
            .ok_or_else(|| SettingsError::MissingValue("access.allowed_domains".to_string()))?
            .into_iter()
            .map(|domain| domain.trim().to_ascii_lowercase())
            .filter(|domain| !domain.is_empty())
            .collect();

        Ok(Access { allowed_domains })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialAccess {
    pub allowed_domains: Option<Vec<String>>,
}
