use serde::Deserialize;
use std::net::SocketAddr;

use super::SettingsError;

#[derive(Debug)]
pub struct Http {
    pub socket: SocketAddr,
}

impl Http {
    pub fn new(sources: Vec<PartialHttp>) -> Result<Self, SettingsError> {
        let merged: PartialHttp =
            sources
                .into_iter()
                .fold(Default::default(), |acc, x| PartialHttp {
                    socket: acc.socket.or(x.socket),
                    port: acc.port.or(x.port),
                });

        let mut socket = merged
            .socket
            .ok_or_else(|| SettingsError::MissingValue("http.socket".to_string()))?;

        if let Some(port) = merged.port {
            socket.set_port(port);
        }

        Ok(Http { socket })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialHttp {
    pub socket: Option<SocketAddr>,

    /// only ever set from the `PORT` env var
    #[serde(skip)]
    pub port: Option<u16>,
}
