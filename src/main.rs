use hls_relay::{
    http::{create_routes, policy_from_settings, UpstreamClient},
    playlist::RelayRewriter,
    settings::Settings,
};

use anyhow::Context;
use log::info;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("Failed to load settings")?;
    let upstream =
        UpstreamClient::new(&settings.upstream).context("Failed to build upstream http client")?;

    let routes = create_routes(
        upstream,
        Arc::new(RelayRewriter::default()),
        policy_from_settings(&settings.access),
    );

    info!("Proxy server running on http://{}", settings.http.socket);
    warp::serve(routes).run(settings.http.socket).await;
    Ok(())
}
