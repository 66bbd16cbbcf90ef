use crate::{config::Config, error, info, server, success, warning};

pub async fn serve() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Invalid configuration. Err: {}", e),
    };

    if config.riot.api_key.is_none() {
        warning!("RIOT_API_KEY is not set, Riot routes will report the key as missing");
    }

    info!("Starting folio backend on {}", config.server_address);
    if let Err(e) = server::start_api_server(config).await {
        error!("Server failed. Err: {}", e);
    }
    success!("Server stopped");
}
