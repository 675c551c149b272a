mod api_client;
mod calendar;
mod duty_data;
mod filter;
mod form;
mod html;
mod server;

use tracing_subscriber::EnvFilter;

use api_client::ApiConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 待ち受けポートとバックエンドAPIのベースURLは環境変数から
    let port: u16 = std::env::var("DUTY_WEB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let config = ApiConfig::from_env();
    tracing::info!("backend api base: {}", config.base_url);

    server::run(port, config).await;
}
