use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use britonia_contact::config::AppConfig;
use britonia_contact::services::{EmailService, MailDispatcher};
use britonia_contact::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // INFO by default; override with RUST_LOG
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "britonia_contact=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let mailer: Option<Arc<dyn MailDispatcher>> = match EmailService::from_config(&config.mail)? {
        Some(service) => {
            tracing::info!(to = %config.mail.to_email, "Email service ready");
            Some(Arc::new(service) as Arc<dyn MailDispatcher>)
        }
        None => None,
    };

    for origin in &config.cors_origins {
        if origin.starts_with("http://") && !origin.contains("localhost") {
            tracing::warn!("Insecure HTTP origin in CORS: {} (use HTTPS in production)", origin);
        }
    }

    let tls = config.tls.clone();
    let server_address = config.server_address();

    let state = AppState::new(config, mailer);
    state.contact_limiter.spawn_cleanup();

    let app = create_app(state).into_make_service_with_connect_info::<SocketAddr>();

    if tls.enabled {
        let rustls_config = tls.rustls_config().await?;
        let addr = SocketAddr::from(([0, 0, 0, 0], tls.port));

        tracing::info!("Starting contact service with TLS on https://{}", addr);

        axum_server::bind_rustls(addr, rustls_config).serve(app).await?;
    } else {
        let listener = tokio::net::TcpListener::bind(server_address.as_str()).await?;

        tracing::info!("Starting contact service on http://{}", server_address);

        axum::serve(listener, app).await?;
    }

    Ok(())
}
