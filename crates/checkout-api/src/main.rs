//! # Glow Checkout
//!
//! Checkout service for the glow skincare storefront.
//!
//! ## Usage
//!
//! ```bash
//! # Card payments (optional)
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//! export STRIPE_ENABLED=true
//!
//! # Store products (optional)
//! export SHOPIFY_STORE_DOMAIN=glow.myshopify.com
//! export SHOPIFY_STOREFRONT_ACCESS_TOKEN=...
//!
//! # Run the server
//! glow-checkout
//! ```

use checkout_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Demo products loaded: {}", state.catalog.products.len());
    info!("Backends: {:?}", state.backends);
    info!(
        "Backend timeout: {}s",
        state.config.checkout_timeout.as_secs()
    );

    let app = routes::create_router(state);

    info!("Glow checkout starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Carts: POST http://{}/api/v1/carts", addr);
        info!("Checkout: POST http://{}/api/v1/carts/{{id}}/checkout", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Glow Checkout
  ━━━━━━━━━━━━━━━━━━━━━━━
  Storefront checkout engine
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
