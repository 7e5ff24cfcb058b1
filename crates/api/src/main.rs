use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use vendops_api::config::Args;
use vendops_infra::Services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    vendops_observability::init(args.log_format);

    let services = Services::open(args.app_config())
        .await
        .context("failed to open the store")?;
    let services = Arc::new(services);

    if args.warm_cache {
        let report = services.warmup(None, None).await;
        tracing::info!(
            successful = report.successful_operations,
            total = report.total_operations,
            "startup cache warmup finished"
        );
    }

    let app = vendops_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
