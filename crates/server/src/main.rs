use anyhow::Context;
use std::sync::Arc;
use tally_email::{Ingestor, MailSource, WriterPolicy};
use tally_pdf::PdfTextConverter;
use tally_receipt::ReceiptPipeline;
use tally_server::{build_router, telemetry, AppState, Config};

#[cfg(feature = "imap")]
fn mail_source() -> Arc<dyn MailSource> {
    Arc::new(tally_email::ImapSource)
}

#[cfg(not(feature = "imap"))]
fn mail_source() -> Arc<dyn MailSource> {
    Arc::new(tally_email::UnavailableSource)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;
    telemetry::init_tracing(config.log_format).context("Failed to initialize tracing")?;

    if let Some(dir) = config.database.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
    }
    let db = tally_storage::create_db(&config.database)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.display()))?;
    tracing::info!(path = %config.database.display(), "database ready");

    let pipeline = Arc::new(ReceiptPipeline::new(PdfTextConverter));
    let ingestor = Ingestor::new(mail_source(), pipeline);
    let policy = WriterPolicy {
        skip_processed_emails: config.ingest.skip_processed_emails,
    };
    let state = AppState::new(db, ingestor, policy, config.email.clone(), config.upload_limit);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "tally server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
