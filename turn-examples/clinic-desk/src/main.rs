use anyhow::Result;
use turn_queue::observability::{init_tracing, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = clinic_desk::config::load();
    let snapshot = config.snapshot();
    let settings = clinic_desk::DeskSettings::from_snapshot(&snapshot);

    init_tracing("info,turn_queue=debug", LogFormat::parse(&settings.log_format));

    println!(
        "[clinic-desk] {} / {}: {} patients, {} min each",
        settings.organization_id, settings.service_id, settings.clients, settings.wait_minutes
    );

    clinic_desk::run(&snapshot, &settings).await
}
