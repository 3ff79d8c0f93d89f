use anyhow::Context;
use bookshelf::Application;
use bookshelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "bookshelf bootstrap starting"
    );

    let app = Application::bootstrap(settings).await?;
    app.serve().await
}
