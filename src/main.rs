use anyhow::Context;
use waitlist::configuration::get_configuration;
use waitlist::startup::Application;
use waitlist::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing `.env` is fine, the variables may come from the actual environment.
    dotenvy::dotenv().ok();

    let subscriber = get_subscriber("waitlist".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    // Refuse to start without MONGO_DB_URL and MONGO_DB_NAME.
    let configuration = get_configuration().context("Failed to read configuration")?;
    let application = Application::build(configuration)
        .await
        .context("Failed to start the application")?;

    tracing::info!(port = application.port(), "Accepting waitlist registrations");
    application.run_until_stopped().await?;

    Ok(())
}
