use cart_buddy::{
    config::{database, venue},
    core::{
        report::{fleet_summary, format_fleet_summary, overdue_carts},
        time::TimeService,
    },
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the venue configuration
    let venue_config = venue::load_default_config()
        .inspect_err(|e| error!("Failed to load venue configuration: {}", e))?;
    let zone = venue_config.zone()?;
    let time = TimeService::system(zone);
    info!("Venue time zone is {}", zone);

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed the fleet on first run
    venue::seed_fleet(&db, &venue_config)
        .await
        .inspect_err(|e| error!("Failed to seed fleet: {}", e))?;

    // 6. Report the state of the fleet
    let summary = fleet_summary(&db, &time).await?;
    info!("{}", format_fleet_summary(&summary));
    for cart in overdue_carts(&db, &time).await? {
        if let Some(deadline) = cart.return_by_time {
            warn!(
                "Cart {} was due back at {}",
                cart.cart_number,
                time.to_zone(deadline).format("%Y-%m-%d %H:%M %Z")
            );
        }
    }

    Ok(())
}
