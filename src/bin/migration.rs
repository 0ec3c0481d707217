use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use return_orders::{config, db, migrator::Migrator};
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[derive(Parser)]
#[command(name = "migration", about = "Applies or inspects the return order schema", version)]
struct Cli {
    /// Defaults to `up` when omitted.
    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Apply all pending migrations
    Up,
    /// Roll back the most recent migrations
    Down {
        /// Number of migrations to roll back
        #[arg(default_value_t = 1)]
        steps: u32,
    },
    /// Show applied and pending migrations
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let action = cli.action.unwrap_or(Action::Up);

    let cfg = config::load_config().context("loading configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!(environment = %cfg.environment, action = ?action, "Starting database migration");
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("connecting to database")?;

    match action {
        Action::Up => db::run_migrations(&pool).await?,
        Action::Down { steps } => Migrator::down(&pool, Some(steps)).await?,
        Action::Status => Migrator::status(&pool).await?,
        Action::Fresh => {
            if cfg.is_production() {
                bail!("refusing to drop all tables in production");
            }
            Migrator::fresh(&pool).await?;
        }
    }

    db::close_pool(pool).await?;
    info!("Migration completed successfully");
    Ok(())
}
