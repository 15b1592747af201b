/// Delete form links that were revoked or expired long ago, with their responses.
/// Run daily (e.g., via cron job: 0 3 * * * /app/prune-links)
///
/// Usage: prune-links [--older-than-days N] [--dry-run]
use clap::Parser;

use mealplan_api::{db, services::form_links::FormLinkService};

#[derive(Parser)]
#[command(name = "prune-links", about = "Prune dead form links from the meal planner database")]
struct Args {
    /// Only links revoked or expired more than this many days ago
    #[arg(long, default_value_t = 30)]
    older_than_days: i64,

    /// Count matching links without deleting them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    if args.older_than_days < 0 {
        anyhow::bail!("--older-than-days must not be negative");
    }

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;
    let pool = db::create_pool(&database_url).await?;

    tracing::info!(
        "Pruning form links dead for more than {} days{}",
        args.older_than_days,
        if args.dry_run { " (dry run)" } else { "" }
    );
    let count = FormLinkService::prune(&pool, args.older_than_days, args.dry_run).await?;

    if args.dry_run {
        tracing::info!("{count} form links would be deleted");
    } else {
        tracing::info!("Deleted {count} form links");
    }
    Ok(())
}
