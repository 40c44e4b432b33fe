use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use yumstepper_core::{Database, LedgerServices};

#[derive(Parser, Debug)]
#[command(name = "yumstepper")]
#[command(author, version, about = "YUMstepper - loyalty points ledger operator tool")]
struct Args {
    /// Postgres connection URL. Falls back to DATABASE_URL (a .env file is honored).
    #[arg(long)]
    db_url: Option<String>,

    /// Upper bound on pooled Postgres connections.
    #[arg(long, default_value_t = yumstepper_core::db::DEFAULT_MAX_CONNECTIONS)]
    max_connections: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending schema migrations and exit.
    Migrate,

    /// Current spendable balance of a user.
    Balance {
        #[arg(long)]
        user: Uuid,
    },

    /// Merged step/check-in/redemption feed, newest first.
    History {
        #[arg(long)]
        user: Uuid,
    },

    /// Credit every pending check-in of a user.
    ProcessCheckins {
        #[arg(long)]
        user: Uuid,
    },

    /// Record one day of steps.
    Steps {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        count: i64,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Grant a reward to a user.
    Grant {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        reward: Uuid,
    },

    /// Redeem a previously granted reward.
    Redeem {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        grant: Uuid,
    },
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_log::LogTracer::init().context("installing log bridge")?;

    let filter = EnvFilter::from_default_env()
        .add_directive("yumstepper=info".parse().unwrap_or_default())
        .add_directive("yumstepper_core=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).with_writer(std::io::stderr).finish();
    tracing::subscriber::set_global_default(sub).context("setting global subscriber")?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("yumstepper failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let db_url = match args.db_url {
        Some(url) => url,
        None => std::env::var("DATABASE_URL")
            .context("no --db-url given and DATABASE_URL is not set")?,
    };

    let db = Database::with_max_connections(&db_url, args.max_connections).await?;
    db.migrate().await?;

    let services = LedgerServices::new(&db);

    match args.command {
        Command::Migrate => {
            info!("Schema is up to date.");
        }
        Command::Balance { user } => {
            let points = services.users.balance(user).await?;
            print_json(&serde_json::json!({ "user_id": user, "points_earned": points }))?;
        }
        Command::History { user } => {
            print_json(&services.history.point_history(user).await?)?;
        }
        Command::ProcessCheckins { user } => {
            print_json(&services.accrual.process_pending_checkins(user).await?)?;
        }
        Command::Steps { user, count, date } => {
            print_json(&services.accrual.record_steps(user, count, date).await?)?;
        }
        Command::Grant { user, reward } => {
            print_json(&services.redemption.grant(user, reward).await?)?;
        }
        Command::Redeem { user, grant } => {
            print_json(&services.redemption.redeem(user, grant).await?)?;
        }
    }

    Ok(())
}
