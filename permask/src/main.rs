use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use permask_core::{
    bootstrap::{init_database, init_services, load_config, run_migrations, seed_catalog, Services},
    logging,
    models::{Actor, ScopeKey},
};
use sqlx::PgPool;

#[derive(Parser, Debug)]
#[command(name = "permask")]
#[command(about = "Permission mask maintenance", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending database migrations
    Migrate,

    /// Seed the permission catalog and the system roles
    Seed,

    /// Print the resolved value of a permission
    Check {
        slug: String,

        /// User ID (anonymous when omitted)
        #[arg(long)]
        user: Option<String>,

        /// Board URI (global when omitted)
        #[arg(long)]
        board: Option<String>,

        /// Resolve through the unaccountable route
        #[arg(long)]
        unaccountable: bool,
    },

    /// List the boards where a permission holds
    Boards {
        slug: String,

        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        unaccountable: bool,
    },

    /// Forget the cached masks of one actor
    Forget {
        /// User ID (anonymous when omitted)
        #[arg(long)]
        user: Option<String>,
    },

    /// Drop every cached mask
    Flush,
}

fn actor(user: Option<String>, unaccountable: bool) -> Actor {
    user.map_or_else(Actor::anonymous, Actor::registered)
        .with_accountable(!unaccountable)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config()?;
    logging::init_logging(&config.logging)?;

    let pool = init_database(&config).await?;
    let services = init_services(pool.clone(), &config).await?;

    run(&pool, &services, args.command).await
}

async fn run(pool: &PgPool, services: &Services, command: Command) -> Result<()> {
    match command {
        Command::Migrate => run_migrations(pool).await?,
        Command::Seed => {
            let report = seed_catalog(services.roles.as_ref(), services.permissions.as_ref()).await?;
            if report.changed_roles() {
                services.cache.forget_all().await?;
            }
            println!(
                "inserted {} permission(s), {} group(s), created roles: [{}]",
                report.permissions_inserted,
                report.groups,
                report.roles_created.join(", ")
            );
        }
        Command::Check {
            slug,
            user,
            board,
            unaccountable,
        } => {
            let actor = actor(user, unaccountable);
            let value = match board {
                Some(board) => {
                    services
                        .permission_service
                        .permission_on(&actor, &slug, &board)
                        .await?
                }
                None => {
                    services
                        .permission_service
                        .permission(&actor, &slug, &ScopeKey::global())
                        .await?
                }
            };
            println!("{value}");
        }
        Command::Boards {
            slug,
            user,
            unaccountable,
        } => {
            let actor = actor(user, unaccountable);
            for board in services.permission_service.can_in_boards(&actor, &slug).await? {
                println!("/{board}/");
            }
        }
        Command::Forget { user } => {
            let actor = actor(user, false);
            let removed = services.permission_service.forget_permissions(&actor).await?;
            info!(removed, "Forgot cached masks");
            println!("removed {removed} cached mask(s)");
        }
        Command::Flush => {
            let removed = services.cache.forget_all().await?;
            println!("removed {removed} cached mask(s)");
        }
    }

    Ok(())
}
