use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zello::actions::registration::seed_admin;
use zello::{count_admins, open_database, Config};

#[derive(Parser)]
#[command(name = "zello", version, about = "Household finance tracker - admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database file and schema
    Init,

    /// Create the bootstrap admin account (no-op if the e-mail exists)
    SeedAdmin {
        #[arg(long, default_value = "admin@zello.com")]
        email: String,

        #[arg(long, default_value = "Administrador")]
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli.command {
        Command::Init => run_init(&config),
        Command::SeedAdmin { email, name } => run_seed_admin(&config, &name, &email),
    }
}

fn run_init(config: &Config) -> Result<()> {
    println!("🏠 Zello - Database Setup");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n🔧 Setting up database...");
    open_database(&config.database_path)
        .with_context(|| format!("failed to open {:?}", config.database_path))?;
    println!("✓ Database initialized with WAL mode: {:?}", config.database_path);

    Ok(())
}

fn run_seed_admin(config: &Config, name: &str, email: &str) -> Result<()> {
    println!("👤 Zello - Seed Admin");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = open_database(&config.database_path)
        .with_context(|| format!("failed to open {:?}", config.database_path))?;

    let (admin, created) = seed_admin(&conn, name, email).context("failed to seed admin")?;
    if created {
        println!("✓ {} created: {} <{}> (id {})", admin.role.label(), admin.name, admin.email, admin.id);
    } else {
        println!("✓ Account already exists: {} <{}> ({})", admin.name, admin.email, admin.role.label());
    }

    let admins = count_admins(&conn)?;
    println!("\n✅ {} admin(s) in the system", admins);

    Ok(())
}
