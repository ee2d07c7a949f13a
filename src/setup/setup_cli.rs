use agency_portal::config::Config;
use agency_portal::helper::account_helpers::{normalize_email, MIN_PASSWORD_LEN};
use agency_portal::models::db_operations::identity_db_operations;
use agency_portal::models::AdminRole;
use agency_portal::setup::{db_setup, demo_seed};
use bcrypt::{hash, DEFAULT_COST};
use clap::{Parser, Subcommand};
use rand::RngCore;
use redb::Database;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "portal_setup", author, version, about = "A CLI for initial portal setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file. Not needed for `secret generate`.
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Creates the identity and/or content database. Safe to re-run.
    Setup {
        /// `identity` or `content`; both when omitted.
        db_type: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "admin")]
        role: AdminRole,
    },
    List,
    ChangePassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        new_password: String,
    },
}

#[derive(Subcommand, Debug)]
enum SecretAction {
    /// Prints a fresh TOKEN_SECRET value.
    Generate,
}

#[derive(Subcommand, Debug)]
enum SeedAction {
    /// Inserts the demo client with sample materials, campaigns and documents.
    Demo,
}

fn main() {
    let cli = Cli::parse();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Commands::Secret { action: SecretAction::Generate } = &cli.command {
        generate_secret();
        return;
    }

    let env_file = match &cli.env_file {
        Some(path) => path,
        None => {
            eprintln!("❌ Error: --env-file <FILE> is required for this command.");
            std::process::exit(2);
        }
    };
    let config = Config::from_env(env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup { db_type } => match db_type.as_deref() {
                Some("identity") => setup_identity_database(&config),
                Some("content") => setup_content_database(&config),
                Some(other) => eprintln!("❌ Error: Unknown database type '{}'. Use 'identity' or 'content'.", other),
                None => {
                    setup_identity_database(&config);
                    setup_content_database(&config);
                }
            },
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { name, email, password, role } => {
                create_admin_user(&config, name, email, password, *role);
            }
            AdminAction::List => list_admin_users(&config),
            AdminAction::ChangePassword { email, new_password } => {
                change_admin_password(&config, email, new_password);
            }
        },
        Commands::Seed { action: SeedAction::Demo } => seed_demo_data(&config),
        Commands::Secret { .. } => {}
    }
}

fn generate_secret() {
    let mut bytes = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut bytes);
    println!("TOKEN_SECRET={}", hex::encode(bytes));
}

fn setup_identity_database(config: &Config) {
    let db_path = config.identity_db_path();
    println!("\nSetting up identity database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let mut conn = Connection::open(&db_path).expect("Could not open identity database file.");
    match db_setup::setup_identity_db(&mut conn) {
        Ok(_) => println!("✅ Identity database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up identity database: {}", e),
    }
}

fn setup_content_database(config: &Config) {
    let db_path = config.content_db_path();
    println!("\nSetting up content database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let db = Database::create(&db_path).expect("Failed to create content database file.");
    match db_setup::setup_content_db(&db) {
        Ok(_) => println!("✅ Content database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up content database: {}", e),
    }
}

fn open_identity(config: &Config) -> Option<Connection> {
    let db_path = config.identity_db_path();
    if !db_path.exists() {
        eprintln!("❌ Error: Identity database not found at '{}'. Please run `portal_setup db setup` first.", db_path.display());
        return None;
    }
    match Connection::open(&db_path) {
        Ok(conn) => Some(conn),
        Err(e) => {
            eprintln!("❌ Error opening identity database: {}", e);
            None
        }
    }
}

fn create_admin_user(config: &Config, name: &str, email: &str, password: &str, role: AdminRole) {
    let Some(conn) = open_identity(config) else { return };
    let email = match normalize_email(email) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            return;
        }
    };
    if password.chars().count() < MIN_PASSWORD_LEN {
        eprintln!("❌ Error: Password must be at least {} characters.", MIN_PASSWORD_LEN);
        return;
    }

    let hashed_password = hash(password, DEFAULT_COST).expect("Failed to hash password");
    match identity_db_operations::create_admin(&conn, name.trim(), &email, &hashed_password, role) {
        Ok(admin) => println!("✅ Admin '{}' <{}> created with role '{}'.", admin.name, admin.email, admin.role),
        Err(e) => eprintln!("❌ Error creating admin user: {}", e),
    }
}

fn list_admin_users(config: &Config) {
    let Some(conn) = open_identity(config) else { return };
    match identity_db_operations::read_all_admins(&conn) {
        Ok(admins) => {
            println!("Listing Admin Users:");
            for admin in admins {
                println!("- {} <{}> ({})", admin.name, admin.email, admin.role);
            }
        }
        Err(e) => eprintln!("❌ Error fetching admins: {}", e),
    }
}

fn change_admin_password(config: &Config, email: &str, new_password: &str) {
    let Some(conn) = open_identity(config) else { return };
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        eprintln!("❌ Error: Password must be at least {} characters.", MIN_PASSWORD_LEN);
        return;
    }
    let email = email.trim().to_lowercase();
    let hashed_password = hash(new_password, DEFAULT_COST).expect("Failed to hash new password");
    match identity_db_operations::update_admin_password(&conn, &email, &hashed_password) {
        Ok(0) => eprintln!("❌ Error: No admin user with email '{}' found.", email),
        Ok(_) => println!("✅ Password for admin '{}' changed successfully.", email),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}

fn seed_demo_data(config: &Config) {
    let Some(conn) = open_identity(config) else { return };
    let content = match Database::open(config.content_db_path()) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            eprintln!("❌ Error opening content database: {}. Please run `portal_setup db setup` first.", e);
            return;
        }
    };

    match demo_seed::seed_demo(&conn, content) {
        Ok(report) if report.created => println!(
            "✅ Demo client {} seeded ({} / {}).",
            report.client_id, demo_seed::DEMO_EMAIL, demo_seed::DEMO_PASSWORD
        ),
        Ok(report) => println!("ℹ️ Demo client already exists ({}). Nothing to do.", report.client_id),
        Err(e) => eprintln!("❌ Error seeding demo data: {}", e),
    }
}
