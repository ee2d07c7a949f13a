use actix_cors::Cors;
use actix_web::{web, App, HttpServer, middleware::{Logger, DefaultHeaders}, http::header};
use agency_portal::{
    config::Config,
    helper::account_helpers::OwnerLock,
    helper::credential_helpers::TokenService,
    helper::workflow_helpers::ApprovalWorkflow,
    identity_pool,
    models::db_operations::materials_db_operations::RedbMaterialStore,
    routes,
};
use clap::Parser;
use redb::Database;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "portal_server", author, version, about = "Starts the client portal API server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

fn build_cors(allowed_origins: &str) -> Cors {
    let base = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    base.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let content_db = Arc::new(Database::open(config.content_db_path())
        .expect("FATAL: content.db not found. Run 'portal_setup --env-file <path> db setup'"));

    if !config.identity_db_path().exists() {
        panic!("FATAL: identity.db not found. Run 'portal_setup --env-file <path> db setup'");
    }
    let pool = identity_pool(&config.identity_db_path())
        .expect("FATAL: Failed to create Rusqlite connection pool.");

    let secret = config.token_secret_bytes()
        .expect("FATAL: TOKEN_SECRET in .env is not a valid hex string.");
    let tokens = web::Data::new(TokenService::new(&secret, chrono::Duration::hours(config.token_ttl_hours)));

    let store = RedbMaterialStore::new(Arc::clone(&content_db));
    let workflow = web::Data::new(ApprovalWorkflow::new(Arc::new(store)));
    let content_data = web::Data::from(content_db);
    let pool_data = web::Data::new(pool);
    let owners = web::Data::new(OwnerLock::new());

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
            )
            .app_data(pool_data.clone())
            .app_data(content_data.clone())
            .app_data(tokens.clone())
            .app_data(workflow.clone())
            .app_data(owners.clone())
            .configure(routes::config_api)
    })
    .bind(server_address)?
    .run()
    .await
}
