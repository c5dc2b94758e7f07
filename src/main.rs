use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursepay::config::Config;
use coursepay::db::{AppState, create_pool, init_db, queries};
use coursepay::handlers;
use coursepay::models::{CreateAgent, CreateCourse, CreateUser, UpsertReferralSettings};
use coursepay::payments::RazorpayClient;
use coursepay::sweep::spawn_expiry_sweep;

#[derive(Parser, Debug)]
#[command(name = "coursepay")]
#[command(about = "Payment verification and referral settlement for an online course marketplace")]
struct Cli {
    /// Seed the database with dev data (courses, users, agent, referral settings)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with dev data for testing.
/// Creates: referral settings, two courses, a sales agent, and a referrer/referred user pair.
/// Only runs in dev mode and when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    // Check if already seeded (any users exist)
    let count = queries::count_users(&conn).expect("Failed to count users");
    if count > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV DATA");
    tracing::info!("============================================");

    // 1. Referral settings: 100 INR cashback, no referral cap
    let settings = queries::upsert_referral_settings(
        &conn,
        &UpsertReferralSettings {
            cashback_amount: 10_000,
            max_referrals: 0,
        },
    )
    .expect("Failed to seed referral settings");

    tracing::info!(
        "Referral settings: cashback {} paise, max referrals {} (0 = unlimited)",
        settings.cashback_amount,
        settings.max_referrals
    );
    tracing::info!("");

    // 2. Courses
    let rust_course = queries::create_course(
        &conn,
        &CreateCourse {
            title: "Rust for Backend Engineers".to_string(),
            description: Some("Build production HTTP services in Rust".to_string()),
            price: 499_900,
            duration_days: 365,
        },
    )
    .expect("Failed to seed course");

    let sql_course = queries::create_course(
        &conn,
        &CreateCourse {
            title: "Practical SQL".to_string(),
            description: None,
            price: 199_900,
            duration_days: 180,
        },
    )
    .expect("Failed to seed course");

    tracing::info!("Course: {} (id: {})", rust_course.title, rust_course.id);
    tracing::info!("Course: {} (id: {})", sql_course.title, sql_course.id);
    tracing::info!("");

    // 3. Sales agent
    let agent = queries::create_agent(
        &conn,
        &CreateAgent {
            name: "Dev Agent".to_string(),
            agent_code: "AGENT100".to_string(),
        },
    )
    .expect("Failed to seed agent");

    tracing::info!("Agent: {} (code: {})", agent.name, agent.agent_code);
    tracing::info!("");

    // 4. Referrer and referred user
    let referrer = queries::create_user(
        &conn,
        &CreateUser {
            name: "Dev Referrer".to_string(),
            email: "referrer@coursepay.local".to_string(),
            referred_by: None,
        },
    )
    .expect("Failed to seed referrer");

    let referred = queries::create_user(
        &conn,
        &CreateUser {
            name: "Dev Student".to_string(),
            email: "student@coursepay.local".to_string(),
            referred_by: Some(referrer.id.clone()),
        },
    )
    .expect("Failed to seed referred user");

    tracing::info!("User: {} (id: {})", referrer.email, referrer.id);
    tracing::info!(
        "User: {} (id: {}, referred by {})",
        referred.email,
        referred.id,
        referrer.id
    );
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursepay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if !config.dev_mode && config.has_placeholder_keys() {
        tracing::warn!(
            "Razorpay keys are not configured; order creation will fail against the live API"
        );
    }

    // Create database connection pool
    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");

    // Initialize database schema
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        razorpay: RazorpayClient::new(&config.razorpay_key_id, &config.razorpay_key_secret),
    };

    // Seed dev data if --seed flag is passed (only in dev mode)
    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set COURSEPAY_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    // Start background task that marks lapsed purchases as expired
    spawn_expiry_sweep(state.clone());

    // Build the application router
    let app = Router::new()
        // Payment endpoints (order creation, gateway callback verification)
        .merge(handlers::payments::router())
        // Back-office endpoints (catalog, users, agents, referral settings)
        .merge(handlers::admin::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    // Track if we should clean up on exit
    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Coursepay server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    // Cleanup on exit if ephemeral mode
    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        // Also remove WAL and SHM files if they exist
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
        tracing::info!("Ephemeral cleanup complete");
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
