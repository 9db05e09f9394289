use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursepay::config::Config;
use coursepay::db::{AppState, create_pool, init_db, queries};
use coursepay::email::EmailService;
use coursepay::error::Result;
use coursepay::handlers;
use coursepay::models::{CourseCategory, CreateCourse, CreateUser, Role};
use coursepay::payments::PaystackClient;

#[derive(Parser, Debug)]
#[command(name = "coursepay")]
#[command(about = "Course purchases reconciled against payment gateway webhooks")]
struct Cli {
    /// Seed the database with dev data (admin, buyer, two courses)
    #[arg(long)]
    seed: bool,
}

fn bootstrap_first_admin(state: &AppState, email: &str) -> Result<()> {
    let conn = state.db.get()?;

    if queries::count_users(&conn)? > 0 {
        tracing::info!("Users already exist, skipping bootstrap");
        return Ok(());
    }

    let (admin, api_key) = queries::create_user(
        &conn,
        &CreateUser {
            email: email.to_string(),
            name: "Bootstrap Admin".to_string(),
            role: Role::SuperAdmin,
        },
    )?;

    tracing::info!("============================================");
    tracing::info!("BOOTSTRAP ADMIN CREATED");
    tracing::info!("Email: {}", admin.email);
    tracing::info!("API Key: {}", api_key);
    tracing::info!("============================================");
    tracing::info!("SAVE THIS API KEY - IT WILL NOT BE SHOWN AGAIN");
    tracing::info!("============================================");
    Ok(())
}

/// Seeds an admin, a buyer and two courses. Only runs in dev mode on an empty database.
fn seed_dev_data(state: &AppState) -> Result<()> {
    let conn = state.db.get()?;

    if queries::count_users(&conn)? > 0 {
        tracing::info!("Database already has data, skipping seed");
        return Ok(());
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV DATA");
    tracing::info!("============================================");

    let (admin, admin_key) = queries::create_user(
        &conn,
        &CreateUser {
            email: "admin@coursepay.local".to_string(),
            name: "Dev Admin".to_string(),
            role: Role::Admin,
        },
    )?;
    tracing::info!("Admin: {} ({})", admin.email, admin.id);

    let (buyer, buyer_key) = queries::create_user(
        &conn,
        &CreateUser {
            email: "buyer@coursepay.local".to_string(),
            name: "Dev Buyer".to_string(),
            role: Role::User,
        },
    )?;
    tracing::info!("Buyer: {} ({})", buyer.email, buyer.id);

    let video = queries::create_course(
        &conn,
        &CreateCourse {
            title: "Rust for Backend Developers".to_string(),
            price: 1_500_000,
            category: CourseCategory::Video,
        },
    )?;
    let book = queries::create_course(
        &conn,
        &CreateCourse {
            title: "Payments in Practice".to_string(),
            price: 750_000,
            category: CourseCategory::Book,
        },
    )?;
    tracing::info!("Courses: {} ({}), {} ({})", video.title, video.id, book.title, book.id);

    tracing::info!("============================================");
    tracing::info!("DEV DATA SEEDED SUCCESSFULLY");
    tracing::info!("============================================");

    println!();
    println!("--- COPY FROM HERE ---");
    println!("  admin_api_key: {}", admin_key);
    println!("  buyer_api_key: {}", buyer_key);
    println!("  buyer_id: {}", buyer.id);
    println!("  video_course_id: {}", video.id);
    println!("  book_course_id: {}", book.id);
    println!("--- END COPY ---");
    println!();
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursepay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let gateway = PaystackClient::new(
        &config.paystack_secret_key,
        &config.paystack_base_url,
        config.http_timeout,
    )
    .expect("Failed to create Paystack client");

    let email_service = EmailService::new(
        config.resend_api_key.clone(),
        config.email_webhook_url.clone(),
        config.email_from.clone(),
        config.http_timeout,
    )
    .expect("Failed to create email service");
    tracing::info!("Welcome email delivery: {}", email_service.mode());

    if config.paystack_webhook_secret.is_none() {
        tracing::warn!("No Paystack signing key configured, webhook deliveries will be rejected");
    }
    if config.purge_user_on_transfer_failed {
        tracing::info!("transfer.failed deletes the buyer account and payment");
    }

    let state = AppState {
        db: db_pool,
        callback_url: config.paystack_callback_url.clone(),
        gateway: Arc::new(gateway),
        notifier: Arc::new(email_service),
        webhook_secret: config.paystack_webhook_secret.clone(),
        purge_user_on_transfer_failed: config.purge_user_on_transfer_failed,
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set COURSEPAY_ENV=dev)");
        } else if let Err(e) = seed_dev_data(&state) {
            tracing::error!("Failed to seed dev data: {}", e);
        }
    }

    if let Some(ref email) = config.bootstrap_admin_email
        && let Err(e) = bootstrap_first_admin(&state, email)
    {
        tracing::error!("Failed to bootstrap admin: {}", e);
    }

    let app = handlers::router(state.clone())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Listening on {} (public URL {})", addr, config.base_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
