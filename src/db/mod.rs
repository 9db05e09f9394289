mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::email::Notifier;
use crate::payments::PaymentGateway;

pub type DbPool = Pool<SqliteConnectionManager>;

/// How long a connection waits on SQLite's write lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Where the gateway redirects buyers after checkout
    pub callback_url: String,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    /// Key Paystack signs webhooks with. Deliveries are rejected when unset.
    pub webhook_secret: Option<String>,
    /// Delete the buyer account on `transfer.failed` instead of only failing the payment
    pub purge_user_on_transfer_failed: bool,
}

/// Build a pool whose connections enforce foreign keys and wait on the write lock.
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")
    });
    Pool::builder().max_size(10).build(manager)
}
