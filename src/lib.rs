//! SalesDesk core: employee sign-in, client and contact records, and
//! role-gated contact reports over a local SQLite store.
//!
//! Typical session:
//!
//! ```no_run
//! use salesdesk::{auth::Session, config, db::SalesDb, reports};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! salesdesk::init_logging();
//! let db = SalesDb::open(&config::load_config()?)?;
//! let session = Session::login(&db, "jdoe", "secret")?;
//! let filter = reports::ReportFilter::default_window(reports::today());
//! let report = reports::build_report(&db, &session, &filter)?;
//! println!("{}", report.summary);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
mod migrations;
pub mod password;
pub mod reports;

pub use auth::{authenticate, Session};
pub use db::{SalesDb, StoreError};
pub use error::UserFacingError;

/// Initialise `env_logger` once for the process. `RUST_LOG` overrides the
/// default `info` level. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .try_init();
}
