//! # comptoir-db: Database Layer for Comptoir
//!
//! This crate provides database access for the storefront.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comptoir Data Flow                               │
//! │                                                                         │
//! │  comptoir-checkout (CartManager, Orchestrator, Finalizer)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   comptoir-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │   │   │
//! │  │   │               │    │ ProductRepo    │   │              │   │   │
//! │  │   │ SqlitePool    │◄───│ CarrierRepo    │   │ 001_initial  │   │   │
//! │  │   │ Connection    │    │ AddressRepo    │   │ 002_payment  │   │   │
//! │  │   │ Management    │    │ UserRepo       │   │              │   │   │
//! │  │   │               │    │ OrderRepo      │   │              │   │   │
//! │  │   │               │    │ SessionRepo    │   │              │   │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use comptoir_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("comptoir.db")).await?;
//! let carriers = db.carriers().list_active().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::address::AddressRepository;
pub use repository::carrier::CarrierRepository;
pub use repository::order::{FinalizeOutcome, OrderRepository};
pub use repository::product::ProductRepository;
pub use repository::session::{SessionRepository, CART_KEY, CHECKOUT_KEY, USER_KEY};
pub use repository::user::UserRepository;
