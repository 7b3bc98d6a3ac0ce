//! # Repository Module
//!
//! Database repository implementations for Comptoir.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  CartManager / CheckoutOrchestrator / FulfillmentFinalizer             │
//! │       │                                                                 │
//! │       │  db.orders().finalize_paid(&order_id, &payment, &invoice, now) │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── insert_draft(&self, draft)                                        │
//! │  ├── get_details(&self, id)                                            │
//! │  ├── cancel_pending(&self, id, now)                                    │
//! │  └── finalize_paid(&self, id, payment, invoice, now)                   │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog reads and stock
//! - [`carrier::CarrierRepository`] - Shipping options
//! - [`address::AddressRepository`] - Customer address book
//! - [`user::UserRepository`] - Customer accounts
//! - [`order::OrderRepository`] - Orders, payments, invoices
//! - [`session::SessionRepository`] - Per-visitor key/value state

pub mod address;
pub mod carrier;
pub mod order;
pub mod product;
pub mod session;
pub mod user;
