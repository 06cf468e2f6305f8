//! Entity Store for Asset Depot
//!
//! Every operation runs inside one [`UnitOfWork`] opened by
//! [`EntityStore::begin`] for a specific actor. Writes become visible only
//! on [`UnitOfWork::commit`]; dropping a unit of work rolls it back.
//!
//! Two backends implement the contract:
//! - [`PgStore`]: PostgreSQL via sqlx, one transaction per unit of work
//! - [`MemoryStore`]: in-process tables for tests and single-process runs

mod memory;
mod postgres;
mod store;

pub use memory::MemoryStore;
pub use postgres::{PgStore, MIGRATOR};
pub use store::{EntityStore, StoreResult, UnitOfWork};
