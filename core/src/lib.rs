//! BankSight core: the banking desk's store, ledger and maintenance layer.

pub mod clock;
pub mod command;
pub mod config;
pub mod crud;
pub mod desk;
pub mod entity;
pub mod error;
pub mod event;
pub mod ledger;
pub mod lookup;
pub mod report;
pub mod rng;
pub mod seed;
pub mod store;
pub mod types;
