mod client;
mod config;
mod device_repository;
mod in_predicate;

pub use client::*;
pub use config::*;
pub use device_repository::*;
pub use in_predicate::*;
