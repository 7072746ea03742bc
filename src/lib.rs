pub mod catalog;
pub mod config;
pub mod config_parser;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod pricing;
pub mod reports;
pub mod storage;
pub mod ticket;

pub use self::config::*;
pub use config_parser::*;
pub use domain::*;
pub use error::*;
pub use ledger::*;
pub use metrics::*;
pub use pricing::*;
pub use storage::*;
pub use ticket::*;
