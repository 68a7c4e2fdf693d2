pub mod commands;
pub mod contracts;
pub mod error;
pub mod migrations;
pub mod schedule;
pub mod setup;
pub mod state;
pub mod store;

pub use commands::common::CommandOptions;
pub use contracts::envelope::{FailureEnvelope, SuccessEnvelope};
pub use error::{ClientError, ClientResult};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");
