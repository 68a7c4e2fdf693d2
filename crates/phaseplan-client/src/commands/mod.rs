pub mod budget;
pub mod common;
pub mod phase;
pub mod project;
pub mod recurring;
pub mod rule;
