pub mod budget;
pub mod date;
pub mod model;
pub mod policy;
pub mod recurrence;
pub mod scheduler;
pub mod validator;
