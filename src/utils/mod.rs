pub mod json;
pub mod query;
pub mod time;
