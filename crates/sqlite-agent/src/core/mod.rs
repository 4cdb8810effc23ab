pub mod classify;
pub mod connect;
pub mod executor;
pub mod metadata;
pub mod schema;
pub mod splitter;
pub mod types;
