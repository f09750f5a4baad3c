pub mod query_def;
pub mod query_definitions;

pub use query_def::QueryDef;
pub use query_definitions::QueryDefinitions;
