//! Database bootstrap and table schemas

pub mod init;
pub mod schema;
pub mod table_schemas;

pub use init::*;
pub use schema::*;
pub use table_schemas::*;
