//! Connection management.

pub mod pragmas;
mod write_connection;

pub use write_connection::WriteConnection;
