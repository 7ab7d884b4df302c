pub mod connection;
pub mod endpoints;
pub mod export_credentials;
