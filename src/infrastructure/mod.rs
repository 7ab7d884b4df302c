pub mod config;
pub mod db;
pub mod github;
pub mod ingest;
pub mod llm_clients;
pub mod response;
pub mod security;
