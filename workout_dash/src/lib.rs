pub mod aggregate;
pub mod bucket;
pub mod cli;
pub mod config;
pub mod data;
pub mod defaults;
pub mod filter;
pub mod group;
pub mod ingest;
pub mod reporting;
pub mod session;
pub mod stats;
pub mod summary;
