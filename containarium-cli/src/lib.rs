pub mod cert;
pub mod client;
pub mod error;
pub mod recover;
pub mod service;

pub use client::ApiClient;
pub use error::CliError;
