pub mod config;
pub mod downloader;
pub mod server;
pub mod session;

pub use config::Config;
pub use server::{router, serve, AppState};
