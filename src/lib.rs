pub mod config;
pub mod dataset;
pub mod device;
pub mod iic;
pub mod ssd;

/// Logs at info level unless RUST_LOG says otherwise
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
