pub mod config;
pub mod errors;
pub mod models;
pub mod remote;
pub mod services;
pub mod storage;

/// `log::info!` 等がターミナルに出るようロガーを初期化する
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
