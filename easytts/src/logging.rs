//! ログ初期化
//!
//! `EASYTTS_LOG_LEVEL`（旧名 `RUST_LOG`）で EnvFilter を指定する。
//! CLI の `-v` 指定時は環境変数より詳細なレベルを優先する。

use crate::config::get_env_with_fallback;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 既定のログレベル
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// `-v` の回数からフィルタ文字列を決める
pub fn filter_for_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

/// 環境変数からログを初期化する
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_with_verbosity(0)
}

/// `-v` 指定を考慮してログを初期化する
pub fn init_with_verbosity(verbose: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match filter_for_verbosity(verbose) {
        Some(level) => level.to_string(),
        None => get_env_with_fallback("EASYTTS_LOG_LEVEL", "RUST_LOG")
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
    };
    let filter = EnvFilter::try_new(&filter)?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()?;
    Ok(())
}
