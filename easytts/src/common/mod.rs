//! 共通レイヤー
//!
//! エラー型など、各モジュールから参照される共通定義

/// エラー型
pub mod error;

pub use error::{AttemptFailure, CommonError, FailureStage, TtsError, TtsResult};
