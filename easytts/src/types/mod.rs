//! 型定義モジュール
//!
//! ドメインエンティティの型定義を提供

/// エンドポイント関連の型定義
pub mod endpoint;

/// 合成リクエスト・結果の型定義
pub mod synthesis;

pub use endpoint::{Endpoint, EndpointConfig, EndpointStatus, QueueState};
pub use synthesis::{ReferenceAudio, ReferenceMode, SynthesisRequest, SynthesisResult};
