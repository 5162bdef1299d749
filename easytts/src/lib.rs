//! EasyTTS client
//!
//! Gradio でホストされた TTS UI を複数エンドポイントのプールとして扱うクライアント

#![warn(missing_docs)]

/// 共通型定義（エラー型）
pub mod common;

/// ドメイン型（エンドポイント、合成リクエスト・結果）
pub mod types;

/// 設定管理（環境変数ヘルパー、TOML 設定ファイル）
pub mod config;

/// ロギング初期化ユーティリティ
pub mod logging;

/// キュー長の問い合わせ
pub mod health;

/// エンドポイント選択
pub mod balancer;

/// Gradio キュー API クライアント
pub mod client;

/// 選択済みエンドポイントでの合成呼び出し
pub mod invoker;

/// エンドポイントプール（選択・フェイルオーバー）
pub mod pool;

/// 音声データユーティリティ
pub mod audio;

/// テキスト整形・文分割
pub mod text;

/// 声とプリセットの解決
pub mod voice;

/// `/eztts` コマンド解析
pub mod command;

/// 読み上げフロー（長文フォールバック、確率ゲート）
pub mod speech;

/// モデルパックの取り込み
pub mod modelpack;

/// CLI
pub mod cli;
