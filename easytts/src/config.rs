//! Configuration management
//!
//! 設定は起動時に一度だけ読み込み、以降は不変の `PoolConfig` として
//! `Arc` 経由で共有する。読み込み元は次の2つ。
//!
//! - TOML 設定ファイル（`[easytts]` / `[general]` / `[probability]`）
//! - 環境変数（`EASYTTS_*`、単一エンドポイント構成）

use crate::common::error::{CommonError, TtsError, TtsResult};
use crate::types::endpoint::{Endpoint, EndpointConfig, DEFAULT_FN_INDEX, DEFAULT_TRIGGER_ID};
use crate::types::synthesis::{DEFAULT_CHARACTER, DEFAULT_PRESET};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 既定のリモートUIベースURL
pub const DEFAULT_BASE_URL: &str = "https://yunchenqwq-easytts.ms.show";

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Returns `default` if neither is set or parsing fails.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// リモート呼び出しのタイムアウト
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// queue/status（プローブ）
    pub status: Duration,
    /// queue/join
    pub join: Duration,
    /// queue/data（SSE 結果待ち）
    pub sse: Duration,
    /// 音声ダウンロード
    pub download: Duration,
    /// 参照音声アップロード
    pub upload: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            status: Duration::from_secs(3),
            join: Duration::from_secs(30),
            sse: Duration::from_secs(300),
            download: Duration::from_secs(120),
            upload: Duration::from_secs(120),
        }
    }
}

impl Timeouts {
    /// Load timeouts from environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        let secs = |name: &str, old: &str, default: Duration| {
            Duration::from_secs(get_env_with_fallback_parse(name, old, default.as_secs()))
        };
        Self {
            status: secs("EASYTTS_STATUS_TIMEOUT_SECS", "EASYTTS_STATUS_TIMEOUT", d.status),
            join: secs("EASYTTS_JOIN_TIMEOUT_SECS", "EASYTTS_JOIN_TIMEOUT", d.join),
            sse: secs("EASYTTS_SSE_TIMEOUT_SECS", "EASYTTS_SSE_TIMEOUT", d.sse),
            download: secs(
                "EASYTTS_DOWNLOAD_TIMEOUT_SECS",
                "EASYTTS_DOWNLOAD_TIMEOUT",
                d.download,
            ),
            upload: secs("EASYTTS_UPLOAD_TIMEOUT_SECS", "EASYTTS_UPLOAD_TIMEOUT", d.upload),
        }
    }
}

/// 感情→プリセットのマッピング
///
/// 設定上は `{感情 = "プリセット"}` のテーブルと
/// `[{emotion = "...", preset = "..."}]` の配列の両方を受け付ける。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEmotionMap")]
pub struct EmotionPresetMap(pub BTreeMap<String, String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEmotionMap {
    Table(BTreeMap<String, String>),
    List(Vec<EmotionEntry>),
}

#[derive(Deserialize)]
struct EmotionEntry {
    #[serde(default)]
    emotion: String,
    #[serde(default)]
    preset: String,
}

impl From<RawEmotionMap> for EmotionPresetMap {
    fn from(raw: RawEmotionMap) -> Self {
        let pairs: Vec<(String, String)> = match raw {
            RawEmotionMap::Table(map) => map.into_iter().collect(),
            RawEmotionMap::List(list) => list.into_iter().map(|e| (e.emotion, e.preset)).collect(),
        };
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                .collect(),
        )
    }
}

impl EmotionPresetMap {
    /// 感情に対応するプリセット
    pub fn get(&self, emotion: &str) -> Option<&str> {
        self.0.get(emotion).map(String::as_str)
    }

    /// 感情が登録されているか
    pub fn contains(&self, emotion: &str) -> bool {
        self.0.contains_key(emotion)
    }

    /// 空か
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for EmotionPresetMap {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

fn default_emotion_map() -> EmotionPresetMap {
    EmotionPresetMap::from([
        ("普通", "普通"),
        ("开心", "开心"),
        ("伤心", "伤心"),
        ("生气", "生气"),
    ])
}

/// キャラクター設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterConfig {
    /// キャラクター名
    pub name: String,
    /// 利用可能なプリセット
    #[serde(default)]
    pub presets: Vec<String>,
    /// キャラクター固有の感情マッピング（全体設定より優先）
    #[serde(default)]
    pub emotion_preset_map: EmotionPresetMap,
}

fn default_character() -> String {
    DEFAULT_CHARACTER.to_string()
}

fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}

fn default_characters() -> Vec<CharacterConfig> {
    vec![CharacterConfig {
        name: DEFAULT_CHARACTER.to_string(),
        presets: ["普通", "开心", "伤心", "生气"]
            .iter()
            .map(ToString::to_string)
            .collect(),
        emotion_preset_map: EmotionPresetMap::default(),
    }]
}

fn default_true() -> bool {
    true
}

fn default_status_timeout() -> u64 {
    3
}

fn default_join_timeout() -> u64 {
    30
}

fn default_sse_timeout() -> u64 {
    300
}

fn default_download_timeout() -> u64 {
    120
}

/// `[easytts]` セクション
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EasyttsSection {
    /// エンドポイント（記述順がタイブレーク順）
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
    /// 既定キャラクター
    #[serde(default = "default_character")]
    pub default_character: String,
    /// 既定プリセット
    #[serde(default = "default_preset")]
    pub default_preset: String,
    /// キャラクター一覧
    #[serde(default = "default_characters")]
    pub characters: Vec<CharacterConfig>,
    /// 全体の感情マッピング
    #[serde(default = "default_emotion_map")]
    pub emotion_preset_map: EmotionPresetMap,
    /// リモート側でも文分割するか
    #[serde(default = "default_true")]
    pub remote_split_sentence: bool,
    /// 空いているエンドポイントを優先するか（診断表示用の並び順）
    #[serde(default = "default_true")]
    pub prefer_idle_endpoint: bool,
    /// これを超えるキューサイズを「混雑」とみなす
    #[serde(default)]
    pub busy_queue_threshold: u32,
    /// queue/status タイムアウト（秒）
    #[serde(default = "default_status_timeout")]
    pub status_timeout: u64,
    /// queue/join タイムアウト（秒）
    #[serde(default = "default_join_timeout")]
    pub join_timeout: u64,
    /// queue/data タイムアウト（秒）
    #[serde(default = "default_sse_timeout")]
    pub sse_timeout: u64,
    /// ダウンロードタイムアウト（秒）
    #[serde(default = "default_download_timeout")]
    pub download_timeout: u64,
    /// システムプロキシ設定を継承するか
    #[serde(default)]
    pub trust_env: bool,
}

impl Default for EasyttsSection {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            default_character: default_character(),
            default_preset: default_preset(),
            characters: default_characters(),
            emotion_preset_map: default_emotion_map(),
            remote_split_sentence: true,
            prefer_idle_endpoint: true,
            busy_queue_threshold: 0,
            status_timeout: default_status_timeout(),
            join_timeout: default_join_timeout(),
            sse_timeout: default_sse_timeout(),
            download_timeout: default_download_timeout(),
            trust_env: false,
        }
    }
}

impl EasyttsSection {
    /// タイムアウト設定（0 は既定値に置き換える）
    pub fn timeouts(&self) -> Timeouts {
        let d = Timeouts::default();
        let pick = |secs: u64, fallback: Duration| {
            if secs == 0 {
                fallback
            } else {
                Duration::from_secs(secs)
            }
        };
        Timeouts {
            status: pick(self.status_timeout, d.status),
            join: pick(self.join_timeout, d.join),
            sse: pick(self.sse_timeout, d.sse),
            download: pick(self.download_timeout, d.download),
            upload: d.upload,
        }
    }
}

fn default_max_text_length() -> usize {
    200
}

fn default_split_delay() -> f64 {
    0.3
}

/// `[general]` セクション
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSection {
    /// これを超える文字数は音声化せずテキストで返す
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// 句読点で分割して1文ずつ合成するか
    #[serde(default = "default_true")]
    pub split_sentences: bool,
    /// 分割送信の間隔（秒）
    #[serde(default = "default_split_delay")]
    pub split_delay: f64,
    /// 音声出力先ディレクトリ
    #[serde(default)]
    pub audio_output_dir: Option<PathBuf>,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            max_text_length: default_max_text_length(),
            split_sentences: true,
            split_delay: default_split_delay(),
            audio_output_dir: None,
        }
    }
}

impl GeneralSection {
    /// 分割送信の間隔
    ///
    /// 負数・NaN・表現できない大きさの値は 0 とみなす。
    pub fn split_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.split_delay).unwrap_or(Duration::ZERO)
    }
}

fn default_probability() -> f64 {
    1.0
}

fn default_force_keywords() -> Vec<String> {
    ["一定要用语音", "必须语音", "语音回复"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// `[probability]` セクション
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilitySection {
    /// 確率制御を有効にするか
    #[serde(default)]
    pub enabled: bool,
    /// 音声で応答する確率（0.0〜1.0）
    #[serde(default = "default_probability")]
    pub base_probability: f64,
    /// キーワードで強制的に音声化するか
    #[serde(default = "default_true")]
    pub keyword_force_trigger: bool,
    /// 強制キーワード
    #[serde(default = "default_force_keywords")]
    pub force_keywords: Vec<String>,
}

impl Default for ProbabilitySection {
    fn default() -> Self {
        Self {
            enabled: false,
            base_probability: default_probability(),
            keyword_force_trigger: true,
            force_keywords: default_force_keywords(),
        }
    }
}

/// 設定ファイル全体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// リモートUIとエンドポイントプール
    #[serde(default)]
    pub easytts: EasyttsSection,
    /// 共通設定
    #[serde(default)]
    pub general: GeneralSection,
    /// 確率制御
    #[serde(default)]
    pub probability: ProbabilitySection,
}

impl ConfigFile {
    /// 既定の設定ファイルパス
    ///
    /// `EASYTTS_CONFIG` があればそれを、なければカレントの `config.toml`。
    pub fn default_path() -> PathBuf {
        get_env_with_fallback("EASYTTS_CONFIG", "EASYTTS_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Parse from TOML text
    pub fn parse(content: &str) -> TtsResult<Self> {
        let config: Self = toml::from_str(content).map_err(CommonError::from)?;
        Ok(config)
    }

    /// Load from a specific path
    pub fn load(path: &Path) -> TtsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TtsError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// 設定ファイルがあれば読み込み、なければ環境変数から単一エンドポイントを構成する
    ///
    /// 環境変数のみの場合はタイムアウトとプロキシ設定も環境変数から読む。
    pub fn load_or_env(path: Option<&Path>) -> TtsResult<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);
        if path.exists() {
            return Self::load(&path);
        }
        tracing::debug!(path = %path.display(), "Config file not found, using environment");
        let mut config = Self::default();
        config.easytts.endpoints = vec![endpoint_from_env()?];
        let timeouts = Timeouts::from_env();
        config.easytts.status_timeout = timeouts.status.as_secs();
        config.easytts.join_timeout = timeouts.join.as_secs();
        config.easytts.sse_timeout = timeouts.sse.as_secs();
        config.easytts.download_timeout = timeouts.download.as_secs();
        config.easytts.trust_env = trust_env_from_env();
        Ok(config)
    }
}

/// 環境変数から単一エンドポイントを構成する
///
/// - `EASYTTS_STUDIO_TOKEN`（必須）
/// - `EASYTTS_BASE_URL`（既定: `DEFAULT_BASE_URL`）
/// - `EASYTTS_FN_INDEX`（既定: 3）
/// - `EASYTTS_TRIGGER_ID`（既定: 19）
pub fn endpoint_from_env() -> TtsResult<EndpointConfig> {
    let base_url = get_env_with_fallback_or("EASYTTS_BASE_URL", "EASYTTS_URL", DEFAULT_BASE_URL);
    let studio_token =
        get_env_with_fallback("EASYTTS_STUDIO_TOKEN", "EASYTTS_TOKEN").unwrap_or_default();
    if studio_token.trim().is_empty() {
        return Err(TtsError::config(
            "missing studio token: set EASYTTS_STUDIO_TOKEN or provide a config file",
        ));
    }
    let fn_index = get_env_with_fallback_parse("EASYTTS_FN_INDEX", "FN_INDEX", DEFAULT_FN_INDEX);
    let trigger_id =
        get_env_with_fallback_parse("EASYTTS_TRIGGER_ID", "TRIGGER_ID", DEFAULT_TRIGGER_ID);

    Ok(EndpointConfig::new(base_url, studio_token)
        .with_name("default")
        .with_call_site(fn_index, trigger_id))
}

/// 検証済み・不変のプール設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// 記述順のエンドポイント
    pub endpoints: Vec<Endpoint>,
    /// タイムアウト
    pub timeouts: Timeouts,
    /// 空きエンドポイント優先の並び順
    pub prefer_idle: bool,
    /// 混雑判定のしきい値
    pub busy_threshold: u32,
    /// システムプロキシを継承するか
    pub trust_env: bool,
}

impl PoolConfig {
    /// エンドポイント一覧から作成（タイムアウトは既定値）
    pub fn new(endpoints: Vec<Endpoint>) -> TtsResult<Self> {
        let config = Self {
            endpoints,
            timeouts: Timeouts::default(),
            prefer_idle: true,
            busy_threshold: 0,
            trust_env: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Builder-style setter for timeouts
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// `[easytts]` セクションから作成
    pub fn from_section(section: &EasyttsSection) -> TtsResult<Self> {
        let endpoints: Vec<Endpoint> = section
            .endpoints
            .iter()
            .enumerate()
            .filter_map(|(idx, cfg)| cfg.normalize(idx))
            .collect();

        let config = Self {
            endpoints,
            timeouts: section.timeouts(),
            prefer_idle: section.prefer_idle_endpoint,
            busy_threshold: section.busy_queue_threshold,
            trust_env: section.trust_env,
        };
        config.validate()?;
        Ok(config)
    }

    /// 設定を検証する
    ///
    /// 失敗は ConfigurationError として即座に返し、再試行しない。
    pub fn validate(&self) -> TtsResult<()> {
        if self.endpoints.is_empty() {
            return Err(TtsError::config(
                "easytts.endpoints is empty; configure at least one endpoint",
            ));
        }
        for ep in &self.endpoints {
            if ep.base_url.is_empty() || ep.studio_token.is_empty() {
                return Err(TtsError::config(format!(
                    "endpoint '{}': base_url and studio_token must not be empty",
                    ep.name
                )));
            }
        }
        let mut names: Vec<&str> = self.endpoints.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(TtsError::config(format!(
                "duplicate endpoint name '{}'",
                dup[0]
            )));
        }
        Ok(())
    }

    /// 名前でエンドポイントを探す
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

/// `EASYTTS_TRUST_ENV` を読む（既定 false）
pub fn trust_env_from_env() -> bool {
    get_env_with_fallback("EASYTTS_TRUST_ENV", "TRUST_ENV")
        .map(|v| parse_bool(&v))
        .unwrap_or(false)
}
