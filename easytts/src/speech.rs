//! 読み上げフロー
//!
//! テキストを整形・分割し、エンドポイントプール経由で1文ずつ合成する。
//! 長すぎるテキストや確率ゲートで外れた場合は音声化せずテキストのまま返す。

use crate::common::error::{TtsError, TtsResult};
use crate::config::{ConfigFile, GeneralSection, ProbabilitySection};
use crate::pool::PoolCoordinator;
use crate::text::{clean_text, split_by_marker, split_sentences, DEFAULT_MIN_SENTENCE_LENGTH, SPLIT_MARKER};
use crate::types::synthesis::{SynthesisRequest, SynthesisResult};
use crate::voice::VoiceResolver;
use rand::RngExt;
use tracing::{info, warn};

/// テキストで返した理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// 文字数上限を超えた
    TooLong {
        /// 文字数
        length: usize,
        /// 上限
        max: usize,
    },
    /// 確率ゲートで外れた
    ProbabilitySkipped,
}

/// 読み上げ結果
#[derive(Debug, Clone)]
pub enum SpeechOutcome {
    /// 音声で返す
    Voice {
        /// 使った `character:preset`
        voice_info: String,
        /// 成功した区間の音声（順序どおり）
        segments: Vec<SynthesisResult>,
        /// 分割後の区間数
        total: usize,
    },
    /// テキストで返す
    TextFallback {
        /// 返すテキスト
        text: String,
        /// 理由
        reason: FallbackReason,
    },
}

impl SpeechOutcome {
    /// 失敗した区間数
    pub fn failed_segments(&self) -> usize {
        match self {
            Self::Voice { segments, total, .. } => total.saturating_sub(segments.len()),
            Self::TextFallback { .. } => 0,
        }
    }
}

/// 読み上げサービス
#[derive(Clone)]
pub struct SpeechService {
    pool: PoolCoordinator,
    voices: VoiceResolver,
    general: GeneralSection,
    probability: ProbabilitySection,
    remote_split: bool,
}

impl SpeechService {
    /// 設定ファイルから作成
    pub fn new(pool: PoolCoordinator, config: &ConfigFile) -> Self {
        Self {
            pool,
            voices: VoiceResolver::from_section(&config.easytts),
            general: config.general.clone(),
            probability: config.probability.clone(),
            remote_split: config.easytts.remote_split_sentence,
        }
    }

    /// 声の解決器
    pub fn voices(&self) -> &VoiceResolver {
        &self.voices
    }

    /// 強制キーワードを含むか
    pub fn is_force_triggered(&self, text: &str) -> bool {
        self.probability.keyword_force_trigger
            && self
                .probability
                .force_keywords
                .iter()
                .any(|kw| !kw.is_empty() && text.contains(kw.as_str()))
    }

    /// 音声で返すかを決める
    pub fn should_use_voice(&self, text: &str) -> bool {
        let roll = rand::rng().random_range(0.0..1.0);
        self.should_use_voice_with(text, roll)
    }

    /// `roll`（0.0〜1.0）を与えて判定する
    pub fn should_use_voice_with(&self, text: &str, roll: f64) -> bool {
        if self.is_force_triggered(text) || !self.probability.enabled {
            return true;
        }
        let probability = self.probability.base_probability.clamp(0.0, 1.0);
        let passed = roll < probability;
        info!(probability, passed, "Probability check");
        passed
    }

    /// 合成する区間に分ける
    pub fn segments(&self, text: &str) -> Vec<String> {
        if text.contains(SPLIT_MARKER) {
            return split_by_marker(text);
        }
        if self.general.split_sentences {
            return split_sentences(text, DEFAULT_MIN_SENTENCE_LENGTH);
        }
        vec![text.to_string()]
    }

    /// 確率ゲートを通してから読み上げる
    pub async fn respond(
        &self,
        text: &str,
        voice: Option<&str>,
        emotion: Option<&str>,
    ) -> TtsResult<SpeechOutcome> {
        if !self.should_use_voice(text) {
            return Ok(SpeechOutcome::TextFallback {
                text: clean_text(text),
                reason: FallbackReason::ProbabilitySkipped,
            });
        }
        self.speak(text, voice, emotion).await
    }

    /// 読み上げる
    ///
    /// 一部の区間が失敗しても、1つでも成功すれば `Voice` を返す。
    /// 全区間が失敗したら最後のエラーを返す。
    pub async fn speak(
        &self,
        text: &str,
        voice: Option<&str>,
        emotion: Option<&str>,
    ) -> TtsResult<SpeechOutcome> {
        let text = clean_text(text);
        if text.is_empty() {
            return Err(TtsError::InputValidation("text is empty after cleaning".to_string()));
        }

        let length = text.chars().count();
        if length > self.general.max_text_length {
            warn!(length, max = self.general.max_text_length, "Text too long, falling back to text");
            return Ok(SpeechOutcome::TextFallback {
                text,
                reason: FallbackReason::TooLong {
                    length,
                    max: self.general.max_text_length,
                },
            });
        }

        let spec = self.voices.resolve(voice, emotion);
        let voice_info = spec.voice_info();
        let segments = self.segments(&text);
        let total = segments.len();
        if total > 1 {
            info!(total, voice = %voice_info, "Speaking in segments");
        }

        let delay = self.general.split_delay();
        let mut results = Vec::with_capacity(total);
        let mut last_error = None;
        for (i, segment) in segments.iter().enumerate() {
            let request = SynthesisRequest::preset(segment.as_str(), &spec.character, &spec.preset)
                .with_split_sentence(self.remote_split);
            match self.pool.synthesize(&request).await {
                Ok(result) => results.push(result),
                Err(e) if matches!(e, TtsError::InputValidation(_)) => return Err(e),
                Err(e) => {
                    warn!(segment = i + 1, total, error = %e, "Segment synthesis failed");
                    last_error = Some(e);
                }
            }
            if i + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        if results.is_empty() {
            return Err(last_error
                .unwrap_or_else(|| TtsError::InputValidation("nothing to synthesize".to_string())));
        }
        info!(
            succeeded = results.len(),
            total,
            voice = %voice_info,
            "Speech completed"
        );
        Ok(SpeechOutcome::Voice {
            voice_info,
            segments: results,
            total,
        })
    }
}
