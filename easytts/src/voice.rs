//! 声（キャラクター・プリセット）の解決
//!
//! `voice` 引数は `"キャラクター:プリセット"` または `"キャラクター"`。
//! プリセットが明示されていなければ、感情からプリセットを引く。

use crate::config::{CharacterConfig, EasyttsSection, EmotionPresetMap};

/// 同義の感情（設定に無いときの補完）
const SYNONYMS: &[(&str, &[&str])] = &[("伤心", &["难过", "悲伤"]), ("开心", &["高兴", "兴奋"])];

/// `parse_voice` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSpec {
    /// キャラクター
    pub character: String,
    /// プリセット
    pub preset: String,
    /// プリセットが明示されたか（明示なら感情で上書きしない）
    pub explicit_preset: bool,
}

impl VoiceSpec {
    /// `character:preset`
    pub fn voice_info(&self) -> String {
        format!("{}:{}", self.character, self.preset)
    }
}

/// 設定に基づいて声を解決する
#[derive(Debug, Clone)]
pub struct VoiceResolver {
    default_character: String,
    default_preset: String,
    characters: Vec<CharacterConfig>,
    emotion_map: EmotionPresetMap,
}

impl VoiceResolver {
    /// `[easytts]` セクションから作成
    pub fn from_section(section: &EasyttsSection) -> Self {
        Self {
            default_character: section.default_character.clone(),
            default_preset: section.default_preset.clone(),
            characters: section.characters.clone(),
            emotion_map: section.emotion_preset_map.clone(),
        }
    }

    /// `voice` 引数を分解する
    pub fn parse_voice(&self, voice: Option<&str>) -> VoiceSpec {
        let raw = voice.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return VoiceSpec {
                character: self.default_character.clone(),
                preset: self.default_preset.clone(),
                explicit_preset: false,
            };
        }

        match raw.split_once(':') {
            Some((character, preset)) => {
                let pick = |value: &str, fallback: &str| {
                    let value = value.trim();
                    if value.is_empty() {
                        fallback.to_string()
                    } else {
                        value.to_string()
                    }
                };
                VoiceSpec {
                    character: pick(character, &self.default_character),
                    preset: pick(preset, &self.default_preset),
                    explicit_preset: true,
                }
            }
            None => VoiceSpec {
                character: raw.to_string(),
                preset: self.default_preset.clone(),
                explicit_preset: false,
            },
        }
    }

    fn character_map(&self, character: &str) -> Option<&EmotionPresetMap> {
        self.characters
            .iter()
            .find(|c| c.name.trim() == character)
            .map(|c| &c.emotion_preset_map)
    }

    /// 感情からプリセットを決める
    ///
    /// キャラクター別の設定、全体の設定、同義語の順に引く。
    /// 明示プリセットや空の感情なら `spec.preset` のまま。
    pub fn resolve_preset(&self, spec: &VoiceSpec, emotion: Option<&str>) -> String {
        let emotion = emotion.map(str::trim).unwrap_or_default();
        if emotion.is_empty() || spec.explicit_preset {
            return spec.preset.clone();
        }

        if let Some(preset) = self
            .character_map(&spec.character)
            .and_then(|map| map.get(emotion))
        {
            return preset.to_string();
        }
        if let Some(preset) = self.emotion_map.get(emotion) {
            return preset.to_string();
        }
        for (canonical, aliases) in SYNONYMS {
            if aliases.contains(&emotion) {
                if let Some(preset) = self.emotion_map.get(canonical) {
                    return preset.to_string();
                }
            }
        }
        spec.preset.clone()
    }

    /// `voice` と感情から最終的な声を決める
    pub fn resolve(&self, voice: Option<&str>, emotion: Option<&str>) -> VoiceSpec {
        let mut spec = self.parse_voice(voice);
        spec.preset = self.resolve_preset(&spec, emotion);
        spec
    }
}
