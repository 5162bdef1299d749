//! `/eztts` コマンドの解析
//!
//! 書式: `/eztts <テキスト> [-v <キャラクター[:プリセット]>] [-e <感情>]`

use once_cell::sync::Lazy;
use regex::Regex;

static COMMAND_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/eztts\s+(?P<text>.+?)(?:\s+-v\s+(?P<voice>\S+))?(?:\s+-e\s+(?P<emotion>\S+))?$")
        .expect("valid regex")
});

/// コマンドのヘルプ
pub const COMMAND_HELP: &str = "用法：/eztts <文本> [-v 角色:预设] [-e 情绪]";

/// 解析済みコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakCommand {
    /// 読み上げテキスト
    pub text: String,
    /// `-v` の値
    pub voice: Option<String>,
    /// `-e` の値
    pub emotion: Option<String>,
}

/// メッセージを解析する。コマンドでなければ `None`
pub fn parse_command(message: &str) -> Option<SpeakCommand> {
    let caps = COMMAND_PATTERN.captures(message.trim())?;
    let text = caps.name("text")?.as_str().trim().to_string();
    if text.is_empty() {
        return None;
    }
    Some(SpeakCommand {
        text,
        voice: caps.name("voice").map(|m| m.as_str().to_string()),
        emotion: caps.name("emotion").map(|m| m.as_str().to_string()),
    })
}
