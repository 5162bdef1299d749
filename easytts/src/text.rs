//! テキスト前処理

/// 明示的な分割マーカー
pub const SPLIT_MARKER: &str = "|||SPLIT|||";

/// 文末とみなす記号
const SENTENCE_DELIMITERS: &[char] = &['。', '！', '!', '？', '?', '；', ';'];

/// 短すぎる断片を前の文へ結合するしきい値（文字数）
pub const DEFAULT_MIN_SENTENCE_LENGTH: usize = 2;

/// 前後の空白を除去する
pub fn clean_text(text: &str) -> String {
    text.trim().to_string()
}

/// 文末記号で分割する
///
/// 記号は直前の文に付く。`min_length` 文字未満の断片は前の文に結合する。
pub fn split_sentences(text: &str, min_length: usize) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_delimiter = false;

    fn flush(current: &mut String, sentences: &mut Vec<String>) {
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }
        current.clear();
    }

    for c in text.chars() {
        let is_delimiter = SENTENCE_DELIMITERS.contains(&c);
        if prev_delimiter && !is_delimiter {
            flush(&mut current, &mut sentences);
        }
        current.push(c);
        prev_delimiter = is_delimiter;
    }
    flush(&mut current, &mut sentences);

    if min_length == 0 || sentences.len() <= 1 {
        return sentences;
    }

    let mut merged: Vec<String> = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        match merged.last_mut() {
            Some(last) if sentence.chars().count() < min_length => last.push_str(&sentence),
            _ => merged.push(sentence),
        }
    }
    merged
}

/// `|||SPLIT|||` で分割する（空の断片は捨てる）
pub fn split_by_marker(text: &str) -> Vec<String> {
    text.split(SPLIT_MARKER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// 文字種から言語を推定する（`zh` / `ja` / `en`）
pub fn detect_language(text: &str) -> &'static str {
    let (mut chinese, mut japanese, mut english) = (0usize, 0usize, 0usize);
    for c in text.chars() {
        match c {
            '\u{4e00}'..='\u{9fff}' => chinese += 1,
            '\u{3040}'..='\u{30ff}' => japanese += 1,
            'a'..='z' | 'A'..='Z' => english += 1,
            _ => {}
        }
    }

    let total = (chinese + japanese + english) as f64;
    if total == 0.0 {
        return "zh";
    }
    if chinese as f64 / total > 0.3 {
        "zh"
    } else if japanese as f64 / total > 0.3 {
        "ja"
    } else if english as f64 / total > 0.8 {
        "en"
    } else {
        "zh"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_after_delimiters() {
        assert_eq!(
            split_sentences("你好。今天天气不错！要出去吗？", 2),
            vec!["你好。", "今天天气不错！", "要出去吗？"]
        );
    }

    #[test]
    fn consecutive_delimiters_stay_together() {
        assert_eq!(split_sentences("真的吗？！好吧。", 2), vec!["真的吗？！", "好吧。"]);
    }

    #[test]
    fn short_fragments_merge_into_previous() {
        assert_eq!(split_sentences("好的。嗯", 2), vec!["好的。嗯"]);
        assert_eq!(split_sentences("好的。嗯", 0), vec!["好的。", "嗯"]);
    }

    #[test]
    fn leading_short_fragment_is_kept() {
        assert_eq!(split_sentences("。你好", 2), vec!["。", "你好"]);
    }

    #[test]
    fn empty_text() {
        assert!(split_sentences("   ", 2).is_empty());
        assert!(split_by_marker("").is_empty());
    }

    #[test]
    fn marker_split() {
        assert_eq!(
            split_by_marker("第一段|||SPLIT||| 第二段 |||SPLIT|||"),
            vec!["第一段", "第二段"]
        );
    }

    #[test]
    fn language_detection() {
        assert_eq!(detect_language("今天天气不错"), "zh");
        assert_eq!(detect_language("こんにちは"), "ja");
        assert_eq!(detect_language("hello world"), "en");
        assert_eq!(detect_language("12345"), "zh");
    }
}
