//! queue/data（SSE）の解析と出力音声の選択

use serde_json::Value;

/// 完了イベントの `msg`
pub const PROCESS_COMPLETED: &str = "process_completed";

/// チャンク境界をまたぐ行を組み立てるバッファ
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// 新しいバッファ
    pub fn new() -> Self {
        Self::default()
    }

    /// チャンクを追加し、完成した行を返す（改行は除去済み）
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        }
        lines
    }

    /// ストリーム終端で残った行
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

/// `data:` 行のJSONを取り出す。それ以外の行は `None`
pub fn parse_data_line(line: &str) -> Option<Result<Value, serde_json::Error>> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    Some(serde_json::from_str(payload))
}

/// 完了イベントなら `output.data` を返す
///
/// - 完了以外: `None`
/// - `success: false` やエラー付き、空の `output.data`: `Some(Err(理由))`
pub fn completed_output(event: &Value) -> Option<Result<Vec<Value>, String>> {
    if event.get("msg").and_then(Value::as_str) != Some(PROCESS_COMPLETED) {
        return None;
    }

    if event.get("success").and_then(Value::as_bool) == Some(false) {
        let detail = event
            .get("output")
            .and_then(|o| o.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("remote reported failure");
        return Some(Err(format!("process_completed with success=false: {detail}")));
    }

    let data = event
        .get("output")
        .and_then(|o| o.get("data"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if data.is_empty() {
        return Some(Err("process_completed but output.data is empty".to_string()));
    }
    Some(Ok(data))
}

fn score(haystack: &str) -> i32 {
    let mut score = 0;
    if haystack.contains("genie_") {
        score += 10;
    }
    if haystack.to_lowercase().contains(".wav") {
        score += 2;
    }
    if haystack.contains("/tmp/gradio") {
        score += 1;
    }
    score
}

fn describe(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => Some(
            ["orig_name", "path", "url"]
                .iter()
                .map(|k| map.get(*k).and_then(Value::as_str).unwrap_or(""))
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => None,
    }
}

/// 出力一覧から音声らしい要素を選ぶ
///
/// 同点なら後ろの要素。採点できる要素が無ければ末尾。
pub fn pick_output_audio(out: &[Value]) -> Option<&Value> {
    let mut best: Option<(i32, usize)> = None;
    for (idx, item) in out.iter().enumerate() {
        let Some(text) = describe(item) else {
            continue;
        };
        let s = score(&text);
        match best {
            Some((best_score, _)) if s < best_score => {}
            _ => best = Some((s, idx)),
        }
    }
    match best {
        Some((_, idx)) => out.get(idx),
        None => out.last(),
    }
}

/// リモート側の出力音声
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAudio {
    /// ダウンロードURL（絶対URL）
    pub audio_url: String,
    /// サーバー上のパス
    pub file_path: Option<String>,
    /// 元のファイル名
    pub orig_name: Option<String>,
}

/// 選ばれた要素からダウンロードURLを組み立てる
pub fn resolve_audio(base_url: &str, picked: &Value) -> Result<RemoteAudio, String> {
    let (url, file_path, orig_name) = match picked {
        Value::String(s) => (Some(s.clone()), None, None),
        Value::Object(map) => {
            let text = |k: &str| {
                map.get(k)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
            };
            let path = text("path");
            let url = text("url").or_else(|| {
                path.as_deref().and_then(|p| {
                    if p.starts_with("/tmp/") {
                        Some(format!("{base_url}/gradio_api/file={p}"))
                    } else if p.starts_with('/') {
                        Some(p.to_string())
                    } else {
                        None
                    }
                })
            });
            (url, path, text("orig_name"))
        }
        other => return Err(format!("unexpected output item: {other}")),
    };

    let url = url.ok_or_else(|| "no audio URL returned from queue/data".to_string())?;
    let audio_url = if url.starts_with('/') {
        format!("{base_url}{url}")
    } else {
        url
    };
    Ok(RemoteAudio {
        audio_url,
        file_path,
        orig_name,
    })
}
