//! ロードバランサーモジュール
//!
//! プローブ結果からキュー長が最小のエンドポイントを選ぶ。
//! 到達不能なエンドポイントは最後尾に回すのではなく候補から除外する。

use crate::types::endpoint::{Endpoint, EndpointStatus};
use serde::Serialize;

/// 選択ラウンドの結果から1つ選ぶ
///
/// - 応答したエンドポイントのうちキュー長最小
/// - 同値なら設定順で先のもの
/// - 応答ゼロなら `None`（呼び出し側で PoolExhausted）
///
/// プローブの完了順には依存しない（`statuses` は設定順であること）。
pub fn select_endpoint<'a>(statuses: &[EndpointStatus<'a>]) -> Option<&'a Endpoint> {
    statuses
        .iter()
        .filter_map(|s| s.queue.queue_size().map(|q| (q, s.endpoint)))
        .min_by_key(|(q, _)| *q)
        .map(|(_, ep)| ep)
}

/// 診断表示用の並び順ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankPolicy {
    /// 空いている順に並べるか（false なら設定順）
    pub prefer_idle: bool,
    /// これを超えるキュー長を混雑とみなす
    pub busy_threshold: u32,
}

impl Default for RankPolicy {
    fn default() -> Self {
        Self {
            prefer_idle: true,
            busy_threshold: 0,
        }
    }
}

/// 並び替え済みのエンドポイント
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEndpoint<'a> {
    /// 対象エンドポイント名
    pub name: &'a str,
    /// ベースURL
    pub base_url: &'a str,
    /// キュー長
    pub queue_size: u32,
    /// しきい値を超えているか
    pub busy: bool,
}

/// 応答したエンドポイントを並べる
///
/// `prefer_idle` が有効なら (キュー長, 設定順) の昇順。先頭は常に
/// `select_endpoint` と一致する。到達不能なものは含めない。
pub fn rank_endpoints<'a>(
    statuses: &[EndpointStatus<'a>],
    policy: RankPolicy,
) -> Vec<RankedEndpoint<'a>> {
    let mut ranked: Vec<RankedEndpoint<'a>> = statuses
        .iter()
        .filter_map(|s| {
            let queue_size = s.queue.queue_size()?;
            Some(RankedEndpoint {
                name: s.endpoint.name.as_str(),
                base_url: s.endpoint.base_url.as_str(),
                queue_size,
                busy: queue_size > policy.busy_threshold,
            })
        })
        .collect();

    if policy.prefer_idle {
        // stable sort なので同値は設定順のまま
        ranked.sort_by_key(|r| r.queue_size);
    }
    ranked
}
