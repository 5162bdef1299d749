//! Property-based tests using proptest

use proptest::prelude::*;

use easytts::balancer::{rank_endpoints, select_endpoint, RankPolicy};
use easytts::modelpack::safe_name;
use easytts::text::{split_by_marker, split_sentences};
use easytts::types::endpoint::{Endpoint, EndpointStatus};

fn endpoints(n: usize) -> Vec<Endpoint> {
    (0..n)
        .map(|i| Endpoint::new(format!("ep-{i}"), format!("http://ep-{i}"), "token"))
        .collect()
}

/// None は到達不能
fn statuses<'a>(eps: &'a [Endpoint], queues: &[Option<u32>]) -> Vec<EndpointStatus<'a>> {
    eps.iter()
        .zip(queues)
        .map(|(ep, q)| match q {
            Some(size) => EndpointStatus::available(ep, *size),
            None => EndpointStatus::unreachable(ep, "timeout"),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// select_endpoint
// ---------------------------------------------------------------------------

proptest! {
    /// 選ばれるのは応答したものの最小キュー、同値なら設定順で最初
    #[test]
    fn selects_first_minimum_responder(
        queues in prop::collection::vec(prop::option::of(0u32..5), 1..8),
    ) {
        let eps = endpoints(queues.len());
        let st = statuses(&eps, &queues);
        let expected = queues
            .iter()
            .enumerate()
            .filter_map(|(i, q)| q.map(|size| (size, i)))
            .min()
            .map(|(_, i)| eps[i].name.clone());
        prop_assert_eq!(select_endpoint(&st).map(|e| e.name.clone()), expected);
    }

    /// 到達不能なものは選ばれない
    #[test]
    fn unreachable_is_never_selected(
        queues in prop::collection::vec(prop::option::of(0u32..100), 1..8),
    ) {
        let eps = endpoints(queues.len());
        let st = statuses(&eps, &queues);
        if let Some(selected) = select_endpoint(&st) {
            let idx = eps.iter().position(|e| e.name == selected.name).unwrap();
            prop_assert!(queues[idx].is_some());
        } else {
            prop_assert!(queues.iter().all(Option::is_none));
        }
    }

    /// prefer_idle の先頭は常に select_endpoint と一致し、到達不能なものは含まない
    #[test]
    fn ranking_head_matches_selection(
        queues in prop::collection::vec(prop::option::of(0u32..5), 1..8),
        threshold in 0u32..5,
    ) {
        let eps = endpoints(queues.len());
        let st = statuses(&eps, &queues);
        let ranked = rank_endpoints(&st, RankPolicy { prefer_idle: true, busy_threshold: threshold });

        prop_assert_eq!(ranked.len(), queues.iter().filter(|q| q.is_some()).count());
        prop_assert_eq!(
            ranked.first().map(|r| r.name),
            select_endpoint(&st).map(|e| e.name.as_str())
        );
        prop_assert!(ranked.windows(2).all(|w| w[0].queue_size <= w[1].queue_size));
        prop_assert!(ranked.iter().all(|r| r.busy == (r.queue_size > threshold)));
    }
}

// ---------------------------------------------------------------------------
// text / names
// ---------------------------------------------------------------------------

proptest! {
    /// 文分割は空白以外の文字を失わない
    #[test]
    fn sentence_split_keeps_content(text in "[a-z你好。！？ ]{0,40}") {
        let joined: String = split_sentences(&text, 2).concat();
        let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        prop_assert_eq!(strip(&joined), strip(&text));
    }

    /// マーカー分割の結果は空にならない
    #[test]
    fn marker_split_has_no_empty_parts(text in "[a-z ]{0,10}(\\|\\|\\|SPLIT\\|\\|\\|[a-z ]{0,10}){0,3}") {
        prop_assert!(split_by_marker(&text).iter().all(|s| !s.trim().is_empty()));
    }

    /// safe_name は常に空でなく、許可された文字だけを含む
    #[test]
    fn safe_name_is_filesystem_safe(name in ".{0,30}") {
        let safe = safe_name(&name);
        prop_assert!(!safe.is_empty());
        prop_assert!(safe.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_'));
        prop_assert!(!safe.starts_with('_') && !safe.ends_with('_'));
    }
}
