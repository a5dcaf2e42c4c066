mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{CountingPacer, MockReddit, RecordingObserver, comment, more, submission};
use tracker_social::reddit::ApiError;
use tracker_social::{CollectError, Collector, DELETED_AUTHOR, NoDelay};

struct Harness {
    api: Arc<MockReddit>,
    pacer: Arc<CountingPacer>,
    observer: Arc<RecordingObserver>,
    collector: Collector,
}

async fn harness(api: MockReddit) -> Harness {
    let api = Arc::new(api);
    let pacer = Arc::new(CountingPacer::default());
    let observer = Arc::new(RecordingObserver::default());
    let collector = Collector::with_api(api.clone(), pacer.clone(), observer.clone())
        .await
        .expect("identity check passes");
    Harness {
        api,
        pacer,
        observer,
        collector,
    }
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|i| id(i).to_string()).collect()
}

#[tokio::test]
async fn top_posts_end_to_end() {
    let posts = ["p1", "p2", "p3", "p4", "p5"]
        .iter()
        .map(|id| submission(id, "Python"))
        .collect();
    let h = harness(MockReddit::with_posts(posts)).await;

    let got = h.collector.fetch_top_posts("Python", 5, "day").await;

    assert_eq!(ids(&got, |p| &p.id), ["p1", "p2", "p3", "p4", "p5"]);
    assert_eq!(h.pacer.waits(), 5);
    assert_eq!(h.api.calls(), ["identity", "top:Python:day:5"]);
    assert_eq!(
        h.observer.events(),
        ["connected:tester", "started:top_posts", "collected:top_posts:5"]
    );
}

#[tokio::test]
async fn top_posts_are_capped_at_limit() {
    let posts = (0..12).map(|i| submission(&format!("p{i}"), "rust")).collect();
    let h = harness(MockReddit::with_posts(posts)).await;

    let got = h.collector.fetch_top_posts("rust", 4, "week").await;

    assert_eq!(got.len(), 4);
    assert_eq!(h.pacer.waits(), 4);
    assert!(h.collector.fetch_top_posts("rust", 0, "week").await.is_empty());
}

#[tokio::test]
async fn failure_mid_listing_discards_everything_and_reports_once() {
    let posts = (0..5).map(|i| submission(&format!("p{i}"), "Python")).collect();
    let h = harness(MockReddit {
        fail_after: Some(2),
        ..MockReddit::with_posts(posts)
    })
    .await;

    let got = h.collector.fetch_top_posts("Python", 5, "day").await;

    assert!(got.is_empty());
    assert_eq!(h.observer.failures(), 1);
    assert!(
        !h.observer
            .events()
            .iter()
            .any(|e| e.starts_with("collected:"))
    );

    let err = h
        .collector
        .try_fetch_top_posts("Python", 5, "day")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CollectError::Remote {
            operation: "top_posts",
            source: ApiError::Remote(_)
        }
    ));
    assert_eq!(h.observer.failures(), 2);
}

#[tokio::test]
async fn zero_results_is_not_a_failure() {
    let h = harness(MockReddit::default()).await;

    let got = h.collector.try_search_posts("nothing", None, 10, "week").await;

    assert!(got.expect("empty listing is fine").is_empty());
    assert_eq!(h.observer.failures(), 0);
    assert_eq!(h.observer.events().last().unwrap(), "collected:search:0");
}

#[tokio::test]
async fn search_scopes_and_repeats_identically() {
    let posts = ["s1", "s2", "s3"]
        .iter()
        .map(|id| submission(id, "rust"))
        .collect();
    let h = harness(MockReddit::with_posts(posts)).await;

    let everywhere = h.collector.search_posts("async", None, 100, "week").await;
    let again = h.collector.search_posts("async", None, 100, "week").await;
    let scoped = h.collector.search_posts("async", Some("rust"), 2, "month").await;

    assert_eq!(everywhere, again);
    assert_eq!(ids(&everywhere, |p| &p.id), ["s1", "s2", "s3"]);
    assert_eq!(scoped.len(), 2);
    assert_eq!(
        h.api.calls()[1..],
        [
            "search:all:async:week:100",
            "search:all:async:week:100",
            "search:rust:async:month:2",
        ]
    );
}

#[tokio::test]
async fn comments_are_expanded_before_the_limit_applies() {
    let mut expansions = HashMap::new();
    expansions.insert(
        "m1".to_string(),
        vec![
            comment("b", "t3_p1", "p1"),
            comment("c", "t3_p1", "p1"),
            comment("b1", "t1_b", "p1"),
            more("m2", "t1_b", &["b2"]),
        ],
    );
    expansions.insert("m2".to_string(), vec![comment("b2", "t1_b", "p1")]);
    let h = harness(MockReddit {
        comments: vec![comment("a", "t3_p1", "p1"), more("m1", "t3_p1", &["b", "c"])],
        expansions,
        ..Default::default()
    })
    .await;

    let first_three = h.collector.fetch_comments("p1", 3).await;
    assert_eq!(ids(&first_three, |c| &c.id), ["a", "b", "c"]);
    assert_eq!(h.pacer.waits(), 3);
    assert!(h.api.calls().contains(&"more:t3_p1:m2".to_string()));

    let all = h.collector.fetch_comments("p1", 100).await;
    assert_eq!(ids(&all, |c| &c.id), ["a", "b", "c", "b1", "b2"]);
    assert!(all.iter().all(|c| c.post_id == "p1"));
    assert_eq!(all[3].parent_id, "t1_b");
}

#[tokio::test]
async fn comment_failure_returns_empty() {
    let h = harness(MockReddit {
        fail_comments: true,
        ..Default::default()
    })
    .await;

    assert!(h.collector.fetch_comments("gone", 10).await.is_empty());
    assert_eq!(h.observer.failures(), 1);
    assert_eq!(h.pacer.waits(), 0);
}

#[tokio::test]
async fn rejected_credentials_fail_construction() {
    let observer = Arc::new(RecordingObserver::default());
    let result = Collector::with_api(
        Arc::new(MockReddit {
            reject_identity: true,
            ..Default::default()
        }),
        Arc::new(NoDelay),
        observer.clone(),
    )
    .await;

    assert!(matches!(result, Err(CollectError::Connect(ApiError::Auth(_)))));
    assert_eq!(observer.events(), ["connection_failed"]);
}

#[tokio::test]
async fn records_are_normalized() {
    let mut ghost = submission("g", "Python");
    ghost.author = None;
    ghost.upvote_ratio = Some(1.3);
    ghost.num_comments = -1;
    let mut blank = submission("b", "Python");
    blank.author = Some(String::new());
    let h = harness(MockReddit::with_posts(vec![ghost, blank, submission("ok", "Python")])).await;

    let got = h.collector.fetch_top_posts("Python", 10, "day").await;

    assert_eq!(got.len(), 3);
    assert_eq!(got[0].author, DELETED_AUTHOR);
    assert_eq!(got[0].upvote_ratio, 1.0);
    assert_eq!(got[0].num_comments, 0);
    assert_eq!(got[1].author, DELETED_AUTHOR);
    assert!(got.iter().all(|p| !p.author.is_empty()));
    assert!(got.iter().all(|p| (0.0..=1.0).contains(&p.upvote_ratio)));
}
