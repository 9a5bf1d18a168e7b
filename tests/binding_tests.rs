use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use clinic_site::binding::{Direction, LoadState, ResourceBinding};
use clinic_site::gateway::memory::{MemoryGateway, Op};
use clinic_site::gateway::{Gateway, RowId};
use clinic_site::models::{Faq, FaqDraft, Resource, Service, ServiceDraft};
use clinic_site::{Error, ErrorKind};

fn services() -> (MemoryGateway, ResourceBinding<Service>) {
    let gw = MemoryGateway::new();
    gw.seed(
        Service::TABLE,
        vec![
            json!({"title": "Eye Exam", "display_order": 1, "is_active": true}),
            json!({"title": "Glasses", "display_order": 2, "is_active": true}),
            json!({"title": "Contacts", "display_order": 3, "is_active": false}),
        ],
    )
    .unwrap();
    let gateway: Arc<dyn Gateway> = Arc::new(gw.clone());
    (gw, ResourceBinding::new(gateway))
}

fn titles(items: &[Service]) -> Vec<&str> {
    items.iter().map(|s| s.title.as_str()).collect()
}

#[tokio::test]
async fn load_returns_rows_in_display_order() {
    let (_gw, binding) = services();
    assert_eq!(binding.state().await, LoadState::Idle);

    let items = assert_ok!(binding.load().await);
    assert_eq!(titles(&items), ["Eye Exam", "Glasses", "Contacts"]);
    assert_eq!(binding.state().await, LoadState::Ready);
    assert_eq!(binding.items().await, items);
}

#[tokio::test]
async fn loading_twice_without_writes_gives_the_same_list() {
    let (_gw, binding) = services();
    let first = binding.load().await.unwrap();
    let second = binding.load().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn failed_load_keeps_the_previous_items() {
    let (gw, binding) = services();
    let before = binding.load().await.unwrap();

    gw.fail(Op::Select, Some(Service::TABLE));
    let err = assert_err!(binding.load().await);
    assert!(err.is_gateway());

    assert_eq!(binding.items().await, before);
    assert!(matches!(binding.state().await, LoadState::Errored(_)));
    assert!(binding.last_error().await.is_some());

    gw.heal();
    binding.load().await.unwrap();
    assert_eq!(binding.state().await, LoadState::Ready);
    assert_eq!(binding.last_error().await, None);
}

#[tokio::test]
async fn create_validates_then_inserts_and_reloads() {
    let (gw, binding) = services();
    binding.load().await.unwrap();

    let empty = ServiceDraft::default();
    let err = binding.create(&empty).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(gw.call_count(Op::Insert), 0);

    let draft = ServiceDraft {
        title: "LASIK Consult".to_string(),
        display_order: 4,
        ..ServiceDraft::default()
    };
    binding.create(&draft).await.unwrap();
    let items = binding.items().await;
    assert_eq!(items.len(), 4);
    assert_eq!(items.last().unwrap().title, "LASIK Consult");
}

#[tokio::test]
async fn remove_then_load_drops_the_row() {
    let (_gw, binding) = services();
    binding.load().await.unwrap();
    let id = binding.items().await[1].id.clone();

    binding.remove(&id).await.unwrap();
    assert!(binding.get(&id).await.is_none());

    let reloaded = binding.load().await.unwrap();
    assert_eq!(titles(&reloaded), ["Eye Exam", "Contacts"]);
}

#[tokio::test]
async fn update_failure_is_reported_and_list_untouched() {
    let (gw, binding) = services();
    let before = binding.load().await.unwrap();
    gw.fail(Op::Update, None);

    let id = before[0].id.clone();
    let draft = ServiceDraft::from(&before[0]);
    assert!(binding.update(&id, &draft).await.is_err());
    assert_eq!(binding.items().await, before);
    assert!(binding.last_error().await.is_some());
}

#[tokio::test]
async fn reorder_swaps_with_the_neighbour() {
    let (gw, binding) = services();
    binding.load().await.unwrap();
    let glasses = binding.items().await[1].id.clone();

    assert!(binding.reorder(&glasses, Direction::Up).await.unwrap());
    assert_eq!(titles(&binding.items().await), ["Glasses", "Eye Exam", "Contacts"]);
    assert_eq!(gw.call_count(Op::Update), 2);

    assert!(binding.reorder(&glasses, Direction::Down).await.unwrap());
    assert_eq!(titles(&binding.items().await), ["Eye Exam", "Glasses", "Contacts"]);
}

#[tokio::test]
async fn reorder_at_the_edges_does_nothing() {
    let (gw, binding) = services();
    let items = binding.load().await.unwrap();
    gw.clear_calls();

    assert!(!binding.reorder(&items[0].id, Direction::Up).await.unwrap());
    assert!(!binding.reorder(&items[2].id, Direction::Down).await.unwrap());
    assert!(!binding.reorder(&RowId::from(99), Direction::Up).await.unwrap());
    assert!(gw.calls().is_empty());
}

#[tokio::test]
async fn reorder_second_update_failure_leaves_the_first_applied() {
    let (gw, binding) = services();
    let items = binding.load().await.unwrap();
    gw.fail_after(Op::Update, Some(Service::TABLE), 1);

    let err = binding.reorder(&items[1].id, Direction::Up).await.unwrap_err();
    assert!(err.is_gateway());

    let orders: Vec<i64> = gw
        .rows(Service::TABLE)
        .iter()
        .map(|r| r["display_order"].as_i64().unwrap())
        .collect();
    assert_eq!(orders, [1, 1, 3]);
}

#[tokio::test]
async fn faq_move_up_renumbers_the_pair() {
    let gw = MemoryGateway::new();
    let gateway: Arc<dyn Gateway> = Arc::new(gw.clone());
    let faqs: ResourceBinding<Faq> = ResourceBinding::new(gateway);
    for (q, order) in [("A", 1), ("B", 2), ("C", 3)] {
        faqs.create(&FaqDraft::new(q, "answer", order)).await.unwrap();
    }
    let b = faqs.items().await[1].id.clone();

    faqs.reorder(&b, Direction::Up).await.unwrap();
    let order: Vec<(String, i32)> = faqs
        .items()
        .await
        .into_iter()
        .map(|f| (f.question, f.display_order))
        .collect();
    assert_eq!(
        order,
        [
            ("B".to_string(), 1),
            ("A".to_string(), 2),
            ("C".to_string(), 3)
        ]
    );
}

#[tokio::test]
async fn next_display_order_is_one_past_the_max() {
    let gw = MemoryGateway::new();
    let gateway: Arc<dyn Gateway> = Arc::new(gw.clone());
    let faqs: ResourceBinding<Faq> = ResourceBinding::new(gateway);
    assert_eq!(faqs.next_display_order().await, 1);

    faqs.create(&FaqDraft::new("Q", "A", 7)).await.unwrap();
    assert_eq!(faqs.next_display_order().await, 8);
}

#[tokio::test]
async fn toggle_active_flips_the_flag() {
    let (_gw, binding) = services();
    let items = binding.load().await.unwrap();
    let contacts = items[2].id.clone();

    assert!(binding.toggle_active(&contacts).await.unwrap());
    assert!(binding.get(&contacts).await.unwrap().is_active);
    assert!(!binding.toggle_active(&contacts).await.unwrap());

    let err = binding.toggle_active(&RowId::from(42)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn filtered_binding_only_sees_matching_rows() {
    let (gw, _) = services();
    let gateway: Arc<dyn Gateway> = Arc::new(gw);
    let active: ResourceBinding<Service> =
        ResourceBinding::new(gateway).with_filter("is_active", true);
    let items = active.load().await.unwrap();
    assert_eq!(titles(&items), ["Eye Exam", "Glasses"]);
}

#[tokio::test(start_paused = true)]
async fn slow_gateway_times_out() {
    let (gw, binding) = services();
    let binding = binding.with_timeout(Duration::from_secs(2));
    gw.delay(Op::Select, Duration::from_secs(10));

    let err = binding.load().await.unwrap_err();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(2)));
    assert!(err.is_gateway());
    assert!(matches!(binding.state().await, LoadState::Errored(_)));
}

#[tokio::test(start_paused = true)]
async fn close_cancels_in_flight_and_later_calls() {
    let (gw, binding) = services();
    gw.delay(Op::Select, Duration::from_secs(10));

    let pending = {
        let binding = binding.clone();
        tokio::spawn(async move { binding.load().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    binding.close();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(binding.state().await, LoadState::Idle);
    assert!(binding.items().await.is_empty());

    assert!(binding.is_closed());
    assert!(matches!(binding.load().await, Err(Error::Cancelled)));
}

#[tokio::test]
async fn live_updates_reload_on_every_change() {
    let (gw, binding) = services();
    binding.load().await.unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let live = binding
        .subscribe(move |items: Vec<Service>| {
            let _ = tx.send(items.len());
        })
        .await
        .unwrap();
    assert!(live.is_running());
    assert_eq!(gw.subscriber_count(Service::TABLE), 1);

    gw.insert(Service::TABLE, vec![json!({"title": "New", "display_order": 9})])
        .await
        .unwrap();
    let seen = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap();
    assert_eq!(seen, Some(4));
    assert_eq!(binding.items().await.len(), 4);

    live.close().await;
    assert_eq!(gw.subscriber_count(Service::TABLE), 0);
}

#[tokio::test]
async fn null_columns_load_as_defaults() {
    let gw = MemoryGateway::new();
    gw.seed(
        Service::TABLE,
        vec![json!({
            "title": "Eye Exam",
            "description": null,
            "icon_name": null,
            "display_order": null,
            "is_active": null
        })],
    )
    .unwrap();
    gw.seed(
        Faq::TABLE,
        vec![json!({"question": "Q", "answer": "A", "display_order": null, "is_active": null})],
    )
    .unwrap();
    let gateway: Arc<dyn Gateway> = Arc::new(gw);

    let services: ResourceBinding<Service> = ResourceBinding::new(gateway.clone());
    let items = assert_ok!(services.load().await);
    assert_eq!(items[0].description, "");
    assert_eq!(items[0].icon_name, "");
    assert_eq!(items[0].display_order, 0);
    assert!(items[0].is_active);

    let faqs: ResourceBinding<Faq> = ResourceBinding::new(gateway);
    let items = assert_ok!(faqs.load().await);
    assert_eq!(items[0].display_order, 0);
    assert!(items[0].is_active);
}

#[tokio::test(start_paused = true)]
async fn cancel_pending_fails_in_flight_calls_only() {
    let (gw, binding) = services();
    gw.delay(Op::Select, Duration::from_secs(10));

    let pending = {
        let binding = binding.clone();
        tokio::spawn(async move { binding.load().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    binding.cancel_pending();
    assert!(matches!(pending.await.unwrap(), Err(Error::Cancelled)));
    assert!(!binding.is_closed());

    let items = assert_ok!(binding.load().await);
    assert_eq!(items.len(), 3);
}
