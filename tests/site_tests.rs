use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use clinic_site::gateway::memory::{MemoryGateway, Op};
use clinic_site::gateway::{ChangeKind, Gateway};
use clinic_site::models::{BlogPost, ClinicSetting, Doctor, Faq, Resource, Service};
use clinic_site::site::{PublicSite, SiteSection};
use clinic_site::{ClientOptions, Error};

fn seeded() -> MemoryGateway {
    let gw = MemoryGateway::new();
    gw.seed(
        Service::TABLE,
        vec![
            json!({"title": "Eye Exam", "icon_name": "eye", "display_order": 2, "is_active": true}),
            json!({"title": "Retired", "display_order": 1, "is_active": false}),
            json!({"title": "Glasses", "icon_name": "glasses", "display_order": 1, "is_active": true}),
        ],
    )
    .unwrap();
    gw.seed(
        Doctor::TABLE,
        vec![json!({"name": "Dr. Lee", "display_order": 1, "is_active": true})],
    )
    .unwrap();
    gw.seed(
        Faq::TABLE,
        vec![
            json!({"question": "Hidden?", "answer": "Yes", "display_order": 1, "is_active": false}),
            json!({"question": "Open Saturdays?", "answer": "9 to 1", "display_order": 2, "is_active": true}),
        ],
    )
    .unwrap();
    gw.seed(
        BlogPost::TABLE,
        vec![
            json!({"title": "Draft", "content": "wip", "is_published": false}),
            json!({"title": "Blue light", "content": "The long version", "is_published": true}),
        ],
    )
    .unwrap();
    gw.seed(
        ClinicSetting::TABLE,
        vec![
            json!({"key": "phone", "value": "555-0100", "updated_at": "2030-01-01T00:00:00Z"}),
            json!({"key": "address", "value": "1 Main St", "updated_at": "2030-01-02T00:00:00Z"}),
        ],
    )
    .unwrap();
    gw
}

#[tokio::test]
async fn load_all_shows_only_public_rows() {
    let gw = seeded();
    let site = PublicSite::new(Arc::new(gw));

    let report = site.load_all().await;
    assert!(report.is_complete());

    let services: Vec<String> = site.services.items().await.into_iter().map(|s| s.title).collect();
    assert_eq!(services, ["Glasses", "Eye Exam"]);
    assert_eq!(site.doctors.items().await.len(), 1);

    let faqs = site.faqs.items().await;
    assert_eq!(faqs.len(), 1);
    assert_eq!(faqs[0].question, "Open Saturdays?");

    let posts = site.posts.items().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Blue light");

    let info = site.clinic_info().await;
    assert_eq!(info["phone"], "555-0100");
    assert_eq!(info["address"], "1 Main St");
}

#[tokio::test]
async fn one_failing_section_does_not_block_the_rest() {
    let gw = seeded();
    gw.fail(Op::Select, Some(Doctor::TABLE));
    let site = PublicSite::new(Arc::new(gw));

    let report = site.load_all().await;
    assert!(!report.is_complete());
    assert!(report.failed(SiteSection::Doctors));
    assert!(!report.failed(SiteSection::Services));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(site.services.items().await.len(), 2);
    assert!(site.doctors.items().await.is_empty());
}

#[tokio::test]
async fn article_body_is_fetched_on_demand() {
    let gw = seeded();
    let site = PublicSite::new(Arc::new(gw.clone()));
    site.load_all().await;

    let post = site.posts.items().await.remove(0);
    let stored = gw.rows(BlogPost::TABLE);
    assert!(stored.iter().all(|r| r.get("content").is_some()));

    let body = site.post_content(&post.id).await.unwrap();
    assert_eq!(body.as_deref(), Some("The long version"));
}

#[tokio::test]
async fn live_updates_bump_the_revision() {
    let gw = seeded();
    let mut site = PublicSite::new(Arc::new(gw.clone()));
    site.load_all().await;
    site.open_live_updates().await.unwrap();
    assert_eq!(site.live_update_count(), 3);
    assert_eq!(gw.subscriber_count(Service::TABLE), 1);

    let mut changes = site.changes();
    gw.insert(
        Service::TABLE,
        vec![json!({"title": "LASIK", "display_order": 3, "is_active": true})],
    )
    .await
    .unwrap();
    tokio::time::timeout(Duration::from_secs(5), changes.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(site.services.items().await.len(), 3);

    gw.notify(ClinicSetting::TABLE, ChangeKind::Update);
    tokio::time::timeout(Duration::from_secs(5), changes.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*changes.borrow(), 2);

    site.close();
    assert_eq!(site.live_update_count(), 0);
}

#[tokio::test]
async fn live_updates_fail_cleanly_when_subscribing_fails() {
    let gw = seeded();
    gw.fail(Op::Subscribe, Some(Doctor::TABLE));
    let mut site = PublicSite::new(Arc::new(gw.clone()));

    assert!(site.open_live_updates().await.is_err());
    assert_eq!(site.live_update_count(), 0);
}

#[tokio::test]
async fn forms_share_the_site_gateway() {
    let gw = seeded();
    let site = PublicSite::new(Arc::new(gw.clone()));
    let mut contact = site.contact_form();
    contact.fields.name = "Ann".to_string();
    contact.fields.email = "ann@example.com".to_string();
    contact.fields.message = "Hello".to_string();
    contact.submit().await.unwrap();
    assert_eq!(gw.rows("contact_messages").len(), 1);

    let booking = site.booking_form();
    assert!(booking.fields.patient_name.is_empty());
}

#[tokio::test]
async fn faqs_show_active_rows_in_display_order() {
    let gw = MemoryGateway::new();
    gw.seed(
        Faq::TABLE,
        vec![
            json!({"question": "Parking?", "answer": "Free", "display_order": 3, "is_active": true}),
            json!({"question": "Retired", "answer": "-", "display_order": 1, "is_active": false}),
            json!({"question": "Insurance?", "answer": "Yes", "display_order": 2, "is_active": true}),
        ],
    )
    .unwrap();
    let site = PublicSite::new(Arc::new(gw));

    let faqs = site.faqs.load().await.unwrap();
    let questions: Vec<&str> = faqs.iter().map(|f| f.question.as_str()).collect();
    assert_eq!(questions, ["Insurance?", "Parking?"]);
}

#[tokio::test(start_paused = true)]
async fn site_uses_the_configured_request_timeout() {
    let gw = seeded();
    gw.delay(Op::Select, Duration::from_secs(2));
    let options = ClientOptions::default().with_request_timeout(Duration::from_secs(1));
    let site = PublicSite::with_options(Arc::new(gw), &options);

    let report = site.load_all().await;
    assert_eq!(report.failures.len(), 5);
    let err = site.services.load().await.unwrap_err();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(1)));
}
