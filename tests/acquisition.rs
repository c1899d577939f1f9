//! End-to-end acquisition scenarios against a temp database.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use common::*;
use siteacquire::discovery::SearchResolver;
use siteacquire::models::{Contact, ContactStatus, ScrapeMethod};
use siteacquire::scrapers::{HttpFetcher, ProxyConfig, ProxyPool};
use siteacquire::services::ScrapingService;

const EXAMPLE_HOME: &str = r#"<html><head><title>Example Co</title>
    <meta name="description" content="Example Co builds examples."></head><body>
    <nav><a href="/what-we-do">What We Do</a><a href="/reach-us">Get In Touch</a></nav>
    <main><h1>Example Co</h1><p>Hand-built examples for every occasion since 1999.</p>
    <p>Write to owner@example.com</p></main>
    <footer>footer@example.com | (212) 555-0142</footer></body></html>"#;

const EXAMPLE_CONTACT: &str = r#"<html><body><main>
    <p>Reach the front desk at desk@example.com or 212-555-0100.</p></main></body></html>"#;

/// Accept connections and never answer.
async fn black_hole() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn email_domain_contact_is_resolved_through_site_search() {
    let (_dir, store) = temp_store().await;
    let contact = Contact::new("upload-1", ScrapeMethod::EmailDomain).with_email("jane@example.com");
    store.contacts().insert(&contact).await.unwrap();

    let search = Arc::new(FakeSearch::default().answer(
        "site:example.com",
        &[
            "https://www.linkedin.com/company/example",
            "https://example.com/brochure.pdf",
            "https://example.com/",
        ],
    ));
    let site = Arc::new(
        FakeSite::default()
            .page("https://example.com/", EXAMPLE_HOME)
            .page("https://example.com/reach-us", EXAMPLE_CONTACT),
    );
    let svc = service(store.clone(), site.clone(), resolver(search.clone()));

    let report = svc.scrape_one(&contact.id, None).await;

    assert!(report.success, "{:?}", report);
    assert_eq!(search.queries(), vec!["site:example.com"]);
    assert_eq!(status_of(&store, &contact.id).await, ContactStatus::Scraped);

    let rows = store.scraped_data().list_for_contact(&contact.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert!(row.scrape_success);
    assert_eq!(row.method, ScrapeMethod::EmailDomain);
    assert_eq!(row.discovered_url.as_deref(), Some("https://example.com/"));
    assert_eq!(row.search_query.as_deref(), Some("site:example.com"));
    assert_eq!(row.page_title.as_deref(), Some("Example Co"));
    assert_eq!(row.meta_description.as_deref(), Some("Example Co builds examples."));
    assert_eq!(row.contact_url.as_deref(), Some("https://example.com/reach-us"));

    // Homepage email stands; the phone gap is filled from the footer.
    assert_eq!(row.emails, vec!["owner@example.com"]);
    assert_eq!(row.phones, vec!["(212) 555-0142"]);

    assert!(!site
        .requests()
        .iter()
        .any(|u| u.contains("linkedin") || u.ends_with(".pdf")));
}

#[tokio::test]
async fn homepage_timeout_on_every_proxy_fails_with_plain_message() {
    let (_dir, store) = temp_store().await;
    let contact = Contact::new("upload-1", ScrapeMethod::DirectUrl).with_website("http://acme.test/");
    store.contacts().insert(&contact).await.unwrap();

    let pool = ProxyPool::new(vec![
        ProxyConfig::parse(&black_hole().await).unwrap(),
        ProxyConfig::parse(&black_hole().await).unwrap(),
    ]);
    let pool = Arc::new(pool);
    let fetcher = HttpFetcher::new(pool.clone(), &settings()).with_timeout(Duration::from_millis(300));
    let svc = ScrapingService::new(
        store.clone(),
        Arc::new(fetcher),
        Arc::new(NoBrowser),
        Arc::new(SearchResolver::unconfigured()),
        settings(),
    );

    let report = svc.scrape_one(&contact.id, None).await;

    assert!(!report.success);
    assert_eq!(status_of(&store, &contact.id).await, ContactStatus::ScrapeFailed);
    let rows = store.scraped_data().list_for_contact(&contact.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].scrape_success);
    let message = rows[0].error_message.as_deref().unwrap();
    assert!(message.contains("took too long"), "{}", message);
    assert_eq!(pool.failed_count(), 2);
}

#[tokio::test]
async fn business_search_walks_query_variants() {
    let (_dir, store) = temp_store().await;
    let contact = Contact::new("upload-1", ScrapeMethod::BusinessSearch)
        .with_business_name("Example Co")
        .with_location(Some("NY".to_string()), Some("10001".to_string()));
    store.contacts().insert(&contact).await.unwrap();

    let search = Arc::new(
        FakeSearch::default()
            .answer("Example Co NY 10001", &["https://www.yelp.com/biz/example-co"])
            .answer("Example Co NY", &["https://example.com/"]),
    );
    let site = Arc::new(FakeSite::default().page("https://example.com/", EXAMPLE_HOME));
    let svc = service(store.clone(), site, resolver(search.clone()));

    let report = svc.scrape_one(&contact.id, None).await;

    assert!(report.success, "{:?}", report);
    assert_eq!(search.queries(), vec!["Example Co NY 10001", "Example Co NY"]);
    let rows = store.scraped_data().list_for_contact(&contact.id).await.unwrap();
    assert_eq!(rows[0].search_query.as_deref(), Some("Example Co NY"));
}

#[tokio::test]
async fn failed_candidate_falls_through_to_the_next() {
    let (_dir, store) = temp_store().await;
    let contact = Contact::new("upload-1", ScrapeMethod::EmailDomain).with_email("jane@example.com");
    store.contacts().insert(&contact).await.unwrap();

    let search = Arc::new(FakeSearch::default().answer(
        "site:example.com",
        &["https://example.com/gone", "https://example.com/"],
    ));
    let site = Arc::new(FakeSite::default().page("https://example.com/", EXAMPLE_HOME));
    let svc = service(store.clone(), site, resolver(search));

    let report = svc.scrape_one(&contact.id, None).await;
    assert!(report.success);
    assert_eq!(report.url.as_deref(), Some("https://example.com/"));
}

#[tokio::test]
async fn search_with_only_unusable_results_is_a_resolution_failure() {
    let (_dir, store) = temp_store().await;
    let contact = Contact::new("upload-1", ScrapeMethod::EmailDomain).with_email("jane@example.com");
    store.contacts().insert(&contact).await.unwrap();

    let search = Arc::new(FakeSearch::default().answer(
        "site:example.com",
        &[
            "https://example.com/menu.pdf",
            "https://www.linkedin.com/company/example",
        ],
    ));
    let site = Arc::new(FakeSite::default().page("https://example.com/", EXAMPLE_HOME));
    let svc = service(store.clone(), site.clone(), resolver(search));

    let report = svc.scrape_one(&contact.id, None).await;

    assert!(!report.success);
    assert!(site.requests().is_empty());
    let rows = store.scraped_data().list_for_contact(&contact.id).await.unwrap();
    assert_eq!(rows[0].search_query.as_deref(), Some("site:example.com"));
    assert!(rows[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("couldn't find a website"));
}

#[tokio::test]
async fn failed_contact_can_be_reset_and_retried() {
    let (_dir, store) = temp_store().await;
    let contact = Contact::new("upload-1", ScrapeMethod::DirectUrl).with_website("https://example.com");
    store.contacts().insert(&contact).await.unwrap();

    let empty = service(
        store.clone(),
        Arc::new(FakeSite::default()),
        Arc::new(SearchResolver::unconfigured()),
    );
    assert!(!empty.scrape_one(&contact.id, None).await.success);
    empty.reset_status(&contact.id).await.unwrap();

    let site = Arc::new(FakeSite::default().page("https://example.com/", EXAMPLE_HOME));
    let svc = service(store.clone(), site, Arc::new(SearchResolver::unconfigured()));
    assert!(svc.scrape_one(&contact.id, None).await.success);

    let rows = store.scraped_data().list_for_contact(&contact.id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].scrape_success);
    assert!(!rows[1].scrape_success);
}
