//! End-to-end tests over HTTP.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, LOCATION};
use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{client, site_config, start_server, ADMIN_KEY};

fn bearer() -> String {
    format!("Bearer {ADMIN_KEY}")
}

#[tokio::test]
async fn test_pages_and_mapped_redirects() {
    let addr: SocketAddr = "127.0.0.1:28201".parse().unwrap();
    let (shutdown, _updates) = start_server(site_config(addr)).await;
    let client = client();
    let base = format!("http://{addr}");

    let res = client.get(format!("{base}/About/Team")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["link"], "/about/team");

    let res = client.get(format!("{base}/old-about")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[LOCATION], "/about");

    let res = client.get(format!("{base}/news/Launch-Day")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[LOCATION], "/blog/launch-day");

    let res = client.get(format!("{base}/external")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(res.headers()[LOCATION], "https://example.com/landing");

    shutdown.trigger();
}

#[tokio::test]
async fn test_fallback_redirects() {
    let addr: SocketAddr = "127.0.0.1:28202".parse().unwrap();
    let (shutdown, _updates) = start_server(site_config(addr)).await;
    let client = client();
    let base = format!("http://{addr}");

    // /about defines "this page" with 302; it applies below /about/team too.
    let res = client.get(format!("{base}/about/team/gone")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/about");

    // Elsewhere the site-wide nearest-parent rule applies.
    let res = client.get(format!("{base}/docs/gone/deeper")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[LOCATION], "/docs");

    let res = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_draft_stage() {
    let addr: SocketAddr = "127.0.0.1:28203".parse().unwrap();
    let (shutdown, _updates) = start_server(site_config(addr)).await;
    let client = client();
    let base = format!("http://{addr}");

    // Unpublished page: invisible live, so the site-wide fallback sends it home.
    let res = client.get(format!("{base}/preview")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[LOCATION], "/");

    let res = client.get(format!("{base}/preview?stage=Stage")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // A mapping to a draft page only applies on the draft stage.
    let res = client.get(format!("{base}/draft-link?stage=Stage")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[LOCATION], "/preview");

    shutdown.trigger();
}

#[tokio::test]
async fn test_admin_requires_key() {
    let addr: SocketAddr = "127.0.0.1:28204".parse().unwrap();
    let (shutdown, _updates) = start_server(site_config(addr)).await;
    let client = client();

    let res = client
        .get(format!("http://{addr}/admin/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("http://{addr}/admin/status"))
        .header(AUTHORIZATION, "Bearer wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("http://{addr}/admin/status"))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["status"], "operational");
    assert_eq!(status["mappings"], 4);
    assert_eq!(status["max_hops"], 10);

    shutdown.trigger();
}

#[tokio::test]
async fn test_admin_mapping_lifecycle() {
    let addr: SocketAddr = "127.0.0.1:28205".parse().unwrap();
    let (shutdown, _updates) = start_server(site_config(addr)).await;
    let client = client();
    let base = format!("http://{addr}");

    let res = client
        .post(format!("{base}/admin/mappings"))
        .header(AUTHORIZATION, bearer())
        .json(&json!({ "pattern": "/Team", "destination": { "page": 2 }, "status_code": 301 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["pattern"], "team");
    let id = created["id"].as_u64().unwrap();

    let res = client.get(format!("{base}/team")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[LOCATION], "/about/team");

    // Same pattern to the same page again.
    let res = client
        .post(format!("{base}/admin/mappings"))
        .header(AUTHORIZATION, bearer())
        .json(&json!({ "pattern": "team/", "destination": { "page": 2 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(format!("{base}/admin/mappings"))
        .header(AUTHORIZATION, bearer())
        .json(&json!({ "pattern": "(", "pattern_type": "regex", "destination": { "link": "x" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .delete(format!("{base}/admin/mappings/{id}"))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .delete(format!("{base}/admin/mappings/{id}"))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // With the mapping gone, the site-wide fallback takes over.
    let res = client.get(format!("{base}/team")).send().await.unwrap();
    assert_eq!(res.headers()[LOCATION], "/");

    shutdown.trigger();
}

#[tokio::test]
async fn test_admin_diagnostics() {
    let addr: SocketAddr = "127.0.0.1:28206".parse().unwrap();
    let (shutdown, _updates) = start_server(site_config(addr)).await;
    let client = client();
    let base = format!("http://{addr}");

    for (pattern, destination) in [("hop-a", "hop-b"), ("hop-b", "hop-c")] {
        let res = client
            .post(format!("{base}/admin/mappings"))
            .header(AUTHORIZATION, bearer())
            .json(&json!({ "pattern": pattern, "destination": { "link": destination } }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let trace: Value = client
        .get(format!("{base}/admin/chain"))
        .query(&[("url", "/hop-a")])
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(trace["hops"].as_array().unwrap().len(), 2);
    assert_eq!(trace["outcome"], json!({ "status": "resolved", "destination": "hop-c" }));

    let decision: Value = client
        .get(format!("{base}/admin/resolve"))
        .query(&[("url", "/hop-a")])
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(decision["action"], "redirect");
    assert_eq!(decision["destination"], "hop-c");
    assert_eq!(decision["source"]["kind"], "mapping");

    let decision: Value = client
        .get(format!("{base}/admin/resolve"))
        .query(&[("url", "/hop-a"), ("status", "200")])
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(decision["action"], "no_action");

    // The stage comes from the URL itself unless the caller overrides it.
    // Live, the draft page is invisible and the site-wide fallback answers.
    for (query, source) in [
        (vec![("url", "/draft-link?stage=Stage")], "mapping"),
        (vec![("url", "/draft-link?stage=Stage"), ("stage", "live")], "fallback"),
        (vec![("url", "/draft-link"), ("stage", "draft")], "mapping"),
    ] {
        let decision: Value = client
            .get(format!("{base}/admin/resolve"))
            .query(&query)
            .header(AUTHORIZATION, bearer())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(decision["source"]["kind"], source, "{query:?}");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_admin_page_hooks_and_history() {
    let addr: SocketAddr = "127.0.0.1:28207".parse().unwrap();
    let (shutdown, _updates) = start_server(site_config(addr)).await;
    let client = client();
    let base = format!("http://{addr}");

    // The directory already shows /docs; report that it used to live at /manual.
    let created: Value = client
        .post(format!("{base}/admin/pages/3/moved"))
        .header(AUTHORIZATION, bearer())
        .json(&json!({ "old_link": "/manual" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created.as_array().unwrap().len(), 1);

    let res = client.get(format!("{base}/manual")).send().await.unwrap();
    assert_eq!(res.headers()[LOCATION], "/docs");

    let report: Value = client
        .post(format!("{base}/admin/history"))
        .header(AUTHORIZATION, bearer())
        .json(&json!([
            { "record_id": 1, "parent_id": 0, "segment": "who-we-are", "version": 1 },
            { "record_id": 1, "parent_id": 0, "segment": "about", "version": 2 }
        ]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["created"].as_array().unwrap().len(), 1);

    let res = client.get(format!("{base}/who-we-are")).send().await.unwrap();
    assert_eq!(res.headers()[LOCATION], "/about");

    // Page 3 still exists, so nothing is removed.
    let removed: Value = client
        .post(format!("{base}/admin/pages/3/removed"))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(removed["deleted"], 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_config_update_swaps_settings() {
    let addr: SocketAddr = "127.0.0.1:28208".parse().unwrap();
    let config = site_config(addr);
    let (shutdown, updates) = start_server(config.clone()).await;
    let client = client();
    let base = format!("http://{addr}");

    // Served pages are left alone until replace_default is on.
    let res = client.get(format!("{base}/docs")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let mut updated = config;
    updated.resolution.max_hops = 3;
    updated.resolution.replace_default = true;
    updates.send(updated).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let status: Value = client
        .get(format!("{base}/admin/status"))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["max_hops"], 3);
    assert_eq!(status["replace_default"], true);

    shutdown.trigger();
}

#[tokio::test]
async fn test_admin_disabled_routes_fall_through() {
    let addr: SocketAddr = "127.0.0.1:28209".parse().unwrap();
    let mut config = site_config(addr);
    config.admin.enabled = false;
    let (shutdown, _updates) = start_server(config).await;

    let res = client()
        .get(format!("http://{addr}/admin/status"))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap();
    // Handled as a site path: no page, so the nearest-parent fallback redirects home.
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[LOCATION], "/");

    shutdown.trigger();
}
