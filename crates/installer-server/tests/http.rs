//! HTTP integration tests for the installer server.

use clap::Parser;
use installer_server::{Config, app};
use mockito::{Matcher, Server, ServerGuard};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, LOCATION, USER_AGENT};
use reqwest::redirect::Policy;

const MICRO_LATEST: &str = r#"{
    "tag_name": "v2.0.13",
    "assets": [
        {"name": "micro-2.0.13-linux64.tar.gz", "size": 4000000, "browser_download_url": "https://github.com/zyedidia/micro/releases/download/v2.0.13/micro-2.0.13-linux64.tar.gz", "url": "https://api.github.com/repos/zyedidia/micro/releases/assets/1"},
        {"name": "micro-2.0.13-macos-arm64.tar.gz", "size": 4000000, "browser_download_url": "https://github.com/zyedidia/micro/releases/download/v2.0.13/micro-2.0.13-macos-arm64.tar.gz", "url": "https://api.github.com/repos/zyedidia/micro/releases/assets/2"},
        {"name": "micro-2.0.13-win64.zip", "size": 4000000, "browser_download_url": "https://github.com/zyedidia/micro/releases/download/v2.0.13/micro-2.0.13-win64.zip", "url": "https://api.github.com/repos/zyedidia/micro/releases/assets/3"}
    ]
}"#;

/// Start the server against `upstream` and return its base URL.
async fn spawn(upstream: &ServerGuard) -> String {
    let config = Config::try_parse_from([
        "installer",
        "--default-user",
        "zyedidia",
        "--github-api",
        &upstream.url(),
        "--landing-url",
        "https://example.com/installer",
    ])
    .unwrap();
    let app = app(&config).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

async fn mock_micro(upstream: &mut ServerGuard) -> (mockito::Mock, mockito::Mock) {
    let repo = upstream
        .mock("GET", "/repos/zyedidia/micro")
        .with_status(200)
        .with_body(r#"{"private": false}"#)
        .create_async()
        .await;
    let latest = upstream
        .mock("GET", "/repos/zyedidia/micro/releases/latest")
        .with_status(200)
        .with_body(MICRO_LATEST)
        .create_async()
        .await;
    (repo, latest)
}

#[tokio::test]
async fn test_program_with_default_user() {
    let mut upstream = Server::new_async().await;
    let _mocks = mock_micro(&mut upstream).await;
    let base = spawn(&upstream).await;

    let resp = client().get(format!("{base}/micro")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain");

    let body = resp.text().await.unwrap();
    assert!(body.contains("user: zyedidia"));
    assert!(body.contains("release: v2.0.13"));
    assert!(body.contains("linux/amd64"));
    assert!(!body.contains("win64"));
}

#[tokio::test]
async fn test_terminal_gets_shell_script() {
    let mut upstream = Server::new_async().await;
    let _mocks = mock_micro(&mut upstream).await;
    let base = spawn(&upstream).await;

    let resp = client()
        .get(format!("{base}/zyedidia/micro"))
        .header(USER_AGENT, "curl/8.5.0")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[CONTENT_TYPE], "text/x-shellscript");

    let body = resp.text().await.unwrap();
    assert!(body.starts_with("#!/bin/sh"));
    assert!(body.contains("\"darwin_arm64\")"));
}

#[tokio::test]
async fn test_windows_platform_gets_powershell() {
    let mut upstream = Server::new_async().await;
    let _mocks = mock_micro(&mut upstream).await;
    let base = spawn(&upstream).await;

    let resp = client()
        .get(format!("{base}/micro?type=script&platform=windows&as=ed"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[CONTENT_TYPE], "text/x-powershell");
    assert!(resp.text().await.unwrap().contains("$asProg = 'ed'"));
}

#[tokio::test]
async fn test_repeat_requests_are_cached() {
    let mut upstream = Server::new_async().await;
    let repo = upstream
        .mock("GET", "/repos/zyedidia/micro")
        .with_status(200)
        .with_body(r#"{"private": false}"#)
        .expect(3)
        .create_async()
        .await;
    let latest = upstream
        .mock("GET", "/repos/zyedidia/micro/releases/latest")
        .with_status(200)
        .with_body(MICRO_LATEST)
        .expect(1)
        .create_async()
        .await;
    let base = spawn(&upstream).await;

    for _ in 0..3 {
        let resp = client().get(format!("{base}/micro")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    repo.assert_async().await;
    latest.assert_async().await;
}

#[tokio::test]
async fn test_missing_release_tag() {
    let mut upstream = Server::new_async().await;
    let _repo = upstream
        .mock("GET", "/repos/yudai/gotty")
        .with_status(200)
        .with_body(r#"{"private": false}"#)
        .create_async()
        .await;
    let _tag = upstream
        .mock("GET", "/repos/yudai/gotty/releases/tags/v0.0.12")
        .with_status(404)
        .with_body(r#"{"message": "Not Found"}"#)
        .create_async()
        .await;
    let base = spawn(&upstream).await;

    let resp = client()
        .get(format!("{base}/yudai/gotty@v0.0.12"))
        .header(USER_AGENT, "curl/8.5.0")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.text().await.unwrap(),
        "echo 'release tag v0.0.12 not found'\n"
    );
}

#[tokio::test]
async fn test_empty_path_redirects() {
    let mut upstream = Server::new_async().await;
    let untouched = upstream
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let base = spawn(&upstream).await;

    let resp = client().get(format!("{base}/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(resp.headers()[LOCATION], "https://example.com/installer");
    untouched.assert_async().await;
}

#[tokio::test]
async fn test_unknown_provider() {
    let mut upstream = Server::new_async().await;
    let untouched = upstream
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let base = spawn(&upstream).await;

    let resp = client()
        .get(format!("{base}/bogus-provider/user/repo"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(
        resp.text()
            .await
            .unwrap()
            .starts_with("Unknown provider: bogusprovider")
    );
    untouched.assert_async().await;
}

#[tokio::test]
async fn test_unknown_type() {
    let upstream = Server::new_async().await;
    let base = spawn(&upstream).await;

    let resp = client()
        .get(format!("{base}/micro?type=yaml"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "Unknown type\n");
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let mut upstream = Server::new_async().await;
    let _repo = upstream
        .mock("GET", "/repos/zyedidia/micro")
        .with_status(200)
        .with_body(r#"{"private": false}"#)
        .create_async()
        .await;
    let _latest = upstream
        .mock("GET", "/repos/zyedidia/micro/releases/latest")
        .with_status(500)
        .create_async()
        .await;
    let base = spawn(&upstream).await;

    let resp = client().get(format!("{base}/micro")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_release_without_usable_assets() {
    let mut upstream = Server::new_async().await;
    let _repo = upstream
        .mock("GET", "/repos/zyedidia/micro")
        .with_status(200)
        .with_body(r#"{"private": false}"#)
        .create_async()
        .await;
    let _latest = upstream
        .mock("GET", "/repos/zyedidia/micro/releases/latest")
        .with_status(200)
        .with_body(r#"{"tag_name": "v1", "assets": [{"name": "checksums.txt", "size": 10, "browser_download_url": "x", "url": "y"}]}"#)
        .create_async()
        .await;
    let base = spawn(&upstream).await;

    let resp = client()
        .get(format!("{base}/micro"))
        .header(USER_AGENT, "Wget/1.21")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        resp.text().await.unwrap(),
        "echo 'no downloads found for this release'\n"
    );
}

#[tokio::test]
async fn test_malformed_query_is_echoed_for_terminals() {
    let mut upstream = Server::new_async().await;
    let untouched = upstream
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let base = spawn(&upstream).await;

    let resp = client()
        .get(format!("{base}/micro?type=script&type=text"))
        .header(USER_AGENT, "curl/8.5.0")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");

    let body = resp.text().await.unwrap();
    assert!(body.starts_with("echo '"), "{body}");
    assert!(body.ends_with("'\n"), "{body}");
    assert!(!body.contains('`'), "{body}");
    untouched.assert_async().await;
}

#[tokio::test]
async fn test_encoded_release_separator() {
    let mut upstream = Server::new_async().await;
    let _repo = upstream
        .mock("GET", "/repos/zyedidia/micro")
        .with_status(200)
        .with_body(r#"{"private": false}"#)
        .create_async()
        .await;
    let tag = upstream
        .mock("GET", "/repos/zyedidia/micro/releases/tags/v2.0.13")
        .with_status(200)
        .with_body(MICRO_LATEST)
        .expect(1)
        .create_async()
        .await;
    let base = spawn(&upstream).await;

    let resp = client()
        .get(format!("{base}/zyedidia/micro%40v2.0.13"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.text().await.unwrap();
    assert!(body.contains("program: micro"), "{body}");
    assert!(body.contains("release: v2.0.13"), "{body}");
    tag.assert_async().await;
}
