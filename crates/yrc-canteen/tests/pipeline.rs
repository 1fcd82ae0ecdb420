//! End-to-end retrieval against mock portals.
//!
//! Each test stands up a `wiremock` server shaped like one portal version and
//! drives the real reqwest transport through it. `.expect(n)` on a mock pins
//! down which requests the pipeline is (not) allowed to make.

use std::time::Duration;

use wiremock::matchers::{any, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use yrc_canteen::{
    ClientOptions, Credentials, FailureTag, PortalProfile, RetrievalMode, RetrievalResult,
    Retriever, Summary,
};

// ─────────────────────── fixtures ───────────────────────

const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html><head><meta name="csrf-token" content="meta-token-unused"></head>
<body><main>
  <form method="post" action="/canteen/login">
    <input type="hidden" name="_csrf_token" value="tok+abc/123=">
    <select name="user_type"><option value="student">นักเรียน</option></select>
    <input type="text" name="username">
    <input type="password" name="password">
    <button type="submit">เข้าสู่ระบบ</button>
  </form>
</main></body></html>"#;

const LOGIN_PAGE_NO_TOKEN: &str = r#"<html><body><form method="post">
    <input type="text" name="username"><input type="password" name="password">
</form></body></html>"#;

fn dashboard(balance: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><body><main><div>
  <div class="bg-gradient-to-r from-blue-500 to-indigo-600 rounded-2xl p-8 text-white shadow-xl">
    <div class="flex items-center justify-between">
      <div><p class="text-sm opacity-80">&#3618;&#3629;&#3604;&#3648;&#3591;&#3636;&#3609;&#3588;&#3591;&#3648;&#3627;&#3621;&#3639;&#3629;</p>
           <p class="text-4xl font-bold mt-1">{balance}</p></div>
      <div><svg></svg></div>
    </div>
  </div>
</div></main></body></html>"#
    )
}

const LEGACY_LOGIN_PAGE: &str = r#"<html><head><meta content="legacy-meta-token" name="csrf-token"></head>
<body><form method="post"><input type="text" name="username"><input type="password" name="password"></form></body></html>"#;

fn legacy_dashboard(cards: &[&str]) -> String {
    let cards: String = cards
        .iter()
        .map(|v| format!(r#"<div class="summary-card"><span>label</span><p class="summary-value">{v}</p></div>"#))
        .collect();
    format!("<html><body><section>{cards}</section></body></html>")
}

fn html(status: u16, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

fn redirect(to: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("Location", to)
}

fn session_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; Path=/; HttpOnly")
}

fn credentials() -> Credentials {
    Credentials::new("s12345", "p@ss word")
}

fn retriever(server: &MockServer, profile: PortalProfile) -> Retriever {
    let options = ClientOptions {
        timeout: Duration::from_secs(5),
        ..ClientOptions::default()
    };
    Retriever::new(profile.with_base_url(server.uri()), options).unwrap()
}

/// Entry page without a cookie: the login form plus a pre-login session.
async fn mount_login_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(
            html(200, LOGIN_PAGE)
                .insert_header("Set-Cookie", session_cookie("canteen_session", "pre123")),
        )
        .mount(server)
        .await;
}

/// Entry page with an authenticated cookie: redirect to the dashboard.
async fn mount_authenticated_entry(server: &MockServer, session: &str) {
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .and(header("cookie", format!("canteen_session={session}").as_str()))
        .respond_with(redirect("/canteen/student/dashboard"))
        .with_priority(1)
        .mount(server)
        .await;
}

async fn mount_dashboard(server: &MockServer, session: &str, balance: &str) {
    Mock::given(method("GET"))
        .and(path("/canteen/student/dashboard"))
        .and(header("cookie", format!("canteen_session={session}").as_str()))
        .respond_with(html(200, &dashboard(balance)))
        .mount(server)
        .await;
}

async fn mount_logout(server: &MockServer, session: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/canteen/student/logout"))
        .and(header("cookie", format!("canteen_session={session}").as_str()))
        .respond_with(redirect("/canteen/login"))
        .expect(times)
        .mount(server)
        .await;
}

async fn forbid_login_post(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

// ─────────────────────── scenarios ───────────────────────

#[tokio::test]
async fn test_login_then_extract_balance() {
    let server = MockServer::start().await;
    mount_authenticated_entry(&server, "post456").await;
    mount_login_page(&server).await;

    let referer = format!("{}/canteen/login", server.uri());
    Mock::given(method("POST"))
        .and(path("/canteen/login"))
        .and(header("cookie", "canteen_session=pre123"))
        .and(header("referer", referer.as_str()))
        .and(body_string_contains("_csrf_token=tok%2Babc%2F123%3D"))
        .and(body_string_contains("user_type=student"))
        .and(body_string_contains("username=s12345"))
        .and(body_string_contains("password=p%40ss+word"))
        .respond_with(
            redirect("/canteen/student/dashboard")
                .insert_header("Set-Cookie", session_cookie("canteen_session", "post456")),
        )
        .expect(1)
        .mount(&server)
        .await;

    mount_dashboard(&server, "post456", "2,500.00").await;
    mount_logout(&server, "post456", 1).await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.balance(&credentials()).await, Ok("2500.00".to_string()));
}

#[tokio::test]
async fn test_probe_failure_stops_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    forbid_login_post(&server).await;
    Mock::given(path("/canteen/student/dashboard"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(path("/canteen/student/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.retrieve_balance(&credentials()).await, "ConnectionError");
}

#[tokio::test]
async fn test_unreachable_portal_is_connection_error() {
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let options = ClientOptions {
        timeout: Duration::from_secs(2),
        ..ClientOptions::default()
    };
    let retriever =
        Retriever::new(PortalProfile::yupparaj().with_base_url(uri), options).unwrap();
    assert_eq!(
        retriever.balance(&credentials()).await,
        Err(FailureTag::ConnectionError)
    );
}

#[tokio::test]
async fn test_existing_session_skips_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(
            redirect("/canteen/student/dashboard")
                .insert_header("Set-Cookie", session_cookie("canteen_session", "live789")),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_dashboard(&server, "live789", "฿1,234.5").await;
    mount_logout(&server, "live789", 1).await;
    forbid_login_post(&server).await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.balance(&credentials()).await, Ok("1234.50".to_string()));
}

#[tokio::test]
async fn test_summary_with_missing_card() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/canteen/student/login"))
        .and(header("cookie", "laravel_session=legacy-post"))
        .respond_with(redirect("/canteen/student/dashboard"))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/canteen/student/login"))
        .respond_with(
            html(200, LEGACY_LOGIN_PAGE)
                .insert_header("Set-Cookie", session_cookie("laravel_session", "legacy-pre")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/canteen/student/login"))
        .and(header("cookie", "laravel_session=legacy-pre"))
        .and(body_string_contains("_token=legacy-meta-token"))
        .respond_with(
            html(200, "<html><body>ยินดีต้อนรับ</body></html>")
                .insert_header("Set-Cookie", session_cookie("laravel_session", "legacy-post")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/canteen/student/dashboard"))
        .and(header("cookie", "laravel_session=legacy-post"))
        .respond_with(html(200, &legacy_dashboard(&["฿120.00", "฿1,500.00"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/canteen/student/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let retriever = retriever(&server, PortalProfile::yupparaj_legacy());
    assert_eq!(
        retriever.summary(&credentials()).await,
        Ok(Summary {
            balance: "120.00".into(),
            top_up: "1500.00".into(),
            expense: "0".into(),
        })
    );
}

// ─────────────────────── failure tags ───────────────────────

#[tokio::test]
async fn test_missing_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(html(200, LOGIN_PAGE))
        .mount(&server)
        .await;
    forbid_login_post(&server).await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.balance(&credentials()).await, Err(FailureTag::NoSession));
}

#[tokio::test]
async fn test_missing_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(
            html(200, LOGIN_PAGE_NO_TOKEN)
                .insert_header("Set-Cookie", session_cookie("canteen_session", "pre123")),
        )
        .mount(&server)
        .await;
    forbid_login_post(&server).await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.retrieve_balance(&credentials()).await, "NoCSRF");
}

#[tokio::test]
async fn test_login_without_redirect_fails_in_redirect_mode() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;
    Mock::given(method("POST"))
        .and(path("/canteen/login"))
        .respond_with(
            html(200, "<html>dashboard</html>")
                .insert_header("Set-Cookie", session_cookie("canteen_session", "post456")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/canteen/student/dashboard"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.balance(&credentials()).await, Err(FailureTag::LoginFailed));
}

#[tokio::test]
async fn test_redirect_back_to_login_is_rejected() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;
    Mock::given(method("POST"))
        .and(path("/canteen/login"))
        .respond_with(
            redirect("/canteen/login")
                .insert_header("Set-Cookie", session_cookie("canteen_session", "post456")),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_logout(&server, "post456", 0).await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.balance(&credentials()).await, Err(FailureTag::LoginFailed));
}

#[tokio::test]
async fn test_login_without_new_cookie() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;
    Mock::given(method("POST"))
        .and(path("/canteen/login"))
        .respond_with(redirect("/canteen/student/dashboard"))
        .expect(1)
        .mount(&server)
        .await;
    // The stale pre-login cookie must not be reused for verification.
    Mock::given(path("/canteen/student/dashboard"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(
        retriever.balance(&credentials()).await,
        Err(FailureTag::NoSessionAfterLogin)
    );
}

#[tokio::test]
async fn test_verification_lands_on_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .and(header("cookie", "canteen_session=post456"))
        .respond_with(html(200, LOGIN_PAGE))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_login_page(&server).await;
    Mock::given(method("POST"))
        .and(path("/canteen/login"))
        .respond_with(
            redirect("/canteen/student/dashboard")
                .insert_header("Set-Cookie", session_cookie("canteen_session", "post456")),
        )
        .mount(&server)
        .await;
    mount_logout(&server, "post456", 0).await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.balance(&credentials()).await, Err(FailureTag::NotLoggedIn));
}

#[tokio::test]
async fn test_unknown_page_never_extracts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(
            redirect("/maintenance")
                .insert_header("Set-Cookie", session_cookie("canteen_session", "pre123")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maintenance"))
        .respond_with(html(200, &dashboard("฿9,999.00")))
        .expect(1)
        .mount(&server)
        .await;
    forbid_login_post(&server).await;
    mount_logout(&server, "pre123", 0).await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(
        retriever.retrieve(&credentials(), RetrievalMode::Balance).await,
        RetrievalResult::Failed {
            tag: FailureTag::NotLoggedIn
        }
    );
}

#[tokio::test]
async fn test_redirect_loop_is_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(redirect("/canteen/login"))
        .mount(&server)
        .await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(
        retriever.balance(&credentials()).await,
        Err(FailureTag::ConnectionError)
    );
}

#[tokio::test]
async fn test_legacy_login_form_rerendered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/student/login"))
        .respond_with(
            html(200, LEGACY_LOGIN_PAGE)
                .insert_header("Set-Cookie", session_cookie("laravel_session", "legacy-pre")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/canteen/student/login"))
        .respond_with(
            html(200, LEGACY_LOGIN_PAGE)
                .insert_header("Set-Cookie", session_cookie("laravel_session", "legacy-pre2")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let retriever = retriever(&server, PortalProfile::yupparaj_legacy());
    assert_eq!(
        retriever.retrieve_all(&credentials()).await,
        Err(FailureTag::LoginFailed)
    );
}

// ─────────────────────── extraction edge cases ───────────────────────

#[tokio::test]
async fn test_logout_failure_keeps_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(
            redirect("/canteen/student/dashboard")
                .insert_header("Set-Cookie", session_cookie("canteen_session", "live789")),
        )
        .mount(&server)
        .await;
    mount_dashboard(&server, "live789", "฿75.25").await;
    Mock::given(path("/canteen/student/logout"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.balance(&credentials()).await, Ok("75.25".to_string()));
}

#[tokio::test]
async fn test_zero_balance_keeps_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(
            redirect("/canteen/student/dashboard")
                .insert_header("Set-Cookie", session_cookie("canteen_session", "live789")),
        )
        .mount(&server)
        .await;
    mount_dashboard(&server, "live789", "฿0.00").await;
    mount_logout(&server, "live789", 1).await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.balance(&credentials()).await, Ok("฿0.00".to_string()));
}

#[tokio::test]
async fn test_redesigned_dashboard_uses_fallback_then_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(
            redirect("/canteen/student/dashboard")
                .insert_header("Set-Cookie", session_cookie("canteen_session", "live789")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/canteen/student/dashboard"))
        .respond_with(html(
            200,
            r#"<html><body><aside><p class="text-4xl font-bold">฿310.00</p></aside></body></html>"#,
        ))
        .mount(&server)
        .await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.balance(&credentials()).await, Ok("310.00".to_string()));

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(
            redirect("/canteen/student/dashboard")
                .insert_header("Set-Cookie", session_cookie("canteen_session", "live789")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/canteen/student/dashboard"))
        .respond_with(html(200, "<html><body><p>ปิดปรับปรุง</p></body></html>"))
        .mount(&server)
        .await;

    // No selector matched: the literal "0" is shown, same as a true zero.
    assert_eq!(retriever.balance(&credentials()).await, Ok("0".to_string()));
}

#[tokio::test]
async fn test_summary_unsupported_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    assert_eq!(retriever.summary(&credentials()).await, Err(FailureTag::Error));
    assert_eq!(
        retriever
            .retrieve(&credentials(), RetrievalMode::Summary)
            .await
            .display_strings(),
        vec!["Error".to_string()]
    );
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/canteen/login"))
        .respond_with(
            redirect("/canteen/student/dashboard")
                .insert_header("Set-Cookie", session_cookie("canteen_session", "live789")),
        )
        .expect(2)
        .mount(&server)
        .await;
    mount_dashboard(&server, "live789", "42").await;
    mount_logout(&server, "live789", 2).await;

    let retriever = retriever(&server, PortalProfile::yupparaj());
    let creds = credentials();
    let (a, b) = tokio::join!(retriever.balance(&creds), retriever.balance(&creds));
    assert_eq!(a, Ok("42.00".to_string()));
    assert_eq!(b, Ok("42.00".to_string()));
}
