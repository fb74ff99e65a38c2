//! End-to-end tests of the reqwest transport against a mock backend.

use std::time::Duration;

use agent_shared::{
    ApiClient, ApiError, AuthError, BatchOptions, Config, CrawlError, CrawlJobRequest,
    Credentials, QaDict, QaError, Session, Timeouts,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn backend() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token/"))
        .and(body_json(json!({"username": "alice", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "jwt-abc"})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/company_list/"))
        .and(header("authorization", "Bearer jwt-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "companies": [
                {"company_name": "Acme", "company_domain": "acme.com"},
                {"company_name": "Globex", "company_domain": "globex.io"}
            ]
        })))
        .mount(&server)
        .await;

    server
}

fn session_for(server: &MockServer, password: &str) -> Session {
    Session::new(Credentials::new("alice", password), server.uri())
}

fn client() -> ApiClient {
    ApiClient::from_config(&Config::default())
}

#[tokio::test]
async fn login_then_ask() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/company_qa/"))
        .and(header("authorization", "Bearer jwt-abc"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": "Acme makes anvils.",
            "sources": ["https://acme.com/about"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client();
    let mut session = session_for(&server, "pw");

    let login = session.authenticate_and_refresh(&client).await.unwrap();
    assert!(login.refresh.is_ok());
    assert_eq!(session.companies().len(), 2);

    session.select_domain("acme.com").unwrap();
    let answer = session.ask(&client, "What does Acme do?").await.unwrap();
    assert_eq!(answer.response, "Acme makes anvils.");
    assert_eq!(answer.raw_response["sources"][0], "https://acme.com/about");

    let requests = server.received_requests().await.unwrap();
    let qa = requests
        .iter()
        .find(|r| r.url.path() == "/company_qa/")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&qa.body).unwrap();
    assert_eq!(body["company_domain"], "acme.com");
    assert_eq!(body["qa_dict"]["recursion_limit"], 25);
}

#[tokio::test]
async fn rejected_login_reports_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("No active account found"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server, "wrong");
    let err = session.authenticate_and_refresh(&client()).await.unwrap_err();

    assert_eq!(
        err,
        AuthError::Rejected {
            status: 401,
            body: "No active account found".to_string()
        }
    );
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn lite_crawl_body_has_no_prompt() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/company_crawl/"))
        .and(body_json(json!({"company_domains": ["x.com", "y.com"], "lite_crawl": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "queued"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client();
    let mut session = session_for(&server, "pw");
    session.authenticate_and_refresh(&client).await.unwrap();

    let request = CrawlJobRequest::lite(["x.com", "y.com", "x.com"]).unwrap();
    let ack = session.submit_crawl(&client, &request).await.unwrap();
    assert_eq!(ack.message, "queued");
}

#[tokio::test]
async fn crawl_timeout_is_a_transport_error() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/company_crawl/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "late"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = client().with_timeouts(Timeouts {
        crawl: Duration::from_millis(100),
        ..Timeouts::default()
    });
    let mut session = session_for(&server, "pw");
    session.authenticate_and_refresh(&client).await.unwrap();

    let request = CrawlJobRequest::lite(["slow.com"]).unwrap();
    let err = session.submit_crawl(&client, &request).await.unwrap_err();
    assert!(matches!(err, CrawlError::Api(ApiError::Transport(_))));
}

#[tokio::test]
async fn batch_against_live_listener() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/company_qa/"))
        .and(body_json(json!({
            "company_domain": "globex.io",
            "qa_dict": QaDict::new("Q2", &Default::default())
        })))
        .respond_with(ResponseTemplate::new(500).set_body_string("index missing"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/company_qa/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": "ok"})))
        .mount(&server)
        .await;

    let client = client();
    let mut session = session_for(&server, "pw");
    session.authenticate_and_refresh(&client).await.unwrap();

    let domains = vec!["acme.com".to_string(), "globex.io".to_string()];
    let questions: Vec<QaDict> = ["Q1", "Q2"]
        .iter()
        .map(|q| QaDict::new(*q, &session.config))
        .collect();

    let results = session
        .batch_ask(&client, &domains, &questions, BatchOptions::bounded(2))
        .await
        .unwrap();

    assert!(results[0].iter().all(|r| r.is_ok()));
    assert!(results[1][0].is_ok());
    assert_eq!(
        results[1][1],
        Err(QaError::Rejected {
            status: 500,
            body: "index missing".to_string()
        })
    );
}
