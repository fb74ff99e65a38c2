//! Batch question answering: many domains × many questions, concurrently.

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::info;

use crate::auth::AccessToken;
use crate::client::ApiClient;
use crate::error::QaError;
use crate::qa::{Answer, QaDict};

/// One row per domain, one entry per question, both in input order.
pub type BatchResults = Vec<Vec<Result<Answer, QaError>>>;

/// Fan-out limits for a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum requests in flight across the whole batch. `None` issues every
    /// request at once.
    pub max_concurrency: Option<usize>,
}

impl BatchOptions {
    pub fn bounded(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: Some(max_concurrency.max(1)),
        }
    }
}

impl ApiClient {
    /// Ask every question about every domain.
    ///
    /// A failed request becomes an `Err` at its own position; siblings are
    /// unaffected and the batch always completes.
    pub async fn batch_ask(
        &self,
        domains: &[String],
        questions: &[QaDict],
        token: &AccessToken,
        base_url: &str,
        options: BatchOptions,
    ) -> BatchResults {
        let limiter = options.max_concurrency.map(|n| Semaphore::new(n.max(1)));
        let limiter = limiter.as_ref();

        info!(
            domains = domains.len(),
            questions = questions.len(),
            max_concurrency = ?options.max_concurrency,
            "Starting batch"
        );

        let rows = domains.iter().map(|domain| {
            join_all(questions.iter().map(move |qa_dict| async move {
                let _permit = match limiter {
                    Some(semaphore) => Some(
                        semaphore
                            .acquire()
                            .await
                            .map_err(|e| QaError::Transport(e.to_string()))?,
                    ),
                    None => None,
                };
                self.ask(domain, qa_dict, token, base_url).await
            }))
        });
        let results = join_all(rows).await;

        let failed = results.iter().flatten().filter(|r| r.is_err()).count();
        info!(failed, "Batch complete");

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ApiRequest;
    use crate::qa_config::QaConfig;
    use crate::testing::{RecordingTransport, Reply};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn token() -> AccessToken {
        AccessToken::new("tok").unwrap()
    }

    fn questions(texts: &[&str]) -> Vec<QaDict> {
        let config = QaConfig::default();
        texts.iter().map(|q| QaDict::new(*q, &config)).collect()
    }

    fn domains(names: &[&str]) -> Vec<String> {
        names.iter().map(|d| d.to_string()).collect()
    }

    fn query_of(request: &ApiRequest) -> String {
        request.body["qa_dict"]["query"].as_str().unwrap_or_default().to_string()
    }

    fn domain_of(request: &ApiRequest) -> String {
        request.body["company_domain"].as_str().unwrap_or_default().to_string()
    }

    /// Earlier questions answer later, so completion order is the reverse of input order.
    fn reversed_latency_backend() -> RecordingTransport {
        RecordingTransport::new(|request| {
            let query = query_of(request);
            let domain = domain_of(request);
            let delay = match (domain.as_str(), query.as_str()) {
                ("a.com", "Q1") => 40,
                ("a.com", "Q2") => 30,
                ("b.com", "Q1") => 20,
                _ => 10,
            };
            Reply::json(200, json!({"output": format!("{}@{}", query, domain)}))
                .after(Duration::from_millis(delay))
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_preserved_regardless_of_completion() {
        let client = ApiClient::new(Arc::new(reversed_latency_backend()));

        let results = client
            .batch_ask(
                &domains(&["a.com", "b.com"]),
                &questions(&["Q1", "Q2"]),
                &token(),
                "https://api.test",
                BatchOptions::default(),
            )
            .await;

        let answers: Vec<Vec<String>> = results
            .into_iter()
            .map(|row| row.into_iter().map(|r| r.unwrap().response).collect())
            .collect();
        assert_eq!(
            answers,
            vec![vec!["Q1@a.com", "Q2@a.com"], vec!["Q1@b.com", "Q2@b.com"]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_requests_run_concurrently() {
        let client = ApiClient::new(Arc::new(RecordingTransport::new(|_| {
            Reply::json(200, json!({"output": "ok"})).after(Duration::from_millis(100))
        })));

        let start = tokio::time::Instant::now();
        client
            .batch_ask(
                &domains(&["a.com", "b.com"]),
                &questions(&["Q1", "Q2", "Q3"]),
                &token(),
                "https://api.test",
                BatchOptions::default(),
            )
            .await;

        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_concurrency() {
        let transport = Arc::new(RecordingTransport::new(|_| {
            Reply::json(200, json!({"output": "ok"})).after(Duration::from_millis(100))
        }));
        let client = ApiClient::new(transport.clone());

        let start = tokio::time::Instant::now();
        let results = client
            .batch_ask(
                &domains(&["a.com", "b.com"]),
                &questions(&["Q1", "Q2"]),
                &token(),
                "https://api.test",
                BatchOptions::bounded(2),
            )
            .await;

        // Four requests, two at a time
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(transport.call_count(), 4);
        assert!(results.iter().flatten().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn test_failure_stays_in_its_slot() {
        let client = ApiClient::new(Arc::new(RecordingTransport::new(|request| {
            if domain_of(request) == "b.com" && query_of(request) == "Q1" {
                Reply::text(500, "index missing")
            } else {
                Reply::json(200, json!({"output": "fine"}))
            }
        })));

        let results = client
            .batch_ask(
                &domains(&["a.com", "b.com"]),
                &questions(&["Q1", "Q2"]),
                &token(),
                "https://api.test",
                BatchOptions::default(),
            )
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].iter().all(|r| r.is_ok()));
        assert_eq!(
            results[1][0],
            Err(QaError::Rejected {
                status: 500,
                body: "index missing".to_string()
            })
        );
        assert_eq!(results[1][1].as_ref().unwrap().response, "fine");
    }

    #[tokio::test]
    async fn test_transport_errors_do_not_abort_batch() {
        let client = ApiClient::new(Arc::new(RecordingTransport::new(|request| {
            if query_of(request) == "Q2" {
                Reply::transport("connection reset")
            } else {
                Reply::json(200, json!({"output": "fine"}))
            }
        })));

        let results = client
            .batch_ask(
                &domains(&["a.com"]),
                &questions(&["Q1", "Q2", "Q3"]),
                &token(),
                "https://api.test",
                BatchOptions::default(),
            )
            .await;

        assert!(results[0][0].is_ok());
        assert!(matches!(results[0][1], Err(QaError::Transport(_))));
        assert!(results[0][2].is_ok());
    }

    #[tokio::test]
    async fn test_empty_inputs() {
        let transport = Arc::new(RecordingTransport::backend());
        let client = ApiClient::new(transport.clone());

        let results = client
            .batch_ask(
                &[],
                &questions(&["Q1"]),
                &token(),
                "https://api.test",
                BatchOptions::default(),
            )
            .await;
        assert!(results.is_empty());

        let results = client
            .batch_ask(
                &domains(&["a.com"]),
                &[],
                &token(),
                "https://api.test",
                BatchOptions::default(),
            )
            .await;
        assert_eq!(results, vec![Vec::new()]);
        assert_eq!(transport.call_count(), 0);
    }
}
