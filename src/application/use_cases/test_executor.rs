use crate::domain::endpoint::EndpointDescription;
use crate::domain::test_case::{ExecutionResult, FailureKind, TestCase};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;

/// The endpoint every test case in a batch is sent to.
#[derive(Debug, Clone)]
pub struct ExecutionTarget {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl From<&EndpointDescription> for ExecutionTarget {
    fn from(endpoint: &EndpointDescription) -> Self {
        let method = reqwest::Method::from_bytes(endpoint.http_method.as_str().as_bytes())
            .unwrap_or(reqwest::Method::GET);
        Self {
            method,
            url: endpoint.api_url.clone(),
            headers: endpoint
                .headers
                .iter()
                .flatten()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            query: endpoint.query_pairs(),
        }
    }
}

/// Fires one request per test case, all in flight together up to the cap.
pub struct TestExecutor {
    client: reqwest::Client,
    request_timeout: Duration,
    max_concurrency: usize,
}

impl Default for TestExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT, DEFAULT_MAX_CONCURRENCY)
    }
}

impl TestExecutor {
    pub fn new(request_timeout: Duration, max_concurrency: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            request_timeout,
            max_concurrency: max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
        }
    }

    /// Results come back in input order, one per case. Failures are recorded
    /// in the result, never returned.
    pub async fn execute(&self, target: &ExecutionTarget, cases: Vec<TestCase>) -> Vec<ExecutionResult> {
        let total = cases.len();
        let target = Arc::new(target.clone());
        let permits = Arc::new(Semaphore::new(self.max_concurrency));

        let tasks: Vec<_> = cases
            .into_iter()
            .map(|case| {
                let fallback = case.clone();
                let client = self.client.clone();
                let target = Arc::clone(&target);
                let permits = Arc::clone(&permits);
                let timeout = self.request_timeout;
                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    run_case(&client, &target, case, timeout).await
                });
                (fallback, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(total);
        for (index, (fallback, handle)) in tasks.into_iter().enumerate() {
            match handle.await {
                Ok(result) => results.push(result),
                Err(err) => {
                    error!(index, error = %err, "Test case task aborted");
                    results.push(ExecutionResult::failed(
                        fallback,
                        FailureKind::Task,
                        &format!("Test case task aborted: {}", err),
                        0,
                    ));
                }
            }
        }

        let passed = results.iter().filter(|result| result.success).count();
        info!(url = %target.url, total, passed, "Test batch executed");
        results
    }
}

async fn run_case(
    client: &reqwest::Client,
    target: &ExecutionTarget,
    case: TestCase,
    timeout: Duration,
) -> ExecutionResult {
    let started = Instant::now();
    let elapsed = || started.elapsed().as_millis() as u64;

    let mut request = client
        .request(target.method.clone(), &target.url)
        .timeout(timeout)
        .json(&case.payload);
    if !target.query.is_empty() {
        request = request.query(&target.query);
    }
    for (name, value) in &target.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            let kind = classify(&err);
            warn!(case = %case.description, ?kind, error = %err, "Request failed");
            return ExecutionResult::failed(case, kind, &err.to_string(), elapsed());
        }
    };

    let status = response.status().as_u16();
    let headers = flatten_headers(response.headers());
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => {
            let kind = classify(&err);
            warn!(case = %case.description, ?kind, error = %err, "Reading response body failed");
            return ExecutionResult::failed(case, kind, &err.to_string(), elapsed());
        }
    };

    let response_data = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(case = %case.description, status, "Response body is not JSON");
                return ExecutionResult::failed(
                    case,
                    FailureKind::InvalidBody,
                    &format!("Response body is not valid JSON: {}", err),
                    elapsed(),
                );
            }
        }
    };

    debug!(case = %case.description, status, expected = case.expected_status, "Request completed");
    ExecutionResult::completed(case, status, response_data, headers, elapsed())
}

fn classify(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_builder() {
        FailureKind::InvalidRequest
    } else {
        FailureKind::Connect
    }
}

/// Repeated header names are joined with ", ".
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::endpoint::HttpMethod;
    use crate::domain::test_case::{TestType, EXECUTION_FAILURE_STATUS};
    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
    use serde_json::{json, Map};
    use std::net::SocketAddr;

    fn case(description: &str, payload: Value, expected_status: u16) -> TestCase {
        TestCase {
            description: description.to_string(),
            payload: payload.as_object().cloned().unwrap_or_else(Map::new),
            expected_status,
            test_type: TestType::Positive,
        }
    }

    async fn echo(req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
        if body.get("slow").is_some() {
            actix_web::rt::time::sleep(Duration::from_secs(3)).await;
        }
        if let Some(delay_ms) = body.get("delay_ms").and_then(Value::as_u64) {
            actix_web::rt::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if body.get("text").is_some() {
            return HttpResponse::Ok().content_type("text/plain").body("not json");
        }
        let status = body
            .get("status")
            .and_then(Value::as_u64)
            .unwrap_or(200) as u16;
        HttpResponse::build(actix_web::http::StatusCode::from_u16(status).unwrap())
            .insert_header(("x-echo", "yes"))
            .json(json!({
                "received": body.into_inner(),
                "query": req.query_string(),
                "tenant": req.headers().get("x-tenant").and_then(|v| v.to_str().ok()),
            }))
    }

    fn spawn_echo() -> SocketAddr {
        let server = HttpServer::new(|| App::new().route("/items", web::post().to(echo)))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        addr
    }

    fn target(addr: SocketAddr) -> ExecutionTarget {
        ExecutionTarget {
            method: reqwest::Method::POST,
            url: format!("http://{}/items", addr),
            headers: vec![("X-Tenant".to_string(), "acme".to_string())],
            query: vec![("page".to_string(), "2".to_string())],
        }
    }

    #[actix_web::test]
    async fn test_success_compares_observed_status() {
        let addr = spawn_echo();
        let executor = TestExecutor::default();
        let results = executor
            .execute(
                &target(addr),
                vec![
                    case("expects 404", json!({"status": 200}), 404),
                    case("expects 200", json!({}), 200),
                ],
            )
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status_code, 200);
        assert!(!results[0].success);
        assert!(results[1].success);
        assert_eq!(results[1].headers["x-echo"], "yes");
        let data = results[1].response_data.as_ref().unwrap();
        assert_eq!(data["query"], "page=2");
        assert_eq!(data["tenant"], "acme");
    }

    #[actix_web::test]
    async fn test_timeout_is_isolated_to_its_case() {
        let addr = spawn_echo();
        let executor = TestExecutor::new(Duration::from_millis(500), 8);
        let results = executor
            .execute(
                &target(addr),
                vec![
                    case("fast", json!({}), 200),
                    case("slow", json!({"slow": true}), 200),
                    case("missing resource", json!({"status": 404}), 404),
                ],
            )
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert_eq!(results[1].status_code, EXECUTION_FAILURE_STATUS);
        assert!(!results[1].success);
        assert_eq!(results[1].failure, Some(FailureKind::Timeout));
        assert!(results[1].response_data.as_ref().unwrap()["error"].is_string());
        assert_eq!(results[2].status_code, 404);
        assert!(results[2].success);
    }

    #[actix_web::test]
    async fn test_results_keep_input_order_under_cap() {
        let addr = spawn_echo();
        let executor = TestExecutor::new(Duration::from_secs(5), 2);
        let cases: Vec<_> = (0..10)
            .map(|n| case(&format!("case {}", n), json!({ "n": n }), 200))
            .collect();

        let results = executor.execute(&target(addr), cases).await;

        assert_eq!(results.len(), 10);
        for (n, result) in results.iter().enumerate() {
            assert_eq!(result.test_case.description, format!("case {}", n));
            assert_eq!(result.response_data.as_ref().unwrap()["received"]["n"], n);
        }
    }

    fn delayed_cases(count: usize, delay_ms: u64) -> Vec<TestCase> {
        (0..count)
            .map(|n| case(&format!("delayed {}", n), json!({ "delay_ms": delay_ms }), 200))
            .collect()
    }

    #[actix_web::test]
    async fn test_cases_run_concurrently() {
        let addr = spawn_echo();
        let executor = TestExecutor::new(Duration::from_secs(10), 8);

        let started = std::time::Instant::now();
        let results = executor.execute(&target(addr), delayed_cases(8, 1000)).await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|result| result.success));
        assert!(elapsed < Duration::from_secs(4), "took {:?}", elapsed);
    }

    #[actix_web::test]
    async fn test_cap_of_one_serializes_requests() {
        let addr = spawn_echo();
        let executor = TestExecutor::new(Duration::from_secs(10), 1);

        let started = std::time::Instant::now();
        let results = executor.execute(&target(addr), delayed_cases(3, 300)).await;
        let elapsed = started.elapsed();

        assert!(results.iter().all(|result| result.success));
        assert!(elapsed >= Duration::from_millis(900), "took {:?}", elapsed);
    }

    #[actix_web::test]
    async fn test_oversized_cap_is_clamped() {
        let addr = spawn_echo();
        let executor = TestExecutor::new(Duration::from_secs(5), usize::MAX);
        let results = executor
            .execute(&target(addr), vec![case("one", json!({}), 200)])
            .await;
        assert!(results[0].success);
    }

    #[actix_web::test]
    async fn test_non_json_body_fails_the_case() {
        let addr = spawn_echo();
        let results = TestExecutor::default()
            .execute(&target(addr), vec![case("text", json!({"text": true}), 200)])
            .await;
        assert_eq!(results[0].failure, Some(FailureKind::InvalidBody));
        assert_eq!(results[0].status_code, EXECUTION_FAILURE_STATUS);
    }

    #[actix_web::test]
    async fn test_unreachable_target_and_bad_header() {
        let mut unreachable = target("127.0.0.1:1".parse().unwrap());
        unreachable.headers.clear();
        let results = TestExecutor::default()
            .execute(&unreachable, vec![case("down", json!({}), 500)])
            .await;
        assert_eq!(results[0].failure, Some(FailureKind::Connect));
        assert!(!results[0].success);

        let addr = spawn_echo();
        let mut bad_header = target(addr);
        bad_header.headers = vec![("bad header".to_string(), "x".to_string())];
        let results = TestExecutor::default()
            .execute(&bad_header, vec![case("header", json!({}), 200)])
            .await;
        assert_eq!(results[0].failure, Some(FailureKind::InvalidRequest));
    }

    #[test]
    fn test_target_from_endpoint() {
        let mut endpoint = EndpointDescription::new(
            "Patch user",
            "https://api.example.com/users/7",
            HttpMethod::Patch,
            "user-1",
        );
        let mut params = std::collections::BTreeMap::new();
        params.insert("dry_run".to_string(), json!(true));
        endpoint.parameters = Some(params);

        let target = ExecutionTarget::from(&endpoint);
        assert_eq!(target.method, reqwest::Method::PATCH);
        assert_eq!(target.query, vec![("dry_run".to_string(), "true".to_string())]);
        assert!(target.headers.is_empty());
    }
}
