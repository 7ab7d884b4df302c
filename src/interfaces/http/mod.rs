use crate::application::use_cases::test_batch::TestApiRequest;
use crate::domain::endpoint::EndpointDescription;
use crate::domain::error::AppError;
use crate::domain::script::{ExportCredentials, GeneratedScript, ScriptExport, ScriptRequest};
use crate::infrastructure::config::ServerConfig;
use crate::interfaces::state::AppState;
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{delete, dev::Server, get, post, put, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

const LOG_CAPACITY: usize = 100;
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub type LogRing = Arc<Mutex<VecDeque<LogEntry>>>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub app: Arc<AppState>,
    pub logs: LogRing,
}

pub fn new_log_ring() -> LogRing {
    Arc::new(Mutex::new(VecDeque::with_capacity(LOG_CAPACITY)))
}

/// Records an activity entry (last 100 kept) and mirrors it to tracing.
pub fn add_log(logs: &Mutex<VecDeque<LogEntry>>, level: &str, source: &str, message: &str) {
    match level {
        "ERROR" => error!(source, "{}", message),
        "WARN" => warn!(source, "{}", message),
        _ => info!(source, "{}", message),
    }

    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if logs.len() == LOG_CAPACITY {
        logs.pop_front();
    }
    logs.push_back(entry);
}

fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::ValidationError(_) | AppError::ParseError(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::TestCaseValidation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::GenerationUnavailable(_)
        | AppError::MalformedGenerationOutput { .. }
        | AppError::ExportError(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(data: &HttpState, source: &str, err: AppError) -> HttpResponse {
    let status = status_for(&err);
    let level = if status.is_server_error() { "ERROR" } else { "WARN" };
    add_log(&data.logs, level, source, &err.to_string());
    let mut body = json!({ "detail": err.to_string() });
    if let AppError::MalformedGenerationOutput { raw, .. } = &err {
        body["raw"] = json!(raw);
    }
    HttpResponse::build(status).json(body)
}

// ============================================================
// TEST GENERATION
// ============================================================

#[post("/test-api")]
async fn test_api(data: web::Data<HttpState>, req: web::Json<TestApiRequest>) -> impl Responder {
    let request = req.into_inner();
    add_log(
        &data.logs,
        "INFO",
        "TestApi",
        &format!(
            "Testing {} {} (stored={})",
            request.endpoint.http_method, request.endpoint.api_url, request.is_previous
        ),
    );

    match data.app.test_batch.test_api(request).await {
        Ok(results) => HttpResponse::Ok().json(results),
        Err(e) => error_response(&data, "TestApi", e),
    }
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

#[derive(Deserialize)]
struct ApiDetailsQuery {
    api_id: Option<String>,
}

#[get("/api/details")]
async fn api_details(data: web::Data<HttpState>, query: web::Query<ApiDetailsQuery>) -> impl Responder {
    match data.app.catalog.get(query.api_id.as_deref()).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => error_response(&data, "TestApi", e),
    }
}

// ============================================================
// ENDPOINT MANAGEMENT
// ============================================================

#[post("/upload/individual")]
async fn upload_individual(
    data: web::Data<HttpState>,
    req: web::Json<EndpointDescription>,
) -> impl Responder {
    match data.app.catalog.register(req.into_inner()).await {
        Ok(record) => {
            add_log(
                &data.logs,
                "INFO",
                "Catalog",
                &format!("Stored API {}", record.id),
            );
            HttpResponse::Ok().json(json!({
                "status": "success",
                "message": "API details stored successfully",
                "api": record,
            }))
        }
        Err(e) => error_response(&data, "Catalog", e),
    }
}

#[derive(Deserialize)]
struct UploadFileQuery {
    user_id: String,
    file_name: String,
}

/// The file travels as the raw request body.
#[post("/upload/file")]
async fn upload_file(
    data: web::Data<HttpState>,
    query: web::Query<UploadFileQuery>,
    body: web::Bytes,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "Catalog",
        &format!("Importing {} ({} bytes)", query.file_name, body.len()),
    );

    match data
        .app
        .catalog
        .import_file(&query.file_name, &body, &query.user_id)
        .await
    {
        Ok(records) if records.is_empty() => HttpResponse::Ok().json(json!({
            "status": "warning",
            "message": "No valid API details found in the file",
            "apis": [],
        })),
        Ok(records) => HttpResponse::Ok().json(json!({
            "status": "success",
            "message": format!("Successfully stored {} API details", records.len()),
            "apis": records,
        })),
        Err(e) => error_response(&data, "Catalog", e),
    }
}

#[derive(Deserialize)]
struct BulkEndpointList {
    api_list: Vec<EndpointDescription>,
}

#[post("/upload/text")]
async fn upload_text(data: web::Data<HttpState>, req: web::Json<BulkEndpointList>) -> impl Responder {
    match data.app.catalog.import_list(req.into_inner().api_list).await {
        Ok(records) => HttpResponse::Ok().json(json!({
            "status": "success",
            "message": format!("Successfully stored {} API details", records.len()),
            "apis": records,
        })),
        Err(e) => error_response(&data, "Catalog", e),
    }
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: String,
}

#[get("/apis")]
async fn list_apis(data: web::Data<HttpState>, query: web::Query<UserQuery>) -> impl Responder {
    match data.app.catalog.list_for_user(&query.user_id).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => error_response(&data, "Catalog", e),
    }
}

#[delete("/apis/{api_id}")]
async fn delete_api(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let api_id = path.into_inner();
    match data.app.catalog.delete(&api_id).await {
        Ok(()) => {
            add_log(&data.logs, "INFO", "Catalog", &format!("Deleted API {}", api_id));
            HttpResponse::Ok().json(json!({
                "status": "success",
                "message": "API deleted successfully",
            }))
        }
        Err(e) => error_response(&data, "Catalog", e),
    }
}

// ============================================================
// SCRIPTS & EXPORT
// ============================================================

#[derive(Deserialize)]
struct GenerateScriptQuery {
    api_id: String,
    #[serde(flatten)]
    options: ScriptRequest,
}

#[post("/generate_script")]
async fn generate_script(
    data: web::Data<HttpState>,
    query: web::Query<GenerateScriptQuery>,
) -> impl Responder {
    let query = query.into_inner();
    add_log(
        &data.logs,
        "INFO",
        "Scripts",
        &format!(
            "Generating {} / {} script for API {}",
            query.options.language, query.options.framework, query.api_id
        ),
    );

    match data
        .app
        .scripts
        .generate_for_endpoint(&query.api_id, &query.options.language, &query.options.framework)
        .await
    {
        Ok(script) => HttpResponse::Ok().json(GeneratedScript { script }),
        Err(e) => error_response(&data, "Scripts", e),
    }
}

#[derive(Deserialize)]
struct BulkScriptQuery {
    file_name: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(flatten)]
    options: ScriptRequest,
}

#[post("/upload_api_requests")]
async fn upload_api_requests(
    data: web::Data<HttpState>,
    query: web::Query<BulkScriptQuery>,
    body: web::Bytes,
) -> impl Responder {
    match data
        .app
        .scripts
        .generate_bulk(
            &query.file_name,
            &body,
            query.user_id.as_deref(),
            &query.options.language,
            &query.options.framework,
        )
        .await
    {
        Ok(scripts) => HttpResponse::Ok().json(scripts),
        Err(e) => error_response(&data, "Scripts", e),
    }
}

#[post("/save_github_details")]
async fn save_github_details(
    data: web::Data<HttpState>,
    req: web::Json<ExportCredentials>,
) -> impl Responder {
    match data.app.export.save_details(req.into_inner()).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "message": "GitHub details saved successfully" })),
        Err(e) => error_response(&data, "Export", e),
    }
}

#[derive(Deserialize)]
struct OwnerQuery {
    owner: String,
}

#[get("/get_github_details")]
async fn get_github_details(data: web::Data<HttpState>, query: web::Query<OwnerQuery>) -> impl Responder {
    match data.app.export.get_details(&query.owner).await {
        Ok(details) => HttpResponse::Ok().json(details),
        Err(e) => error_response(&data, "Export", e),
    }
}

#[put("/edit_github_details")]
async fn edit_github_details(
    data: web::Data<HttpState>,
    req: web::Json<ExportCredentials>,
) -> impl Responder {
    match data.app.export.update_details(req.into_inner()).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "message": "GitHub details updated successfully" })),
        Err(e) => error_response(&data, "Export", e),
    }
}

#[post("/export_script")]
async fn export_script(data: web::Data<HttpState>, req: web::Json<ScriptExport>) -> impl Responder {
    match data.app.export.export(req.into_inner()).await {
        Ok(message) => {
            add_log(&data.logs, "INFO", "Export", &message);
            HttpResponse::Ok().json(json!({ "message": message }))
        }
        Err(e) => error_response(&data, "Export", e),
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    HttpResponse::Ok().json(&*logs)
}

/// Route table shared by the server and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
        .app_data(web::JsonConfig::default().limit(MAX_BODY_BYTES))
        .service(get_logs)
        .service(
            web::scope("/api_testing_save")
                .service(test_api)
                .service(health)
                .service(api_details),
        )
        .service(
            web::scope("/api_management")
                .service(upload_individual)
                .service(upload_file)
                .service(upload_text)
                .service(list_apis)
                .service(delete_api),
        )
        .service(
            web::scope("/api/script")
                .service(generate_script)
                .service(upload_api_requests)
                .service(save_github_details)
                .service(get_github_details)
                .service(edit_github_details)
                .service(export_script),
        );
}

pub fn start_server(app: Arc<AppState>, logs: LogRing, server: &ServerConfig) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState { app, logs });

    let http = HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((server.host.as_str(), server.port))?
    .run();

    info!(host = %server.host, port = server.port, "HTTP server listening");
    Ok(http)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::ScriptedLlm;
    use crate::infrastructure::config::AppConfig;
    use crate::infrastructure::db::connection::init_db;
    use actix_web::test;
    use serde_json::Value;

    async fn state_with(stub: Arc<ScriptedLlm>) -> web::Data<HttpState> {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let app = AppState::build(&AppConfig::default(), pool, stub);
        web::Data::new(HttpState {
            app: Arc::new(app),
            logs: new_log_ring(),
        })
    }

    macro_rules! service {
        ($state:expr) => {
            test::init_service(App::new().app_data($state.clone()).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn test_health() {
        let state = state_with(ScriptedLlm::replying(vec![])).await;
        let app = service!(state);
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api_testing_save/health").to_request(),
        )
        .await;
        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "status": "healthy" }));
    }

    #[actix_web::test]
    async fn test_malformed_generation_maps_to_bad_gateway_with_raw_text() {
        let state = state_with(ScriptedLlm::replying(vec![Ok(
            "I cannot help with that.".to_string(),
        )]))
        .await;
        let app = service!(state);
        let req = test::TestRequest::post()
            .uri("/api_testing_save/test-api")
            .set_json(json!({
                "api_name": "Users",
                "api_url": "http://127.0.0.1:1/users",
                "http_method": "GET",
                "user_id": "user-1",
                "is_previous": true
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["detail"].as_str().unwrap().contains("not a valid JSON array"));
        assert_eq!(body["raw"], "I cannot help with that.");
    }

    #[actix_web::test]
    async fn test_upload_list_and_delete() {
        let state = state_with(ScriptedLlm::replying(vec![])).await;
        let app = service!(state);

        let csv = "api_name,api_url,http_method\nOrders,https://api.example.com/orders,GET\n";
        let req = test::TestRequest::post()
            .uri("/api_management/upload/file?user_id=user-1&file_name=apis.csv")
            .set_payload(csv)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "success");
        let api_id = body["apis"][0]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api_management/apis?user_id=user-1")
            .to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["http_method"], "GET");

        let req = test::TestRequest::delete()
            .uri(&format!("/api_management/apis/{}", api_id))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::delete()
            .uri("/api_management/apis/not-a-uuid")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_web::test]
    async fn test_missing_details_is_not_found_and_logged() {
        let state = state_with(ScriptedLlm::replying(vec![])).await;
        let app = service!(state);
        let req = test::TestRequest::get()
            .uri("/api_testing_save/api/details")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );

        let req = test::TestRequest::get().uri("/logs").to_request();
        let logs: Vec<LogEntry> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, "WARN");
    }

    #[actix_web::test]
    async fn test_generate_script_for_stored_endpoint() {
        let state = state_with(ScriptedLlm::replying(vec![Ok(
            "```python\nassert True\n```".to_string(),
        )]))
        .await;
        let app = service!(state);

        let req = test::TestRequest::post()
            .uri("/api_management/upload/individual")
            .set_json(json!({
                "api_name": "Users",
                "api_url": "https://api.example.com/users",
                "http_method": "get",
                "user_id": "user-1"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let api_id = body["api"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!(
                "/api/script/generate_script?api_id={}&language=python&framework=pytest",
                api_id
            ))
            .to_request();
        let script: GeneratedScript = test::call_and_read_body_json(&app, req).await;
        assert_eq!(script.script, "assert True");
    }

    #[actix_web::test]
    async fn test_log_ring_keeps_last_hundred() {
        let logs = new_log_ring();
        for n in 0..105 {
            add_log(&logs, "INFO", "Test", &format!("entry {}", n));
        }
        let logs = logs.lock().unwrap();
        assert_eq!(logs.len(), LOG_CAPACITY);
        assert_eq!(logs.front().unwrap().message, "entry 5");
    }
}
