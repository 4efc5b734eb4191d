//! Servidor web Axum com WebSocket para anotação de entidades por regras

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use ruler_core::{
    demo::{demo_patterns, demo_texts},
    EntityPattern, EntityRuler, EntitySpan, Pipeline, PipelineEvent, RulerConfig, RulerError, Token,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const RULER: &str = "entity_ruler";
const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Estado compartilhado da aplicação
struct AppState {
    pipeline: RwLock<Pipeline>,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    text: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    entities: Vec<EntitySpan>,
    tokens: Vec<Token>,
    iob_tags: Vec<String>,
    total_tokens: usize,
    processing_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

#[derive(Serialize)]
struct PatternsSummary {
    added: usize,
    total: usize,
}

/// Monta o pipeline com um entity ruler: padrões de demonstração ou, se
/// `patterns_path` for dado, os padrões salvos nesse caminho.
fn build_pipeline(patterns_path: Option<PathBuf>) -> ruler_core::Result<Pipeline> {
    let mut ruler = EntityRuler::with_patterns(RulerConfig::default(), demo_patterns()?)?;
    if let Some(path) = patterns_path {
        ruler.from_disk(&path)?;
        info!(path = %path.display(), patterns = ruler.len(), "padrões carregados");
    }
    let mut pipeline = Pipeline::new();
    pipeline.add_pipe(RULER, ruler)?;
    Ok(pipeline)
}

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/analyze", post(analyze_handler))
        .route(
            "/patterns",
            get(list_patterns_handler)
                .post(add_patterns_handler)
                .delete(clear_patterns_handler),
        )
        .route("/labels", get(labels_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr = std::env::var("RULER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let patterns_path = std::env::var_os("RULER_PATTERNS").map(PathBuf::from);

    let pipeline = build_pipeline(patterns_path)?;
    let state = Arc::new(AppState {
        pipeline: RwLock::new(pipeline),
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Servidor do entity ruler iniciado em http://{addr}");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Converte erros do ruler em respostas HTTP
fn error_response(err: RulerError) -> Response {
    let (status, details) = match &err {
        RulerError::PatternValidation { errors } => (StatusCode::UNPROCESSABLE_ENTITY, errors.clone()),
        e if e.is_value_error() => (StatusCode::UNPROCESSABLE_ENTITY, Vec::new()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Vec::new()),
    };
    if status.is_server_error() {
        error!("{err}");
    } else {
        warn!("{err}");
    }
    (
        status,
        Json(serde_json::json!({"error": err.to_string(), "details": details})),
    )
        .into_response()
}

fn missing_ruler() -> Response {
    error_response(RulerError::UnknownComponent(RULER.to_string()))
}

/// Retorna a página principal HTML
async fn index_handler() -> impl IntoResponse {
    Html(include_str!("templates/index.html"))
}

/// Análise via HTTP POST (sem streaming)
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    if req.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Texto vazio"})),
        )
            .into_response();
    }

    let start = std::time::Instant::now();
    let pipeline = state.pipeline.read().await;
    let doc = match pipeline.analyze(&req.text) {
        Ok(doc) => doc,
        Err(err) => return error_response(err),
    };
    let warning = pipeline
        .get_pipe::<EntityRuler>(RULER)
        .filter(|ruler| ruler.is_empty())
        .map(|_| "entity ruler sem padrões; nenhuma entidade adicionada".to_string());

    Json(AnalyzeResponse {
        entities: doc.entity_spans(),
        iob_tags: doc.iob_tags(),
        total_tokens: doc.len(),
        tokens: doc.tokens().to_vec(),
        processing_ms: start.elapsed().as_millis() as u64,
        warning,
    })
    .into_response()
}

/// Lista os padrões carregados
async fn list_patterns_handler(State(state): State<Arc<AppState>>) -> Response {
    let pipeline = state.pipeline.read().await;
    match pipeline.get_pipe::<EntityRuler>(RULER) {
        Some(ruler) => Json(ruler.patterns()).into_response(),
        None => missing_ruler(),
    }
}

/// Adiciona padrões ao ruler (lote tudo-ou-nada)
async fn add_patterns_handler(
    State(state): State<Arc<AppState>>,
    Json(patterns): Json<Vec<EntityPattern>>,
) -> Response {
    let mut pipeline = state.pipeline.write().await;
    let Some(ruler) = pipeline.get_pipe_mut::<EntityRuler>(RULER) else {
        return missing_ruler();
    };
    let before = ruler.len();
    match ruler.add_patterns(patterns) {
        Ok(()) => {
            let summary = PatternsSummary {
                added: ruler.len() - before,
                total: ruler.len(),
            };
            info!(added = summary.added, total = summary.total, "padrões adicionados via HTTP");
            Json(summary).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// Remove todos os padrões
async fn clear_patterns_handler(State(state): State<Arc<AppState>>) -> Response {
    let mut pipeline = state.pipeline.write().await;
    match pipeline.get_pipe_mut::<EntityRuler>(RULER) {
        Some(ruler) => {
            ruler.clear();
            info!("padrões removidos");
            Json(PatternsSummary { added: 0, total: 0 }).into_response()
        }
        None => missing_ruler(),
    }
}

/// Labels e ids conhecidos
async fn labels_handler(State(state): State<Arc<AppState>>) -> Response {
    let pipeline = state.pipeline.read().await;
    match pipeline.get_pipe::<EntityRuler>(RULER) {
        Some(ruler) => Json(serde_json::json!({
            "labels": ruler.labels(),
            "ent_ids": ruler.ent_ids(),
        }))
        .into_response(),
        None => missing_ruler(),
    }
}

/// Retorna textos de demonstração
async fn demo_texts_handler() -> impl IntoResponse {
    let texts: Vec<serde_json::Value> = demo_texts()
        .iter()
        .map(|(domain, text)| {
            serde_json::json!({
                "domain": domain,
                "text": text
            })
        })
        .collect();
    Json(texts)
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Texto a analisar em uma mensagem do WebSocket: JSON `{text}` ou texto puro.
///
/// O texto não é aparado: os offsets devolvidos se referem a ele exatamente
/// como foi enviado.
fn ws_text(message: String) -> Option<String> {
    let text = match serde_json::from_str::<AnalyzeRequest>(&message) {
        Ok(req) => req.text,
        Err(_) => message,
    };
    (!text.trim().is_empty()).then_some(text)
}

/// Lógica do WebSocket: recebe texto, executa o pipeline e envia os eventos
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let Some(text) = ws_text(text) else {
                    continue;
                };

                info!("Analisando via WebSocket: {} chars", text.len());

                // O pipeline é síncrono: roda fora do runtime
                let (tx, rx) = std::sync::mpsc::channel::<PipelineEvent>();
                let state = Arc::clone(&state);
                let handle = tokio::task::spawn_blocking(move || {
                    state.pipeline.blocking_read().analyze_streaming(&text, tx);
                });
                if let Err(err) = handle.await {
                    error!("pipeline interrompido: {err}");
                    continue;
                }

                let events: Vec<PipelineEvent> = rx.try_iter().collect();
                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json)).await.is_err() {
                            return; // cliente desconectou
                        }
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let pipeline = build_pipeline(None).unwrap();
        app(Arc::new(AppState {
            pipeline: RwLock::new(pipeline),
        }))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn analyze_returns_entities() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/analyze",
                serde_json::json!({"text": "O Nubank tem sede em São Paulo."}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let entities = body["entities"].as_array().unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0]["text"], "Nubank");
        assert_eq!(entities[0]["ent_id"], "nubank");
        assert_eq!(entities[1]["label"], "LOC");
        assert!(body.get("warning").is_none());
    }

    #[tokio::test]
    async fn analyze_rejects_empty_text() {
        let response = test_app()
            .oneshot(json_request("POST", "/analyze", serde_json::json!({"text": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_patterns_return_422() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/patterns",
                serde_json::json!([{"label": "HELLO", "pattern": [{"ASDF": "HELLO"}]}]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("ASDF"));
    }

    #[tokio::test]
    async fn add_then_clear_patterns() {
        let pipeline = build_pipeline(None).unwrap();
        let state = Arc::new(AppState {
            pipeline: RwLock::new(pipeline),
        });
        let total = demo_patterns().unwrap().len();

        let response = app(state.clone())
            .oneshot(json_request(
                "POST",
                "/patterns",
                serde_json::json!([
                    {"label": "HELLO", "pattern": "hello world"},
                    {"label": "HELLO", "pattern": "hello world"}
                ]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["added"], 1);
        assert_eq!(body["total"], total + 1);

        let response = app(state.clone())
            .oneshot(Request::builder().method("DELETE").uri("/patterns").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(state)
            .oneshot(json_request("POST", "/analyze", serde_json::json!({"text": "hello world"})))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert!(body["entities"].as_array().unwrap().is_empty());
        assert!(body["warning"].is_string());
    }

    #[test]
    fn ws_text_keeps_surrounding_whitespace() {
        let text = ws_text(r#"{"text": "  Nubank em Paris"}"#.to_string()).unwrap();
        assert_eq!(text, "  Nubank em Paris");
        assert_eq!(ws_text("\n Paris".to_string()).as_deref(), Some("\n Paris"));
        assert_eq!(ws_text(r#"{"text": "   "}"#.to_string()), None);
        assert_eq!(ws_text(String::new()), None);
    }

    #[tokio::test]
    async fn offsets_refer_to_untrimmed_text() {
        let text = "   O Nubank";
        let response = test_app()
            .oneshot(json_request("POST", "/analyze", serde_json::json!({"text": text})))
            .await
            .unwrap();
        let body = body_json(response).await;
        let entity = &body["entities"][0];
        let (start, end) = (entity["start"].as_u64().unwrap() as usize, entity["end"].as_u64().unwrap() as usize);
        assert_eq!(&text[start..end], "Nubank");
    }

    #[tokio::test]
    async fn labels_lists_demo_labels() {
        let response = test_app()
            .oneshot(Request::builder().uri("/labels").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["labels"], serde_json::json!(["ORG", "LOC", "PER", "DATE"]));
        assert!(body["ent_ids"].as_array().unwrap().iter().any(|id| id == "stf"));
    }
}
