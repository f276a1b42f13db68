use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::AppendHeaders,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use uuid::Uuid;

/// What the server saw of a request, returned by `/echo`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub request_id: Uuid,
    pub method: String,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/ok", get(ok))
        .route("/slow/{millis}", get(slow))
        .route("/status/{code}", any(status))
        .route("/cookies", get(cookies))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> (HeaderMap, Json<Echo>) {
    let request_id = Uuid::new_v4();
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    let mut out = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        out.insert("x-request-id", value);
    }
    let echo = Echo {
        request_id,
        method: method.to_string(),
        headers: seen,
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    (out, Json(echo))
}

async fn ok() -> Json<Ack> {
    Json(Ack { ok: true })
}

async fn slow(Path(millis): Path<u64>) -> Json<Ack> {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(Ack { ok: true })
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn cookies() -> (AppendHeaders<[(header::HeaderName, &'static str); 2]>, Json<Ack>) {
    (
        AppendHeaders([(header::SET_COOKIE, "a=1"), (header::SET_COOKIE, "b=2")]),
        Json(Ack { ok: true }),
    )
}
