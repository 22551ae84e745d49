use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tools::{
    tool_definitions, Toolbox, AUTH_REQUIRED, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND,
};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const INVALID_REQUEST: i64 = -32600;

// ============================================================
// JSON-RPC envelope
// ============================================================

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Flat `{tool, arguments}` calling convention.
#[derive(Debug, Deserialize)]
pub struct LegacyCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Value,
}

/// Only presence is checked; the value is not validated.
fn has_api_key(headers: &HeaderMap) -> bool {
    headers.contains_key(API_KEY_HEADER)
}

// ============================================================
// Health and discovery
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

pub async fn list_tools() -> impl IntoResponse {
    Json(json!({ "tools": tool_definitions() }))
}

// ============================================================
// JSON-RPC endpoint
// ============================================================

pub async fn rpc(
    State(toolbox): State<Toolbox>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if body.get("tool").is_some() && body.get("method").is_none() {
        return match serde_json::from_value::<LegacyCall>(body) {
            Ok(call) => legacy_call(&toolbox, &headers, call).await,
            Err(e) => Json(RpcResponse::error(
                Value::Null,
                INVALID_REQUEST,
                format!("Invalid request: {}", e),
            ))
            .into_response(),
        };
    }

    let request: RpcRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejected malformed JSON-RPC request: {}", e);
            return Json(RpcResponse::error(
                Value::Null,
                INVALID_REQUEST,
                format!("Invalid request: {}", e),
            ))
            .into_response();
        }
    };

    if request.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
        tracing::debug!("Client sent jsonrpc version {:?}", request.jsonrpc);
    }

    let id = request.id.clone().unwrap_or(Value::Null);
    tracing::debug!("JSON-RPC method '{}'", request.method);

    let response = match request.method.as_str() {
        "initialize" => RpcResponse::result(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": { "name": "vishkar", "version": env!("CARGO_PKG_VERSION") }
            }),
        ),
        "notifications/initialized" => return StatusCode::NO_CONTENT.into_response(),
        "tools/list" => RpcResponse::result(id, json!({ "tools": tool_definitions() })),
        "ping" => RpcResponse::result(id, json!({})),
        "tools/call" => call_tool(&toolbox, &headers, id, request.params).await,
        other => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
    };

    Json(response).into_response()
}

async fn call_tool(
    toolbox: &Toolbox,
    headers: &HeaderMap,
    id: Value,
    params: Option<Value>,
) -> RpcResponse {
    if !has_api_key(headers) {
        tracing::warn!("tools/call without X-API-Key header");
        return RpcResponse::error(
            id,
            AUTH_REQUIRED,
            "Authentication required: X-API-Key header is missing",
        );
    }

    let params: CallParams = match params.map(serde_json::from_value).transpose() {
        Ok(params) => params.unwrap_or(CallParams {
            name: None,
            arguments: Value::Null,
        }),
        Err(e) => return RpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
    };

    let Some(name) = params.name.filter(|n| !n.trim().is_empty()) else {
        return RpcResponse::error(id, INVALID_PARAMS, "Missing tool name");
    };

    match toolbox.call(&name, params.arguments).await {
        Ok(reply) => {
            let mut result = json!({
                "content": [{ "type": "text", "text": reply.text() }]
            });
            if reply.is_error {
                result["isError"] = Value::Bool(true);
            }
            RpcResponse::result(id, result)
        }
        Err(e) => {
            if e.code() == INTERNAL_ERROR {
                tracing::error!("Tool '{}' failed: {}", name, e);
            } else {
                tracing::warn!("Tool '{}' rejected: {}", name, e);
            }
            RpcResponse::error(id, e.code(), e.to_string())
        }
    }
}

async fn legacy_call(toolbox: &Toolbox, headers: &HeaderMap, call: LegacyCall) -> Response {
    if !has_api_key(headers) {
        tracing::warn!("Legacy call to '{}' without X-API-Key header", call.tool);
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "tool": call.tool,
                "error": "Authentication required: X-API-Key header is missing"
            })),
        )
            .into_response();
    }

    let body = match toolbox.call(&call.tool, call.arguments).await {
        Ok(reply) => json!({
            "success": !reply.is_error,
            "tool": call.tool,
            "result": reply.payload
        }),
        Err(e) => json!({
            "success": false,
            "tool": call.tool,
            "error": e.to_string()
        }),
    };

    if call.jsonrpc.is_some() {
        let id = call.id.unwrap_or(Value::Null);
        return Json(RpcResponse::result(id, body)).into_response();
    }
    Json(body).into_response()
}
