//! Line-delimited JSON-RPC 2.0 over stdio.
//!
//! One request per line on stdin, one response per line on stdout. Requests
//! without an `id` member are notifications and get no response; `"id": null`
//! is still answered.

use std::fmt::Write as _;

use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use docvault_core::{Error, ErrorKind};
use docvault_engine::Archive;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const NOT_FOUND: i64 = -32004;

const PROTOCOL_VERSION: &str = "2024-11-05";

const INDEX_URI: &str = "docvault://index";
const DOCUMENT_URI_PREFIX: &str = "docvault://documents/";

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// `Some` for any id member that is present, including `null`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self { Self { code, message: message.into(), data: None } }

    fn invalid_params(e: impl std::fmt::Display) -> Self { Self::new(INVALID_PARAMS, format!("Invalid params: {e}")) }
}

impl From<Error> for RpcError {
    fn from(e: Error) -> Self {
        Self { code: error_code(&e), message: e.to_string(), data: Some(json!({ "kind": e.kind() })) }
    }
}

/// JSON-RPC error code for an archive error.
pub fn error_code(e: &Error) -> i64 {
    match e.kind() {
        ErrorKind::NotFound => NOT_FOUND,
        ErrorKind::EmptyQuery | ErrorKind::InvalidArgument => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    }
}

#[derive(Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Deserialize)]
struct IdArgs {
    id: String,
}

#[derive(Deserialize)]
struct ReadResource {
    uri: String,
}

pub async fn serve(archive: &Archive) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    info!(archive = archive.name(), "serving JSON-RPC on stdio");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = handle_line(archive, &line).await {
            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            stdout.write_all(out.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    info!("stdin closed, stopping");
    Ok(())
}

/// Handle one raw request line; `None` for notifications.
pub async fn handle_line(archive: &Archive, line: &str) -> Option<Value> {
    let raw: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Some(error_response(Value::Null, RpcError::new(PARSE_ERROR, format!("Parse error: {e}")))),
    };
    let request: Request = match serde_json::from_value(raw) {
        Ok(r) => r,
        Err(e) => return Some(error_response(Value::Null, RpcError::new(INVALID_REQUEST, format!("Invalid request: {e}")))),
    };
    debug!(method = %request.method, "rpc request");

    let outcome = dispatch(archive, &request.method, request.params).await;
    let id = request.id?;
    Some(match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(e) => error_response(id, e),
    })
}

fn error_response(id: Value, e: RpcError) -> Value {
    let mut error = json!({ "code": e.code, "message": e.message });
    if let Some(data) = e.data {
        error["data"] = data;
    }
    json!({ "jsonrpc": "2.0", "id": id, "error": error })
}

async fn dispatch(archive: &Archive, method: &str, params: Value) -> Result<Value, RpcError> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": { "name": archive.name(), "version": env!("CARGO_PKG_VERSION") },
            "capabilities": { "tools": {}, "resources": {} },
        })),
        "tools/list" => Ok(json!({ "tools": tool_descriptors() })),
        "tools/call" => {
            let call: ToolCall = serde_json::from_value(params).map_err(RpcError::invalid_params)?;
            let result = call_tool(archive, &call.name, call.arguments).await?;
            let text = serde_json::to_string_pretty(&result).map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))?;
            Ok(json!({
                "content": [{ "type": "text", "text": text }],
                "structuredContent": result,
            }))
        }
        "resources/list" => Ok(json!({ "resources": resource_descriptors(archive).await })),
        "resources/read" => {
            let read: ReadResource = serde_json::from_value(params).map_err(RpcError::invalid_params)?;
            let text = read_resource(archive, &read.uri).await?;
            Ok(json!({ "contents": [{ "uri": read.uri, "mimeType": "text/plain", "text": text }] }))
        }
        "context/get" => to_value(archive.context().await),
        other => Err(RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {other}"))),
    }
}

async fn call_tool(archive: &Archive, name: &str, arguments: Value) -> Result<Value, RpcError> {
    match name {
        "search_documents" => {
            let args: SearchArgs = serde_json::from_value(arguments).map_err(RpcError::invalid_params)?;
            let top_k = args.top_k.unwrap_or_else(|| archive.default_top_k());
            let results = archive.search(&args.query, top_k).await?;
            Ok(json!({ "results": results }))
        }
        "get_document" => {
            let args: IdArgs = serde_json::from_value(arguments).map_err(RpcError::invalid_params)?;
            to_value(archive.get_document(&args.id).await?)
        }
        "list_documents" => Ok(json!({ "documents": archive.list_documents().await })),
        "summarize_document" => {
            let args: IdArgs = serde_json::from_value(arguments).map_err(RpcError::invalid_params)?;
            to_value(archive.summarize_document(&args.id).await?)
        }
        other => Err(RpcError::invalid_params(format!("unknown tool '{other}'"))),
    }
}

async fn resource_descriptors(archive: &Archive) -> Vec<Value> {
    let mut resources = vec![json!({
        "uri": INDEX_URI,
        "name": "Archive index",
        "description": format!("Every document in {}", archive.name()),
        "mimeType": "text/plain",
    })];
    for doc in archive.list_documents().await {
        resources.push(json!({
            "uri": format!("{DOCUMENT_URI_PREFIX}{}", doc.id),
            "name": doc.filename,
            "description": doc.summary,
            "mimeType": "text/plain",
        }));
    }
    resources
}

async fn read_resource(archive: &Archive, uri: &str) -> Result<String, RpcError> {
    if uri == INDEX_URI {
        return Ok(index_text(archive).await);
    }
    match uri.strip_prefix(DOCUMENT_URI_PREFIX) {
        Some(id) if !id.is_empty() => Ok(archive.get_document(id).await?.content),
        _ => Err(RpcError::invalid_params(format!("unknown resource '{uri}'"))),
    }
}

async fn index_text(archive: &Archive) -> String {
    let docs = archive.list_documents().await;
    let mut text = format!("Document archive: {}\n\n", archive.name());
    for doc in &docs {
        let _ = writeln!(text, "- {} ({} chars, {} words)", doc.filename, doc.char_count, doc.word_count);
    }
    let _ = write!(text, "\nTotal documents: {}", docs.len());
    text
}

fn to_value<T: serde::Serialize>(v: T) -> Result<Value, RpcError> {
    serde_json::to_value(v).map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))
}

fn tool_descriptors() -> Value {
    json!([
        {
            "name": "search_documents",
            "description": "Semantic search over archived documents",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "top_k": { "type": "integer", "minimum": 1 }
                },
                "required": ["query"]
            }
        },
        {
            "name": "get_document",
            "description": "Full document by id",
            "inputSchema": { "type": "object", "properties": { "id": { "type": "string" } }, "required": ["id"] }
        },
        {
            "name": "list_documents",
            "description": "All documents in ingestion order",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "summarize_document",
            "description": "Short summary of a document",
            "inputSchema": { "type": "object", "properties": { "id": { "type": "string" } }, "required": ["id"] }
        }
    ])
}
