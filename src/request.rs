//! The request record the pipeline invokes, plus the pure assembly steps:
//! body resolution, path-template rendering and header merging. Everything
//! here runs before (or without) the network.

use std::collections::BTreeMap;
use std::fs;

use http::Method;
use reqwest::Url;
use serde_json::Value;

use crate::error::BridgeError;

/// One fully assembled API call. Built by the configuration loader; the
/// pipeline only augments the headers with the optional access-token
/// header before signing.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub path_template: String,
    pub method: Method,
    /// Substituted into `{name}` placeholders in the path template; keys
    /// without a placeholder become query parameters.
    pub params: BTreeMap<String, String>,
    /// Extra headers from `--additional-params`.
    pub headers: BTreeMap<String, String>,
    /// Extra query parameters from `--additional-params`.
    pub query: BTreeMap<String, String>,
    pub body: Value,
}

/// Resolves the raw `--body` argument: a leading `@` names a file whose
/// contents are the JSON body, anything else is parsed as JSON directly.
pub fn resolve_body(raw: &str) -> Result<Value, BridgeError> {
    let text = match raw.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| BridgeError::Configuration(format!("cannot read body file {path}: {err}")))?,
        None => raw.to_string(),
    };

    serde_json::from_str(&text)
        .map_err(|err| BridgeError::Configuration(format!("request body is not valid JSON: {err}")))
}

/// Renders the path template and splits off the params that had no
/// placeholder to substitute; those ride along as query parameters.
fn render_path(template: &str, params: &BTreeMap<String, String>) -> (String, Vec<(String, String)>) {
    let mut path = template.to_string();
    let mut leftover = Vec::new();

    for (key, value) in params {
        let placeholder = format!("{{{key}}}");
        if path.contains(&placeholder) {
            path = path.replace(&placeholder, value);
        } else {
            leftover.push((key.clone(), value.clone()));
        }
    }

    (path, leftover)
}

/// Joins the invoke URL with the rendered path and appends the query
/// parameters. The invoke URL may itself carry a stage path.
pub fn build_url(invoke_url: &str, request: &ApiRequest) -> Result<Url, BridgeError> {
    let (path, leftover) = render_path(&request.path_template, &request.params);

    let joined = format!(
        "{}/{}",
        invoke_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined)
        .map_err(|err| BridgeError::Configuration(format!("invalid request url {joined}: {err}")))?;

    if !leftover.is_empty() || !request.query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &leftover {
            pairs.append_pair(key, value);
        }
        for (key, value) in &request.query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

/// Final header set for the signed request. Later writes win for a
/// same-named key, but nothing already present is discarded: caller
/// headers first, then the JSON content type if absent, the API key, and
/// last the access-token header so its value always reaches the wire.
pub fn merged_headers(
    request: &ApiRequest,
    api_key: Option<&str>,
    access_token_header: Option<&str>,
    access_token: &str,
) -> BTreeMap<String, String> {
    let mut headers = request.headers.clone();

    if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
        headers.insert("content-type".to_string(), "application/json".to_string());
    }
    if let Some(key) = api_key {
        headers.insert("x-api-key".to_string(), key.to_string());
    }
    if let Some(name) = access_token_header {
        headers.insert(name.to_string(), access_token.to_string());
    }

    headers
}
