//! The signed invocation against the API Gateway endpoint: assemble, SigV4
//! sign, execute once, and fold whatever comes back into one result shape.

use std::collections::BTreeMap;
use std::time::SystemTime;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::auth::IdentityAssertion;
use crate::error::BridgeError;
use crate::federation::FederatedCredentials;
use crate::pipeline::RequestInvoker;
use crate::request::{build_url, merged_headers, ApiRequest};

/// API Gateway is the `execute-api` service as far as SigV4 is concerned.
const SIGNING_SERVICE: &str = "execute-api";

/// The endpoint to invoke and the region its signature must name.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub invoke_url: String,
    pub region: String,
    pub api_key: Option<String>,
}

/// Uniform view of the HTTP answer. Any response, 2xx or not, lands here;
/// only a missing response is an error. The same shape covers both so
/// operators can diff success against failure output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResult {
    pub status: u16,
    #[serde(rename = "statusText")]
    pub status_text: String,
    pub data: Value,
}

pub struct SignedApiInvoker {
    config: EndpointConfig,
    access_token_header: Option<String>,
    client: reqwest::Client,
}

impl SignedApiInvoker {
    pub fn new(config: EndpointConfig, access_token_header: Option<String>) -> Self {
        Self {
            config,
            access_token_header,
            client: reqwest::Client::new(),
        }
    }

    fn signed_request(
        &self,
        credentials: &FederatedCredentials,
        assertion: &IdentityAssertion,
        request: &ApiRequest,
    ) -> Result<reqwest::Request, BridgeError> {
        let url = build_url(&self.config.invoke_url, request)?;
        let mut headers = merged_headers(
            request,
            self.config.api_key.as_deref(),
            self.access_token_header.as_deref(),
            &assertion.access_token,
        );
        // The host header has to exist before signing so it is part of the
        // canonical request.
        headers.insert("host".to_string(), host_header(&url)?);

        let body = serde_json::to_vec(&request.body)
            .map_err(|err| BridgeError::Configuration(format!("cannot serialize body: {err}")))?;

        let mut http_request = to_http_request(&url, request, &headers, body.clone())?;

        let identity = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            Some(credentials.session_token.clone()),
            None,
            "cognito-identity",
        )
        .into();

        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.config.region)
            .name(SIGNING_SERVICE)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|err| BridgeError::RequestTransport(err.to_string()))?
            .into();

        let signable = SignableRequest::new(
            request.method.as_str(),
            url.as_str(),
            headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            SignableBody::Bytes(&body),
        )
        .map_err(|err| BridgeError::RequestTransport(err.to_string()))?;

        let (instructions, _signature) = sign(signable, &signing_params)
            .map_err(|err| BridgeError::RequestTransport(err.to_string()))?
            .into_parts();
        instructions.apply_to_request_http1x(&mut http_request);

        reqwest::Request::try_from(http_request)
            .map_err(|err| BridgeError::RequestTransport(err.to_string()))
    }
}

#[async_trait]
impl RequestInvoker for SignedApiInvoker {
    async fn invoke(
        &self,
        credentials: &FederatedCredentials,
        assertion: &IdentityAssertion,
        request: &ApiRequest,
    ) -> Result<InvocationResult, BridgeError> {
        info!("making api request");

        let signed = self.signed_request(credentials, assertion, request)?;

        let response = self
            .client
            .execute(signed)
            .await
            .map_err(|err| BridgeError::RequestTransport(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| BridgeError::RequestTransport(err.to_string()))?;

        Ok(result_from_parts(status, &bytes))
    }
}

fn host_header(url: &Url) -> Result<String, BridgeError> {
    let host = url
        .host_str()
        .ok_or_else(|| BridgeError::Configuration(format!("invoke url {url} has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn to_http_request(
    url: &Url,
    request: &ApiRequest,
    headers: &BTreeMap<String, String>,
    body: Vec<u8>,
) -> Result<http::Request<Vec<u8>>, BridgeError> {
    let mut builder = http::Request::builder()
        .method(request.method.clone())
        .uri(url.as_str());
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
        .body(body)
        .map_err(|err| BridgeError::Configuration(format!("cannot build request: {err}")))
}

/// `data` mirrors what the endpoint sent: parsed JSON when it is JSON, the
/// raw text otherwise, null for an empty body.
fn result_from_parts(status: reqwest::StatusCode, body: &[u8]) -> InvocationResult {
    let data = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
    };

    InvocationResult {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        data,
    }
}
