//! Resolution of the raw command line into the configuration record the
//! pipeline consumes. Everything that can be rejected without touching the
//! network is rejected here.

use std::collections::BTreeMap;

use http::Method;
use reqwest::Url;
use serde_json::{Map, Value};

use crate::auth::{DirectoryConfig, UserCredentials};
use crate::cli::Cli;
use crate::error::BridgeError;
use crate::federation::PoolConfig;
use crate::gateway::EndpointConfig;
use crate::request::{resolve_body, ApiRequest};

/// The finished configuration record: per-stage configs plus the fully
/// assembled request. The pipeline never mutates its shape.
#[derive(Debug)]
pub struct Settings {
    pub login: UserCredentials,
    pub directory: DirectoryConfig,
    pub pool: PoolConfig,
    pub endpoint: EndpointConfig,
    pub access_token_header: Option<String>,
    pub request: ApiRequest,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Self, BridgeError> {
        for (value, name) in [
            (&cli.username, "--username"),
            (&cli.password, "--password"),
            (&cli.user_pool_id, "--user-pool-id"),
            (&cli.app_client_id, "--app-client-id"),
            (&cli.identity_pool_id, "--identity-pool-id"),
            (&cli.invoke_url, "--invoke-url"),
            (&cli.path_template, "--path-template"),
        ] {
            if value.trim().is_empty() {
                return Err(BridgeError::Configuration(format!("{name} must not be empty")));
            }
        }

        let invoke_url = Url::parse(&cli.invoke_url)
            .map_err(|err| BridgeError::Configuration(format!("invalid invoke url: {err}")))?;
        if !matches!(invoke_url.scheme(), "http" | "https") {
            return Err(BridgeError::Configuration(format!(
                "invoke url must be http(s), got {}",
                invoke_url.scheme()
            )));
        }

        let method: Method = cli
            .method
            .to_ascii_uppercase()
            .parse()
            .map_err(|_| BridgeError::Configuration(format!("invalid method {}", cli.method)))?;

        let params = string_map(&parse_object(&cli.params, "--params")?);
        let additional = parse_object(&cli.additional_params, "--additional-params")?;
        let headers = string_map(&nested_object(&additional, "headers", "--additional-params")?);
        let query = string_map(&nested_object(
            &additional,
            "queryParams",
            "--additional-params",
        )?);

        let body = resolve_body(&cli.body)?;

        Ok(Self {
            login: UserCredentials {
                username: cli.username,
                password: cli.password,
            },
            directory: DirectoryConfig {
                user_pool_id: cli.user_pool_id.clone(),
                app_client_id: cli.app_client_id,
                region: cli.cognito_region.clone(),
            },
            pool: PoolConfig {
                identity_pool_id: cli.identity_pool_id,
                user_pool_id: cli.user_pool_id,
                region: cli.cognito_region,
            },
            endpoint: EndpointConfig {
                invoke_url: cli.invoke_url,
                region: cli.api_gateway_region,
                api_key: cli.api_key,
            },
            access_token_header: cli.access_token_header,
            request: ApiRequest {
                path_template: cli.path_template,
                method,
                params,
                headers,
                query,
                body,
            },
        })
    }
}

fn parse_object(raw: &str, option: &str) -> Result<Map<String, Value>, BridgeError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| BridgeError::Configuration(format!("{option} is not valid JSON: {err}")))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(BridgeError::Configuration(format!(
            "{option} must be a JSON object"
        ))),
    }
}

fn nested_object(
    parent: &Map<String, Value>,
    key: &str,
    option: &str,
) -> Result<Map<String, Value>, BridgeError> {
    match parent.get(key) {
        None => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(BridgeError::Configuration(format!(
            "{option}.{key} must be a JSON object"
        ))),
    }
}

/// JSON scalars are carried as their literal text; strings keep their
/// value without the surrounding quotes.
fn string_map(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}
