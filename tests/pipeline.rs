//! End-to-end runs of the pipeline with stub identity stages and a local
//! HTTP endpoint standing in for API Gateway.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cognito_gateway_cli::pipeline::{CredentialExchanger, RequestInvoker, UserAuthenticator};
use cognito_gateway_cli::request::ApiRequest;
use cognito_gateway_cli::{
    BridgeError, FederatedCredentials, IdentityAssertion, InvocationResult, Pipeline,
    SignedApiInvoker, UserCredentials,
};
use cognito_gateway_cli::gateway::EndpointConfig;

struct StubAuthenticator {
    expected_password: String,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl UserAuthenticator for StubAuthenticator {
    async fn authenticate(&self, login: &UserCredentials) -> Result<IdentityAssertion, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if login.password == self.expected_password {
            Ok(IdentityAssertion {
                identity_token: "id-jwt".to_string(),
                access_token: "access-jwt".to_string(),
            })
        } else {
            Err(BridgeError::AuthenticationRejected(
                "Incorrect username or password.".to_string(),
            ))
        }
    }
}

struct StubExchanger {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CredentialExchanger for StubExchanger {
    async fn exchange(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<FederatedCredentials, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(assertion.identity_token, "id-jwt");
        Ok(FederatedCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "session-token".to_string(),
            expiration: None,
        })
    }
}

/// Counts invocations and remembers what the pipeline handed over.
struct RecordingInvoker {
    calls: Arc<AtomicUsize>,
    result: InvocationResult,
}

#[async_trait]
impl RequestInvoker for RecordingInvoker {
    async fn invoke(
        &self,
        credentials: &FederatedCredentials,
        assertion: &IdentityAssertion,
        _request: &ApiRequest,
    ) -> Result<InvocationResult, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(credentials.access_key_id, "AKIDEXAMPLE");
        assert_eq!(assertion.access_token, "access-jwt");
        Ok(self.result.clone())
    }
}

fn get_items() -> ApiRequest {
    ApiRequest {
        path_template: "/items".to_string(),
        method: Method::GET,
        params: BTreeMap::new(),
        headers: BTreeMap::new(),
        query: BTreeMap::new(),
        body: json!({}),
    }
}

fn alice(password: &str) -> UserCredentials {
    UserCredentials {
        username: "alice".to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn a_successful_run_walks_all_three_stages_once() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let exchange_calls = Arc::new(AtomicUsize::new(0));
    let invoke_calls = Arc::new(AtomicUsize::new(0));

    let pipeline = Pipeline::new(
        StubAuthenticator {
            expected_password: "correct".to_string(),
            calls: auth_calls.clone(),
        },
        StubExchanger {
            calls: exchange_calls.clone(),
        },
        RecordingInvoker {
            calls: invoke_calls.clone(),
            result: InvocationResult {
                status: 200,
                status_text: "OK".to_string(),
                data: json!({"items": []}),
            },
        },
    );

    let result = pipeline.run(&alice("correct"), &get_items()).await.unwrap();

    assert_eq!(result.status, 200);
    assert_eq!(auth_calls.load(Ordering::SeqCst), 1);
    assert_eq!(exchange_calls.load(Ordering::SeqCst), 1);
    assert_eq!(invoke_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_credentials_stop_the_run_before_the_exchange() {
    let auth_calls = Arc::new(AtomicUsize::new(0));
    let exchange_calls = Arc::new(AtomicUsize::new(0));
    let invoke_calls = Arc::new(AtomicUsize::new(0));

    let pipeline = Pipeline::new(
        StubAuthenticator {
            expected_password: "correct".to_string(),
            calls: auth_calls.clone(),
        },
        StubExchanger {
            calls: exchange_calls.clone(),
        },
        RecordingInvoker {
            calls: invoke_calls.clone(),
            result: InvocationResult {
                status: 200,
                status_text: "OK".to_string(),
                data: json!({}),
            },
        },
    );

    let err = pipeline.run(&alice("wrong"), &get_items()).await.unwrap_err();

    match err {
        BridgeError::AuthenticationRejected(message) => {
            assert_eq!(message, "Incorrect username or password.")
        }
        other => panic!("expected AuthenticationRejected, got {other:?}"),
    }
    assert_eq!(auth_calls.load(Ordering::SeqCst), 1);
    assert_eq!(exchange_calls.load(Ordering::SeqCst), 0);
    assert_eq!(invoke_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exchange_failure_halts_before_any_request_is_built() {
    struct FailingExchanger;

    #[async_trait]
    impl CredentialExchanger for FailingExchanger {
        async fn exchange(
            &self,
            _assertion: &IdentityAssertion,
        ) -> Result<FederatedCredentials, BridgeError> {
            Err(BridgeError::CredentialExchangeFailed(
                "Invalid login token.".to_string(),
            ))
        }
    }

    let invoke_calls = Arc::new(AtomicUsize::new(0));
    let pipeline = Pipeline::new(
        StubAuthenticator {
            expected_password: "correct".to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        },
        FailingExchanger,
        RecordingInvoker {
            calls: invoke_calls.clone(),
            result: InvocationResult {
                status: 200,
                status_text: "OK".to_string(),
                data: json!({}),
            },
        },
    );

    let err = pipeline.run(&alice("correct"), &get_items()).await.unwrap_err();
    assert!(matches!(err, BridgeError::CredentialExchangeFailed(_)));
    assert_eq!(invoke_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn end_to_end_success_prints_the_uniform_result_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(
        StubAuthenticator {
            expected_password: "correct".to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        },
        StubExchanger {
            calls: Arc::new(AtomicUsize::new(0)),
        },
        SignedApiInvoker::new(
            EndpointConfig {
                invoke_url: server.uri(),
                region: "us-east-1".to_string(),
                api_key: None,
            },
            None,
        ),
    );

    let result = pipeline.run(&alice("correct"), &get_items()).await.unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"status": 200, "statusText": "OK", "data": {"items": []}})
    );
}

#[tokio::test]
async fn a_rejected_password_never_reaches_the_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(
        StubAuthenticator {
            expected_password: "correct".to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        },
        StubExchanger {
            calls: Arc::new(AtomicUsize::new(0)),
        },
        SignedApiInvoker::new(
            EndpointConfig {
                invoke_url: server.uri(),
                region: "us-east-1".to_string(),
                api_key: None,
            },
            None,
        ),
    );

    let err = pipeline.run(&alice("wrong"), &get_items()).await.unwrap_err();
    assert!(matches!(err, BridgeError::AuthenticationRejected(_)));

    let received = server.received_requests().await.unwrap();
    assert!(received.is_empty());
}
