//! User-pool authentication: a username/password challenge against the
//! Cognito identity provider, answered with a short-lived token pair.

use std::fmt;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cognitoidentityprovider::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cognitoidentityprovider::operation::initiate_auth::{
    InitiateAuthError, InitiateAuthOutput,
};
use aws_sdk_cognitoidentityprovider::types::{AuthFlowType, ChallengeNameType};
use aws_sdk_cognitoidentityprovider::Client;
use tracing::info;

use crate::error::BridgeError;
use crate::pipeline::UserAuthenticator;

/// The user directory to authenticate against.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub user_pool_id: String,
    pub app_client_id: String,
    pub region: String,
}

/// The username/password pair. Used once to build the challenge, then
/// dropped with the settings; the Debug impl keeps the password out of
/// logs and error chains.
#[derive(Clone)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token pair proving a successful authentication. The identity token is
/// what the credential broker trusts; the access token can optionally be
/// forwarded to the downstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAssertion {
    pub identity_token: String,
    pub access_token: String,
}

pub struct CognitoAuthenticator {
    client: Client,
    config: DirectoryConfig,
}

impl CognitoAuthenticator {
    /// InitiateAuth is an unsigned API, so the SDK config carries no
    /// credential provider, only the pinned region.
    pub async fn new(config: DirectoryConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .no_credentials()
            .load()
            .await;

        Self {
            client: Client::new(&sdk_config),
            config,
        }
    }
}

#[async_trait]
impl UserAuthenticator for CognitoAuthenticator {
    async fn authenticate(&self, login: &UserCredentials) -> Result<IdentityAssertion, BridgeError> {
        info!("authenticating with user pool {}", self.config.user_pool_id);

        let outcome = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.config.app_client_id)
            .auth_parameters("USERNAME", &login.username)
            .auth_parameters("PASSWORD", &login.password)
            .send()
            .await;

        match outcome {
            Ok(output) => assertion_from_output(output),
            Err(err) => Err(classify_auth_error(err)),
        }
    }
}

/// Folds the provider's answer into a single tagged outcome: tokens on
/// success, a distinct error for the password-reset case, and a rejection
/// of every challenge-driven flow.
fn assertion_from_output(output: InitiateAuthOutput) -> Result<IdentityAssertion, BridgeError> {
    if let Some(challenge) = output.challenge_name() {
        return Err(match challenge {
            ChallengeNameType::NewPasswordRequired => BridgeError::NewPasswordRequired,
            other => BridgeError::ChallengeUnsupported(other.as_str().to_string()),
        });
    }

    let result = output.authentication_result().ok_or_else(|| {
        BridgeError::AuthenticationRejected("identity provider returned no tokens".to_string())
    })?;

    let identity_token = result.id_token().ok_or_else(|| {
        BridgeError::AuthenticationRejected("identity provider returned no id token".to_string())
    })?;
    let access_token = result.access_token().ok_or_else(|| {
        BridgeError::AuthenticationRejected("identity provider returned no access token".to_string())
    })?;

    Ok(IdentityAssertion {
        identity_token: identity_token.to_string(),
        access_token: access_token.to_string(),
    })
}

fn classify_auth_error(err: SdkError<InitiateAuthError>) -> BridgeError {
    match err {
        SdkError::ServiceError(ctx) => {
            let service = ctx.into_err();
            if service.is_password_reset_required_exception() {
                return BridgeError::NewPasswordRequired;
            }
            let message = service
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| service.to_string());
            BridgeError::AuthenticationRejected(message)
        }
        other => BridgeError::AuthenticationRejected(DisplayErrorContext(other).to_string()),
    }
}
