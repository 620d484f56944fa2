//! Identity-pool exchange: trade a user-pool identity token for temporary
//! AWS credentials scoped to the pool's trust policy.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cognitoidentity::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cognitoidentity::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::auth::IdentityAssertion;
use crate::error::BridgeError;
use crate::pipeline::CredentialExchanger;

/// The identity pool to exchange against. The user pool id is part of the
/// login-map key, so the exchange is bound to the pool the assertion came
/// from.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub identity_pool_id: String,
    pub user_pool_id: String,
    pub region: String,
}

/// Temporary credentials handed out by the broker. Valid until their
/// embedded expiry; this tool signs one request with them and exits.
#[derive(Debug, Clone)]
pub struct FederatedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: Option<DateTime<Utc>>,
}

/// Login-map key the broker recognizes the user pool by. The exact string
/// shape is a wire-compatibility requirement, not a convention.
pub fn login_provider_key(region: &str, user_pool_id: &str) -> String {
    format!("cognito-idp.{region}.amazonaws.com/{user_pool_id}")
}

pub struct IdentityPoolExchanger {
    client: Client,
    config: PoolConfig,
}

impl IdentityPoolExchanger {
    /// GetId/GetCredentialsForIdentity are unsigned APIs; no credential
    /// provider in the SDK config.
    pub async fn new(config: PoolConfig) -> Self {
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
impl CredentialExchanger for IdentityPoolExchanger {
    async fn exchange(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<FederatedCredentials, BridgeError> {
        info!("getting temporary credentials");

        let login_key = login_provider_key(&self.config.region, &self.config.user_pool_id);

        let identity = self
            .client
            .get_id()
            .identity_pool_id(&self.config.identity_pool_id)
            .logins(&login_key, &assertion.identity_token)
            .send()
            .await
            .map_err(exchange_error)?;

        let identity_id = identity.identity_id().ok_or_else(|| {
            BridgeError::CredentialExchangeFailed(
                "identity pool returned no identity id".to_string(),
            )
        })?;

        let output = self
            .client
            .get_credentials_for_identity()
            .identity_id(identity_id)
            .logins(&login_key, &assertion.identity_token)
            .send()
            .await
            .map_err(exchange_error)?;

        let credentials = output.credentials().ok_or_else(|| {
            BridgeError::CredentialExchangeFailed("broker returned no credentials".to_string())
        })?;

        let access_key_id = credentials.access_key_id().ok_or_else(|| {
            BridgeError::CredentialExchangeFailed("broker returned no access key id".to_string())
        })?;
        let secret_access_key = credentials.secret_key().ok_or_else(|| {
            BridgeError::CredentialExchangeFailed("broker returned no secret key".to_string())
        })?;
        let session_token = credentials.session_token().ok_or_else(|| {
            BridgeError::CredentialExchangeFailed("broker returned no session token".to_string())
        })?;

        let expiration = credentials
            .expiration()
            .and_then(|at| DateTime::from_timestamp(at.secs(), at.subsec_nanos()));
        if let Some(expiry) = expiration {
            debug!("temporary credentials expire at {expiry}");
        }

        Ok(FederatedCredentials {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: session_token.to_string(),
            expiration,
        })
    }
}

fn exchange_error<E>(err: SdkError<E>) -> BridgeError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match err {
        SdkError::ServiceError(ctx) => {
            let service = ctx.into_err();
            let message = service
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| service.to_string());
            BridgeError::CredentialExchangeFailed(message)
        }
        other => BridgeError::CredentialExchangeFailed(DisplayErrorContext(other).to_string()),
    }
}
