//! The three-stage sequence. Each stage is a trait so the chain can be
//! exercised against stub providers; the concrete implementations live in
//! `auth`, `federation` and `gateway`.

use async_trait::async_trait;

use crate::auth::{IdentityAssertion, UserCredentials};
use crate::error::BridgeError;
use crate::federation::FederatedCredentials;
use crate::gateway::InvocationResult;
use crate::request::ApiRequest;

#[async_trait]
pub trait UserAuthenticator: Send + Sync {
    async fn authenticate(&self, login: &UserCredentials) -> Result<IdentityAssertion, BridgeError>;
}

#[async_trait]
pub trait CredentialExchanger: Send + Sync {
    async fn exchange(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<FederatedCredentials, BridgeError>;
}

#[async_trait]
pub trait RequestInvoker: Send + Sync {
    async fn invoke(
        &self,
        credentials: &FederatedCredentials,
        assertion: &IdentityAssertion,
        request: &ApiRequest,
    ) -> Result<InvocationResult, BridgeError>;
}

/// Authenticate, exchange, invoke — strictly in that order, one network
/// operation in flight at a time, first error wins. The assertion and the
/// credentials are threaded through as values; no stage reaches for
/// ambient state.
pub struct Pipeline<A, E, I> {
    authenticator: A,
    exchanger: E,
    invoker: I,
}

impl<A, E, I> Pipeline<A, E, I>
where
    A: UserAuthenticator,
    E: CredentialExchanger,
    I: RequestInvoker,
{
    pub fn new(authenticator: A, exchanger: E, invoker: I) -> Self {
        Self {
            authenticator,
            exchanger,
            invoker,
        }
    }

    pub async fn run(
        &self,
        login: &UserCredentials,
        request: &ApiRequest,
    ) -> Result<InvocationResult, BridgeError> {
        let assertion = self.authenticator.authenticate(login).await?;
        let credentials = self.exchanger.exchange(&assertion).await?;
        self.invoker.invoke(&credentials, &assertion, request).await
    }
}
