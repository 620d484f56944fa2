use thiserror::Error;

/// Every failure in the bridge is terminal for the run; the variants map
/// one-to-one onto the stage that produced them.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The user pool rejected the authentication attempt. Carries the
    /// provider's own message verbatim.
    #[error("{0}")]
    AuthenticationRejected(String),

    #[error("given user needs to set a new password")]
    NewPasswordRequired,

    /// The user pool answered with a challenge this tool does not drive
    /// (MFA, custom challenges, ...).
    #[error("{0} challenge is not supported")]
    ChallengeUnsupported(String),

    #[error("credential exchange failed: {0}")]
    CredentialExchangeFailed(String),

    /// The request never produced an HTTP response: connect, TLS, signing
    /// or client-library failure. A response of any status class is not
    /// this error.
    #[error("request failed: {0}")]
    RequestTransport(String),

    #[error("{0}")]
    Configuration(String),
}
