//! Command-line credential bridge: authenticate against a Cognito user
//! pool, exchange the identity assertion with an identity pool for
//! temporary AWS credentials, then sign and send one API Gateway request.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod federation;
pub mod gateway;
pub mod pipeline;
pub mod request;

pub use auth::{CognitoAuthenticator, IdentityAssertion, UserCredentials};
pub use config::Settings;
pub use error::BridgeError;
pub use federation::{FederatedCredentials, IdentityPoolExchanger};
pub use gateway::{InvocationResult, SignedApiInvoker};
pub use pipeline::Pipeline;
