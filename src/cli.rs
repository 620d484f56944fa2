use clap::Parser;

/// Authenticate against a Cognito user pool, exchange the tokens for
/// temporary AWS credentials, and make one signed API Gateway request.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// Username of the user
    #[arg(long)]
    pub username: String,

    /// Password of the user
    #[arg(long)]
    pub password: String,

    /// Cognito user pool id
    #[arg(long)]
    pub user_pool_id: String,

    /// Cognito user pool app client id
    #[arg(long)]
    pub app_client_id: String,

    /// Cognito region
    #[arg(long, default_value = "us-east-1")]
    pub cognito_region: String,

    /// Cognito identity pool id
    #[arg(long)]
    pub identity_pool_id: String,

    /// API Gateway URL
    #[arg(long)]
    pub invoke_url: String,

    /// API Gateway region
    #[arg(long, default_value = "us-east-1")]
    pub api_gateway_region: String,

    /// API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// API path template
    #[arg(long)]
    pub path_template: String,

    /// API method
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// API request params, as a JSON object
    #[arg(long, default_value = "{}")]
    pub params: String,

    /// API request additional params (headers, queryParams), as a JSON object
    #[arg(long, default_value = "{}")]
    pub additional_params: String,

    /// API request body, as JSON or @<file>
    #[arg(long, default_value = "{}")]
    pub body: String,

    /// Header to use to pass the access token with the request
    #[arg(long)]
    pub access_token_header: Option<String>,
}
