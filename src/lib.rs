/*!
oauth1-dance: the three-legged OAuth 1.0a dance, batteries included.

# Overview

This library drives the OAuth 1.0a authorization handshake against services
such as Twitter or Plurk and issues signed API calls with the credentials it
obtains. The signature math is delegated to
[oauth1-request](https://crates.io/crates/oauth1-request) and the HTTP
exchange to [reqwest](https://crates.io/crates/reqwest); what this crate adds
is the flow itself: temporary credentials, the authorization URL, the
verifier exchange, a concurrency-safe credential store for server
deployments, and a JSON credentials file for CLI ones.

# How to use

## Usecase 1 - server with a callback endpoint

```no_run
use oauth1_dance::{
    ApiClient, AuthorizationFlow, Consumer, CredentialStore, Endpoints, Entry,
};

# async fn run() -> oauth1_dance::Result<()> {
let consumer = Consumer::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]");
let endpoints = Endpoints::new(
    "https://api.twitter.com/oauth/request_token",
    "https://api.twitter.com/oauth/authorize",
    "https://api.twitter.com/oauth/access_token",
)
.authentication_url("https://api.twitter.com/oauth/authenticate");

let store = CredentialStore::new();
let flow = AuthorizationFlow::new(consumer.clone(), endpoints, store.clone());

// /signin or /authorize handler: redirect the user
let pending = flow
    .begin(Entry::SignIn, Some("http://localhost:8080/callback"))
    .await?;
// -> redirect to pending.url; remember nothing, the flow tracks the token

// /callback handler: ?oauth_token=...&oauth_verifier=...
let access = flow.complete("the-oauth-token", "the-verifier").await?;
// access credentials are now in the store, keyed by access.token

// any data handler
let api = ApiClient::new(consumer);
let timeline = api
    .get(
        "https://api.twitter.com/1.1/statuses/home_timeline.json",
        &[],
        &access,
    )
    .await?;
println!("{:#?}", timeline);
# Ok(())
# }
```

## Usecase 2 - CLI with a PIN prompt

```no_run
use std::io::{self, Write};
use oauth1_dance::{ApiClient, AppConfig, AuthorizationFlow, CredentialStore, Endpoints, Entry};

# async fn run() -> oauth1_dance::Result<()> {
let mut config = AppConfig::load("config.json")?;
let endpoints = Endpoints::new(
    "https://www.plurk.com/OAuth/request_token",
    "https://www.plurk.com/OAuth/authorize",
    "https://www.plurk.com/OAuth/access_token",
);
let flow = AuthorizationFlow::new(config.consumer(), endpoints, CredentialStore::new());

let access = match config.access_credentials() {
    Some(access) => access,
    None => {
        let access = flow
            .authorize_with_pin(Entry::Authorize, |url| {
                println!("Open the following URL and authorize it: {}", url);
                print!("Input the PIN code: ");
                io::stdout().flush()?;
                let mut pin = String::new();
                io::stdin().read_line(&mut pin)?;
                Ok(pin)
            })
            .await?;
        config.remember_access(&access);
        config.save("config.json")?;
        access
    }
};

let api = ApiClient::new(config.consumer());
let profile = api
    .post("https://www.plurk.com/APP/Profile/getOwnProfile", &[], &access)
    .await?;
println!("{}", profile);
# Ok(())
# }
```

Two runnable programs covering both shapes ship as the `web` and `pin`
examples.
*/
mod client;
mod config;
mod credentials;
mod error;
mod flow;
mod signer;
mod token;
mod transport;

// exposed to external program
pub use client::ApiClient;
pub use config::AppConfig;
pub use credentials::{Consumer, Credentials, CredentialStore};
pub use error::{
    ApiError, ApiResult, ConfigError, ConfigResult, Error, FlowError, FlowResult, Result,
    TransportError,
};
pub use flow::{
    AuthorizationFlow, Endpoints, Entry, FlowState, PendingAuthorization, DEFAULT_PENDING_TTL,
};
pub use signer::{HmacSha1Signer, Signer, SigningInput};
pub use token::TokenGrant;
pub use transport::{HttpTransport, RawResponse, Transport};

// exposed constant variables
/// Represents `oauth_token`.
pub const OAUTH_TOKEN_KEY: &str = "oauth_token";
/// Represents `oauth_token_secret`.
pub const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// The out-of-band `oauth_callback` value used by PIN-based flows.
pub const OAUTH_CALLBACK_OOB: &str = "oob";

// crate-private constant variables
pub(crate) const OAUTH_KEY_PREFIX: &str = "oauth_";
