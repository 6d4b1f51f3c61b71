use std::collections::HashMap;

use serde::Deserialize;

use crate::credentials::Credentials;
use crate::error::{FlowError, FlowResult};
use crate::{OAUTH_TOKEN_KEY, OAUTH_TOKEN_SECRET_KEY};

/// A token endpoint's answer: the issued pair plus whatever else the service
/// attached (`oauth_callback_confirmed`, `screen_name`, ...).
#[derive(Deserialize, Debug)]
pub struct TokenGrant {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    /// Other attributes of the response.
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

impl TokenGrant {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.oauth_token.clone(), self.oauth_token_secret.clone())
    }
}

/// Destructure a `k=v&k=v` token response body.
///
/// The endpoints answer with a urlencoded form, not JSON. Both keys must be
/// present; everything else lands in `remain`.
pub(crate) fn parse_token_grant(body: &str) -> FlowResult<TokenGrant> {
    let mut destructured = body
        .split('&')
        .map(|e| e.splitn(2, '='))
        .map(|v| {
            let mut iter = v.into_iter();
            (
                iter.next().unwrap_or_default().to_string(),
                iter.next().unwrap_or_default().to_string(),
            )
        })
        .collect::<HashMap<String, String>>();
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenGrant {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured,
        }),
        (None, _) => Err(FlowError::MalformedTokenResponse {
            key: OAUTH_TOKEN_KEY,
            body: body.to_string(),
        }),
        (_, _) => Err(FlowError::MalformedTokenResponse {
            key: OAUTH_TOKEN_SECRET_KEY,
            body: body.to_string(),
        }),
    }
}
