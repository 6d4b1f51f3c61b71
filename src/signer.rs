use std::borrow::Cow;

use http::Method;
use oauth1_request::signer::Signer as OAuthSigner;
use oauth1_request::{HmacSha1, Options};
use url::Url;

use crate::credentials::{Consumer, Credentials};
use crate::OAUTH_KEY_PREFIX;

/// Everything an OAuth 1.0a signature covers.
///
/// `params` are the request's own key-value pairs (query or form, per
/// `form`); `callback` and `verifier` are the handshake-only protocol
/// parameters. `nonce` and `timestamp` default to fresh values and exist so
/// tests can pin the signature.
#[derive(Debug, Clone)]
pub struct SigningInput<'a> {
    pub method: Method,
    /// Endpoint URL with no query string; `params` carries the pairs.
    pub url: Url,
    pub params: &'a [(String, String)],
    pub token: Option<&'a Credentials>,
    pub callback: Option<&'a str>,
    pub verifier: Option<&'a str>,
    pub nonce: Option<&'a str>,
    pub timestamp: Option<u64>,
    /// Whether `params` travel as a form body rather than in the URL.
    pub form: bool,
}

impl<'a> SigningInput<'a> {
    pub fn new(method: Method, url: Url, params: &'a [(String, String)]) -> Self {
        SigningInput {
            method,
            url,
            params,
            token: None,
            callback: None,
            verifier: None,
            nonce: None,
            timestamp: None,
            form: false,
        }
    }
}

/// Produces the `Authorization` header value for a request.
///
/// The signature math itself lives in the `oauth1-request` crate; an
/// implementation of this trait only assembles its inputs. Substitute a
/// canned implementation to test callers without any cryptography.
pub trait Signer: Send + Sync {
    fn authorization(&self, consumer: &Consumer, input: &SigningInput<'_>) -> String;
}

/// The production signer: HMAC-SHA1 via `oauth1-request`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha1Signer;

impl Signer for HmacSha1Signer {
    fn authorization(&self, consumer: &Consumer, input: &SigningInput<'_>) -> String {
        let token_secret = input.token.map(|t| t.secret.as_str());

        let mut options = Options::new();
        // NOTE: items must be added by alphabetical order
        if let Some(callback) = input.callback {
            options.callback(callback);
        }
        if let Some(nonce) = input.nonce {
            options.nonce(nonce);
        }
        if let Some(timestamp) = input.timestamp {
            options.timestamp(timestamp);
        }
        if let Some(token) = input.token {
            options.token(token.token.as_str());
        }
        if let Some(verifier) = input.verifier {
            options.verifier(verifier);
        }

        // The signature base string wants parameters in ascending order with
        // the oauth_* block spliced in at its alphabetical position, so sort
        // the pairs around an "oauth_" marker entry.
        let parsed: Vec<(Cow<str>, Cow<str>)> = input
            .params
            .iter()
            .map(|(k, v)| (Cow::from(k.as_str()), Cow::from(v.as_str())))
            .collect();
        let marker = vec![(Cow::from(OAUTH_KEY_PREFIX), Cow::from(""))];
        let mut sorted_query = [parsed, marker].concat();
        sorted_query.sort();

        let mut divided = sorted_query
            .splitn(2, |(k, _)| k == &OAUTH_KEY_PREFIX)
            .into_iter();
        let query_before_oauth = divided.next().unwrap();
        let query_after_oauth = divided.next().unwrap_or_default();

        let mut signer = if input.form {
            OAuthSigner::form_with_signature_method(
                HmacSha1,
                input.method.as_str(),
                input.url.clone(),
                consumer.secret.as_str(),
                token_secret,
            )
        } else {
            OAuthSigner::with_signature_method(
                HmacSha1,
                input.method.as_str(),
                input.url.clone(),
                consumer.secret.as_str(),
                token_secret,
            )
        };

        for (key, value) in query_before_oauth {
            if !key.starts_with(OAUTH_KEY_PREFIX) {
                signer.parameter(key, value);
            }
        }
        let mut signer = signer.oauth_parameters(consumer.key.as_str(), &options);
        for (key, value) in query_after_oauth {
            if !key.starts_with(OAUTH_KEY_PREFIX) {
                signer.parameter(key, value);
            }
        }

        signer.finish().authorization
    }
}
