use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::{Method, StatusCode};
use url::Url;

use crate::credentials::{Consumer, Credentials};
use crate::error::TransportError;
use crate::signer::{Signer, SigningInput};

/// Status and body of a completed HTTP exchange.
///
/// Headers are deliberately absent: no caller in this crate needs them, and
/// keeping the type flat keeps canned transports trivial to write in tests.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Performs the HTTP exchange for an already-signed request.
///
/// The `Authorization` header arrives fully assembled; implementations only
/// move bytes. Substitute a canned implementation to exercise the flow and
/// the API client without a network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        method: Method,
        url: Url,
        authorization: String,
        form: Option<String>,
    ) -> Result<RawResponse, TransportError>;
}

/// The production transport over `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    inner: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a preconfigured `reqwest::Client` (proxies, timeouts, ...).
    pub fn with_client(inner: reqwest::Client) -> Self {
        HttpTransport { inner }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        method: Method,
        url: Url,
        authorization: String,
        form: Option<String>,
    ) -> Result<RawResponse, TransportError> {
        let mut request = self
            .inner
            .request(method, url)
            .header(AUTHORIZATION, authorization);
        if let Some(body) = form {
            request = request
                .header(
                    reqwest::header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

/// One outbound signed call, before signing.
pub(crate) struct Outbound<'a> {
    pub method: Method,
    pub url: &'a str,
    pub params: &'a [(String, String)],
    pub token: Option<&'a Credentials>,
    pub callback: Option<&'a str>,
    pub verifier: Option<&'a str>,
}

/// Sign `out` and dispatch it.
///
/// Any query string already on the URL is folded into the parameter set so
/// the signature covers it. GET requests carry the pairs in the query; POST
/// requests carry them as a form body.
pub(crate) async fn send_signed(
    signer: &dyn Signer,
    transport: &dyn Transport,
    consumer: &Consumer,
    out: Outbound<'_>,
) -> Result<RawResponse, TransportError> {
    let mut url =
        Url::parse(out.url).map_err(|_| TransportError::InvalidUrl(out.url.to_string()))?;

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.extend_from_slice(out.params);
    url.set_query(None);

    let form = out.method == Method::POST;
    let input = SigningInput {
        method: out.method.clone(),
        url: url.clone(),
        params: &pairs,
        token: out.token,
        callback: out.callback,
        verifier: out.verifier,
        nonce: None,
        timestamp: None,
        form,
    };
    let authorization = signer.authorization(consumer, &input);

    if form {
        let body = {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in &pairs {
                serializer.append_pair(key, value);
            }
            serializer.finish()
        };
        transport
            .execute(out.method, url, authorization, Some(body))
            .await
    } else {
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }
        transport.execute(out.method, url, authorization, None).await
    }
}
