use std::sync::Arc;

use http::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::credentials::{Consumer, Credentials};
use crate::error::{ApiError, ApiResult};
use crate::signer::{HmacSha1Signer, Signer};
use crate::transport::{send_signed, HttpTransport, Outbound, Transport};

/// Signed access to the service's ordinary data endpoints.
///
/// Requests are signed with the supplied access credentials, dispatched, and
/// decoded into a schema-less [`serde_json::Value`] tree; the remote API's
/// exact shape is its own contract. Responses other than 200 surface as
/// [`ApiError::Status`] with the body preserved. No retries happen here;
/// that policy belongs to the caller.
pub struct ApiClient {
    consumer: Consumer,
    signer: Arc<dyn Signer>,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(consumer: Consumer) -> Self {
        Self::with_collaborators(
            consumer,
            Arc::new(HmacSha1Signer),
            Arc::new(HttpTransport::new()),
        )
    }

    /// Construct with explicit signer and transport collaborators.
    pub fn with_collaborators(
        consumer: Consumer,
        signer: Arc<dyn Signer>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        ApiClient {
            consumer,
            signer,
            transport,
        }
    }

    /// Convenience method to issue a signed `GET`; `params` go in the query.
    pub async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        credentials: &Credentials,
    ) -> ApiResult<Value> {
        self.request(Method::GET, url, params, credentials).await
    }

    /// Convenience method to issue a signed `POST`; `params` go in the form body.
    pub async fn post(
        &self,
        url: &str,
        params: &[(String, String)],
        credentials: &Credentials,
    ) -> ApiResult<Value> {
        self.request(Method::POST, url, params, credentials).await
    }

    /// Issue a signed request and decode the JSON response.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        params: &[(String, String)],
        credentials: &Credentials,
    ) -> ApiResult<Value> {
        let response = send_signed(
            self.signer.as_ref(),
            self.transport.as_ref(),
            &self.consumer,
            Outbound {
                method,
                url,
                params,
                token: Some(credentials),
                callback: None,
                verifier: None,
            },
        )
        .await?;
        debug!(%url, status = %response.status, "API response");
        if response.status != StatusCode::OK {
            return Err(ApiError::Status {
                status: response.status.as_u16(),
                body: response.body,
            });
        }
        Ok(serde_json::from_str(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::error::TransportError;
    use crate::transport::RawResponse;

    /// Always answers with the same canned response; remembers the last URL.
    struct FixedTransport {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<(Method, String)>>,
    }

    impl FixedTransport {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(FixedTransport {
                status,
                body,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn execute(
            &self,
            method: Method,
            url: Url,
            _authorization: String,
            _form: Option<String>,
        ) -> Result<RawResponse, TransportError> {
            self.seen.lock().unwrap().push((method, url.to_string()));
            Ok(RawResponse {
                status: StatusCode::from_u16(self.status).unwrap(),
                body: self.body.to_string(),
            })
        }
    }

    fn client_with(transport: Arc<FixedTransport>) -> ApiClient {
        ApiClient::with_collaborators(
            Consumer::new("ckey", "csecret"),
            Arc::new(HmacSha1Signer),
            transport,
        )
    }

    fn credentials() -> Credentials {
        Credentials::new("atoken", "asecret")
    }

    #[tokio::test]
    async fn decodes_json_object() {
        let transport = FixedTransport::new(200, r#"{"id":"1","text":"hi"}"#);
        let client = client_with(transport);

        let value = client
            .get("https://api.example/1/statuses/show.json", &[], &credentials())
            .await
            .unwrap();
        assert_eq!(value, json!({"id": "1", "text": "hi"}));
    }

    #[tokio::test]
    async fn decodes_json_array() {
        let transport = FixedTransport::new(200, r#"[{"text":"a"},{"text":"b"}]"#);
        let client = client_with(transport);

        let value = client
            .get("https://api.example/1/timeline.json", &[], &credentials())
            .await
            .unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn non_200_preserves_status_and_body() {
        let transport = FixedTransport::new(500, "upstream exploded");
        let client = client_with(transport);

        let err = client
            .get("https://api.example/1/timeline.json", &[], &credentials())
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let transport = FixedTransport::new(200, "{not json");
        let client = client_with(transport);

        let err = client
            .get("https://api.example/1/timeline.json", &[], &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn get_params_land_in_the_query() {
        let transport = FixedTransport::new(200, "{}");
        let client = client_with(transport.clone());

        let params = vec![("screen_name".to_string(), "gburd".to_string())];
        client
            .get("https://api.example/1/users/show.json", &params, &credentials())
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        let (method, url) = &seen[0];
        assert_eq!(*method, Method::GET);
        assert!(url.contains("screen_name=gburd"));
    }

    #[tokio::test]
    async fn post_params_stay_out_of_the_query() {
        let transport = FixedTransport::new(200, "{}");
        let client = client_with(transport.clone());

        let params = vec![("status".to_string(), "hello".to_string())];
        client
            .post("https://api.example/1/statuses/update.json", &params, &credentials())
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        let (method, url) = &seen[0];
        assert_eq!(*method, Method::POST);
        assert!(!url.contains("status=hello"));
    }
}
