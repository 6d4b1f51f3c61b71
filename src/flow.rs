use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use http::{Method, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::credentials::{Consumer, Credentials, CredentialStore};
use crate::error::{FlowError, FlowResult, TransportError};
use crate::signer::{HmacSha1Signer, Signer};
use crate::token::parse_token_grant;
use crate::transport::{send_signed, HttpTransport, Outbound, Transport};
use crate::{OAUTH_CALLBACK_OOB, OAUTH_TOKEN_KEY};

/// How long a temporary credential stays redeemable.
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(600);

/// The remote service's endpoints for the authorization handshake.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Where temporary credentials are requested.
    pub temporary_credentials_url: String,
    /// Where the user grants consent.
    pub authorization_url: String,
    /// Lightweight "sign in with ..." variant of the consent screen, when the
    /// service offers one. Falls back to `authorization_url`.
    pub authentication_url: Option<String>,
    /// Where the verifier is exchanged for access credentials.
    pub access_token_url: String,
}

impl Endpoints {
    pub fn new<T, A, X>(temporary_credentials_url: T, authorization_url: A, access_token_url: X) -> Self
    where
        T: Into<String>,
        A: Into<String>,
        X: Into<String>,
    {
        Endpoints {
            temporary_credentials_url: temporary_credentials_url.into(),
            authorization_url: authorization_url.into(),
            authentication_url: None,
            access_token_url: access_token_url.into(),
        }
    }

    /// Set the sign-in shortcut URL.
    pub fn authentication_url<U>(mut self, url: U) -> Self
    where
        U: Into<String>,
    {
        self.authentication_url = Some(url.into());
        self
    }

    fn entry_url(&self, entry: Entry) -> &str {
        match entry {
            Entry::Authorize => &self.authorization_url,
            Entry::SignIn => self
                .authentication_url
                .as_deref()
                .unwrap_or(&self.authorization_url),
        }
    }
}

/// Which consent screen the user is sent to.
///
/// Both entries drive the same handshake against the same temporary-credential
/// and token-exchange endpoints; only the URL the user visits differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// The full consent screen.
    Authorize,
    /// The abbreviated sign-in screen, where the service offers one.
    SignIn,
}

/// Where a given token currently is in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Unauthorized,
    Pending,
    Authorized,
}

/// What `begin` hands back: the URL to send the user to, and the temporary
/// token that `complete` must be called with.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub token: String,
    pub url: String,
}

struct PendingEntry {
    secret: String,
    issued_at: Instant,
}

/// Drives the three-legged handshake.
///
/// One instance serves any number of concurrent users; pending temporary
/// credentials are keyed by token, and completed access credentials land in
/// the injected [`CredentialStore`].
pub struct AuthorizationFlow {
    consumer: Consumer,
    endpoints: Endpoints,
    signer: Arc<dyn Signer>,
    transport: Arc<dyn Transport>,
    store: CredentialStore,
    pending: Mutex<HashMap<String, PendingEntry>>,
    pending_ttl: Duration,
}

impl AuthorizationFlow {
    pub fn new(consumer: Consumer, endpoints: Endpoints, store: CredentialStore) -> Self {
        Self::with_collaborators(
            consumer,
            endpoints,
            store,
            Arc::new(HmacSha1Signer),
            Arc::new(HttpTransport::new()),
        )
    }

    /// Construct with explicit signer and transport collaborators.
    pub fn with_collaborators(
        consumer: Consumer,
        endpoints: Endpoints,
        store: CredentialStore,
        signer: Arc<dyn Signer>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        AuthorizationFlow {
            consumer,
            endpoints,
            signer,
            transport,
            store,
            pending: Mutex::new(HashMap::new()),
            pending_ttl: DEFAULT_PENDING_TTL,
        }
    }

    /// Override how long temporary credentials stay redeemable.
    pub fn pending_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = ttl;
        self
    }

    /// The store access credentials are published to.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Request temporary credentials and build the URL the user must visit.
    ///
    /// With no callback the out-of-band value is sent and the service will
    /// display the verifier as a PIN instead of redirecting. On upstream
    /// rejection nothing is recorded.
    pub async fn begin(
        &self,
        entry: Entry,
        callback: Option<&str>,
    ) -> FlowResult<PendingAuthorization> {
        let callback = callback.unwrap_or(OAUTH_CALLBACK_OOB);
        let response = send_signed(
            self.signer.as_ref(),
            self.transport.as_ref(),
            &self.consumer,
            Outbound {
                method: Method::POST,
                url: &self.endpoints.temporary_credentials_url,
                params: &[],
                token: None,
                callback: Some(callback),
                verifier: None,
            },
        )
        .await?;
        if response.status != StatusCode::OK {
            return Err(FlowError::Upstream {
                status: response.status.as_u16(),
                body: response.body,
            });
        }
        let grant = parse_token_grant(&response.body)?;

        {
            let mut pending = self.pending.lock().unwrap();
            // piggyback expiry sweeping on new flows
            let ttl = self.pending_ttl;
            pending.retain(|_, entry| entry.issued_at.elapsed() <= ttl);
            pending.insert(
                grant.oauth_token.clone(),
                PendingEntry {
                    secret: grant.oauth_token_secret.clone(),
                    issued_at: Instant::now(),
                },
            );
        }

        let url = self.user_url(entry, &grant.oauth_token)?;
        debug!(token = %grant.oauth_token, "temporary credentials issued");
        Ok(PendingAuthorization {
            token: grant.oauth_token,
            url,
        })
    }

    /// Exchange the verifier for access credentials.
    ///
    /// The pending entry is consumed up front: whatever the exchange's
    /// outcome, the temporary credential cannot be presented again. The
    /// obtained access credentials are published to the store and returned.
    pub async fn complete(&self, token: &str, verifier: &str) -> FlowResult<Credentials> {
        let temporary = self.take_pending(token)?;
        let response = send_signed(
            self.signer.as_ref(),
            self.transport.as_ref(),
            &self.consumer,
            Outbound {
                method: Method::POST,
                url: &self.endpoints.access_token_url,
                params: &[],
                token: Some(&temporary),
                callback: None,
                verifier: Some(verifier),
            },
        )
        .await?;
        if response.status != StatusCode::OK {
            return Err(FlowError::Upstream {
                status: response.status.as_u16(),
                body: response.body,
            });
        }
        let access = parse_token_grant(&response.body)?.credentials();
        self.store.put(&access);
        debug!(token = %access.token, "access credentials issued");
        Ok(access)
    }

    /// Discard access credentials; the token returns to `Unauthorized`.
    pub fn logout(&self, token: &str) {
        self.store.delete(token);
        debug!(%token, "access credentials discarded");
    }

    /// Observable state of a single token.
    pub fn state(&self, token: &str) -> FlowState {
        {
            let pending = self.pending.lock().unwrap();
            if let Some(entry) = pending.get(token) {
                if entry.issued_at.elapsed() <= self.pending_ttl {
                    return FlowState::Pending;
                }
            }
        }
        if self.store.get(token).is_some() {
            FlowState::Authorized
        } else {
            FlowState::Unauthorized
        }
    }

    /// Drop every pending entry past its TTL. `begin` does this
    /// opportunistically; call this from a periodic sweep if flows are rare.
    pub fn purge_expired(&self) {
        let mut pending = self.pending.lock().unwrap();
        let ttl = self.pending_ttl;
        pending.retain(|_, entry| entry.issued_at.elapsed() <= ttl);
    }

    /// Interactive variant for callers without a redirect endpoint.
    ///
    /// Runs `begin` with the out-of-band callback, hands the authorization
    /// URL to `prompt`, and blocks until it returns the verifier the user
    /// read off the consent screen. Surrounding whitespace is trimmed.
    pub async fn authorize_with_pin<F>(&self, entry: Entry, prompt: F) -> FlowResult<Credentials>
    where
        F: FnOnce(&str) -> std::io::Result<String>,
    {
        let pending = self.begin(entry, None).await?;
        let verifier = prompt(&pending.url)?;
        self.complete(&pending.token, verifier.trim()).await
    }

    fn take_pending(&self, token: &str) -> FlowResult<Credentials> {
        let mut pending = self.pending.lock().unwrap();
        let entry = pending
            .remove(token)
            .ok_or_else(|| FlowError::UnknownToken(token.to_string()))?;
        if entry.issued_at.elapsed() > self.pending_ttl {
            warn!(%token, "pending authorization expired");
            return Err(FlowError::UnknownToken(token.to_string()));
        }
        Ok(Credentials::new(token, entry.secret))
    }

    fn user_url(&self, entry: Entry, token: &str) -> FlowResult<String> {
        let raw = self.endpoints.entry_url(entry);
        let mut url = Url::parse(raw)
            .map_err(|_| FlowError::Transport(TransportError::InvalidUrl(raw.to_string())))?;
        url.query_pairs_mut().append_pair(OAUTH_TOKEN_KEY, token);
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::TransportError;
    use crate::transport::RawResponse;

    /// Replays a queue of canned responses and records what was sent.
    #[derive(Default)]
    struct CannedTransport {
        responses: Mutex<VecDeque<RawResponse>>,
        requests: Mutex<Vec<(Method, String, String)>>,
    }

    impl CannedTransport {
        fn replying(responses: Vec<(u16, &str)>) -> Arc<Self> {
            let responses = responses
                .into_iter()
                .map(|(status, body)| RawResponse {
                    status: StatusCode::from_u16(status).unwrap(),
                    body: body.to_string(),
                })
                .collect();
            Arc::new(CannedTransport {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn authorizations(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(_, _, auth)| auth.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn execute(
            &self,
            method: Method,
            url: Url,
            authorization: String,
            _form: Option<String>,
        ) -> Result<RawResponse, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push((method, url.to_string(), authorization));
            Ok(self.responses.lock().unwrap().pop_front().expect("canned"))
        }
    }

    fn endpoints() -> Endpoints {
        Endpoints::new(
            "https://service.example/oauth/request_token",
            "https://service.example/oauth/authorize",
            "https://service.example/oauth/access_token",
        )
        .authentication_url("https://service.example/oauth/authenticate")
    }

    fn flow_with(transport: Arc<CannedTransport>) -> AuthorizationFlow {
        AuthorizationFlow::with_collaborators(
            Consumer::new("ckey", "csecret"),
            endpoints(),
            CredentialStore::new(),
            Arc::new(HmacSha1Signer),
            transport,
        )
    }

    #[tokio::test]
    async fn begin_then_complete_authorizes() {
        let transport = CannedTransport::replying(vec![
            (200, "oauth_token=temp&oauth_token_secret=temps"),
            (200, "oauth_token=acc&oauth_token_secret=accs"),
        ]);
        let flow = flow_with(transport.clone());

        let pending = flow.begin(Entry::Authorize, None).await.unwrap();
        assert_eq!(pending.token, "temp");
        assert_eq!(
            pending.url,
            "https://service.example/oauth/authorize?oauth_token=temp"
        );
        assert_eq!(flow.state("temp"), FlowState::Pending);

        let access = flow.complete("temp", "verifier").await.unwrap();
        assert_eq!(access, Credentials::new("acc", "accs"));
        assert_eq!(flow.state("acc"), FlowState::Authorized);
        assert_eq!(flow.store().get("acc"), Some(access));

        // the temporary token is spent
        assert_eq!(flow.state("temp"), FlowState::Unauthorized);
    }

    #[tokio::test]
    async fn signin_entry_uses_authentication_url() {
        let transport =
            CannedTransport::replying(vec![(200, "oauth_token=t&oauth_token_secret=s")]);
        let flow = flow_with(transport);

        let pending = flow.begin(Entry::SignIn, None).await.unwrap();
        assert_eq!(
            pending.url,
            "https://service.example/oauth/authenticate?oauth_token=t"
        );
    }

    #[tokio::test]
    async fn begin_signs_the_callback() {
        let transport =
            CannedTransport::replying(vec![(200, "oauth_token=t&oauth_token_secret=s")]);
        let flow = flow_with(transport.clone());

        flow.begin(Entry::Authorize, Some("http://localhost/callback"))
            .await
            .unwrap();
        let auths = transport.authorizations();
        assert!(auths[0].contains("oauth_callback"));
    }

    #[tokio::test]
    async fn complete_with_unknown_token_is_rejected() {
        let transport = CannedTransport::replying(vec![]);
        let flow = flow_with(transport);

        let err = flow.complete("forged", "v").await.unwrap_err();
        match err {
            FlowError::UnknownToken(token) => assert_eq!(token, "forged"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn complete_is_single_use() {
        let transport = CannedTransport::replying(vec![
            (200, "oauth_token=temp&oauth_token_secret=temps"),
            (200, "oauth_token=acc&oauth_token_secret=accs"),
        ]);
        let flow = flow_with(transport);

        flow.begin(Entry::Authorize, None).await.unwrap();
        flow.complete("temp", "v").await.unwrap();

        let err = flow.complete("temp", "v").await.unwrap_err();
        assert!(matches!(err, FlowError::UnknownToken(_)));
    }

    #[tokio::test]
    async fn upstream_rejection_at_begin_leaves_nothing_behind() {
        let transport = CannedTransport::replying(vec![(401, "Invalid consumer key")]);
        let flow = flow_with(transport);

        let err = flow.begin(Entry::Authorize, None).await.unwrap_err();
        match err {
            FlowError::Upstream { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Invalid consumer key");
            }
            other => panic!("unexpected error: {}", other),
        }
        flow.purge_expired();
        assert_eq!(flow.state("anything"), FlowState::Unauthorized);
    }

    #[tokio::test]
    async fn malformed_grant_is_rejected() {
        let transport = CannedTransport::replying(vec![(200, "oops=1")]);
        let flow = flow_with(transport);

        let err = flow.begin(Entry::Authorize, None).await.unwrap_err();
        assert!(matches!(err, FlowError::MalformedTokenResponse { .. }));
    }

    #[tokio::test]
    async fn expired_pending_entry_is_rejected() {
        let transport =
            CannedTransport::replying(vec![(200, "oauth_token=temp&oauth_token_secret=s")]);
        let flow = flow_with(transport).pending_ttl(Duration::from_millis(0));

        flow.begin(Entry::Authorize, None).await.unwrap();
        std::thread::sleep(Duration::from_millis(5));

        let err = flow.complete("temp", "v").await.unwrap_err();
        assert!(matches!(err, FlowError::UnknownToken(_)));
    }

    #[tokio::test]
    async fn logout_returns_token_to_unauthorized() {
        let transport = CannedTransport::replying(vec![
            (200, "oauth_token=temp&oauth_token_secret=temps"),
            (200, "oauth_token=acc&oauth_token_secret=accs"),
        ]);
        let flow = flow_with(transport);

        flow.begin(Entry::Authorize, None).await.unwrap();
        flow.complete("temp", "v").await.unwrap();
        assert_eq!(flow.state("acc"), FlowState::Authorized);

        flow.logout("acc");
        assert_eq!(flow.state("acc"), FlowState::Unauthorized);
        assert_eq!(flow.store().get("acc"), None);
    }

    #[tokio::test]
    async fn pin_flow_runs_both_legs() {
        let transport = CannedTransport::replying(vec![
            (200, "oauth_token=temp&oauth_token_secret=temps"),
            (200, "oauth_token=acc&oauth_token_secret=accs"),
        ]);
        let flow = flow_with(transport);

        let access = flow
            .authorize_with_pin(Entry::Authorize, |url| {
                assert!(url.contains("oauth_token=temp"));
                Ok("  123456\n".to_string())
            })
            .await
            .unwrap();
        assert_eq!(access, Credentials::new("acc", "accs"));
    }
}
