//! Server-variant demo: "sign in with Twitter" over the three-legged flow.
//!
//! Routes mirror a classic web integration: `/signin` and `/authorize` start
//! the handshake (abbreviated vs. full consent screen), `/callback` finishes
//! it and sets the `auth` cookie, `/logout` clears it, and the data views
//! render signed API calls. Run with a `config.json` holding your consumer
//! key pair.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::Value;

use oauth1_dance::{
    ApiClient, AppConfig, AuthorizationFlow, CredentialStore, Credentials, Endpoints, Entry,
    FlowError,
};

#[derive(Clone)]
struct AppState {
    flow: Arc<AuthorizationFlow>,
    api: Arc<ApiClient>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());
    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error reading configuration, {}", err);
            std::process::exit(1);
        }
    };

    let endpoints = Endpoints::new(
        "https://api.twitter.com/oauth/request_token",
        "https://api.twitter.com/oauth/authorize",
        "https://api.twitter.com/oauth/access_token",
    )
    .authentication_url("https://api.twitter.com/oauth/authenticate");

    let store = CredentialStore::new();
    let state = AppState {
        flow: Arc::new(AuthorizationFlow::new(
            config.consumer(),
            endpoints,
            store,
        )),
        api: Arc::new(ApiClient::new(config.consumer())),
    };

    let app = Router::new()
        .route("/", get(home))
        .route("/signin", get(signin))
        .route("/authorize", get(authorize))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .route("/timeline", get(timeline))
        .route("/messages", get(messages))
        .route("/follow", get(follow))
        .with_state(state);

    let addr: SocketAddr = ([127, 0, 0, 1], 8080).into();
    println!("listening on http://{}", addr);
    if let Err(err) = axum::Server::bind(&addr).serve(app.into_make_service()).await {
        eprintln!("Error listening, {}", err);
        std::process::exit(1);
    }
}

/// Pull the access token out of the `auth` cookie, if any.
fn auth_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix("auth=").map(str::to_string))
}

/// Resolve the request's identity against the credential store.
fn resolve(state: &AppState, headers: &HeaderMap) -> Option<Credentials> {
    auth_token(headers).and_then(|token| state.flow.store().get(&token))
}

fn callback_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .unwrap_or("localhost:8080");
    format!("http://{}/callback", host)
}

async fn home(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if resolve(&state, &headers).is_some() {
        Html(
            "<html><body>\
             <p><a href=\"/timeline\">timeline</a>\
             <p><a href=\"/messages\">direct messages</a>\
             <p><a href=\"/follow\">follow @gburd</a>\
             <p><a href=\"/logout\">logout</a>\
             </body></html>"
                .to_string(),
        )
        .into_response()
    } else {
        Html(
            "<html><body>\
             <a href=\"/authorize\">Authorize</a> or \
             <a href=\"/signin\">Sign in with Twitter</a>\
             </body></html>"
                .to_string(),
        )
        .into_response()
    }
}

async fn signin(State(state): State<AppState>, headers: HeaderMap) -> Response {
    start_flow(state, headers, Entry::SignIn).await
}

async fn authorize(State(state): State<AppState>, headers: HeaderMap) -> Response {
    start_flow(state, headers, Entry::Authorize).await
}

async fn start_flow(state: AppState, headers: HeaderMap, entry: Entry) -> Response {
    let callback = callback_url(&headers);
    match state.flow.begin(entry, Some(&callback)).await {
        Ok(pending) => Redirect::to(&pending.url).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error getting temp cred, {}", err),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct CallbackQuery {
    oauth_token: String,
    oauth_verifier: String,
}

async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
    match state
        .flow
        .complete(&query.oauth_token, &query.oauth_verifier)
        .await
    {
        Ok(access) => {
            let cookie = format!("auth={}; Path=/; HttpOnly", access.token);
            (
                AppendHeaders([(header::SET_COOKIE, cookie)]),
                Redirect::to("/"),
            )
                .into_response()
        }
        Err(err @ FlowError::UnknownToken(_)) => {
            (StatusCode::FORBIDDEN, format!("{}", err)).into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error getting access token, {}", err),
        )
            .into_response(),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = auth_token(&headers) {
        state.flow.logout(&token);
    }
    (
        AppendHeaders([(header::SET_COOKIE, "auth=; Path=/; HttpOnly; Max-Age=0")]),
        Redirect::to("/"),
    )
        .into_response()
}

async fn timeline(State(state): State<AppState>, headers: HeaderMap) -> Response {
    data_view(
        state,
        headers,
        "https://api.twitter.com/1.1/statuses/home_timeline.json",
        "user",
    )
    .await
}

async fn messages(State(state): State<AppState>, headers: HeaderMap) -> Response {
    data_view(
        state,
        headers,
        "https://api.twitter.com/1.1/direct_messages.json",
        "sender",
    )
    .await
}

async fn data_view(state: AppState, headers: HeaderMap, url: &str, author_key: &str) -> Response {
    let credentials = match resolve(&state, &headers) {
        Some(credentials) => credentials,
        None => return (StatusCode::FORBIDDEN, "Not logged in.").into_response(),
    };
    match state.api.get(url, &[], &credentials).await {
        Ok(value) => Html(render_entries(&value, author_key)).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error fetching {}, {}", url, err),
        )
            .into_response(),
    }
}

async fn follow(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let credentials = match resolve(&state, &headers) {
        Some(credentials) => credentials,
        None => return (StatusCode::FORBIDDEN, "Not logged in.").into_response(),
    };
    let params = vec![
        ("screen_name".to_string(), "gburd".to_string()),
        ("follow".to_string(), "true".to_string()),
    ];
    match state
        .api
        .post(
            "https://api.twitter.com/1.1/friendships/create.json",
            &params,
            &credentials,
        )
        .await
    {
        Ok(profile) => {
            let name = profile
                .get("name")
                .and_then(|name| name.as_str())
                .unwrap_or("?");
            Html(format!(
                "<html><body><p><a href=\"/\">home</a>\
                 <p>You are now following {}</body></html>",
                escape(name)
            ))
            .into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error following, {}", err),
        )
            .into_response(),
    }
}

fn render_entries(value: &Value, author_key: &str) -> String {
    let mut page = String::from("<html><body><p><a href=\"/\">home</a>");
    if let Some(items) = value.as_array() {
        for item in items {
            let author = item
                .get(author_key)
                .and_then(|author| author.get("name"))
                .and_then(|name| name.as_str())
                .unwrap_or("?");
            let text = item.get("text").and_then(|text| text.as_str()).unwrap_or("");
            page.push_str(&format!("<p><b>{}</b> {}", escape(author), escape(text)));
        }
    }
    page.push_str("</body></html>");
    page
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
