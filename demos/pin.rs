//! CLI-variant demo: PIN-based authorization against the Plurk API.
//!
//! Loads `config.json`, reuses the persisted access pair when present, and
//! otherwise walks the user through the PIN flow before rewriting the file.
//! Finishes with a signed profile request printed as pretty JSON.

use std::io::{self, Write};

use oauth1_dance::{ApiClient, AppConfig, AuthorizationFlow, CredentialStore, Endpoints, Entry};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());
    let mut config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error reading credential, {}", err);
            std::process::exit(1);
        }
    };

    let endpoints = Endpoints::new(
        "https://www.plurk.com/OAuth/request_token",
        "https://www.plurk.com/OAuth/authorize",
        "https://www.plurk.com/OAuth/access_token",
    );
    let flow = AuthorizationFlow::new(config.consumer(), endpoints, CredentialStore::new());

    let access = match config.access_credentials() {
        Some(access) => access,
        None => {
            let access = match flow
                .authorize_with_pin(Entry::Authorize, |url| {
                    println!("Open the following URL and authorize it: {}", url);
                    print!("Input the PIN code: ");
                    io::stdout().flush()?;
                    let mut pin = String::new();
                    io::stdin().read_line(&mut pin)?;
                    Ok(pin)
                })
                .await
            {
                Ok(access) => access,
                Err(err) => {
                    eprintln!("failed to request token: {}", err);
                    std::process::exit(1);
                }
            };
            config.remember_access(&access);
            if let Err(err) = config.save(&config_path) {
                eprintln!("failed to store credential: {}", err);
                std::process::exit(1);
            }
            access
        }
    };

    let api = ApiClient::new(config.consumer());
    match api
        .post("https://www.plurk.com/APP/Profile/getOwnProfile", &[], &access)
        .await
    {
        Ok(profile) => match serde_json::to_string_pretty(&profile) {
            Ok(rendered) => println!("{}", rendered),
            Err(_) => println!("{}", profile),
        },
        Err(err) => {
            eprintln!("failed: {}", err);
            std::process::exit(1);
        }
    }
}
