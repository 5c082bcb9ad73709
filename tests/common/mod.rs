//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use regional_api::config::schema::RegionalConfig;
use regional_api::config::{ApiConfig, UserConfig};
use regional_api::http::HttpServer;
use regional_api::lifecycle::Shutdown;
use regional_api::security::TokenIssuer;
use tokio::net::TcpListener;

pub const SIGNING_KEY: &str = "integration-test-signing-key-0123456789";

/// Plain-text password of the `admin` test user.
pub const ADMIN_PASSWORD: &str = "s3nha-forte";

/// Configuration with a signing key, one admin user and two regionais.
pub fn test_config(limit: u32) -> ApiConfig {
    let mut config = ApiConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.auth.signing_key = SIGNING_KEY.into();
    config.auth.users.push(UserConfig {
        username: "admin".into(),
        password_sha256: sha256_hex(ADMIN_PASSWORD),
        roles: vec!["ADMIN".into()],
    });
    config.rate_limit.limit = limit;
    config.catalog.regionais = vec![
        RegionalConfig {
            id: 1,
            nome: "Cuiabá".into(),
            ativo: true,
        },
        RegionalConfig {
            id: 2,
            nome: "Rondonópolis".into(),
            ativo: false,
        },
    ];
    config
}

pub fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Sign a token with the test key.
#[allow(dead_code)]
pub fn token_for(config: &ApiConfig, subject: &str) -> String {
    TokenIssuer::from_config(&config.auth)
        .issue(subject, &[])
        .unwrap()
        .token
}

/// Start a server on an ephemeral port.
#[allow(dead_code)]
pub async fn start_server(config: ApiConfig) -> (SocketAddr, Shutdown) {
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).expect("valid test config");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, shutdown)
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
