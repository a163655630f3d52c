//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use timezone_router::{Application, HttpServer, ServiceConfig, Shutdown};
use tokio::net::TcpListener;

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub application: Application,
}

impl TestServer {
    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Start a server with `config` on 127.0.0.1:0.
pub async fn start_server_with(mut config: ServiceConfig) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.shutdown.grace_secs = 1;

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let application = Application::build(&config);
    let server = HttpServer::new(config, &application);
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    TestServer {
        addr,
        shutdown,
        application,
    }
}

pub async fn start_server() -> TestServer {
    start_server_with(ServiceConfig::default()).await
}
