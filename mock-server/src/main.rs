use tokio::net::TcpListener;

/// Standalone mock API for manual poking; tests start the server in-process
/// instead. Override the bind address with `ADDR`.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let addr = std::env::var("ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = TcpListener::bind(&addr).await?;
    println!(
        "mock emailsys api listening on {} (api key: {})",
        listener.local_addr()?,
        mock_server::API_KEY
    );
    mock_server::run(listener).await
}
