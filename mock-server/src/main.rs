use std::path::Path;

use tokio::net::TcpListener;

use mock_server::SharedRegistry;

/// Serve the mock API on `PORT` (default 3000), preloaded with the test cases
/// of the fixture file given as first argument, if any.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = SharedRegistry::default();
    if let Some(path) = std::env::args().nth(1) {
        let cases = mock_server::fixture::load(Path::new(&path))?;
        let count = cases.len();
        mock_server::lock(&registry).add_test_cases(cases)?;
        println!("loaded {count} test cases from {path}");
    }

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("listening on {addr}");
    mock_server::run(listener, registry).await?;
    Ok(())
}
