//! Negotiate a connection and print the browser version
//!
//! ```sh
//! cargo run -p hn-browser --example connect -- http://puppeteer:9222
//! cargo run -p hn-browser --example connect -- ws://127.0.0.1:9222/devtools/browser/<id>
//! cargo run -p hn-browser --example connect            # launches a local browser
//! ```

use hn_browser::{ConnectionTarget, Negotiator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let arg = std::env::args().nth(1);
    let target = match arg.as_deref() {
        Some(a) if a.starts_with("ws") => ConnectionTarget::resolve(Some(a), None, true, 0),
        Some(a) => ConnectionTarget::resolve(None, Some(a), true, 0),
        None => ConnectionTarget::resolve(None, None, true, 0),
    };
    println!("Connecting via {}", target);

    let mut session = Negotiator::new()?.connect(&target).await?;
    println!("Connected to {}", session.endpoint());

    let version = session
        .client()?
        .send_request("Browser.getVersion", None, None)
        .await?;
    println!("Browser version: {}", version);

    session.close().await?;
    println!("Disconnected");

    Ok(())
}
