//! Start a build of one appliance using the async `StudioClient`.
//!
//! Run:
//! `STUDIO_USER=<login> STUDIO_API_KEY=<key> cargo run --example async_start_build -- <appliance_id>`
//!
//! Optional env vars:
//! - `STUDIO_BASE_URL` (defaults to the public Studio user API)
//! - `STUDIO_FORCE=1` to rebuild an existing version

use studio_api::{BuildOptions, ClientError, StudioClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (Ok(user), Ok(api_key)) = (std::env::var("STUDIO_USER"), std::env::var("STUDIO_API_KEY"))
    else {
        eprintln!("Set STUDIO_USER and STUDIO_API_KEY before running this example.");
        std::process::exit(2);
    };
    let Some(appliance_id) = std::env::args().nth(1).and_then(|arg| arg.parse().ok()) else {
        eprintln!("Pass the appliance id as the first argument.");
        std::process::exit(2);
    };

    let client = match std::env::var("STUDIO_BASE_URL") {
        Ok(url) => StudioClient::new(url)?,
        Err(_) => StudioClient::from_default_server()?,
    }
    .with_credentials(user, api_key);

    let options = BuildOptions::default().force(std::env::var("STUDIO_FORCE").is_ok());
    match client.start_build(appliance_id, &options).await {
        Ok(build) => println!("{}", serde_json::to_string_pretty(&build)?),
        Err(ClientError::ImageAlreadyExists(message)) => {
            eprintln!("{message}\nSet STUDIO_FORCE=1 to rebuild.");
            std::process::exit(1);
        }
        Err(other) => return Err(other.into()),
    }
    Ok(())
}
