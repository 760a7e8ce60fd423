//! List appliances and their status with the blocking `BlockingStudioClient`.
//!
//! Run:
//! `STUDIO_USER=<login> STUDIO_API_KEY=<key> cargo run --example blocking_list_appliances`
//!
//! Optional env vars:
//! - `STUDIO_BASE_URL` (defaults to the public Studio user API)

use studio_api::BlockingStudioClient;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (Ok(user), Ok(api_key)) = (std::env::var("STUDIO_USER"), std::env::var("STUDIO_API_KEY"))
    else {
        eprintln!("Set STUDIO_USER and STUDIO_API_KEY before running this example.");
        std::process::exit(2);
    };

    let client = match std::env::var("STUDIO_BASE_URL") {
        Ok(url) => BlockingStudioClient::new(url)?,
        Err(_) => BlockingStudioClient::from_default_server()?,
    }
    .with_credentials(user, api_key);

    for appliance in client.appliances()? {
        let status = client.appliance_status(appliance.id)?;
        println!(
            "{:>8}  {:<40}  {}",
            appliance.id,
            appliance.name.as_deref().unwrap_or("-"),
            status.state
        );
        for issue in &status.issues {
            println!("          - {}", issue.text.as_deref().unwrap_or("unknown issue"));
        }
    }
    Ok(())
}
