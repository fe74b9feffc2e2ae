use sso_client::{IdentityClient, SsoConfig};
use tracing::info;

use crate::exit_codes;

pub async fn run(config: SsoConfig) -> anyhow::Result<i32> {
    let client = IdentityClient::new(config)?;
    let name = client.discover_cookie_name().await?;
    info!(cookie_name = %name, "cookie name discovered");
    println!("{}", name);
    Ok(exit_codes::SUCCESS)
}
