use anyhow::Context;
use sso_client::SsoConfig;

use super::args::*;

pub mod check;
pub mod cookie_name;
pub mod redirect;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = load_config(&cli.global)?;
    match cli.cmd {
        Command::Check(args) => check::run(args, config).await,
        Command::CookieName => cookie_name::run(config).await,
        Command::LoginUrl(args) => redirect::login(args, &config),
        Command::LogoutUrl(args) => redirect::logout(args, &config),
    }
}

/// Resolve configuration from `--config/--env`, falling back to SSO_* variables.
fn load_config(global: &GlobalArgs) -> anyhow::Result<SsoConfig> {
    match (&global.config, &global.env) {
        (Some(path), Some(env)) => SsoConfig::load(path, env)
            .with_context(|| format!("failed to load {} from {}", env, path.display())),
        _ => Ok(SsoConfig::from_env()),
    }
}
