use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sso",
    version,
    about = "Check single-sign-on sessions against an identity service"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// YAML metadata file with named environments (default: SSO_* environment variables)
    #[arg(long, global = true, requires = "env")]
    pub config: Option<PathBuf>,

    /// Environment to use from the metadata file
    #[arg(long, global = true)]
    pub env: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a session token and print its attributes
    Check(CheckArgs),
    /// Ask the identity service for the session cookie name
    CookieName,
    /// Print the login redirect URL
    LoginUrl(RedirectArgs),
    /// Print the logout redirect URL
    LogoutUrl(RedirectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Session token (cookie value)
    #[arg(long)]
    pub token: String,

    /// Print the verdict and attributes as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RedirectArgs {
    /// Return address after login/logout
    #[arg(long, default_value = "")]
    pub goto: String,
}
