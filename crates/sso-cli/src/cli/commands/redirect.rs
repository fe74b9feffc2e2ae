use anyhow::bail;
use sso_client::{redirect, SsoConfig};

use super::super::args::RedirectArgs;
use crate::exit_codes;

pub fn login(args: RedirectArgs, config: &SsoConfig) -> anyhow::Result<i32> {
    print_redirect("login_url", &config.login_url, &args.goto)
}

pub fn logout(args: RedirectArgs, config: &SsoConfig) -> anyhow::Result<i32> {
    print_redirect("logout_url", &config.logout_url, &args.goto)
}

fn print_redirect(field: &str, base: &str, goto: &str) -> anyhow::Result<i32> {
    if base.is_empty() {
        bail!("{} is not configured", field);
    }
    println!("{}", redirect::with_goto(base, goto));
    Ok(exit_codes::SUCCESS)
}
