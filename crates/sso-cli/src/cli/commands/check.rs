use serde_json::json;
use sso_client::{IdentityClient, Session, SsoConfig, SsoError, Verdict};

use super::super::args::CheckArgs;
use crate::exit_codes;

pub async fn run(args: CheckArgs, config: SsoConfig) -> anyhow::Result<i32> {
    let client = IdentityClient::new(config)?;
    let mut session = Session::new(&client, args.token);

    let verdict = session.validate().await;
    let code = match &verdict {
        Verdict::Valid => exit_codes::SUCCESS,
        Verdict::Invalid => exit_codes::INVALID_SESSION,
        Verdict::Forbidden => exit_codes::FORBIDDEN,
        Verdict::TransportError(SsoError::CertificateMismatch { .. }) => exit_codes::CERT_MISMATCH,
        Verdict::TransportError(_) => exit_codes::TRANSPORT_ERROR,
    };

    if args.json {
        let mut out = json!({
            "verdict": verdict_name(&verdict),
            "exit_code": code,
        });
        match &verdict {
            Verdict::Valid => out["attributes"] = json!(session.all_attributes(false)),
            Verdict::TransportError(e) => out["error"] = json!(e.to_string()),
            _ => {}
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(code);
    }

    match &verdict {
        Verdict::Valid => {
            println!("valid");
            for (name, value) in session.all_attributes(true) {
                println!("  {}: {}", name, value.values().join(", "));
            }
        }
        Verdict::Invalid => println!("invalid"),
        Verdict::Forbidden => eprintln!("forbidden: identity service refused the validation query"),
        Verdict::TransportError(e) => eprintln!("error: {}", e),
    }

    Ok(code)
}

fn verdict_name(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Valid => "valid",
        Verdict::Invalid => "invalid",
        Verdict::Forbidden => "forbidden",
        Verdict::TransportError(_) => "transport_error",
    }
}
