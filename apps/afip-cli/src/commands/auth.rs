//! Auth command - Authenticate against one service and print the credential

use crate::error::CliResult;
use afip_auth::{AfipConfig, AuthenticatedSession, Authenticator, Credential, ServiceClientFactory};
use clap::Args;
use serde::Serialize;

/// Arguments for the auth command
#[derive(Args, Debug)]
pub struct AuthArgs {
    /// Service name (wsfe, wsmtxca, wspn3, ...)
    pub service: String,

    /// Print the SOAP header fragment instead of JSON
    #[arg(long)]
    pub xml: bool,

    /// Fail if the service has no credential shape
    #[arg(long)]
    pub strict: bool,
}

/// JSON output for auth
#[derive(Serialize)]
struct AuthOutput<'a> {
    service: &'a str,
    endpoint: &'a str,
    credential: &'a Credential,
}

/// Execute the auth command
pub async fn execute(args: AuthArgs, config: &AfipConfig) -> CliResult<()> {
    let session = Authenticator::new()
        .with_client_factory(ServiceClientFactory::new().with_trace(false))
        .authenticate(config, &args.service)
        .await?;

    if args.strict {
        session.credential.ensure_usable(&session.service)?;
    } else if let Some(reason) = session.credential.unset_reason() {
        tracing::warn!(service = %session.service, %reason, "Credential is unset");
    }

    println!("{}", render(&session, args.xml)?);
    Ok(())
}

fn render(session: &AuthenticatedSession, xml: bool) -> CliResult<String> {
    if xml {
        return Ok(session.credential.to_xml());
    }

    let output = AuthOutput {
        service: session.service.name(),
        endpoint: session.client.endpoint(),
        credential: &session.credential,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}
