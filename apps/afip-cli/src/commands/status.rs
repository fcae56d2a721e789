//! Status command - Query the service's dummy operation

use crate::error::{CliError, CliResult};
use afip_auth::{
    AfipConfig, AfipService, DummyStatusCheck, FileTicketStore, ServiceClientFactory,
    ServiceContext, ServiceStatus,
};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Service name (wsfe, wsmtxca, wspn3, ...)
    pub service: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &AfipConfig) -> CliResult<()> {
    let service = AfipService::from_name(&args.service);
    let store = FileTicketStore::new();
    let context = ServiceContext::new(&service, &store, config);

    let client = ServiceClientFactory::new()
        .with_trace(false)
        .build(&context)
        .await?;
    let status = DummyStatusCheck.status(&service, &client).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("{service} ({})", client.endpoint());
        print_status(&status);
    }

    if status.is_healthy() {
        Ok(())
    } else {
        Err(CliError::ServiceUnavailable(format!(
            "{service} is not available ({})",
            status.summary()
        )))
    }
}

fn print_status(status: &ServiceStatus) {
    for (name, value) in afip_auth::status::STATUS_COMPONENTS.iter().zip([
        &status.app_server,
        &status.db_server,
        &status.auth_server,
    ]) {
        println!("  {name:<10} {}", value.as_deref().unwrap_or("?"));
    }
}
