//! Ticket command - Report whether the stored access ticket is usable

use crate::error::{CliError, CliResult};
use afip_auth::{
    AfipConfig, AfipService, FileTicketStore, ManualIssuer, ServiceContext, StoredTicketRenewal,
    TicketState,
};
use chrono::{DateTime, FixedOffset, Utc};
use clap::Args;
use serde::Serialize;

/// Arguments for the ticket command
#[derive(Args, Debug)]
pub struct TicketArgs {
    /// Service name (wsfe, wsmtxca, wspn3, ...)
    pub service: String,

    /// Renewal margin in seconds
    #[arg(long, default_value_t = afip_auth::renewal::DEFAULT_RENEWAL_LEEWAY_SECS)]
    pub leeway: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output for ticket
#[derive(Debug, Serialize, PartialEq)]
struct TicketOutput {
    service: String,
    path: String,
    state: &'static str,
    expires_at: Option<DateTime<FixedOffset>>,
    remaining_secs: Option<i64>,
}

impl TicketOutput {
    fn new(service: &AfipService, path: String, state: &TicketState, now: DateTime<Utc>) -> Self {
        let (label, expires_at) = match state {
            TicketState::Fresh { expires_at } => ("fresh", Some(*expires_at)),
            TicketState::Stale { expires_at } => ("stale", *expires_at),
            TicketState::Missing => ("missing", None),
            TicketState::Unreadable => ("unreadable", None),
        };

        Self {
            service: service.to_string(),
            path,
            state: label,
            expires_at,
            remaining_secs: expires_at.map(|at| (at.with_timezone(&Utc) - now).num_seconds()),
        }
    }
}

fn validate(args: &TicketArgs) -> CliResult<()> {
    if args.leeway < 0 {
        return Err(CliError::Validation(format!(
            "--leeway must not be negative, got {}",
            args.leeway
        )));
    }
    Ok(())
}

/// Execute the ticket command
pub async fn execute(args: TicketArgs, config: &AfipConfig) -> CliResult<()> {
    validate(&args)?;
    let service = AfipService::from_name(&args.service);
    let store = FileTicketStore::new();
    let context = ServiceContext::new(&service, &store, config);

    let renewal =
        StoredTicketRenewal::new(ManualIssuer).with_leeway(chrono::Duration::seconds(args.leeway));
    let now = Utc::now();
    let state = renewal.inspect_at(&context, now).await?;
    let output = TicketOutput::new(&service, context.ticket_path(), &state, now);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Ticket: {}", output.path);
        println!("  State:   {}", output.state);
        if let Some(expires_at) = output.expires_at {
            println!("  Expires: {}", expires_at.to_rfc3339());
        }
        if let Some(secs) = output.remaining_secs.filter(|s| *s > 0) {
            println!("  Remaining: {}h {}m", secs / 3600, (secs % 3600) / 60);
        }
    }

    Ok(())
}
