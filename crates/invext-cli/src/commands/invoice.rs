//! Invoice command - show a stored invoice.

use clap::Args;

use super::Settings;

/// Arguments for the invoice command.
#[derive(Args)]
pub struct InvoiceArgs {
    /// Invoice identifier as extracted (e.g. "36259")
    #[arg(required = true)]
    invoice_id: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

pub async fn run(args: InvoiceArgs, settings: &Settings) -> anyhow::Result<()> {
    let config = settings.load_config()?;
    let store = super::open_store(&config)?;

    match store.invoice_by_id(&args.invoice_id)? {
        Some(invoice) => {
            println!("{}", super::to_json(&invoice, args.pretty)?);
            Ok(())
        }
        None => anyhow::bail!("Invoice not found: {}", args.invoice_id),
    }
}
