//! Vendor command - list stored invoices of a vendor.

use clap::Args;
use console::style;

use super::Settings;

/// Arguments for the vendor command.
#[derive(Args)]
pub struct VendorArgs {
    /// Vendor name, matched exactly (case-sensitive)
    #[arg(required = true)]
    vendor_name: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

pub async fn run(args: VendorArgs, settings: &Settings) -> anyhow::Result<()> {
    let config = settings.load_config()?;
    let store = super::open_store(&config)?;

    let listing = store.invoices_by_vendor(&args.vendor_name)?;
    if listing.is_unknown() {
        eprintln!(
            "{} No invoices stored for vendor '{}'",
            style("ℹ").blue(),
            args.vendor_name
        );
    }

    println!("{}", super::to_json(&listing, args.pretty)?);
    Ok(())
}
