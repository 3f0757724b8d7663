use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use multiwallet::validate_transaction;

use crate::input::read_input_string;
use crate::network::NetworkArg;

#[derive(Args)]
pub struct DecodeArgs {
    /// Path to the base64 PSBT file (use '-' to read from stdin)
    path: PathBuf,
    /// Network of the PSBT; inferred from its key paths when omitted
    #[arg(long, short, value_enum)]
    network: Option<NetworkArg>,
    /// Emit the summary as JSON instead of text
    #[arg(long)]
    json: bool,
    /// List every input and output of the transaction
    #[arg(long)]
    verbose: bool,
}

pub fn handle_command(args: DecodeArgs) -> Result<()> {
    let psbt_b64 = read_input_string(&args.path, "PSBT")?;
    let summary = validate_transaction(psbt_b64.trim(), args.network.map(Into::into))
        .context("PSBT failed validation")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if args.verbose {
        println!("{}", summary.detailed_report());
    } else {
        println!("{}", summary);
    }
    Ok(())
}
