use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use multiwallet::sign_transaction;

use crate::input::read_input_string;
use crate::network::NetworkArg;

#[derive(Args)]
pub struct SignArgs {
    /// Path to the base64 PSBT file (use '-' to read from stdin)
    path: PathBuf,
    /// Full BIP39 seed phrase of the signing cosigner
    #[arg(long)]
    mnemonic: Option<String>,
    /// Read the seed phrase from a file instead of the command line
    #[arg(long, conflicts_with = "mnemonic")]
    mnemonic_file: Option<PathBuf>,
    /// Network of the PSBT; inferred from its key paths when omitted
    #[arg(long, short, value_enum)]
    network: Option<NetworkArg>,
}

pub fn handle_command(args: SignArgs) -> Result<()> {
    let mnemonic = match (args.mnemonic, args.mnemonic_file) {
        (Some(phrase), None) => phrase,
        (None, Some(path)) => read_input_string(&path, "seed phrase")?,
        _ => anyhow::bail!("Provide the seed phrase with --mnemonic or --mnemonic-file"),
    };
    let psbt_b64 = read_input_string(&args.path, "PSBT")?;

    let signed = sign_transaction(psbt_b64.trim(), &mnemonic, args.network.map(Into::into))
        .context("Failed to sign the PSBT")?;
    println!("{}", signed);
    Ok(())
}
