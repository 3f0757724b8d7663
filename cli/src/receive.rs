use anyhow::{Context, Result};
use clap::Args;
use multiwallet::{derive_addresses, WalletDescriptor};

#[derive(Args)]
pub struct ReceiveArgs {
    /// Output descriptor of the wallet, e.g. wsh(sortedmulti(2,...))
    descriptor: String,
    /// Index of the first address to derive
    #[arg(long, default_value_t = 0)]
    offset: u32,
    /// Number of addresses to derive
    #[arg(long, default_value_t = 5)]
    limit: u32,
}

pub fn handle_command(args: ReceiveArgs) -> Result<()> {
    let wallet =
        WalletDescriptor::parse(&args.descriptor).context("Failed to parse the descriptor")?;
    for entry in derive_addresses(&wallet, args.offset, args.limit)? {
        let (index, address) = entry?;
        println!("#{}: {}", index, address);
    }
    Ok(())
}
