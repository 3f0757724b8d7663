use anyhow::Result;
use clap::{Parser, Subcommand};

mod decode;
mod input;
mod network;
mod receive;
mod seedpicker;
mod sign;

#[derive(Parser)]
#[command(
    name = "multiwallet",
    about = "Stateless multisig wallet coordinator",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive receiving addresses from an output descriptor
    Receive(receive::ReceiveArgs),
    /// Validate a PSBT and summarize what it spends
    Decode(decode::DecodeArgs),
    /// Validate and cosign a PSBT with a seed phrase
    Sign(sign::SignArgs),
    /// Complete a partial seed phrase and export its account key
    Seedpicker(seedpicker::SeedpickerArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Receive(args) => receive::handle_command(args),
        Commands::Decode(args) => decode::handle_command(args),
        Commands::Sign(args) => sign::handle_command(args),
        Commands::Seedpicker(args) => seedpicker::handle_command(args),
    }
}
