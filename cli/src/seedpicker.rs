use anyhow::{Context, Result};
use clap::Args;
use multiwallet::seedpicker::{key_record, valid_final_words};

#[derive(Args)]
pub struct SeedpickerArgs {
    /// The first words of the seed phrase (all but the last)
    #[arg(required = true)]
    words: Vec<String>,
    /// Produce a mainnet key record instead of testnet
    #[arg(long)]
    mainnet: bool,
}

pub fn handle_command(args: SeedpickerArgs) -> Result<()> {
    let first_words = args.words.join(" ");
    let candidates =
        valid_final_words(&first_words).context("Failed to complete the seed phrase")?;

    println!("Valid final words ({}):", candidates.len());
    for word in &candidates {
        println!("  {}", word);
    }

    // completing with the first candidate mirrors picking it by hand
    let phrase = format!("{} {}", first_words.trim(), candidates[0]);
    let record = key_record(&phrase, !args.mainnet)?;
    println!();
    println!("Key record when completed with \"{}\":", candidates[0]);
    println!("  {}", record);
    Ok(())
}
