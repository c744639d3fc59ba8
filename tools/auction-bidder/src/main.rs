//! auction-bidder: create bidder identities and sign bids.

use std::path::PathBuf;

use anyhow::Result;
use auction_arbiter::domain::signature::DEFAULT_KEY_BITS;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use auction_bidder::{keygen, sign_with_key_file};

#[derive(Parser)]
#[command(name = "auction-bidder")]
#[command(about = "Generate bidder keys and sign auction bids")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an RSA key pair and register the public key
    Keygen {
        /// Bidder identifier
        #[arg(long)]
        user: String,

        /// Directory of registered public keys
        #[arg(long, default_value = "public_keys")]
        keys_dir: PathBuf,

        /// Where to write the private key (PKCS#8 PEM)
        #[arg(long)]
        out: PathBuf,

        /// RSA modulus size
        #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
        bits: usize,
    },

    /// Print a signed bid-submitted payload as JSON
    Sign {
        /// Private key file (PKCS#8 PEM)
        #[arg(long)]
        key: PathBuf,

        /// Bidder identifier
        #[arg(long)]
        user: String,

        /// Auction identifier
        #[arg(long)]
        auction: String,

        /// Bid value, at most two decimals
        #[arg(long)]
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen {
            user,
            keys_dir,
            out,
            bits,
        } => {
            let identity = keygen(&user, &keys_dir, &out, bits).await?;
            println!("public key:  {}", identity.public_key.display());
            println!("private key: {}", identity.private_key.display());
        }
        Commands::Sign {
            key,
            user,
            auction,
            value,
        } => {
            let json = sign_with_key_file(&key, &user, &auction, &value).await?;
            println!("{json}");
        }
    }

    Ok(())
}
