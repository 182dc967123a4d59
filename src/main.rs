use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hcertdec::report;
use hcertdec::valuesets::ValueSets;

/// Decode an EU Digital Covid Certificate QR payload.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// File holding the HC1: payload; standard input when omitted
    input: Option<PathBuf>,

    /// Print the certificate as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let data = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };

    let decoded = hcertdec::decode(&data).context("decoding certificate")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&decoded.certificate)?);
    } else {
        print!("{}", report::render(&decoded, &ValueSets::builtin()));
    }

    Ok(())
}
