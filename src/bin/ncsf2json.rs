//! NCSF to JSON dumper

use clap::Parser;
use sdat2ncsf::ncsf::{NcsfFile, NcsfJson};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ncsf2json")]
#[command(version = "0.1.0")]
#[command(about = "Dump NCSF/MININCSF headers and tags as JSON", long_about = None)]
struct Args {
    /// Input NCSF, NCSFLIB or MININCSF file
    input: PathBuf,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let file = NcsfFile::from_path(&args.input)?;
    let ncsf_json = NcsfJson::new(&file);

    let json_string = if args.compact {
        serde_json::to_string(&ncsf_json)?
    } else {
        serde_json::to_string_pretty(&ncsf_json)?
    };

    match args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(json_string.as_bytes())?;
            file.write_all(b"\n")?;
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}
