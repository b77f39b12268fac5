use clap::Parser;
use sdat2ncsf::{ConvertOptions, Converter, LengthConfig};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sdat2ncsf")]
#[command(version = "0.1.0")]
#[command(about = "Nintendo DS SDAT to NCSF converter", long_about = None)]
struct Args {
    /// Input SDAT file
    input: PathBuf,

    /// Output directory (defaults to the input file's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip sequence length detection
    #[arg(long)]
    no_time: bool,

    /// Number of loops a looping sequence is timed to
    #[arg(short, long, default_value_t = 2)]
    loops: u32,

    /// Fade seconds for looping sequences
    #[arg(long, default_value_t = 10)]
    fade_loop: u32,

    /// Fade seconds for one-shot sequences
    #[arg(long, default_value_t = 0)]
    fade_one_shot: u32,

    /// Only convert this sequence number (repeatable)
    #[arg(short, long = "sequence")]
    sequences: Vec<usize>,

    /// Print the detected time of every sequence
    #[arg(short, long)]
    verbose: bool,

    /// Write a JSON timing report to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<(), sdat2ncsf::Error> {
    env_logger::init();
    let args = Args::parse();

    let out_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => args
            .input
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default(),
    };

    let options = ConvertOptions {
        time: !args.no_time,
        sequences: (!args.sequences.is_empty()).then(|| args.sequences.clone()),
        length: LengthConfig {
            number_of_loops: args.loops,
            fade_loop: args.fade_loop,
            fade_one_shot: args.fade_one_shot,
            verbose: args.verbose,
            ..Default::default()
        },
    };

    let reports = Converter::new(options).convert_file(&args.input, &out_dir)?;

    if let Some(path) = args.report {
        let json = serde_json::to_string_pretty(&reports)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
    }

    Ok(())
}
