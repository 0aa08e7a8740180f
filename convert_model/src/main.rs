use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use querynet::dump::WeightDump;
use querynet::{Model, ModelStructure};

#[derive(Parser, Debug)]
#[command(
    name = "convert_model",
    about = "A program to build a model file from dumped structure and weights."
)]
struct Args {
    /// Model structure in the Keras JSON format
    #[arg(long, default_value = "model-structure.json")]
    structure: PathBuf,

    /// Model weights as written by dump_model
    #[arg(long, default_value = "model-weights.json")]
    weights: PathBuf,

    /// Output path of the model file
    #[arg(long)]
    model_out: PathBuf,

    /// Compression level of zstd
    #[arg(long, default_value = "19")]
    zstd_level: i32,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    eprintln!("Loading structure file...");
    let structure: ModelStructure =
        serde_json::from_reader(BufReader::new(File::open(args.structure)?))?;

    eprintln!("Loading weights file...");
    let weights: WeightDump = serde_json::from_reader(BufReader::new(File::open(args.weights)?))?;

    let model = Model::from_dump(&structure, &weights)?;
    eprintln!("# of layers: {}", model.layers().len());

    eprintln!("Saving model file...");
    let mut f = zstd::Encoder::new(File::create(args.model_out)?, args.zstd_level)?;
    f.multithread(args.zstd_workers)?;
    model.write(&mut f)?;
    f.finish()?;

    Ok(())
}
