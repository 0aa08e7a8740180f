use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use querynet::dump::read_data;
use querynet::{BigramTable, Model, SentenceEncoder, DEFAULT_MAX_WORDS};

#[derive(Parser, Debug)]
#[command(
    name = "predict",
    about = "A program to run a trained model on encoded or raw queries.",
    group = ArgGroup::new("input").required(true),
)]
struct Args {
    /// The model file to use when running queries
    #[arg(long)]
    model: PathBuf,

    /// An encoded query written by dump_model
    #[arg(long, group = "input")]
    data: Option<PathBuf>,

    /// A raw query, encoded with the table given by --bigrams
    #[arg(long, group = "input", requires = "bigrams")]
    query: Option<String>,

    /// A bigram table whose line order defines the feature indices
    #[arg(long)]
    bigrams: Option<PathBuf>,

    /// Number of words the encoded query can hold
    #[arg(long, default_value_t = DEFAULT_MAX_WORDS)]
    max_words: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    eprintln!("Loading model file...");
    let mut f = zstd::Decoder::new(File::open(args.model)?)?;
    let model = Model::read(&mut f)?;

    let data = if let Some(path) = args.data {
        eprintln!("Loading data file...");
        read_data(BufReader::new(File::open(path)?))?
    } else {
        eprintln!("Loading bigram table...");
        // Both options are enforced by clap.
        let path = args.bigrams.ok_or("--bigrams is required")?;
        let query = args.query.ok_or("--query is required")?;
        let table = BigramTable::read(BufReader::new(File::open(path)?))?;
        SentenceEncoder::new(&table, args.max_words).encode(&query)?
    };

    let output = model.predict(&data)?;
    println!("Perform: {}", output.to_text());

    Ok(())
}
