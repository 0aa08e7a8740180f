use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use querynet::dump::{dump_weights, write_data, write_json};
use querynet::{BigramTable, Model, SentenceEncoder, DEFAULT_MAX_WORDS};

#[derive(Parser, Debug)]
#[command(
    name = "dump_model",
    about = "A program to run a query through a trained model and dump its internals."
)]
struct Args {
    /// Input path of the model file
    #[arg(long, default_value = "query.bin")]
    model: PathBuf,

    /// A bigram table whose line order defines the feature indices
    #[arg(long, default_value = "bigrams.txt")]
    bigrams: PathBuf,

    /// The query to encode and run
    #[arg(long, default_value = "some cool query")]
    query: String,

    /// Number of words the encoded query can hold
    #[arg(long, default_value_t = DEFAULT_MAX_WORDS)]
    max_words: usize,

    /// Output path of the model structure
    #[arg(long, default_value = "model-structure.json")]
    structure: PathBuf,

    /// Output path of the model weights
    #[arg(long, default_value = "model-weights.json")]
    weights: PathBuf,

    /// Output path of the encoded query
    #[arg(long, default_value = "data.txt")]
    data: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    eprintln!("Loading model file...");
    let mut f = zstd::Decoder::new(File::open(args.model)?)?;
    let model = Model::read(&mut f)?;

    eprintln!("Saving structure file...");
    let mut f = BufWriter::new(File::create(args.structure)?);
    write_json(&mut f, &model.structure())?;
    f.flush()?;

    eprintln!("Loading bigram table...");
    let table = BigramTable::read(BufReader::new(File::open(args.bigrams)?))?;
    eprintln!("# of features: {}", table.len());

    let encoder = SentenceEncoder::new(&table, args.max_words);
    let data = encoder.encode(&args.query)?;

    let output = model.predict(&data)?;
    println!("Perform: {}", output.to_text());

    eprintln!("Saving weights file...");
    let mut f = BufWriter::new(File::create(args.weights)?);
    write_json(&mut f, &dump_weights(&model))?;
    f.flush()?;

    eprintln!("Saving data file...");
    let mut f = BufWriter::new(File::create(args.data)?);
    write_data(&mut f, &data)?;
    f.flush()?;

    Ok(())
}
