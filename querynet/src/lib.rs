//! # querynet
//!
//! querynet encodes short queries into bigram count features and runs them through small
//! sequential networks (masking, dense, activation and LSTM layers) exported from Keras. The
//! structure and weights of a model can be dumped as human-readable JSON.
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use querynet::{BigramTable, Model, SentenceEncoder};
//!
//! let mut f = BufReader::new(File::open("query.bin").unwrap());
//! let model = Model::read(&mut f).unwrap();
//!
//! let table = BigramTable::read(BufReader::new(File::open("bigrams.txt").unwrap())).unwrap();
//! let encoder = SentenceEncoder::new(&table, 10);
//! let data = encoder.encode("some cool query").unwrap();
//!
//! let output = model.predict(&data).unwrap();
//! println!("{}", output.to_text());
//! ```

mod bigram;
mod encoder;
mod layer;
mod model;
mod structure;
mod tensor;

pub mod dump;
pub mod errors;

pub use bigram::{BigramTable, BOUNDARY};
pub use encoder::{SentenceEncoder, DEFAULT_MAX_WORDS};
pub use layer::{Activation, ActivationLayer, Dense, Layer, Lstm, LstmGate, Masking};
pub use model::Model;
pub use structure::{LayerConfig, LayerStructure, ModelStructure};
pub use tensor::{format_value, Tensor};
