//! `pacsketch` estimates the cardinality of large record streams and the Jaccard similarity
//! between two streams without storing the full sets, using HyperLogLog and MinHash sketches.
//!
//! On top of the sketches it provides a windowed-sampling simulation which draws random windows
//! from labeled `normal` and `attack` corpora and scores how attack-like each window is.
//!
//! ```
//! use pacsketch::{SketchConfig, SketchTrait};
//!
//! let config = SketchConfig::MinHash { k: 64 };
//! let a = config.build_from_records(["GET /", "GET /index", "POST /login"]).unwrap();
//! let b = config.build_from_records(["GET /", "GET /index", "GET /admin"]).unwrap();
//! assert_eq!(a.estimate(), 3);
//! assert_eq!(a.jaccard(&b).unwrap(), 0.5);
//! ```
pub mod corpus;
pub mod error;
pub mod hash;
pub mod hyperloglog;
pub mod minhash;
pub mod registers;
pub mod similarity;
pub mod simulation;
pub mod sketch;

pub use corpus::{LabeledDataset, ReferenceCorpus};
pub use error::{SimulationError, SketchError};
pub use hash::HashOracle;
pub use hyperloglog::HyperLogLog;
pub use minhash::MinHash;
pub use similarity::{compare, Comparison, JaccardIndex};
pub use simulation::{Simulation, SimulationConfig};
pub use sketch::{Sketch, SketchConfig, SketchKind, SketchTrait};
