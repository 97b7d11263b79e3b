/// This module defines functions to load training data from a database.
/// The current implementation handles the generated hand set, where every
/// sample is a class colour image (PNG) next to a depth image (EXR).

pub mod reader;
pub mod generated;

pub use self::reader::{SampleReader, TrainingSample, pad_samples};
pub use self::generated::{GeneratedSetReader, ReadError};
