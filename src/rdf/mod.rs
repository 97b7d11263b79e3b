//! A randomized decision forest classifying every pixel of a depth image
//! into one of the hand classes.
//!
//! For literature see
//! * https://www.microsoft.com/en-us/research/publication/real-time-human-pose-recognition-in-parts-from-a-single-depth-image/

pub mod feature;
pub mod node;
pub mod backend;
pub mod tree;
pub mod forest;
pub mod model;

pub use self::feature::{Decision, Direction, evaluate_feature};
pub use self::backend::{BackendError, CpuBackend, TrainBackend};
pub use self::tree::{DecisionTree, TrainReport, TreeParams};
pub use self::forest::{BestPoints, Classification, ClassesPoints, ClassesWeights,
                       ForestError, ForestTrainContext, RandomDecisionForest, TrainError,
                       TrainParams};
pub use self::model::ModelError;
