//! The computation needed while growing a tree is hidden behind two traits,
//! so that another backend (e.g. on a GPU) can replace the CPU one.

use std::error::Error;
use std::fmt;

use rayon::prelude::*;

use classes::NUM_CLASSES;
use types::{DepthImage, Pixel};
use super::feature::{Decision, Direction, evaluate_feature};

/// Failure of a backend. The trainer fills in the tree and node
/// it was working on.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendError {
    pub tree: Option<usize>,
    pub node: Option<usize>,
    pub message: String,
}

impl BackendError {
    pub fn new<S: Into<String>>(message: S) -> BackendError {
        BackendError {
            tree: None,
            node: None,
            message: message.into(),
        }
    }

    pub fn at(self, tree: usize, node: usize) -> BackendError {
        BackendError {
            tree: Some(tree),
            node: Some(node),
            ..self
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.tree, self.node) {
            (Some(t), Some(n)) => write!(f, "Backend failed at tree {} node {}: {}", t, n, self.message),
            _ => write!(f, "Backend failed: {}", self.message),
        }
    }
}

impl Error for BackendError {}

/// Sends every pixel left or right.
pub trait FeatureEvaluator {
    /// Evaluates `decision` for every pixel and writes the result into
    /// `directions` (same order as `pixels`). A pixel is looked up in
    /// `depth_images[pixel.image_id]`.
    fn evaluate(&self,
                decision: &Decision,
                pixels: &[Pixel],
                depth_images: &[DepthImage],
                directions: &mut Vec<Direction>)
                -> Result<(), BackendError>;
}

/// Counts classes.
pub trait ProbabilityAggregator {
    /// Number of pixels per class.
    fn histogram(&self, pixels: &[Pixel]) -> Result<Vec<u32>, BackendError>;

    /// Number of pixels per class on the left and on the right side.
    fn split_histograms(&self,
                        pixels: &[Pixel],
                        directions: &[Direction])
                        -> Result<(Vec<u32>, Vec<u32>), BackendError>;
}

/// Everything a tree needs to be trained
pub trait TrainBackend: FeatureEvaluator + ProbabilityAggregator + Sync {}

impl<T> TrainBackend for T where T: FeatureEvaluator + ProbabilityAggregator + Sync {}

/// Computes on the CPU. Subsets larger than `parallel_threshold` are
/// handled by the rayon pool in which the training runs.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct CpuBackend {
    pub parallel_threshold: usize,
}

impl Default for CpuBackend {
    fn default() -> CpuBackend {
        CpuBackend { parallel_threshold: 10000 }
    }
}

#[inline]
fn direction_of(decision: &Decision,
                pixel: &Pixel,
                depth_images: &[DepthImage])
                -> Result<Direction, BackendError> {
    match depth_images.get(pixel.image_id as usize) {
        Some(img) => Ok(evaluate_feature(decision, img, pixel)),
        None => Err(BackendError::new(format!("No depth image with id {}", pixel.image_id))),
    }
}

#[inline]
fn count_into(hist: &mut [u32], pixel: &Pixel) -> Result<(), BackendError> {
    let c = pixel.class_index;
    if c < 0 || c as usize >= NUM_CLASSES {
        return Err(BackendError::new(format!("Class index {} out of range", c)));
    }
    hist[c as usize] += 1;
    Ok(())
}

fn count(pixels: &[Pixel]) -> Result<Vec<u32>, BackendError> {
    let mut hist = vec![0; NUM_CLASSES];
    for p in pixels {
        count_into(&mut hist, p)?;
    }
    Ok(hist)
}

fn merge(mut a: Vec<u32>, b: Vec<u32>) -> Vec<u32> {
    for (x, y) in a.iter_mut().zip(b) {
        *x += y;
    }
    a
}

impl CpuBackend {
    fn chunk_size(&self, len: usize) -> usize {
        let threads = ::rayon::current_num_threads().max(1);
        (len / threads).max(self.parallel_threshold.max(1))
    }
}

impl FeatureEvaluator for CpuBackend {
    fn evaluate(&self,
                decision: &Decision,
                pixels: &[Pixel],
                depth_images: &[DepthImage],
                directions: &mut Vec<Direction>)
                -> Result<(), BackendError> {
        directions.clear();
        if pixels.len() > self.parallel_threshold {
            let res: Result<Vec<Direction>, BackendError> = pixels.par_iter()
                .map(|p| direction_of(decision, p, depth_images))
                .collect();
            *directions = res?;
        } else {
            directions.reserve(pixels.len());
            for p in pixels {
                directions.push(direction_of(decision, p, depth_images)?);
            }
        }
        Ok(())
    }
}

impl ProbabilityAggregator for CpuBackend {
    fn histogram(&self, pixels: &[Pixel]) -> Result<Vec<u32>, BackendError> {
        if pixels.len() > self.parallel_threshold {
            pixels.par_chunks(self.chunk_size(pixels.len()))
                .map(count)
                .try_reduce(|| vec![0; NUM_CLASSES], |a, b| Ok(merge(a, b)))
        } else {
            count(pixels)
        }
    }

    fn split_histograms(&self,
                        pixels: &[Pixel],
                        directions: &[Direction])
                        -> Result<(Vec<u32>, Vec<u32>), BackendError> {
        if pixels.len() != directions.len() {
            return Err(BackendError::new(format!("{} pixels but {} directions",
                                                 pixels.len(),
                                                 directions.len())));
        }
        let split = |pixels: &[Pixel],
                     directions: &[Direction]|
                     -> Result<(Vec<u32>, Vec<u32>), BackendError> {
            let mut left = vec![0; NUM_CLASSES];
            let mut right = vec![0; NUM_CLASSES];
            for (p, d) in pixels.iter().zip(directions) {
                match *d {
                    Direction::Left => count_into(&mut left, p)?,
                    Direction::Right => count_into(&mut right, p)?,
                }
            }
            Ok((left, right))
        };
        if pixels.len() > self.parallel_threshold {
            let chunk = self.chunk_size(pixels.len());
            pixels.par_chunks(chunk)
                .zip(directions.par_chunks(chunk))
                .map(|(p, d)| split(p, d))
                .try_reduce(|| (vec![0; NUM_CLASSES], vec![0; NUM_CLASSES]),
                            |a, b| Ok((merge(a.0, b.0), merge(a.1, b.1))))
        } else {
            split(pixels, directions)
        }
    }
}
