use std::f32;
use std::iter::Iterator;
use std::result::Result;

use image::Luma;

use types::*;

/// Ground truth of one sample for training a decision forest
#[derive(Debug, Clone)]
pub struct TrainingSample {
    /// The index of the sample within the database
    pub index: usize,
    /// The class of every pixel
    pub classes: ClassImage,
    /// The depth image (in meters), same size as `classes`
    pub depth: DepthImage,
}

/// Trait for reading training data from a database.
pub trait SampleReader {
    type Err;

    /// Returns the indices of all samples found in the database (sorted)
    fn available_indices(&self) -> Result<Vec<usize>, Self::Err>;

    /// Returns true if the sample with the given index exists
    fn contains(&self, index: usize) -> bool;

    /// Loads a single sample.
    fn load(&self, index: usize) -> Result<TrainingSample, Self::Err>;

    /// Loads every `step`th sample from `start` (inclusive) to `stop`
    /// (exclusive). Missing samples are skipped. All samples are padded
    /// to the same power of two size.
    fn load_range(&self,
                  start: usize,
                  stop: usize,
                  step: usize)
                  -> Result<Vec<TrainingSample>, Self::Err> {
        let mut samples = Vec::new();
        for index in (start..stop).step_by(step.max(1)) {
            if !self.contains(index) {
                warn!("Sample {} not found, skipping", index);
                continue;
            }
            samples.push(self.load(index)?);
            info!("Loaded sample {}", index);
        }
        pad_samples(&mut samples);
        Ok(samples)
    }
}

/// Pads every sample at the right and bottom to the smallest power of two
/// which fits all of them. Classes are padded with background, the depth
/// with `f32::MAX`.
pub fn pad_samples(samples: &mut [TrainingSample]) {
    let width = samples.iter().map(|s| s.classes.width()).max().unwrap_or(0).next_power_of_two();
    let height = samples.iter().map(|s| s.classes.height()).max().unwrap_or(0).next_power_of_two();
    for sample in samples.iter_mut() {
        if sample.classes.dimensions() == (width, height) {
            continue;
        }
        let (w, h) = sample.classes.dimensions();
        let inside = |x: u32, y: u32| x < w && y < h;
        {
            let classes = &sample.classes;
            sample.classes = ClassImage::from_fn(width, height, |x, y| if inside(x, y) {
                classes[(x, y)]
            } else {
                Luma([BACKGROUND_INDEX])
            });
        }
        let depth = &sample.depth;
        sample.depth = DepthImage::from_fn(width, height, |x, y| if inside(x, y) {
            depth[(x, y)]
        } else {
            Luma([f32::MAX])
        });
    }
}
