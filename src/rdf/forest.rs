//! Training and classification of a whole forest.

use std::error::Error;
use std::fmt;

use image::Luma;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use classes::NUM_CLASSES;
use types::*;
use vecmat::Vec2i;
use super::backend::{BackendError, CpuBackend, TrainBackend};
use super::tree::{DecisionTree, TrainReport, TreeParams};

/// Sampling of an image is aborted after so many draws
/// in a row hitting already sampled pixels.
const MAX_SAMPLE_RETRIES: usize = 1000;

/// Number of seed points kept per class
pub const BEST_POINTS_CAPACITY: usize = 5;

/// Parameters to train a forest.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TrainParams {
    /// Number of trees trained at the same time
    pub thread_count: usize,
    /// Number of foreground pixels sampled from every image for every tree
    pub pixels_per_image: usize,
    /// Number of random decisions tried per node
    pub node_train_limit: usize,
    /// Maximum depth of a tree, the root has depth 1
    pub max_depth: usize,
    /// Largest offset (in pixel meters) of a feature
    pub offset_range: i32,
    /// Largest depth difference (in meters) a feature compares to
    pub threshold_range: f32,
    /// Seed for reproducible training. Tree `i` uses `seed + i`.
    pub seed: Option<u64>,
}

impl TrainParams {
    /// Creates new parameters with the default feature ranges.
    /// Returns None if one of the values is zero.
    pub fn new(thread_count: usize,
               pixels_per_image: usize,
               node_train_limit: usize,
               max_depth: usize)
               -> Option<TrainParams> {
        let params = TrainParams {
            thread_count: thread_count,
            pixels_per_image: pixels_per_image,
            node_train_limit: node_train_limit,
            max_depth: max_depth,
            offset_range: 30,
            threshold_range: 0.2,
            seed: None,
        };
        if params.is_valid() { Some(params) } else { None }
    }

    pub fn offset_range(mut self, range: i32) -> Self {
        self.offset_range = range;
        self
    }

    pub fn threshold_range(mut self, range: f32) -> Self {
        self.threshold_range = range;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn thread_count(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.thread_count > 0 && self.pixels_per_image > 0 && self.node_train_limit > 0 &&
        self.max_depth > 0 && self.offset_range >= 0 &&
        self.threshold_range > 0.0 && self.threshold_range.is_finite()
    }

    pub fn tree_params(&self) -> TreeParams {
        TreeParams {
            node_train_limit: self.node_train_limit,
            max_depth: self.max_depth,
            offset_range: self.offset_range,
            threshold_range: self.threshold_range,
        }
    }
}

/// Everything needed to train a forest: the parameters, the labeled
/// images and the backend doing the work.
pub struct ForestTrainContext<'a, B: TrainBackend + 'a> {
    pub params: TrainParams,
    pub class_images: &'a [ClassImage],
    pub depth_images: &'a [DepthImage],
    pub backend: B,
}

impl<'a> ForestTrainContext<'a, CpuBackend> {
    pub fn new(params: TrainParams,
               class_images: &'a [ClassImage],
               depth_images: &'a [DepthImage])
               -> ForestTrainContext<'a, CpuBackend> {
        ForestTrainContext::with_backend(params, class_images, depth_images, CpuBackend::default())
    }
}

impl<'a, B: TrainBackend + 'a> ForestTrainContext<'a, B> {
    pub fn with_backend(params: TrainParams,
                        class_images: &'a [ClassImage],
                        depth_images: &'a [DepthImage],
                        backend: B)
                        -> ForestTrainContext<'a, B> {
        ForestTrainContext {
            params: params,
            class_images: class_images,
            depth_images: depth_images,
            backend: backend,
        }
    }

    fn validate(&self) -> Result<(), TrainError> {
        if !self.params.is_valid() {
            return Err(TrainError::InvalidInput(format!("Invalid parameters {:?}", self.params)));
        }
        if self.class_images.len() != self.depth_images.len() {
            return Err(TrainError::InvalidInput(format!("{} class images but {} depth images",
                                                        self.class_images.len(),
                                                        self.depth_images.len())));
        }
        if self.depth_images.is_empty() {
            return Err(TrainError::InvalidInput("No training images".to_string()));
        }
        for (i, (c, d)) in self.class_images.iter().zip(self.depth_images).enumerate() {
            if c.dimensions() != d.dimensions() {
                return Err(TrainError::InvalidInput(format!("Image {}: class image is {:?}, \
                                                             depth image {:?}",
                                                            i,
                                                            c.dimensions(),
                                                            d.dimensions())));
            }
            if c.width() > i16::MAX as u32 || c.height() > i16::MAX as u32 {
                return Err(TrainError::InvalidInput(format!("Image {} is too large", i)));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum TrainError {
    InvalidInput(String),
    Backend(BackendError),
}

impl From<BackendError> for TrainError {
    fn from(err: BackendError) -> Self {
        TrainError::Backend(err)
    }
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TrainError::InvalidInput(ref x) => write!(f, "Invalid training input: {}", x),
            TrainError::Backend(ref err) => err.fmt(f),
        }
    }
}

impl Error for TrainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            TrainError::Backend(ref err) => Some(err),
            TrainError::InvalidInput(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForestError {
    NoTrees,
    UntrainedTree(usize),
    ImageTooLarge(u32, u32),
}

impl fmt::Display for ForestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ForestError::NoTrees => write!(f, "The forest has no trees"),
            ForestError::UntrainedTree(i) => write!(f, "Tree {} is not trained", i),
            ForestError::ImageTooLarge(w, h) => write!(f, "Cannot classify a {}x{} image", w, h),
        }
    }
}

impl Error for ForestError {}

/// The strongest candidates of a class, sorted ascending by score.
#[derive(Debug, Clone, PartialEq)]
pub struct BestPoints {
    capacity: usize,
    points: Vec<(f32, Vec2i)>,
}

impl BestPoints {
    pub fn new(capacity: usize) -> BestPoints {
        BestPoints {
            capacity: capacity,
            points: Vec::with_capacity(capacity),
        }
    }

    /// Inserts the point while there is space left. Afterwards the
    /// weakest point is replaced if `score` is strictly greater.
    /// Points with equal scores stay in the order they were offered.
    pub fn offer(&mut self, score: f32, point: Vec2i) {
        if self.points.len() >= self.capacity {
            match self.points.first() {
                Some(&(weakest, _)) if score > weakest => {}
                _ => return,
            }
            self.points.remove(0);
        }
        let pos = self.points
            .iter()
            .position(|&(s, _)| s > score)
            .unwrap_or(self.points.len());
        self.points.insert(pos, (score, point));
    }

    pub fn points(&self) -> &[(f32, Vec2i)] {
        &self.points
    }

    pub fn best(&self) -> Option<&(f32, Vec2i)> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One weight image per class
pub type ClassesWeights = Vec<WeightImage>;
/// Seed points per class
pub type ClassesPoints = Vec<BestPoints>;

/// Result of classifying a depth image
#[derive(Debug, Clone)]
pub struct Classification {
    /// class index per pixel, `BACKGROUND_INDEX` for background
    pub classes: ClassImage,
    /// per class: averaged probability times squared depth
    pub weights: ClassesWeights,
    pub best_points: ClassesPoints,
}

/// Averaged vote of all trees for one pixel
struct Vote {
    probabilities: [f32; NUM_CLASSES],
    class: usize,
}

/// A randomized decision forest
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RandomDecisionForest {
    pub(crate) trees: Vec<DecisionTree>,
}

/// Draws up to `pixels_per_image` foreground pixels from every image.
fn sample_pixels<R: Rng>(rng: &mut R,
                         class_images: &[ClassImage],
                         depth_images: &[DepthImage],
                         pixels_per_image: usize)
                         -> Vec<Pixel> {
    let mut pixels = Vec::with_capacity(class_images.len() * pixels_per_image);
    for (i, (classes, depth)) in class_images.iter().zip(depth_images).enumerate() {
        let (w, h) = classes.dimensions();
        if w == 0 || h == 0 {
            continue;
        }
        let mut sampled = MaskImage::new(w, h);
        let mut taken = 0;
        let mut retries = 0;
        while taken < pixels_per_image {
            let x = rng.gen_range(0..w);
            let y = rng.gen_range(0..h);
            if sampled.is_in_mask(x, y) {
                retries += 1;
                if retries >= MAX_SAMPLE_RETRIES {
                    debug!("Image {}: only {} foreground pixels sampled", i, taken);
                    break;
                }
                continue;
            }
            retries = 0;
            sampled.set_in_mask(x, y, true);
            let class = classes[(x, y)].0[0];
            if class == BACKGROUND_INDEX {
                continue;
            }
            let d = depth[(x, y)].0[0];
            if !is_foreground_depth(d) {
                debug!("Image {}: labeled pixel ({}, {}) without depth skipped", i, x, y);
                continue;
            }
            pixels.push(Pixel::new(x as i16, y as i16, d, i as u32, class));
            taken += 1;
        }
    }
    pixels
}

impl RandomDecisionForest {
    /// Creates a forest of `tree_count` untrained trees
    pub fn new(tree_count: usize) -> RandomDecisionForest {
        RandomDecisionForest { trees: (0..tree_count).map(|_| DecisionTree::new()).collect() }
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Trains every tree. At most `thread_count` trees are trained at the
    /// same time; the next batch starts once the current one is done.
    /// A tree whose training fails keeps its previous nodes.
    pub fn train<B: TrainBackend>(&mut self,
                                  context: &ForestTrainContext<B>)
                                  -> Result<Vec<TrainReport>, TrainError> {
        context.validate()?;
        if self.trees.is_empty() {
            return Err(TrainError::InvalidInput("The forest has no trees".to_string()));
        }
        let params = context.params;
        let tree_params = params.tree_params();
        let pool = ThreadPoolBuilder::new()
            .num_threads(params.thread_count)
            .build()
            .map_err(|e| TrainError::InvalidInput(format!("Cannot create thread pool: {}", e)))?;

        let tree_count = self.trees.len();
        let mut reports = Vec::with_capacity(tree_count);
        for (batch_nr, batch) in self.trees.chunks_mut(params.thread_count).enumerate() {
            let first = batch_nr * params.thread_count;
            info!("Training trees {} to {} of {}",
                  first + 1,
                  first + batch.len(),
                  tree_count);
            let results: Vec<Result<TrainReport, BackendError>> = pool.install(|| {
                batch.par_iter_mut()
                    .enumerate()
                    .map(|(i, tree)| {
                        let idx = first + i;
                        let mut rng = match params.seed {
                            Some(s) => StdRng::seed_from_u64(s.wrapping_add(idx as u64)),
                            None => StdRng::from_entropy(),
                        };
                        let pixels = sample_pixels(&mut rng,
                                                   context.class_images,
                                                   context.depth_images,
                                                   params.pixels_per_image);
                        tree.train(idx,
                                   pixels,
                                   context.depth_images,
                                   &tree_params,
                                   &mut rng,
                                   &context.backend)
                    })
                    .collect()
            });
            for res in results {
                reports.push(res?);
            }
        }
        Ok(reports)
    }

    fn check_trained(&self) -> Result<(), ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::NoTrees);
        }
        match self.trees.iter().position(|t| !t.is_trained()) {
            Some(i) => Err(ForestError::UntrainedTree(i)),
            None => Ok(()),
        }
    }

    /// Averaged vote of the trees at (x, y). None for background pixels.
    fn vote(&self, depth_image: &DepthImage, x: u32, y: u32) -> Result<Option<Vote>, ForestError> {
        let depth = depth_image[(x, y)].0[0];
        if !is_foreground_depth(depth) {
            return Ok(None);
        }
        let pixel = Pixel::unlabeled(x as i16, y as i16, depth);
        let mut probabilities = [0.0; NUM_CLASSES];
        for (i, tree) in self.trees.iter().enumerate() {
            let p = match tree.classify(depth_image, &pixel) {
                Some(p) => p,
                None => return Err(ForestError::UntrainedTree(i)),
            };
            for (sum, v) in probabilities.iter_mut().zip(p) {
                *sum += *v;
            }
        }
        let count = self.trees.len() as f32;
        let mut class = 0;
        let mut max = ::std::f32::NEG_INFINITY;
        for (c, p) in probabilities.iter_mut().enumerate() {
            *p /= count;
            if *p > max {
                max = *p;
                class = c;
            }
        }
        Ok(Some(Vote {
            probabilities: probabilities,
            class: class,
        }))
    }

    fn vote_row(&self, depth_image: &DepthImage, y: u32) -> Result<Vec<Option<Vote>>, ForestError> {
        (0..depth_image.width()).map(|x| self.vote(depth_image, x, y)).collect()
    }

    /// Writes the votes of all rows into a classification, in raster order.
    fn merge_rows(depth_image: &DepthImage, rows: Vec<Vec<Option<Vote>>>) -> Classification {
        let (w, h) = depth_image.dimensions();
        let mut result = Classification {
            classes: ClassImage::from_pixel(w, h, Luma([BACKGROUND_INDEX])),
            weights: (0..NUM_CLASSES).map(|_| WeightImage::new(w, h)).collect(),
            best_points: (0..NUM_CLASSES).map(|_| BestPoints::new(BEST_POINTS_CAPACITY)).collect(),
        };
        for (y, row) in rows.into_iter().enumerate() {
            for (x, vote) in row.into_iter().enumerate() {
                let vote = match vote {
                    Some(v) => v,
                    None => continue,
                };
                let (x, y) = (x as u32, y as u32);
                let depth = depth_image[(x, y)].0[0];
                let depth2 = depth * depth;
                result.classes[(x, y)] = Luma([vote.class as i8]);
                for (c, p) in vote.probabilities.iter().enumerate() {
                    result.weights[c][(x, y)] = Luma([p * depth2]);
                }
                result.best_points[vote.class]
                    .offer(vote.probabilities[vote.class], Vec2i::new([x as i32, y as i32]));
            }
        }
        result
    }

    fn check_image(&self, depth_image: &DepthImage) -> Result<(), ForestError> {
        self.check_trained()?;
        let (w, h) = depth_image.dimensions();
        if w > i16::MAX as u32 || h > i16::MAX as u32 {
            return Err(ForestError::ImageTooLarge(w, h));
        }
        Ok(())
    }

    /// Classifies every pixel of the depth image (in meters).
    pub fn classify_image(&self, depth_image: &DepthImage) -> Result<Classification, ForestError> {
        self.check_image(depth_image)?;
        let rows = (0..depth_image.height())
            .map(|y| self.vote_row(depth_image, y))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RandomDecisionForest::merge_rows(depth_image, rows))
    }

    /// Same as `classify_image`, the rows are classified in parallel.
    pub fn classify_image_parallel(&self,
                                   depth_image: &DepthImage)
                                   -> Result<Classification, ForestError> {
        self.check_image(depth_image)?;
        let rows = (0..depth_image.height())
            .into_par_iter()
            .map(|y| self.vote_row(depth_image, y))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RandomDecisionForest::merge_rows(depth_image, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use classes::HandClass;
    use rdf::backend::{FeatureEvaluator, ProbabilityAggregator};
    use rdf::feature::{Decision, Direction};

    /// A flat board with the left half labeled wrist and the right half
    /// labeled center, background far behind.
    pub fn two_class_set(count: usize) -> (Vec<ClassImage>, Vec<DepthImage>) {
        let mut classes = vec![];
        let mut depths = vec![];
        for i in 0..count {
            let d = 0.8 + 0.1 * i as f32;
            depths.push(DepthImage::from_fn(48, 32, |x, y| if x >= 8 && x < 40 && y >= 8 &&
                                                              y < 24 {
                Luma([d])
            } else {
                Luma([BACKGROUND_DEPTH + 2.0])
            }));
            classes.push(ClassImage::from_fn(48, 32, |x, y| if x >= 8 && x < 40 && y >= 8 &&
                                                                y < 24 {
                if x < 24 {
                    Luma([HandClass::Wrist.index() as i8])
                } else {
                    Luma([HandClass::Center.index() as i8])
                }
            } else {
                Luma([BACKGROUND_INDEX])
            }));
        }
        (classes, depths)
    }

    fn params() -> TrainParams {
        TrainParams::new(2, 100, 100, 8).unwrap().offset_range(20).seed(Some(42))
    }

    fn trained_forest(trees: usize) -> RandomDecisionForest {
        let (classes, depths) = two_class_set(3);
        let mut forest = RandomDecisionForest::new(trees);
        let context = ForestTrainContext::new(params(), &classes, &depths);
        forest.train(&context).unwrap();
        forest
    }

    #[test]
    fn test_params() {
        assert!(TrainParams::new(0, 1, 1, 1).is_none());
        assert!(TrainParams::new(1, 1, 1, 0).is_none());
        let p = TrainParams::new(1, 1, 1, 1).unwrap();
        assert_eq!(p.offset_range, 30);
        assert_eq!(p.threshold_range, 0.2);
        assert!(!p.threshold_range(0.0).is_valid());
        assert!(!p.offset_range(-1).is_valid());
    }

    #[test]
    fn test_best_points() {
        let mut best = BestPoints::new(3);
        best.offer(0.5, Vec2i::new([0, 0]));
        best.offer(0.2, Vec2i::new([1, 0]));
        best.offer(0.5, Vec2i::new([2, 0]));
        assert_eq!(best.len(), 3);
        // full: equal to the weakest is not enough
        best.offer(0.2, Vec2i::new([3, 0]));
        assert_eq!(best.points()[0].1, Vec2i::new([1, 0]));
        best.offer(0.9, Vec2i::new([4, 0]));
        let xs: Vec<_> = best.points().iter().map(|p| p.1.x()).collect();
        assert_eq!(xs, vec![0, 2, 4]);
        assert_eq!(best.best().map(|p| p.0), Some(0.9));
        let mut empty = BestPoints::new(0);
        empty.offer(1.0, Vec2i::new([0, 0]));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_sampling() {
        let (classes, depths) = two_class_set(2);
        let mut rng = StdRng::seed_from_u64(1);
        let pixels = sample_pixels(&mut rng, &classes, &depths, 50);
        assert_eq!(pixels.len(), 100);
        assert!(pixels.iter().all(|p| !p.is_background()));
        assert_eq!(pixels.iter().filter(|p| p.image_id == 1).count(), 50);
        let mut coords: Vec<_> = pixels.iter().map(|p| (p.image_id, p.coords)).collect();
        coords.sort();
        coords.dedup();
        assert_eq!(coords.len(), 100);
        // more than the image has: sampling stops once nearly everything is drawn
        let pixels = sample_pixels(&mut rng, &classes[..1], &depths[..1], 10000);
        assert!(pixels.len() <= 32 * 16);
        assert!(pixels.len() > 450);
    }

    #[test]
    fn test_invalid_input() {
        let (classes, depths) = two_class_set(2);
        let mut forest = RandomDecisionForest::new(2);
        let context = ForestTrainContext::new(params(), &classes[..1], &depths);
        match forest.train(&context) {
            Err(TrainError::InvalidInput(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
        let context = ForestTrainContext::new(params().thread_count(0), &classes, &depths);
        match forest.train(&context) {
            Err(TrainError::InvalidInput(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
        let small = vec![ClassImage::new(4, 4), ClassImage::new(4, 4)];
        let context = ForestTrainContext::new(params(), &small, &depths);
        assert!(forest.train(&context).is_err());
    }

    #[test]
    fn test_train_reports() {
        let (classes, depths) = two_class_set(3);
        let mut forest = RandomDecisionForest::new(5);
        let context = ForestTrainContext::new(params(), &classes, &depths);
        let reports = forest.train(&context).unwrap();
        assert_eq!(reports.len(), 5);
        for (i, r) in reports.iter().enumerate() {
            assert_eq!(r.tree, i);
            assert_eq!(r.pixel_count, 300);
        }
        assert!(forest.trees().iter().all(|t| t.is_trained()));
    }

    /// Fails at the root of the `fail_at`th tree. Only roots see all
    /// `root_size` sampled pixels.
    struct FailingRoot {
        cpu: CpuBackend,
        root_size: usize,
        fail_at: usize,
        roots: AtomicUsize,
    }

    impl FeatureEvaluator for FailingRoot {
        fn evaluate(&self,
                    decision: &Decision,
                    pixels: &[Pixel],
                    depth_images: &[DepthImage],
                    directions: &mut Vec<Direction>)
                    -> Result<(), BackendError> {
            self.cpu.evaluate(decision, pixels, depth_images, directions)
        }
    }

    impl ProbabilityAggregator for FailingRoot {
        fn histogram(&self, pixels: &[Pixel]) -> Result<Vec<u32>, BackendError> {
            if pixels.len() == self.root_size &&
               self.roots.fetch_add(1, Ordering::SeqCst) == self.fail_at {
                return Err(BackendError::new("device lost"));
            }
            self.cpu.histogram(pixels)
        }

        fn split_histograms(&self,
                            pixels: &[Pixel],
                            directions: &[Direction])
                            -> Result<(Vec<u32>, Vec<u32>), BackendError> {
            self.cpu.split_histograms(pixels, directions)
        }
    }

    #[test]
    fn test_backend_failure_names_tree() {
        let (classes, depths) = two_class_set(3);
        let mut forest = trained_forest(4);
        let before = forest.clone();
        let backend = FailingRoot {
            cpu: CpuBackend::default(),
            root_size: 300,
            fail_at: 2,
            roots: AtomicUsize::new(0),
        };
        // one tree per batch, so the trees reach their roots in order
        let params = params().thread_count(1).seed(Some(1234));
        let context = ForestTrainContext::with_backend(params, &classes, &depths, backend);
        match forest.train(&context) {
            Err(TrainError::Backend(e)) => {
                assert_eq!(e.tree, Some(2));
                assert_eq!(e.node, Some(0));
            }
            other => panic!("unexpected {:?}", other.map(|r| r.len())),
        }
        // earlier batches keep their new trees, the failing and later ones their old
        assert!(forest.trees()[0] != before.trees()[0]);
        assert!(forest.trees()[1] != before.trees()[1]);
        assert_eq!(forest.trees()[2], before.trees()[2]);
        assert_eq!(forest.trees()[3], before.trees()[3]);
    }

    #[test]
    fn test_seeded_training_is_deterministic() {
        let a = trained_forest(3);
        let b = trained_forest(3);
        assert_eq!(a, b);
        // different trees use different seeds
        assert!(a.trees()[0] != a.trees()[1]);
    }

    #[test]
    fn test_classify() {
        let forest = trained_forest(3);
        let (classes, depths) = two_class_set(3);
        let result = forest.classify_image(&depths[1]).unwrap();
        assert_eq!(result.weights.len(), NUM_CLASSES);
        assert_eq!(result.best_points.len(), NUM_CLASSES);
        let mut correct = 0;
        let mut total = 0;
        for (x, y, c) in classes[1].enumerate_pixels() {
            let got = result.classes[(x, y)].0[0];
            if c.0[0] == BACKGROUND_INDEX {
                assert_eq!(got, BACKGROUND_INDEX);
                for w in result.weights.iter() {
                    assert_eq!(w[(x, y)].0[0], 0.0);
                }
            } else {
                total += 1;
                if got == c.0[0] {
                    correct += 1;
                }
                let sum: f32 = result.weights.iter().map(|w| w[(x, y)].0[0]).sum();
                let d = depths[1][(x, y)].0[0];
                assert!((sum - d * d).abs() < 1e-4);
            }
        }
        assert!(correct * 10 > total * 7);
        for c in 0..NUM_CLASSES {
            assert!(result.best_points[c].len() <= BEST_POINTS_CAPACITY);
            for &(_, p) in result.best_points[c].points() {
                assert_eq!(result.classes[(p.x() as u32, p.y() as u32)].0[0], c as i8);
            }
        }
    }

    #[test]
    fn test_parallel_classification_equal() {
        let forest = trained_forest(2);
        let (_, depths) = two_class_set(2);
        let a = forest.classify_image(&depths[0]).unwrap();
        let b = forest.classify_image_parallel(&depths[0]).unwrap();
        assert_eq!(a.classes, b.classes);
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.best_points, b.best_points);
    }

    #[test]
    fn test_classify_errors() {
        let img = DepthImage::new(4, 4);
        assert_eq!(RandomDecisionForest::new(0).classify_image(&img).unwrap_err(),
                   ForestError::NoTrees);
        assert_eq!(RandomDecisionForest::new(2).classify_image(&img).unwrap_err(),
                   ForestError::UntrainedTree(0));
    }
}
