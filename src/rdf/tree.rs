use std::mem;
use std::ops::Range;
use std::time::{Duration, Instant};

use rand::Rng;

use classes::NUM_CLASSES;
use types::{DepthImage, Pixel};
use super::backend::{BackendError, TrainBackend};
use super::feature::{Decision, Direction, RandomDecisionIterator, evaluate_feature};
use super::node::{self, Node, NodeId, NodeKind, Probabilities};

/// Parameters to grow a single tree
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    /// Number of random decisions tried per node
    pub node_train_limit: usize,
    /// The root has depth 1
    pub max_depth: usize,
    pub offset_range: i32,
    pub threshold_range: f32,
}

/// What happened while growing one tree.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub tree: usize,
    pub pixel_count: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    /// Depth of the deepest leaf
    pub depth: usize,
    /// How often a parent was turned back into a leaf. Splits without
    /// information gain count as failed too, so this fires more often
    /// than a rule rejecting only splits with an empty side.
    pub backtracks: usize,
    pub elapsed: Duration,
}

/// A single decision tree. The nodes are stored in an arena, root first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

/// Class entropy (in bits) of a histogram
fn entropy(hist: &[u32]) -> f32 {
    let total: u32 = hist.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f32;
    -hist.iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f32 / total;
            p * p.log2()
        })
        .sum::<f32>()
}

fn normalize(hist: &[u32]) -> Probabilities {
    let mut res = [0.0; NUM_CLASSES];
    let total: u32 = hist.iter().sum();
    if total > 0 {
        for (r, &c) in res.iter_mut().zip(hist) {
            *r = c as f32 / total as f32;
        }
    }
    res
}

fn is_pure(hist: &[u32]) -> bool {
    hist.iter().filter(|&&c| c > 0).count() <= 1
}

/// Information gain of splitting `parent` into `left` and `right`
fn information_gain(parent: &[u32], left: &[u32], right: &[u32]) -> f32 {
    let n: u32 = parent.iter().sum();
    let nl: u32 = left.iter().sum();
    let nr: u32 = right.iter().sum();
    entropy(parent) - (nl as f32 / n as f32) * entropy(left) -
    (nr as f32 / n as f32) * entropy(right)
}

/// Moves every pixel going left in front of those going right.
/// The order within each side is kept.
fn partition(pixels: &mut [Pixel], directions: &[Direction]) -> usize {
    let mut right = Vec::new();
    let mut write = 0;
    for i in 0..pixels.len() {
        match directions[i] {
            Direction::Left => {
                pixels[write] = pixels[i];
                write += 1;
            }
            Direction::Right => right.push(pixels[i]),
        }
    }
    pixels[write..].copy_from_slice(&right);
    write
}

struct Candidate {
    decision: Decision,
    gain: f32,
    left: Vec<u32>,
    right: Vec<u32>,
    directions: Vec<Direction>,
}

/// Training state of a node which is not part of the node itself.
struct Growth {
    /// Pixels of a node which still has to be trained
    pending: Option<Range<usize>>,
    histogram: Vec<u32>,
    depth: usize,
}

/// Grows a tree on the pixel buffer it owns.
struct Grower<'a, B: TrainBackend + ?Sized + 'a> {
    tree_index: usize,
    pixels: Vec<Pixel>,
    depth_images: &'a [DepthImage],
    params: &'a TreeParams,
    backend: &'a B,
    nodes: Vec<Node>,
    growth: Vec<Growth>,
    backtracks: usize,
}

impl<'a, B: TrainBackend + ?Sized + 'a> Grower<'a, B> {
    fn push_node(&mut self, parent: Option<NodeId>, range: Range<usize>, histogram: Vec<u32>, depth: usize) -> NodeId {
        self.nodes.push(Node::leaf(parent, normalize(&histogram)));
        self.growth.push(Growth {
            pending: Some(range),
            histogram: histogram,
            depth: depth,
        });
        self.nodes.len() - 1
    }

    fn find_best_split<R: Rng>(&self,
                               node: NodeId,
                               range: Range<usize>,
                               rng: &mut R)
                               -> Result<Option<Candidate>, BackendError> {
        let subset = &self.pixels[range];
        let parent_hist = &self.growth[node].histogram;
        let mut directions = Vec::with_capacity(subset.len());
        let mut best: Option<Candidate> = None;
        let decisions = match RandomDecisionIterator::new(self.params.offset_range,
                                                          self.params.threshold_range,
                                                          rng) {
            Some(x) => x,
            None => return Ok(None),
        };
        for decision in decisions.take(self.params.node_train_limit) {
            self.backend
                .evaluate(&decision, subset, self.depth_images, &mut directions)
                .map_err(|e| e.at(self.tree_index, node))?;
            let (left, right) = self.backend
                .split_histograms(subset, &directions)
                .map_err(|e| e.at(self.tree_index, node))?;
            if left.iter().all(|&c| c == 0) || right.iter().all(|&c| c == 0) {
                continue;
            }
            let gain = information_gain(parent_hist, &left, &right);
            if gain <= 0.0 || best.as_ref().map(|b| gain <= b.gain).unwrap_or(false) {
                continue;
            }
            let candidate = match best.take() {
                Some(mut c) => {
                    mem::swap(&mut c.directions, &mut directions);
                    c.decision = decision;
                    c.gain = gain;
                    c.left = left;
                    c.right = right;
                    c
                }
                None => {
                    Candidate {
                        decision: decision,
                        gain: gain,
                        left: left,
                        right: right,
                        directions: mem::replace(&mut directions, Vec::with_capacity(subset.len())),
                    }
                }
            };
            trace!("Tree {} node {}: gain {} with {:?}", self.tree_index, node, gain, decision);
            best = Some(candidate);
        }
        Ok(best)
    }

    /// Trains the pending node `cursor`. Returns the node to continue with.
    fn train_node<R: Rng>(&mut self, cursor: NodeId, rng: &mut R) -> Result<NodeId, BackendError> {
        let range = match self.growth[cursor].pending.take() {
            Some(r) => r,
            None => return Ok(cursor),
        };
        let depth = self.growth[cursor].depth;
        if depth >= self.params.max_depth || is_pure(&self.growth[cursor].histogram) {
            return Ok(cursor);
        }
        match self.find_best_split(cursor, range.clone(), rng)? {
            None => {
                match self.nodes[cursor].parent {
                    Some(parent) => {
                        self.backtracks += 1;
                        debug!("Tree {}: no split for node {}, node {} becomes a leaf",
                               self.tree_index,
                               cursor,
                               parent);
                        let probabilities = normalize(&self.growth[parent].histogram);
                        self.nodes[parent].kind = NodeKind::Leaf { probabilities: probabilities };
                        Ok(parent)
                    }
                    None => Ok(cursor),
                }
            }
            Some(best) => {
                let mid = range.start +
                          partition(&mut self.pixels[range.clone()], &best.directions);
                debug!("Tree {}: split node {} at depth {} into {}/{} pixels (gain {})",
                       self.tree_index,
                       cursor,
                       depth,
                       mid - range.start,
                       range.end - mid,
                       best.gain);
                let left = self.push_node(Some(cursor), range.start..mid, best.left, depth + 1);
                let right = self.push_node(Some(cursor), mid..range.end, best.right, depth + 1);
                self.nodes[cursor].kind = NodeKind::Split {
                    decision: best.decision,
                    left: left,
                    right: right,
                };
                Ok(left)
            }
        }
    }

    /// Walks the tree depth first, training every pending node.
    fn grow<R: Rng>(&mut self, rng: &mut R) -> Result<(), BackendError> {
        let mut cursor = 0;
        loop {
            if self.growth[cursor].pending.is_some() {
                cursor = self.train_node(cursor, rng)?;
                continue;
            }
            let next_right = match self.nodes[cursor].kind {
                NodeKind::Split { right, .. } if self.growth[right].pending.is_some() => Some(right),
                _ => None,
            };
            cursor = match (next_right, self.nodes[cursor].parent) {
                (Some(right), _) => right,
                (None, Some(parent)) => parent,
                (None, None) => return Ok(()),
            };
        }
    }
}

fn max_leaf_depth(nodes: &[Node]) -> usize {
    let mut depths = vec![0; nodes.len()];
    let mut max = 0;
    for (i, n) in nodes.iter().enumerate() {
        // parents come before their children
        depths[i] = n.parent.map(|p| depths[p] + 1).unwrap_or(1);
        if n.is_leaf() {
            max = max.max(depths[i]);
        }
    }
    max
}

impl DecisionTree {
    /// Creates an untrained tree
    pub fn new() -> DecisionTree {
        DecisionTree { nodes: vec![] }
    }

    pub(crate) fn from_nodes(nodes: Vec<Node>) -> DecisionTree {
        DecisionTree { nodes: nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_trained(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Trains this tree on the given pixels. Every pixel refers to its
    /// depth image by `image_id`. The tree is only changed if the training
    /// succeeds.
    ///
    /// # Arguments
    /// * `tree_index` - number of this tree within the forest, used for logs and errors
    /// * `pixels` - labeled pixels. Background pixels are dropped.
    /// * `depth_images` - the images the pixels were taken from
    /// * `params` - growth parameters
    /// * `rng` - draws the random decisions
    /// * `backend` - evaluates features and counts classes
    pub fn train<R, B>(&mut self,
                       tree_index: usize,
                       pixels: Vec<Pixel>,
                       depth_images: &[DepthImage],
                       params: &TreeParams,
                       rng: &mut R,
                       backend: &B)
                       -> Result<TrainReport, BackendError>
        where R: Rng,
              B: TrainBackend + ?Sized
    {
        let start = Instant::now();
        let before = pixels.len();
        let pixels: Vec<Pixel> = pixels.into_iter().filter(|p| !p.is_background()).collect();
        if pixels.len() != before {
            warn!("Tree {}: dropped {} background pixels",
                  tree_index,
                  before - pixels.len());
        }
        let pixel_count = pixels.len();
        let root_hist = backend.histogram(&pixels).map_err(|e| e.at(tree_index, 0))?;

        let mut grower = Grower {
            tree_index: tree_index,
            pixels: pixels,
            depth_images: depth_images,
            params: params,
            backend: backend,
            nodes: vec![],
            growth: vec![],
            backtracks: 0,
        };
        grower.push_node(None, 0..pixel_count, root_hist, 1);
        grower.grow(rng)?;

        self.nodes = node::compact(&grower.nodes, 0);
        let report = TrainReport {
            tree: tree_index,
            pixel_count: pixel_count,
            node_count: self.nodes.len(),
            leaf_count: self.leaf_count(),
            depth: max_leaf_depth(&self.nodes),
            backtracks: grower.backtracks,
            elapsed: start.elapsed(),
        };
        info!("Trained tree {}: {} nodes, {} leafs, depth {} from {} pixels in {:?}",
              tree_index,
              report.node_count,
              report.leaf_count,
              report.depth,
              pixel_count,
              report.elapsed);
        Ok(report)
    }

    /// Returns the class probabilities of the leaf `pixel` ends in,
    /// None if the tree is untrained.
    pub fn classify(&self, depth_image: &DepthImage, pixel: &Pixel) -> Option<&[f32]> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut idx = 0;
        loop {
            match self.nodes[idx].kind {
                NodeKind::Leaf { ref probabilities } => return Some(&probabilities[..]),
                NodeKind::Split { ref decision, left, right } => {
                    idx = match evaluate_feature(decision, depth_image, pixel) {
                        Direction::Left => left,
                        Direction::Right => right,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rdf::backend::{CpuBackend, FeatureEvaluator, ProbabilityAggregator};

    /// Two hands side by side: class 0 on the left, class 1 in the middle and
    /// class 2 on the right of a flat board, everything else far away.
    fn setup() -> (Vec<Pixel>, Vec<DepthImage>) {
        let img = DepthImage::from_fn(40, 20, |x, y| {
            if x >= 5 && x < 35 && y >= 5 && y < 15 {
                Luma([1.0 + 0.01 * y as f32])
            } else {
                Luma([10.0])
            }
        });
        let mut pixels = vec![];
        for y in 5..15 {
            for x in 5..35 {
                let class = (x - 5) / 10;
                pixels.push(Pixel::new(x, y, img[(x as u32, y as u32)].0[0], 0, class as i8));
            }
        }
        (pixels, vec![img])
    }

    fn params() -> TreeParams {
        TreeParams {
            node_train_limit: 200,
            max_depth: 10,
            offset_range: 15,
            threshold_range: 0.2,
        }
    }

    fn train(seed: u64) -> (DecisionTree, TrainReport) {
        let (pixels, images) = setup();
        let mut tree = DecisionTree::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let report = tree.train(0, pixels, &images, &params(), &mut rng, &CpuBackend::default())
            .unwrap();
        (tree, report)
    }

    /// Routes every pixel through the tree and collects the pixels per node.
    fn route(tree: &DecisionTree, pixels: &[Pixel], img: &DepthImage) -> Vec<Vec<Pixel>> {
        let mut per_node = vec![vec![]; tree.nodes().len()];
        for p in pixels {
            let mut idx = 0;
            loop {
                per_node[idx].push(*p);
                match tree.nodes()[idx].kind {
                    NodeKind::Leaf { .. } => break,
                    NodeKind::Split { ref decision, left, right } => {
                        idx = match evaluate_feature(decision, img, p) {
                            Direction::Left => left,
                            Direction::Right => right,
                        }
                    }
                }
            }
        }
        per_node
    }

    #[test]
    fn test_entropy() {
        assert_eq!(entropy(&[4, 0, 0]), 0.0);
        assert!((entropy(&[2, 2]) - 1.0).abs() < 1e-6);
        assert!((entropy(&[1, 1, 1, 1]) - 2.0).abs() < 1e-6);
        assert!((information_gain(&[2, 2], &[2, 0], &[0, 2]) - 1.0).abs() < 1e-6);
        assert!(information_gain(&[2, 2], &[1, 1], &[1, 1]).abs() < 1e-6);
    }

    #[test]
    fn test_partition_stable() {
        let mut pixels: Vec<_> = (0..6).map(|i| Pixel::new(i, 0, 1.0, 0, 0)).collect();
        let dirs = [Direction::Right, Direction::Left, Direction::Right, Direction::Left,
                    Direction::Left, Direction::Right];
        let mid = partition(&mut pixels, &dirs);
        assert_eq!(mid, 3);
        let xs: Vec<_> = pixels.iter().map(|p| p.x()).collect();
        assert_eq!(xs, vec![1, 3, 4, 0, 2, 5]);
    }

    #[test]
    fn test_leaf_probabilities() {
        let (tree, report) = train(3);
        assert!(report.node_count > 1);
        assert_eq!(report.node_count, tree.nodes().len());
        assert_eq!(report.pixel_count, 300);
        assert!(report.depth <= params().max_depth);
        let (pixels, images) = setup();
        let routed = route(&tree, &pixels, &images[0]);
        for (node, subset) in tree.nodes().iter().zip(routed.iter()) {
            if let NodeKind::Leaf { ref probabilities } = node.kind {
                if !subset.is_empty() {
                    let sum: f32 = probabilities.iter().sum();
                    assert!((sum - 1.0).abs() < 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_split_gain_positive() {
        let (tree, _) = train(4);
        let (pixels, images) = setup();
        let routed = route(&tree, &pixels, &images[0]);
        let backend = CpuBackend::default();
        for (i, node) in tree.nodes().iter().enumerate() {
            if let Some((left, right)) = node.children() {
                let parent = backend.histogram(&routed[i]).unwrap();
                let l = backend.histogram(&routed[left]).unwrap();
                let r = backend.histogram(&routed[right]).unwrap();
                assert!(!routed[left].is_empty() && !routed[right].is_empty());
                assert!(information_gain(&parent, &l, &r) > 0.0);
            }
        }
    }

    #[test]
    fn test_classify_training_pixels() {
        let (tree, _) = train(5);
        let (pixels, images) = setup();
        let correct = pixels.iter()
            .filter(|p| {
                let probs = tree.classify(&images[0], p).unwrap();
                let best = (0..NUM_CLASSES)
                    .fold(0, |b, c| if probs[c] > probs[b] { c } else { b });
                best == p.class_index as usize
            })
            .count();
        // only a bad forest gets worse than guessing
        assert!(correct > pixels.len() / 2);
    }

    #[test]
    fn test_deterministic() {
        let (a, _) = train(11);
        let (b, _) = train(11);
        assert_eq!(a, b);
    }

    #[test]
    fn test_untrained() {
        let tree = DecisionTree::new();
        let img = DepthImage::new(2, 2);
        assert!(!tree.is_trained());
        assert!(tree.classify(&img, &Pixel::unlabeled(0, 0, 1.0)).is_none());
    }

    #[test]
    fn test_single_class_is_leaf() {
        let (pixels, images) = setup();
        let pixels: Vec<_> = pixels.into_iter().filter(|p| p.class_index == 1).collect();
        let mut tree = DecisionTree::new();
        let mut rng = StdRng::seed_from_u64(0);
        let report = tree.train(0, pixels, &images, &params(), &mut rng, &CpuBackend::default())
            .unwrap();
        assert_eq!(report.node_count, 1);
        let p = tree.classify(&images[0], &Pixel::unlabeled(20, 10, 1.0)).unwrap();
        assert_eq!(p[1], 1.0);
    }

    #[test]
    fn test_zero_depth_pixel_trains() {
        let (mut pixels, images) = setup();
        pixels.push(Pixel::new(3, 3, 0.0, 0, 0));
        let count = pixels.len();
        let mut tree = DecisionTree::new();
        let mut rng = StdRng::seed_from_u64(2);
        let report = tree.train(0, pixels, &images, &params(), &mut rng, &CpuBackend::default())
            .unwrap();
        assert_eq!(report.pixel_count, count);
        assert!(tree.classify(&images[0], &Pixel::unlabeled(3, 3, 0.0)).is_some());
    }

    #[test]
    fn test_background_dropped() {
        let (mut pixels, images) = setup();
        pixels.push(Pixel::new(0, 0, 10.0, 0, -1));
        let mut tree = DecisionTree::new();
        let mut rng = StdRng::seed_from_u64(0);
        let report = tree.train(0, pixels, &images, &params(), &mut rng, &CpuBackend::default())
            .unwrap();
        assert_eq!(report.pixel_count, 300);
    }

    /// Sends every pixel left; no decision separates anything.
    struct AllLeft(CpuBackend);

    impl FeatureEvaluator for AllLeft {
        fn evaluate(&self,
                    _: &Decision,
                    pixels: &[Pixel],
                    _: &[DepthImage],
                    directions: &mut Vec<Direction>)
                    -> Result<(), BackendError> {
            directions.clear();
            directions.extend(pixels.iter().map(|_| Direction::Left));
            Ok(())
        }
    }

    impl ProbabilityAggregator for AllLeft {
        fn histogram(&self, pixels: &[Pixel]) -> Result<Vec<u32>, BackendError> {
            self.0.histogram(pixels)
        }
        fn split_histograms(&self,
                            pixels: &[Pixel],
                            directions: &[Direction])
                            -> Result<(Vec<u32>, Vec<u32>), BackendError> {
            self.0.split_histograms(pixels, directions)
        }
    }

    /// Splits class 0 from the others at the root, nothing below.
    struct RootOnly(CpuBackend, usize);

    impl FeatureEvaluator for RootOnly {
        fn evaluate(&self,
                    _: &Decision,
                    pixels: &[Pixel],
                    _: &[DepthImage],
                    directions: &mut Vec<Direction>)
                    -> Result<(), BackendError> {
            directions.clear();
            let root = pixels.len() == self.1;
            directions.extend(pixels.iter().map(|p| if root && p.class_index == 0 {
                Direction::Left
            } else if root {
                Direction::Right
            } else {
                Direction::Left
            }));
            Ok(())
        }
    }

    impl ProbabilityAggregator for RootOnly {
        fn histogram(&self, pixels: &[Pixel]) -> Result<Vec<u32>, BackendError> {
            self.0.histogram(pixels)
        }
        fn split_histograms(&self,
                            pixels: &[Pixel],
                            directions: &[Direction])
                            -> Result<(Vec<u32>, Vec<u32>), BackendError> {
            self.0.split_histograms(pixels, directions)
        }
    }

    /// Fails on every evaluation
    struct Failing(CpuBackend);

    impl FeatureEvaluator for Failing {
        fn evaluate(&self,
                    _: &Decision,
                    _: &[Pixel],
                    _: &[DepthImage],
                    _: &mut Vec<Direction>)
                    -> Result<(), BackendError> {
            Err(BackendError::new("device lost"))
        }
    }

    impl ProbabilityAggregator for Failing {
        fn histogram(&self, pixels: &[Pixel]) -> Result<Vec<u32>, BackendError> {
            self.0.histogram(pixels)
        }
        fn split_histograms(&self,
                            pixels: &[Pixel],
                            directions: &[Direction])
                            -> Result<(Vec<u32>, Vec<u32>), BackendError> {
            self.0.split_histograms(pixels, directions)
        }
    }

    #[test]
    fn test_degenerate_root_stays_leaf() {
        let (pixels, images) = setup();
        let mut tree = DecisionTree::new();
        let mut rng = StdRng::seed_from_u64(0);
        let report = tree.train(0,
                   pixels,
                   &images,
                   &params(),
                   &mut rng,
                   &AllLeft(CpuBackend::default()))
            .unwrap();
        assert_eq!(report.node_count, 1);
        assert_eq!(report.backtracks, 0);
        let p = tree.classify(&images[0], &Pixel::unlabeled(6, 6, 1.0)).unwrap();
        for c in 0..3 {
            assert!((p[c] - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_backtrack_to_parent() {
        let (pixels, images) = setup();
        let backend = RootOnly(CpuBackend::default(), pixels.len());
        let mut tree = DecisionTree::new();
        let mut rng = StdRng::seed_from_u64(0);
        let report = tree.train(0, pixels, &images, &params(), &mut rng, &backend).unwrap();
        // the right child (class 1 and 2) cannot be split, so the root
        // gets a leaf again
        assert_eq!(report.node_count, 1);
        assert_eq!(report.backtracks, 1);
        assert!(tree.nodes()[0].is_leaf());
    }

    #[test]
    fn test_backend_failure() {
        let (pixels, images) = setup();
        let (mut tree, _) = train(1);
        let before = tree.clone();
        let mut rng = StdRng::seed_from_u64(0);
        let err = tree.train(4,
                   pixels,
                   &images,
                   &params(),
                   &mut rng,
                   &Failing(CpuBackend::default()))
            .unwrap_err();
        assert_eq!(err.tree, Some(4));
        assert_eq!(err.node, Some(0));
        assert_eq!(tree, before);
    }
}
