//! Mean shift over the per-class density images produced by the forest,
//! turning the seed points of every class into a joint position.

use classes::HandClass;
use rdf::{ClassesPoints, ClassesWeights};
use skeleton::{HandJoint, HandSkeleton};
use types::*;
use vecmat::{Vec2, Vec2i, Vec3};

/// Mean shift stops after this many steps even if it has not converged
pub const MAX_MEANSHIFT_ITERATIONS: usize = 100;

/// Bandwidth and size of the kernel used for wrist and palm center
pub const BIG_KERNEL: (f32, u32) = (25.0, 51);
/// Bandwidth and size of the kernel used for every finger joint
pub const SMALL_KERNEL: (f32, u32) = (12.0, 25);

/// Divides the image coordinates when no camera is known
const DEPTH_FACTOR: f32 = 10.0;

/// Computes the gaussian kernel for mean shifting.
///
/// # Arguments:
/// * `pos` - offset to the center of the kernel
/// * `bandwidth` - the distance at which the kernel has fallen to 1/e
#[inline]
fn kernel_function(pos: (i32, i32), bandwidth: f32) -> f32 {
    let (x, y) = pos;
    let norm = (x.pow(2) + y.pow(2)) as f32;
    (-norm / (bandwidth * bandwidth)).exp()
}

/// A square gaussian kernel with odd size, so that its center is a pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    bandwidth: f32,
    size: u32,
    data: Vec<f32>,
}

impl GaussianKernel {
    /// Creates the kernel. Returns None if `size` is even or the
    /// bandwidth is not positive.
    pub fn new(bandwidth: f32, size: u32) -> Option<GaussianKernel> {
        if size % 2 == 0 || !(bandwidth > 0.0) {
            return None;
        }
        Some(GaussianKernel::build(bandwidth, size))
    }

    fn build(bandwidth: f32, size: u32) -> GaussianKernel {
        let half = (size / 2) as i32;
        let data = (0..size * size)
            .map(|i| {
                let dx = (i % size) as i32 - half;
                let dy = (i / size) as i32 - half;
                kernel_function((dx, dy), bandwidth)
            })
            .collect();
        GaussianKernel {
            bandwidth: bandwidth,
            size: size,
            data: data,
        }
    }

    pub fn bandwidth(&self) -> f32 {
        self.bandwidth
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn half(&self) -> i32 {
        (self.size / 2) as i32
    }

    /// Value at the offset (dx, dy) from the center. Both offsets
    /// have to lie within `[-half, half]`.
    #[inline]
    pub fn value(&self, dx: i32, dy: i32) -> f32 {
        let half = self.half();
        let idx = (dy + half) as usize * self.size as usize + (dx + half) as usize;
        self.data[idx]
    }
}

/// Sums of the density within the kernel window around a point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Density {
    /// Σ w·k
    pub mass: f64,
    /// Σ w·k·x and Σ w·k·y
    pub moment: [f64; 2],
    /// Σ w, the raw weight inside the window
    pub weight: f64,
}

impl Density {
    /// Weighted centroid, rounded to the nearest pixel.
    /// None if the window has no mass.
    pub fn centroid(&self) -> Option<Vec2i> {
        if self.mass <= 0.0 {
            return None;
        }
        Some(Vec2i::new([(self.moment[0] / self.mass).round() as i32,
                         (self.moment[1] / self.mass).round() as i32]))
    }
}

/// Estimates the density around `center` within the kernel window,
/// clipped to the image.
pub fn density_estimator(weights: &WeightImage, kernel: &GaussianKernel, center: Vec2i) -> Density {
    let half = kernel.half();
    let (w, h) = (weights.width() as i32, weights.height() as i32);
    let x0 = (center.x() - half).max(0);
    let x1 = (center.x() + half).min(w - 1);
    let y0 = (center.y() - half).max(0);
    let y1 = (center.y() + half).min(h - 1);
    let mut res = Density::default();
    for y in y0..y1 + 1 {
        for x in x0..x1 + 1 {
            let weight = weights[(x as u32, y as u32)].0[0];
            if weight == 0.0 {
                continue;
            }
            let wk = (weight * kernel.value(x - center.x(), y - center.y())) as f64;
            res.mass += wk;
            res.moment[0] += wk * x as f64;
            res.moment[1] += wk * y as f64;
            res.weight += weight as f64;
        }
    }
    res
}

pub trait MeanShift {
    /// Moves from `init` to the local maximum of the density.
    /// Returns the mode and the weight within the window around it,
    /// `(init, 0.0)` if there is no density at all.
    ///
    /// # Arguments
    /// * `init` - position to start mean shifting
    /// * `kernel` - kernel to use for mean shifting
    /// * `iterations` - maximum of iterations which should be performed
    fn meanshift(&self, init: Vec2i, kernel: &GaussianKernel, iterations: usize) -> (Vec2i, f32);
}

impl MeanShift for WeightImage {
    fn meanshift(&self, init: Vec2i, kernel: &GaussianKernel, iterations: usize) -> (Vec2i, f32) {
        let mut pos = init;
        let mut density = density_estimator(self, kernel, pos);
        for _ in 0..iterations {
            let next = match density.centroid() {
                Some(c) => c,
                None => return (init, 0.0),
            };
            if next == pos {
                return (pos, density.weight as f32);
            }
            pos = next;
            density = density_estimator(self, kernel, pos);
        }
        warn!("Breaking meanshift - no convergence after {} iterations at {:?}",
              iterations,
              pos);
        if density.mass <= 0.0 {
            return (init, 0.0);
        }
        (pos, density.weight as f32)
    }
}

/// Finds the joints of a hand in the classification of a depth image.
pub struct JointLocalizer {
    big_kernel: GaussianKernel,
    small_kernel: GaussianKernel,
    camera: Option<Box<dyn ImageToWorld + Send + Sync>>,
}

impl JointLocalizer {
    /// Creates a localizer. Without a camera the location of a joint is
    /// `(x / (d * 10), y / (d * 10), d)`.
    pub fn new(camera: Option<Box<dyn ImageToWorld + Send + Sync>>) -> JointLocalizer {
        JointLocalizer {
            big_kernel: GaussianKernel::build(BIG_KERNEL.0, BIG_KERNEL.1),
            small_kernel: GaussianKernel::build(SMALL_KERNEL.0, SMALL_KERNEL.1),
            camera: camera,
        }
    }

    /// Creates a localizer with other kernels for wrist/center and the fingers.
    pub fn with_kernels(big: Option<GaussianKernel>,
                        small: Option<GaussianKernel>,
                        camera: Option<Box<dyn ImageToWorld + Send + Sync>>)
                        -> Option<JointLocalizer> {
        match (big, small) {
            (Some(big), Some(small)) => {
                Some(JointLocalizer {
                    big_kernel: big,
                    small_kernel: small,
                    camera: camera,
                })
            }
            _ => None,
        }
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    fn kernel_for(&self, class: HandClass) -> &GaussianKernel {
        match class {
            HandClass::Wrist | HandClass::Center => &self.big_kernel,
            _ => &self.small_kernel,
        }
    }

    /// Localizes every joint using the density images and seed points
    /// of a classification.
    pub fn approximate_joints(&self,
                              depth: &DepthImage,
                              weights: &ClassesWeights,
                              best_points: &ClassesPoints)
                              -> HandSkeleton {
        self.approximate_joints_at(depth, weights, best_points, Vec2i::new([0, 0]))
    }

    /// Like `approximate_joints` for a patch whose top left corner lies at
    /// `origin` within the camera image.
    pub fn approximate_joints_at(&self,
                                 depth: &DepthImage,
                                 weights: &ClassesWeights,
                                 best_points: &ClassesPoints,
                                 origin: Vec2i)
                                 -> HandSkeleton {
        let mut skeleton = HandSkeleton::new();
        for class in HandClass::ALL.iter().cloned() {
            let (weight_image, seeds) = match (weights.get(class.index()),
                                               best_points.get(class.index())) {
                (Some(w), Some(s)) => (w, s),
                _ => continue,
            };
            let kernel = self.kernel_for(class);
            let mut best: Option<(Vec2i, Vec2i, f32)> = None;
            for &(_, seed) in seeds.points() {
                let (mode, certainty) =
                    weight_image.meanshift(seed, kernel, MAX_MEANSHIFT_ITERATIONS);
                if best.map(|b| certainty > b.2).unwrap_or(true) {
                    best = Some((seed, mode, certainty));
                }
            }
            let (seed, mode, certainty) = match best {
                Some(b) => b,
                None => continue,
            };
            let location = self.locate(depth, seed, mode, origin);
            debug!("{:?} at {:?} with certainty {}", class, mode, certainty);
            skeleton.set_joint(HandJoint {
                location: location,
                certainty: certainty,
                location_image: mode,
                joint_type: Some(class.joint()),
            });
        }
        skeleton
    }

    fn depth_at(depth: &DepthImage, p: Vec2i) -> f32 {
        if p.x() < 0 || p.y() < 0 || p.x() as u32 >= depth.width() ||
           p.y() as u32 >= depth.height() {
            return 0.0;
        }
        depth[(p.x() as u32, p.y() as u32)].0[0]
    }

    /// 3d location of the mode. The depth is taken at the mode
    /// or at the seed if the mode lies on background.
    fn locate(&self, depth: &DepthImage, seed: Vec2i, mode: Vec2i, origin: Vec2i) -> Vec3<f32> {
        let mut d = JointLocalizer::depth_at(depth, mode);
        if !is_foreground_depth(d) {
            d = JointLocalizer::depth_at(depth, seed);
        }
        match self.camera {
            Some(ref camera) => camera.image_to_world((mode + origin).to_f32(), d),
            None => {
                let p: Vec2<f32> = mode.to_f32();
                Vec3::new([p[0] / (d * DEPTH_FACTOR), p[1] / (d * DEPTH_FACTOR), d])
            }
        }
    }
}
