//! The depth-invariant pixel feature the forest splits on.

use rand::Rng;

use types::{BACKGROUND_DEPTH, DepthImage, Pixel};
use vecmat::Vec2i;

#[cfg(feature="reduce_bound_checks")]
use image::GenericImageView;

/// A split test. Two offsets are scaled by the inverse depth of the pixel
/// and the depth difference at both offsets is compared to `t`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub u: Vec2i,
    pub v: Vec2i,
    pub t: f32,
}

impl Decision {
    pub fn new(u: [i32; 2], v: [i32; 2], t: f32) -> Decision {
        Decision {
            u: Vec2i::new(u),
            v: Vec2i::new(v),
            t: t,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Depth at `pixel + offset / depth`.
/// None if that position is outside of the image or hits the background.
#[inline]
fn offset_depth(depth_image: &DepthImage, pixel: &Pixel, offset: Vec2i) -> Option<f32> {
    // the scaled offset saturates for tiny depths
    let x = pixel.x().saturating_add((offset.x() as f32 / pixel.depth).round() as i32);
    let y = pixel.y().saturating_add((offset.y() as f32 / pixel.depth).round() as i32);
    if x < 0 || y < 0 || x as u32 >= depth_image.width() || y as u32 >= depth_image.height() {
        return None;
    }
    #[cfg(feature="reduce_bound_checks")]
    let depth = unsafe { depth_image.unsafe_get_pixel(x as u32, y as u32).0[0] };
    #[cfg(not(feature="reduce_bound_checks"))]
    let depth = depth_image.get_pixel(x as u32, y as u32).0[0];
    if depth >= BACKGROUND_DEPTH {
        None
    } else {
        Some(depth)
    }
}

/// Evaluates the split test `decision` for `pixel` on `depth_image`.
/// Offsets outside of the image or on background send the pixel right.
#[inline]
pub fn evaluate_feature(decision: &Decision, depth_image: &DepthImage, pixel: &Pixel) -> Direction {
    match (offset_depth(depth_image, pixel, decision.u),
           offset_depth(depth_image, pixel, decision.v)) {
        (Some(du), Some(dv)) if du - dv < decision.t => Direction::Left,
        _ => Direction::Right,
    }
}

/// Endless iterator of random split tests.
/// Offsets are drawn from `[-offset_range, offset_range]`,
/// thresholds from `[-threshold_range, threshold_range)`.
pub struct RandomDecisionIterator<R> {
    offset_range: i32,
    threshold_range: f32,
    rng: R,
}

impl<R> RandomDecisionIterator<R>
    where R: Rng
{
    /// Returns None if a range is negative or the threshold range is empty.
    pub fn new(offset_range: i32, threshold_range: f32, rng: R) -> Option<RandomDecisionIterator<R>> {
        if offset_range < 0 || !(threshold_range > 0.0) || !threshold_range.is_finite() {
            return None;
        }
        Some(RandomDecisionIterator {
            offset_range: offset_range,
            threshold_range: threshold_range,
            rng: rng,
        })
    }
}

impl<R> Iterator for RandomDecisionIterator<R>
    where R: Rng
{
    type Item = Decision;
    fn next(&mut self) -> Option<Decision> {
        let rng = &mut self.rng;
        let r = self.offset_range;
        let mut offsets = [0i32; 4];
        for o in offsets.iter_mut() {
            *o = rng.gen_range(-r..=r);
        }
        let t = rng.gen_range(-self.threshold_range..self.threshold_range);
        Some(Decision::new([offsets[0], offsets[1]], [offsets[2], offsets[3]], t))
    }
}
