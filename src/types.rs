use image::{ImageBuffer, Luma};

use vecmat::{Mat3, MatrixFunc, Vec2, Vec3};

/// Depth image used by the forest. Every value is the distance in meters.
pub type DepthImage = ImageBuffer<Luma<f32>, Vec<f32>>;
/// Depth image as delivered by a depth camera (millimeters).
pub type MillimeterImage = ImageBuffer<Luma<u16>, Vec<u16>>;
/// Every pixel holds the index of a hand class or `BACKGROUND_INDEX`.
pub type ClassImage = ImageBuffer<Luma<i8>, Vec<i8>>;
/// Density image of a single class.
pub type WeightImage = ImageBuffer<Luma<f32>, Vec<f32>>;
pub type MaskImage = ImageBuffer<Luma<u8>, Vec<u8>>;

/// Class index of everything which is not part of the hand.
pub const BACKGROUND_INDEX: i8 = -1;

/// Depth values greater or equal to this (in meters) are background.
pub const BACKGROUND_DEPTH: f32 = 8.0;

/// Depth values lower than this are treated as missing.
pub const EPSILON: f32 = 0.00001;

/// Returns true if `depth` belongs to a foreground pixel
#[inline]
pub fn is_foreground_depth(depth: f32) -> bool {
    depth >= EPSILON && depth < BACKGROUND_DEPTH
}

pub trait MaskOps {
    fn set_in_mask(&mut self, x: u32, y: u32, val: bool);
    fn is_in_mask(&self, x: u32, y: u32) -> bool;
}

impl MaskOps for MaskImage {
    fn set_in_mask(&mut self, x: u32, y: u32, val: bool) {
        self[(x, y)] = if val { Luma([1u8]) } else { Luma([0u8]) }
    }
    fn is_in_mask(&self, x: u32, y: u32) -> bool {
        self[(x, y)].0[0] != 0
    }
}

/// A single pixel of a depth image together with its label.
/// During training a pixel remembers the image it was taken from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Pixel {
    pub coords: [i16; 2],
    /// depth in meters
    pub depth: f32,
    /// Index of the depth image this pixel belongs to
    pub image_id: u32,
    pub class_index: i8,
}

impl Pixel {
    pub fn new(x: i16, y: i16, depth: f32, image_id: u32, class_index: i8) -> Pixel {
        Pixel {
            coords: [x, y],
            depth: depth,
            image_id: image_id,
            class_index: class_index,
        }
    }

    /// Creates an unlabeled pixel used for classification.
    pub fn unlabeled(x: i16, y: i16, depth: f32) -> Pixel {
        Pixel::new(x, y, depth, 0, BACKGROUND_INDEX)
    }

    pub fn x(&self) -> i32 {
        self.coords[0] as i32
    }
    pub fn y(&self) -> i32 {
        self.coords[1] as i32
    }
    pub fn is_background(&self) -> bool {
        self.class_index == BACKGROUND_INDEX
    }
}

/// Represents a rectangle
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    topleft: [u32; 2],
    bottomright: [u32; 2],
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Rect {
        Rect {
            topleft: [x, y],
            bottomright: [x + width, y + height],
        }
    }

    pub fn width(&self) -> u32 {
        self.bottomright[0] - self.topleft[0]
    }
    pub fn height(&self) -> u32 {
        self.bottomright[1] - self.topleft[1]
    }
    pub fn x(&self) -> u32 {
        self.topleft[0]
    }
    pub fn y(&self) -> u32 {
        self.topleft[1]
    }

    /// Returns the smallest rectangle containing every coordinate
    /// for which `f` returns true. None if there is no such coordinate.
    pub fn bounding<F>(width: u32, height: u32, f: F) -> Option<Rect>
        where F: Fn(u32, u32) -> bool
    {
        let mut min = [u32::max_value(), u32::max_value()];
        let mut max = [0u32, 0u32];
        let mut found = false;
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    found = true;
                    min = [min[0].min(x), min[1].min(y)];
                    max = [max[0].max(x), max[1].max(y)];
                }
            }
        }
        if !found {
            return None;
        }
        Some(Rect::new(min[0], min[1], max[0] - min[0] + 1, max[1] - min[1] + 1))
    }
}

/// Maps an image coordinate and its depth to a point in space.
/// A depth camera implements this to get joint positions in camera space.
pub trait ImageToWorld {
    fn image_to_world(&self, image: Vec2<f32>, depth: f32) -> Vec3<f32>;
}

/// Represent a intrinsic matrix
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct IntrinsicMatrix {
    matrix: Mat3<f32>,
    inverse: Mat3<f32>,
}

impl IntrinsicMatrix {
    pub fn new<T: Into<Mat3<f32>>>(mat: T) -> IntrinsicMatrix {
        let matrix = mat.into();
        IntrinsicMatrix {
            matrix: matrix,
            inverse: matrix.inv(),
        }
    }

    /// Returns the default intrinsic matrix for a kinect
    pub fn default_kinect_intrinsic() -> IntrinsicMatrix {
        IntrinsicMatrix::new([[560.0, 0.0, 320.0], [0.0, 560.0, 240.0], [0.0, 0.0, 1.0]])
    }

    /// Maps the image coordinate to the corresponding space coordinate using this intrinsic matrix
    /// and the given z - value.
    pub fn img_to_space_coord<T: Into<Vec2<f32>>>(&self, img_coord: T, z: f32) -> Vec3<f32> {
        let v2 = img_coord.into();
        let v3 = Vec3::new([v2.0[0], v2.0[1], 1.0]);
        let res = self.inverse * v3;
        let c = z / res.0[2];
        res * c
    }
}

impl ImageToWorld for IntrinsicMatrix {
    fn image_to_world(&self, image: Vec2<f32>, depth: f32) -> Vec3<f32> {
        self.img_to_space_coord(image, depth)
    }
}

/// Converts a depth image in millimeters (as delivered by the camera)
/// into a depth image in meters as used by the forest.
pub fn depth_from_millimeters(img: &MillimeterImage) -> DepthImage {
    DepthImage::from_fn(img.width(),
                        img.height(),
                        |x, y| Luma([img[(x, y)].0[0] as f32 / 1000.0]))
}
