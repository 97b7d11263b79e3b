use std::error::Error;
use std::fmt;
use std::fs::read_dir;
use std::io;
use std::path::{Path, PathBuf};
use std::result::Result;

use image::{self, imageops, Luma};
use regex::Regex;

use classes::rgb_to_classes;
use super::reader::*;
use types::*;

pub type GResult<T> = Result<T, ReadError>;

/// Depth images of the generated set are stored in decimeters
const DEPTH_DIVISOR: f32 = 10.0;

// Error Definitions

#[derive(Debug)]
pub enum ReadError {
    DirectoryExpected(String),
    IoError(io::Error),
    ImageError(image::ImageError),
    /// The class image of the sample has no hand pixel
    EmptySample(usize),
    /// Class and depth image of the sample differ in size
    SizeMismatch(usize),
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        ReadError::IoError(err)
    }
}

impl From<image::ImageError> for ReadError {
    fn from(err: image::ImageError) -> Self {
        ReadError::ImageError(err)
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ReadError::DirectoryExpected(ref x) => write!(f, "Directory not found. Dirname: {}", x),
            ReadError::IoError(ref io) => io.fmt(f),
            ReadError::ImageError(ref err) => err.fmt(f),
            ReadError::EmptySample(i) => write!(f, "Sample {} contains no hand", i),
            ReadError::SizeMismatch(i) => {
                write!(f, "Class and depth image of sample {} differ in size", i)
            }
        }
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            ReadError::IoError(ref err) => Some(err),
            ReadError::ImageError(ref err) => Some(err),
            ReadError::DirectoryExpected(_) |
            ReadError::EmptySample(_) |
            ReadError::SizeMismatch(_) => None,
        }
    }
}

// Define Reader

/// A reader for the generated hand set. Sample `i` consists of
/// `<class_prefix>NNNNNNN.png` and `<depth_prefix>NNNNNNN.exr`.
#[derive(Debug, Clone)]
pub struct GeneratedSetReader {
    directory: PathBuf,
    class_prefix: String,
    depth_prefix: String,
    digits: usize,
}

impl GeneratedSetReader {
    /// Creates a new reader
    /// # Arguments
    /// * `directory` - directory containing the images
    /// * `class_prefix` - file name prefix of the class images (e.g. "hand_classes_")
    /// * `depth_prefix` - file name prefix of the depth images (e.g. "hand_depth_")
    pub fn new<P: AsRef<Path>>(directory: P,
                               class_prefix: &str,
                               depth_prefix: &str)
                               -> GResult<GeneratedSetReader> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(ReadError::DirectoryExpected(directory.to_string_lossy().into_owned()));
        }
        Ok(GeneratedSetReader {
            directory: directory.to_path_buf(),
            class_prefix: class_prefix.to_string(),
            depth_prefix: depth_prefix.to_string(),
            digits: 7,
        })
    }

    /// Reader using the prefixes of the generator script
    pub fn with_default_prefixes<P: AsRef<Path>>(directory: P) -> GResult<GeneratedSetReader> {
        GeneratedSetReader::new(directory, "hand_classes_", "hand_depth_")
    }

    pub fn class_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("{}{:0width$}.png", self.class_prefix, index, width = self.digits))
    }

    pub fn depth_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("{}{:0width$}.exr", self.depth_prefix, index, width = self.digits))
    }

    /// Reads the depth image and converts it to meters
    fn read_depth(&self, index: usize) -> GResult<DepthImage> {
        let rgb = image::open(self.depth_path(index))?.into_rgb32f();
        Ok(DepthImage::from_fn(rgb.width(),
                               rgb.height(),
                               |x, y| Luma([rgb[(x, y)].0[0] / DEPTH_DIVISOR])))
    }
}

/// Returns the sample index if `name` is `<prefix>NNN.png`
fn index_from_name(name: &str, prefix: &str) -> Option<usize> {
    lazy_static! {
        static ref CLASS_FILE: Regex = Regex::new(r"^(\d+)\.png$").unwrap();
    }
    if !name.starts_with(prefix) {
        return None;
    }
    CLASS_FILE.captures(&name[prefix.len()..])
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl SampleReader for GeneratedSetReader {
    type Err = ReadError;

    fn available_indices(&self) -> GResult<Vec<usize>> {
        let mut res = Vec::new();
        for entry in read_dir(&self.directory)? {
            let name = entry?.file_name();
            let index = match name.to_str().and_then(|n| index_from_name(n, &self.class_prefix)) {
                Some(i) => i,
                None => continue,
            };
            if self.depth_path(index).is_file() {
                res.push(index);
            } else {
                warn!("No depth image for sample {}", index);
            }
        }
        res.sort();
        Ok(res)
    }

    fn contains(&self, index: usize) -> bool {
        self.class_path(index).is_file() && self.depth_path(index).is_file()
    }

    /// Loads a sample, cropped to the bounding box of the hand
    fn load(&self, index: usize) -> GResult<TrainingSample> {
        let classes = rgb_to_classes(&image::open(self.class_path(index))?.to_rgb8());
        let depth = self.read_depth(index)?;
        if classes.dimensions() != depth.dimensions() {
            return Err(ReadError::SizeMismatch(index));
        }
        let (w, h) = classes.dimensions();
        let rect = match Rect::bounding(w, h, |x, y| classes[(x, y)].0[0] != BACKGROUND_INDEX) {
            Some(r) => r,
            None => return Err(ReadError::EmptySample(index)),
        };
        debug!("Sample {}: hand within {:?}", index, rect);
        Ok(TrainingSample {
            index: index,
            classes: imageops::crop_imm(&classes, rect.x(), rect.y(), rect.width(), rect.height())
                .to_image(),
            depth: imageops::crop_imm(&depth, rect.x(), rect.y(), rect.width(), rect.height())
                .to_image(),
        })
    }
}
