//! The hand skeleton: 22 joints with a fixed parent/child topology.

use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::ops::{Index, IndexMut};
use std::path::Path;

use serde_json;

use vecmat::{Vec2i, Vec3};

pub const NUM_JOINTS: usize = 22;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandJointType {
    Wrist,
    Center,
    ThumbBase,
    ThumbMid,
    ThumbTop,
    ThumbTip,
    IndexBase,
    IndexMid,
    IndexTop,
    IndexTip,
    MiddleBase,
    MiddleMid,
    MiddleTop,
    MiddleTip,
    RingBase,
    RingMid,
    RingTop,
    RingTip,
    PinkyBase,
    PinkyMid,
    PinkyTop,
    PinkyTip,
}

use self::HandJointType::*;

impl HandJointType {
    /// All joint types in index order
    pub const ALL: [HandJointType; NUM_JOINTS] = [Wrist, Center, ThumbBase, ThumbMid, ThumbTop,
                                                  ThumbTip, IndexBase, IndexMid, IndexTop,
                                                  IndexTip, MiddleBase, MiddleMid, MiddleTop,
                                                  MiddleTip, RingBase, RingMid, RingTop, RingTip,
                                                  PinkyBase, PinkyMid, PinkyTop, PinkyTip];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<HandJointType> {
        HandJointType::ALL.get(idx).cloned()
    }

    /// The joint this one is attached to. Wrist and center have no parent,
    /// the base of every finger hangs on the wrist.
    pub fn parent(self) -> Option<HandJointType> {
        match self {
            Wrist | Center => None,
            ThumbBase | IndexBase | MiddleBase | RingBase | PinkyBase => Some(Wrist),
            other => HandJointType::from_index(other.index() - 1),
        }
    }

    pub fn children(self) -> Vec<HandJointType> {
        HandJointType::ALL
            .iter()
            .cloned()
            .filter(|j| j.parent() == Some(self))
            .collect()
    }
}

/// A located joint.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct HandJoint {
    pub location: Vec3<f32>,
    /// Density mass at the joint. Zero if the joint was not found.
    pub certainty: f32,
    pub location_image: Vec2i,
    pub joint_type: Option<HandJointType>,
}

impl Default for HandJoint {
    fn default() -> HandJoint {
        HandJoint {
            location: Vec3([0.0; 3]),
            certainty: 0.0,
            location_image: Vec2i::default(),
            joint_type: None,
        }
    }
}

impl HandJoint {
    pub fn is_found(&self) -> bool {
        self.certainty > 0.0
    }
}

#[derive(Debug)]
pub enum SkeletonError {
    IoError(io::Error),
    ParseError(serde_json::Error),
    /// The file holds this many joints instead of one per joint type
    JointCount(usize),
    /// The joint at this index is of another type
    JointTypeMismatch(usize),
}

impl From<io::Error> for SkeletonError {
    fn from(err: io::Error) -> Self {
        SkeletonError::IoError(err)
    }
}

impl From<serde_json::Error> for SkeletonError {
    fn from(err: serde_json::Error) -> Self {
        SkeletonError::ParseError(err)
    }
}

impl fmt::Display for SkeletonError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SkeletonError::IoError(ref err) => err.fmt(f),
            SkeletonError::ParseError(ref err) => write!(f, "Invalid skeleton file: {}", err),
            SkeletonError::JointCount(n) => {
                write!(f, "Skeleton has {} joints, expected {}", n, NUM_JOINTS)
            }
            SkeletonError::JointTypeMismatch(i) => write!(f, "Joint {} has the wrong type", i),
        }
    }
}

impl Error for SkeletonError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            SkeletonError::IoError(ref err) => Some(err),
            SkeletonError::ParseError(ref err) => Some(err),
            SkeletonError::JointCount(_) |
            SkeletonError::JointTypeMismatch(_) => None,
        }
    }
}

/// The joints of one hand, indexed by `HandJointType`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HandSkeleton {
    joints: Vec<HandJoint>,
}

impl Default for HandSkeleton {
    fn default() -> HandSkeleton {
        HandSkeleton::new()
    }
}

impl HandSkeleton {
    /// Creates a skeleton where no joint has been found
    pub fn new() -> HandSkeleton {
        HandSkeleton {
            joints: HandJointType::ALL
                .iter()
                .map(|&t| HandJoint { joint_type: Some(t), ..HandJoint::default() })
                .collect(),
        }
    }

    /// Puts the joint at the place given by its type.
    /// A joint without type is ignored.
    pub fn set_joint(&mut self, joint: HandJoint) {
        if let Some(t) = joint.joint_type {
            self.joints[t.index()] = joint;
        }
    }

    pub fn joints(&self) -> &[HandJoint] {
        &self.joints
    }

    pub fn parent(&self, joint: HandJointType) -> Option<&HandJoint> {
        joint.parent().map(|p| &self[p])
    }

    pub fn children(&self, joint: HandJointType) -> Vec<&HandJoint> {
        joint.children().into_iter().map(|c| &self[c]).collect()
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SkeletonError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<HandSkeleton, SkeletonError> {
        let reader = BufReader::new(File::open(path)?);
        let skeleton: HandSkeleton = serde_json::from_reader(reader)?;
        if skeleton.joints.len() != NUM_JOINTS {
            return Err(SkeletonError::JointCount(skeleton.joints.len()));
        }
        for (i, (joint, t)) in skeleton.joints.iter().zip(HandJointType::ALL.iter()).enumerate() {
            if joint.joint_type != Some(*t) {
                return Err(SkeletonError::JointTypeMismatch(i));
            }
        }
        Ok(skeleton)
    }
}

impl Index<HandJointType> for HandSkeleton {
    type Output = HandJoint;
    fn index(&self, idx: HandJointType) -> &HandJoint {
        &self.joints[idx.index()]
    }
}

impl IndexMut<HandJointType> for HandSkeleton {
    fn index_mut(&mut self, idx: HandJointType) -> &mut HandJoint {
        &mut self.joints[idx.index()]
    }
}
