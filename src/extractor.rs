//! Glues forest and joint localizer together for a segmented hand.

use std::path::Path;

use meanshift::JointLocalizer;
use rdf::{ForestError, ModelError, RandomDecisionForest};
use skeleton::HandSkeleton;
use types::*;
use vecmat::Vec2i;

/// Depth patch of a segmented hand as delivered by the camera.
#[derive(Debug, Clone)]
pub struct HandPatch {
    /// depth in millimeters, zero for missing values
    pub depth_mm: MillimeterImage,
    /// position of the patch within the camera image
    pub bounding_box: Rect,
}

pub struct SkeletonExtractor {
    forest: RandomDecisionForest,
    localizer: JointLocalizer,
    last_classes: Option<ClassImage>,
}

impl SkeletonExtractor {
    pub fn new(forest: RandomDecisionForest,
               camera: Option<Box<dyn ImageToWorld + Send + Sync>>)
               -> SkeletonExtractor {
        SkeletonExtractor {
            forest: forest,
            localizer: JointLocalizer::new(camera),
            last_classes: None,
        }
    }

    /// Loads the forest from a text or binary model file.
    pub fn load<P: AsRef<Path>>(model_path: P,
                                camera: Option<Box<dyn ImageToWorld + Send + Sync>>)
                                -> Result<SkeletonExtractor, ModelError> {
        let forest = RandomDecisionForest::from_file(model_path)?;
        info!("Loaded forest with {} trees", forest.tree_count());
        Ok(SkeletonExtractor::new(forest, camera))
    }

    pub fn forest(&self) -> &RandomDecisionForest {
        &self.forest
    }

    /// Classes of the last patch passed to `extract_skeleton`
    pub fn last_classes(&self) -> Option<&ClassImage> {
        self.last_classes.as_ref()
    }

    /// Classifies the patch and localizes every joint.
    pub fn extract_skeleton(&mut self, patch: &HandPatch) -> Result<HandSkeleton, ForestError> {
        let depth = depth_from_millimeters(&patch.depth_mm);
        let result = self.forest.classify_image_parallel(&depth)?;
        let origin = if self.localizer.has_camera() {
            Vec2i::new([patch.bounding_box.x() as i32, patch.bounding_box.y() as i32])
        } else {
            Vec2i::new([0, 0])
        };
        let skeleton = self.localizer
            .approximate_joints_at(&depth, &result.weights, &result.best_points, origin);
        self.last_classes = Some(result.classes);
        Ok(skeleton)
    }
}
