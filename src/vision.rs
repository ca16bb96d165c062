//! Boundary to the external vision-processing stage.
//!
//! The pixel-level algorithm is a collaborator, not part of this crate:
//! frame in, bounding rectangles out, in the same pixel space as the input
//! frame. Generated pipelines plug in by implementing [`VisionPipeline`].

use serde::Deserialize;

use crate::error::{Result, TrackerError};
use crate::frame::Frame;

/// Axis-aligned bounding rectangle in image-relative pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The external vision-processing stage.
pub trait VisionPipeline: Send {
    fn process(&mut self, frame: &Frame) -> Vec<BoundingBox>;
}

/// Stage parameters recognized by the pipeline builder.
///
/// One explicit field per stage parameter, validated at construction.
/// Unknown keys fail configuration loading instead of being silently
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineConfig {
    pub hsv_threshold: Option<HsvThreshold>,
    pub filter_contours: Option<FilterContours>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HsvThreshold {
    pub hue: [f64; 2],
    pub saturation: [f64; 2],
    pub value: [f64; 2],
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FilterContours {
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub min_perimeter: Option<f64>,
    pub max_perimeter: Option<f64>,
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
    pub min_height: Option<f64>,
    pub max_height: Option<f64>,
    pub solidity: Option<[f64; 2]>,
    pub min_vertices: Option<u32>,
    pub max_vertices: Option<u32>,
    pub min_ratio: Option<f64>,
    pub max_ratio: Option<f64>,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(hsv) = &self.hsv_threshold {
            for (name, range) in [
                ("hue", hsv.hue),
                ("saturation", hsv.saturation),
                ("value", hsv.value),
            ] {
                if range[0] > range[1] {
                    return Err(TrackerError::config(format!(
                        "hsv_threshold {} range is inverted: [{}, {}]",
                        name, range[0], range[1]
                    )));
                }
            }
        }
        if let Some(filter) = &self.filter_contours {
            let pairs = [
                ("area", filter.min_area, filter.max_area),
                ("perimeter", filter.min_perimeter, filter.max_perimeter),
                ("width", filter.min_width, filter.max_width),
                ("height", filter.min_height, filter.max_height),
                ("ratio", filter.min_ratio, filter.max_ratio),
            ];
            for (name, min, max) in pairs {
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(TrackerError::config(format!(
                            "filter_contours {} bounds are inverted: [{}, {}]",
                            name, min, max
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Placeholder pipeline reporting no targets. Stands in where no generated
/// pipeline has been linked, and serves as the disabled-camera fixture in
/// tests.
pub struct NoopPipeline;

impl VisionPipeline for NoopPipeline {
    fn process(&mut self, _frame: &Frame) -> Vec<BoundingBox> {
        Vec::new()
    }
}

/// Build the vision stage for one camera from its validated parameters.
///
/// The stage parameters are carried so a generated pipeline constructed
/// here can consume them; until one is linked this yields the no-op stage.
pub fn build_pipeline(config: &PipelineConfig) -> Result<Box<dyn VisionPipeline>> {
    config.validate()?;
    Ok(Box::new(NoopPipeline))
}
