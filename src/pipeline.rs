//! Request compiler and executor.
//!
//! A request goes through two linear passes over the same fixed sequence of
//! five stages:
//!
//! ```text
//! parse:    region → size → rotation → quality → format   (working size threaded through region and size)
//! execute:  crop   → resize → flip/rotate → recolor → encode   (skipped stages issue nothing)
//! ```
//!
//! [`compile`] runs the parse pass and either yields a [`CompiledRequest`] or
//! the first stage's [`RequestError`]. [`CompiledRequest::execute`] runs the
//! execute pass against any [`PixelEngine`], whose errors pass through
//! unchanged.

use crate::geometry::{Size, TierCap};
use crate::imaging::{Operation, PixelEngine};
use crate::request::{
    Codec, FormatRequest, QualityRequest, RegionRequest, RequestError, RequestSegments,
    RotationRequest, SizeRequest,
};
use serde::Serialize;

/// Mutable state shared by the region and size resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineContext {
    /// Working size; shrinks through region and size resolution.
    pub size: Size,
    pub tier: Option<TierCap>,
}

impl PipelineContext {
    pub fn new(size: Size, tier: Option<TierCap>) -> Self {
        Self { size, tier }
    }
}

/// One resolved stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    Region(RegionRequest),
    Size(SizeRequest),
    Rotation(RotationRequest),
    Quality(QualityRequest),
    Format(FormatRequest),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Region(_) => "region",
            Self::Size(_) => "size",
            Self::Rotation(_) => "rotation",
            Self::Quality(_) => "quality",
            Self::Format(_) => "format",
        }
    }

    pub fn requires_processing(&self) -> bool {
        match self {
            Self::Region(stage) => stage.requires_processing(),
            Self::Size(stage) => stage.requires_processing(),
            Self::Rotation(stage) => stage.requires_processing(),
            Self::Quality(stage) => stage.requires_processing(),
            Self::Format(stage) => stage.requires_processing(),
        }
    }

    pub fn describe(&self) -> Vec<Operation> {
        match self {
            Self::Region(stage) => stage.describe(),
            Self::Size(stage) => stage.describe(),
            Self::Rotation(stage) => stage.describe(),
            Self::Quality(stage) => stage.describe(),
            Self::Format(stage) => stage.describe(),
        }
    }
}

/// A fully validated request, ready to run against an engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledRequest {
    pub segments: RequestSegments,
    /// Natural size of the source.
    pub source: Size,
    /// Size of the output after region and size resolution.
    pub size: Size,
    pub codec: Codec,
    pub stages: [Stage; 5],
}

/// Encoded derivative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

impl Rendered {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Parse and validate the five segments against the source size and tier.
///
/// Stages parse in fixed order and the first failure aborts the compile.
pub fn compile(
    source: Size,
    tier: Option<TierCap>,
    segments: &RequestSegments,
) -> Result<CompiledRequest, RequestError> {
    if source.width == 0 || source.height == 0 {
        return Err(RequestError::malformed(format!(
            "source size {source} has no area"
        )));
    }

    let mut ctx = PipelineContext::new(source, tier);
    let region = RegionRequest::parse(&segments.region, &mut ctx)?;
    let size = SizeRequest::parse(&segments.size, &mut ctx)?;
    let rotation = RotationRequest::parse(&segments.rotation)?;
    let quality = QualityRequest::parse(&segments.quality)?;
    let format = FormatRequest::parse(&segments.format)?;

    let codec = format.codec;
    let stages = [
        Stage::Region(region),
        Stage::Size(size),
        Stage::Rotation(rotation),
        Stage::Quality(quality),
        Stage::Format(format),
    ];
    for stage in &stages {
        log::debug!(
            "{}: {:?} (processing: {})",
            stage.name(),
            stage,
            stage.requires_processing()
        );
    }

    Ok(CompiledRequest {
        segments: segments.clone(),
        source,
        size: ctx.size,
        codec,
        stages,
    })
}

impl CompiledRequest {
    pub fn content_type(&self) -> &'static str {
        self.codec.content_type()
    }

    /// Every operation the execute pass will issue, in order.
    pub fn operations(&self) -> Vec<Operation> {
        self.stages
            .iter()
            .filter(|stage| stage.requires_processing())
            .flat_map(Stage::describe)
            .collect()
    }

    /// Run the execute pass on `engine`.
    pub fn execute<E: PixelEngine + ?Sized>(&self, engine: &mut E) -> Result<Rendered, E::Error> {
        let mut bytes = Vec::new();
        for stage in &self.stages {
            if !stage.requires_processing() {
                continue;
            }
            for op in stage.describe() {
                log::trace!("{}: {:?}", stage.name(), op);
                if let Some(encoded) = op.apply_to(engine)? {
                    bytes = encoded;
                }
            }
        }
        Ok(Rendered {
            bytes,
            content_type: self.content_type(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PixelBox;
    use crate::imaging::BackendError;
    use crate::imaging::backend::tests::RecordingEngine;
    use crate::request::{Fit, FormatSpec, SizeTarget};

    fn request(path: &str) -> RequestSegments {
        RequestSegments::from_path(path).unwrap()
    }

    fn run(path: &str, source: Size, tier: Option<u32>) -> (CompiledRequest, Vec<Operation>) {
        let compiled = compile(source, tier.map(TierCap::new), &request(path)).unwrap();
        let mut engine = RecordingEngine::new();
        let rendered = compiled.execute(&mut engine).unwrap();
        assert_eq!(rendered.bytes, b"encoded");
        (compiled, engine.operations)
    }

    #[test]
    fn identity_request_only_encodes() {
        let (compiled, ops) = run("full/max/0/default.jpg", Size::new(640, 480), None);
        assert_eq!(compiled.size, Size::new(640, 480));
        assert_eq!(
            ops,
            vec![Operation::Encode(FormatSpec::Jpeg {
                quality: 80,
                progressive: false
            })]
        );
    }

    #[test]
    fn every_stage_runs_in_fixed_order() {
        let (compiled, ops) = run(
            "10,10,100,50/50,/!90/gray.png",
            Size::new(400, 300),
            None,
        );
        assert_eq!(compiled.size, Size::new(50, 25));
        assert_eq!(
            ops,
            vec![
                Operation::Crop(PixelBox::new(10, 10, 100, 50)),
                Operation::Resize(SizeTarget {
                    width: 50,
                    height: 25,
                    fit: Fit::Contain
                }),
                Operation::Flip,
                Operation::Rotate { degrees: 90 },
                Operation::Gamma { exponent: 2.2 },
                Operation::Grayscale,
                Operation::Encode(FormatSpec::Png {
                    compression_level: 6,
                    progressive: false
                }),
            ]
        );
        assert_eq!(ops, compiled.operations());
    }

    #[test]
    fn size_resolves_against_region_output() {
        let (compiled, ops) = run("square/pct:50/0/bitonal.webp", Size::new(300, 200), None);
        assert_eq!(compiled.size, Size::new(100, 100));
        assert_eq!(ops[0], Operation::SquareCrop { edge: 200 });
        assert_eq!(
            ops[1],
            Operation::Resize(SizeTarget {
                width: 100,
                height: 100,
                fit: Fit::Contain
            })
        );
        assert_eq!(ops[2], Operation::Threshold { level: 128 });
    }

    #[test]
    fn tier_caps_region_output_not_source() {
        let (compiled, ops) = run("0,0,1000,500/max/0/default.jpg", Size::new(4000, 3000), Some(800));
        assert_eq!(compiled.size, Size::new(800, 400));
        assert_eq!(
            ops[1],
            Operation::Resize(SizeTarget {
                width: 800,
                height: 400,
                fit: Fit::Inside
            })
        );
    }

    #[test]
    fn tier_cap_never_resolves_to_zero_edge() {
        let (compiled, _) = run("full/max/0/default.png", Size::new(10000, 1), Some(100));
        assert_eq!(compiled.size, Size::new(100, 1));
    }

    #[test]
    fn small_region_under_tier_skips_resize() {
        let (_, ops) = run("0,0,100,100/max/0/default.jpg", Size::new(4000, 3000), Some(800));
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], Operation::Crop(_)));
        assert!(matches!(ops[1], Operation::Encode(_)));
    }

    #[test]
    fn content_type_follows_codec() {
        let compiled = compile(Size::new(10, 10), None, &request("full/max/0/default.tif")).unwrap();
        assert_eq!(compiled.codec, Codec::Tiff);
        assert_eq!(compiled.content_type(), "image/tiff");
    }

    #[test]
    fn first_failing_stage_wins() {
        // Region and format are both bad; region parses first.
        let err = compile(Size::new(200, 200), None, &request("201,80,100,100/max/0/default.jp2"))
            .unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));

        let err = compile(Size::new(200, 200), None, &request("full/max/0/default.jp2")).unwrap_err();
        assert!(matches!(err, RequestError::NotImplemented(_)));
    }

    #[test]
    fn bad_quality_aborts_before_format() {
        let err = compile(Size::new(200, 200), None, &request("full/max/0/sepia.gif")).unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }

    #[test]
    fn zero_area_source_is_rejected() {
        assert!(compile(Size::new(0, 10), None, &request("full/max/0/default.jpg")).is_err());
    }

    #[test]
    fn engine_errors_pass_through_and_stop_execution() {
        let compiled = compile(
            Size::new(200, 200),
            None,
            &request("10,10,50,50/max/90/default.jpg"),
        )
        .unwrap();
        let mut engine = RecordingEngine::failing_on("rotate");
        let err = compiled.execute(&mut engine).unwrap_err();
        assert!(matches!(err, BackendError::ProcessingFailed(msg) if msg == "rotate exploded"));
        assert_eq!(engine.operations, vec![Operation::Crop(PixelBox::new(10, 10, 50, 50))]);
    }

    #[test]
    fn stage_names_match_order() {
        let compiled = compile(Size::new(10, 10), None, &request("full/max/0/default.jpg")).unwrap();
        let names: Vec<_> = compiled.stages.iter().map(Stage::name).collect();
        assert_eq!(names, ["region", "size", "rotation", "quality", "format"]);
    }

    #[test]
    fn compiled_request_serializes_for_plans() {
        let compiled = compile(Size::new(200, 100), None, &request("full/!50,50/0/default.jpg")).unwrap();
        let json = serde_json::to_value(&compiled).unwrap();
        assert_eq!(json["size"], serde_json::json!({"width": 50, "height": 25}));
        assert_eq!(json["stages"][1]["stage"], "size");
        assert_eq!(json["stages"][1]["target"]["fit"], "inside");
        assert_eq!(json["codec"], "jpeg");
    }
}
