//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Render
//!
//! ```text
//! page1 full/max/0/default.jpg
//!     Size: 4000x3000 → 1000x750
//!     Operations: resize, encode
//!     Output: page1.jpg (183204 bytes, image/jpeg)
//! ```
//!
//! ## Plan
//!
//! ```text
//! page1 0,0,100,100/max/!90/gray.png
//!     Size: 4000x3000 → 100x100
//!     region: crop 0,0,100,100
//!     size: unchanged
//!     rotation: flip, rotate 90°
//!     quality: gamma 2.2, grayscale
//!     format: encode png z6
//! ```
//!
//! ## Batch
//!
//! ```text
//! Rendered 12 of 14 requests (2 failed)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::Operation;
use crate::pipeline::{CompiledRequest, Rendered};
use crate::request::{Fit, FormatSpec};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Short human label for one engine call.
fn operation_label(op: &Operation) -> String {
    match op {
        Operation::Crop(b) => format!("crop {},{},{},{}", b.left, b.top, b.width, b.height),
        Operation::SquareCrop { edge } => format!("square crop {edge}"),
        Operation::Resize(target) => {
            let fit = match target.fit {
                Fit::Fill => "fill",
                Fit::Contain => "contain",
                Fit::Inside => "inside",
            };
            format!("resize {}x{} ({fit})", target.width, target.height)
        }
        Operation::Flip => "flip".to_string(),
        Operation::Rotate { degrees } => format!("rotate {degrees}°"),
        Operation::Gamma { exponent } => format!("gamma {exponent}"),
        Operation::Grayscale => "grayscale".to_string(),
        Operation::Threshold { level } => format!("threshold {level}"),
        Operation::Encode(spec) => format!("encode {}", format_profile(spec)),
    }
}

/// Operation names only, comma separated.
fn operation_names(ops: &[Operation]) -> String {
    ops.iter()
        .map(|op| match op {
            Operation::Crop(_) => "crop",
            Operation::SquareCrop { .. } => "square crop",
            Operation::Resize(_) => "resize",
            Operation::Flip => "flip",
            Operation::Rotate { .. } => "rotate",
            Operation::Gamma { .. } => "gamma",
            Operation::Grayscale => "grayscale",
            Operation::Threshold { .. } => "threshold",
            Operation::Encode(_) => "encode",
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn header(identifier: &str, compiled: &CompiledRequest) -> Vec<String> {
    vec![
        format!("{} {}", identifier, compiled.segments.to_path()),
        format!("{}Size: {} → {}", indent(1), compiled.source, compiled.size),
    ]
}

pub fn format_render_output(
    identifier: &str,
    compiled: &CompiledRequest,
    rendered: &Rendered,
    output: &Path,
) -> Vec<String> {
    let mut lines = header(identifier, compiled);
    lines.push(format!(
        "{}Operations: {}",
        indent(1),
        operation_names(&compiled.operations())
    ));
    lines.push(format!(
        "{}Output: {} ({} bytes, {})",
        indent(1),
        output.display(),
        rendered.len(),
        rendered.content_type
    ));
    lines
}

pub fn print_render_output(
    identifier: &str,
    compiled: &CompiledRequest,
    rendered: &Rendered,
    output: &Path,
) {
    for line in format_render_output(identifier, compiled, rendered, output) {
        println!("{}", line);
    }
}

/// One line per stage, in pipeline order.
pub fn format_plan_output(identifier: &str, compiled: &CompiledRequest) -> Vec<String> {
    let mut lines = header(identifier, compiled);
    for stage in &compiled.stages {
        let detail = if stage.requires_processing() {
            stage
                .describe()
                .iter()
                .map(operation_label)
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            "unchanged".to_string()
        };
        lines.push(format!("{}{}: {}", indent(1), stage.name(), detail));
    }
    lines
}

pub fn print_plan_output(identifier: &str, compiled: &CompiledRequest) {
    for line in format_plan_output(identifier, compiled) {
        println!("{}", line);
    }
}

/// Output file name for a rendered request: `{identifier}.{ext}`, with path
/// separators flattened.
pub fn output_file_name(identifier: &str, compiled: &CompiledRequest) -> String {
    let stem = identifier.replace(['/', '\\'], "_");
    format!("{stem}.{}", compiled.codec.extension())
}

/// Encode profile description, e.g. `jpg q80`.
pub fn format_profile(spec: &FormatSpec) -> String {
    match spec {
        FormatSpec::Jpeg { quality, .. } => format!("jpg q{quality}"),
        FormatSpec::Png {
            compression_level, ..
        } => format!("png z{compression_level}"),
        FormatSpec::Webp { quality } => format!("webp q{quality}"),
        FormatSpec::Tiff { quality } => format!("tif q{quality}"),
        FormatSpec::Unsupported { format } => format!("{format:?} (unsupported)"),
    }
}

pub fn format_batch_summary(rendered: usize, failed: usize) -> Vec<String> {
    let total = rendered + failed;
    if failed == 0 {
        vec![format!("Rendered {rendered} of {total} requests")]
    } else {
        vec![format!(
            "Rendered {rendered} of {total} requests ({failed} failed)"
        )]
    }
}

pub fn print_batch_summary(rendered: usize, failed: usize) {
    for line in format_batch_summary(rendered, failed) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::pipeline::compile;
    use crate::request::RequestSegments;
    use std::path::PathBuf;

    fn compiled(path: &str) -> CompiledRequest {
        compile(
            Size::new(4000, 3000),
            None,
            &RequestSegments::from_path(path).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn plan_lists_every_stage_in_order() {
        let lines = format_plan_output("page1", &compiled("0,0,100,100/max/!90/gray.png"));
        assert_eq!(
            lines,
            vec![
                "page1 0,0,100,100/max/!90/gray.png",
                "    Size: 4000x3000 → 100x100",
                "    region: crop 0,0,100,100",
                "    size: unchanged",
                "    rotation: flip, rotate 90°",
                "    quality: gamma 2.2, grayscale",
                "    format: encode png z6",
            ]
        );
    }

    #[test]
    fn plan_shows_resize_fit() {
        let lines = format_plan_output("a", &compiled("full/!100,100/0/default.jpg"));
        assert_eq!(lines[3], "    size: resize 100x75 (inside)");
    }

    #[test]
    fn render_output_reports_bytes_and_type() {
        let compiled = compiled("square/200,/0/bitonal.webp");
        let rendered = Rendered {
            bytes: vec![0; 42],
            content_type: "image/webp",
        };
        let lines =
            format_render_output("page1", &compiled, &rendered, &PathBuf::from("out/page1.webp"));
        assert_eq!(lines[0], "page1 square/200,/0/bitonal.webp");
        assert_eq!(lines[1], "    Size: 4000x3000 → 200x200");
        assert_eq!(lines[2], "    Operations: square crop, resize, threshold, encode");
        assert_eq!(lines[3], "    Output: out/page1.webp (42 bytes, image/webp)");
    }

    #[test]
    fn output_file_name_flattens_paths() {
        let compiled = compiled("full/max/0/default.tif");
        assert_eq!(output_file_name("books/p1", &compiled), "books_p1.tif");
        assert_eq!(output_file_name("p1", &compiled), "p1.tif");
    }

    #[test]
    fn profiles() {
        assert_eq!(
            format_profile(&FormatSpec::from_token("jpg").unwrap()),
            "jpg q80"
        );
        assert_eq!(
            format_profile(&FormatSpec::from_token("png").unwrap()),
            "png z6"
        );
        assert_eq!(
            format_profile(&FormatSpec::from_token("pdf").unwrap()),
            "Pdf (unsupported)"
        );
    }

    #[test]
    fn batch_summary() {
        assert_eq!(format_batch_summary(3, 0), vec!["Rendered 3 of 3 requests"]);
        assert_eq!(
            format_batch_summary(12, 2),
            vec!["Rendered 12 of 14 requests (2 failed)"]
        );
    }
}
