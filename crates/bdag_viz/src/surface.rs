//! Drawing surfaces the renderer paints onto.
//!
//! The renderer only speaks the [`Surface`] trait. Two implementations ship with the
//! crate:
//!
//! - [`DisplayList`] records draw commands into a serializable list. The browser page
//!   replays it on a `<canvas>`, and tests inspect it directly.
//! - [`SvgSurface`] writes an SVG document for export.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A point in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 2D raster target.
///
/// Calls arrive in paint order: `clear`, `set_scale`, then strokes and fills. Alpha is
/// sticky until the next `set_alpha`.
pub trait Surface {
    /// Wipes the surface and resets transform and alpha.
    fn clear(&mut self, width: f64, height: f64);

    /// Applies a uniform scale around the origin to everything drawn afterwards.
    fn set_scale(&mut self, scale: f64);

    /// Sets global alpha for subsequent operations.
    fn set_alpha(&mut self, alpha: f64);

    fn stroke_line(&mut self, from: Point, to: Point, color: &str, width: f64);

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str);

    fn stroke_circle(&mut self, center: Point, radius: f64, color: &str, width: f64);
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear {
        width: f64,
        height: f64,
    },
    Scale {
        factor: f64,
    },
    Alpha {
        value: f64,
    },
    Line {
        from: Point,
        to: Point,
        color: String,
        width: f64,
    },
    FillCircle {
        center: Point,
        radius: f64,
        color: String,
    },
    StrokeCircle {
        center: Point,
        radius: f64,
        color: String,
        width: f64,
    },
}

/// A surface that records every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayList {
    pub commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Centers of every filled circle, in paint order.
    pub fn filled_circles(&self) -> Vec<Point> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillCircle { center, .. } => Some(*center),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded line strokes.
    pub fn line_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
            .count()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Surface for DisplayList {
    fn clear(&mut self, width: f64, height: f64) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear { width, height });
    }

    fn set_scale(&mut self, scale: f64) {
        self.commands.push(DrawCommand::Scale { factor: scale });
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.commands.push(DrawCommand::Alpha { value: alpha });
    }

    fn stroke_line(&mut self, from: Point, to: Point, color: &str, width: f64) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color: color.to_string(),
            width,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            color: color.to_string(),
        });
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, color: &str, width: f64) {
        self.commands.push(DrawCommand::StrokeCircle {
            center,
            radius,
            color: color.to_string(),
            width,
        });
    }
}

/// A surface that renders to an SVG document.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    scale: f64,
    alpha: f64,
    body: String,
}

impl SvgSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scale: 1.0,
            alpha: 1.0,
            body: String::new(),
        }
    }

    /// Closes the document and returns it.
    pub fn finish(self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><g transform="scale({s})">{body}</g></svg>"#,
            w = self.width,
            h = self.height,
            s = self.scale,
            body = self.body,
        )
    }
}

impl Surface for SvgSurface {
    fn clear(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.scale = 1.0;
        self.alpha = 1.0;
        self.body.clear();
    }

    fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    fn stroke_line(&mut self, from: Point, to: Point, color: &str, width: f64) {
        let _ = write!(
            self.body,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{}" opacity="{}"/>"#,
            from.x, from.y, to.x, to.y, color, width, self.alpha
        );
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) {
        let _ = write!(
            self.body,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}" opacity="{}"/>"#,
            center.x, center.y, radius, color, self.alpha
        );
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, color: &str, width: f64) {
        let _ = write!(
            self.body,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="none" stroke="{}" stroke-width="{}" opacity="{}"/>"#,
            center.x, center.y, radius, color, width, self.alpha
        );
    }
}
