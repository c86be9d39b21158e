// annotation.rs: rectangle annotations read from an SVG overlay
//
// Every element with a `data-type` attribute is an annotation. Geometry comes
// from the plain `x` / `y` / `width` / `height` attributes in user units;
// transforms are not applied.

use crate::error::AnnotationError;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationKind {
    Item,
    Panel,
    /// Unrecognised `data-type`; kept so the index can drop it deliberately.
    Other(String),
}

impl AnnotationKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "item" => AnnotationKind::Item,
            "panel" => AnnotationKind::Panel,
            other => AnnotationKind::Other(other.to_string()),
        }
    }
}

/// A rectangle on the flat panorama image, y measured downward from the top.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: String,
    pub kind: AnnotationKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationDocument {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub annotations: Vec<Annotation>,
}

impl AnnotationDocument {
    pub fn parse(text: &str) -> Result<Self, AnnotationError> {
        let doc = roxmltree::Document::parse(text)?;
        let root = doc.root_element();

        let view_box = root.attribute("viewBox").and_then(parse_view_box);
        let width = root
            .attribute("width")
            .and_then(|v| parse_length(v).ok())
            .or(view_box.map(|vb| vb.2));
        let height = root
            .attribute("height")
            .and_then(|v| parse_length(v).ok())
            .or(view_box.map(|vb| vb.3));

        let mut annotations = Vec::new();
        for node in doc.descendants().filter(|n| n.is_element()) {
            let Some(kind) = node.attribute("data-type") else {
                continue;
            };
            let id = node.attribute("id").unwrap_or_default().to_string();
            if id.is_empty() {
                log::debug!("annotation <{}> has no id", node.tag_name().name());
            }

            let attr = |name: &'static str| -> Result<f32, AnnotationError> {
                match node.attribute(name) {
                    None => Ok(0.0),
                    Some(raw) => parse_length(raw).map_err(|_| AnnotationError::InvalidLength {
                        id: id.clone(),
                        attr: name,
                        value: raw.to_string(),
                    }),
                }
            };

            annotations.push(Annotation {
                kind: AnnotationKind::parse(kind.trim()),
                x: attr("x")?,
                y: attr("y")?,
                width: attr("width")?,
                height: attr("height")?,
                id: id.clone(),
            });
        }

        Ok(Self {
            width,
            height,
            annotations,
        })
    }

    pub fn load(path: &Path) -> Result<Self, AnnotationError> {
        let text = std::fs::read_to_string(path).map_err(|source| AnnotationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }
}

/// Plain number or `px` length. Other units are rejected.
fn parse_length(raw: &str) -> Result<f32, std::num::ParseFloatError> {
    let s = raw.trim();
    let s = s.strip_suffix("px").unwrap_or(s);
    s.trim().parse::<f32>()
}

fn parse_view_box(raw: &str) -> Option<(f32, f32, f32, f32)> {
    let mut parts = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<f32>());
    let vb = (
        parts.next()?.ok()?,
        parts.next()?.ok()?,
        parts.next()?.ok()?,
        parts.next()?.ok()?,
    );
    Some(vb)
}
