// projector.rs: flat annotation rectangle -> wedge on the panorama cylinder
//
// Image x is read as arc length around a cylinder of `radius`, so the source
// image is expected to be `2π * radius` units wide. Image y grows downward,
// scene y grows upward, and image row 0 is the top rim of the cylinder.

use crate::annotation::{Annotation, AnnotationKind};
use crate::config::PanoramaConfig;
use crate::hit_region::{HitRegion, RegionKind};
use std::f32::consts::PI;

/// Hit-regions sit this far inside the panorama shell so picking rays reach
/// them before the shell.
pub const HIT_REGION_INSET: f32 = 50.0;

/// Returns `None` for annotation kinds that have no hit-region.
/// Negative widths or heights are not rejected; the resulting wedge is empty.
pub fn project(annotation: &Annotation, pano: &PanoramaConfig) -> Option<HitRegion> {
    let kind = match annotation.kind {
        AnnotationKind::Item => RegionKind::Item,
        AnnotationKind::Panel => RegionKind::Panel,
        AnnotationKind::Other(_) => return None,
    };

    let Annotation {
        x, y, width, height, ..
    } = *annotation;

    let angular_start = (x + width / 2.0) / pano.radius + PI;
    let angular_span = width / pano.radius;

    // Both conventions are kept as authored; they agree numerically.
    let vertical_center = match kind {
        RegionKind::Item => -y + pano.height / 2.0 - height / 2.0,
        RegionKind::Panel => -y + (pano.height - height) / 2.0,
    };

    Some(HitRegion {
        id: annotation.id.clone(),
        kind,
        angular_start,
        angular_span,
        vertical_center,
        vertical_span: height,
        radius: pano.radius - HIT_REGION_INSET,
        ignore_hits: false,
    })
}
