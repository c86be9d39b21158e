// hit_region.rs: invisible cylinder wedges used only for picking

use crate::annotation::Annotation;
use crate::camera::Ray;
use crate::config::PanoramaConfig;
use crate::projector::project;
use std::f32::consts::{PI, TAU};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Item,
    Panel,
}

/// An open, double-sided wedge of a vertical cylinder centred on the scene
/// axis. World angle is `atan2(x, z)`; the wedge covers
/// `-angular_start ± angular_span / 2` and `vertical_center ± vertical_span / 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRegion {
    pub id: String,
    pub kind: RegionKind,
    pub angular_start: f32,
    pub angular_span: f32,
    pub vertical_center: f32,
    pub vertical_span: f32,
    pub radius: f32,
    /// Set on background geometry that must never count as a pick.
    pub ignore_hits: bool,
}

impl HitRegion {
    /// The whole panorama shell as a region, flagged so picks on it are ignored.
    #[cfg(test)]
    pub fn panorama_shell(pano: &PanoramaConfig, kind: RegionKind) -> Self {
        Self {
            id: String::new(),
            kind,
            angular_start: 0.0,
            angular_span: TAU,
            vertical_center: 0.0,
            vertical_span: pano.height,
            radius: pano.radius,
            ignore_hits: true,
        }
    }

    pub fn center_angle(&self) -> f32 {
        -self.angular_start
    }

    pub fn top(&self) -> f32 {
        self.vertical_center + self.vertical_span / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.vertical_center - self.vertical_span / 2.0
    }

    fn contains_angle(&self, angle: f32) -> bool {
        let diff = wrap_angle(angle - self.center_angle());
        diff.abs() <= self.angular_span / 2.0
    }

    /// Distance along the ray to the first point on the wedge, if any.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let (o, d) = (ray.origin, ray.direction);

        // x^2 + z^2 = r^2
        let a = d.x * d.x + d.z * d.z;
        if a <= f32::EPSILON {
            return None;
        }
        let b = 2.0 * (o.x * d.x + o.z * d.z);
        let c = o.x * o.x + o.z * o.z - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_d = discriminant.sqrt();
        let t1 = (-b - sqrt_d) / (2.0 * a);
        let t2 = (-b + sqrt_d) / (2.0 * a);

        for t in [t1, t2] {
            if t < 0.0 {
                continue;
            }
            let hit = ray.at(t);
            if hit.y < self.bottom() || hit.y > self.top() {
                continue;
            }
            if !self.contains_angle(hit.x.atan2(hit.z)) {
                continue;
            }
            return Some(t);
        }
        None
    }
}

/// Wrap to (-π, π].
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub region: &'a HitRegion,
    pub distance: f32,
}

/// Nearest intersection among `regions`, whatever their flags.
pub fn nearest<'a>(regions: &'a [HitRegion], ray: &Ray) -> Option<Hit<'a>> {
    regions
        .iter()
        .filter_map(|region| {
            region
                .intersect(ray)
                .map(|distance| Hit { region, distance })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Item and panel regions, built once when the annotations arrive.
#[derive(Debug, Clone, Default)]
pub struct HitRegionIndex {
    pub items: Vec<HitRegion>,
    pub panels: Vec<HitRegion>,
}

impl HitRegionIndex {
    pub fn build(annotations: &[Annotation], pano: &PanoramaConfig) -> Self {
        let mut index = Self::default();
        for annotation in annotations {
            match project(annotation, pano) {
                Some(region) => match region.kind {
                    RegionKind::Item => index.items.push(region),
                    RegionKind::Panel => index.panels.push(region),
                },
                None => log::debug!(
                    "skipping annotation `{}` with kind {:?}",
                    annotation.id,
                    annotation.kind
                ),
            }
        }
        index
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.panels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len() + self.panels.len()
    }

    pub fn nearest_item(&self, ray: &Ray) -> Option<Hit<'_>> {
        nearest(&self.items, ray)
    }

    pub fn nearest_panel(&self, ray: &Ray) -> Option<Hit<'_>> {
        nearest(&self.panels, ray)
    }
}
