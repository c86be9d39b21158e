// camera.rs: perspective camera, pick rays and azimuth-only orbit controls

use crate::config::{CameraConfig, ControlsConfig};
use glam::{Vec2, Vec3};
use winit::dpi::{PhysicalPosition, PhysicalSize};

/// A ray in world space. `direction` is always normalised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_deg: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn new(config: &CameraConfig, size: PhysicalSize<u32>) -> Self {
        let aspect = if size.width > 0 && size.height > 0 {
            size.width as f32 / size.height as f32
        } else {
            1.0
        };
        Self {
            position: Vec3::new(0.0, 0.0, config.distance),
            target: Vec3::ZERO,
            fov_deg: config.fov_deg,
            aspect,
        }
    }

    /// Zero-sized viewports (minimised windows) keep the previous aspect.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.aspect = size.width as f32 / size.height as f32;
        }
    }

    /// Unit forward, right and up vectors of the view.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.position).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        (forward, right, up)
    }

    /// Half extents of the image plane at unit distance.
    pub fn half_extents(&self) -> Vec2 {
        let half_h = (self.fov_deg.to_radians() * 0.5).tan();
        Vec2::new(half_h * self.aspect, half_h)
    }

    /// Ray from the eye through a point in normalised device coordinates
    /// (x right, y up, both in -1..1).
    pub fn ray_through(&self, ndc: Vec2) -> Ray {
        let (forward, right, up) = self.basis();
        let half = self.half_extents();
        Ray::new(
            self.position,
            forward + right * (ndc.x * half.x) + up * (ndc.y * half.y),
        )
    }
}

/// Window pixel position to normalised device coordinates.
pub fn pointer_ndc(position: PhysicalPosition<f64>, size: PhysicalSize<u32>) -> Vec2 {
    if size.width == 0 || size.height == 0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        (position.x / size.width as f64 * 2.0 - 1.0) as f32,
        (-(position.y / size.height as f64) * 2.0 + 1.0) as f32,
    )
}

/// Orbit around the cylinder axis at a fixed distance and fixed polar angle,
/// so the only degree of freedom is the azimuth.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub enabled: bool,
    azimuth: f32,
    azimuth_delta: f32,
    distance: f32,
    rotate_speed: f32,
    enable_damping: bool,
    damping_factor: f32,
    last_drag: Option<PhysicalPosition<f64>>,
}

impl OrbitControls {
    pub fn new(controls: &ControlsConfig, camera: &Camera) -> Self {
        let offset = camera.position - camera.target;
        Self {
            enabled: true,
            azimuth: offset.x.atan2(offset.z),
            azimuth_delta: 0.0,
            distance: Vec2::new(offset.x, offset.z).length(),
            rotate_speed: controls.rotate_speed,
            enable_damping: controls.enable_damping,
            damping_factor: controls.damping_factor,
            last_drag: None,
        }
    }

    /// View heading in degrees, 0 at the initial facing direction, wrapped to 0..360.
    pub fn heading_deg(&self) -> f32 {
        self.azimuth.to_degrees().rem_euclid(360.0)
    }

    pub fn begin_drag(&mut self, position: PhysicalPosition<f64>) {
        if self.enabled {
            self.last_drag = Some(position);
        }
    }

    pub fn end_drag(&mut self) {
        self.last_drag = None;
    }

    /// Horizontal drag distance is scaled by the viewport height so one full
    /// viewport-height drag turns `2π * rotate_speed`.
    /// Disabling mid-drag ends the drag; it does not resume until the next press.
    pub fn drag_to(&mut self, position: PhysicalPosition<f64>, viewport_height: u32) {
        if !self.enabled {
            self.last_drag = None;
            return;
        }
        let Some(last) = self.last_drag else {
            return;
        };
        if viewport_height > 0 {
            let dx = (position.x - last.x) as f32;
            let angle =
                2.0 * std::f32::consts::PI * dx / viewport_height as f32 * self.rotate_speed;
            self.azimuth_delta -= angle;
        }
        self.last_drag = Some(position);
    }

    /// Advance one frame and write the result into the camera.
    /// Returns whether the camera moved noticeably.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let step = if self.enable_damping {
            let s = self.azimuth_delta * self.damping_factor;
            self.azimuth_delta *= 1.0 - self.damping_factor;
            s
        } else {
            let s = self.azimuth_delta;
            self.azimuth_delta = 0.0;
            s
        };
        self.azimuth += step;

        camera.position = camera.target
            + Vec3::new(
                self.distance * self.azimuth.sin(),
                0.0,
                self.distance * self.azimuth.cos(),
            );
        step.abs() > 1e-6
    }
}
