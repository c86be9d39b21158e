// interaction.rs: selection state and the two rules that change it
//
// Items toggle on pointer-down. The panel under the centre of the view is the
// active panel; it is re-evaluated every frame.

use crate::camera::Camera;
use crate::hit_region::HitRegionIndex;
use glam::Vec2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    /// Ids of toggled-on items, in activation order, without duplicates.
    pub active_items: Vec<String>,
    /// Id of the panel at the centre of the view, if any.
    pub active_panel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    ItemActivated { id: String },
    ItemDeactivated { id: String },
    PanelChanged {
        previous: Option<String>,
        current: Option<String>,
    },
    SessionEnded,
}

/// Receives every selection transition together with the state after it.
pub trait SelectionObserver {
    fn on_selection_change(&mut self, event: &SelectionEvent, state: &SelectionState);
}

impl<F> SelectionObserver for F
where
    F: FnMut(&SelectionEvent, &SelectionState),
{
    fn on_selection_change(&mut self, event: &SelectionEvent, state: &SelectionState) {
        self(event, state)
    }
}

#[derive(Default)]
pub struct InteractionController {
    state: SelectionState,
    observers: Vec<Box<dyn SelectionObserver>>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn subscribe(&mut self, observer: impl SelectionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Toggle the nearest item under `pointer` (NDC). Returns the event if the
    /// selection changed.
    pub fn pointer_down(
        &mut self,
        camera: &Camera,
        pointer: Vec2,
        index: &HitRegionIndex,
    ) -> Option<SelectionEvent> {
        let ray = camera.ray_through(pointer);
        let hit = index.nearest_item(&ray)?;
        if hit.region.ignore_hits {
            return None;
        }

        let id = &hit.region.id;
        let event = if let Some(pos) = self.state.active_items.iter().position(|i| i == id) {
            self.state.active_items.remove(pos);
            SelectionEvent::ItemDeactivated { id: id.clone() }
        } else {
            self.state.active_items.push(id.clone());
            SelectionEvent::ItemActivated { id: id.clone() }
        };
        self.notify(&event);
        Some(event)
    }

    /// Re-aim the active panel at whatever panel sits at the centre of the
    /// view. Only an actual change of panel is reported.
    pub fn update_panel_hover(
        &mut self,
        camera: &Camera,
        index: &HitRegionIndex,
    ) -> Option<SelectionEvent> {
        let ray = camera.ray_through(Vec2::ZERO);
        let current = index.nearest_panel(&ray).map(|hit| hit.region.id.clone());
        if current == self.state.active_panel {
            return None;
        }

        let previous = std::mem::replace(&mut self.state.active_panel, current.clone());
        let event = SelectionEvent::PanelChanged { previous, current };
        self.notify(&event);
        Some(event)
    }

    /// Clear all selection; called once when the viewer shuts down.
    pub fn end_session(&mut self) {
        self.state = SelectionState::default();
        self.notify(&SelectionEvent::SessionEnded);
    }

    fn notify(&mut self, event: &SelectionEvent) {
        match event {
            SelectionEvent::ItemActivated { id } => {
                log::info!("item `{id}` activated, active items: {:?}", self.state.active_items)
            }
            SelectionEvent::ItemDeactivated { id } => {
                log::info!("item `{id}` deactivated, active items: {:?}", self.state.active_items)
            }
            SelectionEvent::PanelChanged { previous, current } => {
                log::info!("active panel {previous:?} -> {current:?}")
            }
            SelectionEvent::SessionEnded => log::info!("selection session ended"),
        }
        for observer in &mut self.observers {
            observer.on_selection_change(event, &self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, AnnotationKind};
    use crate::config::{CameraConfig, PanoramaConfig};
    use crate::hit_region::{HitRegion, RegionKind};
    use std::cell::RefCell;
    use std::rc::Rc;
    use winit::dpi::PhysicalSize;

    fn annotation(id: &str, kind: AnnotationKind, x: f32, y: f32, w: f32, h: f32) -> Annotation {
        Annotation {
            id: id.to_string(),
            kind,
            x,
            y,
            width: w,
            height: h,
        }
    }

    fn camera() -> Camera {
        Camera::new(&CameraConfig::default(), PhysicalSize::new(800, 600))
    }

    /// The initial camera looks at image x = 0 (mod circumference), so
    /// rectangles straddling x = 0 sit at the centre of the view.
    fn scene() -> HitRegionIndex {
        let pano = PanoramaConfig::default();
        HitRegionIndex::build(
            &[
                annotation("p1", AnnotationKind::Item, -50.0, 771.5, 100.0, 100.0),
                annotation("p2", AnnotationKind::Item, 2000.0, 771.5, 100.0, 100.0),
                annotation("wall", AnnotationKind::Panel, -200.0, 621.5, 400.0, 400.0),
            ],
            &pano,
        )
    }

    type Recorded = Rc<RefCell<Vec<(SelectionEvent, SelectionState)>>>;

    fn recorder(controller: &mut InteractionController) -> Recorded {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        controller.subscribe(move |event: &SelectionEvent, state: &SelectionState| {
            sink.borrow_mut().push((event.clone(), state.clone()));
        });
        log
    }

    #[test]
    fn toggle_twice_restores_selection() {
        let index = scene();
        let cam = camera();
        let mut controller = InteractionController::new();

        let first = controller.pointer_down(&cam, Vec2::ZERO, &index);
        assert_eq!(first, Some(SelectionEvent::ItemActivated { id: "p1".into() }));
        assert_eq!(controller.state().active_items, vec!["p1".to_string()]);

        let second = controller.pointer_down(&cam, Vec2::ZERO, &index);
        assert_eq!(second, Some(SelectionEvent::ItemDeactivated { id: "p1".into() }));
        assert!(controller.state().active_items.is_empty());
    }

    #[test]
    fn toggle_preserves_order_of_other_items() {
        let mut controller = InteractionController::new();
        controller.state.active_items = vec!["a".into(), "p1".into(), "b".into()];
        let index = scene();

        controller.pointer_down(&camera(), Vec2::ZERO, &index);
        assert_eq!(controller.state().active_items, vec!["a".to_string(), "b".to_string()]);

        controller.pointer_down(&camera(), Vec2::ZERO, &index);
        assert_eq!(
            controller.state().active_items,
            vec!["a".to_string(), "b".to_string(), "p1".to_string()]
        );
    }

    #[test]
    fn miss_leaves_selection_untouched() {
        let index = scene();
        let mut controller = InteractionController::new();
        let events = recorder(&mut controller);
        controller.pointer_down(&camera(), Vec2::ZERO, &index);
        let before = controller.state().clone();

        // top-left corner looks above every region
        assert!(controller.pointer_down(&camera(), Vec2::new(-1.0, 1.0), &index).is_none());
        assert_eq!(controller.state(), &before);
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn empty_index_is_a_no_op() {
        let mut controller = InteractionController::new();
        let index = HitRegionIndex::default();
        assert!(controller.pointer_down(&camera(), Vec2::ZERO, &index).is_none());
        assert!(controller.update_panel_hover(&camera(), &index).is_none());
        assert_eq!(controller.state(), &SelectionState::default());
    }

    #[test]
    fn ignored_region_blocks_toggle() {
        let pano = PanoramaConfig::default();
        let mut index = scene();
        // a shell in front of everything, as if the panorama mesh were pickable
        let mut shell = HitRegion::panorama_shell(&pano, RegionKind::Item);
        shell.radius = 100.0;
        index.items.push(shell);

        let mut controller = InteractionController::new();
        assert!(controller.pointer_down(&camera(), Vec2::ZERO, &index).is_none());
        assert!(controller.state().active_items.is_empty());
    }

    #[test]
    fn multiple_items_can_be_active() {
        let index = scene();
        let mut cam = camera();
        let mut controller = InteractionController::new();
        controller.pointer_down(&cam, Vec2::ZERO, &index);

        // look straight at p2 from the axis
        let p2 = &index.items[1];
        cam.position = glam::Vec3::ZERO;
        let angle = p2.center_angle();
        cam.target = glam::Vec3::new(angle.sin(), 0.0, angle.cos());
        controller.pointer_down(&cam, Vec2::ZERO, &index);

        assert_eq!(controller.state().active_items, vec!["p1".to_string(), "p2".to_string()]);
    }

    #[test]
    fn panel_hover_follows_view_centre() {
        let index = scene();
        let mut cam = camera();
        let mut controller = InteractionController::new();
        let events = recorder(&mut controller);

        let event = controller.update_panel_hover(&cam, &index);
        assert_eq!(
            event,
            Some(SelectionEvent::PanelChanged {
                previous: None,
                current: Some("wall".into())
            })
        );
        assert_eq!(controller.state().active_panel.as_deref(), Some("wall"));

        // re-evaluating the same aim is not a transition
        assert!(controller.update_panel_hover(&cam, &index).is_none());

        // turn around
        cam.position = glam::Vec3::new(0.0, 0.0, -250.0);
        let event = controller.update_panel_hover(&cam, &index);
        assert_eq!(
            event,
            Some(SelectionEvent::PanelChanged {
                previous: Some("wall".into()),
                current: None
            })
        );
        assert_eq!(controller.state().active_panel, None);

        let seen = events.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1.active_panel.as_deref(), Some("wall"));
        assert_eq!(seen[1].1.active_panel, None);
    }

    #[test]
    fn panel_hover_ignores_pointer_position() {
        let index = scene();
        let mut controller = InteractionController::new();
        // clicking elsewhere does not move the panel aim
        controller.pointer_down(&camera(), Vec2::new(0.9, 0.9), &index);
        controller.update_panel_hover(&camera(), &index);
        assert_eq!(controller.state().active_panel.as_deref(), Some("wall"));
    }

    #[test]
    fn nearest_panel_wins() {
        let pano = PanoramaConfig::default();
        let mut index = scene();
        let mut inner = project_panel("inner", &pano);
        inner.radius = 800.0;
        index.panels.push(inner);

        let mut controller = InteractionController::new();
        controller.update_panel_hover(&camera(), &index);
        assert_eq!(controller.state().active_panel.as_deref(), Some("inner"));
    }

    fn project_panel(id: &str, pano: &PanoramaConfig) -> HitRegion {
        let a = annotation(id, AnnotationKind::Panel, -200.0, 621.5, 400.0, 400.0);
        crate::projector::project(&a, pano).unwrap()
    }

    #[test]
    fn observers_see_state_after_transition() {
        let index = scene();
        let mut controller = InteractionController::new();
        let events = recorder(&mut controller);

        controller.pointer_down(&camera(), Vec2::ZERO, &index);
        controller.end_session();

        let seen = events.borrow();
        assert_eq!(seen[0].0, SelectionEvent::ItemActivated { id: "p1".into() });
        assert_eq!(seen[0].1.active_items, vec!["p1".to_string()]);
        assert_eq!(seen[1].0, SelectionEvent::SessionEnded);
        assert_eq!(seen[1].1, SelectionState::default());
    }
}
