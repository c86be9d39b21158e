// main.rs: window, event loop and per-frame driver

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod annotation;
mod camera;
mod config;
mod error;
mod hit_region;
mod i18n;
mod interaction;
mod loader;
mod projector;
mod renderer;

use camera::{pointer_ndc, Camera, OrbitControls};
use clap::Parser;
use config::{Cli, PanoramaConfig, ViewerConfig};
use error::ViewerError;
use glam::Vec2;
use hit_region::HitRegionIndex;
use interaction::{InteractionController, SelectionEvent, SelectionState};
use loader::{AnnotationLoad, LoadEvent};
use renderer::Renderer;

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::Instant;

use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

const NOTIFICATION_HISTORY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageLoad {
    Pending,
    Ready,
    Failed,
}

/// Everything the status bar shows.
struct StatusView<'a> {
    image: ImageLoad,
    annotations: &'a AnnotationLoad,
    selection: &'a SelectionState,
    heading_deg: f32,
    orbit_locked: bool,
    notifications: &'a VecDeque<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), ViewerError> {
    let cli = Cli::parse();
    let config = ViewerConfig::load(&cli)?;
    i18n::init(&config.lang);
    log::info!(
        "panorama radius {} height {}, image {}, annotations {}",
        config.panorama.radius,
        config.panorama.height,
        config.assets.image.display(),
        config.assets.annotations.display()
    );

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(i18n::tr("app.title"))
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)?,
    );

    let mut camera = Camera::new(&config.camera, window.inner_size());
    let mut orbit = OrbitControls::new(&config.controls, &camera);
    let mut renderer = pollster::block_on(Renderer::new(&window, &camera, config.panorama))?;

    let (tx, rx) = channel();
    loader::spawn_panorama_load(config.assets.image.clone(), tx.clone());
    loader::spawn_annotation_load(
        config.assets.annotations.clone(),
        config.assets.load_retries,
        tx,
    );

    let mut image_load = ImageLoad::Pending;
    let mut annotation_load = AnnotationLoad::start(Instant::now(), config.assets.load_timeout());
    let mut index = HitRegionIndex::default();

    // Selection notifications reach the overlay through a channel so the
    // controller never borrows UI state.
    let mut controller = InteractionController::new();
    let (note_tx, note_rx) = channel();
    controller.subscribe(move |event: &SelectionEvent, _: &SelectionState| {
        let _ = note_tx.send(event.clone());
    });
    let mut notifications: VecDeque<String> = VecDeque::new();

    let mut pointer = Vec2::ZERO;
    let mut cursor = PhysicalPosition::new(0.0, 0.0);
    let mut shift_down = false;
    let mut is_fullscreen = false;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        drain_loads(
            &rx,
            &mut renderer,
            &mut image_load,
            &mut annotation_load,
            &mut index,
            &config.panorama,
        );
        if annotation_load.check_deadline(Instant::now()) {
            log::warn!(
                "annotations not loaded within {}s; continuing without hotspots",
                config.assets.load_timeout_secs
            );
        }

        match event {
            Event::WindowEvent { event, .. } => {
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    // camera and surface change together so the next frame is never stretched
                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        camera.resize(new_size);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        renderer.resize(*new_inner_size);
                        camera.resize(*new_inner_size);
                    }

                    WindowEvent::ModifiersChanged(modifiers) => {
                        shift_down = modifiers.shift();
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed
                            && input.virtual_keycode == Some(VirtualKeyCode::F11)
                        {
                            is_fullscreen = !is_fullscreen;
                            window.set_fullscreen(
                                is_fullscreen.then_some(Fullscreen::Borderless(None)),
                            );
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        cursor = position;
                        pointer = pointer_ndc(position, renderer.size);
                        orbit.drag_to(position, renderer.size.height);
                    }

                    WindowEvent::MouseInput { state, button, .. } => match state {
                        ElementState::Pressed => {
                            controller.pointer_down(&camera, pointer, &index);
                            if button == MouseButton::Left {
                                orbit.begin_drag(cursor);
                            }
                        }
                        ElementState::Released => {
                            if button == MouseButton::Left {
                                orbit.end_drag();
                            }
                        }
                    },

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                orbit.enabled = !shift_down;
                orbit.update(&mut camera);

                controller.update_panel_hover(&camera, &index);
                while let Ok(event) = note_rx.try_recv() {
                    if notifications.len() == NOTIFICATION_HISTORY {
                        notifications.pop_front();
                    }
                    notifications.push_back(describe(&event));
                }

                renderer.update_camera(&camera);
                let status = StatusView {
                    image: image_load,
                    annotations: &annotation_load,
                    selection: controller.state(),
                    heading_deg: orbit.heading_deg(),
                    orbit_locked: shift_down,
                    notifications: &notifications,
                };
                let render_result = renderer.render_with_ui(&window, |ctx| draw_ui(ctx, &status));

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("GPU out of memory, exiting");
                        *control_flow = ControlFlow::Exit;
                    }
                    Err(e) => log::warn!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            Event::LoopDestroyed => {
                controller.end_session();
            }

            _ => {}
        }
    })
}

/// Apply whatever the loader threads have finished since the last call.
fn drain_loads(
    rx: &Receiver<LoadEvent>,
    renderer: &mut Renderer,
    image_load: &mut ImageLoad,
    annotation_load: &mut AnnotationLoad,
    index: &mut HitRegionIndex,
    pano: &PanoramaConfig,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            LoadEvent::Panorama(rgba) => {
                renderer.load_panorama(rgba);
                *image_load = ImageLoad::Ready;
            }
            LoadEvent::PanoramaFailed(reason) => {
                log::error!("panorama unavailable: {reason}");
                *image_load = ImageLoad::Failed;
            }
            LoadEvent::Annotations(result) => {
                loader::apply_annotations(result, annotation_load, index, pano);
            }
        }
    }
}

fn describe(event: &SelectionEvent) -> String {
    match event {
        SelectionEvent::ItemActivated { id } => {
            i18n::tr_with("event.item_activated", &[("id", id.clone())])
        }
        SelectionEvent::ItemDeactivated { id } => {
            i18n::tr_with("event.item_deactivated", &[("id", id.clone())])
        }
        SelectionEvent::PanelChanged { current: Some(id), .. } => {
            i18n::tr_with("event.panel_on", &[("id", id.clone())])
        }
        SelectionEvent::PanelChanged {
            previous: Some(id),
            current: None,
        } => i18n::tr_with("event.panel_off", &[("id", id.clone())]),
        SelectionEvent::PanelChanged { .. } => String::new(),
        SelectionEvent::SessionEnded => i18n::tr("event.session_ended"),
    }
}

fn draw_ui(ctx: &egui::Context, status: &StatusView<'_>) {
    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            match status.image {
                ImageLoad::Pending => {
                    ui.label(
                        egui::RichText::new(i18n::tr("status.loading_image"))
                            .color(egui::Color32::YELLOW),
                    );
                    ui.label("|");
                }
                ImageLoad::Failed => {
                    ui.label(
                        egui::RichText::new(i18n::tr("status.image_failed"))
                            .color(egui::Color32::RED),
                    );
                    ui.label("|");
                }
                ImageLoad::Ready => {}
            }

            match status.annotations {
                AnnotationLoad::Pending { .. } => {
                    ui.label(
                        egui::RichText::new(i18n::tr("status.loading_annotations"))
                            .color(egui::Color32::YELLOW),
                    );
                }
                AnnotationLoad::Ready { regions } => {
                    ui.label(i18n::tr_with(
                        "status.annotations_ready",
                        &[("count", regions.to_string())],
                    ));
                }
                AnnotationLoad::Failed(reason) => {
                    ui.label(
                        egui::RichText::new(i18n::tr_with(
                            "status.annotations_failed",
                            &[("reason", reason.clone())],
                        ))
                        .color(egui::Color32::RED),
                    );
                }
                AnnotationLoad::TimedOut => {
                    ui.label(
                        egui::RichText::new(i18n::tr("status.annotations_timed_out"))
                            .color(egui::Color32::RED),
                    );
                }
            }
            ui.label("|");

            let none = i18n::tr("status.none");
            ui.label(format!(
                "{} {}",
                i18n::tr("status.panel"),
                status.selection.active_panel.as_deref().unwrap_or(&none)
            ));
            ui.label("|");
            let items = if status.selection.active_items.is_empty() {
                none.clone()
            } else {
                status.selection.active_items.join(", ")
            };
            ui.label(format!("{} {}", i18n::tr("status.items"), items));
            ui.label("|");
            ui.label(format!("{} {:.1}°", i18n::tr("status.heading"), status.heading_deg));

            if status.orbit_locked {
                ui.label("|");
                ui.label(
                    egui::RichText::new(i18n::tr("status.orbit_locked"))
                        .color(egui::Color32::LIGHT_BLUE),
                );
            }
        });

        if !status.notifications.is_empty() {
            ui.horizontal(|ui| {
                for note in status.notifications.iter().filter(|n| !n.is_empty()) {
                    ui.label(egui::RichText::new(note).color(egui::Color32::GREEN));
                }
            });
        }
    });
}
