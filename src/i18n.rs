// i18n.rs: runtime UI strings
//
// Built-in tables cover en / fr / de. A file assets/i18n/<lang>.json (next to
// the executable, then in the working directory) overrides individual keys.
// Lookup falls back to English, then to the key itself.

use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

const FALLBACK_LANG: &str = "en";

const EN: &[(&str, &str)] = &[
    ("app.title", "Panorama Hotspots"),
    ("status.loading_image", "Loading panorama..."),
    ("status.image_failed", "Panorama unavailable"),
    ("status.loading_annotations", "Loading hotspots..."),
    ("status.annotations_ready", "{count} hotspots"),
    ("status.annotations_failed", "Hotspots unavailable: {reason}"),
    ("status.annotations_timed_out", "Hotspots timed out"),
    ("status.panel", "Panel:"),
    ("status.items", "Selected:"),
    ("status.none", "none"),
    ("status.heading", "Heading:"),
    ("status.orbit_locked", "Orbit locked (Shift)"),
    ("event.item_activated", "Opened {id}"),
    ("event.item_deactivated", "Closed {id}"),
    ("event.panel_on", "Panel {id} on"),
    ("event.panel_off", "Panel {id} off"),
    ("event.session_ended", "Session ended"),
];

const FR: &[(&str, &str)] = &[
    ("app.title", "Panorama interactif"),
    ("status.loading_image", "Chargement du panorama..."),
    ("status.image_failed", "Panorama indisponible"),
    ("status.loading_annotations", "Chargement des zones..."),
    ("status.annotations_ready", "{count} zones"),
    ("status.annotations_failed", "Zones indisponibles : {reason}"),
    ("status.annotations_timed_out", "Délai dépassé pour les zones"),
    ("status.panel", "Panneau :"),
    ("status.items", "Sélection :"),
    ("status.none", "aucun"),
    ("status.heading", "Cap :"),
    ("status.orbit_locked", "Rotation bloquée (Maj)"),
    ("event.item_activated", "{id} ouvert"),
    ("event.item_deactivated", "{id} fermé"),
    ("event.panel_on", "Panneau {id} allumé"),
    ("event.panel_off", "Panneau {id} éteint"),
    ("event.session_ended", "Session terminée"),
];

const DE: &[(&str, &str)] = &[
    ("app.title", "Panorama mit Hotspots"),
    ("status.loading_image", "Panorama wird geladen..."),
    ("status.image_failed", "Panorama nicht verfügbar"),
    ("status.loading_annotations", "Hotspots werden geladen..."),
    ("status.annotations_ready", "{count} Hotspots"),
    ("status.annotations_failed", "Hotspots nicht verfügbar: {reason}"),
    ("status.annotations_timed_out", "Zeitüberschreitung bei Hotspots"),
    ("status.panel", "Tafel:"),
    ("status.items", "Ausgewählt:"),
    ("status.none", "keine"),
    ("status.heading", "Richtung:"),
    ("status.orbit_locked", "Drehen gesperrt (Umschalt)"),
    ("event.item_activated", "{id} geöffnet"),
    ("event.item_deactivated", "{id} geschlossen"),
    ("event.panel_on", "Tafel {id} an"),
    ("event.panel_off", "Tafel {id} aus"),
    ("event.session_ended", "Sitzung beendet"),
];

#[derive(Debug, Clone)]
struct Strings {
    map: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

static STRINGS: OnceCell<RwLock<Strings>> = OnceCell::new();

fn builtin(lang: &str) -> Option<&'static [(&'static str, &'static str)]> {
    // "fr-CA" -> "fr"
    let base = lang.split(['-', '_']).next().unwrap_or(lang);
    match base {
        "en" => Some(EN),
        "fr" => Some(FR),
        "de" => Some(DE),
        _ => None,
    }
}

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn find_override_file(lang: &str) -> Option<PathBuf> {
    let file = format!("{lang}.json");
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    exe_dir
        .into_iter()
        .chain(std::iter::once(PathBuf::new()))
        .map(|dir| dir.join("assets").join("i18n").join(&file))
        .find(|p| p.exists())
}

fn load_overrides(path: &Path) -> Option<HashMap<String, String>> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(map) => Some(map),
        Err(e) => {
            log::warn!("ignoring malformed translation file {}: {e}", path.display());
            None
        }
    }
}

fn strings_for(lang: &str) -> HashMap<String, String> {
    let mut map = match builtin(lang) {
        Some(entries) => table(entries),
        None => {
            log::warn!("no built-in strings for language `{lang}`, using {FALLBACK_LANG}");
            HashMap::new()
        }
    };
    if let Some(overrides) = find_override_file(lang).and_then(|p| load_overrides(&p)) {
        map.extend(overrides);
    }
    map
}

/// Select the UI language. Later calls replace the active tables.
pub fn init(lang: &str) {
    let strings = Strings {
        map: strings_for(lang),
        fallback: table(EN),
    };

    if let Some(lock) = STRINGS.get() {
        if let Ok(mut w) = lock.write() {
            *w = strings;
        }
    } else {
        let _ = STRINGS.set(RwLock::new(strings));
    }
}

/// Localised text for `key`; the key itself if nothing matches.
pub fn tr(key: &str) -> String {
    let Some(strings) = STRINGS.get().and_then(|l| l.read().ok()) else {
        return EN
            .iter()
            .find(|(k, _)| *k == key)
            .map_or_else(|| key.to_string(), |(_, v)| v.to_string());
    };

    strings
        .map
        .get(key)
        .or_else(|| strings.fallback.get(key))
        .cloned()
        .unwrap_or_else(|| key.to_string())
}

/// `tr` with `{name}` placeholders substituted. Unknown placeholders stay.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    let mut s = tr(key);
    for (k, v) in args {
        s = s.replace(&format!("{{{k}}}"), v);
    }
    s
}
