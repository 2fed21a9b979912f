//! Scene configuration loaded from TOML
//!
//! Every emitter config starts from its `Default` and only the keys present
//! in its table are overridden. Integer and float values are accepted
//! interchangeably.

use crate::curves::Easing;
use crate::emitter::{BubbleConfig, MeteorConfig, ShootingStarConfig, VaporConfig};
use crate::lifecycle::LifecycleProfile;
use crate::spawn::{SpawnConfig, SpawnMode};
use glam::Vec3;
use skyglass_core::{BackdropMapping, Palette, Result, Rgb, SkyglassError};
use std::path::Path;

/// Complete configuration for one particle scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Seed every emitter derives its random stream from
    pub seed: u64,
    /// Visible world height at the bubble plane
    pub viewport_height: f32,
    pub backdrop: BackdropMapping,
    pub vapor: VaporConfig,
    pub meteors: MeteorConfig,
    pub shooting_stars: ShootingStarConfig,
    pub bubbles: BubbleConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_CAFE,
            viewport_height: 10.0,
            backdrop: BackdropMapping::default(),
            vapor: VaporConfig::default(),
            meteors: MeteorConfig::default(),
            shooting_stars: ShootingStarConfig::default(),
            bubbles: BubbleConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Parse a scene from TOML text. Missing tables keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let root: toml::value::Table = toml::from_str(text)?;
        let mut config = Self::default();

        if let Some(scene) = section(&root, "scene")? {
            if let Some(v) = scene.get("seed") {
                let seed = v
                    .as_integer()
                    .filter(|i| *i >= 0)
                    .ok_or_else(|| {
                        SkyglassError::invalid("scene.seed", "expected a non-negative integer")
                    })?;
                config.seed = seed as u64;
            }
            read_f32(scene, "viewport_height", &mut config.viewport_height);
        }
        if let Some(backdrop) = section(&root, "backdrop")? {
            config.backdrop = backdrop_from_toml(backdrop);
        }
        if let Some(vapor) = section(&root, "vapor")? {
            config.vapor = VaporConfig::from_toml(vapor);
        }
        if let Some(meteors) = section(&root, "meteors")? {
            config.meteors = MeteorConfig::from_toml(meteors);
        }
        if let Some(stars) = section(&root, "shooting_stars")? {
            config.shooting_stars = ShootingStarConfig::from_toml(stars);
        }

        let bubbles = section(&root, "bubbles")?;
        config.bubbles = bubbles.map(BubbleConfig::from_toml).unwrap_or_default();
        let bubble_viewport_set = bubbles.is_some_and(|t| t.contains_key("viewport_height"));
        if !bubble_viewport_set {
            config.bubbles.perspective.viewport_height = config.viewport_height;
        }

        Ok(config)
    }

    /// Read, parse and validate a scene file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        config.validate()?;
        log::info!("Loaded scene config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        SkyglassError::check_range("scene.viewport_height", self.viewport_height as f64, 0.1, 1.0e4)?;
        if self.backdrop.screen_width <= 0.0 || self.backdrop.world_width <= 0.0 {
            return Err(SkyglassError::invalid(
                "backdrop",
                "screen and world widths must be positive",
            ));
        }
        self.vapor.validate()?;
        self.meteors.validate()?;
        self.shooting_stars.validate()?;
        self.bubbles.validate()?;
        Ok(())
    }
}

fn section<'a>(root: &'a toml::value::Table, name: &str) -> Result<Option<&'a toml::value::Table>> {
    match root.get(name) {
        None => Ok(None),
        Some(v) => v
            .as_table()
            .map(Some)
            .ok_or_else(|| SkyglassError::invalid(name, "expected a table")),
    }
}

/// Backdrop mapping overrides from a `[backdrop]` table
pub fn backdrop_from_toml(table: &toml::value::Table) -> BackdropMapping {
    let mut map = BackdropMapping::default();
    read_f32(table, "screen_width", &mut map.screen_width);
    read_f32(table, "screen_height", &mut map.screen_height);
    read_f32(table, "horizon_y", &mut map.horizon_y);
    read_f32(table, "ground_y", &mut map.ground_y);
    read_f32(table, "world_width", &mut map.world_width);
    read_f32(table, "world_height", &mut map.world_height);
    read_f32(table, "ground_level", &mut map.ground_level);
    read_f32(table, "sky_ceiling", &mut map.sky_ceiling);
    read_f32(table, "height_scale", &mut map.height_scale);
    read_f32(table, "depth_far", &mut map.depth_far);
    read_f32(table, "depth_span", &mut map.depth_span);
    map
}

/// Spawn keys shared by every emitter table
pub fn read_spawn(table: &toml::value::Table, spawn: &mut SpawnConfig) {
    if let Some(mode) = table
        .get("spawn_mode")
        .and_then(|v| v.as_str())
        .and_then(SpawnMode::from_name)
    {
        spawn.mode = mode;
    }
    read_f32(table, "spawn_rate", &mut spawn.rate);
    read_f32(table, "burst_chance", &mut spawn.burst_chance);
    read_u32(table, "burst_min", &mut spawn.burst_min);
    read_u32(table, "burst_max", &mut spawn.burst_max);
    read_f32(table, "burst_stagger", &mut spawn.burst_stagger);
}

pub fn read_lifecycle(table: &toml::value::Table, profile: &mut LifecycleProfile) {
    read_f32(table, "spawn_threshold", &mut profile.spawn_threshold);
    read_f32(table, "fade_threshold", &mut profile.fade_threshold);
}

pub fn validate_spawn(section: &str, spawn: &SpawnConfig) -> Result<()> {
    SkyglassError::check_range(&format!("{section}.spawn_rate"), spawn.rate as f64, 0.0, 1.0e4)?;
    SkyglassError::check_range(&format!("{section}.burst_chance"), spawn.burst_chance as f64, 0.0, 1.0)?;
    SkyglassError::check_range(&format!("{section}.burst_stagger"), spawn.burst_stagger as f64, 0.0, 60.0)?;
    if spawn.burst_min > spawn.burst_max {
        return Err(SkyglassError::invalid(
            format!("{section}.burst_min"),
            format!("{} exceeds burst_max {}", spawn.burst_min, spawn.burst_max),
        ));
    }
    Ok(())
}

pub fn validate_lifecycle(section: &str, profile: &LifecycleProfile) -> Result<()> {
    SkyglassError::check_range(&format!("{section}.spawn_threshold"), profile.spawn_threshold as f64, 0.0, 1.0)?;
    SkyglassError::check_range(
        &format!("{section}.fade_threshold"),
        profile.fade_threshold as f64,
        profile.spawn_threshold as f64,
        1.0,
    )
}

/// `min <= max` with both finite
pub fn validate_span(field: &str, min: f32, max: f32) -> Result<()> {
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(SkyglassError::invalid(
            field,
            format!("invalid range {min}..{max}"),
        ));
    }
    Ok(())
}

pub fn validate_capacity(section: &str, capacity: usize) -> Result<()> {
    if capacity == 0 || capacity > MAX_CAPACITY {
        return Err(SkyglassError::invalid(
            format!("{section}.capacity"),
            format!("must be between 1 and {MAX_CAPACITY}"),
        ));
    }
    Ok(())
}

/// Upper bound on any single pool
pub const MAX_CAPACITY: usize = 10_000;

// ── TOML helpers (handle integer/float coercion) ──

pub fn toml_f32(v: &toml::Value, default: f32) -> f32 {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
        .unwrap_or(default)
}

pub fn toml_vec3(v: &toml::Value, default: Vec3) -> Vec3 {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 3 {
            return Vec3::new(
                toml_f32(&arr[0], default.x),
                toml_f32(&arr[1], default.y),
                toml_f32(&arr[2], default.z),
            );
        }
    }
    default
}

/// Palette from an array of hex integers or `"#rrggbb"` strings.
/// Unreadable entries are skipped; None when nothing usable remains.
pub fn toml_palette(v: &toml::Value) -> Option<Palette> {
    let colors: Vec<Rgb> = v
        .as_array()?
        .iter()
        .filter_map(|c| match c {
            toml::Value::Integer(i) => u32::try_from(*i).ok().map(Rgb::from_hex),
            toml::Value::String(s) => Rgb::parse_hex(s),
            _ => None,
        })
        .collect();
    if colors.is_empty() {
        None
    } else {
        Some(Palette::from_colors(colors))
    }
}

pub fn toml_color(v: &toml::Value) -> Option<Rgb> {
    match v {
        toml::Value::Integer(i) => u32::try_from(*i).ok().map(Rgb::from_hex),
        toml::Value::String(s) => Rgb::parse_hex(s),
        _ => None,
    }
}

pub fn read_f32(table: &toml::value::Table, key: &str, target: &mut f32) {
    if let Some(v) = table.get(key) {
        *target = toml_f32(v, *target);
    }
}

pub fn read_u32(table: &toml::value::Table, key: &str, target: &mut u32) {
    if let Some(i) = table.get(key).and_then(|v| v.as_integer()) {
        *target = i.clamp(0, u32::MAX as i64) as u32;
    }
}

pub fn read_usize(table: &toml::value::Table, key: &str, target: &mut usize) {
    if let Some(i) = table.get(key).and_then(|v| v.as_integer()) {
        *target = i.clamp(0, MAX_CAPACITY as i64) as usize;
    }
}

pub fn read_bool(table: &toml::value::Table, key: &str, target: &mut bool) {
    if let Some(b) = table.get(key).and_then(|v| v.as_bool()) {
        *target = b;
    }
}

pub fn read_vec3(table: &toml::value::Table, key: &str, target: &mut Vec3) {
    if let Some(v) = table.get(key) {
        *target = toml_vec3(v, *target);
    }
}

pub fn read_palette(table: &toml::value::Table, key: &str, target: &mut Palette) {
    if let Some(palette) = table.get(key).and_then(toml_palette) {
        *target = palette;
    }
}

pub fn read_color(table: &toml::value::Table, key: &str, target: &mut Rgb) {
    if let Some(color) = table.get(key).and_then(toml_color) {
        *target = color;
    }
}

pub fn read_easing(table: &toml::value::Table, key: &str, target: &mut Easing) {
    if let Some(easing) = table
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(Easing::from_name)
    {
        *target = easing;
    }
}
