/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub general: GeneralConfig,
    pub tuning: TuningConfig,
    pub scoring: ScoringConfig,
    pub audio: AudioConfig,
}

#[derive(Clone, Debug)]
pub struct GeneralConfig {
    pub tick_rate_ms: u64,
    /// 0 = derive a seed from the system clock per session.
    pub seed: u64,
}

/// Gameplay rates, distances, probabilities, and timers. All durations
/// are in simulation ticks.
#[derive(Clone, Debug)]
pub struct TuningConfig {
    pub player_speed: f32,
    pub climb_speed: f32,
    pub climb_ease: f32,
    pub ladder_snap_distance: f32,
    pub lives: u32,
    pub invincible_ticks: u32,
    pub respawn_clear_distance: f32,
    pub spray_charges: u32,
    pub spray_cooldown_ticks: u32,
    pub spray_range: f32,
    pub spray_band: f32,
    pub stun_ticks: u32,
    pub panel_fall_speed: f32,
    pub enemy_base_speed: f32,
    pub enemy_speed_per_level: f32,
    pub enemy_ladder_distance: f32,
    pub enemy_ladder_chance: f64,
    pub enemy_descend_chance: f64,
    pub chase_interval_ticks: u32,
    pub chase_bias_chance: f64,
    pub spawn_delay_base: u32,
    pub spawn_delay_step: u32,
    pub spawn_delay_min: u32,
    pub rebuild_delay_ticks: u32,
}

#[derive(Clone, Debug)]
pub struct ScoringConfig {
    pub section: u32,
    pub fall_trigger: u32,
    pub enemy_drop: u32,
    pub enemy_stun: u32,
    pub plate_complete: u32,
    pub level_clear_step: u32,
}

/// Playback volumes, passed explicitly wherever a cue is emitted.
#[derive(Clone, Debug)]
pub struct AudioConfig {
    pub note_volume: f32,
    pub chord_volume: f32,
    pub effect_volume: f32,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    tuning: TomlTuning,
    #[serde(default)]
    scoring: TomlScoring,
    #[serde(default)]
    audio: TomlAudio,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default)]
    seed: u64,
}

#[derive(Deserialize, Debug)]
struct TomlTuning {
    #[serde(default = "default_player_speed")]
    player_speed: f32,
    #[serde(default = "default_climb_speed")]
    climb_speed: f32,
    #[serde(default = "default_climb_ease")]
    climb_ease: f32,
    #[serde(default = "default_ladder_snap")]
    ladder_snap_distance: f32,
    #[serde(default = "default_lives")]
    lives: u32,
    #[serde(default = "default_invincible")]
    invincible_ticks: u32,
    #[serde(default = "default_respawn_clear")]
    respawn_clear_distance: f32,
    #[serde(default = "default_spray_charges")]
    spray_charges: u32,
    #[serde(default = "default_spray_cooldown")]
    spray_cooldown_ticks: u32,
    #[serde(default = "default_spray_range")]
    spray_range: f32,
    #[serde(default = "default_spray_band")]
    spray_band: f32,
    #[serde(default = "default_stun")]
    stun_ticks: u32,
    #[serde(default = "default_fall_speed")]
    panel_fall_speed: f32,
    #[serde(default = "default_enemy_base_speed")]
    enemy_base_speed: f32,
    #[serde(default = "default_enemy_speed_step")]
    enemy_speed_per_level: f32,
    #[serde(default = "default_enemy_ladder_distance")]
    enemy_ladder_distance: f32,
    #[serde(default = "default_enemy_ladder_chance")]
    enemy_ladder_chance: f64,
    #[serde(default = "default_enemy_descend_chance")]
    enemy_descend_chance: f64,
    #[serde(default = "default_chase_interval")]
    chase_interval_ticks: u32,
    #[serde(default = "default_chase_bias_chance")]
    chase_bias_chance: f64,
    #[serde(default = "default_spawn_delay_base")]
    spawn_delay_base: u32,
    #[serde(default = "default_spawn_delay_step")]
    spawn_delay_step: u32,
    #[serde(default = "default_spawn_delay_min")]
    spawn_delay_min: u32,
    #[serde(default = "default_rebuild_delay")]
    rebuild_delay_ticks: u32,
}

#[derive(Deserialize, Debug)]
struct TomlScoring {
    #[serde(default = "default_score_section")]
    section: u32,
    #[serde(default = "default_score_fall")]
    fall_trigger: u32,
    #[serde(default = "default_score_enemy_drop")]
    enemy_drop: u32,
    #[serde(default = "default_score_enemy_stun")]
    enemy_stun: u32,
    #[serde(default = "default_score_plate")]
    plate_complete: u32,
    #[serde(default = "default_score_level")]
    level_clear_step: u32,
}

#[derive(Deserialize, Debug)]
struct TomlAudio {
    #[serde(default = "default_note_volume")]
    note_volume: f32,
    #[serde(default = "default_chord_volume")]
    chord_volume: f32,
    #[serde(default = "default_effect_volume")]
    effect_volume: f32,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }             // ~60 ticks/s

fn default_player_speed() -> f32 { 2.5 }
fn default_climb_speed() -> f32 { 2.0 }
fn default_climb_ease() -> f32 { 0.2 }
fn default_ladder_snap() -> f32 { 100.0 }
fn default_lives() -> u32 { 3 }
fn default_invincible() -> u32 { 120 }           // ~2s safe window after respawn
fn default_respawn_clear() -> f32 { 200.0 }
fn default_spray_charges() -> u32 { 5 }
fn default_spray_cooldown() -> u32 { 30 }
fn default_spray_range() -> f32 { 100.0 }
fn default_spray_band() -> f32 { 30.0 }
fn default_stun() -> u32 { 90 }
fn default_fall_speed() -> f32 { 4.0 }
fn default_enemy_base_speed() -> f32 { 1.2 }
fn default_enemy_speed_step() -> f32 { 0.15 }
fn default_enemy_ladder_distance() -> f32 { 20.0 }
fn default_enemy_ladder_chance() -> f64 { 0.01 } // per tick, per enemy
fn default_enemy_descend_chance() -> f64 { 0.5 }
fn default_chase_interval() -> u32 { 60 }
fn default_chase_bias_chance() -> f64 { 0.7 }
fn default_spawn_delay_base() -> u32 { 180 }
fn default_spawn_delay_step() -> u32 { 20 }
fn default_spawn_delay_min() -> u32 { 60 }
fn default_rebuild_delay() -> u32 { 120 }        // ~2s level-clear pause

fn default_score_section() -> u32 { 10 }
fn default_score_fall() -> u32 { 50 }
fn default_score_enemy_drop() -> u32 { 100 }
fn default_score_enemy_stun() -> u32 { 50 }
fn default_score_plate() -> u32 { 500 }
fn default_score_level() -> u32 { 1000 }         // multiplied by the level cleared

fn default_note_volume() -> f32 { 0.5 }
fn default_chord_volume() -> f32 { 0.8 }
fn default_effect_volume() -> f32 { 0.3 }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            tick_rate_ms: default_tick_rate(),
            seed: 0,
        }
    }
}

impl Default for TomlTuning {
    fn default() -> Self {
        TomlTuning {
            player_speed: default_player_speed(),
            climb_speed: default_climb_speed(),
            climb_ease: default_climb_ease(),
            ladder_snap_distance: default_ladder_snap(),
            lives: default_lives(),
            invincible_ticks: default_invincible(),
            respawn_clear_distance: default_respawn_clear(),
            spray_charges: default_spray_charges(),
            spray_cooldown_ticks: default_spray_cooldown(),
            spray_range: default_spray_range(),
            spray_band: default_spray_band(),
            stun_ticks: default_stun(),
            panel_fall_speed: default_fall_speed(),
            enemy_base_speed: default_enemy_base_speed(),
            enemy_speed_per_level: default_enemy_speed_step(),
            enemy_ladder_distance: default_enemy_ladder_distance(),
            enemy_ladder_chance: default_enemy_ladder_chance(),
            enemy_descend_chance: default_enemy_descend_chance(),
            chase_interval_ticks: default_chase_interval(),
            chase_bias_chance: default_chase_bias_chance(),
            spawn_delay_base: default_spawn_delay_base(),
            spawn_delay_step: default_spawn_delay_step(),
            spawn_delay_min: default_spawn_delay_min(),
            rebuild_delay_ticks: default_rebuild_delay(),
        }
    }
}

impl Default for TomlScoring {
    fn default() -> Self {
        TomlScoring {
            section: default_score_section(),
            fall_trigger: default_score_fall(),
            enemy_drop: default_score_enemy_drop(),
            enemy_stun: default_score_enemy_stun(),
            plate_complete: default_score_plate(),
            level_clear_step: default_score_level(),
        }
    }
}

impl Default for TomlAudio {
    fn default() -> Self {
        TomlAudio {
            note_volume: default_note_volume(),
            chord_volume: default_chord_volume(),
            effect_volume: default_effect_volume(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        Self::from_toml(load_toml(&candidate_dirs()))
    }

    fn from_toml(toml_cfg: TomlConfig) -> Self {
        GameConfig {
            general: GeneralConfig {
                tick_rate_ms: toml_cfg.general.tick_rate_ms,
                seed: toml_cfg.general.seed,
            },
            tuning: TuningConfig {
                player_speed: toml_cfg.tuning.player_speed,
                climb_speed: toml_cfg.tuning.climb_speed,
                climb_ease: toml_cfg.tuning.climb_ease,
                ladder_snap_distance: toml_cfg.tuning.ladder_snap_distance,
                lives: toml_cfg.tuning.lives,
                invincible_ticks: toml_cfg.tuning.invincible_ticks,
                respawn_clear_distance: toml_cfg.tuning.respawn_clear_distance,
                spray_charges: toml_cfg.tuning.spray_charges,
                spray_cooldown_ticks: toml_cfg.tuning.spray_cooldown_ticks,
                spray_range: toml_cfg.tuning.spray_range,
                spray_band: toml_cfg.tuning.spray_band,
                stun_ticks: toml_cfg.tuning.stun_ticks,
                panel_fall_speed: toml_cfg.tuning.panel_fall_speed,
                enemy_base_speed: toml_cfg.tuning.enemy_base_speed,
                enemy_speed_per_level: toml_cfg.tuning.enemy_speed_per_level,
                enemy_ladder_distance: toml_cfg.tuning.enemy_ladder_distance,
                enemy_ladder_chance: toml_cfg.tuning.enemy_ladder_chance,
                enemy_descend_chance: toml_cfg.tuning.enemy_descend_chance,
                chase_interval_ticks: toml_cfg.tuning.chase_interval_ticks,
                chase_bias_chance: toml_cfg.tuning.chase_bias_chance,
                spawn_delay_base: toml_cfg.tuning.spawn_delay_base,
                spawn_delay_step: toml_cfg.tuning.spawn_delay_step,
                spawn_delay_min: toml_cfg.tuning.spawn_delay_min,
                rebuild_delay_ticks: toml_cfg.tuning.rebuild_delay_ticks,
            },
            scoring: ScoringConfig {
                section: toml_cfg.scoring.section,
                fall_trigger: toml_cfg.scoring.fall_trigger,
                enemy_drop: toml_cfg.scoring.enemy_drop,
                enemy_stun: toml_cfg.scoring.enemy_stun,
                plate_complete: toml_cfg.scoring.plate_complete,
                level_clear_step: toml_cfg.scoring.level_clear_step,
            },
            audio: AudioConfig {
                note_volume: toml_cfg.audio.note_volume,
                chord_volume: toml_cfg.audio.chord_volume,
                effect_volume: toml_cfg.audio.effect_volume,
            },
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default())
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so an installed binary still finds the config
        // sitting next to the real file.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
