/// GameSession: the complete snapshot of a running game.
///
/// ## Architecture
///
/// The session owns the arena geometry, every entity, the progression
/// counters, and the session RNG. `sim::step` drives it; the UI layer
/// only ever reads it. Config tables are cloned in at construction so
/// the simulation never reaches back out to the loader.
///
/// One seeded RNG stream lives here (`rng`). Every random decision in
/// a run draws from it in tick order, so replaying a seed replays the
/// run.

use crate::config::{AudioConfig, GameConfig, ScoringConfig, TuningConfig};
use crate::domain::entity::{Enemy, NotePanel, Plate, Player};
use crate::domain::layout::LevelLayout;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Playing,
    GameOver,
}

pub struct GameSession {
    // ── Arena ──
    pub layout: LevelLayout,

    // ── Entities ──
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub panels: Vec<NotePanel>,
    pub plates: Vec<Plate>,

    // ── Progression ──
    pub phase: Phase,
    pub score: u32,
    pub level: u32,
    pub tick: u64,

    // ── Scheduling ──
    /// Counts up each Playing tick; an enemy spawns when it passes the
    /// level's spawn delay (and the cap allows).
    pub spawn_timer: u32,
    /// Countdown to the next level build, armed on level clear.
    pub rebuild_in: Option<u32>,
    next_enemy_id: u32,

    // ── RNG ──
    pub seed: u64,
    pub rng: Pcg32,

    // ── Config tables consulted every tick ──
    pub tuning: TuningConfig,
    pub scoring: ScoringConfig,
    pub audio: AudioConfig,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
}

// ── Construction ──

impl GameSession {
    pub fn new(config: &GameConfig) -> Self {
        let seed = if config.general.seed != 0 {
            config.general.seed
        } else {
            clock_seed()
        };

        let layout = LevelLayout::standard();
        let player = Player::new(
            layout.platform(layout.bottom_index()),
            config.tuning.lives,
            config.tuning.spray_charges,
        );

        GameSession {
            layout,
            player,
            enemies: vec![],
            panels: vec![],
            plates: vec![],
            phase: Phase::Title,
            score: 0,
            level: 1,
            tick: 0,
            spawn_timer: 0,
            rebuild_in: None,
            next_enemy_id: 0,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            tuning: config.tuning.clone(),
            scoring: config.scoring.clone(),
            audio: config.audio.clone(),
            message: String::new(),
            message_timer: 0,
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }
}

// ── Entity lookups ──

impl GameSession {
    pub fn panel_mut(&mut self, id: u32) -> Option<&mut NotePanel> {
        self.panels.iter_mut().find(|p| p.id == id)
    }

    pub fn enemy_mut(&mut self, id: u32) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }
}

// ── Progression ──

impl GameSession {
    pub fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    #[inline]
    pub fn all_plates_complete(&self) -> bool {
        !self.plates.is_empty() && self.plates.iter().all(|p| p.complete)
    }

    pub fn alloc_enemy_id(&mut self) -> u32 {
        let id = self.next_enemy_id;
        self.next_enemy_id += 1;
        id
    }

    /// Concurrent enemy cap: grows every other level, tops out at five.
    #[inline]
    pub fn enemy_cap(&self) -> usize {
        (2 + self.level / 2).min(5) as usize
    }

    /// Ticks between enemy spawns: shrinks per level down to a floor.
    #[inline]
    pub fn spawn_delay(&self) -> u32 {
        let reduction = self.tuning.spawn_delay_step * self.level.saturating_sub(1);
        self.tuning
            .spawn_delay_base
            .saturating_sub(reduction)
            .max(self.tuning.spawn_delay_min)
    }
}

// ── Rebuild scheduling ──

impl GameSession {
    /// Arm the level-clear pause. The finished arena stays on screen
    /// until the countdown fires between ticks.
    pub fn schedule_rebuild(&mut self) {
        self.rebuild_in = Some(self.tuning.rebuild_delay_ticks.max(1));
    }

    /// Advance the rebuild countdown. Returns true exactly once, on the
    /// tick the rebuild becomes due.
    pub fn take_due_rebuild(&mut self) -> bool {
        if let Some(remaining) = self.rebuild_in {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                self.rebuild_in = None;
                return true;
            }
            self.rebuild_in = Some(remaining);
        }
        false
    }

    /// Terminal transition. Cancels any pending rebuild so a plate
    /// finished on the death tick cannot resurrect the run.
    pub fn enter_game_over(&mut self) {
        self.phase = Phase::GameOver;
        self.rebuild_in = None;
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}
