/// Level construction.
///
/// Every level runs on the same arena graph; difficulty comes from enemy
/// speed, spawn cadence, and the concurrent cap, all derived from the
/// level number. Building a level preserves score, lives, spray charges,
/// the level number, and the spawn timer; geometry and entities are made
/// fresh. All placement randomness draws from the session RNG in a fixed
/// order, so one seed reproduces one arrangement.

use rand::Rng;

use crate::domain::ai;
use crate::domain::entity::{
    Enemy, Facing, NotePanel, Plate, ENEMY_WIDTH, PANEL_SPAWN_INSET, PANEL_WIDTH,
};
use crate::domain::layout::{LevelLayout, PLATE_XS, PLATFORM_COUNT};
use crate::domain::note::Note;
use crate::sim::world::{GameSession, Phase};

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// (Re)build the arena for the session's current level and enter play.
pub fn build_level(s: &mut GameSession) {
    s.layout = LevelLayout::standard();

    s.plates = PLATE_XS.iter().map(|&x| Plate::new(x)).collect();

    place_panels(s);
    place_enemies(s);

    let bottom = *s.layout.platform(s.layout.bottom_index());
    s.player.respawn(&bottom, 0);
    s.phase = Phase::Playing;
    s.set_message(&format!("LEVEL {}", s.level), 90);
}

/// Platform index band enemies may appear on: slides down the arena as
/// levels advance, always three platforms wide.
pub fn spawn_band(level: u32) -> (usize, usize) {
    (level.min(3) as usize, (level + 2).min(5) as usize)
}

/// Place one enemy on a uniformly chosen band platform. Used by the
/// in-play spawn scheduler; initial placement at build spreads over the
/// band deterministically instead.
pub fn spawn_enemy(s: &mut GameSession) -> (u32, usize) {
    let (band_min, band_max) = spawn_band(s.level);
    let platform_idx = s.rng.random_range(band_min..=band_max);
    let platform = *s.layout.platform(platform_idx);
    let x = s.rng.random_range(platform.x..platform.right() - ENEMY_WIDTH);
    let facing = random_facing(s);
    let speed = ai::speed_for_level(
        s.tuning.enemy_base_speed,
        s.tuning.enemy_speed_per_level,
        s.level,
    );
    let id = s.alloc_enemy_id();
    s.enemies.push(Enemy::new(id, x, &platform, speed, facing));
    (id, platform_idx)
}

// ══════════════════════════════════════════════════════════════
// Placement
// ══════════════════════════════════════════════════════════════

/// One panel per scale degree per plate, each on a uniformly random
/// non-top platform, horizontally near its owning plate.
fn place_panels(s: &mut GameSession) {
    s.panels.clear();
    let mut next_id = 0u32;
    let centers: Vec<f32> = s.plates.iter().map(|p| p.center_x()).collect();

    for (plate_idx, &center) in centers.iter().enumerate() {
        for note in Note::SCALE {
            let platform_idx = s.rng.random_range(1..PLATFORM_COUNT);
            let jitter: f32 = s.rng.random_range(-20.0..20.0);
            let platform = *s.layout.platform(platform_idx);

            let base = center - PANEL_WIDTH / 2.0;
            let x = platform.clamp_onto(base + jitter, PANEL_WIDTH, PANEL_SPAWN_INSET);

            s.panels
                .push(NotePanel::new(next_id, note, plate_idx, &platform, x));
            next_id += 1;
        }
    }
}

/// Cap-many enemies spread across the spawn band, one band platform per
/// enemy in rotation, uniform x and patrol direction.
fn place_enemies(s: &mut GameSession) {
    s.enemies.clear();

    let (band_min, band_max) = spawn_band(s.level);
    let band_width = band_max - band_min + 1;
    let speed = ai::speed_for_level(
        s.tuning.enemy_base_speed,
        s.tuning.enemy_speed_per_level,
        s.level,
    );

    for i in 0..s.enemy_cap() {
        let platform = *s.layout.platform(band_min + i % band_width);
        let x = s.rng.random_range(platform.x..platform.right() - ENEMY_WIDTH);
        let facing = random_facing(s);
        let id = s.alloc_enemy_id();
        s.enemies.push(Enemy::new(id, x, &platform, speed, facing));
    }
}

fn random_facing(s: &mut GameSession) -> Facing {
    if s.rng.random_bool(0.5) {
        Facing::Left
    } else {
        Facing::Right
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
