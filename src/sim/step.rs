/// The step function: advances the session by one tick.
///
/// Processing order:
///   1. Due level rebuild (fires between ticks, replaces the arena)
///   2. Player motion (walk / climb / spray / section walking)
///   3. Enemy motion (patrol, chase bias, ladder hops, stun countdown)
///   4. Hazard resolution (player ↔ enemy contact; a death ends the tick)
///   5. Player timers (invincibility, spray cooldown)
///   6. Panel physics (fall, land, chain, rider release, delivery)
///   7. Progression (spawn scheduler)
///
/// A tick that kills the player short-circuits: nothing after hazard
/// resolution runs, so panels freeze mid-air for that tick and the
/// respawned player re-enters a consistent arena on the next one.

use rand::Rng;

use super::event::GameEvent;
use super::level;
use super::world::{GameSession, Phase};
use crate::domain::ai;
use crate::domain::entity::{
    EnemyState, Facing, HeldInput, NotePanel, PanelPhase, Traversal, VerticalDir, ENEMY_HEIGHT,
    ENEMY_WIDTH, PANEL_HEIGHT, PANEL_LAND_INSET, PANEL_WIDTH, PLAYER_HEIGHT, PLAYER_WIDTH,
};
use crate::domain::layout::{DELIVERY_Y, PLATE_WIDTH, PLATE_Y};
use crate::domain::physics::{self, FallContact};
use crate::domain::rules;

// ══════════════════════════════════════════════════════════════
// Main entry points
// ══════════════════════════════════════════════════════════════

/// Leave the title (or a finished run on a fresh session) and begin play.
pub fn start_game(s: &mut GameSession) {
    s.spawn_timer = 0;
    level::build_level(s);
}

pub fn step(s: &mut GameSession, input: HeldInput) -> Vec<GameEvent> {
    if s.phase != Phase::Playing {
        return vec![];
    }

    let mut events: Vec<GameEvent> = Vec::new();
    s.tick += 1;

    if s.message_timer > 0 {
        s.message_timer -= 1;
        if s.message_timer == 0 {
            s.message.clear();
        }
    }

    // The scheduled rebuild replaces the arena atomically between ticks;
    // the tick it fires on does nothing else.
    if s.take_due_rebuild() {
        level::build_level(s);
        events.push(GameEvent::LevelRebuilt { level: s.level });
        return events;
    }

    resolve_player(s, input, &mut events);
    resolve_enemies(s, &mut events);
    if resolve_hazard(s, &mut events) {
        return events;
    }
    resolve_timers(s);
    resolve_panels(s, &mut events);
    resolve_progression(s, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Player motion
// ══════════════════════════════════════════════════════════════

fn resolve_player(s: &mut GameSession, input: HeldInput, events: &mut Vec<GameEvent>) {
    match s.player.mode {
        Traversal::Grounded => move_grounded(s, input, events),
        Traversal::Climbing { ladder } => move_climbing(s, ladder, input),
    }

    if input.spray {
        try_spray(s, events);
    }
}

fn move_grounded(s: &mut GameSession, input: HeldInput, events: &mut Vec<GameEvent>) {
    // Climb entry takes priority over walking when a direction is
    // eligible; entering consumes the tick.
    if let Some(dir) = input.vertical() {
        if let Some(ladder) = rules::select_ladder(
            &s.layout,
            s.player.center_x(),
            s.player.platform,
            Some(dir),
            s.tuning.ladder_snap_distance,
        ) {
            s.player.mode = Traversal::Climbing { ladder };
            return;
        }
    }

    let platform = *s.layout.platform(s.player.platform);
    // Re-pin to the surface every grounded tick.
    s.player.y = platform.y - PLAYER_HEIGHT;

    if let Some(facing) = input.horizontal() {
        s.player.facing = facing;
        s.player.x += s.tuning.player_speed * facing.sign();
        s.player.x = platform.clamp_onto(s.player.x, PLAYER_WIDTH, 0.0);
        walk_sections(s, events);
    }
}

fn move_climbing(s: &mut GameSession, ladder_idx: usize, input: HeldInput) {
    // Horizontal input breaks the ladder lock immediately; the player
    // grounds onto whichever surface is vertically closest.
    if input.horizontal().is_some() {
        let platform_idx = s.layout.closest_platform_to(s.player.bottom_y());
        ground_onto(s, platform_idx);
        return;
    }

    let ladder = s.layout.ladders[ladder_idx];
    s.player.x = rules::ease_toward(
        s.player.x,
        rules::climb_target_x(&ladder),
        s.tuning.climb_ease,
    );

    match input.vertical() {
        Some(VerticalDir::Up) => {
            s.player.y -= s.tuning.climb_speed;
            // Tops out when the head crosses the upper surface; grounding
            // snaps the feet onto it.
            if s.player.y <= ladder.top_y() {
                ground_onto(s, ladder.from);
            }
        }
        Some(VerticalDir::Down) => {
            s.player.y += s.tuning.climb_speed;
            if s.player.bottom_y() >= ladder.bottom_y() {
                ground_onto(s, ladder.to);
            }
        }
        None => {}
    }
}

fn ground_onto(s: &mut GameSession, platform_idx: usize) {
    let platform = *s.layout.platform(platform_idx);
    s.player.platform = platform_idx;
    s.player.y = platform.y - PLAYER_HEIGHT;
    s.player.x = platform.clamp_onto(s.player.x, PLAYER_WIDTH, 0.0);
    s.player.mode = Traversal::Grounded;
}

/// Sample the player's center against idle panels on their platform and
/// mark newly entered sections. The fourth mark triggers the fall.
fn walk_sections(s: &mut GameSession, events: &mut Vec<GameEvent>) {
    let center = s.player.center_x();
    let platform = s.player.platform;
    let mut triggered: Vec<usize> = vec![];

    for i in 0..s.panels.len() {
        if !s.panels[i].is_idle() || s.panels[i].platform != platform {
            continue;
        }
        let section = match rules::section_index(s.panels[i].x, center) {
            Some(sec) => sec,
            None => continue,
        };
        if s.panels[i].mark_section(section) {
            s.award(s.scoring.section);
            let panel = &s.panels[i];
            events.push(GameEvent::NoteWalked {
                note: panel.note,
                volume: s.audio.note_volume,
                x: panel.x + (section as f32 + 0.5) * rules::SECTION_WIDTH,
                y: panel.y,
            });
            if s.panels[i].fully_walked() {
                triggered.push(i);
            }
        }
    }

    for idx in triggered {
        trigger_fall(s, idx, events);
    }
}

/// Idle → Falling: capture overlapping same-platform enemies as riders
/// and award the fall-trigger bonus. Used by both the walk trigger and
/// chain landings.
fn trigger_fall(s: &mut GameSession, idx: usize, events: &mut Vec<GameEvent>) {
    let riders = physics::capture_set(&s.enemies, &s.panels[idx]);
    let panel_id = s.panels[idx].id;

    for &enemy_id in &riders {
        if let Some(e) = s.enemy_mut(enemy_id) {
            e.state = EnemyState::Carried { panel: panel_id };
        }
        s.panels[idx].carried.push(enemy_id);
        events.push(GameEvent::EnemyCarried { id: enemy_id, panel: panel_id });
    }

    let panel = &mut s.panels[idx];
    panel.phase = PanelPhase::Falling;
    let (x, y) = (panel.x, panel.y);
    s.award(s.scoring.fall_trigger);
    events.push(GameEvent::PanelFalling { panel: panel_id, x, y });
}

fn try_spray(s: &mut GameSession, events: &mut Vec<GameEvent>) {
    if s.player.spray_cooldown > 0 || s.player.spray_charges == 0 {
        return;
    }
    s.player.spray_charges -= 1;
    s.player.spray_cooldown = s.tuning.spray_cooldown_ticks;
    events.push(GameEvent::SprayUsed {
        x: s.player.center_x(),
        y: s.player.y,
        facing: s.player.facing,
    });

    for i in 0..s.enemies.len() {
        if s.enemies[i].state != EnemyState::Patrolling {
            continue;
        }
        if physics::spray_hits(&s.player, &s.enemies[i], s.tuning.spray_range, s.tuning.spray_band)
        {
            s.enemies[i].state = EnemyState::Stunned { remaining: s.tuning.stun_ticks };
            let (id, x, y) = (s.enemies[i].id, s.enemies[i].x, s.enemies[i].y);
            s.award(s.scoring.enemy_stun);
            events.push(GameEvent::EnemyStunned { id, x, y });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Enemy motion
// ══════════════════════════════════════════════════════════════

fn resolve_enemies(s: &mut GameSession, _events: &mut Vec<GameEvent>) {
    for i in 0..s.enemies.len() {
        match s.enemies[i].state {
            EnemyState::Stunned { remaining } => {
                // Frozen through the whole duration; movement resumes
                // the tick after the countdown hits zero.
                let remaining = remaining.saturating_sub(1);
                s.enemies[i].state = if remaining == 0 {
                    EnemyState::Patrolling
                } else {
                    EnemyState::Stunned { remaining }
                };
                continue;
            }
            // Position driven by the carrying panel.
            EnemyState::Carried { .. } => continue,
            EnemyState::Patrolling => {}
        }

        // Periodic chase bias toward a same-platform player.
        s.enemies[i].chase_timer += 1;
        if s.enemies[i].chase_timer >= s.tuning.chase_interval_ticks {
            s.enemies[i].chase_timer = 0;
            if let Some(facing) = ai::chase_bias(
                &mut s.rng,
                s.tuning.chase_bias_chance,
                &s.enemies[i],
                &s.player,
            ) {
                s.enemies[i].facing = facing;
            }
        }

        // Rare ladder hop; a hop consumes the tick's movement.
        if s.rng.random_bool(s.tuning.enemy_ladder_chance) {
            if let Some(target) = ai::ladder_hop(
                &mut s.rng,
                &s.layout,
                s.enemies[i].center_x(),
                s.enemies[i].platform,
                s.tuning.enemy_ladder_distance,
                s.tuning.enemy_descend_chance,
            ) {
                let dest = *s.layout.platform(target);
                let e = &mut s.enemies[i];
                e.platform = target;
                e.y = dest.y - ENEMY_HEIGHT;
                e.x = dest.clamp_onto(e.x, ENEMY_WIDTH, 0.0);
                continue;
            }
        }

        // Patrol with span-edge bounce.
        let platform = *s.layout.platform(s.enemies[i].platform);
        let e = &mut s.enemies[i];
        e.x += e.speed * e.facing.sign();
        if e.x <= platform.x {
            e.x = platform.x;
            e.facing = Facing::Right;
        } else if e.x + ENEMY_WIDTH >= platform.right() {
            e.x = platform.right() - ENEMY_WIDTH;
            e.facing = Facing::Left;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Hazard
// ══════════════════════════════════════════════════════════════

/// Player ↔ enemy contact. Returns true when the player died and the
/// tick must end. Only a stun disarms an enemy; one riding a falling
/// panel kills on the way past.
fn resolve_hazard(s: &mut GameSession, events: &mut Vec<GameEvent>) -> bool {
    if s.player.is_invincible() {
        return false;
    }
    let hit = s
        .enemies
        .iter()
        .any(|e| !e.is_stunned() && physics::player_hits_enemy(&s.player, e));
    if !hit {
        return false;
    }

    s.player.lives = s.player.lives.saturating_sub(1);
    if s.player.lives == 0 {
        events.push(GameEvent::PlayerKilled { lives_left: 0 });
        events.push(GameEvent::GameOver { score: s.score, level: s.level });
        s.enter_game_over();
        return true;
    }

    events.push(GameEvent::PlayerKilled { lives_left: s.player.lives });
    s.set_message("OUCH!", 60);
    let bottom = *s.layout.platform(s.layout.bottom_index());
    s.player.respawn(&bottom, s.tuning.invincible_ticks);
    clear_near_respawn(s, events);
    true
}

/// Despawn every enemy within the clear distance of the respawn point,
/// stripping carry back-references so no panel keeps a dead rider.
fn clear_near_respawn(s: &mut GameSession, events: &mut Vec<GameEvent>) {
    let px = s.player.x;
    let radius = s.tuning.respawn_clear_distance;

    let removed: Vec<(u32, Option<u32>)> = s
        .enemies
        .iter()
        .filter(|e| physics::near_respawn(e.x, px, radius))
        .map(|e| (e.id, e.carried_by()))
        .collect();
    s.enemies.retain(|e| !physics::near_respawn(e.x, px, radius));

    for (id, carrier) in removed {
        if let Some(panel_id) = carrier {
            if let Some(panel) = s.panel_mut(panel_id) {
                panel.carried.retain(|&rider| rider != id);
            }
        }
        events.push(GameEvent::EnemyDespawned { id });
    }
}

// ══════════════════════════════════════════════════════════════
// Player timers
// ══════════════════════════════════════════════════════════════

fn resolve_timers(s: &mut GameSession) {
    if s.player.invincible > 0 {
        s.player.invincible -= 1;
    }
    if s.player.spray_cooldown > 0 {
        s.player.spray_cooldown -= 1;
    }
}

// ══════════════════════════════════════════════════════════════
// Panel physics
// ══════════════════════════════════════════════════════════════

fn resolve_panels(s: &mut GameSession, events: &mut Vec<GameEvent>) {
    for i in 0..s.panels.len() {
        if s.panels[i].phase != PanelPhase::Falling {
            continue;
        }

        s.panels[i].y += s.tuning.panel_fall_speed;
        carry_riders(s, i);

        if s.panels[i].bottom_y() >= DELIVERY_Y {
            resolve_delivery(s, i, events);
            continue;
        }

        match physics::fall_contact(&s.layout, &s.panels[i], &s.panels) {
            FallContact::PlateZone | FallContact::None => {}
            FallContact::Platform(idx) => land_on_platform(s, i, idx, events),
            FallContact::Panel(other_id) => land_on_panel(s, i, other_id, events),
        }
    }
}

/// Riders track the panel vertically while it falls.
fn carry_riders(s: &mut GameSession, idx: usize) {
    let y = s.panels[idx].y - ENEMY_HEIGHT;
    let riders = s.panels[idx].carried.clone();
    for id in riders {
        if let Some(e) = s.enemy_mut(id) {
            e.y = y;
        }
    }
}

fn land_on_platform(s: &mut GameSession, idx: usize, platform_idx: usize, events: &mut Vec<GameEvent>) {
    let platform = *s.layout.platform(platform_idx);
    let panel = &mut s.panels[idx];
    panel.platform = platform_idx;
    panel.y = NotePanel::rest_y(&platform);
    panel.x = platform.clamp_onto(panel.x, PANEL_WIDTH, PANEL_LAND_INSET);
    panel.phase = PanelPhase::Idle;
    panel.reset_sections();
    let panel_id = panel.id;

    release_riders(s, idx, platform_idx, events);
    events.push(GameEvent::PanelLanded { panel: panel_id, platform: platform_idx });
}

fn land_on_panel(s: &mut GameSession, idx: usize, other_id: u32, events: &mut Vec<GameEvent>) {
    let other_idx = match s.panels.iter().position(|p| p.id == other_id) {
        Some(i) => i,
        None => return,
    };
    let (other_platform, other_y, other_walked) = {
        let other = &s.panels[other_idx];
        (other.platform, other.y, other.fully_walked())
    };
    let platform = *s.layout.platform(other_platform);

    let panel = &mut s.panels[idx];
    panel.platform = other_platform;
    panel.y = other_y - PANEL_HEIGHT;
    panel.x = platform.clamp_onto(panel.x, PANEL_WIDTH, PANEL_LAND_INSET);
    panel.phase = PanelPhase::Idle;
    panel.reset_sections();
    let panel_id = panel.id;

    // Chain: a fully walked panel underneath is pushed into falling too,
    // one level per landing. Its capture runs while the riders above are
    // still flagged carried, so a dropped rider never boards the next link.
    if other_walked {
        trigger_fall(s, other_idx, events);
    }

    release_riders(s, idx, other_platform, events);
    events.push(GameEvent::PanelLanded { panel: panel_id, platform: other_platform });
}

/// Release every rider onto the landing platform with the drop bonus.
/// Riders despawned mid-carry are skipped; their reference is gone.
fn release_riders(s: &mut GameSession, idx: usize, platform_idx: usize, events: &mut Vec<GameEvent>) {
    let platform = *s.layout.platform(platform_idx);
    let riders = std::mem::take(&mut s.panels[idx].carried);

    for id in riders {
        match s.enemy_mut(id) {
            Some(e) => {
                e.state = EnemyState::Patrolling;
                e.platform = platform_idx;
                e.y = platform.y - ENEMY_HEIGHT;
                e.x = platform.clamp_onto(e.x, ENEMY_WIDTH, 0.0);
            }
            None => continue,
        }
        s.award(s.scoring.enemy_drop);
        events.push(GameEvent::EnemyDropped { id, platform: platform_idx });
    }
}

/// Riders on a panel that bottoms out fall off the structure and are
/// destroyed, still worth the drop bonus.
fn destroy_riders(s: &mut GameSession, idx: usize, events: &mut Vec<GameEvent>) {
    let riders = std::mem::take(&mut s.panels[idx].carried);
    for id in riders {
        let before = s.enemies.len();
        s.enemies.retain(|e| e.id != id);
        if s.enemies.len() < before {
            s.award(s.scoring.enemy_drop);
            events.push(GameEvent::EnemyDespawned { id });
        }
    }
}

fn resolve_delivery(s: &mut GameSession, idx: usize, events: &mut Vec<GameEvent>) {
    destroy_riders(s, idx, events);

    let plate_idx = s.panels[idx].plate;
    let overlap = {
        let panel = &s.panels[idx];
        let plate = &s.plates[plate_idx];
        (plate.center_x() - panel.center_x()).abs() < (PLATE_WIDTH + PANEL_WIDTH) / 2.0
    };

    if !overlap {
        let panel = &mut s.panels[idx];
        panel.phase = PanelPhase::Stranded;
        panel.y = PLATE_Y;
        events.push(GameEvent::PanelStranded { panel: panel.id });
        return;
    }

    let stack_y = s.plates[plate_idx].next_stack_y();
    let plate_center = s.plates[plate_idx].center_x();
    let panel = &mut s.panels[idx];
    panel.phase = PanelPhase::Delivered;
    panel.y = stack_y;
    panel.x = plate_center - PANEL_WIDTH / 2.0;
    let panel_id = panel.id;
    events.push(GameEvent::PanelDelivered { panel: panel_id, plate: plate_idx });

    if s.plates[plate_idx].accept(panel_id) {
        s.award(s.scoring.plate_complete);
        events.push(GameEvent::PlateCompleted {
            plate: plate_idx,
            volume: s.audio.chord_volume,
            x: plate_center,
            y: PLATE_Y,
        });

        if s.all_plates_complete() {
            let bonus = s.scoring.level_clear_step.saturating_mul(s.level);
            s.award(bonus);
            events.push(GameEvent::LevelCleared { level: s.level, bonus });
            s.set_message(&format!("HARMONY! LEVEL {} CLEAR", s.level), 120);
            s.level += 1;
            s.schedule_rebuild();
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Progression
// ══════════════════════════════════════════════════════════════

fn resolve_progression(s: &mut GameSession, events: &mut Vec<GameEvent>) {
    // The scheduler keeps counting through a pending rebuild; stragglers
    // spawned in the window are replaced along with everything else.
    s.spawn_timer += 1;
    if s.spawn_timer > s.spawn_delay() && s.enemies.len() < s.enemy_cap() {
        s.spawn_timer = 0;
        let (id, platform) = level::spawn_enemy(s);
        events.push(GameEvent::EnemySpawned { id, platform });
    }
}

// ══════════════════════════════════════════════════════════════
// Scenario tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::Enemy;
    use crate::domain::note::Note;

    fn playing(seed: u64) -> GameSession {
        let mut config = GameConfig::default();
        config.general.seed = seed;
        let mut s = GameSession::new(&config);
        start_game(&mut s);
        s
    }

    /// A playing session with the built entities stripped, for scenarios
    /// that construct their own.
    fn bare(seed: u64) -> GameSession {
        let mut s = playing(seed);
        s.enemies.clear();
        s.panels.clear();
        s
    }

    fn panel_on(s: &GameSession, id: u32, plate: usize, platform: usize, x: f32) -> NotePanel {
        NotePanel::new(id, Note::Do, plate, s.layout.platform(platform), x)
    }

    fn enemy_on(s: &GameSession, id: u32, platform: usize, x: f32) -> Enemy {
        Enemy::new(id, x, s.layout.platform(platform), 1.2, Facing::Left)
    }

    fn idle() -> HeldInput {
        HeldInput::default()
    }

    fn right() -> HeldInput {
        HeldInput { right: true, ..HeldInput::default() }
    }

    fn up_held() -> HeldInput {
        HeldInput { up: true, ..HeldInput::default() }
    }

    fn spraying() -> HeldInput {
        HeldInput { spray: true, ..HeldInput::default() }
    }

    fn has<F: Fn(&GameEvent) -> bool>(events: &[GameEvent], pred: F) -> bool {
        events.iter().any(|e| pred(e))
    }

    #[test]
    fn step_is_inert_outside_playing() {
        let mut config = GameConfig::default();
        config.general.seed = 1;
        let mut s = GameSession::new(&config);
        assert_eq!(s.phase, Phase::Title);
        let events = step(&mut s, right());
        assert!(events.is_empty());
        assert_eq!(s.tick, 0);
    }

    #[test]
    fn walking_marks_a_section_once() {
        let mut s = bare(2);
        let panel = panel_on(&s, 0, 0, 6, 400.0);
        s.panels.push(panel);
        s.player.x = 400.0; // center lands in the first section after one move

        let first = step(&mut s, right());
        let second = step(&mut s, right());

        assert!(has(&first, |e| matches!(e, GameEvent::NoteWalked { .. })));
        assert!(!has(&second, |e| matches!(e, GameEvent::NoteWalked { .. })));
        assert_eq!(s.score, s.scoring.section);
        assert_eq!(s.panels[0].walked, [true, false, false, false]);
    }

    #[test]
    fn fourth_section_triggers_the_fall() {
        let mut s = bare(3);
        let mut panel = panel_on(&s, 0, 0, 6, 300.0);
        panel.walked = [true, true, true, false];
        s.panels.push(panel);
        s.player.x = 390.0; // center moves into the last section

        let events = step(&mut s, right());

        assert!(has(&events, |e| matches!(e, GameEvent::PanelFalling { .. })));
        assert!(s.panels[0].fully_walked());
        assert_ne!(s.panels[0].phase, PanelPhase::Idle);
        assert_eq!(s.score, s.scoring.section + s.scoring.fall_trigger);
    }

    #[test]
    fn falling_panel_lands_reclamps_and_reidles() {
        let mut s = bare(4);
        let mut panel = panel_on(&s, 0, 0, 4, 300.0);
        panel.phase = PanelPhase::Falling;
        panel.walked = [true, false, false, false];
        panel.y = 381.0; // one fall step from the next surface at y=400
        s.panels.push(panel);

        let events = step(&mut s, idle());

        let p = &s.panels[0];
        assert_eq!(p.phase, PanelPhase::Idle);
        assert_eq!(p.platform, 5);
        assert_eq!(p.y, 400.0 - PANEL_HEIGHT - 5.0);
        assert_eq!(p.walked, [false; 4]);
        assert!(has(&events, |e| matches!(e, GameEvent::PanelLanded { platform: 5, .. })));
    }

    #[test]
    fn trigger_captures_riders_and_landing_releases_them() {
        let mut s = bare(5);
        let mut panel = panel_on(&s, 0, 0, 4, 300.0);
        panel.walked = [true, true, true, false];
        s.panels.push(panel);
        s.enemies.push(enemy_on(&s, 9, 4, 320.0));
        s.player.platform = 4;
        s.player.x = 390.0;
        s.player.y = s.layout.platform(4).y - PLAYER_HEIGHT;

        let events = step(&mut s, right());
        assert!(has(&events, |e| matches!(e, GameEvent::EnemyCarried { id: 9, .. })));
        assert_eq!(s.panels[0].carried, vec![9]);
        assert!(matches!(s.enemies[0].state, EnemyState::Carried { .. }));

        let mut landed = false;
        for _ in 0..40 {
            let events = step(&mut s, idle());
            if has(&events, |e| matches!(e, GameEvent::PanelLanded { .. })) {
                assert!(has(&events, |e| matches!(e, GameEvent::EnemyDropped { id: 9, .. })));
                landed = true;
                break;
            }
            // Rider tracks the panel while it falls.
            if s.panels[0].phase == PanelPhase::Falling {
                assert_eq!(s.enemies[0].y, s.panels[0].y - ENEMY_HEIGHT);
            }
        }
        assert!(landed);
        assert_eq!(s.enemies[0].state, EnemyState::Patrolling);
        assert_eq!(s.enemies[0].platform, 5);
        assert!(s.panels[0].carried.is_empty());
        assert_eq!(
            s.score,
            s.scoring.section + s.scoring.fall_trigger + s.scoring.enemy_drop
        );
    }

    #[test]
    fn chain_landing_pushes_fully_walked_panel() {
        let mut s = bare(6);
        let mut faller = panel_on(&s, 0, 0, 4, 310.0);
        faller.phase = PanelPhase::Falling;
        faller.y = 360.0;
        let mut struck = panel_on(&s, 1, 0, 5, 300.0);
        struck.walked = [true; 4];
        let struck_rest = struck.y;
        s.panels.push(faller);
        s.panels.push(struck);

        let events = step(&mut s, idle());

        assert_eq!(s.panels[0].phase, PanelPhase::Idle);
        assert_eq!(s.panels[0].platform, 5);
        assert_eq!(s.panels[0].y, struck_rest - PANEL_HEIGHT);
        assert_eq!(s.panels[1].phase, PanelPhase::Falling);
        assert!(has(&events, |e| matches!(e, GameEvent::PanelFalling { panel: 1, .. })));
        assert_eq!(s.score, s.scoring.fall_trigger);
    }

    #[test]
    fn chain_landing_drops_riders_exactly_once() {
        let mut s = bare(23);
        let mut faller = panel_on(&s, 0, 0, 4, 310.0);
        faller.phase = PanelPhase::Falling;
        faller.y = 360.0;
        faller.carried.push(9);
        let mut struck = panel_on(&s, 1, 0, 5, 300.0);
        struck.walked = [true; 4];
        s.panels.push(faller);
        s.panels.push(struck);
        let mut rider = enemy_on(&s, 9, 4, 320.0);
        rider.state = EnemyState::Carried { panel: 0 };
        rider.y = 360.0 - ENEMY_HEIGHT;
        s.enemies.push(rider);

        let events = step(&mut s, idle());

        // The struck panel chains without re-capturing the dropped rider.
        assert_eq!(s.panels[1].phase, PanelPhase::Falling);
        assert!(s.panels[1].carried.is_empty());
        assert_eq!(s.enemies[0].state, EnemyState::Patrolling);
        assert_eq!(s.enemies[0].platform, 5);
        let drops = events
            .iter()
            .filter(|e| matches!(e, GameEvent::EnemyDropped { .. }))
            .count();
        assert_eq!(drops, 1);
        assert_eq!(s.score, s.scoring.fall_trigger + s.scoring.enemy_drop);

        // The rest of the chain falls without it; one carry, one bonus.
        for _ in 0..40 {
            let events = step(&mut s, idle());
            assert!(!has(&events, |e| matches!(e, GameEvent::EnemyDropped { .. })));
        }
        assert_eq!(s.enemies.len(), 1);
    }

    #[test]
    fn stacking_on_a_partial_panel_does_not_chain() {
        let mut s = bare(7);
        let mut faller = panel_on(&s, 0, 0, 4, 310.0);
        faller.phase = PanelPhase::Falling;
        faller.y = 360.0;
        let mut under = panel_on(&s, 1, 0, 5, 300.0);
        under.walked = [true, false, true, false];
        s.panels.push(faller);
        s.panels.push(under);

        let events = step(&mut s, idle());

        assert_eq!(s.panels[0].phase, PanelPhase::Idle);
        assert_eq!(s.panels[1].phase, PanelPhase::Idle);
        assert_eq!(s.panels[1].walked, [true, false, true, false]);
        assert!(!has(&events, |e| matches!(e, GameEvent::PanelFalling { .. })));
        assert_eq!(s.score, 0);
    }

    #[test]
    fn delivery_stacks_onto_the_plate() {
        let mut s = bare(8);
        let mut panel = panel_on(&s, 5, 1, 6, 390.0); // centered over plate 1
        panel.phase = PanelPhase::Falling;
        panel.y = 640.0;
        s.panels.push(panel);

        let events = step(&mut s, idle());

        let p = &s.panels[0];
        assert_eq!(p.phase, PanelPhase::Delivered);
        assert_eq!(p.y, PLATE_Y - (PANEL_HEIGHT + 1.0));
        assert_eq!(p.center_x(), s.plates[1].center_x());
        assert_eq!(s.plates[1].notes, vec![5]);
        assert!(!s.plates[1].complete);
        assert!(has(&events, |e| matches!(e, GameEvent::PanelDelivered { plate: 1, .. })));
        assert_eq!(s.score, 0);
    }

    #[test]
    fn final_delivery_completes_the_plate_and_clears_the_level() {
        let mut s = bare(9);
        s.plates[1].complete = true;
        s.plates[2].complete = true;
        for dummy in 0..7 {
            assert!(!s.plates[0].accept(dummy));
        }
        let mut panel = panel_on(&s, 7, 0, 6, 160.0); // centered over plate 0
        panel.phase = PanelPhase::Falling;
        panel.y = 640.0;
        s.panels.push(panel);

        let events = step(&mut s, idle());

        assert!(s.plates[0].complete);
        assert!(has(&events, |e| matches!(e, GameEvent::PlateCompleted { plate: 0, .. })));
        assert!(has(&events, |e| matches!(e, GameEvent::LevelCleared { level: 1, bonus: 1000 })));
        assert_eq!(s.score, s.scoring.plate_complete + s.scoring.level_clear_step);
        assert_eq!(s.level, 2);
        assert!(s.rebuild_in.is_some());
    }

    #[test]
    fn missed_delivery_strands_without_score() {
        let mut s = bare(10);
        let mut panel = panel_on(&s, 0, 0, 6, 700.0); // far from plate 0
        panel.phase = PanelPhase::Falling;
        panel.y = 640.0;
        s.panels.push(panel);

        let events = step(&mut s, idle());

        assert_eq!(s.panels[0].phase, PanelPhase::Stranded);
        assert_eq!(s.panels[0].y, PLATE_Y);
        assert!(has(&events, |e| matches!(e, GameEvent::PanelStranded { .. })));
        assert!(s.plates[0].notes.is_empty());
        assert_eq!(s.score, 0);
    }

    #[test]
    fn bottoming_out_destroys_riders() {
        let mut s = bare(11);
        let mut panel = panel_on(&s, 0, 0, 6, 160.0);
        panel.phase = PanelPhase::Falling;
        panel.y = 640.0;
        panel.carried.push(4);
        s.panels.push(panel);
        let mut rider = enemy_on(&s, 4, 6, 170.0);
        rider.state = EnemyState::Carried { panel: 0 };
        s.enemies.push(rider);

        let events = step(&mut s, idle());

        assert!(s.enemies.is_empty());
        assert!(has(&events, |e| matches!(e, GameEvent::EnemyDespawned { id: 4 })));
        assert!(!has(&events, |e| matches!(e, GameEvent::EnemyDropped { .. })));
        assert_eq!(s.score, s.scoring.enemy_drop);
    }

    #[test]
    fn spray_stuns_only_in_the_forward_window() {
        let mut s = bare(12);
        s.player.x = 400.0;
        s.enemies.push(enemy_on(&s, 0, 6, 450.0)); // ahead, in range
        s.enemies.push(enemy_on(&s, 1, 6, 300.0)); // behind

        let events = step(&mut s, spraying());

        assert!(s.enemies[0].is_stunned());
        assert!(!s.enemies[1].is_stunned());
        assert!(has(&events, |e| matches!(e, GameEvent::SprayUsed { .. })));
        assert!(has(&events, |e| matches!(e, GameEvent::EnemyStunned { id: 0, .. })));
        assert_eq!(s.player.spray_charges, s.tuning.spray_charges - 1);
        assert!(s.player.spray_cooldown > 0);
        assert_eq!(s.score, s.scoring.enemy_stun);
    }

    #[test]
    fn spray_with_no_charges_is_inert() {
        let mut s = bare(13);
        s.player.spray_charges = 0;
        s.player.x = 400.0;
        s.enemies.push(enemy_on(&s, 0, 6, 450.0));

        let events = step(&mut s, spraying());

        assert!(!has(&events, |e| matches!(e, GameEvent::SprayUsed { .. })));
        assert!(!s.enemies[0].is_stunned());
        assert_eq!(s.player.spray_cooldown, 0);
        assert_eq!(s.score, 0);
    }

    #[test]
    fn stun_freezes_for_the_exact_duration() {
        let mut s = bare(14);
        let mut enemy = enemy_on(&s, 0, 2, 400.0);
        enemy.state = EnemyState::Stunned { remaining: 3 };
        s.enemies.push(enemy);
        let x0 = s.enemies[0].x;

        for _ in 0..3 {
            step(&mut s, idle());
            assert_eq!(s.enemies[0].x, x0);
        }
        assert_eq!(s.enemies[0].state, EnemyState::Patrolling);

        step(&mut s, idle());
        assert_ne!(s.enemies[0].x, x0);
    }

    #[test]
    fn collision_costs_a_life_and_clears_near_spawn() {
        let mut s = bare(15);
        s.enemies.push(enemy_on(&s, 0, 6, 110.0)); // overlapping the player
        s.enemies.push(enemy_on(&s, 1, 3, 250.0)); // inside the clear radius
        s.enemies.push(enemy_on(&s, 2, 6, 700.0)); // outside it
        let mut panel = panel_on(&s, 0, 0, 2, 400.0);
        panel.phase = PanelPhase::Falling;
        panel.y = 250.0;
        s.panels.push(panel);

        let events = step(&mut s, idle());

        assert_eq!(s.player.lives, 2);
        assert_eq!(s.player.invincible, s.tuning.invincible_ticks);
        assert_eq!(s.player.x, 100.0);
        assert!(has(&events, |e| matches!(e, GameEvent::PlayerKilled { lives_left: 2 })));
        assert_eq!(s.enemies.len(), 1);
        assert_eq!(s.enemies[0].id, 2);
        // The death ends the tick before panel physics runs.
        assert_eq!(s.panels[0].y, 250.0);
    }

    #[test]
    fn carried_enemy_contact_is_still_deadly() {
        let mut s = bare(22);
        let mut panel = panel_on(&s, 0, 0, 6, 90.0);
        panel.phase = PanelPhase::Falling;
        panel.y = 460.0; // sweeping past the player's body
        panel.carried.push(7);
        s.panels.push(panel);
        let mut rider = enemy_on(&s, 7, 6, 100.0);
        rider.state = EnemyState::Carried { panel: 0 };
        rider.y = 460.0 - ENEMY_HEIGHT;
        s.enemies.push(rider);

        let events = step(&mut s, idle());

        assert_eq!(s.player.lives, 2);
        assert!(has(&events, |e| matches!(e, GameEvent::PlayerKilled { lives_left: 2 })));
        // The respawn clear strips the rider out of the carry list too.
        assert!(s.enemies.is_empty());
        assert!(s.panels[0].carried.is_empty());
    }

    #[test]
    fn last_life_collision_is_terminal() {
        let mut s = bare(16);
        s.player.lives = 1;
        s.schedule_rebuild();
        s.enemies.push(enemy_on(&s, 0, 6, 110.0));

        let events = step(&mut s, idle());

        assert_eq!(s.phase, Phase::GameOver);
        assert_eq!(s.player.lives, 0);
        assert!(s.rebuild_in.is_none());
        assert!(has(&events, |e| matches!(e, GameEvent::GameOver { .. })));

        let tick = s.tick;
        assert!(step(&mut s, right()).is_empty());
        assert_eq!(s.tick, tick);
    }

    #[test]
    fn horizontal_input_breaks_the_climb_and_snaps_down() {
        let mut s = bare(17);
        let ladder_idx = s
            .layout
            .ladders
            .iter()
            .position(|l| l.from == 5 && l.to == 6)
            .unwrap();
        s.player.mode = Traversal::Climbing { ladder: ladder_idx };
        s.player.y = 390.0; // bottom edge closer to the upper surface

        step(&mut s, right());

        assert_eq!(s.player.mode, Traversal::Grounded);
        assert_eq!(s.player.platform, 5);
        assert_eq!(s.player.y, 400.0 - PLAYER_HEIGHT);
        let platform = s.layout.platform(5);
        assert!(s.player.x >= platform.x && s.player.x + PLAYER_WIDTH <= platform.right());
    }

    #[test]
    fn climbing_reaches_the_upper_platform() {
        let mut s = bare(18);
        let ladder_idx = s
            .layout
            .ladders
            .iter()
            .position(|l| l.from == 5 && l.to == 6)
            .unwrap();
        let ladder = s.layout.ladders[ladder_idx];
        s.player.x = rules::climb_target_x(&ladder);

        step(&mut s, up_held());
        assert_eq!(s.player.mode, Traversal::Climbing { ladder: ladder_idx });

        // At 2.0 per tick from y=430 the head crosses the surface at
        // y=400 on the 15th climb tick, not a body-height later.
        for _ in 0..14 {
            step(&mut s, up_held());
        }
        assert_eq!(s.player.mode, Traversal::Climbing { ladder: ladder_idx });

        step(&mut s, up_held());
        assert_eq!(s.player.mode, Traversal::Grounded);
        assert_eq!(s.player.platform, 5);
        assert_eq!(s.player.y, 400.0 - PLAYER_HEIGHT);
    }

    #[test]
    fn rebuild_swaps_the_arena_between_ticks() {
        let mut s = playing(19);
        s.score = 777;
        s.rebuild_in = Some(1);
        s.panels.clear();

        let events = step(&mut s, right());

        assert!(has(&events, |e| matches!(e, GameEvent::LevelRebuilt { .. })));
        assert_eq!(events.len(), 1);
        assert_eq!(s.panels.len(), 24);
        assert!(s.panels.iter().all(|p| p.is_idle()));
        assert_eq!(s.score, 777);
        assert_eq!(s.player.x, 100.0); // held input ignored on the swap tick
        assert_eq!(s.phase, Phase::Playing);
    }

    #[test]
    fn spawn_scheduler_honors_delay_and_cap() {
        let mut s = bare(20);
        s.spawn_timer = s.spawn_delay();

        let events = step(&mut s, idle());
        assert_eq!(s.enemies.len(), 1);
        assert!(has(&events, |e| matches!(e, GameEvent::EnemySpawned { .. })));
        assert_eq!(s.spawn_timer, 0);

        // At the cap the timer keeps running without spawning.
        let extra = enemy_on(&s, 99, 2, 600.0);
        s.enemies.push(extra);
        s.spawn_timer = 500;
        let events = step(&mut s, idle());
        assert!(!has(&events, |e| matches!(e, GameEvent::EnemySpawned { .. })));
        assert_eq!(s.enemies.len(), 2);
        assert_eq!(s.spawn_timer, 501);
    }

    #[test]
    fn spawner_keeps_running_through_the_rebuild_delay() {
        let mut s = bare(24);
        s.rebuild_in = Some(30);
        s.spawn_timer = s.spawn_delay();

        let events = step(&mut s, idle());

        assert_eq!(s.rebuild_in, Some(29));
        assert_eq!(s.enemies.len(), 1);
        assert!(has(&events, |e| matches!(e, GameEvent::EnemySpawned { .. })));
    }

    #[test]
    fn score_never_decreases_over_a_run() {
        let mut s = playing(21);
        let mut prev = s.score;
        for t in 0..600 {
            let input = if (t / 20) % 2 == 0 { right() } else {
                HeldInput { left: true, ..HeldInput::default() }
            };
            step(&mut s, input);
            assert!(s.score >= prev);
            prev = s.score;
        }
    }
}
