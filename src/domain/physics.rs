/// Contact layer: single source of truth for overlap geometry.
///
/// Two distinct concepts:
///   1. HAZARD: player vs enemy bounding boxes, once per tick
///   2. FALL CONTACT: what a falling panel meets beneath it
///
/// Fall contacts resolve in strict priority order each tick:
/// plate zone, then platforms, then other panels. The queries here are
/// pure; the step layer applies the outcome.

use super::entity::{
    Enemy, Facing, NotePanel, Player, ENEMY_HEIGHT, ENEMY_WIDTH, PANEL_WIDTH, PLAYER_HEIGHT,
    PLAYER_WIDTH,
};
use super::layout::{LevelLayout, PLATE_ZONE_Y};

/// Axis-aligned overlap via center distance against summed half-extents.
/// Touching edges do not overlap.
#[inline]
pub fn aabb_overlap(
    ax: f32, ay: f32, aw: f32, ah: f32,
    bx: f32, by: f32, bw: f32, bh: f32,
) -> bool {
    let dx = (ax + aw / 2.0) - (bx + bw / 2.0);
    let dy = (ay + ah / 2.0) - (by + bh / 2.0);
    dx.abs() < (aw + bw) / 2.0 && dy.abs() < (ah + bh) / 2.0
}

/// The lethal-touch test.
#[inline]
pub fn player_hits_enemy(player: &Player, enemy: &Enemy) -> bool {
    aabb_overlap(
        player.x, player.y, PLAYER_WIDTH, PLAYER_HEIGHT,
        enemy.x, enemy.y, ENEMY_WIDTH, ENEMY_HEIGHT,
    )
}

/// What a falling panel has reached this tick, if anything.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FallContact {
    /// Below the plate zone line: resolves against the owning plate.
    PlateZone,
    /// Surface of the platform with this index.
    Platform(usize),
    /// Top of the idle panel with this id.
    Panel(u32),
    None,
}

pub fn fall_contact(layout: &LevelLayout, faller: &NotePanel, panels: &[NotePanel]) -> FallContact {
    if faller.bottom_y() >= PLATE_ZONE_Y {
        return FallContact::PlateZone;
    }
    if let Some(index) = platform_landing(layout, faller) {
        return FallContact::Platform(index);
    }
    if let Some(id) = panel_landing(panels, faller) {
        return FallContact::Panel(id);
    }
    FallContact::None
}

/// First platform strictly below the faller's last known platform whose
/// surface the faller's bottom edge has reached, scanning top-down.
/// Horizontal position is not consulted; landing re-clamps it instead.
pub fn platform_landing(layout: &LevelLayout, faller: &NotePanel) -> Option<usize> {
    layout
        .platforms
        .iter()
        .skip(faller.platform + 1)
        .find(|p| faller.bottom_y() >= p.y)
        .map(|p| p.index)
}

/// Topmost idle panel on a deeper platform whose top the faller's bottom
/// edge has reached, within half a panel width horizontally.
pub fn panel_landing(panels: &[NotePanel], faller: &NotePanel) -> Option<u32> {
    panels
        .iter()
        .filter(|other| {
            other.id != faller.id
                && other.is_idle()
                && other.platform > faller.platform
                && faller.bottom_y() >= other.y
                && (faller.x - other.x).abs() < PANEL_WIDTH / 2.0
        })
        .min_by(|a, b| a.y.total_cmp(&b.y))
        .map(|other| other.id)
}

/// Enemies a newly falling panel scoops up: on the same platform, not
/// already carried, horizontally intersecting the panel span.
pub fn capture_set(enemies: &[Enemy], panel: &NotePanel) -> Vec<u32> {
    enemies
        .iter()
        .filter(|e| {
            e.carried_by().is_none()
                && e.platform == panel.platform
                && e.x + ENEMY_WIDTH > panel.x
                && e.x < panel.x + PANEL_WIDTH
        })
        .map(|e| e.id)
        .collect()
}

/// Forward spray window: strictly ahead of the player's center within
/// `range`, and within `band` vertically (top edges compared). An enemy
/// dead on the centerline counts as neither ahead nor behind.
pub fn spray_hits(player: &Player, enemy: &Enemy, range: f32, band: f32) -> bool {
    let dx = enemy.center_x() - player.center_x();
    let dy = (enemy.y - player.y).abs();
    if dy >= band {
        return false;
    }
    match player.facing {
        Facing::Right => dx > 0.0 && dx < range,
        Facing::Left => dx < 0.0 && dx > -range,
    }
}

/// Respawn proximity clear: horizontal distance between left edges.
#[inline]
pub fn near_respawn(enemy_x: f32, player_x: f32, radius: f32) -> bool {
    (enemy_x - player_x).abs() <= radius
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{EnemyState, Facing, PanelPhase, PANEL_HEIGHT};
    use crate::domain::layout::LevelLayout;
    use crate::domain::note::Note;

    fn layout() -> LevelLayout {
        LevelLayout::standard()
    }

    fn panel_at(id: u32, platform: usize, x: f32, y: f32) -> NotePanel {
        let layout = layout();
        let mut p = NotePanel::new(id, Note::Do, 0, layout.platform(platform), x);
        p.y = y;
        p
    }

    fn enemy_at(id: u32, platform: usize, x: f32) -> Enemy {
        let layout = layout();
        Enemy::new(id, x, layout.platform(platform), 1.2, Facing::Right)
    }

    fn player_at(x: f32, y: f32, facing: Facing) -> Player {
        let layout = layout();
        let mut pl = Player::new(layout.platform(6), 3, 5);
        pl.x = x;
        pl.y = y;
        pl.facing = facing;
        pl
    }

    // ── aabb ──

    #[test]
    fn aabb_overlap_and_touching_edges() {
        assert!(aabb_overlap(0.0, 0.0, 10.0, 10.0, 5.0, 5.0, 10.0, 10.0));
        // Edge contact is not overlap.
        assert!(!aabb_overlap(0.0, 0.0, 10.0, 10.0, 10.0, 0.0, 10.0, 10.0));
        assert!(!aabb_overlap(0.0, 0.0, 10.0, 10.0, 0.0, 10.0, 10.0, 10.0));
        assert!(!aabb_overlap(0.0, 0.0, 10.0, 10.0, 50.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn hazard_requires_overlap_on_both_axes() {
        let player = player_at(100.0, 430.0, Facing::Right);
        let mut enemy = enemy_at(0, 6, 102.0);
        assert!(player_hits_enemy(&player, &enemy));
        enemy.y -= 200.0; // same column, far above
        assert!(!player_hits_enemy(&player, &enemy));
    }

    // ── platform landing ──

    #[test]
    fn platform_landing_takes_first_surface_below() {
        let layout = layout();
        // Started on platform 2 (y=190); bottom edge past platform 3's
        // surface (y=260) but short of platform 4 (y=330).
        let p = panel_at(0, 2, 300.0, 260.0 - PANEL_HEIGHT + 1.0);
        assert_eq!(platform_landing(&layout, &p), Some(3));
        // Not yet reached anything.
        let p = panel_at(0, 2, 300.0, 200.0);
        assert_eq!(platform_landing(&layout, &p), None);
        // Platforms at or above the faller's own index never match.
        let p = panel_at(0, 6, 300.0, 470.0);
        assert_eq!(platform_landing(&layout, &p), None);
    }

    // ── panel landing ──

    #[test]
    fn panel_landing_needs_half_width_alignment() {
        let faller = panel_at(0, 2, 300.0, 400.0);
        let below_near = panel_at(1, 5, 340.0, 379.0);
        let below_far = panel_at(2, 5, 365.0, 379.0);
        assert_eq!(panel_landing(&[below_near.clone()], &faller), Some(1));
        // 65 >= half width (60): no contact.
        assert_eq!(panel_landing(&[below_far], &faller), None);
        assert_eq!(panel_landing(&[below_near], &faller), Some(1));
    }

    #[test]
    fn panel_landing_prefers_topmost_and_skips_non_idle() {
        let faller = panel_at(0, 1, 300.0, 460.0);
        let upper = panel_at(1, 4, 300.0, 309.0);
        let lower = panel_at(2, 5, 300.0, 379.0);
        let mut falling = panel_at(3, 3, 300.0, 300.0);
        falling.phase = PanelPhase::Falling;
        let panels = vec![lower, upper, falling];
        assert_eq!(panel_landing(&panels, &faller), Some(1));
    }

    #[test]
    fn panel_landing_ignores_self_and_shallower_panels() {
        let faller = panel_at(7, 3, 300.0, 400.0);
        let same_platform = panel_at(8, 3, 300.0, 330.0);
        let shallower = panel_at(9, 1, 300.0, 120.0);
        assert_eq!(panel_landing(&[faller.clone(), same_platform, shallower], &faller), None);
    }

    // ── capture ──

    #[test]
    fn capture_set_takes_same_platform_intersectors() {
        let panel = panel_at(0, 3, 300.0, 239.0);
        let on_panel = enemy_at(1, 3, 350.0);
        let off_to_side = enemy_at(2, 3, 300.0 + PANEL_WIDTH + 1.0);
        let touching_edge = enemy_at(3, 3, 300.0 - ENEMY_WIDTH); // edge contact only
        let other_platform = enemy_at(4, 4, 350.0);
        let mut already_carried = enemy_at(5, 3, 360.0);
        already_carried.state = EnemyState::Carried { panel: 99 };
        let enemies = vec![on_panel, off_to_side, touching_edge, other_platform, already_carried];
        assert_eq!(capture_set(&enemies, &panel), vec![1]);
    }

    #[test]
    fn capture_set_includes_stunned() {
        let panel = panel_at(0, 3, 300.0, 239.0);
        let mut stunned = enemy_at(1, 3, 350.0);
        stunned.state = EnemyState::Stunned { remaining: 40 };
        assert_eq!(capture_set(&[stunned], &panel), vec![1]);
    }

    // ── spray ──

    #[test]
    fn spray_window_is_forward_only() {
        let player = player_at(400.0, 430.0, Facing::Right);
        let ahead = enemy_at(0, 6, 450.0);
        let behind = enemy_at(1, 6, 340.0);
        assert!(spray_hits(&player, &ahead, 100.0, 30.0));
        assert!(!spray_hits(&player, &behind, 100.0, 30.0));

        let player = player_at(400.0, 430.0, Facing::Left);
        assert!(!spray_hits(&player, &ahead, 100.0, 30.0));
        assert!(spray_hits(&player, &behind, 100.0, 30.0));
    }

    #[test]
    fn spray_window_bounds() {
        let player = player_at(400.0, 430.0, Facing::Right);
        // Center-to-center distance exactly at range: excluded.
        let at_range = enemy_at(0, 6, player.center_x() + 100.0 - ENEMY_WIDTH / 2.0);
        assert!(!spray_hits(&player, &at_range, 100.0, 30.0));
        // Centered exactly on the player: neither ahead nor behind.
        let centered = enemy_at(1, 6, player.center_x() - ENEMY_WIDTH / 2.0);
        assert!(!spray_hits(&player, &centered, 100.0, 30.0));
        // Outside the vertical band.
        let mut high = enemy_at(2, 6, 450.0);
        high.y = player.y - 31.0;
        assert!(!spray_hits(&player, &high, 100.0, 30.0));
    }

    #[test]
    fn respawn_radius_is_inclusive() {
        assert!(near_respawn(300.0, 100.0, 200.0));
        assert!(!near_respawn(301.0, 100.0, 200.0));
        assert!(near_respawn(100.0, 100.0, 200.0));
    }
}
