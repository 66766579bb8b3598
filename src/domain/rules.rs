/// Traversal rules: pure functions, no side effects.
/// These encode "what is legal" without performing the movement.
///
/// ## Ladder entry truth table
///
/// A grounded player may lock onto a ladder only when the held vertical
/// direction agrees with which endpoint they are standing on:
///
/// ┌──────────────┬─────────────────────────────────────────────┐
/// │ Held         │ Eligible ladders                            │
/// ├──────────────┼─────────────────────────────────────────────┤
/// │ Up           │ platform == ladder.to  (at lower endpoint)  │
/// │ Down         │ platform == ladder.from (at upper endpoint) │
/// │ Neither      │ either endpoint matches (idle snap)         │
/// └──────────────┴─────────────────────────────────────────────┘
///
/// Among eligible ladders inside the proximity threshold the nearest
/// centerline wins; exact ties keep the first in graph order. Direction
/// preference always beats the idle default: an ineligible ladder is
/// never selected just for being closer.

use super::entity::{VerticalDir, PANEL_SECTIONS, PANEL_WIDTH, PLAYER_WIDTH};
use super::layout::{Ladder, LevelLayout};

pub const SECTION_WIDTH: f32 = PANEL_WIDTH / PANEL_SECTIONS as f32;

/// At the ladder's lower endpoint, may climb up.
#[inline]
pub fn can_climb_up(ladder: &Ladder, platform: usize) -> bool {
    ladder.to == platform
}

/// At the ladder's upper endpoint, may climb down.
#[inline]
pub fn can_climb_down(ladder: &Ladder, platform: usize) -> bool {
    ladder.from == platform
}

fn eligible(ladder: &Ladder, platform: usize, vert: Option<VerticalDir>) -> bool {
    match vert {
        Some(VerticalDir::Up) => can_climb_up(ladder, platform),
        Some(VerticalDir::Down) => can_climb_down(ladder, platform),
        None => can_climb_up(ladder, platform) || can_climb_down(ladder, platform),
    }
}

/// Pick the ladder a grounded player at `center_x` on `platform` would
/// lock onto, honoring the truth table above. The returned index is
/// into `layout.ladders`.
pub fn select_ladder(
    layout: &LevelLayout,
    center_x: f32,
    platform: usize,
    vert: Option<VerticalDir>,
    threshold: f32,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for idx in layout.ladders_near(center_x, threshold) {
        let ladder = &layout.ladders[idx];
        if !eligible(ladder, platform, vert) {
            continue;
        }
        let d = (ladder.center_x() - center_x).abs();
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((idx, d));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Left edge the player converges to while centered on a ladder.
#[inline]
pub fn climb_target_x(ladder: &Ladder) -> f32 {
    ladder.center_x() - PLAYER_WIDTH / 2.0
}

/// One step of exponential centerline easing.
#[inline]
pub fn ease_toward(x: f32, target: f32, factor: f32) -> f32 {
    x + (target - x) * factor
}

/// Which of the panel's four sections the given horizontal center is
/// over; None outside the panel span (the right edge itself maps past
/// the last section and does not count).
pub fn section_index(panel_x: f32, center_x: f32) -> Option<usize> {
    if center_x < panel_x || center_x > panel_x + PANEL_WIDTH {
        return None;
    }
    let idx = ((center_x - panel_x) / SECTION_WIDTH) as usize;
    if idx < PANEL_SECTIONS {
        Some(idx)
    } else {
        None
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
