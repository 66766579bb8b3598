/// Enemy AI: probability-weighted patrol decisions.
///
/// Three rules, applied to each patrolling enemy by the step layer:
///   1. **Chase bias**: when the chase timer fires, with a configured
///      probability and only on a shared platform, face the player.
///   2. **Edge bounce**: reverse at the platform span boundary
///      (applied in step, no randomness involved).
///   3. **Ladder hop**: rare per-tick attempt to change platforms when
///      standing near a ladder endpoint.
///
/// All randomness flows through the session's seeded generator, so a
/// fixed seed replays identical decisions.

use rand::Rng;
use rand_pcg::Pcg32;

use super::entity::{Enemy, Facing, Player};
use super::layout::LevelLayout;

/// Patrol speed scales with the level an enemy spawns on and is never
/// rescaled afterwards.
#[inline]
pub fn speed_for_level(base: f32, per_level: f32, level: u32) -> f32 {
    base + level.saturating_sub(1) as f32 * per_level
}

/// Direction refresh when the chase timer fires. Some only when the
/// enemy shares the player's platform and the bias roll passes.
pub fn chase_bias(rng: &mut Pcg32, chance: f64, enemy: &Enemy, player: &Player) -> Option<Facing> {
    if enemy.platform != player.platform || !rng.random_bool(chance) {
        return None;
    }
    Some(if player.x > enemy.x { Facing::Right } else { Facing::Left })
}

/// Attempt a ladder transition. Ladders are scanned in graph order; at
/// the first one within `proximity` of the enemy's center, an upper
/// endpoint match descends with `descend_chance` per attempt while a
/// lower endpoint match ascends outright. A failed descend roll moves on
/// to the next ladder rather than ending the attempt.
pub fn ladder_hop(
    rng: &mut Pcg32,
    layout: &LevelLayout,
    center_x: f32,
    platform: usize,
    proximity: f32,
    descend_chance: f64,
) -> Option<usize> {
    for ladder in &layout.ladders {
        if (ladder.center_x() - center_x).abs() >= proximity {
            continue;
        }
        if ladder.from == platform {
            if rng.random_bool(descend_chance) {
                return Some(ladder.to);
            }
        } else if ladder.to == platform {
            return Some(ladder.from);
        }
    }
    None
}
