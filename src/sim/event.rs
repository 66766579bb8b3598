/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and flourish; volume
/// hints ride along so call sites never rely on a hidden default.

use crate::domain::entity::Facing;
use crate::domain::note::Note;

#[derive(Clone, Debug)]
#[allow(dead_code)]
pub enum GameEvent {
    /// A new panel section was walked: one note blip plus a spark burst.
    NoteWalked { note: Note, volume: f32, x: f32, y: f32 },
    PanelFalling { panel: u32, x: f32, y: f32 },
    PanelLanded { panel: u32, platform: usize },
    PanelDelivered { panel: u32, plate: usize },
    /// Floor miss: the panel halts undelivered.
    PanelStranded { panel: u32 },
    /// Harmony chord plus a ring burst at the plate.
    PlateCompleted { plate: usize, volume: f32, x: f32, y: f32 },
    LevelCleared { level: u32, bonus: u32 },
    LevelRebuilt { level: u32 },
    EnemySpawned { id: u32, platform: usize },
    EnemyStunned { id: u32, x: f32, y: f32 },
    EnemyCarried { id: u32, panel: u32 },
    EnemyDropped { id: u32, platform: usize },
    EnemyDespawned { id: u32 },
    /// Cone burst request from the player's position.
    SprayUsed { x: f32, y: f32, facing: Facing },
    PlayerKilled { lives_left: u32 },
    GameOver { score: u32, level: u32 },
}
