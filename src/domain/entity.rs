/// Entities: Player, Enemy, NotePanel, Plate.
/// Positions are top-left corners in arena coordinates (y grows downward);
/// sizes are fixed per entity kind.

use super::layout::{Platform, PLATE_CAPACITY, PLATE_WIDTH, PLATE_Y};
use super::note::Note;

// ── Entity sizes ──
pub const PLAYER_WIDTH: f32 = 30.0;
pub const PLAYER_HEIGHT: f32 = 40.0;
pub const PLAYER_SPAWN_X: f32 = 100.0;
pub const ENEMY_WIDTH: f32 = 25.0;
pub const ENEMY_HEIGHT: f32 = 30.0;
pub const PANEL_WIDTH: f32 = 120.0;
pub const PANEL_HEIGHT: f32 = 16.0;
pub const PANEL_SECTIONS: usize = 4;
/// Gap between a resting panel's bottom edge and its platform surface.
pub const PANEL_REST_LIFT: f32 = 5.0;
/// Span inset when a panel is placed at level build.
pub const PANEL_SPAWN_INSET: f32 = 20.0;
/// Span inset when a falling panel re-clamps onto a platform.
pub const PANEL_LAND_INSET: f32 = 10.0;
/// Vertical spacing between stacked panels on a plate.
pub const PLATE_STACK_GAP: f32 = 1.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VerticalDir {
    Up,
    Down,
}

/// Held-state input sampled once per tick. No buffering: only what is
/// held at tick time matters.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeldInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub spray: bool,
}

impl HeldInput {
    /// Vertical intent; opposing directions cancel to up.
    pub fn vertical(&self) -> Option<VerticalDir> {
        match (self.up, self.down) {
            (true, _) => Some(VerticalDir::Up),
            (false, true) => Some(VerticalDir::Down),
            _ => None,
        }
    }

    /// Horizontal intent; opposing directions cancel to none.
    pub fn horizontal(&self) -> Option<Facing> {
        match (self.left, self.right) {
            (true, false) => Some(Facing::Left),
            (false, true) => Some(Facing::Right),
            _ => None,
        }
    }
}

/// Player traversal mode. The ladder lock exists only while climbing,
/// so "climbing with no ladder" is unrepresentable.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Traversal {
    Grounded,
    Climbing { ladder: usize },
}

#[derive(Clone, Debug)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    /// Standing surface; authoritative while grounded, frozen at the last
    /// surface while climbing until the climb resolves.
    pub platform: usize,
    pub mode: Traversal,
    pub facing: Facing,
    pub invincible: u32,
    pub lives: u32,
    pub spray_charges: u32,
    pub spray_cooldown: u32,
}

impl Player {
    pub fn new(bottom: &Platform, lives: u32, spray_charges: u32) -> Self {
        Player {
            x: PLAYER_SPAWN_X,
            y: bottom.y - PLAYER_HEIGHT,
            platform: bottom.index,
            mode: Traversal::Grounded,
            facing: Facing::Right,
            invincible: 0,
            lives,
            spray_charges,
            spray_cooldown: 0,
        }
    }

    /// Back to the level start: bottom platform, grounded, facing right.
    /// Used on death respawn (with an invincibility grant) and on level
    /// rebuild (without one). Lives and spray charges are untouched.
    pub fn respawn(&mut self, bottom: &Platform, invincible: u32) {
        self.x = PLAYER_SPAWN_X;
        self.y = bottom.y - PLAYER_HEIGHT;
        self.platform = bottom.index;
        self.mode = Traversal::Grounded;
        self.facing = Facing::Right;
        self.invincible = invincible;
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + PLAYER_WIDTH / 2.0
    }

    #[inline]
    pub fn bottom_y(&self) -> f32 {
        self.y + PLAYER_HEIGHT
    }

    #[inline]
    pub fn is_invincible(&self) -> bool {
        self.invincible > 0
    }

    #[inline]
    pub fn ladder(&self) -> Option<usize> {
        match self.mode {
            Traversal::Climbing { ladder } => Some(ladder),
            Traversal::Grounded => None,
        }
    }
}

/// Enemy behavioral state. Carried holds the id of the panel driving the
/// enemy's position; the panel owns the relationship, the enemy only
/// remembers whom to ask.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EnemyState {
    Patrolling,
    Stunned { remaining: u32 },
    Carried { panel: u32 },
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub platform: usize,
    /// Fixed at spawn from the level number; never rescaled afterwards.
    pub speed: f32,
    pub facing: Facing,
    pub state: EnemyState,
    pub chase_timer: u32,
}

impl Enemy {
    pub fn new(id: u32, x: f32, platform: &Platform, speed: f32, facing: Facing) -> Self {
        Enemy {
            id,
            x,
            y: platform.y - ENEMY_HEIGHT,
            platform: platform.index,
            speed,
            facing,
            state: EnemyState::Patrolling,
            chase_timer: 0,
        }
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + ENEMY_WIDTH / 2.0
    }

    #[inline]
    pub fn is_stunned(&self) -> bool {
        matches!(self.state, EnemyState::Stunned { .. })
    }

    #[inline]
    pub fn carried_by(&self) -> Option<u32> {
        match self.state {
            EnemyState::Carried { panel } => Some(panel),
            _ => None,
        }
    }
}

/// Panel lifecycle. Idle is the only phase that accepts player
/// interaction; Stranded is the terminal floor miss.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PanelPhase {
    Idle,
    Falling,
    Delivered,
    Stranded,
}

#[derive(Clone, Debug)]
pub struct NotePanel {
    pub id: u32,
    pub note: Note,
    /// Owning plate, assigned at creation, never reassigned.
    pub plate: usize,
    pub platform: usize,
    pub x: f32,
    pub y: f32,
    pub walked: [bool; PANEL_SECTIONS],
    pub phase: PanelPhase,
    /// Enemies riding this panel down. Owned here; enemies only hold
    /// the back-reference.
    pub carried: Vec<u32>,
}

impl NotePanel {
    pub fn new(id: u32, note: Note, plate: usize, platform: &Platform, x: f32) -> Self {
        NotePanel {
            id,
            note,
            plate,
            platform: platform.index,
            x,
            y: Self::rest_y(platform),
            walked: [false; PANEL_SECTIONS],
            phase: PanelPhase::Idle,
            carried: Vec::new(),
        }
    }

    /// Resting height above a platform surface.
    #[inline]
    pub fn rest_y(platform: &Platform) -> f32 {
        platform.y - PANEL_HEIGHT - PANEL_REST_LIFT
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + PANEL_WIDTH / 2.0
    }

    #[inline]
    pub fn bottom_y(&self) -> f32 {
        self.y + PANEL_HEIGHT
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.phase == PanelPhase::Idle
    }

    /// Mark one section walked. Returns true only when newly marked.
    pub fn mark_section(&mut self, section: usize) -> bool {
        if section < PANEL_SECTIONS && !self.walked[section] {
            self.walked[section] = true;
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn fully_walked(&self) -> bool {
        self.walked.iter().all(|w| *w)
    }

    pub fn reset_sections(&mut self) {
        self.walked = [false; PANEL_SECTIONS];
    }
}

/// Collection container at the bottom of the arena. Holds delivered
/// panels in arrival order; completion latches exactly once.
#[derive(Clone, Debug)]
pub struct Plate {
    pub x: f32,
    pub notes: Vec<u32>,
    pub complete: bool,
}

impl Plate {
    pub fn new(x: f32) -> Self {
        Plate { x, notes: Vec::new(), complete: false }
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + PLATE_WIDTH / 2.0
    }

    /// Stack height for the next delivered panel's top edge.
    #[inline]
    pub fn next_stack_y(&self) -> f32 {
        PLATE_Y - (self.notes.len() + 1) as f32 * (PANEL_HEIGHT + PLATE_STACK_GAP)
    }

    /// Accept a delivered panel. Returns true when this acceptance
    /// completes the plate (the completion flag latches on that call
    /// and never again).
    pub fn accept(&mut self, panel: u32) -> bool {
        self.notes.push(panel);
        if self.notes.len() >= PLATE_CAPACITY && !self.complete {
            self.complete = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform() -> Platform {
        Platform { index: 6, x: 50.0, y: 470.0, width: 800.0 }
    }

    #[test]
    fn sections_mark_once_and_fill() {
        let mut p = NotePanel::new(0, Note::Do, 0, &platform(), 200.0);
        assert!(!p.fully_walked());
        assert!(p.mark_section(0));
        assert!(!p.mark_section(0)); // already walked
        assert!(!p.mark_section(9)); // out of range
        assert!(p.mark_section(1));
        assert!(p.mark_section(2));
        assert!(!p.fully_walked());
        assert!(p.mark_section(3));
        assert!(p.fully_walked());

        p.reset_sections();
        assert!(!p.fully_walked());
        assert!(p.mark_section(0));
    }

    #[test]
    fn plate_completion_latches_once() {
        let mut plate = Plate::new(150.0);
        for i in 0..7 {
            assert!(!plate.accept(i));
            assert!(!plate.complete);
        }
        assert!(plate.accept(7)); // eighth panel completes
        assert!(plate.complete);
        assert_eq!(plate.notes.len(), 8);
        // Further deliveries never re-fire completion.
        assert!(!plate.accept(8));
        assert!(plate.complete);
    }

    #[test]
    fn plate_stack_grows_upward() {
        let mut plate = Plate::new(150.0);
        let first = plate.next_stack_y();
        plate.accept(0);
        let second = plate.next_stack_y();
        assert!(second < first);
        assert!((first - second - (PANEL_HEIGHT + PLATE_STACK_GAP)).abs() < f32::EPSILON);
    }

    #[test]
    fn respawn_clears_transient_state_only() {
        let bottom = platform();
        let mut player = Player::new(&bottom, 3, 5);
        player.x = 600.0;
        player.mode = Traversal::Climbing { ladder: 2 };
        player.facing = Facing::Left;
        player.lives = 2;
        player.spray_charges = 1;

        player.respawn(&bottom, 120);
        assert_eq!(player.x, PLAYER_SPAWN_X);
        assert_eq!(player.mode, Traversal::Grounded);
        assert_eq!(player.facing, Facing::Right);
        assert!(player.is_invincible());
        assert_eq!(player.lives, 2);
        assert_eq!(player.spray_charges, 1);
        assert_eq!(player.ladder(), None);
    }

    #[test]
    fn held_input_intent_resolution() {
        let both = HeldInput { up: true, down: true, ..Default::default() };
        assert_eq!(both.vertical(), Some(VerticalDir::Up));
        let lr = HeldInput { left: true, right: true, ..Default::default() };
        assert_eq!(lr.horizontal(), None);
        let r = HeldInput { right: true, ..Default::default() };
        assert_eq!(r.horizontal(), Some(Facing::Right));
        assert_eq!(r.vertical(), None);
    }
}
