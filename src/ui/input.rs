/// Input sampling: held-state for the simulation, edge-triggered for
/// menus.
///
/// `step()` wants "what is held right now", but most terminals only
/// report Press/Repeat. A key therefore counts as held for a short
/// timeout after its last event. When crossterm's keyboard enhancement
/// protocol is available, Release events are honored and release is
/// exact instead of timed.

use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{execute, terminal};

use crate::domain::entity::HeldInput;

/// Without Release reporting, a key expires this long after its last
/// Press/Repeat event.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Key bindings ──
const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_SPRAY: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Char('j'), KeyCode::Char('J')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc];

pub struct InputState {
    /// Timestamp of the last Press/Repeat event per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went "not held" → "held" during the latest drain.
    fresh_presses: Vec<KeyCode>,
    /// Raw events from the latest drain, for modifier checks.
    raw_events: Vec<KeyEvent>,
    /// True once the enhancement protocol is confirmed; Release events
    /// are trusted and the hold timeout becomes a fallback only.
    honor_release: bool,
}

impl InputState {
    /// Call after raw mode is enabled: probes for the keyboard
    /// enhancement protocol and turns on event-type reporting when the
    /// terminal supports it.
    pub fn new() -> Self {
        let honor_release = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if honor_release {
            let _ = execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            );
        }
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release,
        }
    }

    /// Undo the enhancement push. Call before the terminal is restored.
    pub fn restore(&self) {
        if self.honor_release {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while event::poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);

                match key.kind {
                    KeyEventKind::Release if self.honor_release => {
                        self.last_active.remove(&key.code);
                    }
                    KeyEventKind::Release => {
                        // Unconfirmed protocol: rely on timeout expiry.
                    }
                    _ => {
                        let was_held = self.is_held(key.code);
                        self.last_active.insert(key.code, Instant::now());
                        if !was_held {
                            self.fresh_presses.push(key.code);
                        }
                    }
                }
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// The held-state snapshot the simulation consumes this tick.
    /// Fresh presses count too, so a tap shorter than one tick is not
    /// lost between drains.
    pub fn held(&self) -> HeldInput {
        HeldInput {
            left: self.group_active(KEYS_LEFT),
            right: self.group_active(KEYS_RIGHT),
            up: self.group_active(KEYS_UP),
            down: self.group_active(KEYS_DOWN),
            spray: self.group_active(KEYS_SPRAY),
        }
    }

    // ── Edge-triggered menu keys ──

    pub fn confirm_pressed(&self) -> bool {
        self.any_pressed(KEYS_CONFIRM)
    }

    pub fn restart_pressed(&self) -> bool {
        self.any_pressed(KEYS_RESTART)
    }

    pub fn quit_pressed(&self) -> bool {
        self.any_pressed(KEYS_QUIT)
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    // ── Internal ──

    fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    fn group_active(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c) || self.was_pressed(*c))
    }

    fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }
}
