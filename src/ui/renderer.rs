/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (a grid of Cells)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The arena's continuous coordinates are scaled onto a fixed character
/// viewport (VIEW_W × VIEW_H) centered in the terminal. Entities that
/// stand on a surface are drawn one row above that surface's row.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{EnemyState, NotePanel, PanelPhase, Traversal, ENEMY_HEIGHT, PANEL_WIDTH};
use crate::domain::layout::{ARENA_HEIGHT, ARENA_WIDTH, PLATE_WIDTH, PLATE_Y};
use crate::domain::note::Note;
use crate::domain::rules::SECTION_WIDTH;
use crate::sim::world::{GameSession, Phase};

// ── Viewport geometry ──

/// Character columns the arena is squeezed into.
const VIEW_W: usize = 100;
/// Character rows the arena is squeezed into.
const VIEW_H: usize = 28;
const HUD_ROW: usize = 0;
const ARENA_ROW: usize = 2;

#[inline]
fn col_of(x: f32) -> usize {
    ((x / ARENA_WIDTH) * VIEW_W as f32) as usize
}

#[inline]
fn row_of(y: f32) -> usize {
    ((y / ARENA_HEIGHT) * VIEW_H as f32) as usize
}

/// Row for an entity resting on (or hanging from) a surface: one above
/// the row its bottom edge maps to.
#[inline]
fn entity_row(bottom_y: f32) -> usize {
    row_of(bottom_y).saturating_sub(1)
}

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every "empty" cell, so inter-row gap
    /// pixels on VTE terminals match the cell color exactly and no
    /// horizontal seams appear.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 16, b: 32 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel that differs from any real cell, used to invalidate the
    /// back buffer and force a full repaint.
    const INVALID: Cell = Cell { ch: '\0', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.set(cx, y, Cell::new(ch, fg, bg));
            cx += 1;
        }
    }

    fn fill_row(&mut self, y: usize, fg: Color, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', fg, bg));
        }
    }
}

// ── Palette ──

const HUD_BG: Color = Color::Rgb { r: 24, g: 20, b: 58 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 175, b: 60 };
const GOLD: Color = Color::Rgb { r: 255, g: 205, b: 60 };
const PLATFORM_FG: Color = Color::Rgb { r: 140, g: 140, b: 160 };
const LADDER_FG: Color = Color::Rgb { r: 100, g: 190, b: 255 };
const PLAYER_FG: Color = Color::Rgb { r: 255, g: 255, b: 170 };
const PLAYER_CLIMB_FG: Color = Color::Rgb { r: 170, g: 255, b: 190 };
const ENEMY_FG: Color = Color::Rgb { r: 255, g: 95, b: 95 };
const ENEMY_STUN_FG: Color = Color::Rgb { r: 90, g: 220, b: 255 };
const ENEMY_CARRIED_FG: Color = Color::Rgb { r: 230, g: 120, b: 255 };

/// Display color per scale degree.
fn note_color(note: Note) -> Color {
    match note {
        Note::Do => Color::Rgb { r: 235, g: 80, b: 80 },
        Note::Re => Color::Rgb { r: 240, g: 150, b: 60 },
        Note::Mi => Color::Rgb { r: 240, g: 220, b: 70 },
        Note::Fa => Color::Rgb { r: 110, g: 220, b: 90 },
        Note::So => Color::Rgb { r: 80, g: 200, b: 230 },
        Note::La => Color::Rgb { r: 110, g: 130, b: 250 },
        Note::Ti => Color::Rgb { r: 190, g: 110, b: 240 },
        Note::DoHigh => Color::Rgb { r: 250, g: 160, b: 200 },
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, s: &GameSession) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        let phase_changed = self.last_phase != Some(s.phase);
        if phase_changed {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(s.phase);
        }

        self.front.clear();
        match s.phase {
            Phase::Title => self.compose_title(s),
            Phase::Playing => self.compose_game(s),
            Phase::GameOver => self.compose_game_over(s),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors each frame; ResetColor would fall back to
        // the terminal default and reintroduce seam artifacts.
        queue!(
            self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        let mut scratch = [0u8; 4];
        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch.encode_utf8(&mut scratch)))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Playing ──

    fn compose_game(&mut self, s: &GameSession) {
        let ox = self.front.width.saturating_sub(VIEW_W) / 2;

        self.compose_hud(s);
        self.compose_arena(s, ox);
        self.compose_panels(s, ox);
        self.compose_enemies(s, ox);
        self.compose_player(s, ox);

        // ── Message bar ──
        let msg_row = ARENA_ROW + VIEW_H + 1;
        if !s.message.is_empty() {
            self.front.fill_row(msg_row, Color::Black, MSG_BG);
            let msg = format!(" ◈ {} ◈ ", s.message);
            let cx = ox + VIEW_W.saturating_sub(msg.chars().count()) / 2;
            self.front.put_str(cx, msg_row, &msg, Color::Black, MSG_BG);
        }

        // ── Help bar ──
        let help = " ←→ Walk   ↑↓ Climb   SPACE Spray   R Restart   Q Quit ";
        self.front.put_str(ox, msg_row + 2, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_hud(&mut self, s: &GameSession) {
        let ox = self.front.width.saturating_sub(VIEW_W) / 2;
        self.front.fill_row(HUD_ROW, Color::White, HUD_BG);
        let hud = format!(
            " LEVEL {:<3} SCORE {:<8} ♥ ×{:<2} SPRAY ×{:<2}",
            s.level, s.score, s.player.lives, s.player.spray_charges,
        );
        self.front.put_str(ox, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    /// Static scenery: platforms, ladders, plates.
    fn compose_arena(&mut self, s: &GameSession, ox: usize) {
        for p in &s.layout.platforms {
            let row = ARENA_ROW + row_of(p.y);
            for col in col_of(p.x)..col_of(p.right()).min(VIEW_W) {
                self.front.set(ox + col, row, Cell::new('═', PLATFORM_FG, Color::Reset));
            }
        }

        for l in &s.layout.ladders {
            let col = ox + col_of(l.center_x());
            let top = row_of(l.top_y());
            let bottom = row_of(l.bottom_y());
            for row in (top + 1)..bottom {
                self.front.set(col, ARENA_ROW + row, Cell::new('╫', LADDER_FG, Color::Reset));
            }
        }

        for plate in &s.plates {
            let row = ARENA_ROW + row_of(PLATE_Y);
            let fg = if plate.complete { Color::Rgb { r: 120, g: 255, b: 120 } } else { GOLD };
            for col in col_of(plate.x)..col_of(plate.x + PLATE_WIDTH).min(VIEW_W) {
                self.front.set(ox + col, row, Cell::new('▄', fg, Color::Reset));
            }
            let tally = format!("{}/8", plate.notes.len());
            let tx = ox + col_of(plate.center_x()).saturating_sub(tally.len() / 2);
            self.front.put_str(tx, row + 1, &tally, fg, Color::Reset);
        }
    }

    fn compose_panels(&mut self, s: &GameSession, ox: usize) {
        for panel in &s.panels {
            match panel.phase {
                PanelPhase::Idle | PanelPhase::Falling => self.compose_panel_bar(panel, ox),
                PanelPhase::Delivered => self.compose_delivered(s, panel, ox),
                PanelPhase::Stranded => {
                    let row = ARENA_ROW + entity_row(panel.bottom_y());
                    for col in col_of(panel.x)..col_of(panel.x + PANEL_WIDTH).min(VIEW_W) {
                        self.front.set(ox + col, row, Cell::new('▒', Color::DarkGrey, Color::Reset));
                    }
                }
            }
        }
    }

    /// Four sections drawn individually, walked ones hollowed out, with
    /// the note label over the middle.
    fn compose_panel_bar(&mut self, panel: &NotePanel, ox: usize) {
        let row = ARENA_ROW + entity_row(panel.bottom_y());
        let fg = note_color(panel.note);
        let start = col_of(panel.x);
        let end = col_of(panel.x + PANEL_WIDTH).min(VIEW_W);

        for col in start..end {
            // Sample the column center back into arena space to find its
            // section.
            let arena_x = (col as f32 + 0.5) * (ARENA_WIDTH / VIEW_W as f32);
            let section = (((arena_x - panel.x) / SECTION_WIDTH) as usize).min(3);
            let ch = if panel.walked[section] { '░' } else { '▓' };
            self.front.set(ox + col, row, Cell::new(ch, fg, Color::Reset));
        }

        let label = panel.note.label();
        let mid = start + (end - start).saturating_sub(label.chars().count()) / 2;
        self.front.put_str(ox + mid, row, label, Color::White, Color::Reset);
    }

    /// Delivered panels stack upward from the plate row, one row per
    /// arrival, so the stack stays readable even where the vertical
    /// scale would merge rows.
    fn compose_delivered(&mut self, s: &GameSession, panel: &NotePanel, ox: usize) {
        let plate_row = row_of(PLATE_Y);
        let pos = s.plates[panel.plate]
            .notes
            .iter()
            .position(|&id| id == panel.id)
            .unwrap_or(0);
        let row = ARENA_ROW + plate_row.saturating_sub(1 + pos);
        let fg = note_color(panel.note);
        for col in col_of(panel.x)..col_of(panel.x + PANEL_WIDTH).min(VIEW_W) {
            self.front.set(ox + col, row, Cell::new('█', fg, Color::Reset));
        }
    }

    fn compose_enemies(&mut self, s: &GameSession, ox: usize) {
        for e in &s.enemies {
            let (ch, fg) = match e.state {
                EnemyState::Patrolling => ('♯', ENEMY_FG),
                EnemyState::Stunned { .. } => ('♭', ENEMY_STUN_FG),
                EnemyState::Carried { .. } => ('♯', ENEMY_CARRIED_FG),
            };
            let col = ox + col_of(e.center_x());
            let row = ARENA_ROW + entity_row(e.y + ENEMY_HEIGHT);
            self.front.set(col, row, Cell::new(ch, fg, Color::Reset));
        }
    }

    fn compose_player(&mut self, s: &GameSession, ox: usize) {
        // Invincibility flickers at tick rate.
        let flicker = s.player.is_invincible() && (s.tick / 2) % 2 == 0;
        let fg = if flicker {
            Color::DarkGrey
        } else {
            match s.player.mode {
                Traversal::Grounded => PLAYER_FG,
                Traversal::Climbing { .. } => PLAYER_CLIMB_FG,
            }
        };
        let col = ox + col_of(s.player.center_x());
        let row = ARENA_ROW + entity_row(s.player.bottom_y());
        self.front.set(col, row, Cell::new('♪', fg, Color::Reset));
    }

    // ── Static screens ──

    fn compose_title(&mut self, s: &GameSession) {
        let title = [
            r" _  _         _          ___                       ",
            r"| \| | ___  _| |_  ___  |   \  _ _  ___  _ __      ",
            r"| .` |/ _ \|_  _|/ -_)  | |) || '_|/ _ \| '_ \     ",
            r"|_|\_|\___/  |_| \___|  |___/ |_|  \___/| .__/     ",
            r"                                        |_|        ",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(4, 2 + i, line, GOLD, Color::Reset);
        }

        let subtitle = "◈◈  Walk the notes, drop the scale, complete the harmony  ◈◈";
        self.front.put_str(6, 8, subtitle, Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);

        let menu_base = 11;
        self.front.put_str(8, menu_base, "ENTER   Start", Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
        self.front.put_str(8, menu_base + 1, "  Q     Quit", Color::White, Color::Reset);

        let help = [
            "How to play",
            "  Walk every section of a note panel to drop it a level.",
            "  A panel that bottoms out lands on its plate; eight notes",
            "  complete the plate, three plates complete the harmony.",
            "  Lure sharps onto a panel before it falls for a bonus,",
            "  or stun them with the spray when cornered.",
            "",
            "Controls",
            "  ←→ / AD   Walk          ↑↓ / WS  Climb ladders",
            "  SPACE     Spray         Q / ESC  Quit",
        ];
        let help_base = menu_base + 3;
        for (i, line) in help.iter().enumerate() {
            let color = if i == 0 || i == 7 { GOLD } else { Color::White };
            self.front.put_str(8, help_base + i, line, color, Color::Reset);
        }

        if !s.message.is_empty() {
            let msg_row = self.front.height.saturating_sub(2);
            let msg = format!(" ◈ {} ◈ ", s.message);
            self.front.put_str(8, msg_row, &msg, Color::Black, MSG_BG);
        }
    }

    fn compose_game_over(&mut self, s: &GameSession) {
        let box_art = [
            "╔═══════════════════════════════╗",
            "║      ♭  THE MUSIC STOPS  ♭    ║",
            "╚═══════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(6, 4 + i, l, Color::Rgb { r: 255, g: 60, b: 60 }, Color::Reset);
        }
        let score = format!("◈ Final Score: {}", s.score);
        let level = format!("◈ Reached Level: {}", s.level);
        self.front.put_str(8, 9, &score, Color::White, Color::Reset);
        self.front.put_str(8, 10, &level, Color::White, Color::Reset);
        self.front.put_str(8, 12, "▸ ENTER: Play Again", Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
        self.front.put_str(8, 13, "▸ ESC:   Back to Title", Color::DarkGrey, Color::Reset);
    }
}
