/// Fixed arena geometry: the platform stack, the ladder graph between
/// adjacent platforms, and the plate row at the bottom.
///
/// Everything here is read-only after construction. Platform indices run
/// top to bottom (0 = highest, COUNT-1 = bottom), y grows downward, and a
/// platform's `y` is its walking surface. Ladders span surface to surface
/// and only ever connect vertically adjacent platforms.

// ── Arena ──
pub const ARENA_WIDTH: f32 = 900.0;
pub const ARENA_HEIGHT: f32 = 700.0;

// ── Platforms ──
pub const PLATFORM_COUNT: usize = 7;
pub const PLATFORM_TOP_Y: f32 = 50.0;
pub const PLATFORM_SPACING: f32 = 70.0;
/// (x, width) per platform, top to bottom.
pub const PLATFORM_SPANS: [(f32, f32); PLATFORM_COUNT] = [
    (50.0, 800.0),
    (150.0, 600.0),
    (100.0, 700.0),
    (200.0, 500.0),
    (125.0, 650.0),
    (175.0, 550.0),
    (50.0, 800.0),
];

// ── Ladders ──
pub const LADDER_WIDTH: f32 = 30.0;
pub const LADDERS_PER_GAP: usize = 2;
/// Usable ladder region inside the overlap of two adjacent platforms.
const LADDER_INSET_LEFT: f32 = 40.0;
const LADDER_INSET_RIGHT: f32 = 70.0;

// ── Plates ──
pub const PLATE_COUNT: usize = 3;
pub const PLATE_XS: [f32; PLATE_COUNT] = [150.0, 380.0, 610.0];
pub const PLATE_WIDTH: f32 = 140.0;
pub const PLATE_Y: f32 = ARENA_HEIGHT - 30.0;
/// One full scale per plate.
pub const PLATE_CAPACITY: usize = 8;

/// Below this line a falling panel stops checking platforms and panels
/// and resolves against its plate instead.
pub const PLATE_ZONE_Y: f32 = ARENA_HEIGHT - 60.0;
/// Bottom edge at which the plate delivery (or miss) actually resolves.
pub const DELIVERY_Y: f32 = PLATE_Y - 10.0;

#[derive(Clone, Copy, Debug)]
pub struct Platform {
    pub index: usize,
    pub x: f32,
    /// Walking surface height.
    pub y: f32,
    pub width: f32,
}

impl Platform {
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Clamp the left edge of a `w`-wide entity onto this platform,
    /// keeping `inset` clear of both ends. Degenerate spans resolve
    /// toward the left bound rather than panicking.
    #[inline]
    pub fn clamp_onto(&self, x: f32, w: f32, inset: f32) -> f32 {
        x.min(self.right() - w - inset).max(self.x + inset)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Ladder {
    pub x: f32,
    pub width: f32,
    /// Upper platform surface (smaller index).
    pub y: f32,
    pub height: f32,
    pub from: usize,
    pub to: usize,
}

impl Ladder {
    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    #[inline]
    pub fn top_y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom_y(&self) -> f32 {
        self.y + self.height
    }
}

/// The constructed graph a level runs on. Identical for every level;
/// rebuilt (not mutated) on level reconstruction.
#[derive(Clone, Debug)]
pub struct LevelLayout {
    pub platforms: Vec<Platform>,
    pub ladders: Vec<Ladder>,
}

impl LevelLayout {
    pub fn standard() -> Self {
        let platforms: Vec<Platform> = PLATFORM_SPANS
            .iter()
            .enumerate()
            .map(|(index, &(x, width))| Platform {
                index,
                x,
                y: PLATFORM_TOP_Y + index as f32 * PLATFORM_SPACING,
                width,
            })
            .collect();

        let mut ladders = Vec::new();
        for pair in platforms.windows(2) {
            let (upper, lower) = (pair[0], pair[1]);
            let min_x = upper.x.max(lower.x) + LADDER_INSET_LEFT;
            let max_x = upper.right().min(lower.right()) - LADDER_INSET_RIGHT;
            if max_x <= min_x {
                continue;
            }
            for j in 0..LADDERS_PER_GAP {
                let t = (j + 1) as f32 / (LADDERS_PER_GAP + 1) as f32;
                ladders.push(Ladder {
                    x: min_x + (max_x - min_x) * t,
                    width: LADDER_WIDTH,
                    y: upper.y,
                    height: lower.y - upper.y,
                    from: upper.index,
                    to: lower.index,
                });
            }
        }

        LevelLayout { platforms, ladders }
    }

    #[inline]
    pub fn platform(&self, index: usize) -> &Platform {
        &self.platforms[index]
    }

    #[inline]
    pub fn bottom_index(&self) -> usize {
        self.platforms.len() - 1
    }

    pub fn ladder_between(&self, from: usize, to: usize) -> Option<&Ladder> {
        self.ladders.iter().find(|l| l.from == from && l.to == to)
    }

    /// Indices of ladders whose centerline is within `threshold` of `x`,
    /// in graph order.
    pub fn ladders_near(&self, x: f32, threshold: f32) -> Vec<usize> {
        self.ladders
            .iter()
            .enumerate()
            .filter(|(_, l)| (l.center_x() - x).abs() < threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// Platform whose surface is vertically closest to `bottom_y`
    /// (an entity's bottom edge). Ties resolve to the smaller index.
    pub fn closest_platform_to(&self, bottom_y: f32) -> usize {
        let mut best = 0;
        let mut best_d = f32::MAX;
        for p in &self.platforms {
            let d = (bottom_y - p.y).abs();
            if d < best_d {
                best_d = d;
                best = p.index;
            }
        }
        best
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
