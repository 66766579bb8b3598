/// The solfège vocabulary: one octave, scale order.
/// Pitch and label are queried via methods, not stored per panel,
/// so note semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Note {
    Do,
    Re,
    Mi,
    Fa,
    So,
    La,
    Ti,
    DoHigh, // Do′, the octave top
}

impl Note {
    /// All eight degrees in ascending scale order. A plate holds one
    /// panel per degree, so this is also the per-plate panel set.
    pub const SCALE: [Note; 8] = [
        Note::Do,
        Note::Re,
        Note::Mi,
        Note::Fa,
        Note::So,
        Note::La,
        Note::Ti,
        Note::DoHigh,
    ];

    /// Fundamental frequency in Hz (C major, C4..C5).
    pub fn frequency(self) -> f32 {
        match self {
            Note::Do => 261.63,
            Note::Re => 293.66,
            Note::Mi => 329.63,
            Note::Fa => 349.23,
            Note::So => 392.00,
            Note::La => 440.00,
            Note::Ti => 493.88,
            Note::DoHigh => 523.25,
        }
    }

    /// Short display label.
    pub fn label(self) -> &'static str {
        match self {
            Note::Do => "Do",
            Note::Re => "Re",
            Note::Mi => "Mi",
            Note::Fa => "Fa",
            Note::So => "So",
            Note::La => "La",
            Note::Ti => "Ti",
            Note::DoHigh => "Do'",
        }
    }

    /// Position within the scale, 0..8.
    pub fn degree(self) -> usize {
        Note::SCALE.iter().position(|n| *n == self).unwrap_or(0)
    }
}
