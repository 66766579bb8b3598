/// Sound engine: synthesized musical cues via rodio.
///
/// Every cue is rendered once at init into an in-memory WAV buffer;
/// playback clones the buffer onto a detached Sink (fire-and-forget)
/// with the volume applied per call. A missing audio device degrades
/// to silence, never to an error.
///
/// Build without the "sound" feature to compile the no-op stub.

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use crate::domain::note::Note;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        /// One blip per scale degree, indexed by `Note::degree()`.
        sfx_notes: Vec<Arc<Vec<u8>>>,
        sfx_chord: Arc<Vec<u8>>,
        sfx_scale_run: Arc<Vec<u8>>,
        sfx_spray: Arc<Vec<u8>>,
        sfx_death: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            let sfx_notes = Note::SCALE
                .iter()
                .map(|n| Arc::new(make_wav(&gen_note_blip(n.frequency()))))
                .collect();

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_notes,
                sfx_chord: Arc::new(make_wav(&gen_chord())),
                sfx_scale_run: Arc::new(make_wav(&gen_scale_run())),
                sfx_spray: Arc::new(make_wav(&gen_spray())),
                sfx_death: Arc::new(make_wav(&gen_death())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>, volume: f32) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.set_volume(volume.clamp(0.0, 1.0));
                    sink.append(src);
                    sink.detach();
                }
            }
        }

        /// Pitched blip for a walked panel section.
        pub fn play_note(&self, note: Note, volume: f32) {
            self.play(&self.sfx_notes[note.degree()], volume);
        }

        /// Harmony chord for a completed plate.
        pub fn play_chord(&self, volume: f32) {
            self.play(&self.sfx_chord, volume);
        }

        /// Ascending run for a cleared level.
        pub fn play_scale_run(&self, volume: f32) {
            self.play(&self.sfx_scale_run, volume);
        }

        /// Noise burst for the spray.
        pub fn play_spray(&self, volume: f32) {
            self.play(&self.sfx_spray, volume);
        }

        /// Descending tone for a lost life.
        pub fn play_death(&self, volume: f32) {
            self.play(&self.sfx_death, volume);
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators (mono f32 samples)
    // ════════════════════════════════════════════════════════════

    /// Short pitched blip with a touch of second harmonic.
    fn gen_note_blip(freq: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.09) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = (1.0 - i as f32 / n as f32).powf(0.7);
                let wave = (t * freq * TAU).sin() * 0.8 + (t * freq * 2.0 * TAU).sin() * 0.2;
                wave * env * 0.55
            })
            .collect()
    }

    /// C major with the octave on top, sustained with a slow decay.
    fn gen_chord() -> Vec<f32> {
        let freqs = [
            Note::Do.frequency(),
            Note::Mi.frequency(),
            Note::So.frequency(),
            Note::DoHigh.frequency(),
        ];
        let n = (SAMPLE_RATE as f32 * 0.65) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let progress = i as f32 / n as f32;
                // Short attack ramp avoids a click on the first sample.
                let attack = (i as f32 / (SAMPLE_RATE as f32 * 0.01)).min(1.0);
                let env = attack * (1.0 - progress).powf(1.4);
                let wave: f32 = freqs.iter().map(|&f| (t * f * TAU).sin()).sum();
                wave * env * 0.18
            })
            .collect()
    }

    /// The full scale bottom to top, last degree sustained.
    fn gen_scale_run() -> Vec<f32> {
        let mut samples = Vec::new();
        for (d, note) in Note::SCALE.iter().enumerate() {
            let freq = note.frequency();
            let last = d == Note::SCALE.len() - 1;
            let dur = if last { 0.28 } else { 0.07 };
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * if last { 1.0 } else { 0.35 };
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3;
                samples.push(wave * env * 0.4);
            }
        }
        samples
    }

    /// Air-hiss burst: filtered noise over a faint high tone.
    fn gen_spray() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.14) as usize;
        let mut lcg: u32 = 0x2545_F491;
        (0..n)
            .map(|i| {
                let progress = i as f32 / n as f32;
                lcg = lcg.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (lcg >> 16) as f32 / 32768.0 - 1.0;
                let t = i as f32 / SAMPLE_RATE as f32;
                let hiss_tone = (t * 2200.0 * TAU).sin();
                let env = (1.0 - progress).powf(0.9);
                (noise * 0.75 + hiss_tone * 0.25) * env * 0.4
            })
            .collect()
    }

    /// Four falling tones, faded out at the tail.
    fn gen_death() -> Vec<f32> {
        let freqs = [440.0_f32, 349.23, 293.66, 196.0];
        let note_dur = 0.13;
        let mut samples = Vec::new();
        for &freq in &freqs {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                samples.push((t * freq * TAU).sin() * env * 0.45);
            }
        }
        let total = samples.len();
        let fade = total / 4;
        for i in (total - fade)..total {
            samples[i] *= (total - i) as f32 / fade as f32;
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder
    // ════════════════════════════════════════════════════════════

    /// Wrap mono f32 samples into a 16-bit PCM WAV buffer.
    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let data_size = samples.len() as u32 * 2;
        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&1u16.to_le_bytes()); // mono
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes()); // byte rate
        buf.extend_from_slice(&2u16.to_le_bytes()); // block align
        buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> {
        Some(SoundEngine)
    }
    pub fn play_note(&self, _note: crate::domain::note::Note, _volume: f32) {}
    pub fn play_chord(&self, _volume: f32) {}
    pub fn play_scale_run(&self, _volume: f32) {}
    pub fn play_spray(&self, _volume: f32) {}
    pub fn play_death(&self, _volume: f32) {}
}
