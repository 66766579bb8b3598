/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use config::GameConfig;
use sim::event::GameEvent;
use sim::step;
use sim::world::{GameSession, Phase};
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

/// Idle sleep between frames; input polling and rendering run faster
/// than the simulation tick.
const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    // Config warnings print to stderr before the alternate screen opens.
    let config = GameConfig::load();
    let mut session = GameSession::new(&config);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    // Keyboard enhancement is probed after raw mode is active.
    let mut kb = InputState::new();
    let sound = SoundEngine::new();

    let result = game_loop(&mut session, &mut renderer, &mut kb, sound.as_ref(), &config);

    kb.restore();
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Note Drop!");
    println!("Final Score: {}", session.score);
}

fn game_loop(
    session: &mut GameSession,
    renderer: &mut Renderer,
    kb: &mut InputState,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.general.tick_rate_ms);

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(session, kb, config) {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            if session.phase == Phase::Playing {
                let events = step::step(session, kb.held());
                process_sound_events(sound, session, &events);
            }
            last_tick = Instant::now();
        }

        renderer.render(session)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Phase transitions driven by menu keys. Returns true to quit.
fn handle_meta(session: &mut GameSession, kb: &InputState, config: &GameConfig) -> bool {
    match session.phase {
        Phase::Title => {
            if kb.confirm_pressed() {
                step::start_game(session);
            } else if kb.quit_pressed() {
                return true;
            }
        }
        Phase::Playing => {
            if kb.restart_pressed() {
                *session = GameSession::new(config);
                step::start_game(session);
            } else if kb.quit_pressed() {
                *session = GameSession::new(config);
            }
        }
        Phase::GameOver => {
            if kb.confirm_pressed() {
                *session = GameSession::new(config);
                step::start_game(session);
            } else if kb.quit_pressed() {
                *session = GameSession::new(config);
            }
        }
    }
    false
}

fn process_sound_events(sound: Option<&SoundEngine>, session: &GameSession, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::NoteWalked { note, volume, .. } => sfx.play_note(*note, *volume),
            GameEvent::PlateCompleted { volume, .. } => sfx.play_chord(*volume),
            GameEvent::LevelCleared { .. } => sfx.play_scale_run(session.audio.effect_volume),
            GameEvent::SprayUsed { .. } => sfx.play_spray(session.audio.effect_volume),
            GameEvent::PlayerKilled { .. } => sfx.play_death(session.audio.effect_volume),
            _ => {}
        }
    }
}
