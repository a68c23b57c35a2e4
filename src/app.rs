use std::io;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::cursor::{MoveTo, Show};
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use tracing::info;

use crate::game::{Flow, Game};
use crate::keymap::Key;
use crate::ui::Ui;

/// Poll timeout per iteration; doubles as the pacing tick.
const TICK: Duration = Duration::from_millis(50);
/// How long the completion banner stays up before the session ends.
const COMPLETE_HOLD: Duration = Duration::from_secs(5);

pub fn run() -> Result<()> {
    let mut game = Game::new();
    let mut ui = Ui::new()?;
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Clear(ClearType::All))?;
    let res = (|| -> Result<()> {
        loop {
            ui.refresh(&mut stdout, &game)?;
            if game.is_level_complete() {
                if game.advance_level() {
                    ui.clear_cache();
                    continue;
                }
                ui.draw_complete_banner(&mut stdout)?;
                thread::sleep(COMPLETE_HOLD);
                break;
            }
            // A timeout with no input is a no-op iteration; pending two-key
            // commands stay parked on the session until a key arrives.
            if poll(TICK)? {
                match read()? {
                    Event::Key(KeyEvent {
                        code, modifiers, ..
                    }) => {
                        if let Some(key) = translate_key(code, modifiers) {
                            if game.handle_key(key)? == Flow::Quit {
                                info!("session quit");
                                break;
                            }
                        }
                    }
                    Event::Resize(w, h) => {
                        ui.resize(w, h);
                        ui.clear_cache();
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    })();
    disable_raw_mode().ok();
    execute!(
        stdout,
        LeaveAlternateScreen,
        Show,
        Clear(ClearType::All),
        MoveTo(0, 0)
    )
    .ok();
    res
}

fn translate_key(code: KeyCode, modifiers: KeyModifiers) -> Option<Key> {
    match code {
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => Some(Key::Char(c)),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Esc),
        KeyCode::Backspace | KeyCode::Delete => Some(Key::Backspace),
        _ => None,
    }
}
