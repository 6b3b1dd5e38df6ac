use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use super::mode::{Drag, Focus, TuiState};
use crate::shared::{InputEvent, MAX_HOTKEY_SOUNDS};

// poll for input from the terminal, track focus and drags in TuiState,
// and resolve keys and mouse gestures into input events for the backend
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(handle_key(key, ts)),
        Event::Mouse(mouse) => Ok(handle_mouse(mouse, ts)),
        _ => Ok(vec![]),
    }
}

fn handle_key(key: KeyEvent, ts: &mut TuiState) -> Vec<InputEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return vec![InputEvent::Quit];
    }
    match ts.focus {
        Focus::Board => board_key(key.code, ts),
        Focus::Search => search_key(key.code, ts),
        Focus::Results => results_key(key.code, ts),
    }
}

fn board_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => return vec![InputEvent::Quit],
        KeyCode::Char('b') => return vec![InputEvent::ToggleBoard],
        KeyCode::Char('y') => return vec![InputEvent::ToggleVideo],
        KeyCode::Char('m') => return vec![InputEvent::VoiceSearch],
        KeyCode::Char('/') if ts.video_open => {
            ts.focus = Focus::Search;
            return vec![];
        }
        KeyCode::Tab if ts.video_open => {
            ts.focus = Focus::Results;
            return vec![];
        }
        _ => {}
    }
    // everything below acts on the board, which has to be visible
    if !ts.board_open {
        return vec![];
    }
    match code {
        KeyCode::Char(c @ '1'..='9') => char_to_sound(c).map(InputEvent::DropSound).into_iter().collect(),
        KeyCode::Up => vec![InputEvent::SelectPrevTrack],
        KeyCode::Down => vec![InputEvent::SelectNextTrack],
        KeyCode::Char(' ') => vec![InputEvent::ToggleTrack],
        KeyCode::Char('+' | '=') => vec![InputEvent::TempoUp],
        KeyCode::Char('-') => vec![InputEvent::TempoDown],
        KeyCode::Char(']') => vec![InputEvent::VolumeUp],
        KeyCode::Char('[') => vec![InputEvent::VolumeDown],
        KeyCode::Char('p') => vec![InputEvent::PreviewTrack],
        KeyCode::Char('x') | KeyCode::Delete => vec![InputEvent::RemoveTrack],
        KeyCode::Char('S') => vec![InputEvent::StopAll],
        KeyCode::Char('t') => vec![InputEvent::SyncTempo],
        _ => vec![],
    }
}

fn search_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => {
            ts.focus = Focus::Board;
            vec![]
        }
        KeyCode::Tab => {
            ts.focus = Focus::Results;
            vec![]
        }
        KeyCode::Enter => vec![InputEvent::SubmitSearch],
        KeyCode::Backspace => vec![InputEvent::QueryBackspace],
        KeyCode::Char(c) => vec![InputEvent::QueryChar(c)],
        _ => vec![],
    }
}

fn results_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc | KeyCode::Tab => {
            ts.focus = Focus::Board;
            vec![]
        }
        KeyCode::Char('/') => {
            ts.focus = Focus::Search;
            vec![]
        }
        KeyCode::Up => vec![InputEvent::PrevResult],
        KeyCode::Down => vec![InputEvent::NextResult],
        KeyCode::Enter => vec![InputEvent::PlayResult],
        _ => vec![],
    }
}

// press on a catalog button starts a drag; releasing over the track list
// drops the sound there, releasing on the same button previews it
fn handle_mouse(mouse: MouseEvent, ts: &mut TuiState) -> Vec<InputEvent> {
    let (x, y) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(sound) = ts.hits.catalog_at(x, y) {
                ts.drag = Some(Drag { sound, x, y });
                return vec![];
            }
            if let Some(row) = ts.hits.track_at(x, y) {
                ts.focus = Focus::Board;
                return vec![InputEvent::SelectTrack(row)];
            }
            if let Some(result) = ts.hits.result_at(x, y) {
                ts.focus = Focus::Results;
                return vec![InputEvent::SelectResult(result)];
            }
            vec![]
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(drag) = ts.drag.as_mut() {
                drag.x = x;
                drag.y = y;
            }
            vec![]
        }
        MouseEventKind::Up(MouseButton::Left) => {
            let Some(drag) = ts.drag.take() else {
                return vec![];
            };
            if ts.hits.catalog_at(x, y) == Some(drag.sound) {
                vec![InputEvent::PreviewSound(drag.sound)]
            } else if ts.hits.over_track_list(x, y) {
                vec![InputEvent::DropSound(drag.sound)]
            } else {
                vec![]
            }
        }
        _ => vec![],
    }
}

// convert a number key to a catalog index
fn char_to_sound(c: char) -> Option<usize> {
    let n = c.to_digit(10)? as usize;
    (1..=MAX_HOTKEY_SOUNDS).contains(&n).then(|| n - 1)
}
