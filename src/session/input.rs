// src/session/input.rs
//
// Input-event replay. Browser events are first translated into a plan by
// pure functions (testable without a display server), then applied through
// the `InputInjector` seam. The production injector uses enigo.
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use thiserror::Error;

use crate::models::frames::{KeyboardEventData, KeyboardEventKind, MouseEventData, MouseEventKind};

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("input backend unavailable: {0}")]
    Backend(String),

    #[error("injection failed: {0}")]
    Inject(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Click { x: i32, y: i32, button: MouseButton },
    Press { x: i32, y: i32, button: MouseButton },
    Release { x: i32, y: i32, button: MouseButton },
    Move { x: i32, y: i32 },
}

/// Named keys the dashboard may send. Anything outside this table that is
/// not a single printable character is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKey {
    Enter,
    Escape,
    Backspace,
    Tab,
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Tap(NamedKey),
    Char(char),
    /// Modifier chord. Held modifiers are pressed in the fixed order
    /// ctrl, alt, shift and released in reverse.
    Chord {
        ctrl: bool,
        alt: bool,
        shift: bool,
        ch: char,
    },
}

pub fn named_key(key: &str) -> Option<NamedKey> {
    let mapped = match key {
        "Enter" => NamedKey::Enter,
        "Escape" => NamedKey::Escape,
        "Backspace" => NamedKey::Backspace,
        "Tab" => NamedKey::Tab,
        "Space" => NamedKey::Space,
        "ArrowUp" => NamedKey::ArrowUp,
        "ArrowDown" => NamedKey::ArrowDown,
        "ArrowLeft" => NamedKey::ArrowLeft,
        "ArrowRight" => NamedKey::ArrowRight,
        "Delete" => NamedKey::Delete,
        "Home" => NamedKey::Home,
        "End" => NamedKey::End,
        "PageUp" => NamedKey::PageUp,
        "PageDown" => NamedKey::PageDown,
        _ => return None,
    };
    Some(mapped)
}

/// Translate a mouse event. Button 0 is the primary button; any other value
/// (or a missing one on non-click events) maps per the wire contract.
pub fn plan_mouse(data: &MouseEventData) -> MouseAction {
    let button = match data.button {
        None | Some(0) => MouseButton::Primary,
        Some(_) => MouseButton::Secondary,
    };
    match data.kind {
        MouseEventKind::Click => MouseAction::Click {
            x: data.x,
            y: data.y,
            button,
        },
        MouseEventKind::Mousedown => MouseAction::Press {
            x: data.x,
            y: data.y,
            button,
        },
        MouseEventKind::Mouseup => MouseAction::Release {
            x: data.x,
            y: data.y,
            button,
        },
        MouseEventKind::Mousemove => MouseAction::Move {
            x: data.x,
            y: data.y,
        },
    }
}

/// Translate a keyboard event. Only `keydown` is actionable; named keys use
/// the fixed table; a single printable character is case-folded to
/// lowercase; anything else yields `None` and is silently ignored.
pub fn plan_key(data: &KeyboardEventData) -> Option<KeyAction> {
    if data.kind != KeyboardEventKind::Keydown {
        return None;
    }

    if let Some(key) = named_key(&data.key) {
        return Some(KeyAction::Tap(key));
    }

    let mut chars = data.key.chars();
    let (first, rest) = (chars.next(), chars.next());
    let ch = match (first, rest) {
        (Some(ch), None) => ch.to_lowercase().next().unwrap_or(ch),
        _ => return None,
    };

    if data.ctrl_key || data.alt_key || data.shift_key {
        Some(KeyAction::Chord {
            ctrl: data.ctrl_key,
            alt: data.alt_key,
            shift: data.shift_key,
            ch,
        })
    } else {
        Some(KeyAction::Char(ch))
    }
}

pub trait InputInjector: Send {
    fn mouse(&mut self, action: MouseAction) -> Result<(), InjectError>;
    fn key(&mut self, action: KeyAction) -> Result<(), InjectError>;
}

/// Injector backed by enigo. The backend is created lazily so a missing
/// display at startup surfaces as a per-event failure, never a crash.
pub struct EnigoInjector {
    backend: Option<Enigo>,
}

impl EnigoInjector {
    pub fn new() -> Self {
        EnigoInjector { backend: None }
    }

    fn backend(&mut self) -> Result<&mut Enigo, InjectError> {
        if let Some(ref mut backend) = self.backend {
            return Ok(backend);
        }
        let backend = Enigo::new(&Settings::default())
            .map_err(|e| InjectError::Backend(e.to_string()))?;
        Ok(self.backend.insert(backend))
    }
}

impl Default for EnigoInjector {
    fn default() -> Self {
        Self::new()
    }
}

fn enigo_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Primary => Button::Left,
        MouseButton::Secondary => Button::Right,
    }
}

/// Drive a modifier chord through `stroke`: press the held modifiers in
/// order, click the character, then release in reverse. Releases run even
/// when a press or the character stroke fails, so a failed chord never
/// leaves a modifier held down on the host. The first error is returned.
fn run_chord<E>(
    held: &[Key],
    ch: char,
    stroke: &mut impl FnMut(Key, Direction) -> Result<(), E>,
) -> Result<(), E> {
    let mut outcome = Ok(());
    for modifier in held {
        if let Err(e) = stroke(*modifier, Direction::Press) {
            outcome = Err(e);
            break;
        }
    }
    if outcome.is_ok() {
        outcome = stroke(Key::Unicode(ch), Direction::Click);
    }
    for modifier in held.iter().rev() {
        let released = stroke(*modifier, Direction::Release);
        if outcome.is_ok() {
            outcome = released;
        }
    }
    outcome
}

fn enigo_key(key: NamedKey) -> Key {
    match key {
        NamedKey::Enter => Key::Return,
        NamedKey::Escape => Key::Escape,
        NamedKey::Backspace => Key::Backspace,
        NamedKey::Tab => Key::Tab,
        NamedKey::Space => Key::Space,
        NamedKey::ArrowUp => Key::UpArrow,
        NamedKey::ArrowDown => Key::DownArrow,
        NamedKey::ArrowLeft => Key::LeftArrow,
        NamedKey::ArrowRight => Key::RightArrow,
        NamedKey::Delete => Key::Delete,
        NamedKey::Home => Key::Home,
        NamedKey::End => Key::End,
        NamedKey::PageUp => Key::PageUp,
        NamedKey::PageDown => Key::PageDown,
    }
}

impl InputInjector for EnigoInjector {
    fn mouse(&mut self, action: MouseAction) -> Result<(), InjectError> {
        let backend = self.backend()?;
        let result = match action {
            MouseAction::Click { x, y, button } => backend
                .move_mouse(x, y, Coordinate::Abs)
                .and_then(|_| backend.button(enigo_button(button), Direction::Click)),
            MouseAction::Press { x, y, button } => backend
                .move_mouse(x, y, Coordinate::Abs)
                .and_then(|_| backend.button(enigo_button(button), Direction::Press)),
            MouseAction::Release { x, y, button } => backend
                .move_mouse(x, y, Coordinate::Abs)
                .and_then(|_| backend.button(enigo_button(button), Direction::Release)),
            MouseAction::Move { x, y } => backend.move_mouse(x, y, Coordinate::Abs),
        };
        result.map_err(|e| InjectError::Inject(e.to_string()))
    }

    fn key(&mut self, action: KeyAction) -> Result<(), InjectError> {
        let backend = self.backend()?;
        let result = match action {
            KeyAction::Tap(key) => backend.key(enigo_key(key), Direction::Click),
            KeyAction::Char(ch) => backend.key(Key::Unicode(ch), Direction::Click),
            KeyAction::Chord {
                ctrl,
                alt,
                shift,
                ch,
            } => {
                let mut held = Vec::new();
                if ctrl {
                    held.push(Key::Control);
                }
                if alt {
                    held.push(Key::Alt);
                }
                if shift {
                    held.push(Key::Shift);
                }
                run_chord(&held, ch, &mut |key, direction| backend.key(key, direction))
            }
        };
        result.map_err(|e| InjectError::Inject(e.to_string()))
    }
}
