//! Input event types delivered by the platform's event pump.
//!
//! The pump decodes raw input into these values and hands them to the
//! current screen via [`Form::key_event`](super::form::Form::key_event)
//! and [`Form::pointer_event`](super::form::Form::pointer_event).

use trellis_core::geometry::Point;

/// Direction of a traversal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Whether this direction moves toward earlier items.
    #[inline]
    pub fn is_backward(self) -> bool {
        matches!(self, Self::Up | Self::Left)
    }

    /// The opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Logical key identity after platform decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Up,
    Down,
    Left,
    Right,
    /// The select / fire key.
    Select,
    /// The back / clear key.
    Back,
    /// A printable character.
    Char(char),
}

impl KeyCode {
    /// The traversal direction for a directional key.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Up => Some(Direction::Up),
            Self::Down => Some(Direction::Down),
            Self::Left => Some(Direction::Left),
            Self::Right => Some(Direction::Right),
            _ => None,
        }
    }
}

/// A decoded key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    /// Set when the key is auto-repeating while held.
    pub repeat: bool,
}

impl KeyEvent {
    /// A plain (non-repeating) key press.
    pub fn pressed(code: KeyCode) -> Self {
        Self {
            code,
            repeat: false,
        }
    }
}

/// Phase of a pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Pressed,
    Dragged,
    Released,
}

/// A decoded pointer event in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub position: Point,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_of_keys() {
        assert_eq!(KeyCode::Up.direction(), Some(Direction::Up));
        assert_eq!(KeyCode::Select.direction(), None);
        assert_eq!(KeyCode::Char('a').direction(), None);
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(Direction::Up.opposite(), Direction::Down);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
    }
}
