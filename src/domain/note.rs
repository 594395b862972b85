//! Falling note entity
//!
//! A note is a small square that moves by a fixed step on every tick it
//! processes. Motion and the bounds test live here; subscription and
//! detachment are handled by the host that owns the note.

use std::fmt;

use crate::domain::core::{Offset, Point, Rect};

/// Identifier of a note within its host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note{}", self.0)
    }
}

/// Result of advancing a note by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStep {
    /// The note moved and its anchor is still inside the bounds
    Inside(Point),
    /// The note moved and its anchor left the bounds
    Exited(Point),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    id: NoteId,
    position: Point,
    step: Offset,
    size: i32,
    ticks: u32,
    alive: bool,
}

impl Note {
    pub fn new(id: NoteId, position: Point, step: Offset, size: i32) -> Self {
        Self {
            id,
            position,
            step,
            size,
            ticks: 0,
            alive: true,
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    /// Anchor point (top-left corner) used for the bounds test
    pub fn position(&self) -> Point {
        self.position
    }

    /// Visual extent, used only for rendering
    pub fn extent(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size, self.size)
    }

    /// Number of ticks this note has processed
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Moves the note one step and tests the new anchor against `bounds`.
    ///
    /// A note that has already exited does not move again.
    pub fn advance(&mut self, bounds: Rect) -> NoteStep {
        if !self.alive {
            return NoteStep::Exited(self.position);
        }

        self.position = self.position.offset_by(self.step);
        self.ticks += 1;

        if bounds.contains(self.position) {
            NoteStep::Inside(self.position)
        } else {
            self.alive = false;
            NoteStep::Exited(self.position)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn falling(at: Point) -> Note {
        Note::new(NoteId(1), at, Offset::new(0, 10), 25)
    }

    #[test]
    fn advances_one_step_per_tick() {
        let mut note = falling(Point::new(40, 0));
        let bounds = Rect::from_size(200, 100);

        for expected in 1..=9 {
            assert_eq!(note.advance(bounds), NoteStep::Inside(Point::new(40, expected * 10)));
        }
        assert_eq!(note.advance(bounds), NoteStep::Exited(Point::new(40, 100)));
        assert_eq!(note.ticks(), 10);
        assert!(!note.is_alive());
    }

    #[test]
    fn exited_note_stays_put() {
        let mut note = falling(Point::new(0, 95));
        let bounds = Rect::from_size(50, 100);

        assert!(matches!(note.advance(bounds), NoteStep::Exited(_)));
        assert!(matches!(note.advance(bounds), NoteStep::Exited(_)));
        assert_eq!(note.position(), Point::new(0, 105));
        assert_eq!(note.ticks(), 1);
    }

    #[test]
    fn extent_is_visual_only() {
        let note = falling(Point::new(10, 20));
        assert_eq!(note.extent(), Rect::new(10, 20, 25, 25));
        assert_eq!(note.id().to_string(), "note1");
    }
}
