//! Host container for live notes
//!
//! The host lives on the UI context. It owns every live note together with
//! the note's tick subscription, answers the bounds query notes test
//! themselves against, and detaches notes that fall out of view.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::app::broadcast::{BroadcastChannel, Subscription};
use crate::app::dispatch::{NoteTick, UiDispatcher};
use crate::domain::core::{Offset, Point, Rect};
use crate::domain::note::{Note, NoteId, NoteStep};

/// What processing one marshaled tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The note moved and is still visible
    Moved(Point),
    /// The note moved out of bounds and was detached
    Exited(Point),
    /// The note (or the whole host) was already gone
    Detached,
}

#[derive(Debug)]
struct NoteChild {
    note: Note,
    subscription: Subscription,
}

#[derive(Debug)]
pub struct NoteHost {
    bounds: Option<Rect>,
    children: BTreeMap<NoteId, NoteChild>,
    next_index: u64,
    step: Offset,
    note_size: i32,
}

impl NoteHost {
    pub fn new(bounds: Rect, step: Offset, note_size: i32) -> Self {
        Self {
            bounds: Some(bounds),
            children: BTreeMap::new(),
            next_index: 0,
            step,
            note_size,
        }
    }

    /// Current visible client area, `None` once the host is torn down
    pub fn bounds_rectangle(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = Some(bounds);
    }

    /// Creates a note at `at`, subscribes it and adds it as a child.
    ///
    /// The note's callback only marshals the tick onto the UI queue.
    ///
    /// # Arguments
    /// * `at` - Initial anchor position
    /// * `channel` - Channel the note subscribes to
    /// * `dispatcher` - Queue the note's ticks are posted through
    ///
    /// # Returns
    /// Identifier of the new child
    pub fn spawn_note(&mut self, at: Point, channel: &BroadcastChannel, dispatcher: &UiDispatcher) -> NoteId {
        self.next_index += 1;
        let id = NoteId(self.next_index);

        let dispatcher = dispatcher.clone();
        let subscription = channel.subscribe(move |tick| dispatcher.post(NoteTick { note: id, tick }));

        let note = Note::new(id, at, self.step, self.note_size);
        self.children.insert(id, NoteChild { note, subscription });
        debug!(note = %id, x = at.x, y = at.y, active = self.children.len(), "note spawned");

        id
    }

    /// Applies one tick to one note
    ///
    /// # Arguments
    /// * `work` - Marshaled tick, as drained from the UI queue
    ///
    /// # Returns
    /// `Moved` or `Exited` with the new position, or `Detached` if the note
    /// or the host is already gone
    pub fn handle_tick(&mut self, work: NoteTick) -> TickOutcome {
        let Some(bounds) = self.bounds else {
            trace!(note = %work.note, tick = work.tick.sequence, "host detached, tick ignored");
            return TickOutcome::Detached;
        };
        let Some(child) = self.children.get_mut(&work.note) else {
            trace!(note = %work.note, tick = work.tick.sequence, "note already detached, tick ignored");
            return TickOutcome::Detached;
        };

        match child.note.advance(bounds) {
            NoteStep::Inside(position) => TickOutcome::Moved(position),
            NoteStep::Exited(position) => {
                self.remove_child(work.note);
                debug!(
                    note = %work.note,
                    y = position.y,
                    ticks = work.tick.sequence,
                    active = self.children.len(),
                    "note left the window"
                );
                TickOutcome::Exited(position)
            }
        }
    }

    /// Unsubscribes a note and detaches it; `None` if it was not a child
    pub fn remove_child(&mut self, id: NoteId) -> Option<Note> {
        let child = self.children.get_mut(&id)?;
        child.subscription.cancel();
        self.children.remove(&id).map(|child| child.note)
    }

    /// Tears the host down: every note is unsubscribed and detached and the
    /// bounds become unavailable. Returns how many notes were detached.
    pub fn detach_all(&mut self) -> usize {
        let ids: Vec<NoteId> = self.children.keys().copied().collect();
        for id in &ids {
            self.remove_child(*id);
        }
        self.bounds = None;
        ids.len()
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.children.get(&id).map(|child| &child.note)
    }

    /// Live notes in creation order
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.children.values().map(|child| &child.note)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn note_size(&self) -> i32 {
        self.note_size
    }

    /// Window title text
    pub fn caption(&self) -> String {
        format!("{} Active Notes", self.children.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::broadcast::Tick;
    use crate::app::dispatch::{UiQueue, ui_channel};

    fn setup(height: i32) -> (NoteHost, BroadcastChannel, UiDispatcher, UiQueue) {
        let (dispatcher, queue) = ui_channel(None);
        let host = NoteHost::new(Rect::from_size(200, height), Offset::new(0, 10), 25);
        (host, BroadcastChannel::new(), dispatcher, queue)
    }

    fn pump(host: &mut NoteHost, queue: &UiQueue) -> Vec<TickOutcome> {
        std::iter::from_fn(|| queue.try_next()).map(|work| host.handle_tick(work)).collect()
    }

    #[test]
    fn spawn_subscribes_and_names_notes() {
        let (mut host, channel, dispatcher, _queue) = setup(100);
        let first = host.spawn_note(Point::new(10, 0), &channel, &dispatcher);
        let second = host.spawn_note(Point::new(20, 0), &channel, &dispatcher);

        assert_eq!(first.to_string(), "note1");
        assert_eq!(second.to_string(), "note2");
        assert_eq!(channel.subscriber_count(), 2);
        assert_eq!(host.caption(), "2 Active Notes");
    }

    #[test]
    fn note_exits_after_ten_ticks() {
        let (mut host, channel, dispatcher, queue) = setup(100);
        let id = host.spawn_note(Point::new(0, 0), &channel, &dispatcher);

        for sequence in 1..=9 {
            channel.deliver(Tick::new(sequence));
            let outcomes = pump(&mut host, &queue);
            assert_eq!(outcomes, vec![TickOutcome::Moved(Point::new(0, sequence as i32 * 10))]);
            assert_eq!(channel.subscriber_count(), 1);
        }

        channel.deliver(Tick::new(10));
        assert_eq!(pump(&mut host, &queue), vec![TickOutcome::Exited(Point::new(0, 100))]);
        assert!(host.note(id).is_none());
        assert_eq!(channel.subscriber_count(), 0);
        assert_eq!(host.caption(), "0 Active Notes");

        let report = channel.deliver(Tick::new(11));
        assert_eq!(report.invoked, 0);
        assert!(pump(&mut host, &queue).is_empty());
    }

    #[test]
    fn stale_ticks_for_removed_note_are_ignored() {
        let (mut host, channel, dispatcher, queue) = setup(100);
        host.spawn_note(Point::new(0, 90), &channel, &dispatcher);

        // Two deliveries land before the UI context gets to run
        channel.deliver(Tick::new(1));
        channel.deliver(Tick::new(2));

        let outcomes = pump(&mut host, &queue);
        assert_eq!(outcomes, vec![TickOutcome::Exited(Point::new(0, 100)), TickOutcome::Detached]);
        assert!(host.is_empty());
    }

    #[test]
    fn remove_child_unsubscribes_first() {
        let (mut host, channel, dispatcher, _queue) = setup(100);
        let id = host.spawn_note(Point::new(0, 0), &channel, &dispatcher);

        let note = host.remove_child(id).expect("note should be a child");
        assert_eq!(note.id(), id);
        assert_eq!(channel.subscriber_count(), 0);
        assert!(host.remove_child(id).is_none());
    }

    #[test]
    fn detached_host_ignores_ticks() {
        let (mut host, channel, dispatcher, queue) = setup(100);
        host.spawn_note(Point::new(0, 0), &channel, &dispatcher);
        channel.deliver(Tick::new(1));

        assert_eq!(host.detach_all(), 1);
        assert_eq!(host.bounds_rectangle(), None);
        assert_eq!(pump(&mut host, &queue), vec![TickOutcome::Detached]);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn shrinking_bounds_removes_notes_on_next_tick() {
        let (mut host, channel, dispatcher, queue) = setup(400);
        host.spawn_note(Point::new(0, 200), &channel, &dispatcher);

        host.set_bounds(Rect::from_size(200, 150));
        channel.deliver(Tick::new(1));
        assert_eq!(pump(&mut host, &queue), vec![TickOutcome::Exited(Point::new(0, 210))]);
    }
}
