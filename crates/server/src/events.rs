use crate::types::{EventCursor, ServerEvent};
use airlock_core::Timestamp;

/// A ring buffer for storing events with cursor-based retrieval.
pub struct EventBuffer<E> {
    buffer: Vec<Option<ServerEvent<E>>>,
    capacity: usize,
    next_sequence: u64,
}

impl<E: Clone> EventBuffer<E> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: (0..capacity).map(|_| None).collect(),
            capacity,
            next_sequence: 0,
        }
    }

    pub fn push(&mut self, at: Timestamp, event: E) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let index = (sequence as usize) % self.capacity;
        self.buffer[index] = Some(ServerEvent {
            sequence,
            at,
            event,
        });
    }

    /// Events at or after `cursor`, plus a cursor past the last one returned.
    ///
    /// Events that have been overwritten are skipped silently.
    pub fn get_from_cursor(&self, cursor: EventCursor) -> (Vec<ServerEvent<E>>, EventCursor) {
        let oldest_available = self.next_sequence.saturating_sub(self.capacity as u64);
        let start = cursor.0.max(oldest_available);

        let events = (start..self.next_sequence)
            .filter_map(|seq| {
                self.buffer[(seq as usize) % self.capacity]
                    .as_ref()
                    .filter(|event| event.sequence == seq)
                    .cloned()
            })
            .collect();

        (events, EventCursor(self.next_sequence))
    }

    pub fn current_sequence(&self) -> u64 {
        self.next_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn cursor_continues_where_it_left_off() {
        let mut buffer: EventBuffer<&str> = EventBuffer::new(10);
        buffer.push(at(1), "joined");
        buffer.push(at(2), "solved");

        let (events, cursor) = buffer.get_from_cursor(EventCursor(0));
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].at, at(2));

        buffer.push(at(3), "cleared");
        let (events, cursor) = buffer.get_from_cursor(cursor);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence, 2);
        assert_eq!(events[0].event, "cleared");
        assert_eq!(cursor, EventCursor(3));
    }

    #[test]
    fn overflow_drops_the_oldest_events() {
        let mut buffer: EventBuffer<u32> = EventBuffer::new(3);
        for i in 0..10 {
            buffer.push(at(i as u64), i);
        }

        let (events, cursor) = buffer.get_from_cursor(EventCursor(0));
        assert_eq!(
            events.iter().map(|e| e.event).collect::<Vec<_>>(),
            vec![7, 8, 9]
        );
        assert_eq!(cursor.0, 10);
        assert_eq!(buffer.current_sequence(), 10);
    }

    #[test]
    fn empty_buffer_and_future_cursor_yield_nothing() {
        let buffer: EventBuffer<u32> = EventBuffer::new(4);
        let (events, cursor) = buffer.get_from_cursor(EventCursor(0));
        assert!(events.is_empty());
        assert_eq!(cursor.0, 0);

        let (events, _) = buffer.get_from_cursor(EventCursor(99));
        assert!(events.is_empty());
    }
}
