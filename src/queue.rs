//! Fixed ring of frame slots shared between the tick handler and the consumer.
//!
//! `head` is the slot being written and belongs to the producer until it is
//! committed with [`FrameQueue::advance_head`]. `tail` is the oldest unread
//! slot. `tail == head` means empty, so one slot is always the write slot and
//! at most `N - 1` committed frames are held.

use crate::frame::Frame;

/// Number of frame slots in the decoder's queue.
pub const QUEUE_SLOTS: usize = 8;

/// Result of committing the frame under construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub enum Commit {
    Stored,
    /// The queue was full and the oldest unread frame was dropped.
    Overrun,
}

#[derive(Debug)]
pub struct FrameQueue<const N: usize = QUEUE_SLOTS> {
    slots: [Frame; N],
    head: usize,
    tail: usize,
}

impl<const N: usize> FrameQueue<N> {
    /// Committed frames the queue can hold without overrun.
    pub const CAPACITY: usize = N - 1;

    pub fn new() -> Self {
        assert!(N >= 2, "a frame queue needs at least two slots");
        Self {
            slots: core::array::from_fn(|_| Frame::new()),
            head: 0,
            tail: 0,
        }
    }

    /// Drop all frames, committed or in progress.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.slots[0].reset();
    }

    /// The frame at `head`, owned by the producer until the next advance.
    pub fn current_write_frame(&mut self) -> &mut Frame {
        &mut self.slots[self.head]
    }

    /// Commit the frame at `head`. Drop-oldest on a full queue.
    pub fn advance_head(&mut self) -> Commit {
        self.head = Self::next(self.head);
        if self.head == self.tail {
            self.tail = Self::next(self.tail);
            Commit::Overrun
        } else {
            Commit::Stored
        }
    }

    /// Copy out the oldest committed frame, then release its slot.
    pub fn try_pop(&mut self) -> Option<Frame> {
        if self.is_empty() {
            return None;
        }
        let frame = self.slots[self.tail].clone();
        self.tail = Self::next(self.tail);
        Some(frame)
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Number of committed, unread frames.
    pub fn len(&self) -> usize {
        (self.head + N - self.tail) % N
    }

    const fn next(index: usize) -> usize {
        if index + 1 >= N {
            0
        } else {
            index + 1
        }
    }
}

impl<const N: usize> Default for FrameQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit<const N: usize>(q: &mut FrameQueue<N>, id: u8) -> Commit {
        let f = q.current_write_frame();
        f.reset();
        f.push_byte(id);
        q.advance_head()
    }

    #[test]
    fn test_fifo_order() {
        let mut q = FrameQueue::<QUEUE_SLOTS>::new();
        assert_eq!(q.try_pop(), None);
        for id in 0..FrameQueue::<QUEUE_SLOTS>::CAPACITY as u8 {
            assert_eq!(commit(&mut q, id), Commit::Stored);
        }
        assert_eq!(q.len(), 7);
        for id in 0..7 {
            assert_eq!(q.try_pop().unwrap().as_bytes(), &[id]);
        }
        assert!(q.is_empty());
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn test_overrun_drops_oldest() {
        let mut q = FrameQueue::<QUEUE_SLOTS>::new();
        let overruns = (0..8u8)
            .map(|id| commit(&mut q, id))
            .filter(|c| *c == Commit::Overrun)
            .count();
        assert_eq!(overruns, 1);
        assert_eq!(q.len(), FrameQueue::<QUEUE_SLOTS>::CAPACITY);
        for id in 1..8 {
            assert_eq!(q.try_pop().unwrap()[0], id);
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_interleaved_wraparound() {
        let mut q = FrameQueue::<3>::new();
        for id in 0..20u8 {
            assert_eq!(commit(&mut q, id), Commit::Stored);
            assert_eq!(q.len(), 1);
            assert_eq!(q.try_pop().unwrap()[0], id);
        }
        assert_eq!(commit(&mut q, 20), Commit::Stored);
        assert_eq!(commit(&mut q, 21), Commit::Stored);
        assert_eq!(commit(&mut q, 22), Commit::Overrun);
        assert_eq!(q.try_pop().unwrap()[0], 21);
        assert_eq!(q.try_pop().unwrap()[0], 22);
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn test_in_progress_frame_not_visible() {
        let mut q = FrameQueue::<QUEUE_SLOTS>::new();
        q.current_write_frame().push_byte(9);
        assert_eq!(q.try_pop(), None);
        q.clear();
        assert!(q.current_write_frame().is_empty());
    }
}
