use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::messaging::message::{Message, MessageTarget, QueueKind};
use crate::scene::ObjectHandle;

/// A message waiting in one of the queues.
#[derive(Debug)]
pub(crate) struct QueuedMessage {
    pub target: MessageTarget,
    pub due: Duration,
    pub sorting_key: i32,
    pub sequence: u64,
    pub message: Box<dyn Message>,
}

impl QueuedMessage {
    #[inline]
    fn order_key(&self) -> (Duration, i32, u64) {
        (self.due, self.sorting_key, self.sequence)
    }
}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.order_key() == other.order_key()
    }
}

impl Eq for QueuedMessage {}

impl PartialOrd for QueuedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

/// A deferred deletion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeletionRequest {
    pub object: ObjectHandle,
    pub delete_empty_parents: bool,
}

#[derive(Debug, Default)]
struct Queues {
    /// Delivered wholesale at the next update; the vector keeps its capacity.
    next_frame: Vec<QueuedMessage>,
    /// Min-ordered by due time, individually owned entries.
    delayed: BinaryHeap<Reverse<QueuedMessage>>,
    sequence: u64,
}

#[derive(Debug, Default)]
struct Deletions {
    requests: Vec<DeletionRequest>,
    /// Requests before this index were already seen by the world.
    seen: usize,
}

/// Thread-safe inbox for queued messages and deferred deletions.
///
/// Posting only needs `&self`, so readers holding a shared world reference
/// (and message handlers) can queue work for the next sync point.
#[derive(Debug, Default)]
pub struct Mailbox {
    queues: Mutex<Queues>,
    deletions: Mutex<Deletions>,
}

impl Mailbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a message. A zero `delay` targets the next-frame queue,
    /// anything else the delayed queue with `due = now + delay`.
    pub fn post(
        &self,
        target: MessageTarget,
        message: Box<dyn Message>,
        now: Duration,
        delay: Duration,
    ) -> QueueKind {
        let mut queues = self.queues.lock();
        queues.sequence += 1;
        let queued = QueuedMessage {
            target,
            due: now + delay,
            sorting_key: message.sorting_key(),
            sequence: queues.sequence,
            message,
        };

        if delay.is_zero() {
            queues.next_frame.push(queued);
            QueueKind::NextFrame
        } else {
            queues.delayed.push(Reverse(queued));
            QueueKind::Delayed
        }
    }

    /// Swaps the pending next-frame batch into `batch` (expected empty) and
    /// returns it sorted by sorting key and posting order. Messages posted
    /// while the batch is delivered land in the fresh queue.
    pub(crate) fn take_next_frame(&self, batch: &mut Vec<QueuedMessage>) {
        std::mem::swap(&mut self.queues.lock().next_frame, batch);
        batch.sort_unstable_by_key(|m| (m.sorting_key, m.sequence));
    }

    /// Pops the earliest delayed message if it is due at `now`.
    pub(crate) fn pop_due(&self, now: Duration) -> Option<QueuedMessage> {
        let mut queues = self.queues.lock();
        if queues.delayed.peek().is_some_and(|Reverse(m)| m.due <= now) {
            queues.delayed.pop().map(|Reverse(m)| m)
        } else {
            None
        }
    }

    pub fn request_deletion(&self, object: ObjectHandle, delete_empty_parents: bool) {
        self.deletions.lock().requests.push(DeletionRequest {
            object,
            delete_empty_parents,
        });
    }

    /// Calls `visit` for every deletion request queued since the previous
    /// call, so the world can mark those objects as pending deletion.
    pub(crate) fn drain_new_deletion_requests(&self, mut visit: impl FnMut(ObjectHandle)) {
        let mut deletions = self.deletions.lock();
        let Deletions { requests, seen } = &mut *deletions;
        for request in &requests[*seen..] {
            visit(request.object);
        }
        *seen = requests.len();
    }

    pub(crate) fn take_deletion_requests(&self, out: &mut Vec<DeletionRequest>) {
        let mut deletions = self.deletions.lock();
        out.append(&mut deletions.requests);
        deletions.seen = 0;
    }

    #[must_use]
    pub fn pending_deletion_count(&self) -> usize {
        self.deletions.lock().requests.len()
    }

    /// Number of messages waiting in the given queue.
    #[must_use]
    pub fn queued_count(&self, kind: QueueKind) -> usize {
        let queues = self.queues.lock();
        match kind {
            QueueKind::NextFrame => queues.next_frame.len(),
            QueueKind::Delayed => queues.delayed.len(),
        }
    }

    /// Drops every queued message and deletion request. Returns the number of
    /// dropped messages.
    pub fn clear(&self) -> usize {
        let mut queues = self.queues.lock();
        let dropped = queues.next_frame.len() + queues.delayed.len();
        queues.next_frame.clear();
        queues.delayed.clear();
        let mut deletions = self.deletions.lock();
        deletions.requests.clear();
        deletions.seen = 0;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    #[derive(Debug)]
    struct Ping(i32);

    impl Message for Ping {
        fn sorting_key(&self) -> i32 {
            self.0
        }
    }

    fn target() -> MessageTarget {
        MessageTarget::Object(ObjectHandle::from(KeyData::from_ffi(1 << 32)))
    }

    fn ping_value(m: &QueuedMessage) -> i32 {
        m.message.downcast_ref::<Ping>().map_or(i32::MIN, |p| p.0)
    }

    #[test]
    fn zero_delay_goes_to_next_frame() {
        let mailbox = Mailbox::new();
        let kind = mailbox.post(target(), Box::new(Ping(0)), Duration::ZERO, Duration::ZERO);

        assert_eq!(kind, QueueKind::NextFrame);
        assert_eq!(mailbox.queued_count(QueueKind::NextFrame), 1);
        assert_eq!(mailbox.queued_count(QueueKind::Delayed), 0);
    }

    #[test]
    fn next_frame_batch_sorted_by_key_then_posting_order() {
        let mailbox = Mailbox::new();
        for key in [2, 1, 2, 0] {
            mailbox.post(target(), Box::new(Ping(key)), Duration::ZERO, Duration::ZERO);
        }

        let mut batch = Vec::new();
        mailbox.take_next_frame(&mut batch);
        let keys: Vec<_> = batch.iter().map(ping_value).collect();
        let sequences: Vec<_> = batch.iter().map(|m| m.sequence).collect();

        assert_eq!(keys, vec![0, 1, 2, 2]);
        assert_eq!(sequences, vec![4, 2, 1, 3]);
        assert_eq!(mailbox.queued_count(QueueKind::NextFrame), 0);
    }

    #[test]
    fn delayed_messages_pop_in_due_order() {
        let mailbox = Mailbox::new();
        let now = Duration::from_secs(1);
        mailbox.post(target(), Box::new(Ping(30)), now, Duration::from_millis(30));
        mailbox.post(target(), Box::new(Ping(10)), now, Duration::from_millis(10));
        mailbox.post(target(), Box::new(Ping(20)), now, Duration::from_millis(20));

        assert!(mailbox.pop_due(now).is_none());

        let later = now + Duration::from_millis(20);
        let first = mailbox.pop_due(later).expect("due");
        let second = mailbox.pop_due(later).expect("due");
        assert_eq!((ping_value(&first), ping_value(&second)), (10, 20));
        assert!(mailbox.pop_due(later).is_none());
        assert_eq!(mailbox.queued_count(QueueKind::Delayed), 1);
    }

    #[test]
    fn new_deletion_requests_are_reported_once() {
        let mailbox = Mailbox::new();
        let object = ObjectHandle::from(KeyData::from_ffi(1 << 32));
        mailbox.request_deletion(object, false);

        let mut seen = Vec::new();
        mailbox.drain_new_deletion_requests(|handle| seen.push(handle));
        mailbox.drain_new_deletion_requests(|handle| seen.push(handle));
        assert_eq!(seen, vec![object]);
        assert_eq!(mailbox.pending_deletion_count(), 1);

        let mut requests = Vec::new();
        mailbox.take_deletion_requests(&mut requests);
        mailbox.request_deletion(object, true);
        mailbox.drain_new_deletion_requests(|handle| seen.push(handle));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn clear_drops_everything() {
        let mailbox = Mailbox::new();
        mailbox.post(target(), Box::new(Ping(0)), Duration::ZERO, Duration::ZERO);
        mailbox.post(target(), Box::new(Ping(0)), Duration::ZERO, Duration::from_secs(5));

        assert_eq!(mailbox.clear(), 2);
        assert_eq!(mailbox.queued_count(QueueKind::Delayed), 0);
    }
}
