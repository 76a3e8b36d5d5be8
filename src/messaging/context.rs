use std::time::Duration;

use crate::messaging::mailbox::Mailbox;
use crate::messaging::message::{Message, MessageTarget, QueueKind};
use crate::scene::{ComponentHandle, ObjectHandle};

/// Handed to [`Component::on_message`](crate::scene::Component::on_message).
///
/// Structural changes are not possible from inside a handler; instead the
/// handler queues them here and they are applied at the next sync point.
pub struct MessageContext<'a> {
    mailbox: &'a Mailbox,
    now: Duration,
    owner: ObjectHandle,
    component: ComponentHandle,
}

impl<'a> MessageContext<'a> {
    pub(crate) fn new(
        mailbox: &'a Mailbox,
        now: Duration,
        owner: ObjectHandle,
        component: ComponentHandle,
    ) -> Self {
        Self {
            mailbox,
            now,
            owner,
            component,
        }
    }

    /// Object owning the receiving component.
    #[inline]
    #[must_use]
    pub fn owner(&self) -> ObjectHandle {
        self.owner
    }

    /// The receiving component.
    #[inline]
    #[must_use]
    pub fn component(&self) -> ComponentHandle {
        self.component
    }

    /// Accumulated world time at delivery.
    #[inline]
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn post_message(
        &self,
        target: MessageTarget,
        message: Box<dyn Message>,
        delay: Duration,
    ) -> QueueKind {
        self.mailbox.post(target, message, self.now, delay)
    }

    /// Requests deletion of `object` at the next sync point.
    pub fn delete_object_delayed(&self, object: ObjectHandle, delete_empty_parents: bool) {
        self.mailbox.request_deletion(object, delete_empty_parents);
    }
}
