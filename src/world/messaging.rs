use std::time::Duration;

use slotmap::SlotMap;

use crate::messaging::{Mailbox, Message, MessageContext, MessageTarget, QueueKind};
use crate::scene::component::ComponentEntry;
use crate::scene::object::ObjectFlags;
use crate::scene::object_storage::ObjectStorage;
use crate::scene::{ComponentHandle, ObjectHandle};
use crate::world::World;
use crate::world::objects::collect_subtree;

impl World {
    /// Delivers a message synchronously. Returns `true` if any component
    /// handled it.
    ///
    /// Objects marked for deletion still receive messages. Objects whose
    /// deletion was requested by a handler are marked pending on return.
    pub fn send_message(&mut self, target: MessageTarget, message: &mut dyn Message) -> bool {
        let handled = self.deliver(target, message);
        self.mark_requested_deletions();
        handled
    }

    fn deliver(&mut self, target: MessageTarget, message: &mut dyn Message) -> bool {
        let now = self.clock.accumulated_time();
        let Self {
            objects,
            components,
            mailbox,
            frame,
            ..
        } = self;

        match target {
            MessageTarget::Object(handle) => {
                deliver_to_object(objects, components, mailbox, now, handle, message)
            }
            MessageTarget::Recursive(root) => {
                let mut handled = false;
                for &handle in &collect_subtree(objects, root, frame.bump_mut()) {
                    handled |= deliver_to_object(objects, components, mailbox, now, handle, message);
                }
                handled
            }
            MessageTarget::Component(component) => {
                deliver_to_component(components, mailbox, now, component, message)
            }
        }
    }

    /// Flags every object with a deletion request queued in the mailbox since
    /// the last call.
    pub(crate) fn mark_requested_deletions(&mut self) {
        let objects = &mut self.objects;
        self.mailbox.drain_new_deletion_requests(|handle| {
            if let Some(object) = objects.get_mut(handle) {
                object.flags.insert(ObjectFlags::PENDING_DELETION);
            }
        });
    }

    /// Shorthand for sending to an object and its whole subtree.
    pub fn send_message_recursive(&mut self, root: ObjectHandle, message: &mut dyn Message) -> bool {
        self.send_message(MessageTarget::Recursive(root), message)
    }

    /// Queues a message: zero `delay` delivers at the next update, a positive
    /// one once the accumulated clock time passes `now + delay`.
    ///
    /// Only needs shared access, so it can be called during traversal or
    /// through a read lock.
    pub fn post_message(
        &self,
        target: MessageTarget,
        message: Box<dyn Message>,
        delay: Duration,
    ) -> QueueKind {
        self.mailbox
            .post(target, message, self.clock.accumulated_time(), delay)
    }

    /// Shorthand for posting to an object and its whole subtree.
    pub fn post_message_recursive(
        &self,
        root: ObjectHandle,
        message: Box<dyn Message>,
        delay: Duration,
    ) -> QueueKind {
        self.post_message(MessageTarget::Recursive(root), message, delay)
    }

    #[inline]
    #[must_use]
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Delivers the next-frame queue, then every delayed message that is due.
    /// Returns the number of delivered messages.
    ///
    /// Messages posted during delivery are not delivered in the same call.
    pub fn process_queued_messages(&mut self) -> usize {
        let now = self.clock.accumulated_time();

        let mut batch = std::mem::take(&mut self.message_batch);
        self.mailbox.take_next_frame(&mut batch);
        let mut delivered = batch.len();
        for mut queued in batch.drain(..) {
            self.send_message(queued.target, queued.message.as_mut());
        }
        self.message_batch = batch;

        while let Some(mut queued) = self.mailbox.pop_due(now) {
            self.send_message(queued.target, queued.message.as_mut());
            delivered += 1;
        }

        delivered
    }
}

fn deliver_to_object(
    objects: &ObjectStorage,
    components: &mut SlotMap<ComponentHandle, ComponentEntry>,
    mailbox: &Mailbox,
    now: Duration,
    handle: ObjectHandle,
    message: &mut dyn Message,
) -> bool {
    let Some(object) = objects.get(handle) else {
        log::debug!("dropping {message:?}: receiver {handle:?} no longer exists");
        return false;
    };

    let mut handled = false;
    for &component in &object.components {
        handled |= deliver_to_component(components, mailbox, now, component, message);
    }
    handled
}

fn deliver_to_component(
    components: &mut SlotMap<ComponentHandle, ComponentEntry>,
    mailbox: &Mailbox,
    now: Duration,
    component: ComponentHandle,
    message: &mut dyn Message,
) -> bool {
    let Some(entry) = components.get_mut(component) else {
        log::debug!("dropping {message:?}: component {component:?} no longer exists");
        return false;
    };
    let mut ctx = MessageContext::new(mailbox, now, entry.owner, component);
    entry.component.on_message(&mut ctx, message)
}
