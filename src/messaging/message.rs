use std::any::Any;
use std::fmt;

use crate::scene::{ComponentHandle, ObjectHandle};

/// A message delivered to components.
///
/// Any `'static` type that is `Send + Sync + Debug` can be a message:
///
/// ```rust,ignore
/// #[derive(Debug)]
/// struct Damage { amount: f32 }
/// impl Message for Damage {}
///
/// world.post_message(MessageTarget::Object(enemy), Box::new(Damage { amount: 5.0 }), Duration::ZERO);
/// ```
///
/// Queued messages due at the same time are delivered in ascending
/// [`sorting_key`](Message::sorting_key) order, then in posting order.
pub trait Message: Any + Send + Sync + fmt::Debug {
    fn sorting_key(&self) -> i32 {
        0
    }
}

impl dyn Message {
    #[inline]
    #[must_use]
    pub fn is<T: Message>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }

    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    #[inline]
    pub fn downcast_mut<T: Message>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}

/// Receiver of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTarget {
    /// Every component of one object.
    Object(ObjectHandle),
    /// Every component of an object and of its whole subtree.
    Recursive(ObjectHandle),
    /// One component.
    Component(ComponentHandle),
}

/// When a message is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// At the start of the next update.
    NextFrame,
    /// Once the accumulated clock time reaches the due time.
    Delayed,
}
