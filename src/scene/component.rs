use std::any::Any;

use crate::messaging::{Message, MessageContext};
use crate::scene::ObjectHandle;

/// Behaviour attached to an object.
///
/// Components are owned by the world and addressed through
/// [`ComponentHandle`](crate::scene::ComponentHandle)s. They are destroyed
/// together with their owner.
pub trait Component: Any + Send + Sync {
    /// A dynamic component forces its owner into the dynamic hierarchy.
    fn is_dynamic(&self) -> bool {
        false
    }

    /// Handles a message. Returns `true` if the message was consumed.
    fn on_message(&mut self, _ctx: &mut MessageContext<'_>, _message: &mut dyn Message) -> bool {
        false
    }
}

impl dyn Component {
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    #[inline]
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}

/// Storage slot of a component.
pub(crate) struct ComponentEntry {
    pub owner: ObjectHandle,
    pub component: Box<dyn Component>,
}
