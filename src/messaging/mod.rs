//! Messaging
//!
//! Three delivery modes:
//!
//! | mode | API | delivered |
//! |---|---|---|
//! | Immediate | `World::send_message` | synchronously, before the call returns |
//! | NextFrame | `World::post_message` with zero delay | at the start of the next update |
//! | Delayed | `World::post_message` with a delay | once the accumulated clock time reaches the due time |
//!
//! Queued messages live in the world's [`Mailbox`]; posting only needs shared
//! access, so it is safe during traversal and from message handlers.

pub mod context;
pub mod mailbox;
pub mod message;

pub use context::MessageContext;
pub use mailbox::Mailbox;
pub use message::{Message, MessageTarget, QueueKind};
