//! Component tree: ownership, reactor resolution and dispatch.

mod dispatch;
mod ids;
mod node;

pub use self::dispatch::Dispatch;
pub use self::ids::ComponentId;
pub use self::node::{AsComponent, Component};

pub(crate) use self::node::Scope;
