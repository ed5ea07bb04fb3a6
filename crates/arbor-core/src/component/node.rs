//! The component tree node.
//!
//! # 所有権のモデル
//! - 親へのリンクは `Weak`（非所有、構築後は不変）
//! - 子のリストは登録順に並ぶ
//! - `adopt()` された子は親が所有する（heap 相当）
//! - それ以外の子は登録だけで、所有者は別にいる（stack 相当）

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, trace};

use super::ids::ComponentId;
use crate::error::TreeError;
use crate::runtime::Reactor;

/// Anything that embeds a [`Component`].
///
/// Implementors get [`Dispatch`](super::Dispatch) for free once they are held
/// in an `Arc`.
pub trait AsComponent: Send + Sync + 'static {
    fn as_component(&self) -> &Component;
}

/// A node of the component tree.
///
/// Embed one in every type that takes part in the tree. The parent must
/// outlive the child; a child registers itself with its parent on
/// construction and deregisters on drop.
///
/// When a struct embeds both a `Component` and children built from it (a
/// [`Timer`](crate::Timer), say), declare the `Component` field last so the
/// children are dropped first.
pub struct Component {
    node: Arc<Node>,
}

struct Node {
    id: ComponentId,
    parent: Option<ParentLink>,
    scope: Scope,
    children: Mutex<Vec<Child>>,
}

struct ParentLink {
    id: ComponentId,
    node: Weak<Node>,
}

/// Where a node's reactor comes from.
pub(crate) enum Scope {
    Inherit,
    Owns(Reactor),
}

struct Child {
    id: ComponentId,
    owned: Option<Arc<dyn Any + Send + Sync>>,
}

impl Node {
    fn lock_children(&self) -> MutexGuard<'_, Vec<Child>> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn context(&self) -> Reactor {
        match &self.scope {
            Scope::Owns(reactor) => reactor.clone(),
            Scope::Inherit => match self.parent.as_ref().and_then(|link| link.node.upgrade()) {
                Some(parent) => parent.context(),
                None => panic!(
                    "{} resolved its reactor through a parent that no longer exists",
                    self.id
                ),
            },
        }
    }
}

impl Component {
    /// Create a component and register it with `parent`.
    pub fn new<P: AsComponent + ?Sized>(parent: &P) -> Self {
        Self::attach(Some(parent.as_component()), Scope::Inherit)
    }

    /// Bootstrap path for nodes that own their reactor.
    pub(crate) fn with_scope(parent: Option<&Component>, scope: Scope) -> Self {
        Self::attach(parent, scope)
    }

    fn attach(parent: Option<&Component>, scope: Scope) -> Self {
        let id = ComponentId::generate();
        let node = Arc::new(Node {
            id,
            parent: parent.map(|parent| ParentLink {
                id: parent.id(),
                node: Arc::downgrade(&parent.node),
            }),
            scope,
            children: Mutex::new(Vec::new()),
        });

        if let Some(parent) = parent {
            parent.node.lock_children().push(Child { id, owned: None });
            trace!(component = %id, parent = %parent.id(), "component registered");
        }

        Self { node }
    }

    pub fn id(&self) -> ComponentId {
        self.node.id
    }

    /// Id of the parent this component was built with, alive or not.
    pub fn parent_id(&self) -> Option<ComponentId> {
        self.node.parent.as_ref().map(|link| link.id)
    }

    pub fn has_live_parent(&self) -> bool {
        self.node
            .parent
            .as_ref()
            .is_some_and(|link| link.node.strong_count() > 0)
    }

    /// Ids of the registered children, in registration order.
    pub fn children(&self) -> Vec<ComponentId> {
        self.node.lock_children().iter().map(|child| child.id).collect()
    }

    pub fn child_count(&self) -> usize {
        self.node.lock_children().len()
    }

    /// The reactor executing this component's work.
    ///
    /// # Panics
    /// If an ancestor between this node and the owning root has already been
    /// dropped. That is a lifetime bug in the caller, not a recoverable state.
    pub fn context(&self) -> Reactor {
        self.node.context()
    }

    /// Queue `task` on this component's reactor.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.context().post(task);
    }

    /// Hand ownership of a registered child over to this component.
    ///
    /// The child is dropped together with this component, or earlier through
    /// [`dispose`](Self::dispose). The returned handle does not keep it alive.
    /// If `child` is not a registered child of this component it is dropped and
    /// an error is returned.
    pub fn adopt<T: AsComponent>(&self, child: T) -> Result<Weak<T>, TreeError> {
        let child_id = child.as_component().id();
        let child = Arc::new(child);
        let handle = Arc::downgrade(&child);

        let mut children = self.node.lock_children();
        let slot = children
            .iter()
            .position(|entry| entry.id == child_id && entry.owned.is_none());
        match slot {
            Some(index) => {
                children[index].owned = Some(child);
                trace!(component = %self.id(), child = %child_id, "child adopted");
                Ok(handle)
            }
            None => {
                // 子の drop が親のロックを取るので、先に解放する
                drop(children);
                drop(child);
                Err(TreeError::NotAChild {
                    parent: self.id(),
                    child: child_id,
                })
            }
        }
    }

    /// Drop an adopted child now. Returns `false` if `id` is not an adopted
    /// child of this component.
    pub fn dispose(&self, id: ComponentId) -> bool {
        let removed = {
            let mut children = self.node.lock_children();
            children
                .iter()
                .position(|entry| entry.id == id && entry.owned.is_some())
                .map(|index| children.remove(index))
        };

        match removed {
            Some(child) => {
                drop(child);
                trace!(component = %self.id(), child = %id, "child disposed");
                true
            }
            None => false,
        }
    }

    /// Drop every owned child, newest first.
    ///
    /// The list is detached before anything is dropped, so children that
    /// deregister themselves never touch it mid-teardown.
    pub(crate) fn release_children(&self) {
        let children = std::mem::take(&mut *self.node.lock_children());
        if children.is_empty() {
            return;
        }

        let attached = children.iter().filter(|child| child.owned.is_none()).count();
        if attached > 0 {
            debug!(
                component = %self.id(),
                attached,
                "torn down while children owned elsewhere are still alive"
            );
        }

        for child in children.into_iter().rev() {
            drop(child);
        }
    }
}

impl AsComponent for Component {
    fn as_component(&self) -> &Component {
        self
    }
}

impl Drop for Component {
    fn drop(&mut self) {
        self.release_children();

        let parent = self
            .node
            .parent
            .as_ref()
            .and_then(|link| link.node.upgrade());
        if let Some(parent) = parent {
            let id = self.node.id;
            parent.lock_children().retain(|child| child.id != id);
        }
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.node.id)
            .field("parent", &self.parent_id())
            .finish_non_exhaustive()
    }
}
