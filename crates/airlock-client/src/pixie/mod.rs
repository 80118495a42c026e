//! The worker-supervision tree.
//!
//! A pixie is a long-lived component whose work is driven by the root
//! state. On every published snapshot the tree asks each pixie whether the
//! slice it watches changed since the snapshot it last handled, and only
//! then runs its update. The previous snapshot is passed in explicitly;
//! pixies keep no hidden "last value" of their own.
//!
//! Failures are contained per pixie: an update error goes to the
//! [`ErrorSink`], the failing pixie keeps its old snapshot (so the next
//! relevant transition retries it), and its siblings carry on.
//!
//! Teardown walks the tree in reverse and calls each pixie's `destroy`
//! exactly once, whether or not the pixie ever ran.

mod sink;
mod supervisor;
mod tasks;

use std::sync::Arc;

use tracing::debug;

use crate::state::RootState;
use crate::store::Store;

pub use sink::ErrorSink;
pub use supervisor::Supervisor;
pub use tasks::TaskSet;

/// What a pixie wants after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The pixie has reached its final configuration. It is never
    /// evaluated again, but is still destroyed with the tree.
    StopUpdates,
}

pub struct PixieInput<'a> {
    /// The snapshot this pixie last handled successfully, if any.
    pub prev: Option<&'a RootState>,
    pub state: &'a Arc<RootState>,
    pub store: &'a Store,
    /// Sink scoped to this pixie.
    pub errors: &'a ErrorSink,
}

pub trait Pixie: Send {
    fn name(&self) -> &str;

    /// Whether a transition from `prev` to `next` touches anything this
    /// pixie depends on.
    fn should_update(&self, prev: &RootState, next: &RootState) -> bool;

    fn update(&mut self, input: &PixieInput<'_>) -> anyhow::Result<Flow>;

    /// Release held resources. Called at most once.
    fn destroy(&mut self) {}
}

/// A pixie plus the bookkeeping the tree keeps for it.
pub struct PixieNode {
    pixie: Box<dyn Pixie>,
    last: Option<Arc<RootState>>,
    stopped: bool,
    destroyed: bool,
}

impl PixieNode {
    pub fn new(pixie: Box<dyn Pixie>) -> Self {
        Self {
            pixie,
            last: None,
            stopped: false,
            destroyed: false,
        }
    }

    pub fn name(&self) -> &str {
        self.pixie.name()
    }

    /// `true` once the node will never be evaluated again.
    pub fn is_stopped(&self) -> bool {
        self.stopped || self.destroyed
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn wants(&self, state: &Arc<RootState>) -> bool {
        if self.is_stopped() {
            return false;
        }
        match &self.last {
            None => true,
            Some(last) => !Arc::ptr_eq(last, state) && self.pixie.should_update(last, state),
        }
    }

    /// Run the pixie's update if its watched slice changed.
    /// Returns `true` if the update ran.
    pub fn evaluate(&mut self, state: &Arc<RootState>, store: &Store, errors: &ErrorSink) -> bool {
        if !self.wants(state) {
            return false;
        }

        let scoped = errors.child(self.pixie.name());
        let input = PixieInput {
            prev: self.last.as_deref(),
            state,
            store,
            errors: &scoped,
        };

        match self.pixie.update(&input) {
            Ok(flow) => {
                self.last = Some(state.clone());
                if flow == Flow::StopUpdates {
                    debug!(pixie = self.pixie.name(), "Pixie stopped updating");
                    self.stopped = true;
                }
            }
            Err(err) => errors.report(self.pixie.name(), err),
        }
        true
    }

    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.pixie.destroy();
        debug!(pixie = self.pixie.name(), "Pixie destroyed");
    }
}

/// A pixie made of child pixies.
///
/// Children are evaluated in order and destroyed in reverse order. The
/// group stops updating once every child has.
pub struct Combined {
    name: String,
    children: Vec<PixieNode>,
}

impl Combined {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Pixie>>) -> Self {
        Self {
            name: name.into(),
            children: children.into_iter().map(PixieNode::new).collect(),
        }
    }

    fn evaluate_children(&mut self, state: &Arc<RootState>, store: &Store, errors: &ErrorSink) -> bool {
        for child in &mut self.children {
            child.evaluate(state, store, errors);
        }
        self.children.iter().all(PixieNode::is_stopped)
    }

    fn destroy_children(&mut self) {
        for child in self.children.iter_mut().rev() {
            child.destroy();
        }
    }
}

impl Pixie for Combined {
    fn name(&self) -> &str {
        &self.name
    }

    // Each child filters on its own snapshot.
    fn should_update(&self, _prev: &RootState, _next: &RootState) -> bool {
        true
    }

    fn update(&mut self, input: &PixieInput<'_>) -> anyhow::Result<Flow> {
        let all_stopped = self.evaluate_children(input.state, input.store, input.errors);
        Ok(if all_stopped {
            Flow::StopUpdates
        } else {
            Flow::Continue
        })
    }

    fn destroy(&mut self) {
        self.destroy_children();
    }
}

/// The root of the tree.
pub struct PixieTree {
    root: Combined,
    destroyed: bool,
}

impl PixieTree {
    pub fn new(pixies: Vec<Box<dyn Pixie>>) -> Self {
        Self {
            root: Combined::new("", pixies),
            destroyed: false,
        }
    }

    pub fn evaluate(&mut self, state: &Arc<RootState>, store: &Store, errors: &ErrorSink) {
        if self.destroyed {
            return;
        }
        self.root.evaluate_children(state, store, errors);
    }

    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.root.destroy_children();
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
