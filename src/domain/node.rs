use crate::domain::{
    DispatchId, Directive, OutcomeCode, RequestEvent, ResponseEvent, is_terminal_http_status,
};
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;
use thiserror::Error;

/// One function-call execution, possibly retried under the same id.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CallNode {
    pub function: String,
    pub failures: u32,
    pub responses: u32,
    pub outcome: Option<OutcomeCode>,
    pub last_error: Option<String>,
    pub running: bool,
    pub done: bool,
    pub creation_time: Option<SystemTime>,
    pub expiration_time: Option<SystemTime>,
    pub done_time: Option<SystemTime>,
    children: Vec<DispatchId>,
    child_set: HashSet<DispatchId>,
}

impl CallNode {
    /// A node with no history beyond the function it is about to run.
    pub fn fresh(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Self::default()
        }
    }

    pub fn children(&self) -> &[DispatchId] {
        &self.children
    }

    /// Appends `id` unless it is already a child. Returns whether it was added.
    pub fn add_child(&mut self, id: DispatchId) -> bool {
        if !self.child_set.insert(id.clone()) {
            return false;
        }
        self.children.push(id);
        true
    }
}

/// Where the forest keeps its nodes.
///
/// The default keeps every node for the life of the process. A bounded
/// implementation can be dropped in without touching classification or
/// rendering.
pub trait NodeStorage {
    fn get(&self, id: &DispatchId) -> Option<&CallNode>;

    fn get_mut(&mut self, id: &DispatchId) -> Option<&mut CallNode>;

    fn get_or_insert_default(&mut self, id: &DispatchId) -> &mut CallNode;

    fn len(&self) -> usize;

    fn contains(&self, id: &DispatchId) -> bool {
        self.get(id).is_some()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, Default)]
pub struct UnboundedNodes {
    nodes: HashMap<DispatchId, CallNode>,
}

impl NodeStorage for UnboundedNodes {
    fn get(&self, id: &DispatchId) -> Option<&CallNode> {
        self.nodes.get(id)
    }

    fn get_mut(&mut self, id: &DispatchId) -> Option<&mut CallNode> {
        self.nodes.get_mut(id)
    }

    fn get_or_insert_default(&mut self, id: &DispatchId) -> &mut CallNode {
        self.nodes.entry(id.clone()).or_default()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ObserveError {
    #[error("dispatch {id} names parent {parent}, which is neither known nor its root {root}")]
    UnknownParent {
        root: DispatchId,
        parent: DispatchId,
        id: DispatchId,
    },

    #[error("dispatch {0} names itself as its parent")]
    SelfParent(DispatchId),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub enum ResponseObservation {
    Recorded,
    /// No request was ever observed for this id; an empty node was created.
    UnknownDispatch,
}

/// The forest of calls, keyed by id, with roots in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct CallForest<S = UnboundedNodes> {
    roots: Vec<DispatchId>,
    root_set: HashSet<DispatchId>,
    nodes: S,
}

impl<S: NodeStorage + Default> CallForest<S> {
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            root_set: HashSet::new(),
            nodes: S::default(),
        }
    }
}

impl<S: NodeStorage> CallForest<S> {
    pub fn with_storage(nodes: S) -> Self {
        Self {
            roots: Vec::new(),
            root_set: HashSet::new(),
            nodes,
        }
    }

    pub fn roots(&self) -> &[DispatchId] {
        &self.roots
    }

    pub fn node(&self, id: &DispatchId) -> Option<&CallNode> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn has_calls(&self) -> bool {
        !self.roots.is_empty()
    }

    /// Records a request. Parent linkage is validated before anything is
    /// mutated, so a rejected request leaves the forest unchanged.
    pub fn observe_request(
        &mut self,
        event: &RequestEvent,
        now: SystemTime,
    ) -> Result<(), ObserveError> {
        let has_parent = !event.parent_id.is_empty();
        if has_parent && event.parent_id == event.id {
            return Err(ObserveError::SelfParent(event.id.clone()));
        }
        if has_parent && event.parent_id != event.root_id && !self.nodes.contains(&event.parent_id)
        {
            return Err(ObserveError::UnknownParent {
                root: event.root_id.clone(),
                parent: event.parent_id.clone(),
                id: event.id.clone(),
            });
        }

        if self.root_set.insert(event.root_id.clone()) {
            self.roots.push(event.root_id.clone());
        }
        self.nodes.get_or_insert_default(&event.root_id);

        let node = self.nodes.get_or_insert_default(&event.id);
        node.function = event.function.clone();
        node.running = true;
        if let Some(created) = event.creation_time {
            node.creation_time = Some(created);
        }
        if node.creation_time.is_none() {
            node.creation_time = Some(now);
        }
        if let Some(expires) = event.expiration_time {
            node.expiration_time = Some(expires);
        }

        if has_parent {
            let parent = self.nodes.get_or_insert_default(&event.parent_id);
            parent.add_child(event.id.clone());
        }
        Ok(())
    }

    pub fn observe_response(&mut self, event: &ResponseEvent, now: SystemTime) -> ResponseObservation {
        let observation = if self.nodes.contains(&event.id) {
            ResponseObservation::Recorded
        } else {
            ResponseObservation::UnknownDispatch
        };

        let node = self.nodes.get_or_insert_default(&event.id);
        node.responses += 1;
        node.last_error = None;
        node.outcome = None;
        node.running = false;

        if let Some(outcome) = &event.outcome {
            match outcome.code {
                OutcomeCode::Ok => {}
                OutcomeCode::IncompatibleState => {
                    // Retry counts from an incompatible worker state must not
                    // compound with the ones that follow.
                    *node = CallNode::fresh(std::mem::take(&mut node.function));
                }
                _ => node.failures += 1,
            }

            match &outcome.directive {
                Directive::Exit(exit) => {
                    node.outcome = Some(outcome.code);
                    node.done |= outcome.code.is_terminal();
                    if let Some(function) = &exit.tail_call {
                        *node = CallNode::fresh(function.clone());
                    } else if !outcome.code.is_success() {
                        if let Some(description) =
                            exit.error.as_ref().and_then(|error| error.describe())
                        {
                            node.last_error = Some(description);
                        }
                    }
                }
                Directive::Poll => {}
            }
        } else if let Some(status_code) = event.status_code {
            node.failures += 1;
            node.last_error = Some(format!("unexpected HTTP status code {status_code}"));
            node.done |= is_terminal_http_status(status_code);
        } else if let Some(error) = &event.error {
            node.failures += 1;
            node.last_error = Some(error.clone());
        }

        if node.done && node.done_time.is_none() {
            node.done_time = Some(now);
        }
        observation
    }
}
