//! Per-session walk state.
//!
//! One [`SessionState`] exists per Inform-to-termination exchange with a
//! single device. The in-flight discovery target is carried inside
//! [`SessionPhase`] itself, so the "at most one outstanding RPC kind"
//! invariant holds by construction.

use std::collections::VecDeque;

use cwmp_model::{DataModel, Object};
use tracing::{debug, info};

/// Where the session is in the Inform → discovery → termination flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// No Inform received yet.
    AwaitingInform,
    /// InformResponse sent; waiting for the device's empty POST.
    AwaitingEmptyAck,
    /// A GetParameterNames is outstanding for `target`.
    AwaitingNameDiscovery { target: Object },
    /// A GetParameterValues is outstanding for `names`, which belong to the
    /// model object at index `object`.
    AwaitingValueDiscovery { object: usize, names: Vec<String> },
    /// Walk complete, termination sent.
    Terminated,
    /// Session aborted by a fault.
    Failed,
}

/// All mutable state for one walk session.
#[derive(Debug)]
pub struct SessionState {
    phase: SessionPhase,
    device_id: Option<String>,
    root_namespace: Option<String>,
    pending: VecDeque<Object>,
    model: DataModel,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::AwaitingInform,
            device_id: None,
            root_namespace: None,
            pending: VecDeque::new(),
            model: DataModel::new(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    /// Take the current phase for a transition, leaving `Failed` behind as
    /// the placeholder. Every transition must store its successor phase
    /// before returning; an early error return leaves the session failed.
    pub(crate) fn take_phase(&mut self) -> SessionPhase {
        std::mem::replace(&mut self.phase, SessionPhase::Failed)
    }

    /// Mark the session aborted.
    pub fn fail(&mut self) {
        self.phase = SessionPhase::Failed;
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        matches!(self.phase, SessionPhase::Terminated)
    }

    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub(crate) fn set_device_id(&mut self, device_id: String) {
        info!("device identity set: {device_id}");
        self.device_id = Some(device_id);
    }

    #[must_use]
    pub fn root_namespace(&self) -> Option<&str> {
        self.root_namespace.as_deref()
    }

    pub(crate) fn set_root_namespace(&mut self, namespace: String) {
        debug!("root data model set: {namespace}");
        self.root_namespace = Some(namespace);
    }

    /// Append objects awaiting a name-discovery round, FIFO.
    pub(crate) fn queue_pending(&mut self, objects: Vec<Object>) {
        if objects.is_empty() {
            return;
        }
        debug!(
            "queueing {} objects for name discovery ({} now pending)",
            objects.len(),
            self.pending.len() + objects.len()
        );
        self.pending.extend(objects);
    }

    /// Pop the next object awaiting name discovery.
    pub(crate) fn pop_pending(&mut self) -> Option<Object> {
        let object = self.pending.pop_front();
        if let Some(ref object) = object {
            debug!(
                "dequeued [{}] for name discovery ({} left pending)",
                object.path(),
                self.pending.len()
            );
        }
        object
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Record a fully name-discovered object and return its model index.
    pub(crate) fn add_object(&mut self, object: Object) -> usize {
        info!("object [{}] added to the data model", object.path());
        self.model.push(object)
    }

    pub(crate) fn object_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.model.get_mut(index)
    }

    /// The accumulated model so far.
    #[must_use]
    pub fn model(&self) -> &DataModel {
        &self.model
    }

    /// Consume the session, yielding the discovered model.
    #[must_use]
    pub fn into_model(self) -> DataModel {
        self.model
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
