use crate::policy::broadcast::BroadcastPolicy;
use crate::policy::standard::StandardPolicy;
use crate::policy::trace::TracePolicy;
use crate::policy::RecordingPolicy;
use crate::types::PolicyKind;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
pub struct PolicyFactory {
    policies: BTreeMap<PolicyKind, Arc<dyn RecordingPolicy>>,
}

impl PolicyFactory {
    pub fn with_defaults() -> Self {
        let mut this = Self::default();
        this.register(Arc::new(StandardPolicy));
        this.register(Arc::new(TracePolicy));
        this.register(Arc::new(BroadcastPolicy));
        this
    }

    pub fn register(&mut self, policy: Arc<dyn RecordingPolicy>) {
        self.policies.insert(policy.kind(), policy);
    }

    pub fn get(&self, kind: PolicyKind) -> Option<Arc<dyn RecordingPolicy>> {
        self.policies.get(&kind).cloned()
    }
}
