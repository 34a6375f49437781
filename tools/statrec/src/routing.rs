use crate::types::OutputDestination;

/// Immutable set of destinations a single commit is delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationGroup {
    name: &'static str,
    destinations: Vec<OutputDestination>,
}

impl DestinationGroup {
    fn new(name: &'static str, destinations: &[OutputDestination]) -> Self {
        Self {
            name,
            destinations: destinations.to_vec(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn destinations(&self) -> &[OutputDestination] {
        &self.destinations
    }

    pub fn label(&self) -> String {
        self.destinations
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    results_only: DestinationGroup,
    summary_only: DestinationGroup,
    trace_only: DestinationGroup,
    all: DestinationGroup,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            results_only: DestinationGroup::new("results-only", &[OutputDestination::Results]),
            summary_only: DestinationGroup::new("summary-only", &[OutputDestination::Summary]),
            trace_only: DestinationGroup::new("trace-only", &[OutputDestination::Trace]),
            all: DestinationGroup::new("all", &OutputDestination::ALL),
        }
    }

    pub fn results_only(&self) -> &DestinationGroup {
        &self.results_only
    }

    pub fn summary_only(&self) -> &DestinationGroup {
        &self.summary_only
    }

    pub fn trace_only(&self) -> &DestinationGroup {
        &self.trace_only
    }

    pub fn all(&self) -> &DestinationGroup {
        &self.all
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}
