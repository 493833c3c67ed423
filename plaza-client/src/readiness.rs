use std::collections::BTreeMap;

/// Independent conditions that must all hold before a join request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadinessStep {
    SceneBuilt,
    Connected,
    AssetsLoaded,
}

impl ReadinessStep {
    pub const ALL: [ReadinessStep; 3] = [
        ReadinessStep::SceneBuilt,
        ReadinessStep::Connected,
        ReadinessStep::AssetsLoaded,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StepStatus {
    #[default]
    Pending,
    Ready,
    /// Recoverable; the step can be retried without touching the others.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessGate {
    steps: BTreeMap<ReadinessStep, StepStatus>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        let steps = ReadinessStep::ALL
            .into_iter()
            .map(|step| (step, StepStatus::Pending))
            .collect();
        Self { steps }
    }

    pub fn status(&self, step: ReadinessStep) -> &StepStatus {
        static PENDING: StepStatus = StepStatus::Pending;
        self.steps.get(&step).unwrap_or(&PENDING)
    }

    /// Returns true when the status actually changed.
    pub fn set(&mut self, step: ReadinessStep, status: StepStatus) -> bool {
        let previous = self.steps.insert(step, status.clone());
        previous.as_ref() != Some(&status)
    }

    pub fn is_ready(&self) -> bool {
        self.steps.values().all(|s| *s == StepStatus::Ready)
    }

    /// Steps that are not yet `Ready`, in declaration order.
    pub fn outstanding(&self) -> Vec<ReadinessStep> {
        self.steps
            .iter()
            .filter(|(_, status)| **status != StepStatus::Ready)
            .map(|(step, _)| *step)
            .collect()
    }

    pub fn reset(&mut self) {
        for status in self.steps.values_mut() {
            *status = StepStatus::Pending;
        }
    }
}
