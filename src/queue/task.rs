use uuid::Uuid;

/// A request to advance one submission workflow until it completes or a
/// step fails.
#[derive(Debug, Clone)]
pub struct Task {
    pub workflow_id: Uuid,
    /// `<name> <version>` of the pod, for log output only.
    pub pod: String,
}

impl Task {
    pub fn description(&self) -> String {
        format!("Advance submission of {} ({})", self.pod, self.workflow_id)
    }
}
