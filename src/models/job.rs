use std::collections::BTreeMap;

use super::ParameterDefinition;

crate::wire_enum! {
    /// Lifecycle state of a job.
    pub enum JobStatus {
        Pending = "pending",
        Running = "running",
        Completed = "completed",
        Failed = "failed",
        Cancelled = "cancelled",
    }
}

crate::resource! {
    /// One step of a job; tasks run in list order.
    pub struct Task {
        id: String => read_only(),
        name: String,
        command: String,
        depends_on: Vec<String> => wire("dependsOn"),
        timeout_seconds: u64 => wire("timeoutSeconds").nullable(),
        status: JobStatus => read_only(),
    }
}

crate::resource! {
    /// A unit of work submitted to the job service.
    pub struct Job {
        id: String => read_only(),
        created_by: String => wire("createdBy").read_only(),
        modified_by: String => wire("modifiedBy").read_only(),
        created_at: String => wire("createdAt").read_only(),
        name: String,
        description: String => nullable(),
        status: JobStatus = JobStatus::Pending => wire("state"),
        priority: i32 = 0,
        labels: BTreeMap<String, String>,
        tasks: Vec<Task>,
        parameters: Vec<ParameterDefinition>,
    }
}
