//! Representative resources of the job, auth and resource management APIs.

mod job;
mod parameter;
mod user;

pub use job::{Job, JobStatus, Task};
pub use parameter::{
    BooleanParameter, ChoiceParameter, FloatParameter, IntegerParameter, ParameterDefinition,
    PathParameter, StringParameter,
};
pub use user::User;
