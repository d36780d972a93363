pub mod agents;
pub mod envs;
pub mod jobs;
