//! Repositories: typed operations over the store's collections.

pub mod agent_repo;
pub mod env_repo;
pub mod job_repo;

pub use agent_repo::AgentRepo;
pub use env_repo::EnvRepo;
pub use job_repo::JobRepo;
