//! Deployment of generated build recipes
//!
//! [`DeploymentManager`] materializes a repository's recipe and generated files,
//! hands them to a [`ContainerRuntime`], and records the running container both
//! in its [`ContainerRegistry`] and on the repository record.

mod docker;
mod manager;
mod port;
mod registry;
mod runtime;
mod stub;

pub use docker::DockerRuntime;
pub use manager::{DeployConfig, DeployOptions, DeployOutcome, DeploymentManager};
pub use port::allocate_port;
pub use registry::{ContainerRecord, ContainerRegistry, PortReservation};
pub use runtime::{ContainerRuntime, RuntimeError};
pub use stub::StubRuntime;
