pub mod compose;
pub mod correlate;
pub mod docker;
pub mod dockerfile;
pub mod git;
pub mod health;
pub mod http_health;
pub mod net;
pub mod project;
pub mod report;
pub mod runtime;
pub mod tools;

pub use compose::{Classification, ComposeModel, ServiceDefinition};
pub use correlate::Correlation;
pub use docker::DockerManager;
pub use health::{HealthChecker, HealthStatus, ServiceHealthResult, Strategy};
pub use report::HealthReport;
