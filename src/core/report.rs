/// Service health report assembly

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::health::{HealthStatus, ServiceHealthResult};

pub const REPORT_TITLE: &str = "Service Health Report";

#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<ServiceHealthResult>,
}

impl HealthReport {
    pub fn count(&self, status: HealthStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    pub fn all_up(&self) -> bool {
        self.entries.iter().all(|e| e.status == HealthStatus::Up)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Order results by service name for display
pub fn assemble(mut results: Vec<ServiceHealthResult>) -> HealthReport {
    results.sort_by(|a, b| a.name.cmp(&b.name));
    HealthReport {
        generated_at: Utc::now(),
        entries: results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::health::Strategy;

    fn result(name: &str, status: HealthStatus) -> ServiceHealthResult {
        ServiceHealthResult {
            name: name.to_string(),
            strategy: Strategy::Internal,
            status,
            details: String::new(),
        }
    }

    #[test]
    fn test_assemble_sorts_by_name() {
        let report = assemble(vec![
            result("worker", HealthStatus::Up),
            result("api", HealthStatus::Down),
            result("db", HealthStatus::Skipped),
        ]);
        let names: Vec<&str> = report.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["api", "db", "worker"]);
    }

    #[test]
    fn test_counts() {
        let report = assemble(vec![
            result("a", HealthStatus::Up),
            result("b", HealthStatus::Up),
            result("c", HealthStatus::Unknown),
        ]);
        assert_eq!(report.count(HealthStatus::Up), 2);
        assert_eq!(report.count(HealthStatus::Down), 0);
        assert!(!report.all_up());
        assert!(!report.is_empty());
    }

    #[test]
    fn test_serializes_status_uppercase() {
        let report = assemble(vec![result("a", HealthStatus::Skipped)]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["status"], "SKIPPED");
        assert_eq!(json["entries"][0]["strategy"], "Internal");
        assert!(json["generated_at"].is_string());
    }
}
