//! Fixed fleet the hub starts with
//!
//! There is no create-agent operation, so every agent and alert that will ever
//! exist in a hub process comes from here. Timestamps are relative to the
//! instant passed in.

use chrono::{DateTime, Duration, Utc};

use crate::{
    Agent, AgentCategory, AgentMetrics, AgentStatus, Alert, AlertCategory, Environment, Policy,
    PolicyConfiguration, PolicyKind, Severity,
};

fn policy(id: &str, name: &str, kind: PolicyKind, enabled: bool, updated: DateTime<Utc>) -> Policy {
    Policy {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        enabled,
        configuration: PolicyConfiguration::new(),
        last_updated: updated,
    }
}

/// The seeded agents, ordered by id
pub fn agents(now: DateTime<Utc>) -> Vec<Agent> {
    vec![
        Agent {
            id: "1".to_string(),
            name: "Customer Support Bot".to_string(),
            category: AgentCategory::Chatbot,
            status: AgentStatus::Active,
            last_activity: now - Duration::minutes(5),
            requests_today: 1247,
            error_rate: 0.023,
            response_time: 156,
            owner: "support-team@company.com".to_string(),
            environment: Environment::Production,
            policies: vec![
                policy(
                    "p1",
                    "Rate Limiting",
                    PolicyKind::RateLimit,
                    true,
                    now - Duration::hours(3),
                ),
                policy(
                    "p2",
                    "Content Filter",
                    PolicyKind::ContentFilter,
                    true,
                    now - Duration::hours(4),
                ),
                policy(
                    "p3",
                    "Access Control",
                    PolicyKind::AccessControl,
                    true,
                    now - Duration::hours(20),
                ),
            ],
            metrics: AgentMetrics {
                total_requests: 15000,
                success_rate: 0.977,
                average_response_time: 156.0,
                tokens_used: 450_000,
                cost_today: 12.50,
                alerts_triggered: 1,
            },
        },
        Agent {
            id: "2".to_string(),
            name: "Sales Assistant".to_string(),
            category: AgentCategory::Assistant,
            status: AgentStatus::Active,
            last_activity: now - Duration::minutes(2),
            requests_today: 856,
            error_rate: 0.012,
            response_time: 89,
            owner: "sales@company.com".to_string(),
            environment: Environment::Production,
            policies: vec![
                policy(
                    "p4",
                    "Lead Qualification",
                    PolicyKind::ContentFilter,
                    true,
                    now - Duration::hours(6),
                ),
                policy(
                    "p5",
                    "Data Retention",
                    PolicyKind::DataRetention,
                    true,
                    now - Duration::hours(11),
                ),
            ],
            metrics: AgentMetrics {
                total_requests: 12000,
                success_rate: 0.988,
                average_response_time: 89.0,
                tokens_used: 320_000,
                cost_today: 8.75,
                alerts_triggered: 0,
            },
        },
        Agent {
            id: "3".to_string(),
            name: "Code Review Agent".to_string(),
            category: AgentCategory::Analysis,
            status: AgentStatus::Warning,
            last_activity: now - Duration::minutes(15),
            requests_today: 234,
            error_rate: 0.078,
            response_time: 1234,
            owner: "dev-team@company.com".to_string(),
            environment: Environment::Staging,
            policies: vec![
                policy(
                    "p6",
                    "Code Quality Rules",
                    PolicyKind::ContentFilter,
                    true,
                    now - Duration::hours(2),
                ),
                policy(
                    "p7",
                    "Repository Access",
                    PolicyKind::AccessControl,
                    true,
                    now - Duration::hours(9),
                ),
            ],
            metrics: AgentMetrics {
                total_requests: 3000,
                success_rate: 0.922,
                average_response_time: 1234.0,
                tokens_used: 180_000,
                cost_today: 15.20,
                alerts_triggered: 2,
            },
        },
        Agent {
            id: "4".to_string(),
            name: "Data Processor".to_string(),
            category: AgentCategory::Workflow,
            status: AgentStatus::Inactive,
            last_activity: now - Duration::hours(1),
            requests_today: 45,
            error_rate: 0.001,
            response_time: 2156,
            owner: "data-team@company.com".to_string(),
            environment: Environment::Development,
            policies: vec![
                policy(
                    "p8",
                    "Data Privacy",
                    PolicyKind::DataRetention,
                    true,
                    now - Duration::hours(15),
                ),
                policy(
                    "p9",
                    "Processing Limits",
                    PolicyKind::RateLimit,
                    false,
                    now - Duration::hours(22),
                ),
            ],
            metrics: AgentMetrics {
                total_requests: 8200,
                success_rate: 0.999,
                average_response_time: 2156.0,
                tokens_used: 210_000,
                cost_today: 3.40,
                alerts_triggered: 1,
            },
        },
        Agent {
            id: "5".to_string(),
            name: "HR Onboarding Bot".to_string(),
            category: AgentCategory::Chatbot,
            status: AgentStatus::Error,
            last_activity: now - Duration::hours(2),
            requests_today: 12,
            error_rate: 0.156,
            response_time: 5678,
            owner: "hr@company.com".to_string(),
            environment: Environment::Production,
            policies: vec![
                policy(
                    "p10",
                    "Employee Data Protection",
                    PolicyKind::DataRetention,
                    true,
                    now - Duration::hours(5),
                ),
                policy(
                    "p11",
                    "HR Policy Compliance",
                    PolicyKind::ContentFilter,
                    true,
                    now - Duration::hours(13),
                ),
            ],
            metrics: AgentMetrics {
                total_requests: 4200,
                success_rate: 0.844,
                average_response_time: 5678.0,
                tokens_used: 98_000,
                cost_today: 6.10,
                alerts_triggered: 3,
            },
        },
    ]
}

fn alert(
    id: &str,
    agent_id: &str,
    category: AlertCategory,
    severity: Severity,
    message: &str,
    raised: DateTime<Utc>,
    acknowledged: bool,
) -> Alert {
    Alert {
        id: id.to_string(),
        agent_id: agent_id.to_string(),
        category,
        message: message.to_string(),
        severity,
        timestamp: raised,
        acknowledged,
        acknowledged_at: None,
    }
}

/// The seeded alerts; three of the six are still unacknowledged
pub fn alerts(now: DateTime<Utc>) -> Vec<Alert> {
    vec![
        alert(
            "a1",
            "5",
            AlertCategory::Error,
            Severity::Critical,
            "HR Onboarding Bot experiencing high error rate (15.6%). Authentication service may be down.",
            now - Duration::minutes(30),
            false,
        ),
        alert(
            "a2",
            "3",
            AlertCategory::Performance,
            Severity::Medium,
            "Code Review Agent response time exceeded threshold (1.2s vs 500ms target).",
            now - Duration::minutes(15),
            false,
        ),
        alert(
            "a3",
            "1",
            AlertCategory::Policy,
            Severity::Low,
            "Rate limiting policy triggered 23 times in the last hour for Customer Support Bot.",
            now - Duration::hours(1),
            true,
        ),
        alert(
            "a4",
            "2",
            AlertCategory::Security,
            Severity::High,
            "Unusual access pattern detected for Sales Assistant from IP range 192.168.1.0/24.",
            now - Duration::hours(2),
            false,
        ),
        alert(
            "a5",
            "4",
            AlertCategory::Performance,
            Severity::Medium,
            "Data Processor has been inactive for over 1 hour. Scheduled tasks may be affected.",
            now - Duration::minutes(65),
            true,
        ),
        alert(
            "a6",
            "1",
            AlertCategory::Policy,
            Severity::Low,
            "Content filter updated successfully. New profanity detection rules are now active.",
            now - Duration::hours(4),
            true,
        ),
    ]
}
