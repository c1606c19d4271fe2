use chrono::{DateTime, Duration, Utc};
use cloudpam_domain::{AgentApproval, DiscoveryAgent};

/// Default "no heartbeat" thresholds from the agent state diagram (`spec.md` §4.5).
pub const STALE_AFTER: Duration = Duration::minutes(15);
pub const OFFLINE_AFTER: Duration = Duration::minutes(30);

/// Derived liveness, computed from `last_seen_at` rather than stored — heartbeats are the only
/// write the registry takes on an approved agent (`spec.md` §4.5, §5 "last-writer-wins").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentLifecycleStatus {
    PendingApproval,
    Rejected,
    Active,
    Stale,
    Offline,
}

#[must_use]
pub fn lifecycle_status(agent: &DiscoveryAgent, now: DateTime<Utc>) -> AgentLifecycleStatus {
    match agent.approval {
        AgentApproval::Pending => AgentLifecycleStatus::PendingApproval,
        AgentApproval::Rejected => AgentLifecycleStatus::Rejected,
        AgentApproval::Approved => match agent.last_seen_at {
            None => AgentLifecycleStatus::Offline,
            Some(last_seen) if now - last_seen >= OFFLINE_AFTER => AgentLifecycleStatus::Offline,
            Some(last_seen) if now - last_seen >= STALE_AFTER => AgentLifecycleStatus::Stale,
            Some(_) => AgentLifecycleStatus::Active,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(approval: AgentApproval, last_seen_at: Option<DateTime<Utc>>) -> DiscoveryAgent {
        DiscoveryAgent {
            id: 1,
            name: "a".to_owned(),
            account_id: 1,
            api_key_id: None,
            version: None,
            hostname: None,
            approval,
            credential_hash: None,
            last_seen_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pending_agent_is_pending_regardless_of_heartbeat() {
        let now = Utc::now();
        let a = agent(AgentApproval::Pending, Some(now));
        assert_eq!(lifecycle_status(&a, now), AgentLifecycleStatus::PendingApproval);
    }

    #[test]
    fn fresh_heartbeat_is_active() {
        let now = Utc::now();
        let a = agent(AgentApproval::Approved, Some(now));
        assert_eq!(lifecycle_status(&a, now), AgentLifecycleStatus::Active);
    }

    #[test]
    fn heartbeat_older_than_15m_is_stale() {
        let now = Utc::now();
        let a = agent(AgentApproval::Approved, Some(now - Duration::minutes(20)));
        assert_eq!(lifecycle_status(&a, now), AgentLifecycleStatus::Stale);
    }

    #[test]
    fn heartbeat_older_than_30m_is_offline() {
        let now = Utc::now();
        let a = agent(AgentApproval::Approved, Some(now - Duration::minutes(31)));
        assert_eq!(lifecycle_status(&a, now), AgentLifecycleStatus::Offline);
    }
}
