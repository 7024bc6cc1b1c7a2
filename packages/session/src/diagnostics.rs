//! Connection self-test.
//!
//! Walks the same path a real session does, one step at a time, and records
//! what happened instead of failing. Useful when a front end shows nothing
//! and the question is *where* it broke.
//!
//! | Step | Checks |
//! |------|--------|
//! | `authentication` | Session state |
//! | `identity` | Principal calls will be made as |
//! | `actor` | Agent construction and trust bootstrap |
//! | `token_info` | A query round trip |
//! | `holders` | A second query that returns a collection |
//!
//! After the first failing step, the remaining steps are `skipped`.

use serde::Serialize;
use tracing::{info, warn};

use crate::client::PortalClient;
use crate::error::ClientError;
use crate::session::SessionState;
use crate::trust::TrustStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckStep {
    pub name: &'static str,
    pub status: StepStatus,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub steps: Vec<CheckStep>,
}

impl ConnectionReport {
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Passed)
    }

    pub fn step(&self, name: &str) -> Option<&CheckStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// The first step that failed, if any.
    pub fn failure(&self) -> Option<&CheckStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }
}

struct Recorder {
    steps: Vec<CheckStep>,
    failed: bool,
}

impl Recorder {
    fn pass(&mut self, name: &'static str, detail: String) {
        self.steps.push(CheckStep {
            name,
            status: StepStatus::Passed,
            detail,
        });
    }

    fn fail(&mut self, name: &'static str, error: &ClientError) {
        warn!(step = name, error = %error, "connection check step failed");
        self.failed = true;
        self.steps.push(CheckStep {
            name,
            status: StepStatus::Failed,
            detail: error.to_string(),
        });
    }

    fn skip(&mut self, name: &'static str) {
        self.steps.push(CheckStep {
            name,
            status: StepStatus::Skipped,
            detail: String::new(),
        });
    }
}

/// Run every step against `client`. Never returns an error.
pub async fn run_connection_check(client: &PortalClient) -> ConnectionReport {
    let mut rec = Recorder {
        steps: Vec::new(),
        failed: false,
    };

    let state = match client.state() {
        SessionState::Anonymous => "anonymous".to_string(),
        SessionState::Authenticating => "login in progress".to_string(),
        SessionState::Authenticated { .. } => "authenticated".to_string(),
        SessionState::Failed(reason) => format!("anonymous (last login failed: {reason})"),
    };
    rec.pass("authentication", state);

    let identity = match client.principal() {
        Some(principal) => principal.to_text(),
        None => "anonymous (2vxsx-fae)".to_string(),
    };
    rec.pass("identity", identity);

    let actor = match client.actor().await {
        Ok(actor) => {
            let trust = match actor.trust() {
                TrustStatus::Builtin => "built-in root key".to_string(),
                TrustStatus::Verified => "root key verified".to_string(),
                TrustStatus::Unverified { reason } => format!("root key unverified: {reason}"),
            };
            rec.pass(
                "actor",
                format!("canister {} as {} ({trust})", actor.canister_id(), actor.caller()),
            );
            Some(actor)
        }
        Err(e) => {
            rec.fail("actor", &e);
            None
        }
    };

    match &actor {
        Some(actor) => match actor.get_token_info().await {
            Ok(info) => rec.pass(
                "token_info",
                format!("{} ({}), supply {}", info.name, info.symbol, info.total_supply),
            ),
            Err(e) => rec.fail("token_info", &e),
        },
        None => rec.skip("token_info"),
    }

    match (&actor, rec.failed) {
        (Some(actor), false) => match actor.get_all_users().await {
            Ok(users) => rec.pass("holders", format!("{} holders", users.len())),
            Err(e) => rec.fail("holders", &e),
        },
        _ => rec.skip("holders"),
    }

    let report = ConnectionReport { steps: rec.steps };
    info!(passed = report.passed(), "connection check finished");
    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::PortalConfig;
    use crate::memory::{MemoryAgentFactory, MemoryIdentityProvider, MemoryLedger};
    use crate::origin::PageOrigin;

    fn client(ledger: &Arc<MemoryLedger>, factory: MemoryAgentFactory) -> PortalClient {
        let mut config = PortalConfig::local();
        config.canister_id = ledger.canister_id();
        PortalClient::new(
            config,
            Arc::new(factory),
            Arc::new(MemoryIdentityProvider::new()),
            Arc::new(PageOrigin::parse("http://localhost:3000").unwrap()),
        )
    }

    #[tokio::test]
    async fn healthy_connection_passes_every_step() {
        let ledger = Arc::new(MemoryLedger::new());
        let client = client(&ledger, MemoryAgentFactory::new(Arc::clone(&ledger)));

        let report = run_connection_check(&client).await;
        assert!(report.passed(), "{report:?}");
        let names: Vec<&str> = report.steps.iter().map(|s| s.name).collect();
        assert_eq!(names, ["authentication", "identity", "actor", "token_info", "holders"]);
        assert!(report.step("token_info").unwrap().detail.contains("EDU"));
    }

    #[tokio::test]
    async fn actor_failure_skips_remaining_steps() {
        let ledger = Arc::new(MemoryLedger::new());
        let factory = MemoryAgentFactory::new(Arc::clone(&ledger));
        factory.fail_next_connects(1);
        let client = client(&ledger, factory);

        let report = run_connection_check(&client).await;
        assert_eq!(report.failure().unwrap().name, "actor");
        assert_eq!(report.step("token_info").unwrap().status, StepStatus::Skipped);
        assert_eq!(report.step("holders").unwrap().status, StepStatus::Skipped);
    }

    #[tokio::test]
    async fn query_failure_is_recorded() {
        let ledger = Arc::new(MemoryLedger::new());
        let client = client(&ledger, MemoryAgentFactory::new(Arc::clone(&ledger)));
        ledger.fail_calls(true);

        let report = run_connection_check(&client).await;
        assert_eq!(report.failure().unwrap().name, "token_info");
        assert_eq!(report.step("holders").unwrap().status, StepStatus::Skipped);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][3]["status"], "failed");
    }
}
