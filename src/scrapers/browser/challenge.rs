//! Anti-bot challenge negotiation as an explicit poll loop.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::scrapers::detection::{DetectionInput, DetectorSet};
use crate::scrapers::ScrapeError;

/// How a challenge check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// No challenge was showing.
    Clear,
    /// A challenge was showing and went away.
    Resolved,
    /// Still blocked when the budget ran out.
    Unresolved,
}

/// Title and visible text of the live page.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub title: String,
    pub text: String,
}

impl PageSnapshot {
    fn input(&self) -> DetectionInput<'_> {
        DetectionInput {
            title: &self.title,
            markup: "",
            text: &self.text,
        }
    }
}

/// The page operations negotiation needs.
#[async_trait]
pub trait ChallengePage: Send + Sync {
    async fn snapshot(&self) -> Result<PageSnapshot, ScrapeError>;

    /// Mouse movement and scrolling.
    async fn simulate_input(&self);
}

#[derive(Debug, Clone)]
pub struct ChallengePolicy {
    pub timeout: Duration,
    pub poll: Duration,
    /// Pause after resolution for a post-challenge redirect to land.
    pub settle: Duration,
    /// Simulate input again every this many polls.
    pub input_every: u32,
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll: Duration::from_secs(2),
            settle: Duration::from_secs(3),
            input_every: 3,
        }
    }
}

/// Wait out a challenge page if one is showing.
///
/// Snapshot errors while polling are expected (the document is replaced
/// when the challenge redirects) and count as "still waiting".
pub async fn negotiate<P>(
    page: &P,
    detectors: &DetectorSet,
    policy: &ChallengePolicy,
) -> Result<ChallengeOutcome, ScrapeError>
where
    P: ChallengePage + ?Sized,
{
    let first = page.snapshot().await?;
    if !detectors.is_challenge(&first.input()) {
        return Ok(ChallengeOutcome::Clear);
    }

    info!(
        "Challenge page detected (title: {:?}), simulating input",
        first.title
    );
    page.simulate_input().await;

    let deadline = Instant::now() + policy.timeout;
    let mut polls: u32 = 0;

    while Instant::now() < deadline {
        tokio::time::sleep(policy.poll).await;
        polls += 1;

        match page.snapshot().await {
            Ok(snapshot) if !detectors.is_challenge(&snapshot.input()) => {
                info!("Challenge cleared after {} polls", polls);
                tokio::time::sleep(policy.settle).await;
                return Ok(ChallengeOutcome::Resolved);
            }
            Ok(_) => {}
            Err(e) => debug!("Snapshot failed during challenge wait: {}", e),
        }

        if policy.input_every > 0 && polls % policy.input_every == 0 {
            page.simulate_input().await;
        }
    }

    warn!("Challenge still showing after {:?}", policy.timeout);
    Ok(ChallengeOutcome::Unresolved)
}
