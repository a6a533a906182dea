//! Loading the fleet roster at startup.
//!
//! Seeding is the only step that needs the persistence store before the
//! simulation can run. A store that stays down is fatal to the simulator
//! but not to the process: the caller logs [`SeedError`] and keeps serving
//! reads.

use fleet_types::VehicleRecord;
use tracing::{info, warn};

use crate::config::SeedingConfig;
use crate::repository::{FleetRepository, RepositoryError};

/// Errors that can occur while seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// The roster query failed.
    #[error("failed to load vehicle roster: {source}")]
    Roster {
        /// The underlying store error.
        #[from]
        source: RepositoryError,
    },

    /// Every attempt failed.
    #[error("gave up loading vehicle roster after {attempts} attempts: {source}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        source: RepositoryError,
    },
}

/// Fetch the roster once.
pub async fn load_roster(repository: &dyn FleetRepository) -> Result<Vec<VehicleRecord>, SeedError> {
    let roster = repository.list_vehicles().await?;
    if roster.is_empty() {
        warn!("Vehicle roster is empty, simulation will have no vehicles");
    }
    Ok(roster)
}

/// Fetch the roster, retrying up to `config.max_attempts` times with a
/// fixed delay between attempts.
pub async fn load_roster_with_retry(
    repository: &dyn FleetRepository,
    config: &SeedingConfig,
) -> Result<Vec<VehicleRecord>, SeedError> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt: u32 = 1;
    loop {
        match repository.list_vehicles().await {
            Ok(roster) => {
                info!(attempt, vehicles = roster.len(), "Loaded vehicle roster");
                if roster.is_empty() {
                    warn!("Vehicle roster is empty, simulation will have no vehicles");
                }
                return Ok(roster);
            }
            Err(source) if attempt >= max_attempts => {
                return Err(SeedError::Exhausted {
                    attempts: attempt,
                    source,
                });
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts,
                    retry_in_ms = config.retry_delay_ms,
                    error = %e,
                    "Roster load failed, retrying"
                );
                tokio::time::sleep(config.retry_delay()).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::memory::InMemoryRepository;

    fn config(max_attempts: u32) -> SeedingConfig {
        SeedingConfig {
            max_attempts,
            retry_delay_ms: 1000,
        }
    }

    #[tokio::test]
    async fn loads_demo_roster() {
        let repo = InMemoryRepository::with_demo_fleet();
        assert_eq!(load_roster(&repo).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn single_attempt_surfaces_store_error() {
        let repo = InMemoryRepository::with_demo_fleet();
        repo.set_unavailable(true);
        assert!(matches!(
            load_roster(&repo).await,
            Err(SeedError::Roster { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let repo = InMemoryRepository::with_demo_fleet();
        repo.set_unavailable(true);
        let err = load_roster_with_retry(&repo, &config(3)).await.unwrap_err();
        assert!(matches!(err, SeedError::Exhausted { attempts: 3, .. }));
        assert_eq!(repo.list_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_when_store_comes_back() {
        let repo = Arc::new(InMemoryRepository::with_demo_fleet());
        repo.set_unavailable(true);

        let task = {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { load_roster_with_retry(repo.as_ref(), &config(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(1500)).await;
        repo.set_unavailable(false);

        let roster = task.await.unwrap().unwrap();
        assert_eq!(roster.len(), 5);
        assert_eq!(repo.list_calls(), 3);
    }
}
