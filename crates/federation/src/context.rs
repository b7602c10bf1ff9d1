//! The explicit, process-wide context passed to every handler and worker
//! (§9 design note: no global application object — a value threaded through
//! instead).

use std::sync::Arc;

use relay_cache::KvCache;
use relay_common::AppResult;
use relay_db::repositories::{ConfigKvRepository, DomainBanRepository, InboxRepository, SoftwareBanRepository, WhitelistRepository};
use relay_policy::{Decision, Snapshot, evaluate, is_well_known_relay};
use rsa::RsaPrivateKey;

use crate::client::ApClient;
use crate::dedup::DedupRing;
use crate::fanout::Fanout;

/// The relay's own RSA keypair and public key IRI, loaded once at startup
/// from `config_kv` (`private-key`, `private-key-id`) and never mutated
/// afterwards (§5: "read-only after startup; no locking needed").
#[derive(Clone)]
pub struct RelayKeypair {
    pub private_key: Arc<RsaPrivateKey>,
    pub public_key_pem: String,
    pub key_id: String,
}

/// Shared state for every federation-facing handler and worker.
#[derive(Clone)]
pub struct FederationState {
    pub domain: String,
    pub keypair: RelayKeypair,
    pub inbox_repo: InboxRepository,
    pub domain_ban_repo: DomainBanRepository,
    pub software_ban_repo: SoftwareBanRepository,
    pub whitelist_repo: WhitelistRepository,
    pub config_repo: ConfigKvRepository,
    pub cache: Arc<dyn KvCache>,
    pub client: ApClient,
    pub dedup: Arc<DedupRing>,
    pub fanout: Arc<dyn Fanout>,
}

impl FederationState {
    /// Reads the `whitelist-enabled` admin config flag (§4.E, §6).
    pub async fn whitelist_enabled(&self) -> AppResult<bool> {
        Ok(self
            .config_repo
            .get("whitelist-enabled")
            .await?
            .is_some_and(|row| row.value == "true"))
    }

    /// Reads the `approval-required` admin config flag (§4.E, §4.F).
    pub async fn approval_required(&self) -> AppResult<bool> {
        Ok(self
            .config_repo
            .get("approval-required")
            .await?
            .is_some_and(|row| row.value == "true"))
    }

    /// Evaluates the policy engine for `domain`/`software` against the
    /// current store state (§4.E).
    pub async fn evaluate_policy(&self, domain: &str, software: Option<&str>) -> AppResult<Decision> {
        let is_domain_banned = self.domain_ban_repo.is_banned(domain).await?;
        let is_software_banned = match software {
            Some(name) => {
                let lowered = name.to_lowercase();
                is_well_known_relay(&lowered) && self.software_ban_repo.is_banned("relays").await?
                    || self.software_ban_repo.is_banned(&lowered).await?
            }
            None => false,
        };
        let is_whitelisted = self.whitelist_repo.is_whitelisted(domain).await?;
        let whitelist_enabled = self.whitelist_enabled().await?;

        Ok(evaluate(Snapshot {
            is_domain_banned,
            is_software_banned,
            is_whitelisted,
            whitelist_enabled,
        }))
    }
}
