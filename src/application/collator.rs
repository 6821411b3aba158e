//! Smart collation: reduce an over-signed transaction to a minimal signature
//! set that still satisfies every threshold node, keeping the serialized form
//! under the network's size ceiling.

use crate::application::resolver::KeyResolver;
use crate::domain::key;
use crate::domain::transaction::TransactionRecord;
use crate::foundation::Result;
use crate::infrastructure::config::LimitsConfig;
use log::{debug, warn};
use std::sync::Arc;

/// Result of one collation attempt. The two failure shapes are terminal and
/// map to distinct recorded status codes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CollationOutcome {
    /// Reduced transaction bytes carrying exactly the minimal signature set.
    Collated(Vec<u8>),
    /// The threshold structure cannot be satisfied by the available signatures.
    Unsatisfiable,
    /// Even the minimal satisfying signature set exceeds the size ceiling.
    Oversize,
}

pub struct Collator {
    resolver: Arc<KeyResolver>,
    max_transaction_bytes: usize,
}

impl Collator {
    pub fn new(resolver: Arc<KeyResolver>, limits: &LimitsConfig) -> Self {
        Self { resolver, max_transaction_bytes: limits.max_transaction_bytes }
    }

    /// Prunes the transaction's signatures down to a minimal set that still
    /// satisfies every threshold node. Pure reduction: signatures are only
    /// ever removed, never added.
    pub async fn collate(&self, transaction: &TransactionRecord) -> Result<CollationOutcome> {
        let mut body = transaction.body()?;
        let requirement = self.resolver.compute_signature_key(transaction, false).await?;
        let available = body.signer_set();

        let Some(selected) = key::reduce(&requirement, &available) else {
            warn!(
                "collation unsatisfiable tx_id={} available_signers={}",
                transaction.id,
                available.len()
            );
            return Ok(CollationOutcome::Unsatisfiable);
        };

        body.retain_signatures(&selected);
        let reduced = body.encode()?;
        if reduced.len() > self.max_transaction_bytes {
            warn!(
                "collated transaction still oversized tx_id={} size={} max={}",
                transaction.id,
                reduced.len(),
                self.max_transaction_bytes
            );
            return Ok(CollationOutcome::Oversize);
        }

        debug!(
            "collation reduced signature set tx_id={} kept={} dropped={} size={}",
            transaction.id,
            selected.len(),
            available.len().saturating_sub(selected.len()),
            reduced.len()
        );
        Ok(CollationOutcome::Collated(reduced))
    }
}
