#![allow(dead_code)]

use crate::fixtures::constants::{TEST_FEE_PAYER, TEST_NETWORK};
use quorum_core::domain::key::Key;
use quorum_core::domain::transaction::{TransactionBody, TransactionRecord, TransactionStatus};
use quorum_core::foundation::{AccountId, GroupId, KeyBytes, NetworkName, NodeId, TransactionId};

pub struct TransactionRecordBuilder {
    id: u64,
    body: TransactionBody,
    status: TransactionStatus,
    valid_start_ms: u64,
    network: Option<NetworkName>,
    is_manual: bool,
    group_id: Option<GroupId>,
}

impl Default for TransactionRecordBuilder {
    fn default() -> Self {
        Self {
            id: 1,
            body: TransactionBody { fee_payer: AccountId::from(TEST_FEE_PAYER), ..Default::default() },
            status: TransactionStatus::WaitingForExecution,
            valid_start_ms: 0,
            network: Some(NetworkName::from(TEST_NETWORK)),
            is_manual: false,
            group_id: None,
        }
    }
}

impl TransactionRecordBuilder {
    pub fn id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn fee_payer(mut self, account_id: &str) -> Self {
        self.body.fee_payer = AccountId::from(account_id);
        self
    }

    pub fn signing_account(mut self, account_id: &str) -> Self {
        self.body.signing_accounts.push(AccountId::from(account_id));
        self
    }

    pub fn receiver_account(mut self, account_id: &str) -> Self {
        self.body.receiver_accounts.push(AccountId::from(account_id));
        self
    }

    pub fn node_id(mut self, node_id: &str) -> Self {
        self.body.node_id = Some(NodeId::from(node_id));
        self
    }

    pub fn new_node_account_id(mut self, account_id: &str) -> Self {
        self.body.new_node_account_id = Some(AccountId::from(account_id));
        self
    }

    pub fn new_key(mut self, key: Key) -> Self {
        self.body.new_keys.push(key);
        self
    }

    pub fn signature(mut self, signer: KeyBytes) -> Self {
        self.body.signatures.insert(signer, vec![0xEE; 64]);
        self
    }

    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn valid_start_ms(mut self, valid_start_ms: u64) -> Self {
        self.valid_start_ms = valid_start_ms;
        self
    }

    pub fn manual(mut self) -> Self {
        self.is_manual = true;
        self
    }

    pub fn group(mut self, group_id: u64) -> Self {
        self.group_id = Some(GroupId::new(group_id));
        self
    }

    pub fn no_network(mut self) -> Self {
        self.network = None;
        self
    }

    pub fn build(self) -> TransactionRecord {
        TransactionRecord {
            id: TransactionId::new(self.id),
            body_bytes: self.body.encode().expect("encode body"),
            status: self.status,
            status_code: None,
            valid_start_ms: self.valid_start_ms,
            network: self.network,
            is_manual: self.is_manual,
            group_id: self.group_id,
            executed_at_ms: None,
            failed_at_ms: None,
        }
    }
}
