//! In-memory recorder for tests and demo deployments.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

use super::{NewRecord, PersistedRecord, RecordFilter, RecorderError, TransactionRecorder};
use crate::core_types::Receiver;

#[derive(Default)]
pub struct MemRecorder {
    records: Mutex<Vec<PersistedRecord>>,
}

impl MemRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in append order; test inspection helper.
    pub fn snapshot(&self) -> Vec<PersistedRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionRecorder for MemRecorder {
    async fn append(&self, record: NewRecord) -> Result<PersistedRecord, RecorderError> {
        let mut records = self.records.lock().unwrap();
        let persisted = PersistedRecord {
            id: records.len() as i64 + 1,
            kind: record.kind,
            sender: record.sender,
            receiver: record.receiver,
            amount: record.amount,
            currency: record.currency,
            status: record.status,
            timestamp: Utc::now(),
        };
        records.push(persisted.clone());
        Ok(persisted)
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<PersistedRecord>, RecorderError> {
        let records = self.records.lock().unwrap();
        let mut matched: Vec<PersistedRecord> = records
            .iter()
            .filter(|r| {
                let involves_account = r.sender == Some(filter.account)
                    || r.receiver == Receiver::Account(filter.account);
                let kind_matches = filter.kind.is_none_or(|k| k == r.kind);
                involves_account && kind_matches
            })
            .cloned()
            .collect();
        matched.reverse();
        matched.truncate(filter.limit as usize);
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{AccountId, Currency, TxKind};
    use crate::recorder::RecordStatus;

    fn sent(from: i64, to: i64, amount: u64) -> NewRecord {
        NewRecord {
            kind: TxKind::Sent,
            sender: Some(AccountId(from)),
            receiver: Receiver::Account(AccountId(to)),
            amount,
            currency: Currency::Usdc,
            status: RecordStatus::Completed,
        }
    }

    #[tokio::test]
    async fn test_append_assigns_id_and_timestamp() {
        let recorder = MemRecorder::new();
        let a = recorder.append(sent(1, 2, 100)).await.unwrap();
        let b = recorder.append(sent(1, 2, 200)).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn test_list_filters_by_account_and_kind() {
        let recorder = MemRecorder::new();
        recorder.append(sent(1, 2, 100)).await.unwrap();
        recorder.append(sent(2, 3, 50)).await.unwrap();
        recorder.append(sent(4, 1, 75)).await.unwrap();

        // Account 1 appears as sender of the first and receiver of the third.
        let list = recorder
            .list(&RecordFilter::for_account(AccountId(1)))
            .await
            .unwrap();
        assert_eq!(list.len(), 2);
        // Newest first
        assert_eq!(list[0].amount, 75);
        assert_eq!(list[1].amount, 100);

        let mut filter = RecordFilter::for_account(AccountId(2));
        filter.kind = Some(TxKind::Sent);
        let list = recorder.list(&filter).await.unwrap();
        assert_eq!(list.len(), 2);
    }

    #[tokio::test]
    async fn test_limit() {
        let recorder = MemRecorder::new();
        for i in 0..10 {
            recorder.append(sent(1, 2, i)).await.unwrap();
        }
        let mut filter = RecordFilter::for_account(AccountId(1));
        filter.limit = 3;
        let list = recorder.list(&filter).await.unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].amount, 9);
    }
}
