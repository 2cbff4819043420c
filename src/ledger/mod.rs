use crate::model::{ActionRecord, Device, DeviceState};
use crate::store::Store;
use chrono::NaiveDateTime;
use std::fmt;
use std::sync::Arc;

/// Device Ledger: the single writer of device state and the append-only
/// action history. An ack either lands fully (state overwrite + history
/// row, one transaction) or not at all.
pub struct DeviceLedger {
    store: Arc<Store>,
}

#[derive(Debug)]
pub enum LedgerError {
    DeviceNotFound(i64),
    Storage(anyhow::Error),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::DeviceNotFound(id) => write!(f, "device not found: {}", id),
            LedgerError::Storage(e) => write!(f, "storage failure: {}", e),
        }
    }
}

impl std::error::Error for LedgerError {}

impl DeviceLedger {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Apply one acknowledgement. Concurrent acks for the same device are
    /// not serialized beyond the storage transaction — last write wins on
    /// state (by event timestamp), every history row persists.
    pub fn apply_ack(
        &self,
        device_id: i64,
        new_state: DeviceState,
        occurred_at: NaiveDateTime,
    ) -> Result<ActionRecord, LedgerError> {
        self.store
            .record_ack(device_id, new_state, occurred_at)
            .map_err(LedgerError::Storage)?
            .ok_or(LedgerError::DeviceNotFound(device_id))
    }

    /// Current identity/state/type/lastSeen of every device. No filtering,
    /// no paging — device counts are small.
    pub fn snapshot(&self) -> Result<Vec<Device>, LedgerError> {
        self.store.all_devices().map_err(LedgerError::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceType;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn apply_ack_then_snapshot_reflects_state() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let d = store
            .insert_device("lamp", "esp32-lamp-01", DeviceType::LED, DeviceState::OFF)
            .unwrap();
        let ledger = DeviceLedger::new(store);

        let rec = ledger.apply_ack(d.id, DeviceState::ON, ts(9, 0, 0)).unwrap();
        assert_eq!(rec.action, DeviceState::ON);
        assert_eq!(rec.executed_at, ts(9, 0, 0));

        let snapshot = ledger.snapshot().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].state, DeviceState::ON);
        assert_eq!(snapshot[0].last_seen_at, Some(ts(9, 0, 0)));
    }

    #[test]
    fn on_then_off_leaves_off_with_two_history_rows() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let d = store
            .insert_device("lamp", "esp32-lamp-01", DeviceType::LED, DeviceState::OFF)
            .unwrap();
        let ledger = DeviceLedger::new(store.clone());

        ledger.apply_ack(d.id, DeviceState::ON, ts(9, 0, 0)).unwrap();
        ledger.apply_ack(d.id, DeviceState::OFF, ts(9, 0, 1)).unwrap();

        assert_eq!(ledger.snapshot().unwrap()[0].state, DeviceState::OFF);

        let history = store
            .search_history(&crate::store::HistoryFilter {
                ascending: true,
                size: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(history.total, 2);
        assert_eq!(history.rows[0].action, DeviceState::ON);
        assert_eq!(history.rows[1].action, DeviceState::OFF);
    }

    #[test]
    fn unknown_device_is_rejected() {
        let ledger = DeviceLedger::new(Arc::new(Store::open_in_memory().unwrap()));
        assert!(matches!(
            ledger.apply_ack(42, DeviceState::ON, ts(0, 0, 0)),
            Err(LedgerError::DeviceNotFound(42))
        ));
    }
}
