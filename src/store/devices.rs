use super::{column_enum, column_timestamp, Store};
use crate::model::{format_storage, ActionRecord, Device, DeviceState, DeviceType};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<Device> {
    let last_seen_raw: Option<String> = row.get(5)?;
    let last_seen_at = match last_seen_raw {
        Some(raw) => Some(column_timestamp(5, raw)?),
        None => None,
    };
    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        device_uid: row.get(2)?,
        device_type: column_enum(3, row.get::<_, String>(3)?)?,
        state: column_enum(4, row.get::<_, String>(4)?)?,
        last_seen_at,
    })
}

const DEVICE_COLUMNS: &str = "id, name, device_uid, device_type, state, last_seen_at";

impl Store {
    /// Insert a device row. Provisioning is out-of-band for the core; this
    /// exists for fixtures and operational tooling.
    pub fn insert_device(
        &self,
        name: &str,
        device_uid: &str,
        device_type: DeviceType,
        state: DeviceState,
    ) -> Result<Device> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO device (name, device_uid, device_type, state) VALUES (?1, ?2, ?3, ?4)",
            params![name, device_uid, device_type.to_string(), state.to_string()],
        )
        .context("Failed to insert device")?;
        let id = conn.last_insert_rowid();
        Ok(Device {
            id,
            name: name.to_string(),
            device_uid: device_uid.to_string(),
            device_type,
            state,
            last_seen_at: None,
        })
    }

    pub fn find_device(&self, id: i64) -> Result<Option<Device>> {
        self.lock()
            .query_row(
                &format!("SELECT {} FROM device WHERE id = ?1", DEVICE_COLUMNS),
                params![id],
                device_from_row,
            )
            .optional()
            .context("Failed to query device by id")
    }

    pub fn find_device_by_uid(&self, device_uid: &str) -> Result<Option<Device>> {
        self.lock()
            .query_row(
                &format!("SELECT {} FROM device WHERE device_uid = ?1", DEVICE_COLUMNS),
                params![device_uid],
                device_from_row,
            )
            .optional()
            .context("Failed to query device by uid")
    }

    /// Every device, unfiltered and unpaged. Device counts are small.
    pub fn all_devices(&self) -> Result<Vec<Device>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM device ORDER BY id", DEVICE_COLUMNS))
            .context("Failed to prepare device listing")?;
        let rows = stmt
            .query_map([], device_from_row)
            .context("Failed to list devices")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read device rows")?;
        Ok(rows)
    }

    /// Apply one acknowledgement: overwrite state + last_seen_at and append
    /// a history row, in a single transaction. Returns `None` (and leaves
    /// the database untouched) when the device id does not resolve.
    pub fn record_ack(
        &self,
        device_id: i64,
        action: DeviceState,
        occurred_at: NaiveDateTime,
    ) -> Result<Option<ActionRecord>> {
        let mut conn = self.lock();
        let tx = conn.transaction().context("Failed to begin ack transaction")?;

        let device_name: Option<String> = tx
            .query_row("SELECT name FROM device WHERE id = ?1", params![device_id], |r| r.get(0))
            .optional()
            .context("Failed to resolve device for ack")?;
        let device_name = match device_name {
            Some(name) => name,
            None => return Ok(None),
        };

        let ts = format_storage(occurred_at);
        tx.execute(
            "UPDATE device SET state = ?1, last_seen_at = ?2 WHERE id = ?3",
            params![action.to_string(), ts, device_id],
        )
        .context("Failed to update device state")?;
        tx.execute(
            "INSERT INTO device_action_history (device_id, action, executed_at)
             VALUES (?1, ?2, ?3)",
            params![device_id, action.to_string(), ts],
        )
        .context("Failed to append action history")?;
        let id = tx.last_insert_rowid();
        tx.commit().context("Failed to commit ack transaction")?;

        Ok(Some(ActionRecord { id, device_id, device_name, action, executed_at: occurred_at }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn insert_and_find_device() {
        let store = Store::open_in_memory().unwrap();
        let d = store
            .insert_device("lamp", "esp32-lamp-01", DeviceType::LED, DeviceState::OFF)
            .unwrap();

        let by_id = store.find_device(d.id).unwrap().unwrap();
        assert_eq!(by_id, d);

        let by_uid = store.find_device_by_uid("esp32-lamp-01").unwrap().unwrap();
        assert_eq!(by_uid.id, d.id);

        assert!(store.find_device(999).unwrap().is_none());
        assert!(store.find_device_by_uid("nope").unwrap().is_none());
    }

    #[test]
    fn record_ack_updates_state_and_appends_history() {
        let store = Store::open_in_memory().unwrap();
        let d = store
            .insert_device("lamp", "esp32-lamp-01", DeviceType::LED, DeviceState::OFF)
            .unwrap();

        let rec = store.record_ack(d.id, DeviceState::ON, ts(10, 0, 0)).unwrap().unwrap();
        assert_eq!(rec.action, DeviceState::ON);
        assert_eq!(rec.device_name, "lamp");

        let updated = store.find_device(d.id).unwrap().unwrap();
        assert_eq!(updated.state, DeviceState::ON);
        assert_eq!(updated.last_seen_at, Some(ts(10, 0, 0)));
    }

    #[test]
    fn two_acks_last_write_wins_both_rows_persist() {
        let store = Store::open_in_memory().unwrap();
        let d = store
            .insert_device("lamp", "esp32-lamp-01", DeviceType::LED, DeviceState::OFF)
            .unwrap();

        store.record_ack(d.id, DeviceState::ON, ts(10, 0, 0)).unwrap().unwrap();
        store.record_ack(d.id, DeviceState::OFF, ts(10, 0, 5)).unwrap().unwrap();

        let device = store.find_device(d.id).unwrap().unwrap();
        assert_eq!(device.state, DeviceState::OFF);

        let count: i64 = store
            .lock()
            .query_row("SELECT COUNT(*) FROM device_action_history", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn record_ack_unknown_device_is_noop() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.record_ack(42, DeviceState::ON, ts(0, 0, 0)).unwrap().is_none());
        let count: i64 = store
            .lock()
            .query_row("SELECT COUNT(*) FROM device_action_history", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
