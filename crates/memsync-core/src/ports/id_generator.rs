//! IdGenerator port - ID 生成の抽象化
//!
//! エントリ ID は enqueue 時に生成され、pending キューと DLQ の和集合の中で一意。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::EntryId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator はエントリ ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_entry_id(&self) -> EntryId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// FixedClock を使えば timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_entry_id(&self) -> EntryId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        EntryId::from(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, ManualClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    #[test]
    fn entry_ids_do_not_collide() {
        let ids = UlidGenerator::new(SystemClock);
        let batch: HashSet<EntryId> = (0..1000).map(|_| ids.generate_entry_id()).collect();
        assert_eq!(batch.len(), 1000);
    }

    #[test]
    fn timestamp_part_follows_the_clock() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let ids = UlidGenerator::new(FixedClock::new(at));

        let ulid: Ulid = ids.generate_entry_id().as_str().parse().unwrap();
        assert_eq!(ulid.timestamp_ms(), at.timestamp_millis() as u64);
    }

    #[test]
    fn later_ids_sort_after_earlier_ones() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let ids = UlidGenerator::new(clock.clone());

        let first = ids.generate_entry_id();
        clock.advance(chrono::Duration::milliseconds(5));
        let second = ids.generate_entry_id();

        assert!(first.as_str() < second.as_str());
    }
}
