//! Property tests for batch accumulation.

use ferry_protocol::{DeltaBatch, PropertyMap, ID_KEY};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Upsert(u8),
    Delete(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Upsert),
        (0u8..8).prop_map(Op::Delete),
    ]
}

fn snapshot(id: &str) -> PropertyMap {
    let mut map = PropertyMap::new();
    map.insert(ID_KEY.into(), id.into());
    map
}

proptest! {
    #[test]
    fn upserts_and_deletions_stay_disjoint(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let mut batch = DeltaBatch::new(1, 0, false);
        for op in &ops {
            match op {
                Op::Upsert(n) => {
                    batch.add_entity(snapshot(&format!("e{n}"))).unwrap();
                }
                Op::Delete(n) => batch.add_deleted_entity(format!("e{n}")),
            }
        }

        for id in batch.deleted_entities() {
            prop_assert!(!batch.contains_entity(id));
        }
    }

    #[test]
    fn deletion_wins_regardless_of_order(id in 0u8..8, upsert_first in any::<bool>()) {
        let id = format!("e{id}");
        let mut batch = DeltaBatch::new(1, 0, false);
        if upsert_first {
            batch.add_entity(snapshot(&id)).unwrap();
            batch.add_deleted_entity(id.clone());
        } else {
            batch.add_deleted_entity(id.clone());
            batch.add_entity(snapshot(&id)).unwrap();
        }

        prop_assert!(batch.contains_deleted_entity(&id));
        prop_assert!(!batch.contains_entity(&id));
    }
}
