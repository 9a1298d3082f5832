//! Property-based invariants for atom interning and fact storage.

use bytelog::atom_table::AtomTable;
use bytelog::fact_db::FactDb;
use proptest::prelude::*;

proptest! {
    #[test]
    fn intern_is_idempotent_for_any_string(s in "[a-zA-Z_][a-zA-Z0-9_]{0,16}") {
        let mut table = AtomTable::new();
        let first = table.intern(&s);
        let second = table.intern(&s);
        prop_assert_eq!(first, second);
        prop_assert_eq!(table.name(first), Some(s.as_str()));
    }

    #[test]
    fn distinct_strings_never_collide(a in "[a-z]{1,10}", b in "[a-z]{1,10}") {
        prop_assume!(a != b);
        let mut table = AtomTable::new();
        let ida = table.intern(&a);
        let idb = table.intern(&b);
        prop_assert_ne!(ida, idb);
    }

    #[test]
    fn add_then_add_again_grows_db_by_one(rel in 0u32..5, a in 0i64..100, b in 0i64..100) {
        let mut db = FactDb::new();
        let before = db.size(rel);
        db.add(rel, a, b);
        db.add(rel, a, b);
        prop_assert_eq!(db.size(rel), before + 1);
        prop_assert!(db.contains(rel, a, b));
    }
}
