//! Scans agree with a sorted in-memory model

use crate::common::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9:_]{0,6}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn scans_match_btreemap_model(
        writes in prop::collection::vec((key_strategy(), "[a-z]{0,4}", "[xy]?"), 0..40),
        boundary in key_strategy(),
        limit in 0usize..20,
    ) {
        let t = TestStore::new();
        let mut model: BTreeMap<String, (String, String)> = BTreeMap::new();
        for (k, v, tag) in &writes {
            t.upsert(k, v, tag).unwrap();
            model.insert(k.clone(), (v.clone(), tag.clone()));
        }

        let expected_asc: Vec<String> = model
            .keys()
            .filter(|k| k.as_str() > boundary.as_str())
            .take(limit)
            .cloned()
            .collect();
        prop_assert_eq!(t.iterate_ascending(&boundary, limit, keys).unwrap(), expected_asc);

        let expected_desc: Vec<String> = model
            .keys()
            .rev()
            .filter(|k| k.as_str() < boundary.as_str())
            .take(limit)
            .cloned()
            .collect();
        prop_assert_eq!(t.iterate_descending(&boundary, limit, keys).unwrap(), expected_desc);

        let agg = t.count_all().unwrap();
        prop_assert_eq!(agg.count, model.len() as u64);
        prop_assert_eq!(agg.min_key, model.keys().next().cloned());
        prop_assert_eq!(agg.max_key, model.keys().next_back().cloned());

        let removed = t.delete_by_tag("x").unwrap();
        let expected_removed = model.values().filter(|(_, tag)| tag == "x").count();
        prop_assert_eq!(removed, expected_removed);
    }
}
