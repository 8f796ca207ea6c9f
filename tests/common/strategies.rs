use proptest::prelude::*;
use std::collections::BTreeSet;

/// Distinct farm ids, possibly empty
pub fn farm_ids_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(1i64..10_000, 0..40)
        .prop_map(|ids: BTreeSet<i64>| ids.into_iter().collect())
}

/// Farm ids paired with a failure subset drawn from them
pub fn farms_with_failures_strategy() -> impl Strategy<Value = (Vec<i64>, Vec<i64>)> {
    farm_ids_strategy().prop_flat_map(|ids| {
        let len = ids.len();
        (
            Just(ids.clone()),
            prop::sample::subsequence(ids, 0..=len),
        )
    })
}
