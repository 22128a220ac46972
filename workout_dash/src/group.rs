use std::collections::BTreeMap;

/// Groups `items` by `key_fn` and folds every group into an accumulator with
/// `reducer`, starting from `A::default()`.
///
/// Groups are returned in ascending key order, independent of input order.
pub fn group_reduce<I, T, K, A, F, R>(items: I, key_fn: F, mut reducer: R) -> Vec<(K, A)>
where
    I: IntoIterator<Item = T>,
    K: Ord,
    A: Default,
    F: Fn(&T) -> K,
    R: FnMut(&mut A, T),
{
    let mut groups: BTreeMap<K, A> = BTreeMap::new();
    for item in items {
        let acc = groups.entry(key_fn(&item)).or_default();
        reducer(acc, item);
    }
    groups.into_iter().collect()
}
