use fxhash::FxBuildHasher;
use indexmap::{IndexMap, IndexSet};

/// A type alias for a hash map with a fast hash function.
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;
/// A type alias for a hash set with a fast hash function.
pub type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;
/// A set of `usize` ids, used throughout for vertex/variable/factor indices.
pub type Set = FxIndexSet<usize>;
/// A map keyed by `usize` ids, used for sparse per-vertex/per-variable lookups.
pub type Map<V> = FxIndexMap<usize, V>;
