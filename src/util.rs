use std::fmt::{self, Display, Formatter};

pub(crate) type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;
pub(crate) type HashMap<K, V> = hashbrown::HashMap<K, V, BuildHasher>;
pub(crate) type HashSet<K> = hashbrown::HashSet<K, BuildHasher>;
pub type IndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type IndexSet<K> = indexmap::IndexSet<K, BuildHasher>;

/// Interned name of a term or an operation.
///
/// Symbols are cheap to copy and compare. Their hash depends on the
/// global interning order, so anything that is iterated while building
/// a quest must live in an [`IndexMap`]/[`IndexSet`] to stay reproducible.
pub type Symbol = symbol_table::GlobalSymbol;

/// Displays a list of items separated by a fixed string.
pub struct ListDisplay<'a, TS>(pub TS, pub &'a str);

impl<TS> Display for ListDisplay<'_, TS>
where
    TS: Clone + IntoIterator,
    TS::Item: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut did_something = false;
        for item in self.0.clone().into_iter() {
            if did_something {
                f.write_str(self.1)?;
            }
            Display::fmt(&item, f)?;
            did_something = true;
        }
        Ok(())
    }
}
