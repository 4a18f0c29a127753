/// A name to entry mapping filled once at start-up.
///
/// Entries are only added while the registry is being built inside a
/// `OnceLock` initializer, so shared references never see it change.
pub struct Registry<T: 'static> {
    entries: Vec<(&'static str, T)>,
}

impl<T: 'static> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, name: &'static str, entry: T) {
        assert!(
            self.get(name).is_none(),
            "{name} registered more than once"
        );
        self.entries.push((name, entry));
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(entry_name, _)| *entry_name == name)
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
