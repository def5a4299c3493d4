//! Test fixtures for registry graphs and source texts.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::analysis::pascal_case;
use crate::core::{EntryId, Namespace, RegistryEntry, SourceUnitRef};
use crate::sources::{BackingStore, MemoryStore, StoreError, WritableStore};

/// A component source that default-exports `name`.
pub fn component_source(name: &str) -> String {
    format!(
        "export default function {name}() {{\n  return <div className=\"{lower}\" />;\n}}\n",
        name = name,
        lower = name.to_lowercase()
    )
}

/// A demo rendering `name` imported from `path`.
pub fn demo_source(name: &str, path: &str) -> String {
    format!(
        "import {{ {name} }} from \"{path}\";\n\nexport default function Demo() {{\n  return <{name} />;\n}}\n"
    )
}

/// Builder for a MemoryStore populated with linked entries.
///
/// Each entry gets a generated component (named after its slug) and demo.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    entries: Vec<(String, Vec<(String, String)>)>,
    namespaces: HashMap<String, Namespace>,
    externals: HashMap<String, Vec<(String, String)>>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry with `(local path, slug)` internal dependencies.
    pub fn entry(mut self, id: &str, deps: &[(&str, &str)]) -> Self {
        let deps = deps
            .iter()
            .map(|(path, slug)| (path.to_string(), slug.to_string()))
            .collect();
        self.entries.push((id.to_string(), deps));
        self
    }

    /// Set the namespace of a previously added entry.
    pub fn namespace(mut self, id: &str, namespace: &str) -> Self {
        let ns = namespace.parse().unwrap_or_default();
        self.namespaces.insert(id.to_string(), ns);
        self
    }

    /// Give an entry external package dependencies.
    pub fn external(mut self, id: &str, packages: &[(&str, &str)]) -> Self {
        self.externals.insert(
            id.to_string(),
            packages
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn build(self) -> MemoryStore {
        let store = MemoryStore::new();

        for (id, deps) in self.entries {
            let entry_id = EntryId::parse(&id).unwrap();
            let name = pascal_case(entry_id.slug()).unwrap_or_else(|| entry_id.slug().to_string());
            let code = store.put_source_unit(&component_source(&name)).unwrap();
            let demo = store
                .put_source_unit(&demo_source(&name, &format!("./{}", entry_id.slug())))
                .unwrap();

            let namespace = self.namespaces.get(&id).cloned().unwrap_or_default();
            let mut entry = RegistryEntry::new(entry_id, name.clone(), namespace, code, demo);
            entry.exported_names = vec![name];
            entry.demo_export_name = "Demo".to_string();
            entry.internal_dependencies = deps.into_iter().collect();
            if let Some(packages) = self.externals.get(&id) {
                entry.external_dependencies = packages.iter().cloned().collect();
            }

            store.put_entry(&entry, None).unwrap();
        }

        store
    }
}

/// A store wrapper that counts entry fetches, optionally failing them.
pub struct CountingStore<'a, S: BackingStore + ?Sized> {
    inner: &'a S,
    fetches: Mutex<HashMap<String, usize>>,
    failure: Option<StoreError>,
}

impl<'a, S: BackingStore + ?Sized> CountingStore<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        CountingStore {
            inner,
            fetches: Mutex::new(HashMap::new()),
            failure: None,
        }
    }

    /// Fail every entry fetch with `err`.
    pub fn failing_with(mut self, err: StoreError) -> Self {
        self.failure = Some(err);
        self
    }

    /// Number of times `id` was fetched.
    pub fn fetches(&self, id: &str) -> usize {
        self.fetches.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    /// Total number of entry fetches.
    pub fn total(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }
}

impl<S: BackingStore + ?Sized> BackingStore for CountingStore<'_, S> {
    fn name(&self) -> &str {
        "counting"
    }

    fn fetch_entry(&self, id: &EntryId) -> Result<RegistryEntry, StoreError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_insert(0) += 1;

        match &self.failure {
            Some(err) => Err(err.clone()),
            None => self.inner.fetch_entry(id),
        }
    }

    fn fetch_source_text(&self, unit: &SourceUnitRef) -> Result<String, StoreError> {
        self.inner.fetch_source_text(unit)
    }
}
