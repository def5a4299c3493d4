//! Registry dependency resolution.
//!
//! Computes the transitive closure of internal dependencies from a set of
//! seed identifiers. The traversal is an iterative breadth-first worklist over
//! a set of already-queued identifiers, so no identifier is fetched twice and
//! cycles terminate without a depth limit. Entries in the same frontier are
//! independent reads and may be fetched concurrently; the visited set and the
//! result are only touched by the calling thread.

pub mod errors;
pub mod resolve;

pub use errors::{NotFoundCause, ResolveError};
pub use resolve::{ResolvedEntry, ResolvedSet};

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, info_span};

use crate::core::EntryId;
use crate::sources::BackingStore;
use crate::util::config::ResolveConfig;

/// Resolution knobs.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Fetch each frontier concurrently
    pub parallel: bool,

    /// Give up once this much time has passed
    pub timeout: Option<Duration>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            parallel: true,
            timeout: None,
        }
    }
}

impl ResolveOptions {
    pub fn from_config(config: &ResolveConfig) -> Self {
        ResolveOptions {
            parallel: config.parallel,
            timeout: config.timeout(),
        }
    }
}

/// A pending fetch: the identifier and the entry that asked for it.
type Pending = (EntryId, Option<EntryId>);

/// Resolver over a backing store.
pub struct Resolver<'s, S: BackingStore + ?Sized> {
    store: &'s S,
    options: ResolveOptions,
}

impl<'s, S: BackingStore + ?Sized> Resolver<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Resolver {
            store,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve `seeds` and everything they transitively depend on.
    ///
    /// Any missing or unfetchable entry aborts the whole resolution.
    pub fn resolve<T: AsRef<str>>(&self, seeds: &[T]) -> Result<ResolvedSet, ResolveError> {
        let _span = info_span!("resolve", store = self.store.name()).entered();
        let deadline = self.options.timeout.map(|t| Instant::now() + t);

        let mut queued: HashSet<EntryId> = HashSet::new();
        let mut frontier: Vec<Pending> = Vec::new();
        for seed in seeds {
            let raw = seed.as_ref();
            let id = EntryId::parse(raw).map_err(|_| {
                ResolveError::not_found(raw.trim(), None, NotFoundCause::InvalidReference)
            })?;
            if queued.insert(id.clone()) {
                frontier.push((id, None));
            }
        }

        let mut set = ResolvedSet::new(frontier.iter().map(|(id, _)| id.clone()).collect());
        let mut edges: Vec<(EntryId, EntryId)> = Vec::new();
        let mut depth = 0usize;

        while !frontier.is_empty() {
            check_deadline(deadline, &frontier)?;

            let fetched: Vec<Result<ResolvedEntry, ResolveError>> =
                if self.options.parallel && frontier.len() > 1 {
                    frontier
                        .par_iter()
                        .map(|(id, parent)| self.fetch(id, parent.as_ref()))
                        .collect()
                } else {
                    frontier
                        .iter()
                        .map(|(id, parent)| self.fetch(id, parent.as_ref()))
                        .collect()
                };

            check_deadline(deadline, &frontier)?;

            let mut next = Vec::new();
            for result in fetched {
                let resolved = result?;
                let id = resolved.id().clone();

                for (path, value) in &resolved.entry.internal_dependencies {
                    let child = dependency_id(&id, path, value)?;
                    edges.push((id.clone(), child.clone()));
                    if queued.insert(child.clone()) {
                        debug!(parent = %id, child = %child, "discovered");
                        next.push((child, Some(id.clone())));
                    }
                }

                set.insert(resolved);
            }

            debug!(depth, fetched = frontier.len(), queued = next.len(), "frontier done");
            frontier = next;
            depth += 1;
        }

        for (from, to) in &edges {
            set.add_edge(from, to);
        }

        info!(entries = set.len(), "resolved registry dependencies");
        Ok(set)
    }

    fn fetch(&self, id: &EntryId, required_by: Option<&EntryId>) -> Result<ResolvedEntry, ResolveError> {
        let entry = self
            .store
            .fetch_entry(id)
            .map_err(|e| ResolveError::from_store(e, id, required_by))?;
        let source_text = self
            .store
            .fetch_source_text(&entry.code)
            .map_err(|e| ResolveError::from_store(e, id, required_by))?;

        debug!(%id, unit = entry.code.short(), "fetched");
        Ok(ResolvedEntry { entry, source_text })
    }
}

/// Resolve `seeds` against `store` with the given options.
pub fn resolve<S, T>(store: &S, seeds: &[T], options: ResolveOptions) -> Result<ResolvedSet, ResolveError>
where
    S: BackingStore + ?Sized,
    T: AsRef<str>,
{
    Resolver::new(store).with_options(options).resolve(seeds)
}

/// Turn one internal dependency value into the identifier it links to.
fn dependency_id(parent: &EntryId, path: &str, value: &str) -> Result<EntryId, ResolveError> {
    if value.trim().is_empty() {
        return Err(ResolveError::not_found(
            path,
            Some(parent),
            NotFoundCause::InvalidReference,
        ));
    }

    EntryId::parse_relative(value, parent.owner()).map_err(|_| {
        ResolveError::not_found(value.trim(), Some(parent), NotFoundCause::InvalidReference)
    })
}

fn check_deadline(deadline: Option<Instant>, frontier: &[Pending]) -> Result<(), ResolveError> {
    match (deadline, frontier.first()) {
        (Some(deadline), Some((id, parent))) if Instant::now() >= deadline => Err(
            ResolveError::not_found(id.to_string(), parent.as_ref(), NotFoundCause::TimedOut),
        ),
        _ => Ok(()),
    }
}
