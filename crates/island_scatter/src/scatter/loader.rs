//! Sequential asynchronous resource loading.
//!
//! A [`ResourceLoader`] is the host's streaming system. [`AsyncResourceLoader`] drives it
//! one reference at a time: it requests the next load only after the previous one has
//! reported completion through its [`LoadCompletion`].
use std::collections::BTreeMap;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::scatter::ResourceRef;

/// A resolved resource, ready to be handed to a [`crate::scatter::PlacementHost`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    pub reference: ResourceRef,
    /// Host-assigned identifier.
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Completed {
    generation: u64,
    request: usize,
}

/// One-shot completion callback for an async load request.
///
/// Dropping it without calling [`LoadCompletion::complete`] leaves the request pending.
#[derive(Debug)]
pub struct LoadCompletion {
    tx: Sender<Completed>,
    generation: u64,
    request: usize,
}

impl LoadCompletion {
    pub fn complete(self) {
        let _ = self.tx.send(Completed {
            generation: self.generation,
            request: self.request,
        });
    }
}

/// Host streaming system.
pub trait ResourceLoader {
    /// Starts loading `reference`; `on_complete` fires once the load has finished.
    fn request_async_load(&mut self, reference: &ResourceRef, on_complete: LoadCompletion);

    /// Resolves an already loaded (or synchronously loadable) resource.
    fn load_synchronous(&mut self, reference: &ResourceRef) -> Option<ResourceHandle>;

    /// Gives the loader a chance to make progress. Called once per scheduler tick.
    fn update(&mut self) {}
}

/// Progress reported by [`AsyncResourceLoader::poll`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadProgress {
    /// The resource at `index` finished loading.
    Loaded { index: usize, reference: ResourceRef },
    /// Every resource is loaded.
    Complete,
}

/// Loads a list of references one after the other.
#[derive(Debug)]
pub struct AsyncResourceLoader {
    references: Vec<ResourceRef>,
    cursor: usize,
    generation: u64,
    in_flight: bool,
    complete: bool,
    waited: f32,
    timeout: Option<f32>,
    tx: Sender<Completed>,
    rx: Receiver<Completed>,
}

impl Default for AsyncResourceLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

impl AsyncResourceLoader {
    /// Creates a loader that fails a request after `timeout` time units without completion.
    pub fn new(timeout: Option<f32>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            references: Vec::new(),
            cursor: 0,
            generation: 0,
            in_flight: false,
            complete: false,
            waited: 0.0,
            timeout,
            tx,
            rx,
        }
    }

    /// Starts a new load run, discarding any previous one.
    ///
    /// An empty list is complete immediately.
    pub fn start(&mut self, references: Vec<ResourceRef>, loader: &mut dyn ResourceLoader) {
        self.generation += 1;
        self.references = references;
        self.cursor = 0;
        self.in_flight = false;
        self.waited = 0.0;
        self.complete = self.references.is_empty();
        if self.complete {
            warn!("Resource list is empty; nothing to load.");
            return;
        }
        self.request_next(loader);
    }

    /// Abandons the current run. Late completions are ignored.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.references.clear();
        self.cursor = 0;
        self.in_flight = false;
        self.complete = false;
        self.waited = 0.0;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of resources loaded so far in this run.
    pub fn loaded_count(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    fn request_next(&mut self, loader: &mut dyn ResourceLoader) {
        let completion = LoadCompletion {
            tx: self.tx.clone(),
            generation: self.generation,
            request: self.cursor,
        };
        self.in_flight = true;
        self.waited = 0.0;
        loader.request_async_load(&self.references[self.cursor], completion);
    }

    /// Advances the run by `dt` time units and drains completions.
    pub fn poll(&mut self, dt: f32, loader: &mut dyn ResourceLoader) -> Result<Vec<LoadProgress>> {
        let mut progress = Vec::new();
        if self.complete {
            progress.push(LoadProgress::Complete);
            return Ok(progress);
        }
        loader.update();

        while let Ok(done) = self.rx.try_recv() {
            if done.generation != self.generation || done.request != self.cursor {
                continue;
            }
            let reference = self.references[self.cursor].clone();
            debug!("Async load completed for index {} ('{}').", self.cursor, reference);
            progress.push(LoadProgress::Loaded {
                index: self.cursor,
                reference,
            });
            self.cursor += 1;
            self.in_flight = false;
            if self.cursor >= self.references.len() {
                self.complete = true;
                progress.push(LoadProgress::Complete);
                return Ok(progress);
            }
            self.request_next(loader);
        }

        if self.in_flight && progress.is_empty() {
            self.waited += dt;
            if let Some(limit) = self.timeout {
                if self.waited >= limit {
                    return Err(Error::LoadTimeout {
                        reference: self.references[self.cursor].to_string(),
                        waited: self.waited,
                    });
                }
            }
        }
        Ok(progress)
    }
}

#[derive(Debug)]
struct Pending {
    completion: LoadCompletion,
    remaining: u32,
}

/// In-process [`ResourceLoader`] with per-reference latency.
///
/// Registered references complete after their configured number of
/// [`ResourceLoader::update`] calls; unknown references never complete.
#[derive(Debug, Default)]
pub struct InMemoryLoader {
    latency: BTreeMap<ResourceRef, u32>,
    pending: Vec<Pending>,
    /// Every async request, in order.
    pub requests: Vec<ResourceRef>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `reference` to complete after `updates` calls to `update`.
    pub fn with_resource(mut self, reference: impl Into<ResourceRef>, updates: u32) -> Self {
        self.latency.insert(reference.into(), updates);
        self
    }

    pub fn insert(&mut self, reference: impl Into<ResourceRef>, updates: u32) {
        self.latency.insert(reference.into(), updates);
    }

    /// Requests that have not completed yet.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl ResourceLoader for InMemoryLoader {
    fn request_async_load(&mut self, reference: &ResourceRef, on_complete: LoadCompletion) {
        self.requests.push(reference.clone());
        match self.latency.get(reference) {
            Some(0) => on_complete.complete(),
            Some(&remaining) => self.pending.push(Pending {
                completion: on_complete,
                remaining,
            }),
            None => {
                debug!("Unknown resource '{reference}' requested; it will never load.");
                self.pending.push(Pending {
                    completion: on_complete,
                    remaining: u32::MAX,
                });
            }
        }
    }

    fn load_synchronous(&mut self, reference: &ResourceRef) -> Option<ResourceHandle> {
        let (index, _) = self
            .latency
            .keys()
            .enumerate()
            .find(|(_, r)| *r == reference)?;
        Some(ResourceHandle {
            reference: reference.clone(),
            id: index as u64,
        })
    }

    fn update(&mut self) {
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for mut p in self.pending.drain(..) {
            if p.remaining == u32::MAX {
                still_pending.push(p);
                continue;
            }
            p.remaining = p.remaining.saturating_sub(1);
            if p.remaining == 0 {
                p.completion.complete();
            } else {
                still_pending.push(p);
            }
        }
        self.pending = still_pending;
    }
}
