//! Background island builds.
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use tracing::error;

use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::island::{IslandBuild, IslandMeshBuilder};
use crate::mesh::GeometryKernel;
use crate::seed::SeedStream;

/// Handle to an island build running on a worker thread.
///
/// The build runs as one unit; the result is published exactly once when every stage
/// has finished.
pub struct BuildTask<M> {
    rx: Receiver<Result<IslandBuild<M>>>,
    handle: Option<JoinHandle<()>>,
}

impl<M: Send + 'static> BuildTask<M> {
    pub(crate) fn spawn<K, S>(
        mut builder: IslandMeshBuilder<K>,
        container: M,
        mut seed: SeedStream,
        mut sink: S,
    ) -> Result<Self>
    where
        K: GeometryKernel<Mesh = M> + Send + 'static,
        S: EventSink + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("island-build".into())
            .spawn(move || {
                let result = builder.build(Some(container), &mut seed, &mut sink);
                let _ = tx.send(result);
            })?;
        Ok(Self {
            rx,
            handle: Some(handle),
        })
    }
}

impl<M> BuildTask<M> {
    /// Returns the build once it is done, or `None` while it is still running.
    pub fn try_finish(&mut self) -> Option<Result<IslandBuild<M>>> {
        match self.rx.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(Error::BuildPanicked))
            }
        }
    }

    /// Blocks until the build is done.
    pub fn wait(mut self) -> Result<IslandBuild<M>> {
        let result = self.rx.recv().unwrap_or(Err(Error::BuildPanicked));
        self.join();
        result
    }

    /// True once the worker has published its result or exited.
    pub fn is_finished(&self) -> bool {
        !self.rx.is_empty() || self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Island build worker panicked.");
            }
        }
    }
}
