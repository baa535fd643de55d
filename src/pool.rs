//! Fixed-size pool of resolver workers
//!
//! Workers share one submission receiver and push every outcome onto an
//! unbounded result channel. The result stream ends once submissions are
//! closed and every worker has exited, so a drained stream doubles as the
//! completion barrier.

use crate::catalog::Descriptor;
use crate::error::{CaskhashError, CaskhashResult};
use crate::resolver::{ResolutionResult, Resolver};
use futures_util::Stream;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, trace};

/// Default number of concurrent oracle calls
pub const DEFAULT_WORKERS: usize = 100;

/// Handle for feeding descriptors into a running pool
#[derive(Clone)]
pub struct Submitter {
    sender: mpsc::Sender<Descriptor>,
}

impl Submitter {
    /// Enqueue a descriptor, waiting while every worker is busy
    pub async fn submit(&self, descriptor: Descriptor) -> CaskhashResult<()> {
        self.sender
            .send(descriptor)
            .await
            .map_err(|_| CaskhashError::PoolClosed)
    }
}

/// Unordered results, one per submitted descriptor
pub struct Results {
    receiver: Option<mpsc::UnboundedReceiver<ResolutionResult>>,
}

impl Results {
    /// Next result, or `None` once the pool has fully drained
    pub async fn next(&mut self) -> Option<ResolutionResult> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => None,
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = ResolutionResult> {
        futures_util::stream::unfold(self, |mut results| async move {
            results.next().await.map(|result| (result, results))
        })
    }
}

/// Supervised set of resolver workers
pub struct WorkerPool {
    sender: Option<mpsc::Sender<Descriptor>>,
    results: Option<mpsc::UnboundedReceiver<ResolutionResult>>,
    workers: JoinSet<()>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one) on the current runtime
    pub fn start(size: usize, resolver: Arc<Resolver>) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Descriptor>(1);
        let receiver = Arc::new(Mutex::new(receiver));
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        let mut workers = JoinSet::new();
        for id in 0..size {
            workers.spawn(worker_loop(
                id,
                Arc::clone(&receiver),
                result_tx.clone(),
                Arc::clone(&resolver),
            ));
        }
        debug!("Started {} resolver workers", size);

        Self {
            sender: Some(sender),
            results: Some(result_rx),
            workers,
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// A submission handle; `None` after [`close`](Self::close)
    pub fn submitter(&self) -> Option<Submitter> {
        self.sender.as_ref().map(|sender| Submitter {
            sender: sender.clone(),
        })
    }

    /// Submit through the pool's own handle
    pub async fn submit(&self, descriptor: Descriptor) -> CaskhashResult<()> {
        match self.submitter() {
            Some(submitter) => submitter.submit(descriptor).await,
            None => Err(CaskhashError::PoolClosed),
        }
    }

    /// Stop accepting work from the pool's own handle
    ///
    /// Workers exit once every outstanding [`Submitter`] is dropped and the
    /// queue is empty.
    pub fn close(&mut self) {
        self.sender.take();
    }

    /// Take the result stream; later calls get an empty stream
    pub fn results(&mut self) -> Results {
        Results {
            receiver: self.results.take(),
        }
    }

    /// Wait for every worker to exit, surfacing panics as fatal errors
    pub async fn join(mut self) -> CaskhashResult<()> {
        self.close();
        let mut failure = None;
        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() && failure.is_none() {
                    failure = Some(CaskhashError::WorkerPanicked(e.to_string()));
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn worker_loop(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Descriptor>>>,
    results: mpsc::UnboundedSender<ResolutionResult>,
    resolver: Arc<Resolver>,
) {
    loop {
        // The lock is held only while waiting for the next job
        let job = jobs.lock().await.recv().await;
        let Some(descriptor) = job else {
            break;
        };

        let result = resolver.resolve(&descriptor).await;
        if results.send(result).is_err() {
            debug!("Result channel closed, worker {} stopping", id);
            break;
        }
    }
    trace!("Worker {} exiting", id);
}
