//! Asynchronous tile loading with a fixed worker pool.
//!
//! Tile fetches are the only blocking operation in the engine and must never
//! run on the render thread. Requests go into a bounded work queue feeding a
//! fixed pool of worker threads; completed payloads come back through a
//! bounded done channel the render thread drains once per frame. Workers
//! produce CPU-side payloads only — GPU uploads happen on the render thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;
use tracing::warn;

use crate::error::RasterError;
use crate::payload::TilePayload;
use crate::source::RasterSource;
use crate::tile::RasterTileIdentifier;

/// A completed tile load, ready to apply on the render thread.
#[derive(Clone, Debug)]
pub struct LoadedTile {
    pub id: RasterTileIdentifier,
    pub payload: Arc<TilePayload>,
}

struct QueuedRequest {
    id: RasterTileIdentifier,
    cancelled: Arc<AtomicBool>,
}

struct Completion {
    id: RasterTileIdentifier,
    result: Result<TilePayload, RasterError>,
}

/// Loads raster tiles on background threads.
///
/// The in-flight map doubles as duplicate suppression: a second request for
/// an identifier already queued or executing is rejected, so one tile is
/// never fetched twice concurrently.
pub struct AsyncTileLoader {
    task_sender: Sender<QueuedRequest>,
    result_receiver: Receiver<Completion>,
    in_flight_tasks: Arc<DashMap<RasterTileIdentifier, Arc<AtomicBool>>>,
    in_flight: Arc<AtomicU64>,
}

impl AsyncTileLoader {
    /// Spawn `thread_count` workers loading from `source`.
    ///
    /// `queue_capacity` bounds both the work queue and the done channel;
    /// excess requests are rejected rather than queued without bound.
    pub fn new(source: Arc<dyn RasterSource>, thread_count: usize, queue_capacity: usize) -> Self {
        assert!(thread_count > 0, "loader needs at least one worker");
        assert!(queue_capacity > 0, "loader queue capacity must be nonzero");

        let (task_sender, task_receiver) = bounded::<QueuedRequest>(queue_capacity);
        let (result_sender, result_receiver) = bounded::<Completion>(queue_capacity);
        let in_flight = Arc::new(AtomicU64::new(0));

        for _ in 0..thread_count {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let source = Arc::clone(&source);
            let in_flight = Arc::clone(&in_flight);

            std::thread::Builder::new()
                .name("tile-loader".into())
                .spawn(move || {
                    while let Ok(request) = receiver.recv() {
                        if request.cancelled.load(Ordering::Relaxed) {
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }

                        let result = source.load_tile_payload(request.id);

                        if !request.cancelled.load(Ordering::Relaxed) {
                            let _ = sender.send(Completion {
                                id: request.id,
                                result,
                            });
                        }

                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })
                .expect("failed to spawn tile loader worker");
        }

        Self {
            task_sender,
            result_receiver,
            in_flight_tasks: Arc::new(DashMap::new()),
            in_flight,
        }
    }

    /// A loader sized from the CPU count, leaving headroom for the render
    /// thread.
    pub fn with_defaults(source: Arc<dyn RasterSource>) -> Self {
        let cpus = num_cpus::get().max(2);
        Self::new(source, (cpus - 1).min(4), 128)
    }

    /// Queue a tile for loading.
    ///
    /// Returns `false` without queueing if the tile is already in flight or
    /// the work queue is full; the caller simply re-requests on a later
    /// frame.
    pub fn request(&self, id: RasterTileIdentifier) -> bool {
        if self.in_flight_tasks.contains_key(&id) {
            return false;
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        self.in_flight_tasks.insert(id, Arc::clone(&cancelled));
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        let queued = self.task_sender.try_send(QueuedRequest { id, cancelled });
        if queued.is_err() {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            self.in_flight_tasks.remove(&id);
            return false;
        }
        true
    }

    /// Cancel a pending or executing load. A completed load is unaffected.
    pub fn cancel(&self, id: RasterTileIdentifier) {
        if let Some((_, cancelled)) = self.in_flight_tasks.remove(&id) {
            cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Drain completed loads. Call once per frame on the render thread,
    /// before rendering consumes any freshly completed tile.
    ///
    /// Failed loads are logged and dropped; the tile leaves the in-flight
    /// set so a later frame can retry it.
    pub fn drain_completed(&self) -> Vec<LoadedTile> {
        let mut completed = Vec::new();
        while let Ok(completion) = self.result_receiver.try_recv() {
            self.in_flight_tasks.remove(&completion.id);
            match completion.result {
                Ok(payload) => completed.push(LoadedTile {
                    id: completion.id,
                    payload: Arc::new(payload),
                }),
                Err(error) => {
                    warn!(tile = %completion.id, %error, "tile load failed, will retry");
                }
            }
        }
        completed
    }

    /// Number of requests queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// True if a request for this identifier is queued or executing.
    pub fn is_pending(&self, id: RasterTileIdentifier) -> bool {
        self.in_flight_tasks.contains_key(&id)
    }

    /// Identifiers of every queued or executing request, for staleness
    /// sweeps.
    pub fn pending_ids(&self) -> Vec<RasterTileIdentifier> {
        self.in_flight_tasks.iter().map(|entry| *entry.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{MemoryTileFetcher, TileFetcher};
    use crate::source::{RasterPyramid, RasterSourceSpec};
    use tellus_math::GeodeticExtent;

    /// A source that serves a constant-height tile, with optional failures.
    struct StubSource {
        pyramid: RasterPyramid,
        fail_x: i64,
    }

    impl StubSource {
        fn new(fail_x: i64) -> Self {
            let spec = RasterSourceSpec {
                extent: GeodeticExtent::whole_globe(),
                level_count: 4,
                tile_longitude_posts: 8,
                tile_latitude_posts: 8,
                level_zero_delta_longitude: 20.0,
                level_zero_delta_latitude: 20.0,
            };
            Self {
                pyramid: spec.build(),
                fail_x,
            }
        }
    }

    impl RasterSource for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        fn pyramid(&self) -> &RasterPyramid {
            &self.pyramid
        }

        fn load_tile_payload(
            &self,
            id: RasterTileIdentifier,
        ) -> Result<TilePayload, RasterError> {
            if id.x == self.fail_x {
                return Err(RasterError::Fetch {
                    url: format!("stub://{id}"),
                    message: "synthetic failure".into(),
                });
            }
            Ok(TilePayload::new(
                8,
                8,
                crate::payload::TileData::Height32F(vec![id.x as f32; 64]),
            ))
        }
    }

    fn drain_until(loader: &AsyncTileLoader, count: usize) -> Vec<LoadedTile> {
        let mut results = Vec::new();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while results.len() < count && std::time::Instant::now() < deadline {
            results.extend(loader.drain_completed());
            if results.len() < count {
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
        }
        results
    }

    #[test]
    fn test_requests_complete_and_clear_in_flight() {
        let loader = AsyncTileLoader::new(Arc::new(StubSource::new(-999)), 2, 32);

        for x in 0..6 {
            assert!(loader.request(RasterTileIdentifier::new(0, x, 0)));
        }
        let results = drain_until(&loader, 6);

        assert_eq!(results.len(), 6);
        assert_eq!(loader.in_flight_count(), 0);
        assert!(!loader.is_pending(RasterTileIdentifier::new(0, 0, 0)));
    }

    /// A duplicate request while the first is in flight is rejected.
    #[test]
    fn test_duplicate_request_rejected() {
        let loader = AsyncTileLoader::new(Arc::new(StubSource::new(-999)), 1, 32);
        let id = RasterTileIdentifier::new(0, 3, 3);

        assert!(loader.request(id));
        // Either still queued or already done; a duplicate is only rejected
        // while pending, so check the pending case explicitly.
        if loader.is_pending(id) {
            assert!(!loader.request(id));
        }
        drain_until(&loader, 1);
    }

    /// Failed loads are dropped from the drain but leave the in-flight set,
    /// allowing a retry on a later frame.
    #[test]
    fn test_failures_are_dropped_and_retryable() {
        let loader = AsyncTileLoader::new(Arc::new(StubSource::new(2)), 2, 32);

        assert!(loader.request(RasterTileIdentifier::new(0, 2, 0)));
        assert!(loader.request(RasterTileIdentifier::new(0, 5, 0)));

        let results = drain_until(&loader, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.x, 5);

        // Wait for the failure to clear the in-flight set, then retry.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while loader.is_pending(RasterTileIdentifier::new(0, 2, 0))
            && std::time::Instant::now() < deadline
        {
            loader.drain_completed();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(loader.request(RasterTileIdentifier::new(0, 2, 0)));
    }

    #[test]
    fn test_cancelled_request_result_is_discarded() {
        let loader = AsyncTileLoader::new(Arc::new(StubSource::new(-999)), 1, 32);
        let id = RasterTileIdentifier::new(0, 1, 1);

        loader.request(id);
        loader.cancel(id);

        // The result may or may not arrive depending on timing; the contract
        // is that a cancelled id is no longer pending.
        std::thread::sleep(std::time::Duration::from_millis(100));
        loader.drain_completed();
        assert!(!loader.is_pending(id));
    }

    #[test]
    fn test_memory_fetcher_is_sync_capable() {
        // Compile-time check that the fetcher can cross thread boundaries.
        fn assert_fetcher(_f: Arc<dyn TileFetcher>) {}
        assert_fetcher(Arc::new(MemoryTileFetcher::new()));
    }
}
