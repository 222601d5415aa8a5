//! Background render thread.
//!
//! [`RenderWorker::spawn`] moves a [`RenderInfo`] onto its own thread and
//! runs [`render`] there. The owner polls for completion with a timeout
//! and may copy the partially finished image out in the meantime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::renderer::{render, FrameBuffer, RenderInfo, RenderStats};
use crate::{RenderError, RenderResult};

/// Handle to a render running on a dedicated thread.
///
/// Dropping the handle cancels the render and waits for the thread.
pub struct RenderWorker {
    frame: Arc<FrameBuffer>,
    cancel: Arc<AtomicBool>,
    done_rx: Receiver<RenderResult<RenderStats>>,
    result: Option<RenderResult<RenderStats>>,
    handle: Option<JoinHandle<()>>,
}

impl RenderWorker {
    pub fn spawn(info: RenderInfo) -> Self {
        let frame = Arc::new(FrameBuffer::new(info.width, info.height));
        let cancel = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();

        let handle = {
            let frame = frame.clone();
            let cancel = cancel.clone();
            thread::spawn(move || {
                let result = render(&info, &frame, &cancel);
                // The receiver may already be gone if the owner stopped waiting
                let _ = done_tx.send(result);
            })
        };

        Self {
            frame,
            cancel,
            done_rx,
            result: None,
            handle: Some(handle),
        }
    }

    /// Wait up to `timeout` for the render to finish.
    ///
    /// Returns `true` once the render has ended, successfully or not.
    pub fn wait_for(&mut self, timeout: Duration) -> bool {
        if self.result.is_some() {
            return true;
        }
        match self.done_rx.recv_timeout(timeout) {
            Ok(result) => {
                self.result = Some(result);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                // The thread ended without reporting: it panicked
                self.result = Some(Err(RenderError::WorkerPanicked));
                true
            }
        }
    }

    /// Copy of the image as rendered so far.
    pub fn snapshot(&self) -> Vec<u8> {
        self.frame.snapshot()
    }

    pub fn rows_completed(&self) -> u32 {
        self.frame.rows_completed()
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    /// Ask the render to stop after the row in progress.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Wait for the thread and return the render result.
    pub fn join(mut self) -> RenderResult<RenderStats> {
        self.finish()
    }

    fn finish(&mut self) -> RenderResult<RenderStats> {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(RenderError::WorkerPanicked);
            }
        }
        self.result
            .take()
            .or_else(|| self.done_rx.try_recv().ok())
            .unwrap_or(Err(RenderError::WorkerPanicked))
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
            if let Err(e) = self.finish() {
                log::debug!("Render worker stopped: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderSettings;
    use lumo_core::{Environment, Material, Mesh, Model, Scene};
    use lumo_math::{Camera, Vec3};

    fn scene() -> Scene {
        let mut model = Model::new();
        let floor = model.add_material(Material::diffuse(Vec3::splat(0.5)));
        model
            .add_mesh(
                Mesh::new(
                    "floor",
                    vec![
                        Vec3::new(-5.0, -1.0, 5.0),
                        Vec3::new(5.0, -1.0, 5.0),
                        Vec3::new(5.0, -1.0, -5.0),
                        Vec3::new(-5.0, -1.0, -5.0),
                    ],
                    vec![0, 1, 2, 0, 2, 3],
                    None,
                    None,
                    floor,
                )
                .unwrap(),
            )
            .unwrap();
        let camera = Camera::look_at(Vec3::new(0.0, 0.5, 4.0), Vec3::ZERO, Vec3::Y, 50f32.to_radians(), 0.1, 100.0);
        Scene::new(model, camera, Environment::uniform(Vec3::ONE))
    }

    fn info(width: u32, height: u32, sample_num: u32) -> RenderInfo {
        let settings = RenderSettings {
            subpixel_num: 1,
            sample_num,
            recursive_depth: 2,
            parallel: false,
            ..Default::default()
        };
        RenderInfo::new(&scene(), width, height, settings).unwrap()
    }

    #[test]
    fn test_worker_completes() {
        let mut worker = RenderWorker::spawn(info(8, 6, 1));
        while !worker.wait_for(Duration::from_millis(10)) {}
        assert_eq!(worker.rows_completed(), 6);
        // Polling again after completion keeps reporting done
        assert!(worker.wait_for(Duration::ZERO));

        let snapshot = worker.snapshot();
        assert_eq!(snapshot.len(), 8 * 6 * 3);

        let stats = worker.join().unwrap();
        assert_eq!(stats.rows, 6);
        assert_eq!(stats.samples, 48);
    }

    #[test]
    fn test_worker_snapshot_matches_direct_render() {
        let mut worker = RenderWorker::spawn(info(5, 4, 2));
        while !worker.wait_for(Duration::from_millis(10)) {}
        let from_worker = worker.snapshot();

        let direct = info(5, 4, 2);
        let frame = FrameBuffer::new(5, 4);
        render(&direct, &frame, &AtomicBool::new(false)).unwrap();
        assert_eq!(from_worker, frame.snapshot());
    }

    #[test]
    fn test_worker_cancel() {
        // Large enough that it cannot finish before the cancel lands
        let worker = RenderWorker::spawn(info(256, 2048, 64));
        worker.cancel();
        let result = worker.join();
        assert!(matches!(result, Err(RenderError::Cancelled)));
    }

    #[test]
    fn test_worker_drop_cancels() {
        let worker = RenderWorker::spawn(info(256, 2048, 64));
        drop(worker);
    }
}
