//! Background text recognition for annotated regions.
//!
//! An [`OcrWorker`] owns one background thread and one [`TextRecognizer`].
//! Requests are queued over a channel and processed strictly one at a time,
//! so "recognize everything" never runs more than one job concurrently.
//! Results are collected without blocking through
//! [`OcrWorker::take_one_result`] and applied to the session, which checks
//! that the annotation still exists before writing anything.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use image::DynamicImage;
use thiserror::Error;
use web_time::Instant;

use crate::model::{AnnotationId, FieldPath};

/// Errors from the recognition service or the worker itself.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The recognizer could not produce text.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// The region to recognize has no pixels.
    #[error("empty region")]
    EmptyRegion,

    /// The worker thread could not be started.
    #[error("failed to spawn OCR thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl OcrError {
    pub fn recognition(message: impl Into<String>) -> Self {
        OcrError::Recognition(message.into())
    }
}

/// An opaque text-in-region service.
pub trait TextRecognizer: Send + 'static {
    /// Recognize the text in `region`.
    fn recognize(&mut self, region: &DynamicImage) -> Result<String, OcrError>;
}

impl<F> TextRecognizer for F
where
    F: FnMut(&DynamicImage) -> Result<String, OcrError> + Send + 'static,
{
    fn recognize(&mut self, region: &DynamicImage) -> Result<String, OcrError> {
        self(region)
    }
}

/// One region to recognize, tagged with the box it came from.
#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub annotation_id: AnnotationId,
    pub label: FieldPath,
    pub region: DynamicImage,
}

/// Completed recognition. Failures are reported as empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrResult {
    pub annotation_id: AnnotationId,
    pub label: FieldPath,
    pub text: String,
}

/// Message sent to the worker thread.
enum WorkerMessage {
    Recognize(OcrRequest),
    Shutdown,
}

/// Manages the background recognition thread.
pub struct OcrWorker {
    request_tx: Sender<WorkerMessage>,
    result_rx: Receiver<OcrResult>,
    thread_handle: Option<JoinHandle<()>>,
    /// Outstanding requests per annotation (a box may be queued twice)
    pending: HashMap<AnnotationId, usize>,
}

impl OcrWorker {
    /// Spawn a worker thread driving `recognizer`.
    pub fn spawn(recognizer: impl TextRecognizer) -> Result<Self, OcrError> {
        let (request_tx, request_rx) = mpsc::channel::<WorkerMessage>();
        let (result_tx, result_rx) = mpsc::channel::<OcrResult>();

        let thread_handle = thread::Builder::new()
            .name("ocr-worker".to_string())
            .spawn(move || {
                log::info!("OCR worker thread started");
                Self::thread_loop(recognizer, request_rx, result_tx);
                log::info!("OCR worker thread exiting");
            })?;

        Ok(Self {
            request_tx,
            result_rx,
            thread_handle: Some(thread_handle),
            pending: HashMap::new(),
        })
    }

    fn thread_loop(
        mut recognizer: impl TextRecognizer,
        request_rx: Receiver<WorkerMessage>,
        result_tx: Sender<OcrResult>,
    ) {
        loop {
            match request_rx.recv() {
                Ok(WorkerMessage::Recognize(request)) => {
                    let result = Self::run(&mut recognizer, request);
                    if result_tx.send(result).is_err() {
                        log::warn!("Result channel closed, OCR thread exiting");
                        break;
                    }
                }
                Ok(WorkerMessage::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Request channel closed, OCR thread exiting");
                    break;
                }
            }
        }
    }

    fn run(recognizer: &mut impl TextRecognizer, request: OcrRequest) -> OcrResult {
        let start = Instant::now();
        let outcome = if request.region.width() == 0 || request.region.height() == 0 {
            Err(OcrError::EmptyRegion)
        } else {
            recognizer.recognize(&request.region)
        };

        let text = match outcome {
            Ok(text) => {
                log::debug!(
                    "Recognized {} in {:.1}ms",
                    request.label,
                    start.elapsed().as_secs_f64() * 1000.0
                );
                text.trim().to_string()
            }
            Err(e) => {
                log::warn!("OCR failed for {} ({}): {}", request.annotation_id, request.label, e);
                String::new()
            }
        };

        OcrResult {
            annotation_id: request.annotation_id,
            label: request.label,
            text,
        }
    }

    /// Queue a region for recognition.
    pub fn request(&mut self, request: OcrRequest) {
        let id = request.annotation_id;
        if self
            .request_tx
            .send(WorkerMessage::Recognize(request))
            .is_err()
        {
            log::error!("Failed to send OCR request: channel closed");
            return;
        }
        *self.pending.entry(id).or_default() += 1;
        log::debug!("Queued OCR for {id}");
    }

    /// Queue several regions; they are processed in order.
    pub fn request_all(&mut self, requests: impl IntoIterator<Item = OcrRequest>) {
        for request in requests {
            self.request(request);
        }
    }

    /// Take one completed result, oldest first. Non-blocking.
    pub fn take_one_result(&mut self) -> Option<OcrResult> {
        match self.result_rx.try_recv() {
            Ok(result) => {
                self.mark_done(result.annotation_id);
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("OCR thread disconnected");
                None
            }
        }
    }

    /// Block until the next result arrives. Returns None if nothing is
    /// pending or the thread has gone away.
    pub fn wait_one_result(&mut self) -> Option<OcrResult> {
        if self.pending.is_empty() {
            return None;
        }
        let result = self.result_rx.recv().ok()?;
        self.mark_done(result.annotation_id);
        Some(result)
    }

    fn mark_done(&mut self, id: AnnotationId) {
        if let Some(count) = self.pending.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(&id);
            }
        }
    }

    /// Number of queued or running requests.
    pub fn pending_count(&self) -> usize {
        self.pending.values().sum()
    }

    /// Whether a request for this annotation is outstanding.
    pub fn is_pending(&self, id: AnnotationId) -> bool {
        self.pending.contains_key(&id)
    }
}

impl Drop for OcrWorker {
    fn drop(&mut self) {
        log::debug!("Shutting down OCR worker thread");

        // Send shutdown signal
        let _ = self.request_tx.send(WorkerMessage::Shutdown);

        // Wait for thread to finish
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("OCR thread panicked: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(label: &str, w: u32, h: u32) -> OcrRequest {
        OcrRequest {
            annotation_id: uuid::Uuid::new_v4(),
            label: FieldPath::parse(label).unwrap(),
            region: DynamicImage::new_rgb8(w, h),
        }
    }

    #[test]
    fn test_results_arrive_in_request_order() {
        let recognizer = |region: &DynamicImage| -> Result<String, OcrError> {
            Ok(format!(" {}x{} ", region.width(), region.height()))
        };
        let mut worker = OcrWorker::spawn(recognizer).unwrap();

        let first = request("buyer.gstin", 10, 4);
        let second = request("seller.gstin", 20, 8);
        let (id1, id2) = (first.annotation_id, second.annotation_id);
        worker.request_all([first, second]);
        assert_eq!(worker.pending_count(), 2);

        let r1 = worker.wait_one_result().unwrap();
        let r2 = worker.wait_one_result().unwrap();
        assert_eq!((r1.annotation_id, r1.text.as_str()), (id1, "10x4"));
        assert_eq!((r2.annotation_id, r2.text.as_str()), (id2, "20x8"));
        assert_eq!(worker.pending_count(), 0);
        assert!(worker.wait_one_result().is_none());
    }

    #[test]
    fn test_failure_becomes_empty_text() {
        let recognizer = |_: &DynamicImage| -> Result<String, OcrError> {
            Err(OcrError::recognition("engine offline"))
        };
        let mut worker = OcrWorker::spawn(recognizer).unwrap();
        let req = request("invoice.date", 5, 5);
        let id = req.annotation_id;
        worker.request(req);
        assert!(worker.is_pending(id));

        let result = worker.wait_one_result().unwrap();
        assert_eq!(result.annotation_id, id);
        assert!(result.text.is_empty());
        assert!(!worker.is_pending(id));
    }

    #[test]
    fn test_empty_region_skips_recognizer() {
        let recognizer = |_: &DynamicImage| -> Result<String, OcrError> {
            panic!("recognizer must not see empty regions")
        };
        let mut worker = OcrWorker::spawn(recognizer).unwrap();
        worker.request(request("invoice.date", 0, 5));
        let result = worker.wait_one_result().unwrap();
        assert!(result.text.is_empty());
    }

    #[test]
    fn test_take_one_result_is_non_blocking() {
        let recognizer = |_: &DynamicImage| -> Result<String, OcrError> { Ok(String::new()) };
        let mut worker = OcrWorker::spawn(recognizer).unwrap();
        assert!(worker.take_one_result().is_none());
    }
}
