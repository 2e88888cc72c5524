//! Turns a submitted URL into a tracked download.
//!
//! [`Orchestrator::submit`] validates the URL, records it as processing and
//! spawns one request to the preparation service. The outcome comes back over
//! a channel and is applied by [`Orchestrator::poll`], which the UI calls every
//! frame, so the registry is only ever touched from the UI thread.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ValidationError};
use crate::model::{DownloadFormat, DownloadId};
use crate::notify::Notification;
use crate::registry::DownloadRegistry;
use crate::service::PrepareService;
use crate::video_url::{derive_title, validate_url};

/// What happened to a valid submission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// A record was created and its request is in flight
    Started(DownloadId),
    /// Another request is still in flight; nothing was done
    Busy,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OrchestratorOptions {
    /// Give up on the service after this long
    pub timeout: Option<Duration>,
    /// Cancelling a processing record leaves it listed as cancelled
    pub keep_cancelled: bool,
    /// Cancelling the in-flight record aborts its request
    pub abort_on_cancel: bool,
}

struct Resolution {
    id: DownloadId,
    outcome: Result<String, ServiceError>,
}

struct InFlight {
    id: DownloadId,
    task: JoinHandle<()>,
}

pub struct Orchestrator {
    service: Arc<dyn PrepareService>,
    runtime: Handle,
    options: OrchestratorOptions,
    notifications: UnboundedSender<Notification>,
    resolution_tx: UnboundedSender<Resolution>,
    resolution_rx: UnboundedReceiver<Resolution>,
    in_flight: Option<InFlight>,
}

impl Orchestrator {
    pub fn new(
        service: Arc<dyn PrepareService>,
        runtime: Handle,
        options: OrchestratorOptions,
        notifications: UnboundedSender<Notification>,
    ) -> Self {
        let (resolution_tx, resolution_rx) = unbounded_channel();
        Self {
            service,
            runtime,
            options,
            notifications,
            resolution_tx,
            resolution_rx,
            in_flight: None,
        }
    }

    /// Whether a request is outstanding; new submissions are ignored until it resolves.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn submit(
        &mut self,
        registry: &mut DownloadRegistry,
        raw_url: &str,
        format: DownloadFormat,
    ) -> Result<Submission, ValidationError> {
        let url = match validate_url(raw_url) {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, "rejected submission");
                self.notify(Notification::error(
                    "Invalid YouTube URL",
                    "Please enter a valid YouTube video URL.",
                ));
                return Err(err);
            }
        };

        if self.in_flight.is_some() {
            debug!(%url, "request already in flight, ignoring submission");
            return Ok(Submission::Busy);
        }

        let title = derive_title(&url);
        let id = registry.add(url.clone(), title, format)?;
        info!(%id, %url, ?format, "download submitted");
        self.notify(Notification::info("Processing your download...", "Please wait a moment."));

        let task = self.spawn_request(id, url, format);
        self.in_flight = Some(InFlight { id, task });
        Ok(Submission::Started(id))
    }

    /// Applies every outcome that has arrived. Returns how many were handled.
    pub fn poll(&mut self, registry: &mut DownloadRegistry) -> usize {
        // Checked before draining: a finished task has already sent whatever it will send
        let finished = self.in_flight.as_ref().is_some_and(|f| f.task.is_finished());

        let mut handled = 0;
        while let Ok(resolution) = self.resolution_rx.try_recv() {
            self.resolve(registry, resolution);
            handled += 1;
        }

        // Still occupied means the task ended without reporting (it panicked)
        if finished {
            if let Some(lost) = self.in_flight.take() {
                warn!(id = %lost.id, "request task ended without an outcome");
                self.apply(registry, lost.id, Err(ServiceError::Interrupted));
                handled += 1;
            }
        }
        handled
    }

    /// Cancel button handler. Returns false when the record was already gone.
    pub fn cancel(&mut self, registry: &mut DownloadRegistry, id: DownloadId) -> bool {
        let processing = registry.get(id).is_some_and(|r| r.status().is_processing());

        if self.options.abort_on_cancel && self.in_flight.as_ref().is_some_and(|f| f.id == id) {
            if let Some(aborted) = self.in_flight.take() {
                debug!(%id, "aborting in-flight request");
                aborted.task.abort();
            }
        }

        if processing && self.options.keep_cancelled {
            info!(%id, "download cancelled");
            return registry.mark_cancelled(id);
        }
        let removed = registry.remove(id);
        if removed {
            info!(%id, "download removed");
        }
        removed
    }

    fn spawn_request(&self, id: DownloadId, url: String, format: DownloadFormat) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let tx = self.resolution_tx.clone();
        let timeout = self.options.timeout;

        self.runtime.spawn(async move {
            let call = service.prepare(&url, format);
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ServiceError::Timeout(limit)),
                },
                None => call.await,
            };
            // The orchestrator holds the receiver for as long as it lives
            tx.send(Resolution { id, outcome }).ok();
        })
    }

    fn resolve(&mut self, registry: &mut DownloadRegistry, resolution: Resolution) {
        if self.in_flight.as_ref().is_some_and(|f| f.id == resolution.id) {
            self.in_flight = None;
        }
        self.apply(registry, resolution.id, resolution.outcome);
    }

    fn apply(&self, registry: &mut DownloadRegistry, id: DownloadId, outcome: Result<String, ServiceError>) {
        match outcome {
            Ok(location) => {
                if registry.mark_ready(id, location) {
                    info!(%id, "download ready");
                    self.notify(Notification::success(
                        "Download is ready!",
                        "Your file is now available to download.",
                    ));
                } else {
                    debug!(%id, "dropping result for cancelled download");
                }
            }
            Err(err) => {
                let message = err.user_message();
                if registry.mark_error(id, message.clone()) {
                    warn!(%id, error = %err, "download failed");
                    self.notify(Notification::error("Download failed", message));
                } else {
                    debug!(%id, error = %err, "dropping failure for cancelled download");
                }
            }
        }
    }

    fn notify(&self, notification: Notification) {
        // Toasts are optional
        self.notifications.send(notification).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DownloadStatus;
    use crate::notify::NotificationLevel;
    use crate::service::HttpPrepareService;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::oneshot;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_URL: &str = "https://youtu.be/dQw4w9WgXcQ";

    impl Orchestrator {
        /// Waits for the next outcome and applies it.
        async fn next_resolution(&mut self, registry: &mut DownloadRegistry) -> DownloadId {
            let resolution = self.resolution_rx.recv().await.unwrap();
            let id = resolution.id;
            self.resolve(registry, resolution);
            id
        }
    }

    struct Answer(Result<&'static str, &'static str>);

    #[async_trait]
    impl PrepareService for Answer {
        async fn prepare(&self, _url: &str, _format: DownloadFormat) -> Result<String, ServiceError> {
            match self.0 {
                Ok(location) => Ok(location.to_string()),
                Err(message) => Err(ServiceError::Malformed(message.to_string())),
            }
        }
    }

    /// Holds the request open until the test releases it.
    struct Gated {
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl Gated {
        fn new() -> (Self, oneshot::Sender<()>) {
            let (tx, rx) = oneshot::channel();
            (Self { gate: Mutex::new(Some(rx)) }, tx)
        }
    }

    #[async_trait]
    impl PrepareService for Gated {
        async fn prepare(&self, _url: &str, _format: DownloadFormat) -> Result<String, ServiceError> {
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.await.ok();
            }
            Ok("https://files.example/late.mp4".to_string())
        }
    }

    struct Panics;

    #[async_trait]
    impl PrepareService for Panics {
        async fn prepare(&self, _url: &str, _format: DownloadFormat) -> Result<String, ServiceError> {
            panic!("service blew up")
        }
    }

    fn orchestrator(
        service: impl PrepareService + 'static,
        options: OrchestratorOptions,
    ) -> (Orchestrator, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();
        (Orchestrator::new(Arc::new(service), Handle::current(), options, tx), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    #[tokio::test]
    async fn valid_url_becomes_ready() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "downloadUrl": "https://files.example/x.mp4" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        let endpoint = reqwest::Url::parse(&format!("{}/api/download", server.uri())).unwrap();
        let (mut orch, mut notes) = orchestrator(HttpPrepareService::new(endpoint), OrchestratorOptions::default());
        let mut registry = DownloadRegistry::new();

        let submission = orch.submit(&mut registry, VALID_URL, DownloadFormat::Video).unwrap();
        let Submission::Started(id) = submission else {
            panic!("expected a started submission, got {submission:?}");
        };

        assert_eq!(registry.len(), 1);
        let record = registry.get(id).unwrap();
        assert_eq!(record.status(), &DownloadStatus::Processing);
        assert!(record.title().contains("dQw4w9WgXcQ"));
        assert!(orch.is_busy());

        assert_eq!(orch.next_resolution(&mut registry).await, id);

        let record = registry.get(id).unwrap();
        assert_eq!(record.result_location(), Some("https://files.example/x.mp4"));
        assert_eq!(record.error_message(), None);
        assert!(!orch.is_busy());

        let levels: Vec<_> = drain(&mut notes).into_iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![NotificationLevel::Info, NotificationLevel::Success]);
    }

    #[tokio::test]
    async fn invalid_url_creates_nothing() {
        let (mut orch, mut notes) = orchestrator(Answer(Ok("unused")), OrchestratorOptions::default());
        let mut registry = DownloadRegistry::new();

        let err = orch.submit(&mut registry, "not a url", DownloadFormat::Video).unwrap_err();

        assert_eq!(err, ValidationError::UnsupportedUrl("not a url".into()));
        assert!(registry.is_empty());
        assert!(!orch.is_busy());
        let notes = drain(&mut notes);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
        assert_eq!(notes[0].title, "Invalid YouTube URL");
    }

    #[tokio::test]
    async fn network_failure_marks_error() {
        let service = HttpPrepareService::new(reqwest::Url::parse("http://127.0.0.1:1/api/download").unwrap());
        let (mut orch, mut notes) = orchestrator(service, OrchestratorOptions::default());
        let mut registry = DownloadRegistry::new();

        orch.submit(&mut registry, VALID_URL, DownloadFormat::Audio).unwrap();
        let id = orch.next_resolution(&mut registry).await;

        let record = registry.get(id).unwrap();
        let message = record.error_message().unwrap();
        assert!(!message.is_empty());
        assert_eq!(record.result_location(), None);
        assert!(!orch.is_busy());

        let last = drain(&mut notes).pop().unwrap();
        assert_eq!(last.level, NotificationLevel::Error);
        assert_eq!(last.title, "Download failed");
        assert_eq!(last.description, message);
    }

    #[tokio::test]
    async fn second_submission_is_ignored_while_busy() {
        let (service, release) = Gated::new();
        let (mut orch, _notes) = orchestrator(service, OrchestratorOptions::default());
        let mut registry = DownloadRegistry::new();

        orch.submit(&mut registry, VALID_URL, DownloadFormat::Video).unwrap();
        let second = orch
            .submit(&mut registry, "https://www.youtube.com/watch?v=aaaaaaaaaaa", DownloadFormat::Audio)
            .unwrap();

        assert_eq!(second, Submission::Busy);
        assert_eq!(registry.len(), 1);

        release.send(()).unwrap();
        orch.next_resolution(&mut registry).await;
        assert!(!orch.is_busy());
        assert!(matches!(
            orch.submit(&mut registry, VALID_URL, DownloadFormat::Audio).unwrap(),
            Submission::Started(_)
        ));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn resolution_after_removal_is_dropped() {
        let (service, release) = Gated::new();
        let (mut orch, mut notes) = orchestrator(service, OrchestratorOptions::default());
        let mut registry = DownloadRegistry::new();

        let Submission::Started(id) = orch.submit(&mut registry, VALID_URL, DownloadFormat::Video).unwrap() else {
            panic!("expected a started submission");
        };
        assert!(orch.cancel(&mut registry, id));
        assert!(registry.is_empty());
        // The request keeps running, so the guard holds until it lands
        assert!(orch.is_busy());

        release.send(()).unwrap();
        orch.next_resolution(&mut registry).await;

        assert!(registry.is_empty());
        assert!(!orch.is_busy());
        let levels: Vec<_> = drain(&mut notes).into_iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![NotificationLevel::Info]);
    }

    #[tokio::test]
    async fn keep_cancelled_leaves_record_listed() {
        let (service, release) = Gated::new();
        let options = OrchestratorOptions { keep_cancelled: true, ..Default::default() };
        let (mut orch, _notes) = orchestrator(service, options);
        let mut registry = DownloadRegistry::new();

        let Submission::Started(id) = orch.submit(&mut registry, VALID_URL, DownloadFormat::Video).unwrap() else {
            panic!("expected a started submission");
        };
        assert!(orch.cancel(&mut registry, id));
        assert_eq!(registry.get(id).unwrap().status(), &DownloadStatus::Cancelled);

        release.send(()).unwrap();
        orch.next_resolution(&mut registry).await;
        assert_eq!(registry.get(id).unwrap().status(), &DownloadStatus::Cancelled);

        // Cancelling again dismisses it
        assert!(orch.cancel(&mut registry, id));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn abort_on_cancel_frees_the_slot() {
        let (service, _release) = Gated::new();
        let options = OrchestratorOptions { abort_on_cancel: true, ..Default::default() };
        let (mut orch, _notes) = orchestrator(service, options);
        let mut registry = DownloadRegistry::new();

        let Submission::Started(id) = orch.submit(&mut registry, VALID_URL, DownloadFormat::Video).unwrap() else {
            panic!("expected a started submission");
        };
        assert!(orch.cancel(&mut registry, id));

        assert!(!orch.is_busy());
        assert!(registry.is_empty());
        assert_eq!(orch.poll(&mut registry), 0);
    }

    #[tokio::test]
    async fn timeout_resolves_to_error() {
        let (service, _release) = Gated::new();
        let options = OrchestratorOptions { timeout: Some(Duration::from_millis(20)), ..Default::default() };
        let (mut orch, _notes) = orchestrator(service, options);
        let mut registry = DownloadRegistry::new();

        orch.submit(&mut registry, VALID_URL, DownloadFormat::Video).unwrap();
        let id = orch.next_resolution(&mut registry).await;

        assert_eq!(registry.get(id).unwrap().error_message(), Some("request timed out after 20ms"));
    }

    #[tokio::test]
    async fn service_failure_message_is_attached() {
        let (mut orch, _notes) = orchestrator(Answer(Err("no formats")), OrchestratorOptions::default());
        let mut registry = DownloadRegistry::new();

        orch.submit(&mut registry, VALID_URL, DownloadFormat::Video).unwrap();
        let id = orch.next_resolution(&mut registry).await;

        assert_eq!(registry.get(id).unwrap().error_message(), Some("malformed response: no formats"));
    }

    #[tokio::test]
    async fn poll_reaps_a_panicked_request() {
        let (mut orch, _notes) = orchestrator(Panics, OrchestratorOptions::default());
        let mut registry = DownloadRegistry::new();

        let Submission::Started(id) = orch.submit(&mut registry, VALID_URL, DownloadFormat::Video).unwrap() else {
            panic!("expected a started submission");
        };
        for _ in 0..100 {
            if orch.poll(&mut registry) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(!orch.is_busy());
        assert_eq!(
            registry.get(id).unwrap().error_message(),
            Some(crate::error::UNKNOWN_ERROR)
        );
    }
}
