//! Send Message use case — the exchange orchestrator.
//!
//! [`ChatService`] drives the full lifecycle of one chat exchange:
//!
//! 1. optimistic insert of the user entry and an empty agent placeholder,
//! 2. transport resolution (one-shot vs streaming, see
//!    [`select_transport`]),
//! 3. incremental application of streamed content deltas,
//! 4. completion / error finalization, and
//! 5. cancellation.
//!
//! At most one exchange is in flight per conversation: starting a new send
//! cancels the previous one before touching shared state, so there is never
//! more than one writer to the placeholder entry. Cancellation is silent —
//! it is not an error, and the placeholder keeps whatever content had
//! arrived.

use crate::classify::classify_error;
use crate::ports::chat_backend::{BackendError, ChatBackend, OneShotReply};
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::notifier::{NoNotifier, Notifier};
use crate::ports::session_directory::{NoSessionDirectory, SessionDirectory};
use crate::session_tracker::LocalSessionTracker;
use crate::transport::{SessionOverride, Transport, select_transport};
use safra_domain::{Attachment, Message, StreamEvent, Transcript};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of a `send` call.
///
/// Errors are not part of this type: they surface through the transcript
/// (`streaming_error`), the transient last-error value, and the notifier.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Set when a one-shot exchange minted a session the active
    /// navigational context does not already point at; the caller should
    /// navigate there.
    pub redirect_to: Option<String>,
}

enum Exchange {
    /// Streaming exchange completed normally.
    Streamed,
    /// One-shot exchange completed with this reply.
    OneShot(OneShotReply),
    /// The exchange was cancelled mid-flight.
    Cancelled,
}

/// Orchestrates chat exchanges for one conversation.
pub struct ChatService {
    backend: Arc<dyn ChatBackend>,
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn SessionDirectory>,
    logger: Arc<dyn ConversationLogger>,
    tracker: LocalSessionTracker,
    transcript: RwLock<Transcript>,
    session_id: RwLock<Option<String>>,
    active_context: RwLock<Option<String>>,
    last_error: RwLock<Option<String>>,
    in_flight: Mutex<Option<(u64, CancellationToken)>>,
    generation: AtomicU64,
}

impl ChatService {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            notifier: Arc::new(NoNotifier),
            directory: Arc::new(NoSessionDirectory),
            logger: Arc::new(NoConversationLogger),
            tracker: LocalSessionTracker::new(),
            transcript: RwLock::new(Transcript::new()),
            session_id: RwLock::new(None),
            active_context: RwLock::new(None),
            last_error: RwLock::new(None),
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Attach a UI notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Attach a session directory.
    pub fn with_session_directory(mut self, directory: Arc<dyn SessionDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Attach a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    // ==================== State accessors ====================

    /// Snapshot of the transcript. Safe to call while an exchange streams.
    pub fn transcript(&self) -> Transcript {
        self.transcript.read().unwrap().clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.transcript.read().unwrap().is_streaming()
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().unwrap().clone()
    }

    /// Seed the session id (e.g. from durable storage at startup).
    pub fn set_session_id(&self, session_id: Option<String>) {
        *self.session_id.write().unwrap() = session_id;
    }

    /// Record which session the surrounding navigation currently points at;
    /// one-shot completions only request a redirect when it differs.
    pub fn set_active_context(&self, session_id: Option<String>) {
        *self.active_context.write().unwrap() = session_id;
    }

    /// The transient error from the most recent failed exchange, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().unwrap().clone()
    }

    /// Whether this client run minted the given session id. Sessions minted
    /// locally need no server-side existence reconciliation.
    pub fn locally_created(&self, session_id: &str) -> bool {
        self.tracker.has(session_id)
    }

    /// Start over: cancel anything in flight, drop the transcript and the
    /// session id. The next send goes through the one-shot path.
    pub fn reset_conversation(&self) {
        self.cancel_active();
        *self.transcript.write().unwrap() = Transcript::new();
        *self.session_id.write().unwrap() = None;
        *self.active_context.write().unwrap() = None;
        *self.last_error.write().unwrap() = None;
    }

    /// Cancel the exchange currently in flight, if any. Silent by design.
    pub fn cancel_active(&self) {
        let guard = self.in_flight.lock().unwrap();
        if let Some((_, token)) = guard.as_ref() {
            token.cancel();
        }
    }

    // ==================== The exchange protocol ====================

    /// Send a message, with optional attachment metadata and an optional
    /// explicit session override.
    ///
    /// No-op when the trimmed message is empty and no attachments are given.
    /// Always returns; failures surface through state and the notifier.
    pub async fn send(
        &self,
        message: &str,
        attachments: Option<Vec<Attachment>>,
        session: SessionOverride,
    ) -> SendOutcome {
        let has_files = attachments.as_ref().is_some_and(|f| !f.is_empty());
        if message.trim().is_empty() && !has_files {
            return SendOutcome::default();
        }

        let (generation, cancel) = self.begin_exchange();
        self.notifier.on_exchange_start();

        *self.last_error.write().unwrap() = None;

        let now = chrono::Utc::now().timestamp();
        {
            let mut transcript = self.transcript.write().unwrap();
            transcript.set_streaming(true);
            transcript.prune_failed_pair();
            transcript.push(Message::user(message, attachments, now));
            // +1 keeps agent entries strictly after their user entry even
            // for same-second sends
            transcript.push(Message::agent_placeholder(now + 1));
        }

        let current = self.session_id();
        let (transport, resolved) = select_transport(current.as_deref(), &session);
        debug!(?transport, session = resolved.as_deref(), "exchange resolved");

        let result = match &transport {
            Transport::Streaming => {
                // resolved is always Some for the streaming transport
                let id = resolved.clone().unwrap_or_default();
                self.run_streaming(message, &id, &cancel).await
            }
            Transport::OneShot => self.run_one_shot(message, &cancel).await,
        };

        // A terminal event may have been buffered alongside the cancel
        // signal and won the select; the cancelled exchange must not
        // finalize either way
        let result = match result {
            Ok(Exchange::Cancelled) => Ok(Exchange::Cancelled),
            _ if cancel.is_cancelled() => Ok(Exchange::Cancelled),
            other => other,
        };

        let mut outcome = SendOutcome::default();
        match result {
            Ok(Exchange::Cancelled) => {
                debug!("exchange cancelled; placeholder left as-is");
            }
            Ok(Exchange::Streamed) => {
                let now = chrono::Utc::now().timestamp();
                let bytes = {
                    let mut transcript = self.transcript.write().unwrap();
                    transcript.refresh_last_agent_timestamp(now);
                    transcript
                        .messages()
                        .last()
                        .map(|m| m.content.len())
                        .unwrap_or(0)
                };
                if let Some(id) = resolved {
                    *self.session_id.write().unwrap() = Some(id.clone());
                    self.logger.log(ConversationEvent::new(
                        "exchange_completed",
                        serde_json::json!({
                            "session_id": id,
                            "transport": "streaming",
                            "bytes": bytes,
                        }),
                    ));
                }
                info!("streaming exchange completed ({} bytes)", bytes);
            }
            Ok(Exchange::OneShot(reply)) => {
                outcome = self.finish_one_shot(reply);
            }
            Err(error) => {
                self.finish_failed(&error);
            }
        }

        // Always: streaming flag down, token released, focus signal. A newer
        // send may have taken over mid-flight; leave its state alone then.
        if self.end_exchange(generation) {
            self.transcript.write().unwrap().set_streaming(false);
        }
        self.notifier.on_exchange_end();

        outcome
    }

    async fn run_streaming(
        &self,
        message: &str,
        session_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Exchange, BackendError> {
        let mut handle = tokio::select! {
            _ = cancel.cancelled() => return Ok(Exchange::Cancelled),
            opened = self.backend.open_stream(message, session_id) => opened?,
        };

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return Ok(Exchange::Cancelled),
                event = handle.recv() => event,
            };

            match event {
                Some(StreamEvent::Content(delta)) => {
                    // Single point of mutation: strict arrival order, plain
                    // concatenation. The token check happens under the write
                    // lock: a newer send cancels before it pushes its own
                    // placeholder, so a delta that passes the check can only
                    // land in this exchange's entry.
                    {
                        let mut transcript = self.transcript.write().unwrap();
                        if cancel.is_cancelled() {
                            return Ok(Exchange::Cancelled);
                        }
                        transcript.append_to_last_agent(&delta);
                    }
                    self.notifier.on_content_delta(&delta);
                }
                Some(StreamEvent::Usage(payload)) => {
                    debug!("usage event: {}", payload);
                    self.logger.log(ConversationEvent::new("usage", payload));
                }
                Some(StreamEvent::Error(message)) => {
                    return Err(BackendError::Stream(message));
                }
                // Channel closing without a done event ends the stream the
                // same way
                Some(StreamEvent::Done) | None => break,
            }
        }

        Ok(Exchange::Streamed)
    }

    async fn run_one_shot(
        &self,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<Exchange, BackendError> {
        // Dropping the future aborts the underlying request; a cancelled
        // one-shot is as silent as a cancelled stream.
        let reply = tokio::select! {
            _ = cancel.cancelled() => return Ok(Exchange::Cancelled),
            replied = self.backend.complete(message, None) => replied?,
        };
        Ok(Exchange::OneShot(reply))
    }

    fn finish_one_shot(&self, reply: OneShotReply) -> SendOutcome {
        let now = chrono::Utc::now().timestamp();

        if !self.tracker.has(&reply.session_id) {
            self.tracker.add(&reply.session_id);
            self.directory.record(&reply.session_id);
        }

        self.transcript.write().unwrap().complete_last_agent(
            &reply.text,
            reply.message_id.clone(),
            now,
        );
        *self.session_id.write().unwrap() = Some(reply.session_id.clone());
        self.notifier.on_content_delta(&reply.text);

        self.logger.log(ConversationEvent::new(
            "exchange_completed",
            serde_json::json!({
                "session_id": reply.session_id,
                "transport": "one_shot",
                "bytes": reply.text.len(),
            }),
        ));
        info!("one-shot exchange completed, session {}", reply.session_id);

        let active = self.active_context.read().unwrap().clone();
        let redirect_to = if active.as_deref() != Some(reply.session_id.as_str()) {
            Some(reply.session_id)
        } else {
            None
        };
        SendOutcome { redirect_to }
    }

    fn finish_failed(&self, error: &BackendError) {
        let classified = classify_error(error);
        warn!("exchange failed: {}", error);

        self.transcript.write().unwrap().mark_last_agent_error();
        *self.last_error.write().unwrap() = Some(classified.message.clone());
        self.notifier.notify_error(&classified.message);

        if classified.invalidates_session {
            // Self-healing: the next send falls back to one-shot
            *self.session_id.write().unwrap() = None;
        }

        self.logger.log(ConversationEvent::new(
            "exchange_failed",
            serde_json::json!({ "message": classified.message }),
        ));
    }

    /// Install a fresh cancellation token, cancelling any prior exchange.
    fn begin_exchange(&self) -> (u64, CancellationToken) {
        let mut guard = self.in_flight.lock().unwrap();
        if let Some((_, previous)) = guard.take() {
            previous.cancel();
        }
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        *guard = Some((generation, token.clone()));
        (generation, token)
    }

    /// Release the token. Returns false when a newer exchange already took
    /// over, in which case the caller must not touch shared flags.
    fn end_exchange(&self, generation: u64) -> bool {
        let mut guard = self.in_flight.lock().unwrap();
        if guard.as_ref().is_some_and(|(g, _)| *g == generation) {
            *guard = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{SESSION_INVALID_MESSAGE, UNAUTHORIZED_MESSAGE};
    use crate::ports::chat_backend::StreamHandle;
    use async_trait::async_trait;
    use safra_domain::Role;
    use std::collections::VecDeque;
    use tokio::sync::mpsc;

    // ==================== Test Mocks ====================

    enum Scripted {
        OneShot(Result<OneShotReply, BackendError>),
        Stream(Result<Vec<StreamEvent>, BackendError>),
        /// A stream that stays open until the test drops the sender.
        OpenStream(mpsc::Receiver<StreamEvent>),
    }

    #[derive(Default)]
    struct MockBackend {
        script: Mutex<VecDeque<Scripted>>,
    }

    impl MockBackend {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(VecDeque::from(script)),
            }
        }

        fn next(&self) -> Scripted {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("backend called more times than scripted")
        }
    }

    #[async_trait]
    impl ChatBackend for MockBackend {
        async fn complete(
            &self,
            _message: &str,
            _session_id: Option<&str>,
        ) -> Result<OneShotReply, BackendError> {
            match self.next() {
                Scripted::OneShot(reply) => reply,
                _ => panic!("expected a one-shot call"),
            }
        }

        async fn open_stream(
            &self,
            _message: &str,
            _session_id: &str,
        ) -> Result<StreamHandle, BackendError> {
            match self.next() {
                Scripted::Stream(events) => events.map(StreamHandle::from_events),
                Scripted::OpenStream(receiver) => Ok(StreamHandle::new(receiver)),
                _ => panic!("expected a streaming call"),
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        errors: Mutex<Vec<String>>,
        deltas: Mutex<String>,
    }

    impl Notifier for RecordingNotifier {
        fn on_content_delta(&self, delta: &str) {
            self.deltas.lock().unwrap().push_str(delta);
        }

        fn notify_error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    #[derive(Default)]
    struct RecordingDirectory {
        recorded: Mutex<Vec<String>>,
    }

    impl SessionDirectory for RecordingDirectory {
        fn record(&self, session_id: &str) {
            self.recorded.lock().unwrap().push(session_id.to_string());
        }
    }

    fn reply(session_id: &str, text: &str, message_id: Option<&str>) -> OneShotReply {
        OneShotReply {
            session_id: session_id.to_string(),
            text: text.to_string(),
            message_id: message_id.map(str::to_string),
        }
    }

    fn service(backend: MockBackend) -> ChatService {
        ChatService::new(Arc::new(backend))
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn empty_message_without_attachments_is_noop() {
        let svc = service(MockBackend::default());
        let outcome = svc.send("   \n ", None, SessionOverride::Inherit).await;

        assert_eq!(outcome, SendOutcome::default());
        assert!(svc.transcript().is_empty());
        assert!(!svc.is_streaming());
    }

    #[tokio::test]
    async fn attachments_alone_are_enough_to_send() {
        let svc = service(MockBackend::new(vec![Scripted::OneShot(Ok(reply(
            "s1", "Received", None,
        )))]));

        svc.send(
            "",
            Some(vec![Attachment::new("cpr.pdf", 1024)]),
            SessionOverride::Inherit,
        )
        .await;

        let transcript = svc.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(
            transcript.messages()[0].files.as_ref().unwrap()[0].name,
            "cpr.pdf"
        );
    }

    #[tokio::test]
    async fn first_exchange_is_one_shot_and_mints_session() {
        let notifier = Arc::new(RecordingNotifier::default());
        let directory = Arc::new(RecordingDirectory::default());
        let svc = service(MockBackend::new(vec![Scripted::OneShot(Ok(reply(
            "s1",
            "Hi there",
            Some("m1"),
        )))]))
        .with_notifier(notifier.clone())
        .with_session_directory(directory.clone());

        let outcome = svc.send("Hello", None, SessionOverride::Inherit).await;

        let transcript = svc.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].role, Role::User);
        assert_eq!(transcript.messages()[0].content, "Hello");
        assert_eq!(transcript.messages()[1].role, Role::Agent);
        assert_eq!(transcript.messages()[1].content, "Hi there");
        assert_eq!(transcript.messages()[1].id.as_deref(), Some("m1"));

        assert_eq!(svc.session_id().as_deref(), Some("s1"));
        assert!(svc.locally_created("s1"));
        assert_eq!(directory.recorded.lock().unwrap().as_slice(), ["s1"]);
        assert_eq!(outcome.redirect_to.as_deref(), Some("s1"));
        assert!(!svc.is_streaming());
        assert!(svc.last_error().is_none());
    }

    #[tokio::test]
    async fn no_redirect_when_context_already_points_at_session() {
        let svc = service(MockBackend::new(vec![Scripted::OneShot(Ok(reply(
            "s1", "Hi", None,
        )))]));
        svc.set_active_context(Some("s1".to_string()));

        let outcome = svc.send("Hello", None, SessionOverride::Inherit).await;
        assert_eq!(outcome.redirect_to, None);
    }

    #[tokio::test]
    async fn existing_session_streams_and_concatenates_in_order() {
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = service(MockBackend::new(vec![Scripted::Stream(Ok(vec![
            StreamEvent::Content("Sure".to_string()),
            StreamEvent::Content(", ok".to_string()),
            StreamEvent::Done,
        ]))]))
        .with_notifier(notifier.clone());
        svc.set_session_id(Some("s1".to_string()));

        svc.send("Follow-up", None, SessionOverride::Inherit).await;

        let transcript = svc.transcript();
        assert_eq!(transcript.messages()[1].content, "Sure, ok");
        assert!(!transcript.messages()[1].streaming_error);
        assert_eq!(*notifier.deltas.lock().unwrap(), "Sure, ok");
        assert_eq!(svc.session_id().as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn usage_events_are_advisory_only() {
        let svc = service(MockBackend::new(vec![Scripted::Stream(Ok(vec![
            StreamEvent::Usage(serde_json::json!({"tokens": 7})),
            StreamEvent::Content("ok".to_string()),
            StreamEvent::Done,
        ]))]));
        svc.set_session_id(Some("s1".to_string()));

        svc.send("hi", None, SessionOverride::Inherit).await;
        assert_eq!(svc.transcript().messages()[1].content, "ok");
        assert!(svc.last_error().is_none());
    }

    #[tokio::test]
    async fn fresh_override_forces_one_shot_despite_session() {
        let svc = service(MockBackend::new(vec![Scripted::OneShot(Ok(reply(
            "s2", "New one", None,
        )))]));
        svc.set_session_id(Some("s1".to_string()));

        svc.send("again", None, SessionOverride::Fresh).await;
        assert_eq!(svc.session_id().as_deref(), Some("s2"));
    }

    #[tokio::test]
    async fn stream_error_event_marks_placeholder_and_toasts() {
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = service(MockBackend::new(vec![Scripted::Stream(Ok(vec![
            StreamEvent::Content("par".to_string()),
            StreamEvent::Error("quota exceeded".to_string()),
        ]))]))
        .with_notifier(notifier.clone());
        svc.set_session_id(Some("s1".to_string()));

        svc.send("hi", None, SessionOverride::Inherit).await;

        let transcript = svc.transcript();
        assert!(transcript.messages()[1].streaming_error);
        // Partial content is kept
        assert_eq!(transcript.messages()[1].content, "par");
        assert_eq!(svc.last_error().as_deref(), Some("quota exceeded"));
        assert_eq!(
            notifier.errors.lock().unwrap().as_slice(),
            ["quota exceeded"]
        );
        // Not a session failure: the session survives
        assert_eq!(svc.session_id().as_deref(), Some("s1"));
        assert!(!svc.is_streaming());
    }

    #[tokio::test]
    async fn session_invalid_failure_clears_session_for_self_healing() {
        let svc = service(MockBackend::new(vec![Scripted::Stream(Err(
            BackendError::Api {
                status: 400,
                detail: "Session not found".to_string(),
            },
        ))]));
        svc.set_session_id(Some("stale".to_string()));

        svc.send("hi", None, SessionOverride::Inherit).await;

        assert_eq!(svc.last_error().as_deref(), Some(SESSION_INVALID_MESSAGE));
        assert_eq!(svc.session_id(), None);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_fixed_message_and_keeps_session() {
        let svc = service(MockBackend::new(vec![Scripted::OneShot(Err(
            BackendError::Api {
                status: 401,
                detail: "Unauthorized".to_string(),
            },
        ))]));

        svc.send("hi", None, SessionOverride::Inherit).await;
        assert_eq!(svc.last_error().as_deref(), Some(UNAUTHORIZED_MESSAGE));
    }

    #[tokio::test]
    async fn resend_prunes_the_failed_pair_first() {
        let svc = service(MockBackend::new(vec![
            Scripted::Stream(Err(BackendError::Network("reset".to_string()))),
            Scripted::Stream(Ok(vec![
                StreamEvent::Content("better".to_string()),
                StreamEvent::Done,
            ])),
        ]));
        svc.set_session_id(Some("s1".to_string()));

        svc.send("a", None, SessionOverride::Inherit).await;
        assert_eq!(svc.transcript().len(), 2);
        assert!(svc.transcript().messages()[1].streaming_error);

        svc.send("b", None, SessionOverride::Inherit).await;

        let transcript = svc.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].content, "b");
        assert_eq!(transcript.messages()[1].content, "better");
        assert!(!transcript.messages()[1].streaming_error);
        assert!(svc.last_error().is_none());
    }

    #[tokio::test]
    async fn cancellation_is_silent_and_keeps_partial_content() {
        let (tx, rx) = mpsc::channel(8);
        let svc = Arc::new(service(MockBackend::new(vec![Scripted::OpenStream(rx)])));
        svc.set_session_id(Some("s1".to_string()));

        let sender = svc.clone();
        let task = tokio::spawn(async move {
            sender.send("hi", None, SessionOverride::Inherit).await
        });

        tx.send(StreamEvent::Content("par".to_string())).await.unwrap();
        // Wait until the delta has been applied before cancelling
        while svc.transcript().messages().len() < 2
            || svc.transcript().messages()[1].content.is_empty()
        {
            tokio::task::yield_now().await;
        }
        svc.cancel_active();
        task.await.unwrap();

        let transcript = svc.transcript();
        assert_eq!(transcript.messages()[1].content, "par");
        assert!(!transcript.messages()[1].streaming_error);
        assert!(svc.last_error().is_none());
        assert!(!svc.is_streaming());
    }

    #[tokio::test]
    async fn new_send_cancels_the_in_flight_exchange() {
        let (tx, rx) = mpsc::channel(8);
        let svc = Arc::new(service(MockBackend::new(vec![
            Scripted::OpenStream(rx),
            Scripted::Stream(Ok(vec![
                StreamEvent::Content("second".to_string()),
                StreamEvent::Done,
            ])),
        ])));
        svc.set_session_id(Some("s1".to_string()));

        let first = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.send("one", None, SessionOverride::Inherit).await })
        };
        tx.send(StreamEvent::Content("stale ".to_string())).await.unwrap();
        while svc.transcript().len() < 2
            || svc.transcript().messages()[1].content.is_empty()
        {
            tokio::task::yield_now().await;
        }

        svc.send("two", None, SessionOverride::Inherit).await;
        first.await.unwrap();

        let transcript = svc.transcript();
        // Four entries: the first pair (partially filled, no error flag)
        // and the second pair
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript.messages()[1].content, "stale ");
        assert!(!transcript.messages()[1].streaming_error);
        assert_eq!(transcript.messages()[3].content, "second");
        // The second exchange owns the streaming flag and has cleared it
        assert!(!svc.is_streaming());
        assert!(svc.last_error().is_none());
    }

    #[tokio::test]
    async fn buffered_deltas_from_a_cancelled_exchange_never_leak_into_the_next() {
        // The cancel signal and already-buffered content can both be ready
        // when the first exchange's loop wakes up; whichever way that race
        // goes, the loser's deltas must not land in the new placeholder.
        // Repeated to give the scheduler room to pick either branch.
        for _ in 0..50 {
            let (tx, rx) = mpsc::channel(16);
            let svc = Arc::new(service(MockBackend::new(vec![
                Scripted::OpenStream(rx),
                Scripted::Stream(Ok(vec![
                    StreamEvent::Content("second".to_string()),
                    StreamEvent::Done,
                ])),
            ])));
            svc.set_session_id(Some("s1".to_string()));

            let first = {
                let svc = svc.clone();
                tokio::spawn(async move { svc.send("one", None, SessionOverride::Inherit).await })
            };
            tx.send(StreamEvent::Content("first ".to_string())).await.unwrap();
            while svc.transcript().len() < 2
                || svc.transcript().messages()[1].content.is_empty()
            {
                tokio::task::yield_now().await;
            }

            // Queue deltas the first exchange has not consumed yet, then
            // let the second send cancel it mid-backlog
            for _ in 0..8 {
                tx.try_send(StreamEvent::Content("STALE".to_string())).unwrap();
            }
            svc.send("two", None, SessionOverride::Inherit).await;
            first.await.unwrap();

            let transcript = svc.transcript();
            assert_eq!(transcript.len(), 4);
            // Deltas consumed before the cancel stay in the first pair
            assert!(transcript.messages()[1].content.starts_with("first "));
            assert_eq!(transcript.messages()[3].content, "second");
        }
    }

    #[tokio::test]
    async fn reset_conversation_clears_session_and_transcript() {
        let svc = service(MockBackend::new(vec![Scripted::OneShot(Ok(reply(
            "s1", "Hi", None,
        )))]));
        svc.send("Hello", None, SessionOverride::Inherit).await;
        assert!(svc.session_id().is_some());

        svc.reset_conversation();
        assert!(svc.transcript().is_empty());
        assert_eq!(svc.session_id(), None);
    }

    #[tokio::test]
    async fn placeholder_timestamp_orders_after_user_entry() {
        let svc = service(MockBackend::new(vec![Scripted::Stream(Ok(vec![
            StreamEvent::Error("boom".to_string()),
        ]))]));
        svc.set_session_id(Some("s1".to_string()));
        svc.send("hi", None, SessionOverride::Inherit).await;

        let transcript = svc.transcript();
        // Failed exchange leaves the optimistic timestamps untouched
        assert_eq!(
            transcript.messages()[1].created_at,
            transcript.messages()[0].created_at + 1
        );
    }
}
