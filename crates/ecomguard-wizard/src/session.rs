use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ecomguard_ai::VerdictClient;
use ecomguard_core::{CaptureContext, CapturedImage, Submission, render_appeal};
use ecomguard_store::EvidenceStore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::identity::IdentityProvider;
use crate::state::{SubmitPlan, WizardState};
use crate::WizardError;

/// One active wizard: the state value plus the collaborators it calls out to.
///
/// Cloning yields another handle to the same session. The state lock is only
/// held for the synchronous transitions, never across an external call.
#[derive(Clone)]
pub struct WizardSession {
    state: Arc<Mutex<WizardState>>,
    verdicts: VerdictClient,
    store: Arc<dyn EvidenceStore>,
    identity: Arc<dyn IdentityProvider>,
    context: CaptureContext,
}

impl WizardSession {
    pub fn new(
        verdicts: VerdictClient,
        store: Arc<dyn EvidenceStore>,
        identity: Arc<dyn IdentityProvider>,
        context: CaptureContext,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(WizardState::new())),
            verdicts,
            store,
            identity,
            context,
        }
    }

    fn lock(&self) -> MutexGuard<'_, WizardState> {
        // Transitions never panic mid-update, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> WizardState {
        self.lock().clone()
    }

    pub fn set_tracking_id(&self, text: impl Into<String>) -> Result<(), WizardError> {
        self.lock().set_tracking_id(text)
    }

    pub fn advance_to_capture(&self) -> Result<(), WizardError> {
        let mut state = self.lock();
        state.advance_to_capture()?;
        info!(tracking_id = %state.tracking_id(), "advanced to capture");
        Ok(())
    }

    pub fn back(&self) -> Result<(), WizardError> {
        self.lock().back()
    }

    pub fn reset_for_next_item(&self) -> Result<(), WizardError> {
        self.lock().reset_for_next_item()?;
        info!("wizard reset for next item");
        Ok(())
    }

    /// Store a photo and start its AI check in the background.
    ///
    /// The returned handle resolves once the verdict has been applied, or
    /// discarded because a newer capture superseded it. Must be called from
    /// within a Tokio runtime.
    pub fn capture_image(&self, bytes: Vec<u8>) -> Result<JoinHandle<()>, WizardError> {
        let image = CapturedImage::from_bytes(bytes)?;
        let id = self.lock().capture_image(image.clone())?;
        info!(capture = %id, bytes = image.len(), mime = image.mime(), "photo captured");

        let verdicts = self.verdicts.clone();
        let state = Arc::clone(&self.state);
        Ok(tokio::spawn(async move {
            let verdict = verdicts.analyze(&image).await;
            let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.apply_verdict(id, verdict) {
                debug!(capture = %id, "verdict applied");
            } else {
                debug!(capture = %id, "discarding verdict for superseded capture");
            }
        }))
    }

    /// Record the order and its packing evidence.
    ///
    /// Validation failures return before any external call, as does a
    /// submission attempted while the AI check is still running. While a
    /// submission is pending, further calls fail with
    /// [`WizardError::SubmitInProgress`].
    pub async fn submit(&self) -> Result<Submission, WizardError> {
        let plan = self
            .lock()
            .begin_submit(self.identity.current_user(), &self.context)?;
        info!(
            tracking_number = %plan.order.tracking_number,
            ai_verified = plan.metadata.ai_verified,
            "submitting evidence"
        );

        match self.persist(&plan).await {
            Ok(order_id) => {
                let submission = self.lock().complete_submit(plan, order_id);
                info!(order_id = %submission.order_id, "evidence secured");
                Ok(submission)
            }
            Err(e) => {
                self.lock().fail_submit();
                warn!(error = %e, "submission failed");
                Err(e)
            }
        }
    }

    /// Create the order, then the evidence that references it.
    async fn persist(&self, plan: &SubmitPlan) -> Result<String, WizardError> {
        let order = self
            .store
            .create_order(plan.order.clone())
            .await
            .map_err(WizardError::Persistence)?;

        if let Err(source) = self.store.create_evidence(plan.evidence_for(&order.id)).await {
            return Err(WizardError::OrphanedOrder {
                order_id: order.id,
                source,
            });
        }
        Ok(order.id)
    }

    /// Render the appeal document for the recorded submission.
    pub fn generate_legal_template(&self) -> Result<String, WizardError> {
        let submission = self.lock().begin_legal()?;
        let document = render_appeal(&submission);
        self.lock().finish_legal();
        info!(order_id = %submission.order_id, "appeal document generated");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use ecomguard_ai::{GeminiConfig, Judge, JudgeError};
    use ecomguard_core::{NewEvidence, NewOrder, Order};
    use ecomguard_store::{MemoryStore, StoreError};
    use serde_json::json;
    use tokio::sync::Notify;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::identity::StaticIdentity;
    use crate::state::WizardStep;

    const SLOW: u8 = 0xAA;

    /// Replies with the confidence encoded in the photo's last byte. Photos
    /// whose second-to-last byte is `SLOW` wait for `gate` first.
    struct ByteJudge {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Judge for ByteJudge {
        async fn judge(&self, image: &CapturedImage, _prompt: &str) -> Result<String, JudgeError> {
            let bytes = image.bytes();
            let confidence = bytes[bytes.len() - 1];
            if bytes[bytes.len() - 2] == SLOW {
                self.gate.notified().await;
            }
            Ok(format!(
                "Result: {{\"isAI\": false, \"confidence\": {confidence}, \"reasoning\": \"photo {confidence}\"}}"
            ))
        }
    }

    fn photo(slow: bool, confidence: u8) -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xE0, if slow { SLOW } else { 0 }, confidence]
    }

    /// Wraps [`MemoryStore`] with call counters, an optional gate before the
    /// order insert, and failure injection.
    #[derive(Default)]
    struct TestStore {
        inner: MemoryStore,
        order_calls: AtomicUsize,
        evidence_calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        fail_order: bool,
        fail_evidence: bool,
    }

    impl TestStore {
        fn calls(&self) -> usize {
            self.order_calls.load(Ordering::SeqCst) + self.evidence_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EvidenceStore for TestStore {
        async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
            self.order_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_order {
                return Err(StoreError::Server {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.inner.create_order(order).await
        }

        async fn create_evidence(&self, evidence: NewEvidence) -> Result<(), StoreError> {
            self.evidence_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_evidence {
                return Err(StoreError::Other("storage quota exceeded".into()));
            }
            self.inner.create_evidence(evidence).await
        }
    }

    fn session_with(
        verdicts: VerdictClient,
        store: Arc<TestStore>,
        identity: StaticIdentity,
    ) -> WizardSession {
        WizardSession::new(verdicts, store, Arc::new(identity), CaptureContext::default())
    }

    fn byte_judge() -> (VerdictClient, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let client = VerdictClient::with_judge(Arc::new(ByteJudge {
            gate: Arc::clone(&gate),
        }));
        (client, gate)
    }

    async fn wait_until(session: &WizardSession, pred: impl Fn(&WizardState) -> bool) {
        for _ in 0..1000 {
            if pred(&session.snapshot()) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn capture_applies_verdict() {
        let (verdicts, _gate) = byte_judge();
        let s = session_with(verdicts, Arc::default(), StaticIdentity::signed_in("u"));
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();

        let handle = s.capture_image(photo(false, 64)).unwrap();
        handle.await.unwrap();

        let state = s.snapshot();
        assert!(!state.is_analyzing());
        assert_eq!(state.verdict().unwrap().confidence, 64);
    }

    #[tokio::test]
    async fn empty_photo_rejected() {
        let (verdicts, _gate) = byte_judge();
        let s = session_with(verdicts, Arc::default(), StaticIdentity::signed_in("u"));
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();
        let err = s.capture_image(Vec::new()).unwrap_err();
        assert!(err.is_validation());
        assert!(s.snapshot().captured_image().is_none());
    }

    #[tokio::test]
    async fn late_verdict_for_superseded_capture_is_discarded() {
        let (verdicts, gate) = byte_judge();
        let s = session_with(verdicts, Arc::default(), StaticIdentity::signed_in("u"));
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();

        let a = s.capture_image(photo(true, 11)).unwrap();
        let b = s.capture_image(photo(false, 22)).unwrap();
        b.await.unwrap();
        assert_eq!(s.snapshot().verdict().unwrap().confidence, 22);

        gate.notify_one();
        a.await.unwrap();

        let state = s.snapshot();
        assert_eq!(state.verdict().unwrap().confidence, 22);
        assert_eq!(state.verdict().unwrap().explanation, "photo 22");
        assert!(!state.is_analyzing());
    }

    #[tokio::test]
    async fn submit_without_prerequisites_makes_no_calls() {
        let (verdicts, _gate) = byte_judge();

        // No tracking id.
        let store = Arc::new(TestStore::default());
        let s = session_with(verdicts.clone(), store.clone(), StaticIdentity::signed_in("u"));
        assert!(matches!(s.submit().await, Err(WizardError::MissingTrackingId)));
        assert_eq!(store.calls(), 0);

        // No identity.
        let store = Arc::new(TestStore::default());
        let s = session_with(verdicts.clone(), store.clone(), StaticIdentity::anonymous());
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();
        s.capture_image(photo(false, 5)).unwrap().await.unwrap();
        let err = s.submit().await.unwrap_err();
        assert!(matches!(err, WizardError::MissingIdentity));
        assert_eq!(err.to_string(), "please sign in before submitting evidence");
        assert_eq!(store.calls(), 0);

        // No photo.
        let store = Arc::new(TestStore::default());
        let s = session_with(verdicts, store.clone(), StaticIdentity::signed_in("u"));
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();
        assert!(matches!(s.submit().await, Err(WizardError::MissingImage)));
        assert_eq!(store.calls(), 0);
        assert!(!s.snapshot().is_submitting());
    }

    #[tokio::test]
    async fn submit_waits_for_pending_verdict() {
        let (verdicts, gate) = byte_judge();
        let store = Arc::new(TestStore::default());
        let s = session_with(verdicts, store.clone(), StaticIdentity::signed_in("u"));
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();
        let pending = s.capture_image(photo(true, 91)).unwrap();

        assert!(matches!(s.submit().await, Err(WizardError::AnalysisInProgress)));
        assert_eq!(store.calls(), 0);
        assert_eq!(s.snapshot().step(), WizardStep::Capture);
        assert!(!s.snapshot().is_submitting());

        gate.notify_one();
        pending.await.unwrap();
        s.submit().await.unwrap();

        let meta = serde_json::to_value(&store.inner.evidences()[0].metadata).unwrap();
        assert_eq!(meta["ai_verified"], json!(true));
        assert_eq!(meta["ai_score"], json!(91));
    }

    #[tokio::test]
    async fn timed_out_judgment_still_submits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "candidates": [] }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let verdicts = VerdictClient::from_config(&GeminiConfig {
            api_key: Some("k".into()),
            endpoint: server.uri(),
            timeout: Duration::from_millis(100),
            ..GeminiConfig::default()
        })
        .unwrap();

        let store = Arc::new(TestStore::default());
        let s = session_with(verdicts, store.clone(), StaticIdentity::signed_in("seller-1"));
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();
        s.capture_image(photo(false, 0)).unwrap().await.unwrap();

        let verdict = s.snapshot().verdict().cloned().unwrap();
        assert!(verdict.failed);
        assert!(!verdict.is_likely_ai);

        let submission = s.submit().await.unwrap();
        assert_eq!(submission.tracking_number, "JNE123");
        assert_eq!(s.snapshot().step(), WizardStep::Done);

        let evidences = store.inner.evidences();
        assert_eq!(evidences.len(), 1);
        let meta = serde_json::to_value(&evidences[0].metadata).unwrap();
        assert_eq!(meta["ai_verified"], json!(false));
        assert!(meta.get("ai_score").is_none());
        assert_eq!(store.inner.orders()[0].seller_id.as_str(), "seller-1");
    }

    #[tokio::test]
    async fn concurrent_submit_rejected() {
        let (verdicts, _judge_gate) = byte_judge();
        let gate = Arc::new(Notify::new());
        let store = Arc::new(TestStore {
            gate: Some(Arc::clone(&gate)),
            ..TestStore::default()
        });
        let s = session_with(verdicts, store.clone(), StaticIdentity::signed_in("u"));
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();
        s.capture_image(photo(false, 50)).unwrap().await.unwrap();

        let first = tokio::spawn({
            let s = s.clone();
            async move { s.submit().await }
        });
        wait_until(&s, |st| st.is_submitting()).await;

        assert!(matches!(s.submit().await, Err(WizardError::SubmitInProgress)));

        gate.notify_one();
        let submission = first.await.unwrap().unwrap();
        assert_eq!(submission.order_id, "order-1");
        assert_eq!(store.order_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.inner.orders().len(), 1);
        assert_eq!(store.inner.evidences().len(), 1);
    }

    #[tokio::test]
    async fn order_failure_skips_evidence() {
        let (verdicts, _gate) = byte_judge();
        let store = Arc::new(TestStore {
            fail_order: true,
            ..TestStore::default()
        });
        let s = session_with(verdicts, store.clone(), StaticIdentity::signed_in("u"));
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();
        s.capture_image(photo(false, 50)).unwrap().await.unwrap();

        let err = s.submit().await.unwrap_err();
        assert!(matches!(err, WizardError::Persistence(StoreError::Server { status: 503, .. })));
        assert_eq!(store.evidence_calls.load(Ordering::SeqCst), 0);

        let state = s.snapshot();
        assert_eq!(state.step(), WizardStep::Capture);
        assert!(!state.is_submitting());
    }

    #[tokio::test]
    async fn evidence_failure_reports_orphaned_order() {
        let (verdicts, _gate) = byte_judge();
        let store = Arc::new(TestStore {
            fail_evidence: true,
            ..TestStore::default()
        });
        let s = session_with(verdicts, store.clone(), StaticIdentity::signed_in("u"));
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();
        s.capture_image(photo(false, 50)).unwrap().await.unwrap();

        match s.submit().await.unwrap_err() {
            WizardError::OrphanedOrder { order_id, .. } => assert_eq!(order_id, "order-1"),
            other => panic!("unexpected error: {other}"),
        }
        let state = s.snapshot();
        assert_eq!(state.step(), WizardStep::Capture);
        assert!(!state.is_submitting());
        assert!(state.captured_image().is_some());
    }

    #[tokio::test]
    async fn reset_after_done_clears_record() {
        let (verdicts, _gate) = byte_judge();
        let s = session_with(verdicts, Arc::default(), StaticIdentity::signed_in("u"));
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();
        s.capture_image(photo(false, 80)).unwrap().await.unwrap();
        s.submit().await.unwrap();

        let appeal = s.generate_legal_template().unwrap();
        assert!(appeal.contains("JNE123"));
        assert!(!s.snapshot().is_legal_generating());

        s.reset_for_next_item().unwrap();
        let state = s.snapshot();
        assert_eq!(state.step(), WizardStep::Identify);
        assert_eq!(state.tracking_id(), "");
        assert!(state.captured_image().is_none());
        assert!(state.verdict().is_none());
        assert!(matches!(
            s.generate_legal_template(),
            Err(WizardError::InvalidStep { .. })
        ));
    }

    #[tokio::test]
    async fn back_while_analysing_drops_late_verdict() {
        let (verdicts, gate) = byte_judge();
        let s = session_with(verdicts, Arc::default(), StaticIdentity::signed_in("u"));
        s.set_tracking_id("JNE123").unwrap();
        s.advance_to_capture().unwrap();
        let pending = s.capture_image(photo(true, 33)).unwrap();

        s.back().unwrap();
        s.advance_to_capture().unwrap();
        gate.notify_one();
        pending.await.unwrap();

        let state = s.snapshot();
        assert!(state.verdict().is_none());
        assert!(state.captured_image().is_none());
    }
}
