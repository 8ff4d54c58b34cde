//! End-to-end tests for the session machine with a scripted meeting, input
//! device and browser surface.

use async_trait::async_trait;
use meetrec::audio::{
    wav, AudioChunk, AudioFormat, CaptureError, DeviceOpener, InputDevice, PostProcessor,
};
use meetrec::meeting::{
    EndReason, PresenceOracle, SessionConfig, SessionError, SessionMachine, SessionPhase,
    SessionStatusHandle,
};
use meetrec::surface::{SessionSurface, SurfaceError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The meeting is running while the flag is set.
#[derive(Clone, Default)]
struct Meeting {
    running: Arc<AtomicBool>,
    checks: Arc<AtomicUsize>,
}

impl Meeting {
    fn running() -> Self {
        let meeting = Self::default();
        meeting.running.store(true, Ordering::SeqCst);
        meeting
    }

    fn end(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl PresenceOracle for Meeting {
    async fn is_active(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.running.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Browser {
    released: AtomicBool,
}

#[async_trait]
impl SessionSurface for Browser {
    async fn navigate(&self, _url: &str) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn locate(&self, _xpath: &str) -> Result<bool, SurfaceError> {
        Ok(true)
    }

    async fn click(&self, _xpath: &str) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn send_keys(&self, _xpath: &str, _text: &str) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn release(&self) -> Result<(), SurfaceError> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Produces chunks whose samples all equal the chunk's index.
struct Device {
    format: AudioFormat,
    captured: Arc<AtomicUsize>,
    meeting: Meeting,
    end_meeting_after: Option<usize>,
    fail_after: Option<usize>,
    delay: Duration,
}

impl InputDevice for Device {
    fn capture(&mut self, frames: usize) -> Result<AudioChunk, CaptureError> {
        let index = self.captured.load(Ordering::SeqCst);
        if Some(index) == self.fail_after {
            return Err(CaptureError::Device("device unplugged".to_string()));
        }

        std::thread::sleep(self.delay);
        let samples = vec![index as i16 * 100 + 50; frames * self.format.channels as usize];
        let captured = self.captured.fetch_add(1, Ordering::SeqCst) + 1;

        if Some(captured) == self.end_meeting_after {
            self.meeting.end();
        }
        Ok(AudioChunk::new(self.format, samples))
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    output: PathBuf,
    meeting: Meeting,
    browser: Arc<Browser>,
    captured: Arc<AtomicUsize>,
    device_opened: Arc<AtomicBool>,
    status: SessionStatusHandle,
}

impl Harness {
    fn new(meeting: Meeting) -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            output: dir.path().join("meeting.wav"),
            _dir: dir,
            meeting,
            browser: Arc::new(Browser::default()),
            captured: Arc::new(AtomicUsize::new(0)),
            device_opened: Arc::new(AtomicBool::new(false)),
            status: SessionStatusHandle::default(),
        }
    }

    fn config(&self, format: AudioFormat, chunk: Duration) -> SessionConfig {
        SessionConfig {
            format,
            chunk_duration: chunk,
            poll_interval: Duration::from_millis(10),
            output_path: self.output.clone(),
            post_processor: PostProcessor::default(),
        }
    }

    fn opener(
        &self,
        end_meeting_after: Option<usize>,
        fail_after: Option<usize>,
        delay: Duration,
    ) -> DeviceOpener {
        let captured = self.captured.clone();
        let meeting = self.meeting.clone();
        let opened = self.device_opened.clone();
        Box::new(move |format| {
            opened.store(true, Ordering::SeqCst);
            Ok(Box::new(Device {
                format,
                captured,
                meeting,
                end_meeting_after,
                fail_after,
                delay,
            }) as Box<dyn InputDevice>)
        })
    }

    fn machine(&self, config: SessionConfig, opener: DeviceOpener) -> SessionMachine {
        SessionMachine::new(
            config,
            Arc::new(self.meeting.clone()),
            self.browser.clone(),
            opener,
            self.status.clone(),
        )
    }

    async fn ended_transitions(&self) -> Vec<(SessionPhase, SessionPhase)> {
        self.status
            .get()
            .await
            .transitions
            .iter()
            .map(|t| (t.from, t.to))
            .collect()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn three_active_checks_record_three_seconds() {
    let h = Harness::new(Meeting::running());
    let config = h.config(AudioFormat::new(44_100, 2), Duration::from_secs(1));
    let opener = h.opener(Some(3), None, Duration::ZERO);

    let report = h
        .machine(config, opener)
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.end_reason, EndReason::SessionEnded);
    assert_eq!(report.chunks, 3);
    assert_eq!(report.frames, 132_300);
    assert!(report.capture_error.is_none());

    assert_eq!(
        h.ended_transitions().await,
        vec![
            (SessionPhase::NotStarted, SessionPhase::Active),
            (SessionPhase::Active, SessionPhase::Ended),
        ]
    );
    assert!(h.browser.released.load(Ordering::SeqCst));

    let saved = wav::read_wav(&h.output).unwrap();
    assert_eq!(saved.format, AudioFormat::new(44_100, 2));
    assert_eq!(saved.frames(), 132_300);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_session_reports_empty_recording() {
    let h = Harness::new(Meeting::default());
    let config = h.config(AudioFormat::new(44_100, 2), Duration::from_secs(1));
    let opener = h.opener(None, None, Duration::ZERO);

    let err = h
        .machine(config, opener)
        .run(CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::EmptyRecording));
    assert!(!h.device_opened.load(Ordering::SeqCst));
    assert_eq!(h.captured.load(Ordering::SeqCst), 0);
    assert!(!h.output.exists());
    assert!(h.browser.released.load(Ordering::SeqCst));

    assert_eq!(
        h.ended_transitions().await,
        vec![(SessionPhase::NotStarted, SessionPhase::Ended)]
    );
    assert!(h.status.get().await.last_error.is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn interrupt_flushes_exactly_the_captured_chunks() {
    let h = Harness::new(Meeting::running());
    let format = AudioFormat::new(8_000, 1);
    let config = h.config(format, Duration::from_millis(100));
    let opener = h.opener(None, None, Duration::from_millis(20));

    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        stopper.cancel();
    });

    let report = h.machine(config, opener).run(cancel).await.unwrap();

    let captured = h.captured.load(Ordering::SeqCst);
    assert_eq!(report.end_reason, EndReason::Interrupted);
    assert!(captured > 0);
    assert_eq!(report.chunks, captured);
    assert_eq!(report.frames, captured * 800);

    let saved = wav::read_wav(&h.output).unwrap();
    assert_eq!(saved.frames(), captured * 800);
    assert!(h.meeting.running.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn device_failure_keeps_partial_recording() {
    let h = Harness::new(Meeting::running());
    let format = AudioFormat::new(8_000, 2);
    let config = h.config(format, Duration::from_millis(100));
    let opener = h.opener(None, Some(2), Duration::ZERO);

    let report = h
        .machine(config, opener)
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.end_reason, EndReason::CaptureFailed);
    assert_eq!(report.chunks, 2);
    assert!(matches!(report.capture_error, Some(CaptureError::Device(_))));
    assert_eq!(wav::read_wav(&h.output).unwrap().frames(), 1_600);
}

#[tokio::test(flavor = "multi_thread")]
async fn post_processing_failure_keeps_raw_recording() {
    let h = Harness::new(Meeting::running());
    let format = AudioFormat::new(8_000, 1);
    let mut config = h.config(format, Duration::from_millis(100));
    // Above the 4 kHz Nyquist limit, so the pipeline refuses to run.
    config.post_processor.cutoff_hz = 6_000.0;
    let opener = h.opener(Some(2), None, Duration::ZERO);

    let err = h
        .machine(config, opener)
        .run(CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::PostProcess { .. }));

    let raw = wav::read_wav(&h.output).unwrap();
    assert_eq!(raw.frames(), 1_600);
    assert!(raw.samples[..800].iter().all(|&s| s == 50));
    assert!(raw.samples[800..].iter().all(|&s| s == 150));
}

#[tokio::test(flavor = "multi_thread")]
async fn controller_polls_independently_of_capture() {
    let h = Harness::new(Meeting::running());
    let format = AudioFormat::new(8_000, 1);
    let config = h.config(format, Duration::from_millis(100));
    // Capture is slow, so the controller's 10 ms polls notice the end first.
    let opener = h.opener(None, None, Duration::from_millis(50));

    let meeting = h.meeting.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        meeting.end();
    });

    let report = h
        .machine(config, opener)
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.end_reason, EndReason::SessionEnded);
    assert_eq!(report.chunks, h.captured.load(Ordering::SeqCst));
    assert!(h.meeting.checks.load(Ordering::SeqCst) > report.chunks + 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_length_chunks_are_refused_before_recording() {
    let h = Harness::new(Meeting::running());
    let config = h.config(AudioFormat::new(44_100, 2), Duration::ZERO);
    let opener = h.opener(None, None, Duration::ZERO);

    let err = h
        .machine(config, opener)
        .run(CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::InvalidSetting {
            name: "audio.chunk_millis",
            ..
        }
    ));
    assert!(!h.device_opened.load(Ordering::SeqCst));
    assert_eq!(h.meeting.checks.load(Ordering::SeqCst), 0);
    assert!(!h.output.exists());
    assert!(h.browser.released.load(Ordering::SeqCst));
    assert_eq!(h.status.get().await.phase, SessionPhase::NotStarted);
}
