// voice input: one utterance in, one transcript out. recognition is an
// external program run on a worker thread
use std::io;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, warn};

pub const UNSUPPORTED_MESSAGE: &str = "Voice recognition is not supported here";
pub const PERMISSION_MESSAGE: &str = "Please enable microphone access";
pub const FAILURE_MESSAGE: &str = "Sorry, there was a problem with voice recognition";

const LANG_PLACEHOLDER: &str = "{lang}";

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("no speech recognizer available")]
    Unsupported,
    #[error("microphone access denied")]
    PermissionDenied,
    #[error("recognition failed: {0}")]
    Failed(String),
}

impl SpeechError {
    pub fn user_message(&self) -> &'static str {
        match self {
            SpeechError::Unsupported => UNSUPPORTED_MESSAGE,
            SpeechError::PermissionDenied => PERMISSION_MESSAGE,
            SpeechError::Failed(_) => FAILURE_MESSAGE,
        }
    }
}

// Listen for a single utterance and return what was said. Blocks.
pub trait SpeechRecognizer: Send + Sync + 'static {
    fn listen(&self) -> Result<String, SpeechError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpeechSettings {
    // Program and arguments, e.g. `["hear", "--lang", "{lang}"]`.
    pub command: Vec<String>,
    pub lang: String,
}

// Runs the configured recognizer program and reads the transcript from
// its stdout.
#[derive(Debug)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<String>, args: &[String], lang: &str) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.replace(LANG_PLACEHOLDER, lang)).collect(),
        }
    }

    #[cfg(test)]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl SpeechRecognizer for CommandRecognizer {
    fn listen(&self) -> Result<String, SpeechError> {
        debug!(program = %self.program, args = ?self.args, "starting recognizer");
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(code = ?output.status.code(), %stderr, "recognizer failed");
            return Err(classify_failure(&stderr));
        }
        clean_transcript(&String::from_utf8_lossy(&output.stdout))
    }
}

fn spawn_error(e: io::Error) -> SpeechError {
    match e.kind() {
        io::ErrorKind::NotFound => SpeechError::Unsupported,
        io::ErrorKind::PermissionDenied => SpeechError::PermissionDenied,
        _ => SpeechError::Failed(e.to_string()),
    }
}

fn classify_failure(stderr: &str) -> SpeechError {
    let lower = stderr.to_lowercase();
    if lower.contains("permission denied") || lower.contains("not-allowed") || lower.contains("not allowed") {
        SpeechError::PermissionDenied
    } else if stderr.is_empty() {
        SpeechError::Failed("recognizer exited with an error".into())
    } else {
        SpeechError::Failed(stderr.to_string())
    }
}

// whisper-style engines print markers like [BLANK_AUDIO] on their own line
fn clean_transcript(raw: &str) -> Result<String, SpeechError> {
    let text = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('['))
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return Err(SpeechError::Failed("nothing was heard".into()));
    }
    Ok(text)
}

// Capability check: a recognizer exists only if its program is on PATH
// (or is a path that exists).
pub fn detect(settings: &SpeechSettings) -> Option<Arc<dyn SpeechRecognizer>> {
    let (program, args) = settings.command.split_first()?;
    match which::which(program) {
        Ok(path) => {
            info!(program = %path.display(), "speech recognizer found");
            Some(Arc::new(CommandRecognizer::new(
                path.to_string_lossy().into_owned(),
                args,
                &settings.lang,
            )))
        }
        Err(e) => {
            warn!(%program, error = %e, "speech recognizer not found");
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoiceEvent {
    Transcript(String),
    Failed(&'static str),
}

// The mic button: at most one recognition at a time.
pub struct VoiceInput {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    listening: bool,
    tx: Sender<Result<String, SpeechError>>,
    rx: Receiver<Result<String, SpeechError>>,
}

impl VoiceInput {
    pub fn new(recognizer: Option<Arc<dyn SpeechRecognizer>>) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        Self {
            recognizer,
            listening: false,
            tx,
            rx,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    // Start listening. Without a recognizer this fails right away and
    // starts nothing; while a recognition is running it is ignored
    // (`Ok(false)`).
    pub fn activate(&mut self) -> Result<bool, SpeechError> {
        let Some(recognizer) = self.recognizer.as_ref().map(Arc::clone) else {
            return Err(SpeechError::Unsupported);
        };
        if self.listening {
            debug!("voice input busy, ignoring");
            return Ok(false);
        }
        let tx = self.tx.clone();
        thread::Builder::new()
            .name("speech".into())
            .spawn(move || {
                let _ = tx.send(recognizer.listen());
            })
            .map_err(|e| SpeechError::Failed(e.to_string()))?;
        self.listening = true;
        info!("listening for a search");
        Ok(true)
    }

    pub fn poll(&mut self) -> Option<VoiceEvent> {
        let result = self.rx.try_recv().ok()?;
        self.listening = false;
        Some(match result {
            Ok(text) => {
                info!(transcript = %text, "voice transcript");
                VoiceEvent::Transcript(text)
            }
            Err(e) => {
                error!(error = %e, "voice recognition failed");
                VoiceEvent::Failed(e.user_message())
            }
        })
    }
}

#[cfg(test)]
impl VoiceInput {
    pub fn wait(&mut self) -> VoiceEvent {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            if let Some(event) = self.poll() {
                return event;
            }
            assert!(std::time::Instant::now() < deadline, "recognizer timed out");
            thread::sleep(std::time::Duration::from_millis(1));
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    // Hands out scripted results; an optional gate holds `listen` until
    // the test releases it.
    pub struct FakeRecognizer {
        script: Mutex<Vec<Result<String, SpeechError>>>,
        gate: Option<Mutex<Receiver<()>>>,
    }

    impl FakeRecognizer {
        pub fn saying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(vec![Ok(text.to_string())]),
                gate: None,
            })
        }

        pub fn failing(error: SpeechError) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(vec![Err(error)]),
                gate: None,
            })
        }

        pub fn gated(text: &str) -> (Arc<Self>, Sender<()>) {
            let (tx, rx) = crossbeam_channel::unbounded();
            let fake = Arc::new(Self {
                script: Mutex::new(vec![Ok(text.to_string())]),
                gate: Some(Mutex::new(rx)),
            });
            (fake, tx)
        }
    }

    impl SpeechRecognizer for FakeRecognizer {
        fn listen(&self) -> Result<String, SpeechError> {
            if let Some(gate) = &self.gate {
                let _ = gate.lock().unwrap().recv();
            }
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(SpeechError::Failed("script exhausted".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeRecognizer;
    use super::*;

    #[test]
    fn unsupported_fails_immediately() {
        let mut voice = VoiceInput::new(None);
        let err = voice.activate().unwrap_err();
        assert_eq!(err.user_message(), UNSUPPORTED_MESSAGE);
        assert!(!voice.is_listening());
        assert_eq!(voice.poll(), None);
    }

    #[test]
    fn transcript_comes_back_through_poll() {
        let mut voice = VoiceInput::new(Some(FakeRecognizer::saying("puppy videos")));
        assert!(voice.activate().unwrap());
        assert!(voice.is_listening());
        assert_eq!(voice.wait(), VoiceEvent::Transcript("puppy videos".into()));
        assert!(!voice.is_listening());
    }

    #[test]
    fn activation_is_ignored_while_listening() {
        let (fake, release) = FakeRecognizer::gated("trains");
        let mut voice = VoiceInput::new(Some(fake));
        assert!(voice.activate().unwrap());
        assert!(!voice.activate().unwrap());
        release.send(()).unwrap();
        assert_eq!(voice.wait(), VoiceEvent::Transcript("trains".into()));
    }

    #[test]
    fn failures_map_to_their_messages() {
        let mut denied = VoiceInput::new(Some(FakeRecognizer::failing(SpeechError::PermissionDenied)));
        denied.activate().unwrap();
        assert_eq!(denied.wait(), VoiceEvent::Failed(PERMISSION_MESSAGE));

        let mut broken = VoiceInput::new(Some(FakeRecognizer::failing(SpeechError::Failed("boom".into()))));
        broken.activate().unwrap();
        assert_eq!(broken.wait(), VoiceEvent::Failed(FAILURE_MESSAGE));
    }

    #[test]
    fn stderr_decides_permission_failures() {
        assert!(matches!(classify_failure("Error: not-allowed"), SpeechError::PermissionDenied));
        assert!(matches!(classify_failure("mic: Permission denied"), SpeechError::PermissionDenied));
        assert!(matches!(classify_failure("model missing"), SpeechError::Failed(_)));
        assert!(matches!(classify_failure(""), SpeechError::Failed(_)));
    }

    #[test]
    fn transcript_cleanup_drops_markers() {
        assert_eq!(clean_transcript("[BLANK_AUDIO]\n  dinosaur songs \n").unwrap(), "dinosaur songs");
        assert!(clean_transcript("[BLANK_AUDIO]\n").is_err());
        assert!(clean_transcript("").is_err());
    }

    #[test]
    fn lang_placeholder_is_filled_in() {
        let rec = CommandRecognizer::new("hear", &["--lang".into(), "{lang}".into()], "en-US");
        assert_eq!(rec.args().to_vec(), vec!["--lang".to_string(), "en-US".to_string()]);
    }

    #[test]
    fn detection_needs_a_program_on_path() {
        let missing = SpeechSettings {
            command: vec!["definitely-not-a-recognizer-xyz".into()],
            lang: "en-US".into(),
        };
        assert!(detect(&missing).is_none());
        assert!(detect(&SpeechSettings { command: vec![], lang: "en-US".into() }).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn command_recognizer_reads_stdout() {
        let rec = CommandRecognizer::new("echo", &["hello".into(), "{lang}".into()], "en-US");
        assert_eq!(rec.listen().unwrap(), "hello en-US");

        let missing = CommandRecognizer::new("definitely-not-a-recognizer-xyz", &[], "en-US");
        assert!(matches!(missing.listen(), Err(SpeechError::Unsupported)));
    }
}
