use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::GrayImage;
use tempfile::NamedTempFile;

use crate::error::RecognitionError;

/// Default upper bound for one OCR run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Text recognition backend.
pub trait OcrEngine: Send + Sync {
    /// Reads the text in `img`, restricted to the characters in `whitelist`.
    fn read_text(&self, img: &GrayImage, whitelist: &str) -> Result<String, RecognitionError>;
}

/// Drives the Tesseract command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    timeout: Duration,
}

impl TesseractCli {
    /// `timeout` bounds each run; the engine is killed once it passes.
    pub fn new(executable: PathBuf, tessdata: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable,
            tessdata,
            timeout,
        }
    }

    fn command(&self, input: &std::path::Path, whitelist: &str) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(input).arg("stdout");
        if let Some(dir) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg("6") // Single uniform block of text
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", whitelist))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd
    }
}

impl OcrEngine for TesseractCli {
    fn read_text(&self, img: &GrayImage, whitelist: &str) -> Result<String, RecognitionError> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        let mut child = self.command(temp_input.path(), whitelist).spawn()?;

        // Pipes are drained while the engine runs so a chatty engine never blocks
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // Wait for the engine, killing it once the deadline passes
        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "OCR engine timed out");
                return Err(RecognitionError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;
        if !status.success() {
            return Err(RecognitionError::EngineFailed {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// Reads `pipe` to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn collect(reader: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>, RecognitionError> {
    reader
        .join()
        .map_err(|_| RecognitionError::Io(std::io::Error::other("pipe reader panicked")))?
        .map_err(RecognitionError::Io)
}

/// Stand-in used when no Tesseract installation was found at startup.
/// Every read reports the setup failure.
#[derive(Debug, Clone)]
pub struct MissingEngine {
    reason: String,
}

impl MissingEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl OcrEngine for MissingEngine {
    fn read_text(&self, _img: &GrayImage, _whitelist: &str) -> Result<String, RecognitionError> {
        Err(RecognitionError::EngineNotFound(self.reason.clone()))
    }
}
