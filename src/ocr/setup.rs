use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";
const TRAINEDDATA: &str = "eng.traineddata";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

#[cfg(windows)]
const COMMON_INSTALL_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];
#[cfg(not(windows))]
const COMMON_INSTALL_DIRS: &[&str] = &["/usr/local/bin", "/usr/bin", "/opt/homebrew/bin"];

#[cfg(windows)]
const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];
#[cfg(not(windows))]
const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

/// Where the OCR engine and its language data were found.
#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the directory for locally managed Tesseract files
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("undercut-helper")
        .join("tesseract")
}

/// Locates Tesseract and its English data, downloading the data if the
/// engine is installed but no `eng.traineddata` exists anywhere.
pub fn ensure_tesseract() -> Result<TesseractPaths> {
    let tesseract_dir = get_tesseract_dir();

    let executable = find_tesseract_executable().ok_or_else(|| {
        anyhow!(
            "Tesseract not found. Install Tesseract-OCR (add it to PATH) or copy {} into {}",
            EXECUTABLE_NAME,
            tesseract_dir.display()
        )
    })?;
    tracing::info!(path = %executable.display(), "Tesseract found");

    if let Some(tessdata) = find_tessdata_dir() {
        tracing::info!(path = %tessdata.display(), "tessdata found");
        return Ok(TesseractPaths {
            executable,
            tessdata,
        });
    }

    tracing::info!("eng.traineddata not found locally, downloading...");
    let tessdata = tesseract_dir.join("tessdata");
    fs::create_dir_all(&tessdata)
        .with_context(|| format!("Failed to create {}", tessdata.display()))?;
    download_tessdata(&tessdata)?;

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Finds the Tesseract executable: local tool dir, then PATH, then common
/// install locations.
pub fn find_tesseract_executable() -> Option<PathBuf> {
    let local_exe = get_tesseract_dir().join(EXECUTABLE_NAME);
    if local_exe.exists() {
        return Some(local_exe);
    }

    if responds_to_version(Path::new("tesseract")) {
        return Some(PathBuf::from("tesseract"));
    }

    COMMON_INSTALL_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(EXECUTABLE_NAME))
        .find(|p| p.exists())
}

fn responds_to_version(exe: &Path) -> bool {
    Command::new(exe)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Finds a directory holding `eng.traineddata`.
pub fn find_tessdata_dir() -> Option<PathBuf> {
    let mut candidates = vec![get_tesseract_dir().join("tessdata")];
    candidates.extend(SYSTEM_TESSDATA_DIRS.iter().map(PathBuf::from));
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }
    find_tessdata_in(&candidates)
}

/// First candidate directory that contains `eng.traineddata`.
pub fn find_tessdata_in(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|dir| dir.join(TRAINEDDATA).is_file())
        .cloned()
}

/// Downloads English trained data into `tessdata_dir`
fn download_tessdata(tessdata_dir: &Path) -> Result<()> {
    let eng_url = format!("{}/{}", TESSDATA_REPO, TRAINEDDATA);
    let eng_path = tessdata_dir.join(TRAINEDDATA);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&eng_url)
        .header("User-Agent", "undercut-helper")
        .send()
        .with_context(|| format!("Failed to request {}", eng_url))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            TRAINEDDATA,
            response.status()
        ));
    }

    let bytes = response.bytes()?;

    // Write under a temporary name so a partial download is never picked up
    let partial = tessdata_dir.join(format!("{}.part", TRAINEDDATA));
    let mut file = fs::File::create(&partial)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&partial, &eng_path)?;

    tracing::info!(bytes = bytes.len(), "Downloaded eng.traineddata");

    Ok(())
}
