//! FFmpeg-backed camera devices.
//!
//! The camera is opened by an `ffmpeg` child process that decodes the device
//! feed into packed RGB frames on stdout. A reader thread keeps the latest
//! frame in a shared buffer; stopping the track shuts the process down.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::backend::{CameraBackend, FrameBuffer, MediaStream, MediaTrack};
use super::error::{AcquireFailure, CameraError};
use super::types::{CameraInfo, CaptureConstraints, FacingMode, Frame, Resolution};

/// Name of the ffmpeg executable looked up on `PATH`.
pub const FFMPEG_BIN: &str = "ffmpeg";

/// Frame rate requested from the device.
pub const DEFAULT_FRAMERATE: u32 = 30;

/// How long ffmpeg gets to exit after SIGINT before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Number of ffmpeg stderr lines kept for error reporting.
const STDERR_TAIL: usize = 50;

/// Camera backend that drives devices through ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: String,
    acquire_timeout: Duration,
}

impl FfmpegBackend {
    pub fn new(acquire_timeout: Duration) -> Self {
        Self {
            binary: FFMPEG_BIN.to_string(),
            acquire_timeout,
        }
    }

    /// Use a specific ffmpeg executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Turn the constraints into the device argument ffmpeg expects.
    fn resolve_device(&self, constraints: &CaptureConstraints) -> Result<String, CameraError> {
        if let Some(spec) = &constraints.device {
            return resolve_explicit_device(spec);
        }

        let devices = list_devices()?;
        let chosen = match constraints.facing {
            FacingMode::User => devices.first(),
            FacingMode::Environment => devices.last(),
        };
        chosen
            .map(|d| device_argument(d.index))
            .ok_or(CameraError::Acquire {
                kind: AcquireFailure::DeviceNotFound,
                detail: None,
            })
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl CameraBackend for FfmpegBackend {
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<MediaStream, CameraError> {
        let device = self.resolve_device(constraints)?;
        let resolution = constraints.ideal;

        let mut args = input_args(&device, resolution, DEFAULT_FRAMERATE);
        args.extend(output_args(resolution));
        log::info!("Opening camera {} at {}", device, resolution);
        log::debug!("{} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CameraError::FfmpegNotFound
                } else {
                    CameraError::Io(e)
                }
            })?;

        let stderr_lines = Arc::new(Mutex::new(Vec::new()));
        let stderr_thread = child.stderr.take().map(|stderr| {
            let lines = Arc::clone(&stderr_lines);
            thread::spawn(move || collect_stderr(stderr, lines))
        });

        let stop = Arc::new(AtomicBool::new(false));
        let frames: FrameBuffer = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = mpsc::channel();

        let reader = child.stdout.take().map(|stdout| {
            let frames = Arc::clone(&frames);
            let stop = Arc::clone(&stop);
            thread::spawn(move || read_frames(stdout, resolution, frames, stop, ready_tx))
        });

        let mut track = FfmpegVideoTrack {
            label: format!("video:{}", device),
            child: Some(child),
            stop,
            reader,
            stderr_thread,
            stderr_lines,
        };

        match ready_rx.recv_timeout(self.acquire_timeout) {
            Ok(true) => Ok(MediaStream {
                label: device,
                resolution,
                tracks: vec![Box::new(track)],
                frames,
            }),
            outcome => {
                if let Err(e) = track.stop() {
                    log::warn!("{}", e);
                }
                let stderr = track.stderr_tail();
                let detail = match outcome {
                    Err(RecvTimeoutError::Timeout) if stderr.is_empty() => {
                        format!("no frame within {:?}", self.acquire_timeout)
                    }
                    _ if stderr.is_empty() => "camera process exited".to_string(),
                    _ => stderr,
                };
                Err(CameraError::acquire(detail))
            }
        }
    }
}

/// The single video track of an ffmpeg-driven stream.
pub struct FfmpegVideoTrack {
    label: String,
    child: Option<Child>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    stderr_thread: Option<JoinHandle<()>>,
    stderr_lines: Arc<Mutex<Vec<String>>>,
}

impl FfmpegVideoTrack {
    /// The last lines ffmpeg wrote to stderr, newline-joined.
    fn stderr_tail(&self) -> String {
        self.stderr_lines
            .lock()
            .map(|lines| lines.join("\n"))
            .unwrap_or_default()
    }
}

impl MediaTrack for FfmpegVideoTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        self.stop.store(true, Ordering::SeqCst);

        let result = match self.child.take() {
            Some(mut child) => shutdown_child(&mut child).map_err(|e| CameraError::TrackStop {
                track: self.label.clone(),
                message: e.to_string(),
            }),
            None => Ok(()),
        };

        // Both threads end once the process' pipes close.
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }

        result
    }
}

impl Drop for FfmpegVideoTrack {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.stop() {
                log::warn!("{}", e);
            }
        }
    }
}

/// Ask ffmpeg to exit, escalating to a kill after the grace period.
fn shutdown_child(child: &mut Child) -> std::io::Result<()> {
    if child.try_wait()?.is_some() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        // SAFETY: plain signal delivery to a pid we spawned and have not reaped.
        unsafe {
            libc::kill(child.id() as i32, libc::SIGINT);
        }
    }

    #[cfg(not(unix))]
    {
        child.kill()?;
    }

    let start = Instant::now();
    loop {
        match child.try_wait()? {
            Some(_) => return Ok(()),
            None if start.elapsed() > SHUTDOWN_GRACE => {
                child.kill()?;
                child.wait()?;
                return Ok(());
            }
            None => thread::sleep(Duration::from_millis(50)),
        }
    }
}

fn collect_stderr(stderr: std::process::ChildStderr, lines: Arc<Mutex<Vec<String>>>) {
    for line in BufReader::new(stderr).lines() {
        match line {
            Ok(l) => {
                log::debug!("[ffmpeg] {}", l);
                if let Ok(mut lines) = lines.lock() {
                    if lines.len() == STDERR_TAIL {
                        lines.remove(0);
                    }
                    lines.push(l);
                }
            }
            Err(_) => break,
        }
    }
}

fn read_frames(
    mut stdout: ChildStdout,
    resolution: Resolution,
    frames: FrameBuffer,
    stop: Arc<AtomicBool>,
    ready: Sender<bool>,
) {
    let mut buf = vec![0u8; resolution.rgb_frame_len()];
    let mut announced = false;

    while !stop.load(Ordering::Relaxed) {
        if stdout.read_exact(&mut buf).is_err() {
            break;
        }
        let frame = Frame {
            data: buf.clone(),
            width: resolution.width,
            height: resolution.height,
            timestamp: Instant::now(),
        };
        if let Ok(mut slot) = frames.lock() {
            *slot = Some(frame);
        }
        if !announced {
            announced = true;
            let _ = ready.send(true);
        }
    }

    if !announced {
        let _ = ready.send(false);
    }
}

/// Output side of the ffmpeg command: raw RGB frames scaled to `resolution`.
pub fn output_args(resolution: Resolution) -> Vec<String> {
    vec![
        "-an".to_string(),
        "-vf".to_string(),
        format!("scale={}:{}", resolution.width, resolution.height),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-".to_string(),
    ]
}

/// Input side of the ffmpeg command for the current platform.
#[cfg(target_os = "macos")]
pub fn input_args(device: &str, _ideal: Resolution, framerate: u32) -> Vec<String> {
    // avfoundation rejects sizes the device does not offer, so scaling is left to the filter.
    vec![
        "-hide_banner".to_string(),
        "-f".to_string(),
        "avfoundation".to_string(),
        "-framerate".to_string(),
        framerate.to_string(),
        "-i".to_string(),
        format!("{}:none", device),
    ]
}

/// Input side of the ffmpeg command for the current platform.
#[cfg(not(target_os = "macos"))]
pub fn input_args(device: &str, ideal: Resolution, framerate: u32) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-f".to_string(),
        "v4l2".to_string(),
        "-framerate".to_string(),
        framerate.to_string(),
        "-video_size".to_string(),
        ideal.to_string(),
        "-i".to_string(),
        device.to_string(),
    ]
}

#[cfg(target_os = "macos")]
fn device_argument(index: u32) -> String {
    index.to_string()
}

#[cfg(not(target_os = "macos"))]
fn device_argument(index: u32) -> String {
    format!("/dev/video{}", index)
}

/// Resolve a user-supplied device selector (index, path or name).
fn resolve_explicit_device(spec: &str) -> Result<String, CameraError> {
    if let Ok(index) = spec.parse::<u32>() {
        return Ok(device_argument(index));
    }
    if spec.starts_with('/') {
        return Ok(spec.to_string());
    }

    let devices = list_devices()?;
    let wanted = spec.to_lowercase();
    devices
        .iter()
        .find(|d| d.name.to_lowercase().contains(&wanted))
        .map(|d| device_argument(d.index))
        .ok_or_else(|| CameraError::Acquire {
            kind: AcquireFailure::DeviceNotFound,
            detail: Some(format!("no camera matching '{}'", spec)),
        })
}

/// List the cameras available on this machine.
///
/// Screens offered as capture devices are left out. An empty list is not
/// an error.
#[cfg(target_os = "macos")]
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    let output = Command::new(FFMPEG_BIN)
        .args(["-hide_banner", "-f", "avfoundation", "-list_devices", "true", "-i", ""])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CameraError::FfmpegNotFound
            } else {
                CameraError::QueryFailed(e.to_string())
            }
        })?;

    // FFmpeg prints the device list on stderr
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(parse_device_list(&stderr))
}

/// List the cameras available on this machine.
///
/// Reads the v4l2 device nodes; names come from sysfs when available.
/// An empty list is not an error.
#[cfg(not(target_os = "macos"))]
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    let entries = match std::fs::read_dir("/dev") {
        Ok(entries) => entries,
        Err(e) => return Err(CameraError::QueryFailed(e.to_string())),
    };

    let mut devices: Vec<CameraInfo> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let index = name.strip_prefix("video")?.parse::<u32>().ok()?;
            let label = std::fs::read_to_string(format!("/sys/class/video4linux/{}/name", name))
                .map(|s| s.trim().to_string())
                .unwrap_or(name);
            Some(CameraInfo { index, name: label })
        })
        .collect();
    devices.sort_by_key(|d| d.index);
    Ok(devices)
}

/// Parse the video section of ffmpeg's avfoundation device listing.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub fn parse_device_list(stderr: &str) -> Vec<CameraInfo> {
    let mut devices = Vec::new();
    let mut in_video_section = false;

    for line in stderr.lines() {
        if line.contains("AVFoundation video devices:") {
            in_video_section = true;
            continue;
        }
        if line.contains("AVFoundation audio devices:") {
            in_video_section = false;
            continue;
        }
        if !in_video_section {
            continue;
        }
        if let Some(device) = parse_device_line(line) {
            if !device.name.starts_with("Capture screen") {
                devices.push(device);
            }
        }
    }

    devices
}

/// Parse one `[AVFoundation indev @ 0x...] [index] name` line.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub fn parse_device_line(line: &str) -> Option<CameraInfo> {
    let bracket_idx = line.find("] [")?;
    let after_bracket = &line[bracket_idx + 3..];

    let close_bracket = after_bracket.find(']')?;
    let index: u32 = after_bracket[..close_bracket].parse().ok()?;
    let name = after_bracket.get(close_bracket + 1..)?.trim().to_string();

    if name.is_empty() {
        return None;
    }
    Some(CameraInfo { index, name })
}
