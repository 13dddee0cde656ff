//! HTTP transport
//!
//! Fetches the source from the media server, probes its duration with
//! symphonia, then runs a playback clock that reports progress on a tokio
//! interval. There is no audio device output: the service is headless and
//! the clock stands in for the audible stream.

use super::{Transport, TransportFactory, TransportListener, TransportSignal};
use crate::error::{PlayerError, Result};
use std::io::Cursor;
use std::time::{Duration, Instant};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Creates one [`HttpTransport`] per session
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    client: reqwest::Client,
    progress_interval: Duration,
}

impl HttpTransportFactory {
    pub fn new(progress_interval: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), progress_interval)
    }

    pub fn with_client(client: reqwest::Client, progress_interval: Duration) -> Self {
        Self {
            client,
            progress_interval,
        }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn open(&self, url: &str, listener: TransportListener) -> Result<Box<dyn Transport>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PlayerError::TransportLoadFailed(format!("no async runtime: {}", e)))?;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(run_transport(
            self.client.clone(),
            url.to_string(),
            listener,
            control_rx,
            self.progress_interval,
        ));

        Ok(Box::new(HttpTransport {
            control: control_tx,
            task,
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum ClockCommand {
    Play,
    Pause,
    Rewind,
}

/// Handle to a running transport task
///
/// Closing (or dropping) aborts the task, which cancels an in-flight fetch.
pub struct HttpTransport {
    control: mpsc::UnboundedSender<ClockCommand>,
    task: JoinHandle<()>,
}

impl Transport for HttpTransport {
    fn play(&mut self) -> Result<()> {
        self.control
            .send(ClockCommand::Play)
            .map_err(|_| PlayerError::TransportPlaybackFailed("transport task has exited".into()))
    }

    fn pause(&mut self) {
        let _ = self.control.send(ClockCommand::Pause);
    }

    fn rewind(&mut self) {
        let _ = self.control.send(ClockCommand::Rewind);
    }

    fn close(&mut self) {
        self.task.abort();
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_transport(
    client: reqwest::Client,
    url: String,
    listener: TransportListener,
    mut control: mpsc::UnboundedReceiver<ClockCommand>,
    progress_interval: Duration,
) {
    let generation = listener.generation();

    let duration = match fetch_and_probe(&client, &url).await {
        Ok(duration) => duration,
        Err(e) => {
            warn!("Generation {}: {}", generation, e);
            listener.notify(TransportSignal::Failed(e.to_string()));
            return;
        }
    };

    info!(
        "Generation {}: loaded {} (duration {})",
        generation,
        url,
        duration.map_or_else(|| "unknown".to_string(), |d| format!("{:.2}s", d))
    );

    if !listener.notify(TransportSignal::Ready) {
        return;
    }

    let mut clock = PlaybackClock::new(duration);
    let mut ticker = tokio::time::interval(progress_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = control.recv() => {
                let now = Instant::now();
                match command {
                    Some(ClockCommand::Play) => clock.start(now),
                    Some(ClockCommand::Pause) => clock.stop(now),
                    Some(ClockCommand::Rewind) => clock.rewind(now),
                    None => return,
                }
            }
            _ = ticker.tick(), if clock.is_running() => {
                let now = Instant::now();
                let position = clock.position(now);
                let progress = TransportSignal::Progress {
                    position_seconds: position,
                    duration_seconds: duration,
                };
                if !listener.notify(progress) {
                    return;
                }
                if clock.is_finished(now) {
                    debug!("Generation {}: end of media", generation);
                    listener.notify(TransportSignal::Ended);
                    return;
                }
            }
        }
    }
}

async fn fetch_and_probe(client: &reqwest::Client, url: &str) -> Result<Option<f64>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PlayerError::TransportLoadFailed(format!("{}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PlayerError::TransportLoadFailed(format!(
            "{} returned {}",
            url, status
        )));
    }

    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let body = response
        .bytes()
        .await
        .map_err(|e| PlayerError::TransportLoadFailed(format!("{}: {}", url, e)))?;

    debug!("Fetched {} bytes from {}", body.len(), url);

    tokio::task::spawn_blocking(move || probe_duration(body, mime.as_deref()))
        .await
        .map_err(|e| PlayerError::TransportLoadFailed(format!("probe task failed: {}", e)))?
}

/// Probe an in-memory media file and return its duration in seconds
///
/// `Ok(None)` means the container was recognised but does not state a
/// length. Unrecognised data is a load failure.
pub fn probe_duration<B>(data: B, mime: Option<&str>) -> Result<Option<f64>>
where
    B: AsRef<[u8]> + Send + Sync + 'static,
{
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    if let Some(mime) = mime {
        hint.mime_type(mime);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| PlayerError::TransportLoadFailed(format!("Failed to probe format: {}", e)))?;

    let track = probed
        .format
        .default_track()
        .ok_or_else(|| PlayerError::TransportLoadFailed("No audio track found".to_string()))?;

    let params = &track.codec_params;
    let duration = match (params.n_frames, params.time_base, params.sample_rate) {
        (Some(frames), Some(time_base), _) => {
            let time = time_base.calc_time(frames);
            Some(time.seconds as f64 + time.frac)
        }
        (Some(frames), None, Some(rate)) if rate > 0 => Some(frames as f64 / rate as f64),
        _ => None,
    };

    Ok(duration)
}

/// Wall-clock playback position with pause support
#[derive(Debug, Clone)]
struct PlaybackClock {
    duration: Option<f64>,
    /// Position accumulated before the current run
    base: f64,
    started_at: Option<Instant>,
}

impl PlaybackClock {
    fn new(duration: Option<f64>) -> Self {
        Self {
            duration,
            base: 0.0,
            started_at: None,
        }
    }

    fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    fn stop(&mut self, now: Instant) {
        if let Some(started) = self.started_at.take() {
            self.base += now.saturating_duration_since(started).as_secs_f64();
        }
    }

    fn rewind(&mut self, now: Instant) {
        self.base = 0.0;
        if self.started_at.is_some() {
            self.started_at = Some(now);
        }
    }

    fn position(&self, now: Instant) -> f64 {
        let running = self
            .started_at
            .map_or(0.0, |started| now.saturating_duration_since(started).as_secs_f64());
        let position = self.base + running;
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn is_finished(&self, now: Instant) -> bool {
        self.duration
            .map_or(false, |duration| self.position(now) >= duration)
    }
}
