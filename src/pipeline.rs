//! Conversion pipeline
//!
//! Connects source → rate gate → process → output.
//! Kept frames can be processed on a worker pool; output order always follows
//! decode order.

use crate::config::ConvertConfig;
use crate::error::{Error, Result};
use crate::output::{BinaryFileOutput, OutputSink};
use crate::processing::FrameProcessor;
use crate::source::{FileSource, FrameSource};
use crate::types::{Frame, Stats, StreamMetadata};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Integer `round(num / den)`, ties to even
fn round_half_even(num: u64, den: u64) -> u64 {
    let q = num / den;
    let r = num % den;
    match (2 * r).cmp(&den) {
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal if q % 2 == 1 => q + 1,
        _ => q,
    }
}

/// Keeps every `skip`-th decoded frame
#[derive(Debug, Clone)]
pub struct RateDecimator {
    skip: u64,
    index: u64,
}

impl RateDecimator {
    pub fn new(source_fps: u32, target_fps: u32) -> Self {
        Self {
            skip: Self::skip_interval(source_fps, target_fps),
            index: 0,
        }
    }

    /// `max(1, round(source_fps / target_fps))`, ties to even
    ///
    /// An unknown (zero) rate on either side keeps every frame.
    pub fn skip_interval(source_fps: u32, target_fps: u32) -> u64 {
        if source_fps == 0 || target_fps == 0 {
            return 1;
        }
        round_half_even(source_fps as u64, target_fps as u64).max(1)
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Decoded frames seen so far
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Whether decoded frame `index` is kept
    pub fn keeps(&self, index: u64) -> bool {
        index % self.skip == 0
    }

    /// Decide for the next decoded frame and advance
    pub fn next_keep(&mut self) -> bool {
        let keep = self.keeps(self.index);
        self.index += 1;
        keep
    }

    /// Start the sequence again from index 0
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Kept indices among the first `decoded` frames
    pub fn kept_indices(&self, decoded: u64) -> impl Iterator<Item = u64> {
        (0..decoded).step_by(self.skip as usize)
    }
}

/// Pipeline lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Streaming,
    Done,
    Failed,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: Stats,
    /// Skip interval used by the rate gate
    pub skip: u64,
    pub source_fps: u32,
    /// Written file, when the sink was a file
    pub output_path: Option<PathBuf>,
    /// Stop was requested before end of stream
    pub stopped_early: bool,
    /// Decode failure that ended the stream early
    pub decode_error: Option<String>,
}

/// How streaming ended
#[derive(Debug, Default)]
struct StreamEnd {
    stopped_early: bool,
    decode_error: Option<String>,
}

/// Logs progress every `interval` written frames
struct ProgressReporter {
    interval: u64,
    total_frames: u64,
    source_fps: u32,
    skip: u64,
}

impl ProgressReporter {
    fn report(&self, stats: &Stats) {
        if self.interval == 0 || stats.frames_written % self.interval != 0 {
            return;
        }
        if self.total_frames > 0 {
            let progress = stats.frames_decoded as f64 / self.total_frames as f64 * 100.0;
            tracing::info!(
                "Progress: {:.1}% ({} frames written), source FPS: {}, frame skip: {}",
                progress,
                stats.frames_written,
                self.source_fps,
                self.skip
            );
        } else {
            tracing::info!(
                "Progress: {} frames written, source FPS: {}, frame skip: {}",
                stats.frames_written,
                self.source_fps,
                self.skip
            );
        }
    }
}

/// Serialize one processed frame and update counters
fn write_out<O: OutputSink + ?Sized>(
    sink: &mut O,
    frame: &Frame,
    stats: &mut Stats,
    progress: &ProgressReporter,
) -> Result<()> {
    sink.write_frame(frame)?;
    stats.frames_written += 1;
    stats.bytes_written = sink.bytes_written();
    progress.report(stats);
    Ok(())
}

/// Pull the next frame, folding decode failures into end of stream
fn pull<S: FrameSource + ?Sized>(source: &mut S, end: &mut StreamEnd) -> Option<Frame> {
    match source.next_frame() {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Decode failed, ending stream: {}", e);
            end.decode_error = Some(e.to_string());
            None
        }
    }
}

/// Conversion pipeline
pub struct Pipeline {
    config: ConvertConfig,
    processor: FrameProcessor,
    stop: Arc<AtomicBool>,
    state: PipelineState,
    stats: Stats,
}

impl Pipeline {
    pub fn new(config: ConvertConfig) -> Self {
        let processor = FrameProcessor::new(&config);
        Self {
            config,
            processor,
            stop: Arc::new(AtomicBool::new(false)),
            state: PipelineState::Init,
            stats: Stats::default(),
        }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Flag that ends streaming before the next frame is pulled
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Request a stop
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn fail(&mut self, e: Error) -> Error {
        tracing::error!("Pipeline failed: {}", e);
        self.state = PipelineState::Failed;
        e
    }

    /// Convert a video file to `<output_dir>/<name>.bin`
    ///
    /// `name` defaults to the input file stem. Nothing is created on disk when
    /// the input cannot be opened.
    pub fn convert_file(&mut self, input: &Path, name: Option<&str>) -> Result<RunSummary> {
        self.state = PipelineState::Init;

        let mut source = match FileSource::open(input) {
            Ok(s) => s,
            Err(e) => return Err(self.fail(e)),
        };

        let name = match name {
            Some(n) => n.to_string(),
            None => input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .ok_or_else(|| Error::Config(format!("No file name in {}", input.display())))
                .map_err(|e| self.fail(e))?,
        };

        let path = self.config.output_path(&name);
        let mut sink = match BinaryFileOutput::create(&path, self.config.resolution()) {
            Ok(s) => s,
            Err(e) => return Err(self.fail(e)),
        };

        let mut summary = self.run(&mut source, &mut sink)?;
        summary.output_path = Some(path);
        Ok(summary)
    }

    /// Stream every frame of `source` into `sink`
    pub fn run<S, O>(&mut self, source: &mut S, sink: &mut O) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        O: OutputSink + ?Sized,
    {
        let metadata: StreamMetadata = source.metadata().clone();
        let mut decimator = RateDecimator::new(metadata.source_fps, self.config.target_fps());
        if metadata.source_fps == 0 {
            tracing::warn!("Source frame rate unknown, keeping every frame");
        }

        let progress = ProgressReporter {
            interval: self.config.progress_interval,
            total_frames: metadata.total_frames,
            source_fps: metadata.source_fps,
            skip: decimator.skip(),
        };

        tracing::info!(
            "Converting {} ({} @ {} fps) to {} @ {} fps, mode {}, skip {}",
            if metadata.name.is_empty() { "<source>" } else { metadata.name.as_str() },
            metadata.resolution,
            metadata.source_fps,
            self.config.resolution(),
            self.config.target_fps(),
            self.config.mode,
            decimator.skip()
        );

        self.stats = Stats::default();
        self.state = PipelineState::Streaming;

        let workers = self.config.workers.max(1);
        let result = if workers > 1 {
            stream_parallel(
                &self.processor,
                &self.stop,
                workers,
                source,
                sink,
                &mut decimator,
                &mut self.stats,
                &progress,
            )
        } else {
            stream_inline(
                &self.processor,
                &self.stop,
                source,
                sink,
                &mut decimator,
                &mut self.stats,
                &progress,
            )
        };

        let end = match result.and_then(|end| sink.finish().map(|_| end)) {
            Ok(end) => end,
            Err(e) => return Err(self.fail(e)),
        };

        self.state = PipelineState::Done;
        tracing::info!(
            "Conversion complete: {} decoded, {} kept, {} bytes{}",
            self.stats.frames_decoded,
            self.stats.frames_written,
            self.stats.bytes_written,
            if end.stopped_early { " (stopped early)" } else { "" }
        );

        Ok(RunSummary {
            stats: self.stats.clone(),
            skip: decimator.skip(),
            source_fps: metadata.source_fps,
            output_path: None,
            stopped_early: end.stopped_early,
            decode_error: end.decode_error,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn stream_inline<S, O>(
    processor: &FrameProcessor,
    stop: &AtomicBool,
    source: &mut S,
    sink: &mut O,
    decimator: &mut RateDecimator,
    stats: &mut Stats,
    progress: &ProgressReporter,
) -> Result<StreamEnd>
where
    S: FrameSource + ?Sized,
    O: OutputSink + ?Sized,
{
    let mut end = StreamEnd::default();

    loop {
        if stop.load(Ordering::SeqCst) {
            end.stopped_early = true;
            break;
        }
        let Some(frame) = pull(source, &mut end) else {
            break;
        };

        stats.frames_decoded += 1;
        if !decimator.next_keep() {
            continue;
        }
        stats.frames_kept += 1;

        let processed = processor.process(frame)?;
        write_out(sink, &processed, stats, progress)?;
    }

    Ok(end)
}

#[allow(clippy::too_many_arguments)]
fn stream_parallel<S, O>(
    processor: &FrameProcessor,
    stop: &AtomicBool,
    workers: usize,
    source: &mut S,
    sink: &mut O,
    decimator: &mut RateDecimator,
    stats: &mut Stats,
    progress: &ProgressReporter,
) -> Result<StreamEnd>
where
    S: FrameSource + ?Sized,
    O: OutputSink + ?Sized,
{
    std::thread::scope(|scope| {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<(u64, Frame)>(workers * 2);
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<(u64, Result<Frame>)>();

        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                for (seq, frame) in job_rx.iter() {
                    if done_tx.send((seq, processor.process(frame))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(done_tx);

        tracing::debug!("Started {} transform workers", workers);

        let mut pending: BTreeMap<u64, Result<Frame>> = BTreeMap::new();
        let mut next_seq = 0u64;
        let mut dispatched = 0u64;
        let mut end = StreamEnd::default();

        // Write every result that is next in decode order
        let mut drain = |pending: &mut BTreeMap<u64, Result<Frame>>,
                         next_seq: &mut u64,
                         stats: &mut Stats|
         -> Result<()> {
            while let Some(result) = pending.remove(&*next_seq) {
                write_out(&mut *sink, &result?, stats, progress)?;
                *next_seq += 1;
            }
            Ok(())
        };

        loop {
            if stop.load(Ordering::SeqCst) {
                end.stopped_early = true;
                break;
            }
            let Some(frame) = pull(source, &mut end) else {
                break;
            };

            stats.frames_decoded += 1;
            if !decimator.next_keep() {
                continue;
            }
            stats.frames_kept += 1;

            if job_tx.send((dispatched, frame)).is_err() {
                return Err(Error::FileOutput("Transform workers exited".into()));
            }
            dispatched += 1;

            pending.extend(done_rx.try_iter());
            drain(&mut pending, &mut next_seq, stats)?;
        }

        drop(job_tx);
        for (seq, result) in done_rx.iter() {
            pending.insert(seq, result);
            drain(&mut pending, &mut next_seq, stats)?;
        }

        debug_assert_eq!(next_seq, dispatched);
        Ok(end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::output::MemoryOutput;
    use crate::source::{Pattern, SyntheticSource};
    use crate::types::Resolution;

    #[test]
    fn test_skip_interval_table() {
        assert_eq!(RateDecimator::skip_interval(60, 30), 2);
        assert_eq!(RateDecimator::skip_interval(24, 30), 1);
        assert_eq!(RateDecimator::skip_interval(30, 30), 1);
        assert_eq!(RateDecimator::skip_interval(120, 30), 4);
        assert_eq!(RateDecimator::skip_interval(1, 30), 1);
        assert_eq!(RateDecimator::skip_interval(0, 30), 1);
    }

    #[test]
    fn test_skip_interval_ties_round_to_even() {
        // 15/30 = 0.5 -> 0 -> clamped to 1
        assert_eq!(RateDecimator::skip_interval(15, 30), 1);
        // 45/30 = 1.5 -> 2
        assert_eq!(RateDecimator::skip_interval(45, 30), 2);
        // 75/30 = 2.5 -> 2
        assert_eq!(RateDecimator::skip_interval(75, 30), 2);
        // 105/30 = 3.5 -> 4
        assert_eq!(RateDecimator::skip_interval(105, 30), 4);
        // 50/30 = 1.67 -> 2
        assert_eq!(RateDecimator::skip_interval(50, 30), 2);
    }

    #[test]
    fn test_kept_indices() {
        let mut decimator = RateDecimator::new(60, 30);
        let kept: Vec<u64> = (0..5).filter(|_| decimator.next_keep()).collect();
        assert_eq!(kept, vec![0, 2, 4]);
        assert_eq!(decimator.index(), 5);
        assert_eq!(decimator.kept_indices(5).collect::<Vec<_>>(), vec![0, 2, 4]);

        decimator.reset();
        let pattern: Vec<bool> = (0..5).map(|_| decimator.next_keep()).collect();
        assert_eq!(pattern, vec![true, false, true, false, true]);
    }

    fn single_threaded() -> ConvertConfig {
        ConvertConfig::default().with_workers(1)
    }

    #[test]
    fn test_run_mid_grey() {
        let mut source =
            SyntheticSource::solid(60, 120, Resolution::new(64, 48), [128, 128, 128]);
        let mut sink = MemoryOutput::new(Resolution::LED_MATRIX);
        let mut pipeline = Pipeline::new(single_threaded());

        let summary = pipeline.run(&mut source, &mut sink).unwrap();

        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(summary.skip, 2);
        assert_eq!(summary.stats.frames_decoded, 120);
        assert_eq!(summary.stats.frames_written, 40);
        assert_eq!(sink.bytes().len(), 460800);
        assert!(sink.bytes().iter().all(|&b| b > 0));
        assert!(sink.is_finished());
    }

    #[test]
    fn test_empty_source_writes_nothing() {
        let mut source = SyntheticSource::solid(30, 0, Resolution::new(8, 8), [200, 0, 0]);
        let mut sink = MemoryOutput::new(Resolution::LED_MATRIX);
        let summary = Pipeline::new(single_threaded())
            .run(&mut source, &mut sink)
            .unwrap();
        assert_eq!(summary.stats.frames_written, 0);
        assert!(sink.bytes().is_empty());
    }

    #[test]
    fn test_decode_error_ends_stream_gracefully() {
        let mut source = SyntheticSource::solid(30, 10, Resolution::new(8, 8), [200, 200, 200])
            .with_decode_error_at(4);
        let mut sink = MemoryOutput::new(Resolution::LED_MATRIX);
        let mut pipeline = Pipeline::new(single_threaded());

        let summary = pipeline.run(&mut source, &mut sink).unwrap();

        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(summary.stats.frames_written, 4);
        assert_eq!(sink.bytes().len(), 4 * 11520);
        assert!(summary.decode_error.is_some());
    }

    #[test]
    fn test_stop_before_start() {
        let mut source = SyntheticSource::solid(30, 10, Resolution::new(8, 8), [200, 200, 200]);
        let mut sink = MemoryOutput::new(Resolution::LED_MATRIX);
        let mut pipeline = Pipeline::new(single_threaded());
        pipeline.stop();

        let summary = pipeline.run(&mut source, &mut sink).unwrap();
        assert!(summary.stopped_early);
        assert_eq!(sink.bytes_written(), 0);
    }

    #[test]
    fn test_parallel_matches_inline() {
        for mode in [Mode::Normal, Mode::HighContrast] {
            let run = |workers: usize| {
                let mut source =
                    SyntheticSource::new(48, 37, Resolution::new(120, 90), Pattern::Gradient);
                let mut sink = MemoryOutput::new(Resolution::LED_MATRIX);
                let config = ConvertConfig::default()
                    .with_mode(mode)
                    .with_workers(workers);
                let summary = Pipeline::new(config).run(&mut source, &mut sink).unwrap();
                (summary, sink.into_bytes())
            };

            let (inline_summary, inline_bytes) = run(1);
            let (parallel_summary, parallel_bytes) = run(4);

            // 48 fps -> skip 2, 37 frames -> 19 kept
            assert_eq!(inline_summary.stats.frames_written, 19);
            assert_eq!(parallel_summary.stats.frames_written, 19);
            assert_eq!(inline_bytes, parallel_bytes);
        }
    }

    #[test]
    fn test_missing_input_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("media");
        let mut pipeline = Pipeline::new(single_threaded().with_output_dir(&out_dir));

        let err = pipeline
            .convert_file(&dir.path().join("missing.mov"), None)
            .unwrap_err();

        assert!(matches!(err, Error::SourceNotFound(_)));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(!out_dir.exists());
    }
}
