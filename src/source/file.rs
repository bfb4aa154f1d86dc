//! Video file decoding using FFmpeg

use crate::error::{Error, Result};
use crate::types::{Frame, Resolution, StreamMetadata, CHANNELS};
use std::path::{Path, PathBuf};

use super::FrameSource;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::media::Type as MediaType;
use ffmpeg_next::software::scaling::{Context as SwsContext, Flags as SwsFlags};

/// Decodes the best video stream of a file into RGB24 frames
pub struct FileSource {
    path: PathBuf,
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    converter: SwsContext,
    stream_index: usize,
    metadata: StreamMetadata,
    decoded: ffmpeg::frame::Video,
    rgb: ffmpeg::frame::Video,
    eof_sent: bool,
}

impl FileSource {
    /// Open a video file
    ///
    /// Fails with `SourceNotFound` when the path is not a readable file and
    /// `SourceUnopenable` when FFmpeg cannot demux or decode it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::SourceNotFound(path.to_path_buf()));
        }

        ffmpeg::init().map_err(|e| Error::FFmpeg(e.to_string()))?;

        let input = ffmpeg::format::input(&path)
            .map_err(|e| Error::SourceUnopenable(format!("{}: {}", path.display(), e)))?;

        let stream = input
            .streams()
            .best(MediaType::Video)
            .ok_or(Error::NoVideoStream)?;
        let stream_index = stream.index();

        let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| Error::SourceUnopenable(format!("{}: {}", path.display(), e)))?;

        if decoder.format() == Pixel::None || decoder.width() == 0 || decoder.height() == 0 {
            return Err(Error::SourceUnopenable(format!(
                "{}: missing codec parameters",
                path.display()
            )));
        }

        let mut rate = stream.avg_frame_rate();
        if rate.numerator() <= 0 || rate.denominator() <= 0 {
            rate = stream.rate();
        }
        // Whole frames per second; 29.97 reports as 29
        let source_fps = if rate.numerator() > 0 && rate.denominator() > 0 {
            (rate.numerator() / rate.denominator()) as u32
        } else {
            0
        };

        let total_frames = match stream.frames() {
            n if n > 0 => n as u64,
            _ if input.duration() > 0 && source_fps > 0 => {
                (input.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64 * source_fps as f64)
                    .round() as u64
            }
            _ => 0,
        };

        let resolution = Resolution::new(decoder.width(), decoder.height());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = StreamMetadata::new(source_fps, total_frames, resolution).with_name(name);

        let converter = Self::create_converter(decoder.format(), resolution)?;

        tracing::info!(
            "Opened {}: {} @ {} fps, {} frames",
            path.display(),
            resolution,
            source_fps,
            total_frames,
        );

        Ok(Self {
            path: path.to_path_buf(),
            input,
            decoder,
            converter,
            stream_index,
            metadata,
            decoded: ffmpeg::frame::Video::empty(),
            rgb: ffmpeg::frame::Video::empty(),
            eof_sent: false,
        })
    }

    /// Get the input path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create_converter(format: Pixel, resolution: Resolution) -> Result<SwsContext> {
        SwsContext::get(
            format,
            resolution.width,
            resolution.height,
            Pixel::RGB24,
            resolution.width,
            resolution.height,
            SwsFlags::BILINEAR,
        )
        .map_err(|e| Error::FFmpeg(format!("Failed to create RGB converter: {}", e)))
    }

    /// Convert the last decoded picture to an RGB24 frame
    fn take_decoded(&mut self) -> Result<Frame> {
        let width = self.decoded.width();
        let height = self.decoded.height();

        let input = self.converter.input();
        if input.width != width || input.height != height || input.format != self.decoded.format() {
            tracing::debug!("Decoded size changed to {}x{}, rebuilding converter", width, height);
            self.converter =
                Self::create_converter(self.decoded.format(), Resolution::new(width, height))?;
        }

        self.converter
            .run(&self.decoded, &mut self.rgb)
            .map_err(|e| Error::Decode(format!("RGB conversion failed: {}", e)))?;

        // Strip row padding
        let row = width as usize * CHANNELS;
        let stride = self.rgb.stride(0);
        let plane = self.rgb.data(0);
        let mut data = Vec::with_capacity(row * height as usize);
        for y in 0..height as usize {
            data.extend_from_slice(&plane[y * stride..y * stride + row]);
        }

        Frame::from_data(data, width, height)
    }
}

impl FrameSource for FileSource {
    fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.decoder.receive_frame(&mut self.decoded) {
                Ok(()) => return self.take_decoded().map(Some),
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => {}
                Err(e) => return Err(Error::Decode(e.to_string())),
            }

            if self.eof_sent {
                return Ok(None);
            }

            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() != self.stream_index {
                        continue;
                    }
                    self.decoder
                        .send_packet(&packet)
                        .map_err(|e| Error::Decode(format!("Send packet failed: {}", e)))?;
                }
                Err(ffmpeg::Error::Eof) => {
                    self.decoder
                        .send_eof()
                        .map_err(|e| Error::Decode(format!("Send EOF failed: {}", e)))?;
                    self.eof_sent = true;
                }
                Err(e) => return Err(Error::Decode(format!("Read packet failed: {}", e))),
            }
        }
    }
}
