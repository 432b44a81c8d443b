//! File frame source using the Symphonia decoder
//!
//! # Format Support
//!
//! - **Containers**: MP3, FLAC, OGG, WAV, AAC, M4A, etc. (whatever Symphonia probes)
//! - **Sample types**: all Symphonia formats, normalized to f32 in [-1.0, 1.0]
//! - **Channels**: delivered at the file's native channel count
//!
//! Streams whose length is unknown up front are rejected, since the engine
//! needs a duration to clamp seeks.
//!
//! Packets are decoded on demand into a small queue. Seeking uses Symphonia's
//! accurate mode and then discards decoded frames before the requested one,
//! so the next frame read is exactly the one asked for.

use crate::error::{AudioError, Result};
use onyx_playback::{FrameSource, StreamInfo};
use std::collections::VecDeque;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use symphonia::core::units::TimeBase;
use tracing::{debug, warn};

/// An opened file and its decoder state
struct Decoding {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    time_base: Option<TimeBase>,
    info: StreamInfo,

    /// Decoded interleaved samples not yet read
    buffer: VecDeque<f32>,

    /// Timestamp the next delivered frame must start at, after a seek
    seek_ts: Option<u64>,
    eof: bool,
}

/// Seekable frame source for local audio files
///
/// Created unopened; [`FrameSource::open`] probes the file. Not `Send`: the
/// engine creates and drives it on its audio thread.
#[derive(Default)]
pub struct FileFrameSource {
    path: Option<PathBuf>,
    stream: Option<Decoding>,
    /// Index of the next frame handed out
    position: u64,
}

impl FileFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the open file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Format of the open file
    pub fn info(&self) -> Option<StreamInfo> {
        self.stream.as_ref().map(|s| s.info)
    }

    fn stream(&mut self) -> Result<&mut Decoding> {
        self.stream
            .as_mut()
            .ok_or_else(|| AudioError::Decode("file not open".to_string()))
    }

    fn open_file(path: &Path) -> Result<Decoding> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Hint for format detection
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::UnsupportedFormat("no audio track".to_string()))?;
        let params = &track.codec_params;

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| AudioError::UnsupportedFormat("unknown sample rate".to_string()))?;
        let channels = params
            .channels
            .map(|c| c.count())
            .ok_or_else(|| AudioError::UnsupportedFormat("unknown channel layout".to_string()))?;
        let channels = u16::try_from(channels)
            .map_err(|_| AudioError::UnsupportedFormat(format!("{channels} channels")))?;
        let total_frames = params
            .n_frames
            .ok_or_else(|| AudioError::UnsupportedFormat("unknown stream length".to_string()))?;

        let decoder = symphonia::default::get_codecs().make(params, &DecoderOptions::default())?;
        let track_id = track.id;
        let time_base = params.time_base;

        Ok(Decoding {
            reader,
            decoder,
            track_id,
            time_base,
            info: StreamInfo {
                sample_rate,
                channels,
                total_frames,
            },
            buffer: VecDeque::new(),
            seek_ts: None,
            eof: false,
        })
    }
}

impl Decoding {
    fn channels(&self) -> usize {
        usize::from(self.info.channels)
    }

    /// Decode until `samples` are queued or the stream ends
    fn fill(&mut self, samples: usize) -> Result<()> {
        while self.buffer.len() < samples && !self.eof {
            self.decode_next_packet()?;
        }
        Ok(())
    }

    fn decode_next_packet(&mut self) -> Result<()> {
        let packet = match self.reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                self.eof = true;
                return Ok(());
            }
            Err(SymphoniaError::ResetRequired) => {
                debug!("track list changed; treating as end of stream");
                self.eof = true;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != self.track_id {
            return Ok(());
        }

        // Frames of this packet that precede the seek target
        let skip = match self.seek_ts {
            Some(target) => {
                if packet.ts() + packet.dur() > target {
                    self.seek_ts = None;
                }
                let before = target.saturating_sub(packet.ts());
                usize::try_from(ts_to_frames(before, self.time_base, self.info.sample_rate))
                    .unwrap_or(usize::MAX)
            }
            None => 0,
        };

        let expected = self.channels();
        let decoded = match self.decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(msg, ts = packet.ts(), "skipping undecodable packet");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let channels = decoded.spec().channels.count();
        if channels != expected {
            return Err(AudioError::Decode(format!(
                "channel count changed from {expected} to {channels}"
            )));
        }

        append_interleaved(decoded, skip, &mut self.buffer);
        Ok(())
    }
}

impl FrameSource for FileFrameSource {
    fn open(&mut self, path: &Path) -> onyx_playback::Result<StreamInfo> {
        let stream = Self::open_file(path)?;
        let info = stream.info;

        debug!(
            path = %path.display(),
            sample_rate = info.sample_rate,
            channels = info.channels,
            total_frames = info.total_frames,
            "opened audio file"
        );

        self.path = Some(path.to_path_buf());
        self.stream = Some(stream);
        self.position = 0;
        Ok(info)
    }

    fn seek(&mut self, frame: u64) -> onyx_playback::Result<()> {
        let stream = self.stream()?;
        let ts = frames_to_ts(frame, stream.time_base, stream.info.sample_rate);

        let seeked = stream
            .reader
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts,
                    track_id: stream.track_id,
                },
            )
            .map_err(AudioError::from)?;

        stream.decoder.reset();
        stream.buffer.clear();
        stream.eof = false;
        stream.seek_ts = Some(seeked.required_ts);

        self.position = frame;
        Ok(())
    }

    fn read_frames(&mut self, buffer: &mut [f32]) -> onyx_playback::Result<usize> {
        let stream = self.stream()?;
        let channels = stream.channels();
        let wanted = buffer.len() / channels;

        stream.fill(wanted * channels)?;

        let frames = wanted.min(stream.buffer.len() / channels);
        let samples = frames * channels;
        for (out, sample) in buffer[..samples].iter_mut().zip(stream.buffer.drain(..samples)) {
            *out = sample;
        }

        self.position += frames as u64;
        Ok(frames)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn close(&mut self) -> onyx_playback::Result<()> {
        if let Some(path) = self.path.take() {
            debug!(path = %path.display(), "closed audio file");
        }
        self.stream = None;
        self.position = 0;
        Ok(())
    }
}

/// Convert a track timestamp to frames; without a time base they coincide
fn ts_to_frames(ts: u64, time_base: Option<TimeBase>, sample_rate: u32) -> u64 {
    match time_base {
        Some(tb) if tb.denom != 0 => {
            let frames = u128::from(ts) * u128::from(tb.numer) * u128::from(sample_rate)
                / u128::from(tb.denom);
            u64::try_from(frames).unwrap_or(u64::MAX)
        }
        _ => ts,
    }
}

fn frames_to_ts(frames: u64, time_base: Option<TimeBase>, sample_rate: u32) -> u64 {
    match time_base {
        Some(tb) if tb.numer != 0 && sample_rate != 0 => {
            let ts = u128::from(frames) * u128::from(tb.denom)
                / (u128::from(tb.numer) * u128::from(sample_rate));
            u64::try_from(ts).unwrap_or(u64::MAX)
        }
        _ => frames,
    }
}

/// Interleave a planar buffer into `out`, dropping the first `skip` frames
fn interleave<T, F>(buf: &AudioBuffer<T>, skip: usize, out: &mut VecDeque<f32>, normalize: F)
where
    T: Sample,
    F: Fn(T) -> f32,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();

    for frame in skip.min(frames)..frames {
        for ch in 0..channels {
            out.push_back(normalize(buf.chan(ch)[frame]));
        }
    }
}

/// Convert any Symphonia sample format to interleaved f32
fn append_interleaved(decoded: AudioBufferRef<'_>, skip: usize, out: &mut VecDeque<f32>) {
    const I24_SCALE: f32 = 8_388_608.0;

    match decoded {
        // Float formats - already normalized
        AudioBufferRef::F32(buf) => interleave(&buf, skip, out, |s| s),
        AudioBufferRef::F64(buf) => interleave(&buf, skip, out, |s| s as f32),

        // Signed integer formats - scale by full range
        AudioBufferRef::S8(buf) => interleave(&buf, skip, out, |s| f32::from(s) / 128.0),
        AudioBufferRef::S16(buf) => interleave(&buf, skip, out, |s| f32::from(s) / 32_768.0),
        AudioBufferRef::S24(buf) => interleave(&buf, skip, out, |s| s.inner() as f32 / I24_SCALE),
        AudioBufferRef::S32(buf) => {
            interleave(&buf, skip, out, |s| (f64::from(s) / 2_147_483_648.0) as f32)
        }

        // Unsigned integer formats - center around 0
        AudioBufferRef::U8(buf) => interleave(&buf, skip, out, |s| (f32::from(s) - 128.0) / 128.0),
        AudioBufferRef::U16(buf) => {
            interleave(&buf, skip, out, |s| (f32::from(s) - 32_768.0) / 32_768.0)
        }
        AudioBufferRef::U24(buf) => {
            interleave(&buf, skip, out, |s| (s.inner() as f32 - I24_SCALE) / I24_SCALE)
        }
        AudioBufferRef::U32(buf) => interleave(&buf, skip, out, |s| {
            ((f64::from(s) - 2_147_483_648.0) / 2_147_483_648.0) as f32
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_source_implements_frame_source() {
        fn assert_frame_source<T: FrameSource>() {}
        assert_frame_source::<FileFrameSource>();
    }

    #[test]
    fn timestamp_conversion_with_sample_time_base() {
        let tb = Some(TimeBase::new(1, 44100));
        assert_eq!(ts_to_frames(44100, tb, 44100), 44100);
        assert_eq!(frames_to_ts(1234, tb, 44100), 1234);
    }

    #[test]
    fn timestamp_conversion_with_millisecond_time_base() {
        let tb = Some(TimeBase::new(1, 1000));
        assert_eq!(ts_to_frames(500, tb, 48000), 24000);
        assert_eq!(frames_to_ts(24000, tb, 48000), 500);
        assert_eq!(ts_to_frames(7, None, 48000), 7);
    }

    #[test]
    fn timestamp_conversion_saturates() {
        let tb = Some(TimeBase::new(1, 1000));
        assert_eq!(ts_to_frames(u64::MAX, tb, 192_000), u64::MAX);
        let coarse = Some(TimeBase::new(1, 48000 * 4));
        assert_eq!(frames_to_ts(u64::MAX, coarse, 48000), u64::MAX);
    }

    #[test]
    fn unopened_source_errors() {
        let mut source = FileFrameSource::new();
        let mut buffer = [0.0_f32; 8];
        assert!(source.read_frames(&mut buffer).is_err());
        assert!(source.seek(0).is_err());
        assert_eq!(source.tell(), 0);
        assert!(source.close().is_ok());
    }

    #[test]
    fn missing_file_is_source_error() {
        let mut source = FileFrameSource::new();
        let err = source
            .open(Path::new("/nonexistent/onyx/track.flac"))
            .unwrap_err();
        assert!(matches!(err, onyx_playback::PlaybackError::Source(_)));
    }
}
