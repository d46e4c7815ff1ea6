//! Container probing with symphonia.
//!
//! Only headers and packet durations are read. Nothing is decoded.

use crate::error::{EngineError, EngineResult};
use crate::types::SoundFormat;
use std::io::Cursor;
use symphonia::core::codecs::{
    CodecType, CODEC_TYPE_NULL, CODEC_TYPE_PCM_F32BE, CODEC_TYPE_PCM_F32LE,
    CODEC_TYPE_PCM_F64BE, CODEC_TYPE_PCM_F64LE, CODEC_TYPE_PCM_S16BE, CODEC_TYPE_PCM_S16LE,
    CODEC_TYPE_PCM_S24BE, CODEC_TYPE_PCM_S24LE, CODEC_TYPE_PCM_S32BE, CODEC_TYPE_PCM_S32LE,
    CODEC_TYPE_PCM_S8, CODEC_TYPE_PCM_U8,
};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Stream properties of a probed sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProbeInfo {
    pub frequency: u32,
    pub channels: u32,
    pub format: SoundFormat,
    pub bits: u32,
    pub length: u32,
}

/// Sample format the engine decodes a codec to.
fn format_for_codec(codec: CodecType, bits: Option<u32>) -> SoundFormat {
    match codec {
        c if c == CODEC_TYPE_PCM_U8 || c == CODEC_TYPE_PCM_S8 => SoundFormat::Pcm8,
        c if c == CODEC_TYPE_PCM_S16LE || c == CODEC_TYPE_PCM_S16BE => SoundFormat::Pcm16,
        c if c == CODEC_TYPE_PCM_S24LE || c == CODEC_TYPE_PCM_S24BE => SoundFormat::Pcm24,
        c if c == CODEC_TYPE_PCM_S32LE || c == CODEC_TYPE_PCM_S32BE => SoundFormat::Pcm32,
        c if c == CODEC_TYPE_PCM_F32LE
            || c == CODEC_TYPE_PCM_F32BE
            || c == CODEC_TYPE_PCM_F64LE
            || c == CODEC_TYPE_PCM_F64BE =>
        {
            SoundFormat::PcmFloat
        },
        // compressed codecs decode to their source resolution, 16-bit when unknown
        _ => match bits {
            Some(8) => SoundFormat::Pcm8,
            Some(24) => SoundFormat::Pcm24,
            Some(32) => SoundFormat::Pcm32,
            _ => SoundFormat::Pcm16,
        },
    }
}

fn bits_for_format(format: SoundFormat) -> u32 {
    match format {
        SoundFormat::Pcm8 => 8,
        SoundFormat::Pcm16 => 16,
        SoundFormat::Pcm24 => 24,
        SoundFormat::Pcm32 | SoundFormat::PcmFloat => 32,
        SoundFormat::None | SoundFormat::Bitstream => 0,
    }
}

/// Probes an in-memory file.
pub(crate) fn probe(name: &str, bytes: Vec<u8>) -> EngineResult<ProbeInfo> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some((_, extension)) = name.rsplit_once('.') {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| match e {
            SymphoniaError::Unsupported(what) => EngineError::Format(format!("{name}: {what}")),
            other => EngineError::FileBad(format!("{name}: {other}")),
        })?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::Format(format!("{name}: no audio track")))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let frequency = params
        .sample_rate
        .ok_or_else(|| EngineError::FileBad(format!("{name}: missing sample rate")))?;
    let channels = params.channels.map_or(1, |c| c.count() as u32);
    let format = format_for_codec(params.codec, params.bits_per_sample);

    let frames = match params.n_frames {
        Some(n) => n,
        None => {
            let mut total = 0u64;
            loop {
                match reader.next_packet() {
                    Ok(packet) if packet.track_id() == track_id => total += packet.dur,
                    Ok(_) => {},
                    Err(SymphoniaError::IoError(e))
                        if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                    {
                        break
                    },
                    Err(SymphoniaError::ResetRequired) => break,
                    Err(e) => return Err(EngineError::FileBad(format!("{name}: {e}"))),
                }
            }
            total
        },
    };

    let info = ProbeInfo {
        frequency,
        channels,
        format,
        bits: params.bits_per_sample.unwrap_or_else(|| bits_for_format(format)),
        length: u32::try_from(frames).unwrap_or(u32::MAX),
    };
    debug!("Probed {}: {:?}", name, info);
    Ok(info)
}
