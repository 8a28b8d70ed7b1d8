//! MP3 duration probing.
//!
//! Reads container metadata when the stream carries a frame count (Xing/Info
//! header) and otherwise walks the packets summing their durations. Nothing
//! is decoded. Any failure yields `None`; the narrator then substitutes the
//! backend's estimate.

use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use tracing::debug;

/// Duration of the MP3 at `path` in seconds, if it can be read.
pub async fn probe_mp3_duration(path: &Path) -> Option<f64> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || probe_blocking(&path))
        .await
        .ok()
        .flatten()
}

fn probe_blocking(path: &Path) -> Option<f64> {
    match mp3_duration(path) {
        Ok(secs) if secs > 0.0 => Some(secs),
        Ok(_) => {
            debug!("{}: zero-length audio", path.display());
            None
        }
        Err(e) => {
            debug!("{}: cannot read duration: {}", path.display(), e);
            None
        }
    }
}

fn mp3_duration(path: &Path) -> Result<f64, SymphoniaError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let (track_id, time_base, n_frames) = {
        let track = format
            .default_track()
            .ok_or(SymphoniaError::Unsupported("no audio track"))?;
        let params = &track.codec_params;
        let time_base = params
            .time_base
            .or_else(|| params.sample_rate.map(|rate| TimeBase::new(1, rate)))
            .ok_or(SymphoniaError::Unsupported("unknown sample rate"))?;
        (track.id, time_base, params.n_frames)
    };

    let ticks = match n_frames {
        Some(n) => n,
        None => {
            let mut total = 0u64;
            loop {
                match format.next_packet() {
                    Ok(packet) if packet.track_id() == track_id => total += packet.dur(),
                    Ok(_) => {}
                    Err(SymphoniaError::IoError(ref e))
                        if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                    {
                        break
                    }
                    Err(e) => return Err(e),
                }
            }
            total
        }
    };

    let time = time_base.calc_time(ticks);
    Ok(time.seconds as f64 + time.frac)
}
