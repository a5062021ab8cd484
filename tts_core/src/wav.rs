use std::io::Cursor;

use crate::error::TtsError;

/// Frame 16-bit mono PCM as a canonical RIFF/WAVE byte stream.
///
/// Output is the standard 44-byte header (RIFF, `fmt ` with no extension
/// chunk, `data`) followed by the little-endian samples.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, TtsError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| TtsError::Synthesis(format!("wav write err: {e}")))?;
        for &s in samples {
            writer
                .write_sample(s)
                .map_err(|e| TtsError::Synthesis(format!("wav sample err: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| TtsError::Synthesis(format!("wav finalize err: {e}")))?;
    }

    Ok(cursor.into_inner())
}
