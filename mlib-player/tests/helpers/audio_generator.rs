//! In-memory WAV generation for transport tests

use hound::{WavSpec, WavWriter};
use std::io::Cursor;

/// Test sample rate (8 kHz keeps files small)
pub const TEST_SAMPLE_RATE: u32 = 8000;

/// Silent mono 16-bit WAV of the given length
pub fn silent_wav(duration_ms: u64) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).expect("WAV header");
        let frames = TEST_SAMPLE_RATE as u64 * duration_ms / 1000;
        for _ in 0..frames {
            writer.write_sample(0i16).expect("WAV sample");
        }
        writer.finalize().expect("WAV finalize");
    }
    cursor.into_inner()
}
