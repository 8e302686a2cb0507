//! Float to 16-bit PCM conversion for the outbound audio stream.

/// Convert a single float sample to a signed 16-bit integer.
///
/// The sample is clamped to [-1.0, 1.0] first. Negative values scale by
/// 32768 and non-negative values by 32767 so that both extremes map onto
/// the full i16 range without overflow.
pub fn encode_sample(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

/// Convert float samples to 16-bit signed little-endian PCM bytes.
///
/// Output length is always 2 bytes per input sample.
pub fn encode_frame(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&encode_sample(sample).to_le_bytes());
    }
    bytes
}
