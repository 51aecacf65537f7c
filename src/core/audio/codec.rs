//! G.711 µ-law decoding and naive upsampling for the telephony ingress path.
//!
//! The telephony provider delivers 8-bit µ-law at 8 kHz; the realtime peer
//! expects 16-bit linear PCM at 16 kHz. Both conversions here are stateless
//! and run on every inbound media frame (~50 Hz), so they stay allocation-light:
//! one output `Vec` per call, no intermediate buffers.
//!
//! The upsampler is deliberately sample-duplication. No anti-imaging filter is
//! applied; minimum latency matters more than spectral purity on a speech
//! input path, and the downstream model is tolerant of imaging artifacts.
//! Swapping in a linear or FIR interpolator would not change the interface.

/// µ-law companding bias (G.711).
const MULAW_BIAS: i32 = 0x84;

/// Decode a single G.711 µ-law byte to a linear 16-bit sample.
///
/// µ-law bytes are stored bit-inverted on the wire; after inversion the byte
/// is `[sign:1][exponent:3][mantissa:4]`.
#[inline]
fn decode_mulaw_sample(byte: u8) -> i16 {
    let u = !byte;
    let sign = u & 0x80;
    let exponent = (u >> 4) & 0x07;
    let mantissa = u & 0x0F;

    let magnitude = ((((mantissa as i32) << 3) + MULAW_BIAS) << exponent) - MULAW_BIAS;

    if sign != 0 {
        -(magnitude as i16)
    } else {
        magnitude as i16
    }
}

/// Expand a µ-law frame to 16-bit signed little-endian PCM.
///
/// Output is exactly two bytes per input byte.
pub fn mulaw_to_pcm16(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 2);
    for &byte in input {
        out.extend_from_slice(&decode_mulaw_sample(byte).to_le_bytes());
    }
    out
}

/// Upsample 8 kHz PCM16 to 16 kHz by emitting each sample twice.
///
/// Output is exactly twice the input length. Input must be whole samples
/// (even byte count), which `mulaw_to_pcm16` guarantees upstream.
pub fn upsample_8k_to_16k(pcm: &[u8]) -> Vec<u8> {
    debug_assert_eq!(pcm.len() % 2, 0, "PCM16 input must be whole samples");
    let mut out = Vec::with_capacity(pcm.len() * 2);
    for sample in pcm.chunks_exact(2) {
        out.extend_from_slice(sample);
        out.extend_from_slice(sample);
    }
    out
}
