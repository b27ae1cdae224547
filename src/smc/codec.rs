// Value codecs for SMC data types.

use super::{FourCc, SmcValue};

pub const FPE2: FourCc = FourCc::from_bytes(b"fpe2");
pub const SP78: FourCc = FourCc::from_bytes(b"sp78");
pub const FLT: FourCc = FourCc::from_bytes(b"flt ");
pub const UI8: FourCc = FourCc::from_bytes(b"ui8 ");
pub const UI16: FourCc = FourCc::from_bytes(b"ui16");
pub const UI32: FourCc = FourCc::from_bytes(b"ui32");
pub const SI8: FourCc = FourCc::from_bytes(b"si8 ");
pub const SI16: FourCc = FourCc::from_bytes(b"si16");

/// Signed 16-bit fixed point: sign + integer + fraction bits = 16.
const SIGNED_FIXED: &[(&[u8; 4], u32)] = &[
    (b"sp1e", 14),
    (b"sp3c", 12),
    (b"sp4b", 11),
    (b"sp5a", 10),
    (b"sp69", 9),
    (b"sp87", 7),
];

/// Unsigned 16-bit fixed point: integer + fraction bits = 16.
const UNSIGNED_FIXED: &[(&[u8; 4], u32)] = &[
    (b"fp1f", 15),
    (b"fp2e", 14),
    (b"fp3d", 13),
    (b"fp4c", 12),
    (b"fp5b", 11),
    (b"fp6a", 10),
    (b"fp79", 9),
    (b"fp88", 8),
    (b"fpa6", 6),
    (b"fpc4", 4),
];

const MAX_WATTS: f64 = 500.0;
const MAX_MILLIWATTS: f64 = 500_000.0;
const FPE2_MAX: f64 = 16383.75;

fn be_u16(bytes: &[u8]) -> Option<u16> {
    Some(u16::from_be_bytes(bytes.get(..2)?.try_into().ok()?))
}

fn le_f32(bytes: &[u8]) -> Option<f32> {
    Some(f32::from_le_bytes(bytes.get(..4)?.try_into().ok()?))
}

/// Decode a raw payload according to its type tag. `None` for unknown types
/// or payloads shorter than the type requires.
pub fn decode(data_type: FourCc, bytes: &[u8]) -> Option<f64> {
    match data_type {
        FPE2 => be_u16(bytes).map(|v| f64::from(v) / 4.0),
        SP78 => be_u16(bytes).map(|v| f64::from(v as i16) / 256.0),
        FLT => le_f32(bytes).map(f64::from),
        UI8 => bytes.first().map(|b| f64::from(*b)),
        UI16 => be_u16(bytes).map(f64::from),
        UI32 => Some(f64::from(u32::from_be_bytes(
            bytes.get(..4)?.try_into().ok()?,
        ))),
        SI8 => bytes.first().map(|b| f64::from(*b as i8)),
        SI16 => be_u16(bytes).map(|v| f64::from(v as i16)),
        other => decode_fixed_point(other, bytes),
    }
}

fn decode_fixed_point(data_type: FourCc, bytes: &[u8]) -> Option<f64> {
    let tag = data_type.to_bytes();
    let raw = be_u16(bytes)?;
    if let Some((_, frac)) = SIGNED_FIXED.iter().find(|(t, _)| **t == tag) {
        return Some(f64::from(raw as i16) / f64::from(1u32 << frac));
    }
    UNSIGNED_FIXED
        .iter()
        .find(|(t, _)| **t == tag)
        .map(|(_, frac)| f64::from(raw) / f64::from(1u32 << frac))
}

pub fn decode_value(value: &SmcValue) -> Option<f64> {
    decode(value.data_type, &value.bytes)
}

/// Watts from a power key. Strategies in priority order: the tagged type
/// (milliwatt-range values scaled down), little-endian f32, then sp78.
pub fn decode_power_watts(value: &SmcValue) -> Option<f64> {
    let in_range = |w: f64| w.is_finite() && w > 0.0 && w < MAX_WATTS;

    if let Some(v) = decode_value(value) {
        if in_range(v) {
            return Some(v);
        }
        if (MAX_WATTS..MAX_MILLIWATTS).contains(&v) {
            return Some(v / 1000.0);
        }
    }
    if let Some(f) = le_f32(&value.bytes).map(f64::from)
        && in_range(f)
    {
        return Some(f);
    }
    decode(SP78, &value.bytes).filter(|v| in_range(*v))
}

/// Unsigned 14.2 fixed point, big-endian. Clamped to the representable range.
pub fn encode_fpe2(value: f64) -> [u8; 2] {
    let clamped = value.clamp(0.0, FPE2_MAX);
    ((clamped * 4.0) as u16).to_be_bytes()
}

/// IEEE f32, little-endian as the controller stores it.
pub fn encode_flt(value: f64) -> [u8; 4] {
    (value as f32).to_le_bytes()
}
