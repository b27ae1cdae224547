// Keyed hardware-monitor channel (Apple SMC): key codes, raw values, connection trait.

pub mod codec;
#[cfg(target_os = "macos")]
mod macos;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::SmcError;

/// Four ASCII bytes packed big-endian, e.g. `TC0P` or the data type `fpe2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(u32);

impl FourCc {
    pub const fn from_bytes(bytes: &[u8; 4]) -> Self {
        Self(u32::from_be_bytes(*bytes))
    }

    pub const fn from_u32(code: u32) -> Self {
        Self(code)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Per-fan key such as `F0Ac` or `F2Md`. `None` for index ≥ 10 or a suffix
    /// that is not two ASCII bytes.
    pub fn fan(index: usize, suffix: &str) -> Option<Self> {
        format!("F{index}{suffix}").parse().ok()
    }
}

impl FromStr for FourCc {
    type Err = SmcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| SmcError::InvalidKey(s.to_string()))?;
        if !bytes.is_ascii() {
            return Err(SmcError::InvalidKey(s.to_string()));
        }
        Ok(Self::from_bytes(&bytes))
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        f.write_str(&String::from_utf8_lossy(&bytes))
    }
}

/// Raw result of a key read: the controller-reported type tag, size and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmcValue {
    pub data_type: FourCc,
    pub data_size: u32,
    pub bytes: Vec<u8>,
}

/// Read/write access to the keyed register interface.
/// Implementations serialize calls internally.
pub trait SmcConnection: Send + Sync {
    fn read_key(&self, key: FourCc) -> Result<SmcValue, SmcError>;

    fn write_key(&self, key: FourCc, data_type: FourCc, bytes: &[u8]) -> Result<(), SmcError>;
}

/// Open the platform connection once. `None` when the platform has no SMC
/// or the service refused the connection.
pub fn open() -> Option<Arc<dyn SmcConnection>> {
    #[cfg(target_os = "macos")]
    {
        match macos::IoKitSmc::open() {
            Ok(conn) => {
                tracing::info!(operation = "smc_open", "SMC connection opened");
                Some(Arc::new(conn))
            }
            Err(e) => {
                tracing::info!(error = %e, operation = "smc_open", "SMC unavailable");
                None
            }
        }
    }
    #[cfg(not(target_os = "macos"))]
    {
        tracing::info!(
            operation = "smc_open",
            "No SMC on this platform; thermal data disabled"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_cc_is_big_endian() {
        let key: FourCc = "TC0P".parse().unwrap();
        assert_eq!(key.as_u32(), 0x5443_3050);
        assert_eq!(key, FourCc::from_bytes(b"TC0P"));
        assert_eq!(key.to_string(), "TC0P");
    }

    #[test]
    fn four_cc_rejects_wrong_length() {
        assert!("TC0".parse::<FourCc>().is_err());
        assert!("TC0PX".parse::<FourCc>().is_err());
    }

    #[test]
    fn fan_keys() {
        assert_eq!(FourCc::fan(0, "Ac"), Some(FourCc::from_bytes(b"F0Ac")));
        assert_eq!(FourCc::fan(3, "Md"), Some(FourCc::from_bytes(b"F3Md")));
        assert_eq!(FourCc::fan(10, "Ac"), None);
    }
}
