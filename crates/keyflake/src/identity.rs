use core::hash::Hasher;

use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::{BitLayout, Result, layout::check_range};

/// Datacenter id used when no network interface can be resolved.
pub const FALLBACK_DATA_CENTER_ID: u64 = 1;

/// How a generator obtains its datacenter and worker ids.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum IdentityMode {
    /// Ids assigned by the operator. The only way to guarantee uniqueness
    /// across a cluster.
    Explicit { worker_id: u64, data_center_id: u64 },
    /// Ids derived from the host's hardware address and the process identity.
    #[default]
    Derived,
}

/// The datacenter and worker ids stamped into every ID of one generator.
///
/// Both values are validated against the owning [`BitLayout`] when the
/// identity is built and never change afterwards.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkerIdentity {
    worker_id: u64,
    data_center_id: u64,
}

impl WorkerIdentity {
    /// Builds an identity from operator-assigned ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either id exceeds the layout's
    /// maximum for its field.
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    pub fn explicit(layout: &BitLayout, worker_id: u64, data_center_id: u64) -> Result<Self> {
        Ok(Self {
            worker_id: check_range("worker id", worker_id, layout.max_worker_id())?,
            data_center_id: check_range(
                "datacenter id",
                data_center_id,
                layout.max_data_center_id(),
            )?,
        })
    }

    /// Derives an identity from the host.
    ///
    /// The datacenter id comes from the primary network interface's hardware
    /// address (see [`derive_data_center_id`]); the worker id from a hash of
    /// the datacenter id and the process identity (see [`derive_worker_id`]).
    ///
    /// This is a convenience default. Hosts sharing a hardware address suffix,
    /// or processes whose identities hash alike, can collide; use
    /// [`WorkerIdentity::explicit`] when uniqueness must be guaranteed.
    pub fn from_host(layout: &BitLayout) -> Self {
        let mac = primary_mac_address();
        let data_center_id = derive_data_center_id(mac, layout.max_data_center_id());
        let process = process_identity();
        let worker_id = derive_worker_id(data_center_id, &process, layout.max_worker_id());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            data_center_id,
            worker_id,
            mac_resolved = mac.is_some(),
            process = %process,
            "derived worker identity from host"
        );

        Self {
            worker_id,
            data_center_id,
        }
    }

    /// Resolves an identity for `layout` according to `mode`.
    ///
    /// # Errors
    ///
    /// See [`WorkerIdentity::explicit`].
    pub fn resolve(layout: &BitLayout, mode: IdentityMode) -> Result<Self> {
        match mode {
            IdentityMode::Explicit {
                worker_id,
                data_center_id,
            } => Self::explicit(layout, worker_id, data_center_id),
            IdentityMode::Derived => Ok(Self::from_host(layout)),
        }
    }

    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub const fn data_center_id(&self) -> u64 {
        self.data_center_id
    }
}

/// Maps a hardware address to a datacenter id.
///
/// The last two bytes form a 16-bit value (`mac[5]` high, `mac[4]` low),
/// shifted right by 6 and reduced modulo `max + 1`. Without an address the
/// id is [`FALLBACK_DATA_CENTER_ID`], reduced the same way so it always fits.
pub const fn derive_data_center_id(mac: Option<[u8; 6]>, max: u64) -> u64 {
    let modulus = max + 1;
    match mac {
        Some(mac) => {
            let suffix = ((mac[5] as u64) << 8) | mac[4] as u64;
            (suffix >> 6) % modulus
        }
        None => FALLBACK_DATA_CENTER_ID % modulus,
    }
}

/// Maps a process identity to a worker id.
///
/// Hashes the datacenter id followed by the identity with a fixed-seed
/// xxHash64 (stable across runs and platforms), keeps the low 16 bits and
/// reduces modulo `max + 1`.
pub fn derive_worker_id(data_center_id: u64, process_identity: &str, max: u64) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data_center_id.to_string().as_bytes());
    hasher.write(process_identity.as_bytes());
    (hasher.finish() & 0xFFFF) % (max + 1)
}

/// `"{pid}@{executable}"` for the running process.
pub fn process_identity() -> String {
    let name = std::env::current_exe()
        .ok()
        .and_then(|path| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "unknown".to_owned());
    format!("{}@{name}", std::process::id())
}

/// Hardware address of the first interface that is up, is not a loopback and
/// carries a non-zero address.
#[cfg(feature = "host-identity")]
pub fn primary_mac_address() -> Option<[u8; 6]> {
    pnet::datalink::interfaces()
        .into_iter()
        .filter(|iface| iface.is_up() && !iface.is_loopback())
        .filter_map(|iface| iface.mac)
        .map(|mac| [mac.0, mac.1, mac.2, mac.3, mac.4, mac.5])
        .find(|octets| octets.iter().any(|&b| b != 0))
}

/// Interface discovery is disabled without the `host-identity` feature.
#[cfg(not(feature = "host-identity"))]
pub const fn primary_mac_address() -> Option<[u8; 6]> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, TimeUnit};

    fn layout() -> BitLayout {
        BitLayout::new(41, 5, 5, 12, 0, TimeUnit::Millis).unwrap()
    }

    #[test]
    fn explicit_ids_within_range() {
        let identity = WorkerIdentity::explicit(&layout(), 3, 2).unwrap();
        assert_eq!(identity.worker_id(), 3);
        assert_eq!(identity.data_center_id(), 2);
        assert!(WorkerIdentity::explicit(&layout(), 31, 31).is_ok());
    }

    #[test]
    fn explicit_ids_out_of_range() {
        let err = WorkerIdentity::explicit(&layout(), 32, 0).unwrap_err();
        assert_eq!(
            err,
            Error::Configuration {
                reason: "worker id 32 is out of range (max 31)".into()
            }
        );
        let err = WorkerIdentity::explicit(&layout(), 0, 40).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn data_center_id_from_mac_suffix() {
        // mac[5] = 0xAB, mac[4] = 0xCD -> 0xABCD >> 6 = 687 -> 687 % 32 = 15
        let mac = [0x00, 0x1A, 0x2B, 0x3C, 0xCD, 0xAB];
        assert_eq!(derive_data_center_id(Some(mac), 31), 15);
        assert_eq!(derive_data_center_id(Some(mac), 1023), 687);
    }

    #[test]
    fn data_center_id_fallback() {
        assert_eq!(derive_data_center_id(None, 31), 1);
        assert_eq!(derive_data_center_id(None, 0), 0);
    }

    #[test]
    fn worker_id_is_stable_and_in_range() {
        let a = derive_worker_id(7, "4242@app", 31);
        let b = derive_worker_id(7, "4242@app", 31);
        assert_eq!(a, b);
        assert!(a <= 31);
        assert_eq!(derive_worker_id(7, "4242@app", 0), 0);
    }

    #[test]
    fn host_identity_fits_the_layout() {
        let layout = BitLayout::new(41, 3, 2, 17, 0, TimeUnit::Millis).unwrap();
        let identity = WorkerIdentity::from_host(&layout);
        assert!(identity.data_center_id() <= 7);
        assert!(identity.worker_id() <= 3);
        assert_eq!(WorkerIdentity::from_host(&layout), identity);
    }

    #[test]
    fn resolve_dispatches_on_mode() {
        let explicit = IdentityMode::Explicit {
            worker_id: 1,
            data_center_id: 4,
        };
        let identity = WorkerIdentity::resolve(&layout(), explicit).unwrap();
        assert_eq!((identity.worker_id(), identity.data_center_id()), (1, 4));
        assert!(WorkerIdentity::resolve(&layout(), IdentityMode::Derived).is_ok());
    }

    #[test]
    fn process_identity_contains_pid() {
        let identity = process_identity();
        assert!(identity.starts_with(&format!("{}@", std::process::id())));
    }
}
