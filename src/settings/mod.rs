//! Reconciliation settings shared by every tree instance.
//!
//! [`Settings`] is the validated record consumed at tree construction; it is
//! only obtainable through [`SettingsBuilder`], which carries the raw
//! configuration keys with safe defaults. The builder derives `serde`
//! traits so an external loader can populate it from any key/value source;
//! unrecognized keys are ignored on deserialization, keeping old binaries
//! forward compatible with newer configuration files.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default multiplier used to derive the split threshold.
pub const DEFAULT_THRESH_MULT: usize = 10;
/// Default number of navigation bits consumed per tree level.
pub const DEFAULT_BIT_QUANTUM: usize = 2;
/// Default differences budget per reconciliation round.
pub const DEFAULT_M_BAR: usize = 5;
/// Default split threshold, `DEFAULT_THRESH_MULT * DEFAULT_M_BAR`.
pub const DEFAULT_SPLIT_THRESHOLD: usize = DEFAULT_THRESH_MULT * DEFAULT_M_BAR;
/// Default join threshold, half the split threshold.
pub const DEFAULT_JOIN_THRESHOLD: usize = DEFAULT_SPLIT_THRESHOLD / 2;
/// Default sample-vector length, `DEFAULT_M_BAR + 1`.
pub const DEFAULT_NUM_SAMPLES: usize = DEFAULT_M_BAR + 1;

/// Error enumeration for settings validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    /// `BitQuantum` must be at least one bit per level.
    InvalidBitQuantum { min: usize, got: usize },
    /// `MBar` must resolve at least one difference.
    InvalidMBar { min: usize, got: usize },
    /// `ThreshMult` below two would put the join threshold at or above the
    /// split threshold and let the tree oscillate between split and join.
    InvalidThreshMult { min: usize, got: usize },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::InvalidBitQuantum { min, got } => {
                write!(f, "bit quantum too small: minimum {}, got {}", min, got)
            }
            SettingsError::InvalidMBar { min, got } => {
                write!(f, "mbar too small: minimum {}, got {}", min, got)
            }
            SettingsError::InvalidThreshMult { min, got } => {
                write!(
                    f,
                    "threshold multiplier too small: minimum {}, got {}",
                    min, got
                )
            }
        }
    }
}

impl std::error::Error for SettingsError {}

/// Builder carrying the raw configuration keys.
///
/// | Key | Default |
/// |-----|---------|
/// | `Version` | `"experimental"` |
/// | `LogName` | `"mtz.recon"` |
/// | `HttpPort` | `11371` |
/// | `ReconPort` | `11370` |
/// | `ThreshMult` | `10` |
/// | `BitQuantum` | `2` |
/// | `MBar` | `5` |
/// | `GossipIntervalSecs` | `60` |
/// | `MaxOutstandingReconRequests` | `100` |
/// | `Partners` | empty |
/// | `Filters` | empty |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SettingsBuilder {
    pub version: String,
    pub log_name: String,
    pub http_port: u16,
    pub recon_port: u16,
    pub partners: Vec<String>,
    pub filters: Vec<String>,
    pub thresh_mult: usize,
    pub bit_quantum: usize,
    pub m_bar: usize,
    pub gossip_interval_secs: u64,
    pub max_outstanding_recon_requests: usize,
}

impl SettingsBuilder {
    /// Returns a builder initialised with the default configuration.
    pub fn new() -> Self {
        Self {
            version: "experimental".to_owned(),
            log_name: "mtz.recon".to_owned(),
            http_port: 11371,
            recon_port: 11370,
            partners: Vec::new(),
            filters: Vec::new(),
            thresh_mult: DEFAULT_THRESH_MULT,
            bit_quantum: DEFAULT_BIT_QUANTUM,
            m_bar: DEFAULT_M_BAR,
            gossip_interval_secs: 60,
            max_outstanding_recon_requests: 100,
        }
    }

    /// Validates the builder fields and emits a [`Settings`] record with the
    /// derived thresholds filled in.
    pub fn build(&self) -> Result<Settings, SettingsError> {
        Settings::try_from_builder(self)
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated configuration record consumed at tree construction.
///
/// The derived relations hold by construction: `split_threshold =
/// thresh_mult * m_bar`, `join_threshold = split_threshold / 2` and
/// `num_samples = m_bar + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub(crate) version: String,
    pub(crate) log_name: String,
    pub(crate) http_port: u16,
    pub(crate) recon_port: u16,
    pub(crate) partners: Vec<String>,
    pub(crate) filters: Vec<String>,
    pub(crate) thresh_mult: usize,
    pub(crate) bit_quantum: usize,
    pub(crate) m_bar: usize,
    pub(crate) split_threshold: usize,
    pub(crate) join_threshold: usize,
    pub(crate) num_samples: usize,
    pub(crate) gossip_interval_secs: u64,
    pub(crate) max_outstanding_recon_requests: usize,
}

impl Settings {
    /// Opaque version tag echoed to peers.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Logger name consumed by the embedding application.
    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    /// HTTP admin port; consumed by the transport layer, not by the tree.
    pub const fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Reconciliation transport port; consumed by the transport layer.
    pub const fn recon_port(&self) -> u16 {
        self.recon_port
    }

    /// Gossip partner addresses; consumed by the transport layer.
    pub fn partners(&self) -> &[String] {
        &self.partners
    }

    /// Installed element filters, echoed to peers.
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Multiplier used to derive the split threshold.
    pub const fn thresh_mult(&self) -> usize {
        self.thresh_mult
    }

    /// Navigation bits consumed per tree level; fan-out is `2^bit_quantum`.
    pub const fn bit_quantum(&self) -> usize {
        self.bit_quantum
    }

    /// Differences budget per reconciliation round.
    pub const fn m_bar(&self) -> usize {
        self.m_bar
    }

    /// Leaf element count above which a leaf splits.
    pub const fn split_threshold(&self) -> usize {
        self.split_threshold
    }

    /// Subtree element count at which an internal node collapses back into a
    /// leaf.
    pub const fn join_threshold(&self) -> usize {
        self.join_threshold
    }

    /// Length of every per-node sample vector, `m_bar + 1`.
    pub const fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Gossip interval in seconds; consumed by the transport layer.
    pub const fn gossip_interval_secs(&self) -> u64 {
        self.gossip_interval_secs
    }

    /// Cap on concurrent inbound reconciliation requests; consumed by the
    /// transport layer.
    pub const fn max_outstanding_recon_requests(&self) -> usize {
        self.max_outstanding_recon_requests
    }

    /// Peer-visible configuration summary exchanged during session setup.
    ///
    /// The map is ordered, so serializing it yields the same byte stream on
    /// every peer with equal settings.
    pub fn peer_config(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("version".to_owned(), self.version.clone());
        map.insert("http port".to_owned(), self.http_port.to_string());
        map.insert("bitquantum".to_owned(), self.bit_quantum.to_string());
        map.insert("mbar".to_owned(), self.m_bar.to_string());
        map.insert("filters".to_owned(), self.filters.join(","));
        map
    }

    fn try_from_builder(builder: &SettingsBuilder) -> Result<Self, SettingsError> {
        if builder.bit_quantum < 1 {
            return Err(SettingsError::InvalidBitQuantum {
                min: 1,
                got: builder.bit_quantum,
            });
        }
        if builder.m_bar < 1 {
            return Err(SettingsError::InvalidMBar {
                min: 1,
                got: builder.m_bar,
            });
        }
        if builder.thresh_mult < 2 {
            return Err(SettingsError::InvalidThreshMult {
                min: 2,
                got: builder.thresh_mult,
            });
        }
        let split_threshold = builder.thresh_mult * builder.m_bar;
        Ok(Self {
            version: builder.version.clone(),
            log_name: builder.log_name.clone(),
            http_port: builder.http_port,
            recon_port: builder.recon_port,
            partners: builder.partners.clone(),
            filters: builder.filters.clone(),
            thresh_mult: builder.thresh_mult,
            bit_quantum: builder.bit_quantum,
            m_bar: builder.m_bar,
            split_threshold,
            join_threshold: split_threshold / 2,
            num_samples: builder.m_bar + 1,
            gossip_interval_secs: builder.gossip_interval_secs,
            max_outstanding_recon_requests: builder.max_outstanding_recon_requests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_derive_thresholds_ok() {
        let settings = SettingsBuilder::new().build().expect("defaults are valid");
        assert_eq!(settings.version(), "experimental");
        assert_eq!(settings.log_name(), "mtz.recon");
        assert_eq!(settings.http_port(), 11371);
        assert_eq!(settings.recon_port(), 11370);
        assert!(settings.partners().is_empty());
        assert!(settings.filters().is_empty());
        assert_eq!(settings.gossip_interval_secs(), 60);
        assert_eq!(settings.max_outstanding_recon_requests(), 100);
        assert_eq!(settings.split_threshold(), DEFAULT_SPLIT_THRESHOLD);
        assert_eq!(settings.join_threshold(), DEFAULT_JOIN_THRESHOLD);
        assert_eq!(settings.num_samples(), DEFAULT_NUM_SAMPLES);
        assert_eq!(settings.split_threshold(), 50);
        assert_eq!(settings.join_threshold(), 25);
        assert_eq!(settings.num_samples(), 6);
    }

    #[test]
    fn derived_follow_overrides_ok() {
        let mut builder = SettingsBuilder::new();
        builder.thresh_mult = 4;
        builder.m_bar = 8;
        let settings = builder.build().expect("valid overrides");
        assert_eq!(settings.split_threshold(), 32);
        assert_eq!(settings.join_threshold(), 16);
        assert_eq!(settings.num_samples(), 9);
    }

    #[test]
    fn zero_bit_quantum_err() {
        let mut builder = SettingsBuilder::new();
        builder.bit_quantum = 0;
        assert_eq!(
            builder.build(),
            Err(SettingsError::InvalidBitQuantum { min: 1, got: 0 })
        );
    }

    #[test]
    fn zero_m_bar_err() {
        let mut builder = SettingsBuilder::new();
        builder.m_bar = 0;
        assert_eq!(
            builder.build(),
            Err(SettingsError::InvalidMBar { min: 1, got: 0 })
        );
    }

    #[test]
    fn low_thresh_mult_err() {
        let mut builder = SettingsBuilder::new();
        builder.thresh_mult = 1;
        let err = builder.build().expect_err("oscillating thresholds");
        assert_eq!(err, SettingsError::InvalidThreshMult { min: 2, got: 1 });
        assert_eq!(
            err.to_string(),
            "threshold multiplier too small: minimum 2, got 1"
        );
    }

    #[test]
    fn peer_config_echoes_exchange_keys_ok() {
        let mut builder = SettingsBuilder::new();
        builder.filters = vec!["yminsky.dedup".to_owned(), "yminsky.merge".to_owned()];
        let settings = builder.build().expect("valid");
        let map = settings.peer_config();
        assert_eq!(map["version"], "experimental");
        assert_eq!(map["http port"], "11371");
        assert_eq!(map["bitquantum"], "2");
        assert_eq!(map["mbar"], "5");
        assert_eq!(map["filters"], "yminsky.dedup,yminsky.merge");
    }
}
