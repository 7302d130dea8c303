//! Protocol version buckets.
//!
//! Several client protocol revisions share one set of data files. A bucket
//! names that set and knows the file suffix its tables are stored under.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::MappingError;

/// One set of block/item tables, named after the first game version using it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolBucket {
    V1_17_0,
    V1_17_10,
    V1_17_30,
    V1_17_40,
    V1_18_0,
    V1_18_10,
}

impl ProtocolBucket {
    /// Every bucket, oldest first.
    pub const ALL: [ProtocolBucket; 6] = [
        Self::V1_17_0,
        Self::V1_17_10,
        Self::V1_17_30,
        Self::V1_17_40,
        Self::V1_18_0,
        Self::V1_18_10,
    ];

    /// The bucket the current data files (no suffix) belong to.
    pub const CURRENT: ProtocolBucket = Self::V1_18_10;

    /// First protocol number served by this bucket.
    pub fn protocol(self) -> u32 {
        match self {
            Self::V1_17_0 => 440,
            Self::V1_17_10 => 448,
            Self::V1_17_30 => 465,
            Self::V1_17_40 => 471,
            Self::V1_18_0 => 475,
            Self::V1_18_10 => 486,
        }
    }

    pub fn game_version(self) -> &'static str {
        match self {
            Self::V1_17_0 => "1.17.0",
            Self::V1_17_10 => "1.17.10",
            Self::V1_17_30 => "1.17.30",
            Self::V1_17_40 => "1.17.40",
            Self::V1_18_0 => "1.18.0",
            Self::V1_18_10 => "1.18.10",
        }
    }

    /// Picks the bucket for a client protocol.
    ///
    /// Protocols between two buckets use the older one; protocols newer than
    /// every bucket use the newest.
    pub fn for_protocol(protocol: u32) -> Result<Self, MappingError> {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|bucket| bucket.protocol() <= protocol)
            .ok_or(MappingError::UnsupportedProtocol(protocol))
    }

    /// File name suffix; empty for [`CURRENT`](Self::CURRENT).
    pub fn suffix(self) -> String {
        if self == Self::CURRENT {
            String::new()
        } else {
            format!("-{}", self.game_version())
        }
    }

    pub fn canonical_states_path(self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("canonical_block_states{}.nbt", self.suffix()))
    }

    pub fn legacy_map_path(self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("r12_to_current_block_map{}.bin", self.suffix()))
    }

    pub fn item_list_path(self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("required_item_list{}.json", self.suffix()))
    }
}

impl fmt::Display for ProtocolBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (protocol {})", self.game_version(), self.protocol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_protocols() {
        for bucket in ProtocolBucket::ALL {
            assert_eq!(ProtocolBucket::for_protocol(bucket.protocol()).unwrap(), bucket);
        }
    }

    #[test]
    fn test_between_buckets_uses_older() {
        assert_eq!(ProtocolBucket::for_protocol(450).unwrap(), ProtocolBucket::V1_17_10);
        assert_eq!(ProtocolBucket::for_protocol(474).unwrap(), ProtocolBucket::V1_17_40);
    }

    #[test]
    fn test_newer_uses_newest() {
        assert_eq!(ProtocolBucket::for_protocol(503).unwrap(), ProtocolBucket::CURRENT);
    }

    #[test]
    fn test_older_than_oldest_rejected() {
        assert!(matches!(
            ProtocolBucket::for_protocol(431),
            Err(MappingError::UnsupportedProtocol(431))
        ));
    }

    #[test]
    fn test_file_names() {
        let dir = Path::new("data");
        assert_eq!(
            ProtocolBucket::V1_18_10.canonical_states_path(dir),
            Path::new("data/canonical_block_states.nbt")
        );
        assert_eq!(
            ProtocolBucket::V1_17_40.legacy_map_path(dir),
            Path::new("data/r12_to_current_block_map-1.17.40.bin")
        );
        assert_eq!(
            ProtocolBucket::V1_18_0.item_list_path(dir),
            Path::new("data/required_item_list-1.18.0.json")
        );
    }
}
