//! Dimensions and their vertical sub-chunk bounds.

/// Errors for dimension and height lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("unknown dimension id {0}")]
    UnknownDimension(i32),
    #[error("invalid sub-chunk range [{min}, {max}]")]
    InvalidRange { min: i32, max: i32 },
    #[error("block height {y} outside sub-chunks [{min}, {max}]")]
    HeightOutOfRange { y: i32, min: i32, max: i32 },
}

/// Inclusive range of sub-chunk indices a chunk column spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubChunkRange {
    min: i32,
    max: i32,
}

impl SubChunkRange {
    pub fn new(min: i32, max: i32) -> Result<Self, WorldError> {
        if min > max {
            return Err(WorldError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(self) -> i32 {
        self.min
    }

    pub fn max(self) -> i32 {
        self.max
    }

    /// Number of sub-chunks in the range.
    pub fn len(self) -> usize {
        (self.max - self.min + 1) as usize
    }

    pub fn is_empty(self) -> bool {
        false
    }

    pub fn contains(self, index: i32) -> bool {
        (self.min..=self.max).contains(&index)
    }

    /// Position of `index` within the range, if it is inside.
    pub fn offset_of(self, index: i32) -> Option<usize> {
        self.contains(index).then(|| (index - self.min) as usize)
    }

    pub fn iter(self) -> impl DoubleEndedIterator<Item = i32> {
        self.min..=self.max
    }
}

/// The three Bedrock dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Overworld = 0,
    Nether = 1,
    End = 2,
}

impl Dimension {
    pub fn from_id(id: i32) -> Result<Self, WorldError> {
        match id {
            0 => Ok(Self::Overworld),
            1 => Ok(Self::Nether),
            2 => Ok(Self::End),
            other => Err(WorldError::UnknownDimension(other)),
        }
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    /// Sub-chunk bounds: overworld y -64..320, nether 0..128, end 0..256.
    pub fn sub_chunk_range(self) -> SubChunkRange {
        let (min, max) = match self {
            Self::Overworld => (-4, 19),
            Self::Nether => (0, 7),
            Self::End => (0, 15),
        };
        SubChunkRange { min, max }
    }
}
