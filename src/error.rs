use thiserror::Error;

use crate::flags::FlagError;
use crate::region::RegionId;

/// Why a claim operation was refused. The message is meant to be shown to the player.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("'{0}' is not a valid region name")]
    InvalidName(String),

    #[error("The name '{0}' is reserved")]
    ReservedName(String),

    #[error("A region named '{0}' already exists in this world")]
    DuplicateName(String),

    #[error("Priority must be between 0 and 127, got {0}")]
    PriorityOutOfRange(i32),

    #[error("A subdivision cannot have a lower priority than its parent ({parent})")]
    PriorityBelowParent { parent: u8 },

    #[error("This would overlap {} other region(s)", .0.len())]
    Collision(Vec<RegionId>),

    #[error("Every side must be at least {min} blocks long")]
    TooNarrow { min: i64 },

    #[error("You need {needed} more claim blocks")]
    InsufficientClaimBlocks { needed: i64 },

    #[error("This covers {area} blocks, the minimum is {min}")]
    TooSmall { area: i64, min: i64 },

    #[error("{} subdivision(s) would end up outside the claim", .0.len())]
    ChildrenOutside(Vec<RegionId>),

    #[error("A subdivision must stay inside its parent")]
    OutsideParent(RegionId),

    #[error("Cancelled: {0}")]
    Vetoed(String),

    #[error("No such world '{0}'")]
    UnknownWorld(String),

    #[error("No such region")]
    UnknownRegion,

    #[error("No region named '{0}'")]
    UnknownRegionName(String),

    #[error("Unknown player '{0}'")]
    UnknownPlayer(String),

    #[error("Subdivisions cannot be nested")]
    NestedSubdivision,

    #[error("Remove the subdivisions of this region first")]
    HasSubdivisions,

    #[error("Admin regions cannot be transferred")]
    AdminTransfer,

    #[error("Transfer the parent claim instead")]
    SubdivisionTransfer,

    #[error("This region is still in use")]
    NotExpired,

    #[error("You already own this region")]
    AlreadyOwner,

    #[error(transparent)]
    Flag(#[from] FlagError),
}

impl ClaimError {
    /// Regions the caller may want to highlight for the player.
    pub fn offending_regions(&self) -> &[RegionId] {
        match self {
            ClaimError::Collision(regions) | ClaimError::ChildrenOutside(regions) => regions,
            ClaimError::OutsideParent(parent) => std::slice::from_ref(parent),
            _ => &[],
        }
    }
}
