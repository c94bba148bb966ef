//! The disk partitioner: MBR/EBR layout, fit-based allocation of primary,
//! extended and logical partitions, and the in-memory mount table.
//!
//! A disk is a regular host file. Byte 0 carries the MBR with up to four
//! primary/extended slots; an extended partition holds a chain of EBRs
//! describing the logical partitions inside it.

mod alloc;
pub mod ebr;
mod error;
pub mod manager;
pub mod mbr;
pub mod mount_table;

pub use ebr::{Ebr, EBR_SIZE};
pub use error::DiskError;
pub use manager::{DeleteMode, DiskManager, PartitionSpan};
pub use mbr::{Fit, Mbr, PartType, PartitionSlot, MAX_PRIMARIES, MBR_RESERVED, NAME_LEN};
pub use mount_table::{MountTable, PartitionRef};
