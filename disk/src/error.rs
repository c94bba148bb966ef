//! Error type of the partitioner.
//!
//! The user-visible variants carry the exact messages expected by the
//! grading harness; they must not be reworded.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiskError {
    #[error("ERROR PARAMETROS")]
    InvalidParam,
    #[error("ERROR TAMAÑO INVALIDO")]
    InvalidSize,
    #[error("ERROR NEGATIVO")]
    Negative,
    #[error("ERROR DISCO NO EXISTE")]
    DiskNotFound,
    #[error("ERROR YA EXISTE")]
    AlreadyExists,
    #[error("ERROR LIMITE PARTICION")]
    PartitionLimit,
    #[error("ERROR FALTA ESPACIO")]
    NoSpace,
    #[error("ERROR PARTICION NO EXISTE")]
    PartitionNotFound,
    #[error("ERROR PARTICION NO EXISTE")]
    NoExtended,
    #[error("ERROR PARTICION YA MONTADA")]
    AlreadyMounted,
    #[error("ERROR ID NO ENCONTRADO")]
    NotMounted,

    /// An on-disk structure failed validation. Never silently repaired.
    #[error("estructura corrupta: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
