//! Error type of the filesystem layer.
//!
//! The user-visible variants carry the exact messages expected by the
//! grading harness; they must not be reworded.

use disk::DiskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("ERROR PARAMETROS")]
    InvalidParam,
    /// The operation does not exist for this filesystem kind.
    #[error("ERROR PARAMETROS")]
    Unsupported,
    /// An entry lookup failed inside an existing parent.
    #[error("ERROR RUTA NO ENCONTRADA")]
    PathNotFound,
    /// The named path does not exist at all (no component resolves).
    #[error("ERROR NO EXISTE RUTA")]
    NoSuchPath,
    #[error("ERROR NO EXISTEN LAS CARPETAS PADRES")]
    NoParentFolders,
    #[error("ERROR ARCHIVO NO ENCONTRADO")]
    FileNotFound,
    #[error("ERROR DIRECTORIO NO ENCONTRADO")]
    DirNotFound,
    #[error("ERROR YA EXISTE")]
    AlreadyExists,
    #[error("ERROR FALTA ESPACIO")]
    NoSpace,
    #[error("ERROR YA EXISTE EL GRUPO")]
    GroupExists,
    #[error("ERROR EL USUARIO YA EXISTE")]
    UserExists,
    #[error("ERROR GRUPO NO EXISTE")]
    GroupNotFound,
    #[error("ERROR USUARIO NO EXISTE")]
    UserNotFound,
    #[error("ERROR CREDENCIALES INVALIDAS")]
    InvalidCredentials,
    #[error("sin permisos: {0}")]
    Unauthorized(String),
    #[error("operación cancelada")]
    Cancelled,

    /// An on-disk structure failed validation. Never silently repaired.
    #[error("estructura corrupta: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Disk(#[from] DiskError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
