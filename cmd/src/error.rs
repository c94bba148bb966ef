//! Error type of the command pipeline.

use disk::DiskError;
use thiserror::Error;
use vfs::FsError;

#[derive(Debug, Error)]
pub enum CmdError {
    #[error("ERROR PARAMETROS")]
    Params,
    #[error("ERROR NEGATIVO")]
    Negative,
    #[error("ERROR TAMAÑO INVALIDO")]
    InvalidSize,
    #[error("ERROR ID NO ENCONTRADO")]
    IdNotFound,
    #[error("ERROR NO HAY SESION INICIADA")]
    NoSession,
    #[error("ERROR SESION INICIADA")]
    SessionActive,
    #[error("comando desconocido: {0}")]
    UnknownCommand(String),
    #[error("operación no soportada: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Disk(#[from] DiskError),
    #[error(transparent)]
    Fs(#[from] FsError),
}
