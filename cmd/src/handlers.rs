//! The command table: every recognised command parsed into a typed
//! request.
//!
//! Parsing doubles as validation: a missing required flag, a malformed
//! number or a bad enum value surfaces `ERROR PARAMETROS` (or the
//! negative/size errors for numeric shapes); the dispatcher appends the
//! usage string to validation failures.

use crate::parser::ParsedLine;
use crate::CmdError;
use disk::{DeleteMode, Fit, PartType};
use std::path::PathBuf;
use utils::perm::Perm;
use utils::util::unit_to_bytes;
use vfs::FsKind;

/// Default result cap of `find`.
const FIND_LIMIT: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Mkdisk { path: PathBuf, size: i64, fit: Fit },
    Rmdisk { path: PathBuf },
    FdiskAdd { path: PathBuf, name: String, size: i64, ptype: PartType, fit: Fit },
    FdiskDelete { path: PathBuf, name: String, mode: DeleteMode },
    Mount { path: PathBuf, name: String },
    Unmount { id: String },
    Mounted,
    Mkfs { id: String, kind: FsKind },
    Login { user: String, pass: String, id: String },
    Logout,
    Mkgrp { name: String },
    Rmgrp { name: String },
    Mkusr { user: String, pass: String, grp: String },
    Rmusr { user: String },
    Chgrp { user: String, grp: String },
    Cat { file: String },
    Mkdir { id: String, path: String, deep: bool },
    Mkfile { id: String, path: String, cont: Option<String>, size: Option<i64> },
    Remove { id: String, path: String },
    Edit { id: String, path: String, cont: String, append: bool },
    Rename { id: String, from: String, to: String },
    Copy { id: String, from: String, to: String },
    Move { id: String, from: String, to: String },
    Find { id: String, base: String, pattern: Option<String>, limit: usize },
    Chown { id: String, path: String, user: String, group: String },
    Chmod { id: String, path: String, perm: Perm },
    Journaling { id: String },
    Recovery { id: String },
    Loss { id: String },
    Rep { id: String, out: PathBuf, kind: String, ruta: Option<String> },
}

/// Parses `-size`/`-unit` into a byte count, rejecting negatives and
/// zero.
fn size_bytes(parsed: &ParsedLine) -> Result<i64, CmdError> {
    let size: i64 = parsed
        .args
        .req("size")?
        .parse()
        .map_err(|_| CmdError::Params)?;
    if size < 0 {
        return Err(CmdError::Negative);
    }
    if size == 0 {
        return Err(CmdError::InvalidSize);
    }
    unit_to_bytes(size, parsed.args.get("unit")).ok_or(CmdError::Params)
}

fn fit_flag(parsed: &ParsedLine) -> Result<Fit, CmdError> {
    match parsed.args.get("fit") {
        None => Ok(Fit::First),
        Some(v) => Fit::from_flag(v).ok_or(CmdError::Params),
    }
}

impl Command {
    /// Builds the typed command from a parsed line.
    pub fn from_parsed(parsed: &ParsedLine) -> Result<Self, CmdError> {
        let args = &parsed.args;
        match parsed.name.as_str() {
            "mkdisk" => Ok(Self::Mkdisk {
                path: PathBuf::from(args.req("path")?),
                size: size_bytes(parsed)?,
                fit: fit_flag(parsed)?,
            }),
            "rmdisk" => Ok(Self::Rmdisk {
                path: PathBuf::from(args.req("path")?),
            }),
            "fdisk" => {
                let path = PathBuf::from(args.req("path")?);
                let name = args.req("name")?.to_owned();
                match args.req("mode")? {
                    "add" => Ok(Self::FdiskAdd {
                        path,
                        name,
                        size: size_bytes(parsed)?,
                        ptype: match args.get("type") {
                            None => PartType::Primary,
                            Some(v) => PartType::from_flag(v).ok_or(CmdError::Params)?,
                        },
                        fit: fit_flag(parsed)?,
                    }),
                    "delete" => Ok(Self::FdiskDelete {
                        path,
                        name,
                        mode: match args.get("delete") {
                            None => DeleteMode::Fast,
                            Some(v) => DeleteMode::from_flag(v).ok_or(CmdError::Params)?,
                        },
                    }),
                    _ => Err(CmdError::Params),
                }
            }
            "mount" => Ok(Self::Mount {
                path: PathBuf::from(args.req("path")?),
                name: args.req("name")?.to_owned(),
            }),
            "unmount" => Ok(Self::Unmount {
                id: args.req("id")?.to_owned(),
            }),
            "mounted" => Ok(Self::Mounted),
            "mkfs" => Ok(Self::Mkfs {
                id: args.req("id")?.to_owned(),
                kind: FsKind::from_flag(args.req("fs")?).ok_or(CmdError::Params)?,
            }),
            "login" => Ok(Self::Login {
                user: args.req("user")?.to_owned(),
                pass: args.req("pass")?.to_owned(),
                id: args.req("id")?.to_owned(),
            }),
            "logout" => Ok(Self::Logout),
            "mkgrp" => Ok(Self::Mkgrp {
                name: args.req("name")?.to_owned(),
            }),
            "rmgrp" => Ok(Self::Rmgrp {
                name: args.req("name")?.to_owned(),
            }),
            "mkusr" => Ok(Self::Mkusr {
                user: args.req("user")?.to_owned(),
                pass: args.req("pass")?.to_owned(),
                grp: args.req("grp")?.to_owned(),
            }),
            "rmusr" => Ok(Self::Rmusr {
                user: args.req("user")?.to_owned(),
            }),
            "chgrp" => Ok(Self::Chgrp {
                user: args.req("user")?.to_owned(),
                grp: args.req("grp")?.to_owned(),
            }),
            "cat" => Ok(Self::Cat {
                file: args.req("file1")?.to_owned(),
            }),
            "mkdir" => Ok(Self::Mkdir {
                id: args.req("id")?.to_owned(),
                path: args.req("path")?.to_owned(),
                deep: args.flag("p"),
            }),
            "mkfile" => {
                let size = args.get_i64("size")?;
                if size.is_some_and(|n| n < 0) {
                    return Err(CmdError::Negative);
                }
                Ok(Self::Mkfile {
                    id: args.req("id")?.to_owned(),
                    path: args.req("path")?.to_owned(),
                    cont: args.get("cont").map(str::to_owned),
                    size,
                })
            }
            "remove" => Ok(Self::Remove {
                id: args.req("id")?.to_owned(),
                path: args.req("path")?.to_owned(),
            }),
            "edit" => Ok(Self::Edit {
                id: args.req("id")?.to_owned(),
                path: args.req("path")?.to_owned(),
                cont: args.req("cont")?.to_owned(),
                append: args.flag("append"),
            }),
            "rename" => Ok(Self::Rename {
                id: args.req("id")?.to_owned(),
                from: args.req("from")?.to_owned(),
                to: args.req("to")?.to_owned(),
            }),
            "copy" => Ok(Self::Copy {
                id: args.req("id")?.to_owned(),
                from: args.req("from")?.to_owned(),
                to: args.req("to")?.to_owned(),
            }),
            "move" => Ok(Self::Move {
                id: args.req("id")?.to_owned(),
                from: args.req("from")?.to_owned(),
                to: args.req("to")?.to_owned(),
            }),
            "find" => {
                let limit = match args.get_i64("limit")? {
                    None => FIND_LIMIT,
                    Some(n) if n > 0 => n as usize,
                    Some(_) => return Err(CmdError::Params),
                };
                Ok(Self::Find {
                    id: args.req("id")?.to_owned(),
                    base: args.get("base").unwrap_or("/").to_owned(),
                    pattern: args.get("name").map(str::to_owned),
                    limit,
                })
            }
            "chown" => Ok(Self::Chown {
                id: args.req("id")?.to_owned(),
                path: args.req("path")?.to_owned(),
                user: args.req("user")?.to_owned(),
                group: args.req("group")?.to_owned(),
            }),
            "chmod" => Ok(Self::Chmod {
                id: args.req("id")?.to_owned(),
                path: args.req("path")?.to_owned(),
                perm: Perm::parse(args.req("perm")?).ok_or(CmdError::Params)?,
            }),
            "journaling" => Ok(Self::Journaling {
                id: args.req("id")?.to_owned(),
            }),
            "recovery" => Ok(Self::Recovery {
                id: args.req("id")?.to_owned(),
            }),
            "loss" => Ok(Self::Loss {
                id: args.req("id")?.to_owned(),
            }),
            "rep" => Ok(Self::Rep {
                id: args.req("id")?.to_owned(),
                out: PathBuf::from(args.req("path")?),
                kind: args.req("name")?.to_owned(),
                ruta: args.get("ruta").map(str::to_owned),
            }),
            other => Err(CmdError::UnknownCommand(other.to_owned())),
        }
    }

    /// Whether the command takes a `-id` flag the session can fill in.
    pub fn supports_id(name: &str) -> bool {
        matches!(
            name,
            "unmount"
                | "mkfs"
                | "mkdir"
                | "mkfile"
                | "remove"
                | "edit"
                | "rename"
                | "copy"
                | "move"
                | "find"
                | "chown"
                | "chmod"
                | "journaling"
                | "recovery"
                | "loss"
                | "rep"
        )
    }

    /// Usage string appended to validation failures.
    pub fn usage(name: &str) -> &'static str {
        match name {
            "mkdisk" => "Uso: mkdisk -path <ruta> -size <n> [-unit b|k|m] [-fit bf|ff|wf]",
            "rmdisk" => "Uso: rmdisk -path <ruta>",
            "fdisk" => {
                "Uso: fdisk -path <ruta> -mode add|delete -name <nombre> [-size <n>] \
                 [-unit b|k|m] [-type p|e|l] [-fit bf|ff|wf] [-delete full|fast]"
            }
            "mount" => "Uso: mount -path <ruta> -name <nombre>",
            "unmount" => "Uso: unmount -id <id>",
            "mounted" => "Uso: mounted",
            "mkfs" => "Uso: mkfs -id <id> -fs 2fs|3fs",
            "login" => "Uso: login -user <usuario> -pass <contraseña> -id <id>",
            "logout" => "Uso: logout",
            "mkgrp" => "Uso: mkgrp -name <nombre>",
            "rmgrp" => "Uso: rmgrp -name <nombre>",
            "mkusr" => "Uso: mkusr -user <usuario> -pass <contraseña> -grp <grupo>",
            "rmusr" => "Uso: rmusr -user <usuario>",
            "chgrp" => "Uso: chgrp -user <usuario> -grp <grupo>",
            "cat" => "Uso: cat -file1 <ruta>",
            "mkdir" => "Uso: mkdir -id <id> -path <ruta> [-p]",
            "mkfile" => "Uso: mkfile -id <id> -path <ruta> [-cont <contenido>] [-size <n>]",
            "remove" => "Uso: remove -id <id> -path <ruta>",
            "edit" => "Uso: edit -id <id> -path <ruta> -cont <contenido> [-append]",
            "rename" => "Uso: rename -id <id> -from <ruta> -to <ruta>",
            "copy" => "Uso: copy -id <id> -from <ruta> -to <ruta>",
            "move" => "Uso: move -id <id> -from <ruta> -to <ruta>",
            "find" => "Uso: find -id <id> [-base <ruta>] [-name <patrón>] [-limit <n>]",
            "chown" => "Uso: chown -id <id> -path <ruta> -user <usuario> -group <grupo>",
            "chmod" => "Uso: chmod -id <id> -path <ruta> -perm <octal>",
            "journaling" => "Uso: journaling -id <id>",
            "recovery" => "Uso: recovery -id <id>",
            "loss" => "Uso: loss -id <id>",
            "rep" => "Uso: rep -id <id> -path <salida> -name <tipo> [-ruta <ruta>]",
            _ => "",
        }
    }
}
