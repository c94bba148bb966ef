//! The dispatcher: connects the parsed commands to the partitioner, the
//! two filesystems, the mount index and the session.

use crate::handlers::Command;
use crate::locks::LockTable;
use crate::mount_index::MountIndex;
use crate::parser;
use crate::reports::{NullReports, Reports};
use crate::session::SessionManager;
use crate::types::RunOutcome;
use crate::CmdError;
use chrono::DateTime;
use disk::{DiskManager, PartitionRef};
use log::error;
use std::time::Instant;
use utils::util::ByteSize;
use vfs::{Filesystem, Fs2, Fs3, FsKind, JournalEntry, OpCtx};

/// Holds every service a command may touch. One instance is shared by
/// all requests; per-partition mutexes serialise disk mutations.
pub struct Adapter {
    pub dm: DiskManager,
    fs2: Fs2,
    fs3: Fs3,
    pub index: MountIndex,
    pub session: SessionManager,
    locks: LockTable,
    reports: Box<dyn Reports>,
}

impl Default for Adapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter {
    pub fn new() -> Self {
        Self {
            dm: DiskManager::new(),
            fs2: Fs2::new(),
            fs3: Fs3::default(),
            index: MountIndex::new(),
            session: SessionManager::new(),
            locks: LockTable::new(),
            reports: Box::new(NullReports),
        }
    }

    /// Replaces the report collaborator.
    pub fn with_reports(mut self, reports: Box<dyn Reports>) -> Self {
        self.reports = reports;
        self
    }

    /// Parses, injects the session mount id, validates and executes one
    /// line.
    pub fn run(&self, line: &str, deadline: Option<Instant>) -> Result<String, CmdError> {
        let mut parsed = parser::parse_line(line)?;
        if let Some(session) = self.session.current() {
            if Command::supports_id(&parsed.name) {
                parsed.args.inject("id", &session.mount_id);
            }
        }
        let cmd = Command::from_parsed(&parsed)?;
        self.execute(cmd, deadline)
    }

    /// Like [`run`], formatted as a response payload: validation
    /// failures carry the command's usage string.
    pub fn run_outcome(&self, line: &str) -> RunOutcome {
        let name = parser::parse_line(line)
            .map(|p| p.name)
            .unwrap_or_default();
        match self.run(line, None) {
            Ok(output) => RunOutcome {
                ok: true,
                input: line.to_owned(),
                output,
                error: None,
                command: Some(name),
            },
            Err(err) => {
                error!("comando fallido '{}': {}", line, err);
                let usage = Command::usage(&name);
                let message = if matches!(
                    err,
                    CmdError::Params | CmdError::Negative | CmdError::InvalidSize
                ) && !usage.is_empty()
                {
                    format!("{}\n\n{}", err, usage)
                } else {
                    err.to_string()
                };
                RunOutcome {
                    ok: false,
                    input: line.to_owned(),
                    output: String::new(),
                    error: Some(message),
                    command: Some(name),
                }
            }
        }
    }

    fn resolve(&self, id: &str) -> Result<PartitionRef, CmdError> {
        self.index.get(id).ok_or(CmdError::IdNotFound)
    }

    fn fs_by_kind(&self, kind: FsKind) -> &dyn Filesystem {
        match kind {
            FsKind::Fs2 => &self.fs2,
            FsKind::Fs3 => &self.fs3,
        }
    }

    /// The filesystem of a mounted partition: the kind recorded at
    /// `mkfs` time, or the one in the superblock for partitions
    /// formatted in a previous run.
    fn fs_for(&self, id: &str, r: &PartitionRef) -> Result<&dyn Filesystem, CmdError> {
        let kind = match self.index.kind(id) {
            Some(kind) => kind,
            None => vfs::probe_kind(&self.dm, r)?,
        };
        Ok(self.fs_by_kind(kind))
    }

    /// Credentials of the active session; root when nobody is logged in.
    fn op_ctx(&self, deadline: Option<Instant>) -> OpCtx {
        let mut ctx = match self.session.current() {
            Some(session) => OpCtx::new(session.creds),
            None => OpCtx::root(),
        };
        ctx.deadline = deadline;
        ctx
    }

    /// Runs `f` against the filesystem of mount `id`, holding the
    /// partition's mutex for the whole operation.
    fn fs_op<T>(
        &self,
        id: &str,
        deadline: Option<Instant>,
        f: impl FnOnce(&dyn Filesystem, &PartitionRef, &OpCtx) -> Result<T, vfs::FsError>,
    ) -> Result<T, CmdError> {
        let r = self.resolve(id)?;
        let fs = self.fs_for(id, &r)?;
        let ctx = self.op_ctx(deadline);
        let lock = self.locks.for_partition(&r);
        let _guard = lock.lock().unwrap();
        Ok(f(fs, &r, &ctx)?)
    }

    /// Same, against the active session's mount (user/group commands and
    /// `cat` carry no `-id` flag).
    fn session_op<T>(
        &self,
        deadline: Option<Instant>,
        f: impl FnOnce(&dyn Filesystem, &PartitionRef, &OpCtx) -> Result<T, vfs::FsError>,
    ) -> Result<T, CmdError> {
        let session = self.session.current().ok_or(CmdError::NoSession)?;
        self.fs_op(&session.mount_id, deadline, f)
    }

    fn execute(&self, cmd: Command, deadline: Option<Instant>) -> Result<String, CmdError> {
        match cmd {
            Command::Mkdisk { path, size, fit } => {
                self.dm.mkdisk(&path, size, fit)?;
                Ok(format!(
                    "Disco creado: {} ({})",
                    path.display(),
                    ByteSize(size as u64)
                ))
            }
            Command::Rmdisk { path } => {
                self.dm.rmdisk(&path)?;
                Ok(format!("Disco eliminado: {}", path.display()))
            }
            Command::FdiskAdd {
                path,
                name,
                size,
                ptype,
                fit,
            } => {
                self.dm.fdisk_add(&path, &name, size, ptype, fit)?;
                Ok(format!("Partición creada: {}", name))
            }
            Command::FdiskDelete { path, name, mode } => {
                self.dm.fdisk_delete(&path, &name, mode)?;
                Ok(format!("Partición eliminada: {}", name))
            }
            Command::Mount { path, name } => {
                let r = self.dm.mount(&path, &name)?;
                let id = self.index.put(r.clone());
                // A formatted partition gets its mount stamped; an
                // unformatted one is mountable all the same.
                let _ = vfs::stamp_mount(&self.dm, &r);
                Ok(format!(
                    "Partición montada: {} -> {} '{}'",
                    id,
                    path.display(),
                    name
                ))
            }
            Command::Unmount { id } => {
                let r = self.resolve(&id)?;
                self.dm.unmount(&r)?;
                self.index.del(&id);
                Ok(format!("Partición desmontada: {}", id))
            }
            Command::Mounted => {
                let mounts = self.index.list();
                if mounts.is_empty() {
                    return Ok("No hay particiones montadas".to_owned());
                }
                Ok(mounts
                    .into_iter()
                    .map(|(id, r)| format!("{}  {}  {}", id, r.disk_path.display(), r.name))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Command::Mkfs { id, kind } => {
                let r = self.resolve(&id)?;
                let lock = self.locks.for_partition(&r);
                let _guard = lock.lock().unwrap();
                self.fs_by_kind(kind).mkfs(&self.dm, &r)?;
                self.index.set_kind(&id, kind);
                Ok(format!("Partición {} formateada como {}", id, kind))
            }
            Command::Login { user, pass, id } => {
                let r = self.resolve(&id)?;
                let lock = self.locks.for_partition(&r);
                let creds = {
                    let _guard = lock.lock().unwrap();
                    vfs::authenticate(&self.dm, &r, &user, &pass)?
                };
                self.session.login(creds, &id)?;
                Ok(format!("Bienvenido {}", user))
            }
            Command::Logout => {
                self.session.logout()?;
                Ok("Sesión cerrada".to_owned())
            }
            Command::Mkgrp { name } => {
                self.session_op(deadline, |fs, r, ctx| {
                    fs.add_group(&self.dm, r, ctx, &name)
                })?;
                Ok(format!("Grupo creado: {}", name))
            }
            Command::Rmgrp { name } => {
                self.session_op(deadline, |fs, r, ctx| {
                    fs.remove_group(&self.dm, r, ctx, &name)
                })?;
                Ok(format!("Grupo eliminado: {}", name))
            }
            Command::Mkusr { user, pass, grp } => {
                self.session_op(deadline, |fs, r, ctx| {
                    fs.add_user(&self.dm, r, ctx, &user, &pass, &grp)
                })?;
                Ok(format!("Usuario creado: {}", user))
            }
            Command::Rmusr { user } => {
                self.session_op(deadline, |fs, r, ctx| {
                    fs.remove_user(&self.dm, r, ctx, &user)
                })?;
                Ok(format!("Usuario eliminado: {}", user))
            }
            Command::Chgrp { user, grp } => {
                self.session_op(deadline, |fs, r, ctx| {
                    fs.change_user_group(&self.dm, r, ctx, &user, &grp)
                })?;
                Ok(format!("Usuario {} ahora en el grupo {}", user, grp))
            }
            Command::Cat { file } => {
                let content = self.session_op(deadline, |fs, r, ctx| {
                    fs.read_file(&self.dm, r, ctx, &file)
                })?;
                Ok(String::from_utf8_lossy(&content).into_owned())
            }
            Command::Mkdir { id, path, deep } => {
                self.fs_op(&id, deadline, |fs, r, ctx| {
                    fs.mkdir(&self.dm, r, ctx, &path, deep)
                })?;
                Ok(format!("Directorio creado: {}", path))
            }
            Command::Mkfile {
                id,
                path,
                cont,
                size,
            } => {
                self.fs_op(&id, deadline, |fs, r, ctx| {
                    fs.mkfile(&self.dm, r, ctx, &path, cont.as_deref().map(str::as_bytes), size)
                })?;
                Ok(format!("Archivo creado: {}", path))
            }
            Command::Remove { id, path } => {
                self.fs_op(&id, deadline, |fs, r, ctx| {
                    fs.remove(&self.dm, r, ctx, &path)
                })?;
                Ok(format!("Eliminado: {}", path))
            }
            Command::Edit {
                id,
                path,
                cont,
                append,
            } => {
                self.fs_op(&id, deadline, |fs, r, ctx| {
                    fs.write_file(&self.dm, r, ctx, &path, cont.as_bytes(), append)
                })?;
                Ok(format!("Archivo editado: {}", path))
            }
            Command::Rename { id, from, to } => {
                self.fs_op(&id, deadline, |fs, r, ctx| {
                    fs.rename(&self.dm, r, ctx, &from, &to)
                })?;
                Ok(format!("Renombrado: {} -> {}", from, to))
            }
            Command::Copy { id, from, to } => {
                self.fs_op(&id, deadline, |fs, r, ctx| {
                    fs.copy(&self.dm, r, ctx, &from, &to)
                })?;
                Ok(format!("Copiado: {} -> {}", from, to))
            }
            Command::Move { id, from, to } => {
                self.fs_op(&id, deadline, |fs, r, ctx| {
                    fs.mv(&self.dm, r, ctx, &from, &to)
                })?;
                Ok(format!("Movido: {} -> {}", from, to))
            }
            Command::Find {
                id,
                base,
                pattern,
                limit,
            } => {
                let results = self.fs_op(&id, deadline, |fs, r, ctx| {
                    fs.find(&self.dm, r, ctx, &base, pattern.as_deref(), limit)
                })?;
                if results.is_empty() {
                    Ok("Sin resultados".to_owned())
                } else {
                    Ok(results.join("\n"))
                }
            }
            Command::Chown {
                id,
                path,
                user,
                group,
            } => {
                self.fs_op(&id, deadline, |fs, r, ctx| {
                    fs.chown(&self.dm, r, ctx, &path, &user, &group)
                })?;
                Ok(format!("Propietario de {} ahora {}:{}", path, user, group))
            }
            Command::Chmod { id, path, perm } => {
                self.fs_op(&id, deadline, |fs, r, ctx| {
                    fs.chmod(&self.dm, r, ctx, &path, perm)
                })?;
                Ok(format!("Permisos de {} ahora {}", path, perm))
            }
            Command::Journaling { id } => {
                let entries = self.fs_op(&id, deadline, |fs, r, _| fs.journaling(&self.dm, r))?;
                Ok(format_journal(&entries))
            }
            Command::Recovery { id } => {
                self.fs_op(&id, deadline, |fs, r, _| fs.recovery(&self.dm, r))?;
                Ok(format!("Recovery completado en {}", id))
            }
            Command::Loss { id } => {
                self.fs_op(&id, deadline, |fs, r, _| fs.loss(&self.dm, r))?;
                Ok(format!("Pérdida simulada en {}", id))
            }
            Command::Rep {
                id,
                out,
                kind,
                ruta,
            } => {
                let r = self.resolve(&id)?;
                let lock = self.locks.for_partition(&r);
                let _guard = lock.lock().unwrap();
                self.reports
                    .generate(&self.dm, &r, &kind, &out, ruta.as_deref())
            }
        }
    }
}

fn format_journal(entries: &[JournalEntry]) -> String {
    if entries.is_empty() {
        return "Journal vacío".to_owned();
    }
    let mut out = String::new();
    for (i, e) in entries.iter().enumerate() {
        let when = DateTime::from_timestamp(e.timestamp, 0)
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| e.timestamp.to_string());
        out.push_str(&format!(
            "{:>2}  {:<10} {:<24} {:<8} {}\n",
            i + 1,
            e.op_str(),
            e.path_str(),
            e.aux_str(),
            when
        ));
    }
    out.pop();
    out
}
