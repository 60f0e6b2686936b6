//! Process manager runtime

use core_types::Pid;
use hal::{FileBlocks, FileStore, ImageLoader};
use kernel_api::{decode_payload, encode_payload, KernelError, ProcReply, ProcRequest, ProcessControl};
use log::{info, warn};
use services_dir::DirectoryService;
use std::collections::HashMap;
use thiserror::Error;

/// Resolves program names to inodes
pub trait NameResolver {
    fn resolve(&mut self, dir_ino: u32, name: &str) -> Option<u32>;
}

impl<F: FileStore> NameResolver for DirectoryService<F> {
    fn resolve(&mut self, dir_ino: u32, name: &str) -> Option<u32> {
        self.lookup(dir_ino, name).ok()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProcessManagerError {
    #[error("Program not found: {0}")]
    ProgramNotFound(String),

    #[error("Process table full")]
    TableFull,

    #[error("Failed to load image for {pid}: {reason}")]
    Load { pid: Pid, reason: String },

    #[error("Kernel error: {0}")]
    Kernel(String),
}

impl From<KernelError> for ProcessManagerError {
    fn from(err: KernelError) -> Self {
        ProcessManagerError::Kernel(err.to_string())
    }
}

/// Process manager over a loader, the file store holding images and a
/// name resolver for the binary directory
pub struct ProcessManager<L, F, R> {
    loader: L,
    files: F,
    resolver: R,
    bin_dir: u32,
    arguments: HashMap<Pid, Vec<String>>,
}

impl<L, F, R> ProcessManager<L, F, R>
where
    L: ImageLoader,
    F: FileStore,
    R: NameResolver,
{
    pub fn new(loader: L, files: F, resolver: R, bin_dir: u32) -> Self {
        Self {
            loader,
            files,
            resolver,
            bin_dir,
            arguments: HashMap::new(),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The resolver, for running it as its own service
    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Arguments a process was spawned with
    pub fn arguments_of(&self, pid: Pid) -> Option<&[String]> {
        self.arguments.get(&pid).map(Vec::as_slice)
    }

    /// Loads a non-killable kernel service from `ino`
    pub fn boot_service<C: ProcessControl>(
        &mut self,
        ctl: &mut C,
        ino: u32,
    ) -> Result<Pid, ProcessManagerError> {
        let pid = self.load(ctl, ino, false)?;
        info!("process manager: booted service {} from inode {}", pid, ino);
        Ok(pid)
    }

    /// Spawns the program `name` from the binary directory
    pub fn spawn<C: ProcessControl>(
        &mut self,
        ctl: &mut C,
        name: &str,
        argv: Vec<String>,
    ) -> Result<Pid, ProcessManagerError> {
        let ino = self
            .resolver
            .resolve(self.bin_dir, name)
            .ok_or_else(|| ProcessManagerError::ProgramNotFound(name.to_string()))?;
        let pid = self.load(ctl, ino, true)?;
        self.arguments.insert(pid, argv);
        info!("process manager: spawned {} as {}", name, pid);
        Ok(pid)
    }

    /// Handles one request from `sender`
    ///
    /// Exit has no reply; the sender no longer exists.
    pub fn handle<C: ProcessControl>(
        &mut self,
        ctl: &mut C,
        sender: Pid,
        request: ProcRequest,
    ) -> Result<Option<ProcReply>, ProcessManagerError> {
        match request {
            ProcRequest::Exit { status } => {
                info!("process manager: {} exited with status {}", sender, status);
                self.arguments.remove(&sender);
                ctl.free(sender)?;
                Ok(None)
            }
            ProcRequest::Spawn { name, argv } => match self.spawn(ctl, &name, argv) {
                Ok(pid) => Ok(Some(ProcReply::Spawned { pid })),
                Err(err) => {
                    warn!("process manager: spawn of {} failed: {}", name, err);
                    Ok(Some(ProcReply::Failed))
                }
            },
        }
    }

    /// Decodes a request payload and encodes the reply, if any
    pub fn handle_payload<C: ProcessControl>(
        &mut self,
        ctl: &mut C,
        sender: Pid,
        payload: &[u8],
    ) -> Result<Option<Vec<u8>>, ProcessManagerError> {
        let request: ProcRequest = decode_payload(payload)?;
        match self.handle(ctl, sender, request)? {
            Some(reply) => Ok(Some(encode_payload(&reply)?)),
            None => Ok(None),
        }
    }

    fn load<C: ProcessControl>(
        &mut self,
        ctl: &mut C,
        ino: u32,
        killable: bool,
    ) -> Result<Pid, ProcessManagerError> {
        let pid = ctl.alloc(killable).ok_or(ProcessManagerError::TableFull)?;
        let mut reader = FileBlocks::new(&mut self.files, ino);
        match self.loader.load_program(pid, &mut reader) {
            Ok(entry) => {
                ctl.set_ready(pid, entry)?;
                Ok(pid)
            }
            Err(err) => {
                ctl.free(pid)?;
                Err(ProcessManagerError::Load {
                    pid,
                    reason: err.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal::RamFileStore;
    use sim_kernel::loader::SimImageLoader;
    use sim_kernel::test_utils::file_store_with_programs;

    const BIN_DIR: u32 = 1;

    /// Process control double recording every call
    #[derive(Default)]
    struct FakeControl {
        next: u32,
        capacity: usize,
        live: Vec<Pid>,
        ready: Vec<(Pid, usize)>,
        killable: Vec<Pid>,
    }

    impl FakeControl {
        fn with_capacity(capacity: usize) -> Self {
            Self {
                next: 5,
                capacity,
                ..Default::default()
            }
        }
    }

    impl ProcessControl for FakeControl {
        fn alloc(&mut self, killable: bool) -> Option<Pid> {
            if self.live.len() == self.capacity {
                return None;
            }
            let pid = Pid::new(self.next);
            self.next += 1;
            self.live.push(pid);
            if killable {
                self.killable.push(pid);
            }
            Some(pid)
        }

        fn free(&mut self, pid: Pid) -> Result<(), KernelError> {
            let idx = self
                .live
                .iter()
                .position(|p| *p == pid)
                .ok_or_else(|| KernelError::NotFound(pid.to_string()))?;
            self.live.remove(idx);
            Ok(())
        }

        fn set_ready(&mut self, pid: Pid, entry: usize) -> Result<(), KernelError> {
            self.ready.push((pid, entry));
            Ok(())
        }
    }

    type Manager = ProcessManager<SimImageLoader, RamFileStore, DirectoryService<RamFileStore>>;

    fn manager() -> Manager {
        let programs = [("shell", 2), ("echo", 7)];
        ProcessManager::new(
            SimImageLoader::new(0x8000_5000),
            file_store_with_programs(BIN_DIR, &programs),
            DirectoryService::new(file_store_with_programs(BIN_DIR, &programs)),
            BIN_DIR,
        )
    }

    #[test]
    fn test_spawn_loads_killable_process() {
        let mut pm = manager();
        let mut ctl = FakeControl::with_capacity(4);

        let pid = pm
            .spawn(&mut ctl, "echo", vec!["hi".to_string()])
            .unwrap();

        assert_eq!(ctl.ready, vec![(pid, 0x8000_5000)]);
        assert_eq!(ctl.killable, vec![pid]);
        assert_eq!(pm.loader().program_of(pid), Some("echo"));
        assert_eq!(pm.arguments_of(pid), Some(&["hi".to_string()][..]));
    }

    #[test]
    fn test_boot_service_is_not_killable() {
        let mut pm = manager();
        let mut ctl = FakeControl::with_capacity(4);

        let pid = pm.boot_service(&mut ctl, 2).unwrap();

        assert!(ctl.killable.is_empty());
        assert_eq!(ctl.ready, vec![(pid, 0x8000_5000)]);
    }

    #[test]
    fn test_unknown_program_replies_failed() {
        let mut pm = manager();
        let mut ctl = FakeControl::with_capacity(4);

        let reply = pm
            .handle(
                &mut ctl,
                Pid::new(9),
                ProcRequest::Spawn {
                    name: "nope".to_string(),
                    argv: Vec::new(),
                },
            )
            .unwrap();

        assert_eq!(reply, Some(ProcReply::Failed));
        assert!(ctl.live.is_empty());
    }

    #[test]
    fn test_full_table() {
        let mut pm = manager();
        let mut ctl = FakeControl::with_capacity(0);
        assert_eq!(
            pm.spawn(&mut ctl, "echo", Vec::new()),
            Err(ProcessManagerError::TableFull)
        );
    }

    #[test]
    fn test_bad_image_releases_slot() {
        let mut files = RamFileStore::new();
        files.insert(3, b"not an image");
        let mut dir_files = RamFileStore::new();
        dir_files.insert(BIN_DIR, b"junk 3 ");
        let mut pm = ProcessManager::new(
            SimImageLoader::new(0),
            files,
            DirectoryService::new(dir_files),
            BIN_DIR,
        );
        let mut ctl = FakeControl::with_capacity(4);

        let err = pm.spawn(&mut ctl, "junk", Vec::new()).unwrap_err();

        assert!(matches!(err, ProcessManagerError::Load { .. }));
        assert!(ctl.live.is_empty());
    }

    #[test]
    fn test_exit_frees_sender() {
        let mut pm = manager();
        let mut ctl = FakeControl::with_capacity(4);
        let pid = pm.spawn(&mut ctl, "echo", Vec::new()).unwrap();

        let reply = pm
            .handle(&mut ctl, pid, ProcRequest::Exit { status: 0 })
            .unwrap();

        assert_eq!(reply, None);
        assert!(ctl.live.is_empty());
        assert_eq!(pm.arguments_of(pid), None);
    }

    #[test]
    fn test_exit_of_unknown_sender_is_error() {
        let mut pm = manager();
        let mut ctl = FakeControl::with_capacity(4);
        assert!(matches!(
            pm.handle(&mut ctl, Pid::new(42), ProcRequest::Exit { status: 1 }),
            Err(ProcessManagerError::Kernel(_))
        ));
    }

    #[test]
    fn test_handle_payload_round_trip() {
        let mut pm = manager();
        let mut ctl = FakeControl::with_capacity(4);
        let request = encode_payload(&ProcRequest::Spawn {
            name: "shell".to_string(),
            argv: Vec::new(),
        })
        .unwrap();

        let reply = pm
            .handle_payload(&mut ctl, Pid::new(4), &request)
            .unwrap()
            .unwrap();
        let reply: ProcReply = decode_payload(&reply).unwrap();

        assert_eq!(reply, ProcReply::Spawned { pid: Pid::new(5) });
    }
}
