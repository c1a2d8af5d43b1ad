//! Host-side fakes for the collaborators the syscall layer talks to.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};

use crate::config::GatewayConfig;
use crate::drivers::{Console, PowerControl};
use crate::fs::{File, FileSystem};
use crate::mm::regions::{USER_END, USER_START};
use crate::mm::{AddressSpace, PageFlags, UserAddr, PAGE_SIZE};
use crate::process::{process_name, Launch, Loader, Process};
use crate::sched::Scheduler;
use crate::syscall::{Gateway, Services, SyscallId};
use crate::trap::{Disposition, TrapFrame};

/// Read-only code page of the standard layout.
pub const CODE_BASE: usize = USER_START;
/// First of the standard layout's read/write data pages.
pub const DATA_BASE: usize = USER_START + 2 * PAGE_SIZE;
/// Data pages in the standard layout.
pub const DATA_PAGES: usize = 4;
/// Top of the user stack; one read/write page sits below it.
pub const STACK_TOP: usize = USER_END;
/// Value placed in `eax` before each trap in the harness.
pub const UNTOUCHED_EAX: u32 = 0xdead_beef;

const FRAME_DEPTH: usize = 64;

struct Page {
    flags: PageFlags,
    data: Box<[u8; PAGE_SIZE]>,
}

/// Sparse user memory. Clones share the same pages.
#[derive(Clone, Default)]
pub struct FakeMemory {
    pages: Arc<Mutex<BTreeMap<usize, Page>>>,
}

impl FakeMemory {
    /// Memory with nothing mapped.
    pub fn new() -> Self {
        Self::default()
    }

    /// One code page, `DATA_PAGES` data pages and one stack page.
    pub fn standard() -> Self {
        let mem = Self::new();
        mem.map(CODE_BASE, PAGE_SIZE, PageFlags::USER_RO);
        mem.map(DATA_BASE, DATA_PAGES * PAGE_SIZE, PageFlags::USER_RW);
        mem.map(STACK_TOP - PAGE_SIZE, PAGE_SIZE, PageFlags::USER_RW);
        mem
    }

    /// Map `[addr, addr + len)` with `flags`, page granular.
    pub fn map(&self, addr: usize, len: usize, flags: PageFlags) {
        let mut pages = self.pages.lock().unwrap();
        let first = addr / PAGE_SIZE;
        let last = (addr + len - 1) / PAGE_SIZE;
        for number in first..=last {
            pages
                .entry(number)
                .or_insert_with(|| Page {
                    flags,
                    data: Box::new([0; PAGE_SIZE]),
                })
                .flags = flags;
        }
    }

    /// Store bytes regardless of permissions. Unmapped pages get backing
    /// storage but stay unmapped.
    pub fn write_bytes(&self, addr: usize, bytes: &[u8]) {
        let mut pages = self.pages.lock().unwrap();
        for (i, &byte) in bytes.iter().enumerate() {
            let at = addr + i;
            let page = pages.entry(at / PAGE_SIZE).or_insert_with(|| Page {
                flags: PageFlags::empty(),
                data: Box::new([0; PAGE_SIZE]),
            });
            page.data[at % PAGE_SIZE] = byte;
        }
    }

    /// Load bytes regardless of permissions; missing pages read as zero.
    pub fn read_bytes(&self, addr: usize, len: usize) -> Vec<u8> {
        let pages = self.pages.lock().unwrap();
        (addr..addr + len)
            .map(|at| pages.get(&(at / PAGE_SIZE)).map_or(0, |p| p.data[at % PAGE_SIZE]))
            .collect()
    }

    /// Store `s` with a NUL terminator and return its address.
    pub fn put_str(&self, addr: usize, s: &str) -> UserAddr {
        self.write_bytes(addr, s.as_bytes());
        self.write_bytes(addr + s.len(), &[0]);
        UserAddr::new(addr)
    }

    /// Lay out a syscall frame on the stack page and return its `esp`.
    pub fn push_frame(&self, words: &[u32]) -> UserAddr {
        let esp = STACK_TOP - FRAME_DEPTH;
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.write_bytes(esp, &bytes);
        UserAddr::new(esp)
    }
}

impl AddressSpace for FakeMemory {
    fn page_flags(&self, page: UserAddr) -> PageFlags {
        let pages = self.pages.lock().unwrap();
        pages
            .get(&page.page_number())
            .map_or(PageFlags::empty(), |p| p.flags)
    }

    fn copy_in(&self, addr: UserAddr, dst: &mut [u8]) {
        let bytes = self.read_bytes(addr.as_usize(), dst.len());
        dst.copy_from_slice(&bytes);
    }

    fn copy_out(&mut self, addr: UserAddr, src: &[u8]) {
        self.write_bytes(addr.as_usize(), src);
    }
}

type Contents = Arc<Mutex<Vec<u8>>>;

/// In-memory flat filesystem. Clones share the same files.
#[derive(Clone, Default)]
pub struct FakeFs {
    files: Arc<Mutex<BTreeMap<String, Contents>>>,
    open: Arc<AtomicUsize>,
}

impl FakeFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(name: &str, contents: &[u8]) -> Self {
        let fs = Self::new();
        fs.insert(name, contents);
        fs
    }

    /// Add or replace a file.
    pub fn insert(&self, name: &str, contents: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(String::from(name), Arc::new(Mutex::new(contents.to_vec())));
    }

    /// Current contents of `name`, empty if it does not exist.
    pub fn contents(&self, name: &str) -> Vec<u8> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .map_or_else(Vec::new, |c| c.lock().unwrap().clone())
    }

    /// Open handles not yet dropped.
    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

impl FileSystem for FakeFs {
    fn create(&self, path: &str, initial_size: u32) -> bool {
        let mut files = self.files.lock().unwrap();
        if path.is_empty() || files.contains_key(path) {
            return false;
        }
        files.insert(
            String::from(path),
            Arc::new(Mutex::new(vec![0; initial_size as usize])),
        );
        true
    }

    fn remove(&self, path: &str) -> bool {
        self.files.lock().unwrap().remove(path).is_some()
    }

    fn open(&self, path: &str) -> Option<Box<dyn File>> {
        let contents = self.files.lock().unwrap().get(path)?.clone();
        self.open.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(FakeFile {
            contents,
            position: 0,
            open: self.open.clone(),
        }))
    }
}

/// Fixed-length file: writes stop at end of file.
struct FakeFile {
    contents: Contents,
    position: u32,
    open: Arc<AtomicUsize>,
}

impl File for FakeFile {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let contents = self.contents.lock().unwrap();
        let start = (self.position as usize).min(contents.len());
        let count = buf.len().min(contents.len() - start);
        buf[..count].copy_from_slice(&contents[start..start + count]);
        self.position += count as u32;
        count
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        let mut contents = self.contents.lock().unwrap();
        let start = (self.position as usize).min(contents.len());
        let count = buf.len().min(contents.len() - start);
        contents[start..start + count].copy_from_slice(&buf[..count]);
        self.position += count as u32;
        count
    }

    fn length(&self) -> u32 {
        self.contents.lock().unwrap().len() as u32
    }

    fn seek(&mut self, position: u32) {
        self.position = position;
    }

    fn tell(&self) -> u32 {
        self.position
    }
}

impl Drop for FakeFile {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Terminal {
    output: Vec<u8>,
    input: VecDeque<u8>,
}

/// Console capturing output and replaying queued keyboard input.
#[derive(Clone, Default)]
pub struct FakeConsole {
    terminal: Arc<Mutex<Terminal>>,
}

impl FakeConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: &[u8]) -> Self {
        let console = Self::new();
        console.push_input(input);
        console
    }

    /// Queue keyboard input.
    pub fn push_input(&self, input: &[u8]) {
        self.terminal.lock().unwrap().input.extend(input.iter().copied());
    }

    /// Everything written so far.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.terminal.lock().unwrap().output).into_owned()
    }
}

impl Console for FakeConsole {
    fn put_bytes(&self, bytes: &[u8]) {
        self.terminal.lock().unwrap().output.extend_from_slice(bytes);
    }

    fn get_byte(&self) -> u8 {
        self.terminal.lock().unwrap().input.pop_front().unwrap_or(0)
    }
}

#[derive(Clone, Default)]
pub struct FakePower {
    off: Arc<AtomicBool>,
}

impl FakePower {
    pub fn is_off(&self) -> bool {
        self.off.load(Ordering::SeqCst)
    }
}

impl PowerControl for FakePower {
    fn power_off(&self) {
        self.off.store(true, Ordering::SeqCst);
    }
}

/// Scheduler for host threads.
pub struct HostScheduler;

impl Scheduler for HostScheduler {
    fn yield_now(&self) {
        thread::yield_now();
    }
}

type Body = Arc<dyn Fn(&Gateway, &mut Process, &FakeMemory) + Send + Sync>;

#[derive(Clone)]
enum Program {
    Runs(Body),
    Broken,
}

type Registry = Arc<Mutex<HashMap<String, Program>>>;
type Threads = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// Loader running each child's program body on its own host thread.
struct ThreadLoader {
    gateway: Weak<Gateway>,
    programs: Registry,
    threads: Threads,
}

impl Loader for ThreadLoader {
    fn spawn(&self, launch: Launch) {
        let name = process_name(launch.command_line());
        let program = match self.programs.lock().unwrap().get(&name).cloned() {
            Some(program) => program,
            None => return,
        };
        let gateway = self.gateway.clone();
        let handle = thread::spawn(move || {
            let memory = FakeMemory::standard();
            let (mut process, load) = launch.into_process(Box::new(memory.clone()));
            match program {
                Program::Broken => load.report(false),
                Program::Runs(body) => {
                    load.report(true);
                    if let Some(gateway) = gateway.upgrade() {
                        body(&gateway, &mut process, &memory);
                    }
                }
            }
        });
        self.threads.lock().unwrap().push(handle);
    }
}

/// A gateway wired to fakes, with a registry of runnable programs.
pub struct Harness {
    pub gateway: Arc<Gateway>,
    pub console: FakeConsole,
    pub fs: FakeFs,
    pub power: FakePower,
    programs: Registry,
    threads: Threads,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(GatewayConfig::default())
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        let console = FakeConsole::new();
        let fs = FakeFs::new();
        let power = FakePower::default();
        let programs = Registry::default();
        let threads = Threads::default();

        let gateway = Arc::new_cyclic(|weak| {
            Gateway::new(
                Services {
                    fs: Box::new(fs.clone()),
                    console: Box::new(console.clone()),
                    loader: Box::new(ThreadLoader {
                        gateway: weak.clone(),
                        programs: programs.clone(),
                        threads: threads.clone(),
                    }),
                    power: Box::new(power.clone()),
                    scheduler: Box::new(HostScheduler),
                },
                config,
            )
        });

        Self {
            gateway,
            console,
            fs,
            power,
            programs,
            threads,
        }
    }

    /// Register a program that `exec` can start.
    pub fn program<F>(&self, name: &str, body: F)
    where
        F: Fn(&Gateway, &mut Process, &FakeMemory) + Send + Sync + 'static,
    {
        self.programs
            .lock()
            .unwrap()
            .insert(String::from(name), Program::Runs(Arc::new(body)));
    }

    /// Register a program whose image fails to load.
    pub fn broken_program(&self, name: &str) {
        self.programs
            .lock()
            .unwrap()
            .insert(String::from(name), Program::Broken);
    }

    /// The initial process `init` and its memory.
    pub fn initial(&self) -> (Process, FakeMemory) {
        let memory = FakeMemory::standard();
        let process = self.gateway.create_initial("init", Box::new(memory.clone()));
        (process, memory)
    }

    /// Trap into the gateway with `id` and `args` on the stack of `memory`.
    pub fn syscall(&self, process: &mut Process, memory: &FakeMemory, id: SyscallId, args: &[u32]) -> (Disposition, u32) {
        let mut words = vec![id as u32];
        words.extend_from_slice(args);
        let esp = memory.push_frame(&words);
        let mut frame = TrapFrame::new(esp.as_usize());
        frame.eax = UNTOUCHED_EAX;
        let disposition = self.gateway.handle_trap(process, &mut frame);
        (disposition, frame.eax)
    }

    /// Wait for every child thread started so far, including grandchildren.
    pub fn join_children(&self) {
        loop {
            let handle = self.threads.lock().unwrap().pop();
            match handle {
                Some(handle) => handle.join().unwrap(),
                None => break,
            }
        }
    }
}
