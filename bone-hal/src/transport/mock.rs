//! In-memory doubles for the sysfs tree and I2C adapters.
//!
//! [`MockSysfs`] behaves like the kernel where the drivers can observe it:
//! writing a number to a registered `export` attribute creates the child
//! directory with its attributes (or fails with `EBUSY` if it exists),
//! `unexport` removes it (or fails if it does not), and reading an
//! attribute returns its value terminated by a newline. Every write is
//! recorded so tests can assert on the exact bytes a driver sent.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::i2c_dev::I2cTransport;
use super::sysfs::{Access, Attribute, SysfsBackend, SysfsPaths};

/// Shared in-memory sysfs tree.
///
/// Clones share the same tree, so a test keeps one clone for inspection
/// while the driver owns another.
#[derive(Debug, Clone, Default)]
pub struct MockSysfs {
    tree: Arc<Mutex<Tree>>,
}

#[derive(Debug, Default)]
struct Tree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    /// Resource directories owned by a kernel driver; export fails with `EBUSY`
    held: BTreeSet<PathBuf>,
    controllers: BTreeMap<PathBuf, Controller>,
    writes: Vec<(PathBuf, Vec<u8>)>,
}

/// Behaviour attached to an `export` or `unexport` attribute.
#[derive(Debug, Clone)]
struct Controller {
    action: Action,
    prefix: &'static str,
    attrs: &'static [(&'static str, &'static str)],
    /// errno returned when unexporting something that is not exported
    absent_errno: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Export,
    Unexport,
}

const GPIO_ATTRS: &[(&str, &str)] = &[("direction", "in"), ("value", "0")];
const PWM_ATTRS: &[(&str, &str)] = &[("period", "0"), ("duty_cycle", "0"), ("enable", "0")];

impl MockSysfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `/sys/class/gpio/{export,unexport}` with kernel semantics.
    pub fn add_gpio_controller(&self, paths: &SysfsPaths) {
        self.add_controller(
            &paths.gpio_export(),
            &paths.gpio_unexport(),
            "gpio",
            GPIO_ATTRS,
            libc::EINVAL,
        );
    }

    /// Create `pwmchip{chip}/{export,unexport}` with kernel semantics.
    pub fn add_pwm_chip(&self, paths: &SysfsPaths, chip: u32) {
        self.add_controller(
            &paths.pwm_export(chip),
            &paths.pwm_unexport(chip),
            "pwm",
            PWM_ATTRS,
            libc::ENODEV,
        );
    }

    /// Treat the resource at `dir` as claimed by a kernel driver, so that
    /// exporting it fails with `EBUSY` and no directory appears.
    pub fn hold_by_driver(&self, dir: impl AsRef<Path>) {
        self.lock().held.insert(dir.as_ref().to_path_buf());
    }

    /// Create (or overwrite) an attribute file, along with its parents.
    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let mut tree = self.lock();
        tree.insert_file(path.as_ref(), content.as_bytes());
    }

    /// Change an attribute's value from the "kernel" side, without
    /// recording a write. Used to simulate input levels or ADC samples.
    pub fn set_content(&self, path: impl AsRef<Path>, content: &str) {
        self.add_file(path, content);
    }

    /// Current value of an attribute as a reader would see it.
    pub fn content(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock()
            .files
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Every write made through this tree, in order.
    pub fn writes(&self) -> Vec<(PathBuf, String)> {
        self.lock()
            .writes
            .iter()
            .map(|(path, data)| (path.clone(), String::from_utf8_lossy(data).into_owned()))
            .collect()
    }

    /// The values written to one attribute, in order.
    pub fn writes_to(&self, path: impl AsRef<Path>) -> Vec<String> {
        let path = path.as_ref();
        self.writes()
            .into_iter()
            .filter(|(p, _)| p == path)
            .map(|(_, data)| data)
            .collect()
    }

    fn add_controller(
        &self,
        export: &Path,
        unexport: &Path,
        prefix: &'static str,
        attrs: &'static [(&'static str, &'static str)],
        absent_errno: i32,
    ) {
        let mut tree = self.lock();
        for (path, action) in [(export, Action::Export), (unexport, Action::Unexport)] {
            tree.insert_file(path, b"");
            tree.controllers.insert(
                path.to_path_buf(),
                Controller {
                    action,
                    prefix,
                    attrs,
                    absent_errno,
                },
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        lock(&self.tree)
    }
}

fn lock(tree: &Mutex<Tree>) -> MutexGuard<'_, Tree> {
    // A panicking test must not cascade into every other user of the tree
    tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Tree {
    fn insert_file(&mut self, path: &Path, content: &[u8]) {
        let mut parent = path.parent();
        while let Some(dir) = parent {
            self.dirs.insert(dir.to_path_buf());
            parent = dir.parent();
        }
        self.files.insert(path.to_path_buf(), normalize(content));
    }

    fn store(&mut self, path: &Path, data: &[u8]) -> io::Result<()> {
        if !self.files.contains_key(path) {
            // The attribute vanished under an open descriptor
            return Err(io::Error::from_raw_os_error(libc::ENODEV));
        }
        self.writes.push((path.to_path_buf(), data.to_vec()));

        match self.controllers.get(path).cloned() {
            Some(controller) => self.control(path, &controller, data),
            None => {
                self.files.insert(path.to_path_buf(), normalize(data));
                Ok(())
            }
        }
    }

    fn control(&mut self, path: &Path, controller: &Controller, data: &[u8]) -> io::Result<()> {
        let id: u32 = std::str::from_utf8(data)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;
        let parent = path.parent().unwrap_or(Path::new("/"));
        let child = parent.join(format!("{}{}", controller.prefix, id));

        match controller.action {
            Action::Export => {
                if self.dirs.contains(&child) || self.held.contains(&child) {
                    return Err(io::Error::from_raw_os_error(libc::EBUSY));
                }
                self.dirs.insert(child.clone());
                for (name, value) in controller.attrs {
                    self.files.insert(child.join(name), normalize(value.as_bytes()));
                }
            }
            Action::Unexport => {
                if !self.dirs.remove(&child) {
                    return Err(io::Error::from_raw_os_error(controller.absent_errno));
                }
                self.files.retain(|p, _| !p.starts_with(&child));
                self.dirs.retain(|p| !p.starts_with(&child));
            }
        }
        Ok(())
    }
}

/// Attribute reads always end in exactly one newline.
fn normalize(content: &[u8]) -> Vec<u8> {
    if content.is_empty() {
        return Vec::new();
    }
    let mut out = content.strip_suffix(b"\n").unwrap_or(content).to_vec();
    out.push(b'\n');
    out
}

impl SysfsBackend for MockSysfs {
    type Attr = MockAttr;

    fn open(&self, path: &Path, access: Access) -> io::Result<MockAttr> {
        if !self.lock().files.contains_key(path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        Ok(MockAttr {
            tree: Arc::clone(&self.tree),
            path: path.to_path_buf(),
            access,
        })
    }

    fn exists(&self, path: &Path) -> bool {
        let tree = self.lock();
        tree.files.contains_key(path) || tree.dirs.contains(path)
    }
}

/// Open attribute handle on a [`MockSysfs`] tree.
#[derive(Debug)]
pub struct MockAttr {
    tree: Arc<Mutex<Tree>>,
    path: PathBuf,
    access: Access,
}

impl Attribute for MockAttr {
    fn store(&mut self, data: &[u8]) -> io::Result<()> {
        if self.access == Access::Read {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }
        lock(&self.tree).store(&self.path, data)
    }

    fn show(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.access == Access::Write {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }
        let tree = lock(&self.tree);
        let content = tree
            .files
            .get(&self.path)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENODEV))?;
        let n = content.len().min(buf.len());
        buf[..n].copy_from_slice(&content[..n]);
        Ok(n)
    }
}

/// One operation seen by a [`MockI2c`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I2cOp {
    SetSlaveAddress(u16),
    Write(Vec<u8>),
    Read(usize),
}

/// Recording I2C adapter.
///
/// Addresses above the 7-bit range are rejected with `EINVAL`, as i2c-dev
/// does without ten-bit mode, and addresses claimed by a kernel driver with
/// `EBUSY`.
#[derive(Debug, Default)]
pub struct MockI2c {
    ops: Vec<I2cOp>,
    rx: VecDeque<u8>,
    max_transfer: Option<usize>,
    busy: BTreeSet<u16>,
}

impl MockI2c {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes the slave will return on subsequent reads.
    pub fn queue_read(&mut self, data: &[u8]) {
        self.rx.extend(data);
    }

    /// Cap the bytes moved per transfer, to exercise partial transfers.
    pub fn limit_transfer(&mut self, max: usize) {
        self.max_transfer = Some(max);
    }

    /// Treat `address` as bound to a kernel driver.
    pub fn claim_address(&mut self, address: u16) {
        self.busy.insert(address);
    }

    /// Operations seen so far, in order.
    pub fn ops(&self) -> &[I2cOp] {
        &self.ops
    }

    fn cap(&self, len: usize) -> usize {
        self.max_transfer.map_or(len, |max| len.min(max))
    }
}

impl I2cTransport for MockI2c {
    fn set_slave_address(&mut self, address: u16) -> io::Result<()> {
        if address > 0x7f {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        if self.busy.contains(&address) {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        self.ops.push(I2cOp::SetSlaveAddress(address));
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = self.cap(data.len());
        self.ops.push(I2cOp::Write(data[..n].to_vec()));
        Ok(n)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.cap(buf.len()).min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        self.ops.push(I2cOp::Read(n));
        Ok(n)
    }
}
