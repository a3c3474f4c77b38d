//! In-memory device backend for tests
//!
//! Each opened handle owns one end of a socket pair so the scheduler can
//! poll it like a real event node. Pushing events writes a wake byte to
//! the other end; unplugging drops it, which the handle sees as a hangup.

use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Read, Write};
use std::os::unix::io::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::device::{DeviceOpener, EventSource, OpenedDevice, RawEvent};

struct MockNode {
    name: String,
    present: bool,
    hardware_repeat: bool,
    refuse_grab: bool,
    pending: VecDeque<RawEvent>,
    peer: Option<UnixStream>,
}

#[derive(Default)]
struct MockState {
    nodes: BTreeMap<PathBuf, MockNode>,
    opens: usize,
}

#[derive(Clone, Default)]
pub struct MockOpener {
    state: Rc<RefCell<MockState>>,
}

impl MockOpener {
    pub fn plug(&self, path: &str, name: &str) {
        self.insert(path, name, false, false);
    }

    pub fn plug_with_hardware_repeat(&self, path: &str, name: &str) {
        self.insert(path, name, true, false);
    }

    /// A node already grabbed by someone else
    pub fn plug_refusing_grab(&self, path: &str, name: &str) {
        self.insert(path, name, false, true);
    }

    pub fn unplug(&self, path: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(node) = state.nodes.get_mut(Path::new(path)) {
            node.present = false;
            node.peer = None;
        }
    }

    /// Queue events for an open handle and mark it readable
    pub fn push_events(&self, path: &str, events: &[RawEvent]) {
        let mut state = self.state.borrow_mut();
        let node = state
            .nodes
            .get_mut(Path::new(path))
            .expect("unknown mock device");
        node.pending.extend(events.iter().copied());
        if let Some(peer) = node.peer.as_mut() {
            peer.write_all(&[1]).expect("wake mock device");
        }
    }

    /// Number of successful opens so far
    pub fn opens(&self) -> usize {
        self.state.borrow().opens
    }

    fn insert(&self, path: &str, name: &str, hardware_repeat: bool, refuse_grab: bool) {
        self.state.borrow_mut().nodes.insert(
            PathBuf::from(path),
            MockNode {
                name: name.to_string(),
                present: true,
                hardware_repeat,
                refuse_grab,
                pending: VecDeque::new(),
                peer: None,
            },
        );
    }
}

pub struct MockHandle {
    path: PathBuf,
    stream: UnixStream,
    state: Rc<RefCell<MockState>>,
}

impl AsFd for MockHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

impl EventSource for MockHandle {
    fn read_events(&mut self) -> io::Result<Vec<RawEvent>> {
        let mut state = self.state.borrow_mut();
        let node = match state.nodes.get_mut(&self.path) {
            Some(node) if node.present => node,
            _ => return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")),
        };

        let mut wake = [0u8; 64];
        loop {
            match self.stream.read(&mut wake) {
                Ok(0) => return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "unplugged")),
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(node.pending.drain(..).collect())
    }
}

impl DeviceOpener for MockOpener {
    type Handle = MockHandle;

    fn open(&self, path: &Path, grab: bool) -> Result<OpenedDevice<MockHandle>> {
        let mut state = self.state.borrow_mut();
        let node = match state.nodes.get_mut(path) {
            Some(node) if node.present => node,
            _ => return Err(anyhow!("Could not open {}", path.display())),
        };
        if grab && node.refuse_grab {
            return Err(anyhow!("Failed to grab {}: Device or resource busy", path.display()));
        }

        let (stream, peer) = UnixStream::pair()?;
        stream.set_nonblocking(true)?;
        node.peer = Some(peer);
        node.pending.clear();
        let hardware_repeat = node.hardware_repeat;
        state.opens += 1;

        Ok(OpenedDevice {
            handle: MockHandle {
                path: path.to_path_buf(),
                stream,
                state: Rc::clone(&self.state),
            },
            hardware_repeat,
        })
    }

    fn scan(&self) -> Vec<(PathBuf, String)> {
        self.state
            .borrow()
            .nodes
            .iter()
            .filter(|(_, node)| node.present)
            .map(|(path, node)| (path.clone(), node.name.clone()))
            .collect()
    }
}
