//! In-memory device backing every mount in the compatibility layer.

use crate::device::{Device, NodeId, NodeKind, NodeStat};
use crate::error::{IoError, IoResult};
use crate::path::{self, names_match};
use log::trace;

const ROOT: NodeId = 0;

/// Largest file a memory device will grow to through writes or truncation.
pub const MAX_FILE_LEN: u64 = 256 << 20;

#[derive(Debug)]
enum Body {
    Dir(Vec<NodeId>),
    File(Vec<u8>),
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    body: Body,
    holds: u32,
}

/// Arena-backed directory tree with case-insensitive lookup.
///
/// Names keep the spelling used when they were created. Nodes are stored in
/// a slot vector; removed slots are recycled once no descriptor holds them.
#[derive(Debug)]
pub struct MemDevice {
    name: String,
    read_only: bool,
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
}

impl MemDevice {
    /// Creates an empty writable device.
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), false)
    }

    /// Creates an empty read-only device; populate it with the `seed_*` helpers.
    pub fn read_only(name: impl Into<String>) -> Self {
        Self::build(name.into(), true)
    }

    fn build(name: String, read_only: bool) -> Self {
        let root = Node {
            name: String::new(),
            parent: None,
            body: Body::Dir(Vec::new()),
            holds: 0,
        };
        Self {
            name,
            read_only,
            nodes: vec![Some(root)],
            free: Vec::new(),
        }
    }

    /// Creates `path` and any missing parents, ignoring the read-only flag.
    pub fn seed_dir(&mut self, path: &str) -> IoResult<NodeId> {
        let components = path::normalize(&[], path);
        let mut current = ROOT;
        for (depth, name) in components.iter().enumerate() {
            current = match self.child(current, name)? {
                Some(id) => {
                    if !matches!(self.node(id)?.body, Body::Dir(_)) {
                        return Err(IoError::NotADirectory(self.display(&components[..=depth])));
                    }
                    id
                }
                None => self.insert(current, name.clone(), Body::Dir(Vec::new()))?,
            };
        }
        Ok(current)
    }

    /// Creates or replaces the file at `path`, ignoring the read-only flag.
    pub fn seed_file(&mut self, path: &str, bytes: &[u8]) -> IoResult<NodeId> {
        let mut components = path::normalize(&[], path);
        let name = components
            .pop()
            .ok_or(IoError::InvalidArgument("seed path names no file"))?;
        let parent_path = components.join("/");
        let parent = self.seed_dir(&parent_path)?;
        let id = match self.child(parent, &name)? {
            Some(id) => id,
            None => self.insert(parent, name, Body::File(Vec::new()))?,
        };
        let shown = format!("{}:/{path}", self.name);
        match &mut self.node_mut(id)?.body {
            Body::File(data) => {
                data.clear();
                data.extend_from_slice(bytes);
                Ok(id)
            }
            Body::Dir(_) => Err(IoError::IsADirectory(shown)),
        }
    }

    fn display(&self, components: &[String]) -> String {
        path::display(&self.name, components)
    }

    fn node(&self, id: NodeId) -> IoResult<&Node> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or_else(|| IoError::NotFound(format!("{}:#{id}", self.name)))
    }

    fn node_mut(&mut self, id: NodeId) -> IoResult<&mut Node> {
        let name = &self.name;
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or_else(|| IoError::NotFound(format!("{name}:#{id}")))
    }

    fn child(&self, dir: NodeId, name: &str) -> IoResult<Option<NodeId>> {
        let Body::Dir(children) = &self.node(dir)?.body else {
            return Ok(None);
        };
        for &id in children {
            if names_match(&self.node(id)?.name, name) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    fn walk(&self, components: &[String]) -> IoResult<NodeId> {
        let mut current = ROOT;
        for (depth, name) in components.iter().enumerate() {
            if !matches!(self.node(current)?.body, Body::Dir(_)) {
                return Err(IoError::NotADirectory(self.display(&components[..depth])));
            }
            current = self
                .child(current, name)?
                .ok_or_else(|| IoError::NotFound(self.display(&components[..=depth])))?;
        }
        Ok(current)
    }

    /// Resolves the directory that would contain `components`.
    fn parent_dir(&self, components: &[String]) -> IoResult<NodeId> {
        let parent = &components[..components.len().saturating_sub(1)];
        let id = self.walk(parent)?;
        match self.node(id)?.body {
            Body::Dir(_) => Ok(id),
            Body::File(_) => Err(IoError::NotADirectory(self.display(parent))),
        }
    }

    fn insert(&mut self, parent: NodeId, name: String, body: Body) -> IoResult<NodeId> {
        if !matches!(self.node(parent)?.body, Body::Dir(_)) {
            return Err(IoError::NotADirectory(format!("{}:#{parent}", self.name)));
        }
        let node = Node {
            name,
            parent: Some(parent),
            body,
            holds: 0,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        if let Body::Dir(children) = &mut self.node_mut(parent)?.body {
            children.push(id);
        }
        Ok(id)
    }

    fn unlink(&mut self, id: NodeId) -> IoResult<()> {
        let parent = self.node_mut(id)?.parent.take();
        if let Some(parent) = parent {
            if let Body::Dir(children) = &mut self.node_mut(parent)?.body {
                children.retain(|&child| child != id);
            }
        }
        Ok(())
    }

    fn reclaim(&mut self, id: NodeId) {
        if id != ROOT && self.nodes.get(id).is_some_and(Option::is_some) {
            self.nodes[id] = None;
            self.free.push(id);
        }
    }

    fn check_writable(&self) -> IoResult<()> {
        if self.read_only {
            Err(IoError::ReadOnly(self.name.clone()))
        } else {
            Ok(())
        }
    }
}

impl Device for MemDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn lookup(&self, components: &[String]) -> IoResult<NodeId> {
        self.walk(components)
    }

    fn stat(&self, node: NodeId) -> IoResult<NodeStat> {
        let stat = match &self.node(node)?.body {
            Body::Dir(_) => NodeStat {
                kind: NodeKind::Directory,
                size: 0,
            },
            Body::File(data) => NodeStat {
                kind: NodeKind::File,
                size: data.len() as u64,
            },
        };
        Ok(stat)
    }

    fn create_file(&mut self, components: &[String], exclusive: bool) -> IoResult<NodeId> {
        self.check_writable()?;
        let Some(name) = components.last() else {
            return Err(IoError::IsADirectory(self.display(components)));
        };
        let parent = self.parent_dir(components)?;
        if let Some(existing) = self.child(parent, name)? {
            return match self.node(existing)?.body {
                Body::Dir(_) => Err(IoError::IsADirectory(self.display(components))),
                Body::File(_) if exclusive => Err(IoError::AlreadyExists(self.display(components))),
                Body::File(_) => Ok(existing),
            };
        }
        let id = self.insert(parent, name.clone(), Body::File(Vec::new()))?;
        trace!("mem::create_file {} -> node {id}", self.display(components));
        Ok(id)
    }

    fn mkdir(&mut self, components: &[String]) -> IoResult<NodeId> {
        self.check_writable()?;
        let Some(name) = components.last() else {
            return Err(IoError::AlreadyExists(self.display(components)));
        };
        let parent = self.parent_dir(components)?;
        if self.child(parent, name)?.is_some() {
            return Err(IoError::AlreadyExists(self.display(components)));
        }
        self.insert(parent, name.clone(), Body::Dir(Vec::new()))
    }

    fn remove(&mut self, components: &[String]) -> IoResult<()> {
        self.check_writable()?;
        let id = self.walk(components)?;
        let node = self.node(id)?;
        if id == ROOT || matches!(node.body, Body::Dir(_)) {
            return Err(IoError::IsADirectory(self.display(components)));
        }
        let held = node.holds > 0;
        self.unlink(id)?;
        if !held {
            self.reclaim(id);
        }
        Ok(())
    }

    fn rmdir(&mut self, components: &[String]) -> IoResult<()> {
        self.check_writable()?;
        if components.is_empty() {
            return Err(IoError::InvalidArgument("cannot remove a device root"));
        }
        let id = self.walk(components)?;
        match &self.node(id)?.body {
            Body::File(_) => return Err(IoError::NotADirectory(self.display(components))),
            Body::Dir(children) if !children.is_empty() => {
                return Err(IoError::DirectoryNotEmpty(self.display(components)))
            }
            Body::Dir(_) => {}
        }
        self.unlink(id)?;
        self.reclaim(id);
        Ok(())
    }

    fn read_at(&self, node: NodeId, offset: u64, buf: &mut [u8]) -> IoResult<usize> {
        let Body::File(data) = &self.node(node)?.body else {
            return Err(IoError::IsADirectory(format!("{}:#{node}", self.name)));
        };
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= data.len() {
            return Ok(0);
        }
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        Ok(count)
    }

    fn write_at(&mut self, node: NodeId, offset: u64, bytes: &[u8]) -> IoResult<usize> {
        self.check_writable()?;
        let end = offset
            .checked_add(bytes.len() as u64)
            .filter(|&end| end <= MAX_FILE_LEN)
            .ok_or(IoError::InvalidArgument("write exceeds device file size limit"))?;
        let device = self.name.clone();
        let Body::File(data) = &mut self.node_mut(node)?.body else {
            return Err(IoError::IsADirectory(format!("{device}:#{node}")));
        };
        // Both bounds are at most MAX_FILE_LEN, which fits in usize.
        let (start, end) = (offset as usize, end as usize);
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        Ok(bytes.len())
    }

    fn truncate(&mut self, node: NodeId, len: u64) -> IoResult<()> {
        self.check_writable()?;
        if len > MAX_FILE_LEN {
            return Err(IoError::InvalidArgument("truncate exceeds device file size limit"));
        }
        let device = self.name.clone();
        match &mut self.node_mut(node)?.body {
            Body::File(data) => {
                data.resize(len as usize, 0);
                Ok(())
            }
            Body::Dir(_) => Err(IoError::IsADirectory(format!("{device}:#{node}"))),
        }
    }

    fn retain(&mut self, node: NodeId) {
        if let Ok(node) = self.node_mut(node) {
            node.holds += 1;
        }
    }

    fn release(&mut self, node: NodeId) {
        let Ok(entry) = self.node_mut(node) else {
            return;
        };
        entry.holds = entry.holds.saturating_sub(1);
        if entry.holds == 0 && entry.parent.is_none() {
            self.reclaim(node);
        }
    }
}
