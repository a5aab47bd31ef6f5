//! Station index: a height-balanced (AVL) search tree keyed by station id.
//!
//! Every distinct station id gets exactly one [`Station`] entry. The capacity
//! of an entry is fixed when the entry is created (first write wins), and its
//! consumption only ever grows through [`Station::accumulate`].
//!
//! Nodes live in a single arena owned by the index and refer to their children
//! by [`NodeId`], so the whole tree is released at once when the index is
//! dropped or passed to [`StationIndex::teardown`]. There is no removal.
//!
//! ```rust
//! use cwire::StationIndex;
//!
//! let mut index = StationIndex::new();
//! index.insert(10, 500).unwrap().accumulate(20);
//! index.insert(10, 900).unwrap().accumulate(30);
//! index.insert(4, 200).unwrap().accumulate(5);
//!
//! let lines: Vec<String> = index.iter().map(|s| s.to_string()).collect();
//! assert_eq!(lines, ["4:200:5", "10:500:50"]);
//! ```

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// The only ways building the index can fail. Both are fatal for a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("failed to allocate a node for station {id} ({stations} stations indexed)")]
    Allocation { id: u32, stations: usize },
    #[error("station index is full ({stations} stations)")]
    Full { stations: usize },
}

// =============================================================================
// Station
// =============================================================================

/// An aggregation bucket: fixed capacity plus accumulated consumption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Station {
    id: u32,
    capacity: u64,
    consumption: u64,
}

impl Station {
    fn new(id: u32, capacity: u64) -> Self {
        Self {
            id,
            capacity,
            consumption: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[inline]
    pub fn consumption(&self) -> u64 {
        self.consumption
    }

    /// Adds `load` to the consumption total. Deciding whether a load is worth
    /// adding is up to the caller.
    #[inline]
    pub fn accumulate(&mut self, load: u64) {
        self.consumption += load;
    }
}

/// Renders the report line `id:capacity:consumption`.
impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.id, self.capacity, self.consumption)
    }
}

// =============================================================================
// Arena nodes
// =============================================================================

/// Index of a node in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct NodeId(u32);

impl NodeId {
    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Node {
    station: Station,
    /// 1 for a leaf; an absent child counts as 0.
    height: u8,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

impl Node {
    fn leaf(station: Station) -> Self {
        Self {
            station,
            height: 1,
            left: None,
            right: None,
        }
    }
}

// =============================================================================
// StationIndex
// =============================================================================

#[derive(Clone, Default)]
pub struct StationIndex {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl StationIndex {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Pre-sizes the arena for `stations` entries.
    pub fn with_capacity(stations: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(stations),
            root: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Height of the whole tree (0 when empty).
    #[inline]
    pub fn height(&self) -> u8 {
        self.height_of(self.root)
    }

    pub fn find(&self, id: u32) -> Option<&Station> {
        self.locate(id).map(|n| &self.node(n).station)
    }

    pub fn find_mut(&mut self, id: u32) -> Option<&mut Station> {
        let n = self.locate(id)?;
        Some(&mut self.node_mut(n).station)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.locate(id).is_some()
    }

    /// Returns the entry for `id`, creating it with `capacity` and zero
    /// consumption if it does not exist yet.
    ///
    /// An existing entry is returned untouched: its capacity is never
    /// overwritten.
    pub fn insert(&mut self, id: u32, capacity: u64) -> Result<&mut Station, IndexError> {
        let (root, target) = self.insert_at(self.root, id, capacity)?;
        self.root = Some(root);
        Ok(&mut self.node_mut(target).station)
    }

    /// Adds `load` to the entry for `id`. Returns `false` if there is no such
    /// entry, in which case nothing changes.
    pub fn accumulate(&mut self, id: u32, load: u64) -> bool {
        match self.find_mut(id) {
            Some(station) => {
                station.accumulate(load);
                true
            }
            None => false,
        }
    }

    /// In-order traversal, ascending by id.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Releases every node. Returns how many stations were released.
    pub fn teardown(self) -> usize {
        let released = self.nodes.len();
        drop(self);
        released
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    #[inline]
    fn node(&self, n: NodeId) -> &Node {
        &self.nodes[n.idx()]
    }

    #[inline]
    fn node_mut(&mut self, n: NodeId) -> &mut Node {
        &mut self.nodes[n.idx()]
    }

    #[inline]
    fn height_of(&self, n: Option<NodeId>) -> u8 {
        n.map_or(0, |n| self.node(n).height)
    }

    #[inline]
    fn balance_of(&self, n: NodeId) -> i16 {
        let node = self.node(n);
        i16::from(self.height_of(node.left)) - i16::from(self.height_of(node.right))
    }

    #[inline]
    fn update_height(&mut self, n: NodeId) {
        let node = self.node(n);
        let h = self.height_of(node.left).max(self.height_of(node.right)) + 1;
        self.node_mut(n).height = h;
    }

    fn locate(&self, id: u32) -> Option<NodeId> {
        let mut cur = self.root;
        while let Some(n) = cur {
            let node = self.node(n);
            cur = match id.cmp(&node.station.id) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(n),
            };
        }
        None
    }

    fn alloc(&mut self, station: Station) -> Result<NodeId, IndexError> {
        let stations = self.nodes.len();
        let raw = u32::try_from(stations).map_err(|_| IndexError::Full { stations })?;
        self.nodes
            .try_reserve(1)
            .map_err(|_| IndexError::Allocation {
                id: station.id,
                stations,
            })?;
        self.nodes.push(Node::leaf(station));
        Ok(NodeId(raw))
    }

    /// Inserts below `node` and returns `(new subtree root, entry for id)`.
    fn insert_at(
        &mut self,
        node: Option<NodeId>,
        id: u32,
        capacity: u64,
    ) -> Result<(NodeId, NodeId), IndexError> {
        let Some(n) = node else {
            let created = self.alloc(Station::new(id, capacity))?;
            return Ok((created, created));
        };

        let target = match id.cmp(&self.node(n).station.id) {
            Ordering::Less => {
                let (child, target) = self.insert_at(self.node(n).left, id, capacity)?;
                self.node_mut(n).left = Some(child);
                target
            }
            Ordering::Greater => {
                let (child, target) = self.insert_at(self.node(n).right, id, capacity)?;
                self.node_mut(n).right = Some(child);
                target
            }
            Ordering::Equal => return Ok((n, n)),
        };

        self.update_height(n);
        Ok((self.rebalance(n, id), target))
    }

    /// Restores the AVL property at `n` after `id` was inserted below it.
    /// Returns the new local root.
    fn rebalance(&mut self, n: NodeId, id: u32) -> NodeId {
        let balance = self.balance_of(n);

        if balance > 1 {
            if let Some(left) = self.node(n).left {
                if id > self.node(left).station.id {
                    let l = self.rotate_left(left);
                    self.node_mut(n).left = Some(l);
                }
                return self.rotate_right(n);
            }
        }

        if balance < -1 {
            if let Some(right) = self.node(n).right {
                if id < self.node(right).station.id {
                    let r = self.rotate_right(right);
                    self.node_mut(n).right = Some(r);
                }
                return self.rotate_left(n);
            }
        }

        n
    }

    //     y            x
    //    / \          / \
    //   x   C   ->   A   y
    //  / \              / \
    // A   B            B   C
    fn rotate_right(&mut self, y: NodeId) -> NodeId {
        let Some(x) = self.node(y).left else {
            return y;
        };
        let b = self.node(x).right;
        self.node_mut(x).right = Some(y);
        self.node_mut(y).left = b;
        self.update_height(y);
        self.update_height(x);
        x
    }

    fn rotate_left(&mut self, x: NodeId) -> NodeId {
        let Some(y) = self.node(x).right else {
            return x;
        };
        let b = self.node(y).left;
        self.node_mut(y).left = Some(x);
        self.node_mut(x).right = b;
        self.update_height(x);
        self.update_height(y);
        y
    }
}

impl fmt::Debug for StationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|s| (s.id, (s.capacity, s.consumption))))
            .finish()
    }
}

impl<'a> IntoIterator for &'a StationIndex {
    type Item = &'a Station;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Traversal
// =============================================================================

/// Lazy in-order iterator over the stations of a [`StationIndex`].
pub struct Iter<'a> {
    index: &'a StationIndex,
    /// Ancestors whose station has not been yielded yet.
    stack: Vec<NodeId>,
    remaining: usize,
}

impl<'a> Iter<'a> {
    fn new(index: &'a StationIndex) -> Self {
        let mut iter = Self {
            index,
            stack: Vec::with_capacity(usize::from(index.height())),
            remaining: index.len(),
        };
        iter.push_left_spine(index.root);
        iter
    }

    fn push_left_spine(&mut self, mut cur: Option<NodeId>) {
        while let Some(n) = cur {
            self.stack.push(n);
            cur = self.index.node(n).left;
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Station;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        let node = self.index.node(n);
        self.push_left_spine(node.right);
        self.remaining -= 1;
        Some(&node.station)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}


#[cfg(test)]
mod proptests;
