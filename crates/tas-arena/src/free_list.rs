//! Sentinel-headed singly linked list of free blocks.
//!
//! The links live in the free blocks' own payload words (see
//! [`ArenaBuffer::next_free`]). The sentinel is the only node outside the
//! arena: it holds nothing but the first link, so insertion and removal
//! never special-case an empty list or the first element.

use tas_core::{BlockRef, ContractViolation};

use crate::block::{violation, MIN_BLOCK_SIZE};
use crate::buffer::ArenaBuffer;

/// A node that owns a `next` link: the sentinel or a free block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Node {
    Sentinel,
    Block(BlockRef),
}

/// The free list anchor.
#[derive(Debug, Default)]
pub(crate) struct FreeList {
    /// Link held by the sentinel node.
    sentinel: Option<BlockRef>,
}

impl FreeList {
    pub(crate) fn new() -> Self {
        Self { sentinel: None }
    }

    /// First free block, `None` if the list is empty.
    pub(crate) fn first(&self) -> Option<BlockRef> {
        self.sentinel
    }

    /// Detach every node from the sentinel. The blocks are left untouched.
    pub(crate) fn clear(&mut self) {
        self.sentinel = None;
    }

    fn set_next_of(&mut self, buf: &mut ArenaBuffer, node: Node, next: Option<BlockRef>) {
        match node {
            Node::Sentinel => self.sentinel = next,
            Node::Block(b) => buf.set_next_free(b, next),
        }
    }

    /// Splice `block` between the sentinel and the current first node. O(1).
    ///
    /// `block` must already be marked free.
    pub(crate) fn insert_head(&mut self, buf: &mut ArenaBuffer, block: BlockRef) {
        buf.set_next_free(block, self.sentinel);
        self.set_next_of(buf, Node::Sentinel, Some(block));
    }

    /// Unlink `block`. O(n): walks from the sentinel to its predecessor.
    ///
    /// # Panics
    ///
    /// Panics if `block` is not in the list.
    pub(crate) fn remove(&mut self, buf: &mut ArenaBuffer, block: BlockRef) {
        let mut pred = Node::Sentinel;
        let mut current = self.sentinel;
        while let Some(node) = current {
            let next = buf.next_free(node);
            if node == block {
                self.set_next_of(buf, pred, next);
                return;
            }
            pred = Node::Block(node);
            current = next;
        }
        violation(ContractViolation::NotInFreeList { block });
    }

    /// Iterate over the free blocks in list order, sentinel excluded.
    pub(crate) fn iter<'a>(&self, buf: &'a ArenaBuffer) -> FreeListIter<'a> {
        FreeListIter {
            buf,
            next: self.sentinel,
            remaining: buf.len() / MIN_BLOCK_SIZE,
        }
    }
}

/// Iterator over a [`FreeList`].
///
/// A list can never hold more nodes than the arena holds blocks; walking
/// past that bound means the links form a cycle.
pub(crate) struct FreeListIter<'a> {
    buf: &'a ArenaBuffer,
    next: Option<BlockRef>,
    remaining: usize,
}

impl Iterator for FreeListIter<'_> {
    type Item = BlockRef;

    fn next(&mut self) -> Option<BlockRef> {
        let current = self.next?;
        if self.remaining == 0 {
            violation(ContractViolation::FreeListMismatch { block: current });
        }
        self.remaining -= 1;
        self.next = self.buf.next_free(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Arena of four minimum blocks, all marked free, none listed.
    fn setup() -> (ArenaBuffer, [BlockRef; 4]) {
        let mut buf = ArenaBuffer::new(4 * MIN_BLOCK_SIZE).unwrap();
        let blocks = [0, 1, 2, 3].map(|i| BlockRef(i * MIN_BLOCK_SIZE));
        for b in blocks {
            buf.set_size(b, MIN_BLOCK_SIZE);
            buf.mark_free(b);
        }
        (buf, blocks)
    }

    fn collect(list: &FreeList, buf: &ArenaBuffer) -> Vec<BlockRef> {
        list.iter(buf).collect()
    }

    #[test]
    fn empty_list_iterates_nothing() {
        let (buf, _) = setup();
        let list = FreeList::new();
        assert_eq!(list.first(), None);
        assert!(collect(&list, &buf).is_empty());
    }

    #[test]
    fn insert_head_prepends() {
        let (mut buf, [a, b, c, _]) = setup();
        let mut list = FreeList::new();
        list.insert_head(&mut buf, a);
        list.insert_head(&mut buf, b);
        list.insert_head(&mut buf, c);
        assert_eq!(collect(&list, &buf), vec![c, b, a]);
        assert_eq!(list.first(), Some(c));
    }

    #[test]
    fn remove_first_middle_and_last() {
        let (mut buf, [a, b, c, d]) = setup();
        let mut list = FreeList::new();
        for x in [a, b, c, d] {
            list.insert_head(&mut buf, x);
        }
        // list order: d c b a
        list.remove(&mut buf, c);
        assert_eq!(collect(&list, &buf), vec![d, b, a]);
        list.remove(&mut buf, d);
        assert_eq!(collect(&list, &buf), vec![b, a]);
        list.remove(&mut buf, a);
        assert_eq!(collect(&list, &buf), vec![b]);
        list.remove(&mut buf, b);
        assert!(collect(&list, &buf).is_empty());
    }

    #[test]
    #[should_panic(expected = "is not in the free list")]
    fn removing_absent_block_panics() {
        let (mut buf, [a, b, _, _]) = setup();
        let mut list = FreeList::new();
        list.insert_head(&mut buf, a);
        list.remove(&mut buf, b);
    }

    #[test]
    fn clear_detaches_everything() {
        let (mut buf, [a, b, _, _]) = setup();
        let mut list = FreeList::new();
        list.insert_head(&mut buf, a);
        list.insert_head(&mut buf, b);
        list.clear();
        assert_eq!(list.first(), None);
    }

    #[test]
    #[should_panic(expected = "disagrees with the free list")]
    fn cyclic_links_are_detected() {
        let (mut buf, [a, b, _, _]) = setup();
        let mut list = FreeList::new();
        list.insert_head(&mut buf, a);
        list.insert_head(&mut buf, b);
        buf.set_next_free(a, Some(b));
        let _ = collect(&list, &buf);
    }
}
