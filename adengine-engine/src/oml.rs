//! The Ordered Multi-List (§4.B)
//!
//! A set of ordered linked lists that physically share nodes: a campaign
//! targeting N keywords lives in exactly one arena slot but occupies a
//! ranked position in N independent per-keyword orderings, plus one master
//! ordering over every admitted campaign. `get_first` is O(1); `insert` is
//! amortized O(k) where k is the new node's position in the master list, no
//! per-keyword traversal required; `delete` is O(L) where L is the number
//! of lists the node belongs to.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use adengine_core::Campaign;

use crate::arena::{Arena, NodeHandle};
use crate::node::Node;

/// The list key for the master ordering over every admitted campaign.
pub const MASTER_LIST: &str = "";

/// A set of ordered linked lists over a shared pool of campaign nodes.
pub struct OrderedMultiList {
    arena: Arena<Node>,
    /// list key -> head node handle. A key absent here has no members.
    heads: HashMap<String, NodeHandle>,
}

impl OrderedMultiList {
    /// Creates an empty structure, preallocating room for `capacity_hint`
    /// nodes in the backing arena.
    pub fn with_capacity(capacity_hint: usize) -> Self {
        Self {
            arena: Arena::with_capacity(capacity_hint),
            heads: HashMap::new(),
        }
    }

    /// Returns the head of `list_key`, or `None` if the list has no
    /// members (including if it was never created). O(1).
    pub fn get_first(&self, list_key: &str) -> Option<&Campaign> {
        let handle = *self.heads.get(list_key)?;
        self.arena.get(handle).map(|n| &n.campaign)
    }

    /// True if `handle` still names a live node in the structure.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.arena.contains(handle)
    }

    /// Returns the campaign at `handle`, if still live.
    pub fn campaign(&self, handle: NodeHandle) -> Option<&Campaign> {
        self.arena.get(handle).map(|n| &n.campaign)
    }

    /// Allocates a node for `campaign` in the backing arena without linking
    /// it into any list. The engine façade uses this to create a node at
    /// registration time regardless of whether the campaign's window has
    /// started yet (§4.D); `link` performs the actual list insertion, run
    /// either immediately or later by the scheduler.
    pub fn create_node(&mut self, campaign: Campaign) -> NodeHandle {
        self.arena.insert(Node::new(campaign, Vec::new()))
    }

    /// Convenience for creating and immediately linking a node, used where
    /// the admission window has already started.
    pub fn insert(&mut self, campaign: Campaign) -> NodeHandle {
        let handle = self.create_node(campaign);
        self.link(handle);
        handle
    }

    /// Links an already-allocated, not-yet-linked node into the master list
    /// and a list for each of its target keywords. A no-op if `handle` no
    /// longer names a live node (it may have been retired before its
    /// deferred insertion fired — §4.C's cancellation note).
    ///
    /// Panics if `campaign`'s priority compares equal to some other
    /// currently-admitted campaign (§4.A: equal cpm, end instant, and id is
    /// a corruption invariant, since ids are unique by construction — not a
    /// recoverable error).
    pub fn link(&mut self, handle: NodeHandle) {
        let Some(node) = self.arena.get(handle) else {
            return;
        };
        let mut memberships: Vec<String> = node.campaign.target_keywords.clone();
        memberships.push(MASTER_LIST.to_string());
        self.arena.get_mut(handle).unwrap().memberships = memberships.clone();

        let mut unsatisfied: HashSet<String> = HashSet::new();
        for list_key in &memberships {
            if !self.insert_at_head(handle, list_key) {
                unsatisfied.insert(list_key.clone());
            }
        }

        if !unsatisfied.is_empty() {
            let mut predecessor: HashMap<String, Option<NodeHandle>> =
                unsatisfied.into_iter().map(|k| (k, None)).collect();

            let mut current_opt = self.heads.get(MASTER_LIST).copied();
            let mut prev_master: Option<NodeHandle> = None;
            while let Some(current) = current_opt {
                if !self.outranks(current, handle) {
                    break;
                }
                prev_master = Some(current);
                for (key, pred) in predecessor.iter_mut() {
                    if self.is_member(current, key) {
                        *pred = Some(current);
                    }
                }
                current_opt = self.arena.get(current).unwrap().next.get(MASTER_LIST).copied();
            }
            predecessor.insert(MASTER_LIST.to_string(), prev_master);

            for (list_key, pred) in predecessor {
                match pred {
                    Some(p) => self.splice_after(handle, p, &list_key),
                    None => self.splice_as_new_head(handle, &list_key),
                }
            }
        }
    }

    /// Removes `handle` from every list it participates in, leaving its
    /// slot free for reuse. A handle not present (already deleted, or
    /// stale) is a no-op.
    pub fn delete(&mut self, handle: NodeHandle) {
        let memberships = match self.arena.get(handle) {
            Some(node) => node.memberships.clone(),
            None => return,
        };

        for key in &memberships {
            let next = self.arena.get(handle).unwrap().next.get(key).copied();
            let prev = self.arena.get(handle).unwrap().prev.get(key).copied();
            match (prev, next) {
                (Some(p), Some(n)) => {
                    self.arena.get_mut(p).unwrap().next.insert(key.clone(), n);
                    self.arena.get_mut(n).unwrap().prev.insert(key.clone(), p);
                }
                (Some(p), None) => {
                    self.arena.get_mut(p).unwrap().next.remove(key);
                }
                (None, Some(n)) => {
                    self.arena.get_mut(n).unwrap().prev.remove(key);
                    self.heads.insert(key.clone(), n);
                }
                (None, None) => {
                    // sole member: this node is the entire list
                    self.heads.remove(key);
                }
            }
        }

        self.arena.remove(handle);
    }

    /// True if `candidate`'s campaign outranks (has strictly higher
    /// priority than) `incoming`'s. Panics on a priority tie between two
    /// distinct nodes — see `insert`'s doc comment.
    fn outranks(&self, candidate: NodeHandle, incoming: NodeHandle) -> bool {
        let a = &self.arena.get(candidate).unwrap().campaign;
        let b = &self.arena.get(incoming).unwrap().campaign;
        match a.compare(b) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => panic!(
                "{}",
                adengine_core::Error::DuplicateCampaignId { id: a.id }
            ),
        }
    }

    /// True if `handle` is currently a member of list `key`: either it is
    /// the list's head, or it has a predecessor in that list (every
    /// non-head member does).
    fn is_member(&self, handle: NodeHandle, key: &str) -> bool {
        if self.heads.get(key) == Some(&handle) {
            return true;
        }
        self.arena.get(handle).unwrap().prev.contains_key(key)
    }

    /// Attempts to insert `handle` at the head of `list_key`. Returns
    /// `true` if the list was empty or `handle` outranks the current head
    /// (and the splice was performed); `false` if the list has a
    /// strictly-higher-priority head already (needs the shared traversal).
    fn insert_at_head(&mut self, handle: NodeHandle, list_key: &str) -> bool {
        match self.heads.get(list_key).copied() {
            None => {
                self.heads.insert(list_key.to_string(), handle);
                true
            }
            Some(head) => {
                if self.outranks(handle, head) {
                    self.splice_as_new_head(handle, list_key);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Splices `handle` in immediately after `pred` in `list_key`,
    /// reattaching `pred`'s old successor (if any) after `handle`.
    fn splice_after(&mut self, handle: NodeHandle, pred: NodeHandle, list_key: &str) {
        let old_next = self.arena.get(pred).unwrap().next.get(list_key).copied();
        self.arena.get_mut(pred).unwrap().next.insert(list_key.to_string(), handle);
        self.arena.get_mut(handle).unwrap().prev.insert(list_key.to_string(), pred);
        if let Some(old_next) = old_next {
            self.arena.get_mut(handle).unwrap().next.insert(list_key.to_string(), old_next);
            self.arena.get_mut(old_next).unwrap().prev.insert(list_key.to_string(), handle);
        }
    }

    /// Makes `handle` the new head of `list_key`, pushing the old head (if
    /// any) behind it.
    fn splice_as_new_head(&mut self, handle: NodeHandle, list_key: &str) {
        if let Some(old_head) = self.heads.get(list_key).copied() {
            self.arena.get_mut(handle).unwrap().next.insert(list_key.to_string(), old_head);
            self.arena.get_mut(old_head).unwrap().prev.insert(list_key.to_string(), handle);
        }
        self.heads.insert(list_key.to_string(), handle);
    }

    /// Materializes list `key` as a `Vec` of campaign ids, head to tail.
    /// Testing/debugging only — not part of the public contract.
    #[cfg(test)]
    fn list_ids(&self, key: &str) -> Vec<u64> {
        let mut ids = Vec::new();
        let mut current = self.heads.get(key).copied();
        while let Some(handle) = current {
            let node = self.arena.get(handle).unwrap();
            ids.push(node.campaign.id);
            current = node.next.get(key).copied();
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(id: u64, cpm: f64, end: i64, keywords: &[&str]) -> Campaign {
        Campaign::new(
            id,
            0,
            end,
            keywords.iter().map(|s| s.to_string()).collect(),
            10,
            cpm,
            format!("url-{id}"),
        )
        .unwrap()
    }

    /// Boundary scenario 1 (§8).
    #[test]
    fn three_campaigns_basic_ordering() {
        let mut oml = OrderedMultiList::with_capacity(0);
        oml.insert(campaign(1, 5.0, 1000, &["dog"]));
        oml.insert(campaign(2, 5.5, 1000, &["cat"]));
        oml.insert(campaign(3, 4.5, 1000, &["dog"]));

        assert_eq!(oml.list_ids(MASTER_LIST), vec![2, 1, 3]);
        assert_eq!(oml.list_ids("dog"), vec![1, 3]);
        assert_eq!(oml.list_ids("cat"), vec![2]);
    }

    /// Boundary scenario 2 (§8).
    #[test]
    fn five_campaigns_with_shared_keyword() {
        let mut oml = OrderedMultiList::with_capacity(0);
        oml.insert(campaign(1, 5.0, 1000, &["dog"])); // A
        oml.insert(campaign(2, 5.5, 1000, &["cat"])); // B
        oml.insert(campaign(3, 4.6, 1000, &["dog", "cat"])); // C
        oml.insert(campaign(4, 4.5, 1000, &["cat"])); // D
        oml.insert(campaign(5, 4.0, 1000, &["dog"])); // E

        assert_eq!(oml.list_ids("dog"), vec![1, 3, 5]);
        assert_eq!(oml.list_ids("cat"), vec![2, 3, 4]);
        assert_eq!(oml.list_ids(MASTER_LIST), vec![2, 1, 3, 4, 5]);
    }

    /// Boundary scenario 5 (§8).
    #[test]
    fn equal_cpm_and_end_breaks_tie_on_id() {
        let mut oml = OrderedMultiList::with_capacity(0);
        oml.insert(campaign(2, 5.0, 1000, &["dog"]));
        oml.insert(campaign(1, 5.0, 1000, &["dog"]));

        assert_eq!(oml.get_first("dog").unwrap().id, 1);
    }

    /// Boundary scenario 6 (§8): delete a master-middle node that is also
    /// the tail of a per-keyword list.
    #[test]
    fn delete_middle_node_that_is_also_a_list_tail() {
        let mut oml = OrderedMultiList::with_capacity(0);
        let b = oml.insert(campaign(1, 5.5, 1000, &["cat"]));
        let a = oml.insert(campaign(2, 5.0, 1000, &["dog"]));
        let c = oml.insert(campaign(3, 4.6, 1000, &["dog", "cat"]));
        let _d = oml.insert(campaign(4, 4.5, 1000, &["cat"]));

        // master = [b, a, c, d]; dog = [a, c]; c is the tail of dog.
        assert_eq!(oml.list_ids("dog"), vec![2, 3]);
        oml.delete(c);
        assert_eq!(oml.list_ids("dog"), vec![2]);
        assert_eq!(oml.list_ids("cat"), vec![1, 4]);
        assert_eq!(oml.list_ids(MASTER_LIST), vec![1, 2, 4]);

        oml.delete(a);
        oml.delete(b);
        assert!(oml.get_first("dog").is_none());
        assert_eq!(oml.list_ids(MASTER_LIST), vec![4]);
    }

    #[test]
    fn insert_then_delete_is_a_no_op_round_trip() {
        let mut oml = OrderedMultiList::with_capacity(0);
        let h = oml.insert(campaign(1, 5.0, 1000, &["dog"]));
        oml.delete(h);
        assert!(oml.get_first("dog").is_none());
        assert!(oml.get_first(MASTER_LIST).is_none());
    }

    #[test]
    fn delete_of_absent_handle_is_a_no_op() {
        let mut oml = OrderedMultiList::with_capacity(0);
        let h = oml.insert(campaign(1, 5.0, 1000, &["dog"]));
        oml.delete(h);
        // deleting again should not panic
        oml.delete(h);
    }

    #[test]
    fn empty_list_key_is_pruned_from_the_structure() {
        let mut oml = OrderedMultiList::with_capacity(0);
        let h = oml.insert(campaign(1, 5.0, 1000, &["dog"]));
        assert!(oml.get_first("dog").is_some());
        oml.delete(h);
        assert!(oml.get_first("dog").is_none());
        assert!(!oml.heads.contains_key("dog"));
    }

    #[test]
    #[should_panic]
    fn duplicate_id_with_equal_priority_panics() {
        let mut oml = OrderedMultiList::with_capacity(0);
        oml.insert(campaign(1, 5.0, 1000, &["dog"]));
        oml.insert(campaign(1, 5.0, 1000, &["cat"]));
    }

    #[test]
    fn create_node_then_link_matches_insert() {
        let mut oml = OrderedMultiList::with_capacity(0);
        let h = oml.create_node(campaign(1, 5.0, 1000, &["dog"]));
        assert!(oml.contains(h));
        assert!(oml.get_first("dog").is_none(), "not linked yet");

        oml.link(h);
        assert_eq!(oml.get_first("dog").unwrap().id, 1);
        assert_eq!(oml.list_ids(MASTER_LIST), vec![1]);
    }

    #[test]
    fn deleting_a_node_before_it_is_linked_is_a_no_op_removal() {
        let mut oml = OrderedMultiList::with_capacity(0);
        let h = oml.create_node(campaign(1, 5.0, 1000, &["dog"]));
        oml.delete(h);
        assert!(!oml.contains(h));
        assert!(oml.get_first("dog").is_none());
    }

    #[test]
    fn linking_an_already_deleted_handle_is_a_no_op() {
        let mut oml = OrderedMultiList::with_capacity(0);
        let h = oml.create_node(campaign(1, 5.0, 1000, &["dog"]));
        oml.delete(h);
        oml.link(h);
        assert!(oml.get_first("dog").is_none());
    }
}
