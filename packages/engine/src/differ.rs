//! Structural diff between an original, provenance-carrying tree and its
//! edited copy.
//!
//! Every node reachable from the edited tree's root receives a [`DiffMark`].
//! Children are aligned unit by unit:
//!
//! 1. atomic units are matched by their grouping id, wherever they moved to
//! 2. the remaining units are aligned by longest common subsequence of their
//!    signatures
//! 3. unaligned units whose signature still appears among the unused old
//!    units are matched to it, so moved content keeps its source
//! 4. leftover units are paired with a compatible old unit from the same gap
//!    and compared recursively
//!
//! Anything still unmatched is `Inserted`.

use crate::signature::{Signature, Signatures};
use crate::units::{group_children, is_atomic, units, Unit};
use selser_dom::{Dsr, NodeId, NodeKind, Provenance, SelserConfig, Tree};
use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm, DiffOp};
use std::fmt;
use tracing::{debug, trace};

/// Attribute written by [`DiffResult::annotate`]
pub const DIFF_ATTRIBUTE: &str = "data-parsoid-diff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffMark {
    Unmodified,
    ModifiedAttrsOnly,
    Modified,
    Inserted,
    ChildrenChanged,
}

impl DiffMark {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffMark::Unmodified => "unmodified",
            DiffMark::ModifiedAttrsOnly => "modified-attrs-only",
            DiffMark::Modified => "modified",
            DiffMark::Inserted => "inserted",
            DiffMark::ChildrenChanged => "children-changed",
        }
    }
}

impl fmt::Display for DiffMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marks for the nodes of an edited tree, indexed by `NodeId`
#[derive(Debug, Clone)]
pub struct DiffResult {
    marks: Vec<Option<DiffMark>>,
    reuse: Vec<Option<Dsr>>,
    is_empty: bool,
}

impl DiffResult {
    pub fn mark(&self, id: NodeId) -> Option<DiffMark> {
        self.marks.get(id.index()).copied().flatten()
    }

    /// Source range to copy for the topmost node of an unmodified subtree.
    /// Descendants of that node are covered by it and have no range here.
    pub fn reuse_range(&self, id: NodeId) -> Option<Dsr> {
        self.reuse.get(id.index()).copied().flatten()
    }

    /// True when nothing changed anywhere in the tree
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn marks(&self) -> impl Iterator<Item = (NodeId, DiffMark)> + '_ {
        self.marks
            .iter()
            .enumerate()
            .filter_map(|(i, mark)| mark.map(|m| (NodeId(i as u32), m)))
    }

    /// Write each changed element's mark into [`DIFF_ATTRIBUTE`]
    pub fn annotate(&self, tree: &mut Tree) {
        for (id, mark) in self.marks() {
            if mark == DiffMark::Unmodified {
                continue;
            }
            if let Some(attrs) = tree.attrs_mut(id) {
                attrs.set(DIFF_ATTRIBUTE, mark.as_str());
            }
        }
    }
}

pub struct DomDiffer<'c> {
    config: &'c SelserConfig,
}

impl<'c> DomDiffer<'c> {
    pub fn new(config: &'c SelserConfig) -> Self {
        Self { config }
    }

    /// Mark every node of `new` against `old`. Neither tree is modified.
    pub fn diff(&self, old: &Tree, new: &Tree) -> DiffResult {
        let mut complete = vec![false; new.capacity()];
        provenance_complete(new, new.root(), self.config, &mut complete);

        let mut state = DiffState {
            old,
            new,
            config: self.config,
            old_signatures: Signatures::compute(old, self.config),
            new_signatures: Signatures::compute(new, self.config),
            complete,
            marks: vec![None; new.capacity()],
            reuse: vec![None; new.capacity()],
        };

        state.diff_node(old.root(), new.root());
        state.propagate(new.root());

        let is_empty = state.marks[new.root().index()] == Some(DiffMark::Unmodified);
        debug!(target: "selser::domdiff", is_empty, "diff complete");

        DiffResult {
            marks: state.marks,
            reuse: state.reuse,
            is_empty,
        }
    }
}

/// Diff with the default configuration
pub fn diff(old: &Tree, new: &Tree) -> DiffResult {
    let config = SelserConfig::default();
    DomDiffer::new(&config).diff(old, new)
}

struct DiffState<'a> {
    old: &'a Tree,
    new: &'a Tree,
    config: &'a SelserConfig,
    old_signatures: Signatures,
    new_signatures: Signatures,
    /// Whether every element of a subtree carries a valid range
    complete: Vec<bool>,
    marks: Vec<Option<DiffMark>>,
    reuse: Vec<Option<Dsr>>,
}

impl DiffState<'_> {
    fn set_mark(&mut self, id: NodeId, mark: DiffMark) {
        if let Some(slot) = self.marks.get_mut(id.index()) {
            *slot = Some(mark);
        }
    }

    fn mark_subtree(&mut self, id: NodeId, mark: DiffMark) {
        let new = self.new;
        for node in new.descendants(id) {
            self.set_mark(node, mark);
        }
    }

    fn mark_unmodified(&mut self, id: NodeId, dsr: Dsr) {
        trace!(target: "selser::domdiff", node = %id, start = dsr.start, end = dsr.end, "unmodified");
        self.mark_subtree(id, DiffMark::Unmodified);
        if let Some(slot) = self.reuse.get_mut(id.index()) {
            *slot = Some(dsr);
        }
    }

    /// Source range `n` can be copied from. Text and comment nodes have no
    /// persisted provenance and borrow the range of their matched original.
    fn reusable_range(&self, o: NodeId, n: NodeId) -> Option<Dsr> {
        let own = self.new.provenance(n).and_then(Provenance::valid_dsr);
        if self.new.kind(n) == NodeKind::Element {
            own
        } else {
            own.or_else(|| self.old.provenance(o).and_then(Provenance::valid_dsr))
        }
    }

    fn is_content_derived(&self, n: NodeId) -> bool {
        self.new
            .provenance(n)
            .and_then(|p| p.stx)
            .map_or(false, |stx| stx.is_content_derived())
    }

    fn is_complete(&self, n: NodeId) -> bool {
        self.complete.get(n.index()).copied().unwrap_or(false)
    }

    fn diff_node(&mut self, o: NodeId, n: NodeId) {
        let (old, new) = (self.old, self.new);

        if self.old_signatures.get(o) == self.new_signatures.get(n) && self.is_complete(n) {
            if let Some(dsr) = self.reusable_range(o, n) {
                self.mark_unmodified(n, dsr);
                return;
            }
        }

        let same_element = new.kind(n) == NodeKind::Element
            && old.kind(o) == NodeKind::Element
            && old.tag_name(o) == new.tag_name(n);
        if !same_element {
            self.mark_subtree(n, DiffMark::Modified);
            return;
        }

        if is_atomic(new, n, self.config) {
            trace!(target: "selser::domdiff", node = %n, "atomic unit changed");
            self.mark_subtree(n, DiffMark::Modified);
            return;
        }

        if new.provenance(n).and_then(Provenance::valid_dsr).is_none() {
            trace!(target: "selser::domdiff", node = %n, "no provenance");
            self.set_mark(n, DiffMark::Modified);
            self.diff_children(o, n);
            return;
        }

        let attrs_same = match (old.attrs(o), new.attrs(n)) {
            (Some(a), Some(b)) => a.same_set(b, &self.config.diff_ignored_attributes),
            _ => false,
        };
        let old_children = old.children(o);
        let new_children = new.children(n);
        let children_same = old_children.len() == new_children.len()
            && old_children
                .iter()
                .zip(new_children)
                .all(|(&a, &b)| self.old_signatures.get(a) == self.new_signatures.get(b));

        let mark = match (attrs_same, children_same) {
            (false, true) => DiffMark::ModifiedAttrsOnly,
            (false, false) => DiffMark::Modified,
            (true, _) if self.is_content_derived(n) => DiffMark::Modified,
            (true, _) => DiffMark::ChildrenChanged,
        };
        trace!(target: "selser::domdiff", node = %n, %mark, "element changed");
        self.set_mark(n, mark);
        self.diff_children(o, n);
    }

    fn diff_children(&mut self, o: NodeId, n: NodeId) {
        let (old, new) = (self.old, self.new);
        let has_fostered = |tree: &Tree, id: NodeId| {
            tree.children(id)
                .iter()
                .any(|&c| tree.provenance(c).map_or(false, |p| p.fostered))
        };
        if has_fostered(old, o) || has_fostered(new, n) {
            self.diff_positional(o, n);
            return;
        }

        let old_units = units(old, o, &self.old_signatures, self.config);
        let new_units = units(new, n, &self.new_signatures, self.config);
        let pairs = self.align(&old_units, &new_units);

        for (unit, pair) in new_units.iter().zip(pairs) {
            match pair {
                Some(j) => self.diff_unit(&old_units[j], unit),
                None => {
                    trace!(target: "selser::domdiff", node = %unit.first(), "inserted");
                    for &id in &unit.nodes {
                        self.mark_subtree(id, DiffMark::Inserted);
                    }
                }
            }
        }
    }

    /// Index of the matching old unit for each new unit
    fn align(&self, old_units: &[Unit], new_units: &[Unit]) -> Vec<Option<usize>> {
        let mut pairs: Vec<Option<usize>> = vec![None; new_units.len()];
        let mut used = vec![false; old_units.len()];

        for (i, unit) in new_units.iter().enumerate() {
            let Some(about) = unit.about.as_ref().filter(|_| unit.atomic) else {
                continue;
            };
            let found = (0..old_units.len())
                .find(|&j| !used[j] && old_units[j].atomic && old_units[j].about.as_ref() == Some(about));
            if let Some(j) = found {
                pairs[i] = Some(j);
                used[j] = true;
            }
        }

        let free_old: Vec<usize> = (0..old_units.len()).filter(|&j| !used[j]).collect();
        let free_new: Vec<usize> = (0..new_units.len()).filter(|&i| pairs[i].is_none()).collect();
        let old_sigs: Vec<Signature> = free_old.iter().map(|&j| old_units[j].signature).collect();
        let new_sigs: Vec<Signature> = free_new.iter().map(|&i| new_units[i].signature).collect();
        for (a, b) in lcs(&old_sigs, &new_sigs) {
            pairs[free_new[b]] = Some(free_old[a]);
            used[free_old[a]] = true;
        }

        // Moved units
        for i in 0..new_units.len() {
            if pairs[i].is_some() {
                continue;
            }
            let found = (0..old_units.len())
                .find(|&j| !used[j] && old_units[j].signature == new_units[i].signature);
            if let Some(j) = found {
                trace!(target: "selser::domdiff", node = %new_units[i].first(), "moved");
                pairs[i] = Some(j);
                used[j] = true;
            }
        }

        // Edited in place: pair with a compatible unit between the neighbours
        for i in 0..new_units.len() {
            if pairs[i].is_some() || new_units[i].atomic {
                continue;
            }
            let lower = pairs[..i].iter().flatten().max().map_or(0, |&j| j + 1);
            let upper = pairs[i + 1..]
                .iter()
                .flatten()
                .min()
                .copied()
                .unwrap_or(old_units.len());
            let found = (lower..upper).find(|&j| {
                !used[j]
                    && !old_units[j].atomic
                    && self.compatible(old_units[j].first(), new_units[i].first())
            });
            if let Some(j) = found {
                pairs[i] = Some(j);
                used[j] = true;
            }
        }

        pairs
    }

    fn compatible(&self, o: NodeId, n: NodeId) -> bool {
        let (old, new) = (self.old, self.new);
        if old.kind(o) != new.kind(n) {
            return false;
        }
        if new.kind(n) != NodeKind::Element {
            return true;
        }
        let stx = |tree: &Tree, id: NodeId| tree.provenance(id).and_then(|p| p.stx);
        old.tag_name(o) == new.tag_name(n) && stx(old, o) == stx(new, n)
    }

    /// Atomic units are marked uniformly: unmodified when identical with usable
    /// provenance on their first node, modified otherwise
    fn diff_unit(&mut self, old_unit: &Unit, new_unit: &Unit) {
        if !new_unit.atomic {
            self.diff_node(old_unit.first(), new_unit.first());
            return;
        }

        let first = new_unit.first();
        let reusable = if old_unit.signature == new_unit.signature {
            self.new.provenance(first).and_then(Provenance::valid_dsr)
        } else {
            None
        };
        match reusable {
            Some(dsr) => {
                for &id in &new_unit.nodes {
                    self.mark_subtree(id, DiffMark::Unmodified);
                }
                self.mark_unmodified(first, dsr);
            }
            None => {
                trace!(target: "selser::domdiff", node = %first, "atomic unit changed");
                for &id in &new_unit.nodes {
                    self.mark_subtree(id, DiffMark::Modified);
                }
            }
        }
    }

    /// Children next to relocated content are compared position by position,
    /// including their source ranges
    fn diff_positional(&mut self, o: NodeId, n: NodeId) {
        let (old, new) = (self.old, self.new);
        let old_children = old.children(o);

        for (i, &child) in new.children(n).iter().enumerate() {
            match old_children.get(i) {
                Some(&original) if self.deep_equal(original, child) => {
                    match self.reusable_range(original, child) {
                        Some(dsr) if self.is_complete(child) => self.mark_unmodified(child, dsr),
                        Some(_) => self.diff_node(original, child),
                        None => self.mark_subtree(child, DiffMark::Modified),
                    }
                }
                Some(_) => self.mark_subtree(child, DiffMark::Modified),
                None => self.mark_subtree(child, DiffMark::Inserted),
            }
        }
    }

    fn deep_equal(&self, o: NodeId, n: NodeId) -> bool {
        let (old, new) = (self.old, self.new);
        let placement = |tree: &Tree, id: NodeId| {
            tree.provenance(id)
                .map_or((None, false), |p| (p.dsr, p.fostered))
        };

        let data_equal = match (old.attrs(o), new.attrs(n)) {
            (Some(a), Some(b)) => {
                old.tag_name(o) == new.tag_name(n)
                    && a.same_set(b, &self.config.diff_ignored_attributes)
            }
            (None, None) => old.kind(o) == new.kind(n) && old.text(o) == new.text(n),
            _ => false,
        };
        data_equal
            && placement(old, o) == placement(new, n)
            && old.children(o).len() == new.children(n).len()
            && old
                .children(o)
                .iter()
                .zip(new.children(n))
                .all(|(&a, &b)| self.deep_equal(a, b))
    }

    /// Raise every ancestor of a change to at least `ChildrenChanged`.
    /// Returns whether `id` or anything below it changed.
    fn propagate(&mut self, id: NodeId) -> bool {
        let new = self.new;
        let mut changed_below = false;
        for &child in new.children(id) {
            changed_below |= self.propagate(child);
        }

        let own = self.marks[id.index()].unwrap_or(DiffMark::Modified);
        let mark = match own {
            DiffMark::Unmodified if changed_below => {
                if self.is_content_derived(id) {
                    DiffMark::Modified
                } else {
                    DiffMark::ChildrenChanged
                }
            }
            DiffMark::ModifiedAttrsOnly if changed_below => DiffMark::Modified,
            other => other,
        };
        self.set_mark(id, mark);
        if mark != DiffMark::Unmodified {
            self.reuse[id.index()] = None;
        }
        mark != DiffMark::Unmodified
    }
}

/// Longest common subsequence of two signature lists, as index pairs
fn lcs(a: &[Signature], b: &[Signature]) -> Vec<(usize, usize)> {
    capture_diff_slices(Algorithm::Lcs, a, b)
        .into_iter()
        .filter_map(|op| match op {
            DiffOp::Equal {
                old_index,
                new_index,
                len,
            } => Some((0..len).map(move |i| (old_index + i, new_index + i))),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Fill `out` for `id` and its descendants: true when every element below
/// has a valid range. An atomic run only needs one on its first node, which
/// covers the whole run.
fn provenance_complete(tree: &Tree, id: NodeId, config: &SelserConfig, out: &mut [bool]) -> bool {
    let mut complete = tree.kind(id) != NodeKind::Element
        || tree.provenance(id).and_then(Provenance::valid_dsr).is_some();

    for group in group_children(tree, id, config) {
        if group.atomic {
            let covered = group
                .nodes
                .first()
                .and_then(|&first| tree.provenance(first))
                .and_then(Provenance::valid_dsr)
                .is_some();
            for &node in &group.nodes {
                for inner in tree.descendants(node) {
                    if let Some(slot) = out.get_mut(inner.index()) {
                        *slot = covered;
                    }
                }
            }
            complete &= covered;
        } else {
            for &node in &group.nodes {
                complete &= provenance_complete(tree, node, config, out);
            }
        }
    }

    if let Some(slot) = out.get_mut(id.index()) {
        *slot = complete;
    }
    complete
}
