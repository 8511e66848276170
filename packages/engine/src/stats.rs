//! Classification of a diff run

use crate::differ::{DiffMark, DiffResult};
use crate::units::is_atomic;
use selser_dom::visitor::{walk_children, walk_node};
use selser_dom::{NodeId, SelserConfig, Tree, Visitor};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditKind {
    NoOp,
    /// Only template or extension output changed
    TemplateUpdate,
    PageUpdate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffStats {
    pub unmodified: usize,
    pub modified_attrs_only: usize,
    pub modified: usize,
    pub inserted: usize,
    pub children_changed: usize,
    pub changed_atomic_units: usize,
    /// Targets of templates whose output changed
    pub changed_templates: BTreeSet<String>,
    /// Changed nodes outside atomic units
    pub page_changes: usize,
}

impl DiffStats {
    pub fn collect(tree: &Tree, result: &DiffResult, config: &SelserConfig) -> Self {
        let mut collector = StatsCollector {
            result,
            config,
            stats: DiffStats::default(),
            in_unit: false,
        };
        collector.visit_node(tree, tree.root());
        collector.stats
    }

    pub fn record(&mut self, mark: DiffMark) {
        match mark {
            DiffMark::Unmodified => self.unmodified += 1,
            DiffMark::ModifiedAttrsOnly => self.modified_attrs_only += 1,
            DiffMark::Modified => self.modified += 1,
            DiffMark::Inserted => self.inserted += 1,
            DiffMark::ChildrenChanged => self.children_changed += 1,
        }
    }

    pub fn total_changed(&self) -> usize {
        self.modified_attrs_only + self.modified + self.inserted + self.children_changed
    }

    pub fn edit_kind(&self) -> EditKind {
        if self.total_changed() == 0 {
            EditKind::NoOp
        } else if self.page_changes == 0 && self.changed_atomic_units > 0 {
            EditKind::TemplateUpdate
        } else {
            EditKind::PageUpdate
        }
    }

    /// Add the counts of another run
    pub fn merge(&mut self, other: &DiffStats) {
        self.unmodified += other.unmodified;
        self.modified_attrs_only += other.modified_attrs_only;
        self.modified += other.modified;
        self.inserted += other.inserted;
        self.children_changed += other.children_changed;
        self.changed_atomic_units += other.changed_atomic_units;
        self.page_changes += other.page_changes;
        self.changed_templates
            .extend(other.changed_templates.iter().cloned());
    }
}

struct StatsCollector<'a> {
    result: &'a DiffResult,
    config: &'a SelserConfig,
    stats: DiffStats,
    in_unit: bool,
}

impl StatsCollector<'_> {
    fn template_target(&self, tree: &Tree, id: NodeId) -> Option<String> {
        let data = tree.attr(id, &self.config.template_data_attribute)?;
        let value: serde_json::Value = serde_json::from_str(data).ok()?;
        value.get("target")?.as_str().map(str::to_string)
    }
}

impl Visitor for StatsCollector<'_> {
    fn visit_node(&mut self, tree: &Tree, id: NodeId) {
        if let Some(mark) = self.result.mark(id) {
            self.stats.record(mark);
            let counts_for_page = matches!(
                mark,
                DiffMark::Modified | DiffMark::Inserted | DiffMark::ModifiedAttrsOnly
            );
            let grouped = tree.attr(id, &self.config.grouping_attribute).is_some();
            if counts_for_page && !self.in_unit && !grouped && !is_atomic(tree, id, self.config) {
                self.stats.page_changes += 1;
            }
        }
        walk_node(self, tree, id);
    }

    fn visit_element(&mut self, tree: &Tree, id: NodeId) {
        if self.in_unit || !is_atomic(tree, id, self.config) {
            walk_children(self, tree, id);
            return;
        }

        if self.result.mark(id) != Some(DiffMark::Unmodified) {
            self.stats.changed_atomic_units += 1;
            if let Some(target) = self.template_target(tree, id) {
                self.stats.changed_templates.insert(target);
            }
        }
        self.in_unit = true;
        walk_children(self, tree, id);
        self.in_unit = false;
    }
}
