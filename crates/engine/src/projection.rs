//! Header projection: the read path the painter uses.
//!
//! `project` maps a visible position to the header cell covering it. It is
//! pure and re-entrant. `ProjectionPass` memoizes cells for one paint pass;
//! it borrows the model and the converter, so a pass cannot outlive a
//! mutation of either.

use gridgroup_core::IndexPositionConverter;
use rustc_hash::FxHashMap;

use crate::group::GroupId;
use crate::model::GroupModel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderLabel {
    /// Group header text
    Group(String),
    /// Ungrouped cell; the renderer uses the index's own label
    Index(usize),
}

/// One header cell as the renderer should draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub origin_position: usize,
    pub span: usize,
    /// Index at the projected position
    pub index: usize,
    pub group: Option<GroupId>,
    pub label: HeaderLabel,
    /// Drawn for a collapsed group by a member that is not static
    pub collapsed_placeholder: bool,
}

impl HeaderCell {
    pub fn end_position(&self) -> usize {
        self.origin_position + self.span - 1
    }

    pub fn contains(&self, position: usize) -> bool {
        position >= self.origin_position && position <= self.end_position()
    }
}

/// Cell covering `position`, or `None` past the visible end.
///
/// A grouped cell covers the maximal run of adjacent visible positions owned
/// by the same group. Members split apart by foreign indices render as
/// separate cells.
pub fn project(model: &GroupModel, conv: &dyn IndexPositionConverter, position: usize) -> Option<HeaderCell> {
    let index = conv.index_of(position)?;
    let Some(group) = model.group_by_index(index) else {
        return Some(HeaderCell {
            origin_position: position,
            span: 1,
            index,
            group: None,
            label: HeaderLabel::Index(index),
            collapsed_placeholder: false,
        });
    };

    let owned = |p: usize| conv.index_of(p).is_some_and(|i| group.contains(i));
    let mut origin = position;
    while origin > 0 && owned(origin - 1) {
        origin -= 1;
    }
    let mut end = position;
    while owned(end + 1) {
        end += 1;
    }

    Some(HeaderCell {
        origin_position: origin,
        span: end - origin + 1,
        index,
        group: Some(group.id()),
        label: HeaderLabel::Group(group.name().to_string()),
        collapsed_placeholder: group.is_collapsed() && !group.is_static(index),
    })
}

/// Memoized projection for a single paint pass.
pub struct ProjectionPass<'a> {
    model: &'a GroupModel,
    conv: &'a dyn IndexPositionConverter,
    cache: FxHashMap<usize, HeaderCell>,
}

impl<'a> ProjectionPass<'a> {
    pub fn new(model: &'a GroupModel, conv: &'a dyn IndexPositionConverter) -> Self {
        Self { model, conv, cache: FxHashMap::default() }
    }

    pub fn project(&mut self, position: usize) -> Option<HeaderCell> {
        if let Some(cell) = self.cache.get(&position) {
            return Some(cell.clone());
        }
        let cell = project(self.model, self.conv, position)?;
        // The run shares one cell apart from the per-position index
        for p in cell.origin_position..=cell.end_position() {
            if let Some(index) = self.conv.index_of(p) {
                let collapsed_placeholder = match cell.group.and_then(|g| self.model.group(g)) {
                    Some(group) => group.is_collapsed() && !group.is_static(index),
                    None => false,
                };
                self.cache.insert(p, HeaderCell { index, collapsed_placeholder, ..cell.clone() });
            }
        }
        Some(cell)
    }

    /// One cell per distinct run, left to right.
    pub fn project_all(&mut self) -> Vec<HeaderCell> {
        let mut cells = Vec::new();
        let mut position = 0;
        while let Some(cell) = self.project(position) {
            position = cell.end_position() + 1;
            cells.push(cell);
        }
        cells
    }
}
