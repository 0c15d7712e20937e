//! Header scripts.
//!
//! A script names an axis length and a list of header operations. Replaying
//! it drives a `GroupHeader` over an in-memory `AxisView`, the same way an
//! interactive grid would, and records which steps the engine rejected.
//!
//! Groups are referred to by name. After a split both halves share the name;
//! the first group in start-index order wins.
//!
//! ```toml
//! axis_len = 12
//!
//! [[ops]]
//! op = "add_group"
//! name = "Person"
//! start = 0
//! span = 4
//!
//! [[ops]]
//! op = "collapse"
//! group = "Person"
//! ```

use std::cell::Cell;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use gridgroup_config::GroupSettings;
use gridgroup_core::{Axis, AxisView, IndexPositionConverter};
use gridgroup_engine::{GroupError, GroupHeader, GroupId, GroupResult, HeaderLabel, ReorderOutcome};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON script: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML script: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("step {step}: no group named '{name}'")]
    UnknownName { step: usize, name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub axis: Axis,
    pub axis_len: usize,
    /// Overrides the user settings file; `--settings` overrides both
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<GroupSettings>,
    #[serde(default)]
    pub ops: Vec<ScriptOp>,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    AddGroup { name: String, start: usize, span: usize },
    GroupSelection { name: String, positions: Vec<usize> },
    RemoveGroup { group: String },
    ClearGroups,
    AddPositions { group: String, positions: Vec<usize> },
    RemovePositions { group: String, positions: Vec<usize> },
    Unbreakable {
        position: usize,
        #[serde(default = "enabled")]
        value: bool,
    },
    AddStatic { group: String, indices: Vec<usize> },
    RemoveStatic { group: String, indices: Vec<usize> },
    Rename { group: String, to: String },
    Merge { into: String, from: String },
    Split { group: String, position: usize },
    Collapse { group: String },
    Expand { group: String },
    Toggle { position: usize },
    CollapseAll,
    ExpandAll,
    /// Hide through the header (recorded as an external hide)
    Hide { indices: Vec<usize> },
    HidePositions { positions: Vec<usize> },
    Show { indices: Vec<usize> },
    ShowAll,
    /// The grid hides on its own and notifies the header afterwards
    GridHide { indices: Vec<usize> },
    /// The grid shows on its own and notifies the header afterwards
    GridShow { indices: Vec<usize> },
    Reorder { positions: Vec<usize>, destination: usize },
    ReorderGroup { group: String, destination: usize },
    ResetOrder,
}

impl ScriptOp {
    pub fn name(&self) -> &'static str {
        match self {
            ScriptOp::AddGroup { .. } => "add_group",
            ScriptOp::GroupSelection { .. } => "group_selection",
            ScriptOp::RemoveGroup { .. } => "remove_group",
            ScriptOp::ClearGroups => "clear_groups",
            ScriptOp::AddPositions { .. } => "add_positions",
            ScriptOp::RemovePositions { .. } => "remove_positions",
            ScriptOp::Unbreakable { .. } => "unbreakable",
            ScriptOp::AddStatic { .. } => "add_static",
            ScriptOp::RemoveStatic { .. } => "remove_static",
            ScriptOp::Rename { .. } => "rename",
            ScriptOp::Merge { .. } => "merge",
            ScriptOp::Split { .. } => "split",
            ScriptOp::Collapse { .. } => "collapse",
            ScriptOp::Expand { .. } => "expand",
            ScriptOp::Toggle { .. } => "toggle",
            ScriptOp::CollapseAll => "collapse_all",
            ScriptOp::ExpandAll => "expand_all",
            ScriptOp::Hide { .. } => "hide",
            ScriptOp::HidePositions { .. } => "hide_positions",
            ScriptOp::Show { .. } => "show",
            ScriptOp::ShowAll => "show_all",
            ScriptOp::GridHide { .. } => "grid_hide",
            ScriptOp::GridShow { .. } => "grid_show",
            ScriptOp::Reorder { .. } => "reorder",
            ScriptOp::ReorderGroup { .. } => "reorder_group",
            ScriptOp::ResetOrder => "reset_order",
        }
    }
}

impl Script {
    pub fn from_json(contents: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ScriptError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a `.toml` or JSON script (JSON for any other extension).
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let contents = fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml(&contents)
        } else {
            Self::from_json(&contents)
        }
    }
}

/// Outcome of one script step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// 1-based, as shown to users
    pub step: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<String>,
}

pub struct Replay {
    pub header: GroupHeader<AxisView>,
    pub steps: Vec<StepReport>,
    events: Rc<Cell<usize>>,
}

impl Replay {
    pub fn new(axis: Axis, axis_len: usize, settings: GroupSettings) -> Self {
        let mut header = GroupHeader::with_settings(axis, AxisView::new(axis_len), settings);
        let events = Rc::new(Cell::new(0));
        let counter = Rc::clone(&events);
        header.set_event_callback(Box::new(move |event| {
            tracing::debug!("event {:?}", event);
            counter.set(counter.get() + 1);
        }));
        Self { header, steps: Vec::new(), events }
    }

    /// Events emitted so far.
    pub fn events(&self) -> usize {
        self.events.get()
    }

    pub fn rejected(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.rejected.is_some())
    }

    /// Apply one operation. Engine rejections are recorded, not returned;
    /// only script mistakes (unknown group names) are errors.
    pub fn apply(&mut self, op: &ScriptOp) -> Result<(), ScriptError> {
        let step = self.steps.len() + 1;
        let outcome = self.dispatch(step, op)?;
        let rejected = match outcome {
            Ok(()) => None,
            Err(e) => {
                tracing::info!("step {} ({}) rejected: {}", step, op.name(), e);
                Some(e.to_string())
            }
        };
        self.steps.push(StepReport { step, op: op.name(), rejected });
        Ok(())
    }

    fn resolve(&self, step: usize, name: &str) -> Result<GroupId, ScriptError> {
        self.header
            .group_by_name(name)
            .map(|g| g.id())
            .ok_or_else(|| ScriptError::UnknownName { step, name: name.to_string() })
    }

    fn dispatch(&mut self, step: usize, op: &ScriptOp) -> Result<GroupResult<()>, ScriptError> {
        let outcome = match op {
            ScriptOp::AddGroup { name, start, span } => self.header.add_group(name.as_str(), *start, *span).map(drop),
            ScriptOp::GroupSelection { name, positions } => {
                self.header.create_group_from_selection(name.as_str(), positions).map(drop)
            }
            ScriptOp::RemoveGroup { group } => {
                let id = self.resolve(step, group)?;
                self.header.remove_group(id)
            }
            ScriptOp::ClearGroups => {
                self.header.clear_all_groups();
                Ok(())
            }
            ScriptOp::AddPositions { group, positions } => {
                let id = self.resolve(step, group)?;
                self.header.add_positions_to_group(id, positions)
            }
            ScriptOp::RemovePositions { group, positions } => {
                let id = self.resolve(step, group)?;
                self.header.remove_positions_from_group(id, positions)
            }
            ScriptOp::Unbreakable { position, value } => self.header.set_group_unbreakable(*position, *value).map(drop),
            ScriptOp::AddStatic { group, indices } => {
                let id = self.resolve(step, group)?;
                self.header.add_static_indexes(id, indices)
            }
            ScriptOp::RemoveStatic { group, indices } => {
                let id = self.resolve(step, group)?;
                self.header.remove_static_indexes(id, indices)
            }
            ScriptOp::Rename { group, to } => {
                let id = self.resolve(step, group)?;
                self.header.rename_group(id, to.as_str())
            }
            ScriptOp::Merge { into, from } => {
                let into = self.resolve(step, into)?;
                let from = self.resolve(step, from)?;
                self.header.merge_groups(into, from)
            }
            ScriptOp::Split { group, position } => {
                let id = self.resolve(step, group)?;
                self.header.split_group(id, *position).map(|split| {
                    if split.is_none() {
                        tracing::info!("step {}: split at the group start leaves one group", step);
                    }
                })
            }
            ScriptOp::Collapse { group } => {
                let id = self.resolve(step, group)?;
                self.header.collapse(id).map(drop)
            }
            ScriptOp::Expand { group } => {
                let id = self.resolve(step, group)?;
                self.header.expand(id).map(drop)
            }
            ScriptOp::Toggle { position } => self.header.toggle_at(*position).map(drop),
            ScriptOp::CollapseAll => {
                self.header.collapse_all();
                Ok(())
            }
            ScriptOp::ExpandAll => {
                self.header.expand_all();
                Ok(())
            }
            ScriptOp::Hide { indices } => self.header.hide_indices(indices),
            ScriptOp::HidePositions { positions } => self.header.hide_positions(positions),
            ScriptOp::Show { indices } => self.header.show_indices(indices),
            ScriptOp::ShowAll => {
                self.header.show_all();
                Ok(())
            }
            ScriptOp::GridHide { indices } => grid_visibility(&mut self.header, indices, true),
            ScriptOp::GridShow { indices } => grid_visibility(&mut self.header, indices, false),
            ScriptOp::Reorder { positions, destination } => self.header.reorder(positions, *destination).map(|outcome| {
                if let ReorderOutcome::Regrouped(transfers) = outcome {
                    tracing::info!("step {}: {} index(es) changed group", step, transfers.len());
                }
            }),
            ScriptOp::ReorderGroup { group, destination } => {
                let id = self.resolve(step, group)?;
                self.header.reorder_group(id, *destination).map(drop)
            }
            ScriptOp::ResetOrder => {
                self.header.reset_reorder();
                Ok(())
            }
        };
        Ok(outcome)
    }

    /// Header as text: one line per projected cell, then the hidden set and
    /// the order when it differs from identity.
    pub fn render(&self) -> String {
        render_header(&self.header)
    }
}

/// Change visibility directly on the converter, then notify the header.
fn grid_visibility(header: &mut GroupHeader<AxisView>, indices: &[usize], hide: bool) -> GroupResult<()> {
    let count = header.converter().index_count();
    if let Some(&bad) = indices.iter().find(|&&i| i >= count) {
        return Err(GroupError::InvalidIndex(bad));
    }
    let set: BTreeSet<usize> = indices.iter().copied().collect();
    if hide {
        header.converter_mut().request_hide(&set);
        header.on_indices_hidden(indices);
    } else {
        header.converter_mut().request_show(&set);
        header.on_indices_shown(indices);
    }
    Ok(())
}

/// Run every step of `script` with `settings`.
pub fn run(script: &Script, settings: GroupSettings) -> Result<Replay, ScriptError> {
    let mut replay = Replay::new(script.axis, script.axis_len, settings);
    for op in &script.ops {
        replay.apply(op)?;
    }
    tracing::info!(
        "replayed {} step(s), {} rejected, {} event(s)",
        replay.steps.len(),
        replay.rejected().count(),
        replay.events()
    );
    Ok(replay)
}

pub fn render_header(header: &GroupHeader<AxisView>) -> String {
    let mut out = String::new();
    for cell in header.projection().project_all() {
        let range = if cell.span == 1 {
            format!("{}", cell.origin_position)
        } else {
            format!("{}..{}", cell.origin_position, cell.end_position())
        };
        let label = match &cell.label {
            HeaderLabel::Group(name) => {
                let collapsed = cell.group.and_then(|id| header.group(id)).is_some_and(|g| g.is_collapsed());
                format!("{} [{}]", name, if collapsed { '+' } else { '-' })
            }
            HeaderLabel::Index(index) => format!("#{}", index),
        };
        let _ = writeln!(out, "{:>9}  {}", range, label);
    }

    let view = header.converter();
    let hidden = view.hidden_indices();
    if !hidden.is_empty() {
        let _ = writeln!(out, "hidden: {:?}", hidden);
    }
    if view.is_reordered() {
        let _ = writeln!(out, "order: {:?}", view.order());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridgroup_config::EdgePreference;

    const PERSON_ADDRESS: &str = r#"{
        "axis_len": 12,
        "ops": [
            { "op": "add_group", "name": "Person", "start": 0, "span": 4 },
            { "op": "add_group", "name": "Address", "start": 4, "span": 4 },
            { "op": "add_static", "group": "Address", "indices": [5, 6] },
            { "op": "collapse", "group": "Address" }
        ]
    }"#;

    #[test]
    fn test_parse_json_script() {
        let script = Script::from_json(PERSON_ADDRESS).unwrap();
        assert_eq!(script.axis, Axis::Column);
        assert_eq!(script.axis_len, 12);
        assert_eq!(script.ops.len(), 4);
        assert_eq!(script.ops[3], ScriptOp::Collapse { group: "Address".into() });
    }

    #[test]
    fn test_parse_toml_script() {
        let script = Script::from_toml(
            r#"
axis = "row"
axis_len = 6

[settings.reorder]
edgeTieBreak = "end"

[[ops]]
op = "add_group"
name = "G"
start = 1
span = 3

[[ops]]
op = "unbreakable"
position = 1
"#,
        )
        .unwrap();
        assert_eq!(script.axis, Axis::Row);
        assert_eq!(script.ops[1], ScriptOp::Unbreakable { position: 1, value: true });
        assert_eq!(script.settings.unwrap().reorder.edge_tie_break, EdgePreference::End);
    }

    #[test]
    fn test_unknown_op_is_a_parse_error() {
        let err = Script::from_json(r#"{ "axis_len": 3, "ops": [{ "op": "explode" }] }"#).unwrap_err();
        assert!(matches!(err, ScriptError::Json(_)));
    }

    #[test]
    fn test_run_collapses_to_statics() {
        let script = Script::from_json(PERSON_ADDRESS).unwrap();
        let replay = run(&script, GroupSettings::default()).unwrap();
        assert_eq!(replay.rejected().count(), 0);
        assert_eq!(replay.header.converter().hidden_indices(), BTreeSet::from([4, 7]));
        assert!(replay.events() > 0);

        let text = replay.render();
        assert!(text.contains("0..3  Person [-]"), "{text}");
        assert!(text.contains("4..5  Address [+]"), "{text}");
        assert!(text.contains("hidden: {4, 7}"), "{text}");
    }

    #[test]
    fn test_rejections_are_recorded() {
        let mut replay = Replay::new(Axis::Column, 6, GroupSettings::default());
        replay.apply(&ScriptOp::AddGroup { name: "A".into(), start: 0, span: 3 }).unwrap();
        replay.apply(&ScriptOp::AddGroup { name: "B".into(), start: 2, span: 2 }).unwrap();

        let rejected: Vec<_> = replay.rejected().collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].step, 2);
        assert_eq!(rejected[0].op, "add_group");
        assert_eq!(replay.header.model().len(), 1);
    }

    #[test]
    fn test_unknown_group_name_is_fatal() {
        let mut replay = Replay::new(Axis::Column, 6, GroupSettings::default());
        let err = replay.apply(&ScriptOp::Collapse { group: "Nope".into() }).unwrap_err();
        assert!(matches!(err, ScriptError::UnknownName { step: 1, .. }));
        assert!(replay.steps.is_empty());
    }

    #[test]
    fn test_grid_hide_is_external() {
        let mut replay = Replay::new(Axis::Column, 6, GroupSettings::default());
        replay.apply(&ScriptOp::AddGroup { name: "G".into(), start: 1, span: 3 }).unwrap();
        replay.apply(&ScriptOp::GridHide { indices: vec![3] }).unwrap();
        replay.apply(&ScriptOp::Collapse { group: "G".into() }).unwrap();
        replay.apply(&ScriptOp::Expand { group: "G".into() }).unwrap();

        assert!(replay.header.ledger().is_externally_hidden(3));
        assert_eq!(replay.header.converter().hidden_indices(), BTreeSet::from([3]));

        replay.apply(&ScriptOp::GridHide { indices: vec![9] }).unwrap();
        assert_eq!(replay.rejected().count(), 1);
    }

    #[test]
    fn test_render_shows_order_after_reorder() {
        let mut replay = Replay::new(Axis::Column, 4, GroupSettings::default());
        replay.apply(&ScriptOp::Reorder { positions: vec![0], destination: 4 }).unwrap();
        let text = replay.render();
        assert!(text.contains("order: [1, 2, 3, 0]"), "{text}");
        assert!(text.lines().next().unwrap().ends_with("#1"), "{text}");
    }
}
