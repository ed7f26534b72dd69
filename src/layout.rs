//! Parsing of tmux layout strings, and projection of parsed layouts onto a
//! flat widget description the front end can instantiate.
//!
//! tmux layout strings look like:
//!
//! ```text
//! f3b2,238x54,0,0{119x54,0,0,1,118x54,120,0,2}
//! ```
//!
//! a leading checksum, then a recursive tree of `WxH,X,Y` geometry nodes,
//! where a node is either a bare pane id (leaf), a `{…}` horizontal split
//! (panes side by side), or a `[…]` vertical split (panes stacked).
//!
//! The parser below carries an explicit cursor — each helper returns the
//! parsed value together with the unconsumed remainder of the string —
//! rather than mutating a shared index, so recursion is purely functional
//! and a partial parse can be resumed from any checkpoint.

use std::collections::BTreeMap;

use crate::error::{Result, TmuxError};
use crate::types::{LayoutTree, PaneId};

/// Parse a full `#{window_layout}` string (checksum included) into a tree.
pub fn parse_layout(layout: &str) -> Result<LayoutTree> {
    let comma = layout
        .find(',')
        .ok_or_else(|| TmuxError::LayoutMalformed(format!("missing checksum separator: {layout:?}")))?;
    let rest = &layout[comma + 1..];
    let (node, remainder) = parse_node(rest)?;
    if !remainder.is_empty() {
        return Err(TmuxError::LayoutMalformed(format!(
            "trailing data after layout tree: {remainder:?}"
        )));
    }
    Ok(node)
}

fn parse_node(s: &str) -> Result<(LayoutTree, &str)> {
    let (width, rest) = parse_number(s)?;
    let rest = expect_char(rest, 'x')?;
    let (height, rest) = parse_number(rest)?;
    let rest = expect_char(rest, ',')?;
    let (x, rest) = parse_number(rest)?;
    let rest = expect_char(rest, ',')?;
    let (y, rest) = parse_number(rest)?;

    match rest.chars().next() {
        Some('{') => {
            let (children, rest) = parse_children(&rest[1..], '}')?;
            Ok((
                LayoutTree::HorizontalSplit {
                    width,
                    height,
                    x,
                    y,
                    children,
                },
                rest,
            ))
        }
        Some('[') => {
            let (children, rest) = parse_children(&rest[1..], ']')?;
            Ok((
                LayoutTree::VerticalSplit {
                    width,
                    height,
                    x,
                    y,
                    children,
                },
                rest,
            ))
        }
        Some(',') => {
            let (pane_id, rest) = parse_pane_id(&rest[1..]);
            Ok((
                LayoutTree::Pane {
                    width,
                    height,
                    x,
                    y,
                    pane_id,
                },
                rest,
            ))
        }
        _ => Err(TmuxError::LayoutMalformed(format!(
            "expected '{{', '[' or ',' after geometry, found: {rest:?}"
        ))),
    }
}

fn parse_children(mut s: &str, closer: char) -> Result<(Vec<LayoutTree>, &str)> {
    let mut children = Vec::new();
    loop {
        let (child, rest) = parse_node(s)?;
        children.push(child);
        match rest.chars().next() {
            Some(',') => {
                s = &rest[1..];
            }
            Some(c) if c == closer => {
                return Ok((children, &rest[1..]));
            }
            _ => {
                return Err(TmuxError::LayoutMalformed(format!(
                    "expected ',' or '{closer}' in child list, found: {rest:?}"
                )));
            }
        }
    }
}

fn parse_number(s: &str) -> Result<(u32, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return Err(TmuxError::LayoutMalformed(format!(
            "expected a number, found: {s:?}"
        )));
    }
    let value = s[..end]
        .parse()
        .map_err(|_| TmuxError::LayoutMalformed(format!("number overflow: {:?}", &s[..end])))?;
    Ok((value, &s[end..]))
}

fn parse_pane_id(s: &str) -> (PaneId, &str) {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    (s[..end].to_string(), &s[end..])
}

fn expect_char(s: &str, c: char) -> Result<&str> {
    if s.starts_with(c) {
        Ok(&s[c.len_utf8()..])
    } else {
        Err(TmuxError::LayoutMalformed(format!(
            "expected '{c}', found: {s:?}"
        )))
    }
}

/// Widget kind for a node in the projected layout, mirroring the shape a
/// GTK/winit front end would instantiate (window → optional notebook →
/// nested paned containers → terminals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Window,
    Notebook,
    /// `[…]` — vertical split, stacked panes.
    VPaned,
    /// `{…}` — horizontal split, side-by-side panes.
    HPaned,
    Terminal,
}

/// One entry in the flat layout projection produced by [`project_layouts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetDescription {
    pub kind: WidgetKind,
    pub parent: Option<String>,
    pub order: u32,
    pub geometry: Option<(u32, u32, u32, u32)>,
    pub pane_id: Option<PaneId>,
}

/// Project a list of per-window layout trees (as returned by
/// `initial_layout`, one per line) onto a flat map of widget name to
/// description, ready for a GUI front end to instantiate.
///
/// A single window yields `window0` as the direct parent of its tree; more
/// than one window inserts a `notebook0` between `window0` and each
/// window's tree. A split with exactly one remaining child collapses into
/// that child rather than producing a degenerate paned widget. A split
/// with more than two children is right-nested into paned widgets of the
/// same orientation (`a | b | c` → `HPaned(a, HPaned(b, c))`), numbered in
/// depth-first pre-order via `order`.
pub fn project_layouts(windows: &[LayoutTree]) -> BTreeMap<String, WidgetDescription> {
    let mut out = BTreeMap::new();
    let mut order = 0u32;
    let mut paned_counter = 0u32;

    out.insert(
        "window0".to_string(),
        WidgetDescription {
            kind: WidgetKind::Window,
            parent: None,
            order,
            geometry: None,
            pane_id: None,
        },
    );
    order += 1;

    let root_parent = if windows.len() > 1 {
        out.insert(
            "notebook0".to_string(),
            WidgetDescription {
                kind: WidgetKind::Notebook,
                parent: Some("window0".to_string()),
                order,
                geometry: None,
                pane_id: None,
            },
        );
        order += 1;
        "notebook0".to_string()
    } else {
        "window0".to_string()
    };

    for window in windows {
        project_node(window, &root_parent, &mut out, &mut order, &mut paned_counter);
    }

    out
}

fn project_node(
    node: &LayoutTree,
    parent: &str,
    out: &mut BTreeMap<String, WidgetDescription>,
    order: &mut u32,
    paned_counter: &mut u32,
) {
    match node {
        LayoutTree::Pane {
            width,
            height,
            x,
            y,
            pane_id,
        } => {
            out.insert(
                format!("terminal{pane_id}"),
                WidgetDescription {
                    kind: WidgetKind::Terminal,
                    parent: Some(parent.to_string()),
                    order: *order,
                    geometry: Some((*width, *height, *x, *y)),
                    pane_id: Some(pane_id.clone()),
                },
            );
            *order += 1;
        }
        LayoutTree::HorizontalSplit { children, .. } => {
            project_split(children, parent, WidgetKind::HPaned, out, order, paned_counter)
        }
        LayoutTree::VerticalSplit { children, .. } => {
            project_split(children, parent, WidgetKind::VPaned, out, order, paned_counter)
        }
    }
}

fn project_split(
    children: &[LayoutTree],
    parent: &str,
    kind: WidgetKind,
    out: &mut BTreeMap<String, WidgetDescription>,
    order: &mut u32,
    paned_counter: &mut u32,
) {
    if children.len() == 1 {
        project_node(&children[0], parent, out, order, paned_counter);
        return;
    }

    let name = format!("paned{paned_counter}");
    *paned_counter += 1;
    out.insert(
        name.clone(),
        WidgetDescription {
            kind,
            parent: Some(parent.to_string()),
            order: *order,
            geometry: None,
            pane_id: None,
        },
    );
    *order += 1;

    project_node(&children[0], &name, out, order, paned_counter);
    if children.len() == 2 {
        project_node(&children[1], &name, out, order, paned_counter);
    } else {
        project_split(&children[1..], &name, kind, out, order, paned_counter);
    }
}
