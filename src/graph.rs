//! Turns a resolved `StenoRule` tree into a 2D character grid with per-cell
//! ownership metadata, so a caller can highlight any node's contribution by
//! reference string alone.

use crate::keys::STROKE_SEP;
use crate::rule::{RuleMapRead, StenoRule};
use std::collections::{HashMap, HashSet};

/// One printed character plus the bookkeeping needed to highlight it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridElement {
    pub ch: char,
    pub owner_ref: String,
    pub depth: usize,
    pub always_bold: bool,
    pub is_body: bool,
    pub trigger_set: HashSet<String>,
    blank: bool,
}

impl GridElement {
    fn blank() -> Self {
        Self {
            ch: ' ',
            owner_ref: String::new(),
            depth: 0,
            always_bold: false,
            is_body: false,
            trigger_set: HashSet::new(),
            blank: true,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.blank
    }
}

/// A mutable 2D grid of grid elements whose origin auto-expands in every
/// direction: writes at negative coordinates shift the whole grid and bump
/// an offset; writes past the far edge simply grow it.
#[derive(Debug, Clone)]
pub struct Canvas {
    grid: Vec<Vec<GridElement>>,
    row_offset: i64,
    col_offset: i64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self { grid: vec![vec![GridElement::blank()]], row_offset: 0, col_offset: 0 }
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Vec<GridElement>] {
        &self.grid
    }

    fn shift_rows(&mut self, n: usize) {
        self.row_offset += n as i64;
        let ncols = self.grid.first().map_or(1, |r| r.len());
        for _ in 0..n {
            self.grid.insert(0, vec![GridElement::blank(); ncols]);
        }
    }

    fn shift_cols(&mut self, n: usize) {
        self.col_offset += n as i64;
        for row in &mut self.grid {
            let mut padded = vec![GridElement::blank(); n];
            padded.append(row);
            *row = padded;
        }
    }

    fn ensure_size(&mut self, rows: usize, cols: usize) {
        let current_cols = self.grid.first().map_or(0, |r| r.len());
        if cols > current_cols {
            for row in &mut self.grid {
                row.resize_with(cols, GridElement::blank);
            }
        }
        while self.grid.len() < rows {
            let width = self.grid.first().map_or(cols, |r| r.len());
            self.grid.push(vec![GridElement::blank(); width]);
        }
    }

    fn resolve(&mut self, row: i64, col: i64) -> (usize, usize) {
        let mut row = row + self.row_offset;
        if row < 0 {
            self.shift_rows((-row) as usize);
            row = 0;
        }
        let mut col = col + self.col_offset;
        if col < 0 {
            self.shift_cols((-col) as usize);
            col = 0;
        }
        self.ensure_size(row as usize + 1, col as usize + 1);
        (row as usize, col as usize)
    }

    pub fn write(&mut self, el: GridElement, row: i64, col: i64) {
        let (r, c) = self.resolve(row, col);
        self.grid[r][c] = el;
    }

    /// Write a contiguous run of cells starting at `(row, col)`.
    pub fn write_row(&mut self, els: impl IntoIterator<Item = GridElement>, row: i64, col: i64) {
        for (i, el) in els.into_iter().enumerate() {
            self.write(el, row, col + i as i64);
        }
    }

    /// Replace every still-blank cell in the row with `repl` — used for
    /// separator rows, whose body spans the whole grid regardless of what
    /// else has been drawn there.
    pub fn replace_empty(&mut self, repl: GridElement, row: i64) {
        let (r, _) = self.resolve(row, 0);
        for cell in &mut self.grid[r] {
            if cell.is_blank() {
                *cell = repl.clone();
            }
        }
    }
}

/// One node of the rendered tree: a rule's display text plus where it
/// attaches to its parent's text and its own children.
pub struct GraphNode {
    pub ref_id: String,
    pub rule: StenoRule,
    pub attach_start: usize,
    pub attach_length: usize,
    pub children: Vec<GraphNode>,
}

impl GraphNode {
    fn is_separator(&self) -> bool {
        self.rule.id == "separator"
    }

    fn display_text(&self) -> &str {
        if self.is_separator() {
            ""
        } else if self.rule.is_leaf() {
            &self.rule.keys
        } else {
            &self.rule.letters
        }
    }

    fn always_bold(&self) -> bool {
        !self.is_separator() && self.rule.is_leaf()
    }
}

struct IdGen(u64);

impl IdGen {
    fn new() -> Self {
        Self(0)
    }

    fn next(&mut self) -> String {
        let id = self.0;
        self.0 += 1;
        format!("n{}", id)
    }
}

fn build_node(
    rule: &StenoRule,
    library: &HashMap<String, StenoRule>,
    idgen: &mut IdGen,
    attach_start: usize,
    attach_length: usize,
) -> GraphNode {
    let mut children = Vec::new();
    if rule.id != "separator" {
        for item in rule.rulemap.items() {
            if item.rule_id == "separator" {
                let separator_rule = StenoRule::new(
                    "separator",
                    STROKE_SEP.to_string(),
                    "",
                    Default::default(),
                    "",
                    Default::default(),
                );
                children.push(GraphNode {
                    ref_id: idgen.next(),
                    rule: separator_rule,
                    attach_start: item.start,
                    attach_length: item.length,
                    children: Vec::new(),
                });
                continue;
            }
            if item.length == 0 {
                continue;
            }
            if let Some(child_rule) = library.get(&item.rule_id) {
                children.push(build_node(child_rule, library, idgen, item.start, item.length));
            }
        }
    }
    GraphNode { ref_id: idgen.next(), rule: rule.clone(), attach_start, attach_length, children }
}

/// Build the display tree for `rule`, resolving its rulemap's child ids
/// against `library`.
pub fn build_tree(rule: &StenoRule, library: &HashMap<String, StenoRule>) -> GraphNode {
    let mut idgen = IdGen::new();
    build_node(rule, library, &mut idgen, 0, rule.letters.chars().count())
}

/// Row-assignment strategy: `compressed` lets unrelated same-depth subtrees
/// reuse a row (the default, and the only mode that keeps the grid compact);
/// `compatibility` instead hands every node a strictly increasing row of its
/// own, so no two nodes ever share a line.
struct RowPlan {
    compatibility: bool,
    next_row: i64,
}

impl RowPlan {
    fn body_row(&mut self, depth: usize, parent_body_row: i64) -> i64 {
        if self.compatibility {
            let row = self.next_row;
            self.next_row += 1;
            row
        } else if depth == 0 {
            parent_body_row
        } else {
            parent_body_row + 2
        }
    }
}

fn write_node(
    canvas: &mut Canvas,
    node: &GraphNode,
    parent_body_row: i64,
    parent_left: i64,
    depth: usize,
    ancestors: &[String],
    plan: &mut RowPlan,
) -> HashMap<i64, HashSet<String>> {
    let left = parent_left + node.attach_start as i64;
    let own_row = plan.body_row(depth, parent_body_row);

    if node.is_separator() {
        let mut trigger_set: HashSet<String> = ancestors.iter().cloned().collect();
        trigger_set.insert(node.ref_id.clone());
        let elem = GridElement {
            ch: STROKE_SEP,
            owner_ref: node.ref_id.clone(),
            depth,
            always_bold: false,
            is_body: true,
            trigger_set,
            blank: false,
        };
        // `replace_empty` only touches cells the canvas already has; force it
        // to grow out to this node's own span first so a separator with
        // nothing drawn past it yet still gets a column to fill.
        let width = node.attach_length.max(1) as i64;
        canvas.write(GridElement::blank(), own_row, left + width - 1);
        canvas.replace_empty(elem, own_row);
        return HashMap::new();
    }

    let mut child_ancestors = ancestors.to_vec();
    child_ancestors.push(node.ref_id.clone());

    let mut successors: HashMap<i64, HashSet<String>> = HashMap::new();
    // Compatibility mode gives every node a distinct row with no fixed gap
    // between parent and child, so there's no stable row left to draw a
    // connector into; it relies on tabular structure instead.
    let connector_row = (!plan.compatibility).then_some(own_row + 1);
    for child in &node.children {
        let child_successors = write_node(canvas, child, own_row, left, depth + 1, &child_ancestors, plan);
        let child_left = left + child.attach_start as i64;

        let mut connector_triggers: HashSet<String> = HashSet::new();
        connector_triggers.insert(child.ref_id.clone());
        for set in child_successors.values() {
            connector_triggers.extend(set.iter().cloned());
        }
        if let Some(connector_row) = connector_row {
            let width = child.attach_length.max(1);
            let cells = (0..width).map(|_| GridElement {
                ch: '\u{2502}',
                owner_ref: child.ref_id.clone(),
                depth,
                always_bold: false,
                is_body: false,
                trigger_set: connector_triggers.clone(),
                blank: false,
            });
            canvas.write_row(cells, connector_row, child_left);
        }

        for (col, set) in child_successors {
            successors.entry(col).or_default().extend(set);
        }
    }

    let text = node.display_text();
    let always_bold = node.always_bold();
    let body_cells: Vec<GridElement> = text
        .chars()
        .enumerate()
        .map(|(i, ch)| {
            let col = left + i as i64;
            let mut trigger_set: HashSet<String> = successors.get(&col).cloned().unwrap_or_default();
            trigger_set.insert(node.ref_id.clone());
            trigger_set.extend(ancestors.iter().cloned());
            GridElement {
                ch,
                owner_ref: node.ref_id.clone(),
                depth,
                always_bold,
                is_body: true,
                trigger_set,
                blank: false,
            }
        })
        .collect();
    canvas.write_row(body_cells, own_row, left);

    let mut result = successors;
    for i in 0..text.chars().count().max(node.attach_length) {
        let col = left + i as i64;
        result.entry(col).or_default().insert(node.ref_id.clone());
    }
    result
}

/// The rendered tree: a canvas plus an index from reference string to node,
/// letting a caller draw or inspect any node by ref alone.
pub struct GraphTree {
    canvas: Canvas,
    nodes: HashMap<String, StenoRule>,
    order: Vec<String>,
    root_ref: String,
    tabular: bool,
}

fn index_nodes(node: &GraphNode, nodes: &mut HashMap<String, StenoRule>, order: &mut Vec<String>) {
    order.push(node.ref_id.clone());
    nodes.insert(node.ref_id.clone(), node.rule.clone());
    for child in &node.children {
        index_nodes(child, nodes, order);
    }
}

impl GraphTree {
    /// Lay out `rule`'s resolved tree onto a fresh canvas. `compressed`
    /// (the usual case) lets disjoint same-depth subtrees share a row;
    /// `compatibility` instead gives every node its own row.
    pub fn new(
        rule: &StenoRule,
        library: &HashMap<String, StenoRule>,
        compressed: bool,
        compatibility: bool,
    ) -> Self {
        let root = build_tree(rule, library);
        let mut canvas = Canvas::new();
        let tabular = compatibility || !compressed;
        let mut plan = RowPlan { compatibility: tabular, next_row: 0 };
        write_node(&mut canvas, &root, 0, 0, 0, &[], &mut plan);
        let mut nodes = HashMap::new();
        let mut order = Vec::new();
        index_nodes(&root, &mut nodes, &mut order);
        let root_ref = root.ref_id.clone();
        GraphTree { canvas, nodes, order, root_ref, tabular }
    }

    pub fn root_ref(&self) -> &str {
        &self.root_ref
    }

    pub fn get(&self, node_ref: &str) -> Option<&StenoRule> {
        self.nodes.get(node_ref)
    }

    pub fn iter_refs(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn caption(&self, node_ref: &str) -> String {
        let Some(rule) = self.nodes.get(node_ref) else { return String::new() };
        if node_ref == self.root_ref {
            return rule.description.clone();
        }
        if !rule.is_leaf() && !rule.letters.is_empty() {
            format!("{} \u{2192} {}: {}", rule.keys, rule.letters, rule.description)
        } else {
            format!("{}: {}", rule.keys, rule.description)
        }
    }

    /// Render the tree as plain text, marking every cell whose trigger set
    /// contains `node_ref` with a bracketed highlight. `intense` widens the
    /// marker so nested highlights remain visible; this is a text/markup
    /// surface, not SVG or HTML — actual color output belongs to a renderer
    /// this crate doesn't provide. In compatibility mode each row comes out
    /// as tab-separated highlight runs (a caller lays these into real table
    /// cells); otherwise rows are one preformatted monospace line each.
    pub fn draw(&self, node_ref: &str, intense: bool) -> String {
        let mut out = String::new();
        for row in self.canvas.rows() {
            out.push_str(&self.render_row(row, node_ref, intense));
            out.push('\n');
        }
        out
    }

    fn render_row(&self, row: &[GridElement], node_ref: &str, intense: bool) -> String {
        let (open, close) = if intense { ("[[", "]]") } else { ("[", "]") };
        if !self.tabular {
            let mut line = String::new();
            for cell in row {
                let (lit, bold, ch) = Self::cell_state(cell, node_ref);
                if lit {
                    line.push_str(open);
                    if bold {
                        line.push('*');
                    }
                    line.push(ch);
                    line.push_str(close);
                } else {
                    line.push(ch);
                }
            }
            return line;
        }

        let mut fields = Vec::new();
        let mut run: Option<(bool, bool, String)> = None;
        for cell in row {
            let (lit, bold, ch) = Self::cell_state(cell, node_ref);
            match &mut run {
                Some((run_lit, run_bold, text)) if *run_lit == lit && *run_bold == bold => text.push(ch),
                _ => {
                    if let Some((lit, bold, text)) = run.take() {
                        fields.push(Self::wrap_field(&text, lit, bold, open, close));
                    }
                    run = Some((lit, bold, ch.to_string()));
                }
            }
        }
        if let Some((lit, bold, text)) = run {
            fields.push(Self::wrap_field(&text, lit, bold, open, close));
        }
        fields.join("\t")
    }

    fn cell_state(cell: &GridElement, node_ref: &str) -> (bool, bool, char) {
        if cell.is_blank() {
            return (false, false, ' ');
        }
        let lit = cell.trigger_set.contains(node_ref);
        let bold = cell.always_bold || (lit && cell.is_body && cell.owner_ref == node_ref);
        (lit, bold, cell.ch)
    }

    fn wrap_field(text: &str, lit: bool, bold: bool, open: &str, close: &str) -> String {
        if !lit {
            return text.to_string();
        }
        let mut s = String::from(open);
        if bold {
            s.push('*');
        }
        s.push_str(text);
        s.push_str(close);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RuleMap, RuleMapBuilder, RuleMapWrite};
    use std::collections::HashSet as StdHashSet;

    fn leaf(id: &str, keys: &str, letters: &str) -> StenoRule {
        StenoRule::new(id, keys, letters, StdHashSet::new(), format!("{} description", id), RuleMap::empty())
    }

    #[test]
    fn scenario_8_graph_highlight() {
        let mut library = HashMap::new();
        library.insert("CHILD".to_string(), leaf("CHILD", "ABC", "llo"));

        let mut builder = RuleMapBuilder::new();
        builder.add("CHILD", 2, 3).unwrap();
        let root = StenoRule::new(
            "ROOT",
            "HELO",
            "hello",
            StdHashSet::new(),
            "root description",
            builder.freeze(),
        );

        let tree = GraphTree::new(&root, &library, true, false);
        let child_ref = tree.iter_refs().find(|r| *r != tree.root_ref()).unwrap().to_string();

        let drawn = tree.draw(&child_ref, false);
        // CHILD is a leaf, so its own row shows its chord keys ("ABC"), bold
        // because leaf chords are always bold, under columns 2..5 of the
        // parent's letter row.
        assert!(drawn.contains("[*A][*B][*C]"));
        assert_eq!(tree.get(&child_ref).unwrap().id, "CHILD");
    }

    #[test]
    fn root_leaf_renders_its_own_keys() {
        // A root with no children is itself a leaf, so it shows its chord
        // keys rather than its letters.
        let root = leaf("A", "A", "a");
        let library = HashMap::new();
        let tree = GraphTree::new(&root, &library, true, false);
        let drawn = tree.draw(tree.root_ref(), false);
        let first_line = drawn.lines().next().unwrap();
        assert!(first_line.contains('A'));
    }

    #[test]
    fn caption_root_uses_bare_description() {
        let root = leaf("A", "A", "a");
        let library = HashMap::new();
        let tree = GraphTree::new(&root, &library, true, false);
        assert_eq!(tree.caption(tree.root_ref()), "A description");
    }

    #[test]
    fn caption_leaf_rule_includes_keys() {
        let mut library = HashMap::new();
        library.insert("CHILD".to_string(), leaf("CHILD", "ABC", "llo"));
        let mut builder = RuleMapBuilder::new();
        builder.add("CHILD", 2, 3).unwrap();
        let root = StenoRule::new("ROOT", "HELO", "hello", StdHashSet::new(), "root", builder.freeze());
        let tree = GraphTree::new(&root, &library, true, false);
        let child_ref = tree.iter_refs().find(|r| *r != tree.root_ref()).unwrap().to_string();
        assert_eq!(tree.caption(&child_ref), "ABC: CHILD description");
    }

    #[test]
    fn separator_rule_fills_its_row() {
        // A real child keeps ROOT from being its own leaf (which would show
        // its keys, "HEL/LO", and let the '/' sneak in from that text
        // instead of from the separator's own row).
        let mut library = HashMap::new();
        library.insert("H1".to_string(), leaf("H1", "HEL", "hel"));
        let mut builder = RuleMapBuilder::new();
        builder.add("H1", 0, 3).unwrap();
        builder.add("separator", 3, 0).unwrap();
        let root = StenoRule::new("ROOT", "HEL/LO", "hello", StdHashSet::new(), "root", builder.freeze());
        let tree = GraphTree::new(&root, &library, true, false);
        assert!(tree.draw(tree.root_ref(), false).contains('/'));
    }

    #[test]
    fn compatibility_mode_gives_every_node_a_distinct_row() {
        let mut library = HashMap::new();
        library.insert("CHILD".to_string(), leaf("CHILD", "ABC", "llo"));
        let mut builder = RuleMapBuilder::new();
        builder.add("CHILD", 2, 3).unwrap();
        let root = StenoRule::new("ROOT", "HELO", "hello", StdHashSet::new(), "root", builder.freeze());
        let tree = GraphTree::new(&root, &library, true, true);
        assert_eq!(tree.canvas.rows().len(), 2);
    }

    #[test]
    fn compatibility_mode_draws_tab_separated_rows() {
        let mut library = HashMap::new();
        library.insert("CHILD".to_string(), leaf("CHILD", "ABC", "llo"));
        let mut builder = RuleMapBuilder::new();
        builder.add("CHILD", 2, 3).unwrap();
        let root = StenoRule::new("ROOT", "HELO", "hello", StdHashSet::new(), "root", builder.freeze());

        let compact = GraphTree::new(&root, &library, true, false);
        let tabular = GraphTree::new(&root, &library, true, true);
        let root_ref = compact.root_ref().to_string();

        assert!(!compact.draw(&root_ref, false).contains('\t'));
        assert!(tabular.draw(tabular.root_ref(), false).contains('\t'));
    }
}
