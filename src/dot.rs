//! Graphviz (DOT) rendering of decision diagrams.
//!
//! Terminal nodes are squares at the bottom, decision nodes are grouped by
//! variable level, high edges are solid and low edges are dashed. Complemented
//! low edges are dotted with a hollow circle at the head.
//!
//! ```
//! use theory_dd::bdd::Bdd;
//!
//! let bdd = Bdd::default();
//! let f = bdd.apply_and(bdd.mk_var(1), bdd.mk_var(2));
//! let dot = bdd.to_dot(&[f], &|v| format!("x{}", v)).unwrap();
//! assert!(dot.starts_with("graph {"));
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::bdd::Bdd;
use crate::reference::Ref;

#[derive(Debug, Clone)]
pub struct DotConfig {
    pub node_shape: &'static str,
    pub terminal_shape: &'static str,
    pub root_shape: &'static str,
    pub high_edge_style: &'static str,
    pub low_edge_style: &'static str,
    pub negated_edge_style: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "ellipse",
            terminal_shape: "square",
            root_shape: "rect",
            high_edge_style: "solid",
            low_edge_style: "dashed",
            negated_edge_style: "dotted",
        }
    }
}

/// Escapes a label for use inside a double-quoted DOT string.
pub fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Bdd {
    /// Renders the BDD rooted at `roots` with variable labels produced by `label`.
    pub fn to_dot(&self, roots: &[Ref], label: &dyn Fn(u32) -> String) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(roots, label, &DotConfig::default())
    }

    pub fn to_dot_with_config(
        &self,
        roots: &[Ref],
        label: &dyn Fn(u32) -> String,
        config: &DotConfig,
    ) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "graph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        writeln!(dot, "{{ rank=sink")?;
        writeln!(dot, "0 [shape={}, label=\"0\"];", config.terminal_shape)?;
        writeln!(dot, "1 [shape={}, label=\"1\"];", config.terminal_shape)?;
        writeln!(dot, "}}")?;

        let mut all_nodes: Vec<u32> = self.descendants(roots.iter().copied()).into_iter().collect();
        all_nodes.sort_unstable();

        let mut levels = BTreeMap::<u32, Vec<u32>>::new();
        for &id in all_nodes.iter() {
            if id == self.one.index() {
                continue;
            }
            levels.entry(self.variable(id)).or_default().push(id);
        }

        for (&var, level) in levels.iter() {
            writeln!(dot, "{{ rank=same")?;
            let text = escape_label(&label(var));
            for &id in level.iter() {
                writeln!(dot, "{} [label=\"{}\"];", id, text)?;
            }
            writeln!(dot, "}}")?;
        }

        for &id in all_nodes.iter() {
            if id == self.one.index() {
                continue;
            }

            let high = self.high(id);
            writeln!(dot, "{} -- {} [style={}];", id, high.index(), config.high_edge_style)?;

            let low = self.low(id);
            if low == self.zero {
                writeln!(dot, "{} -- 0 [style={}];", id, config.low_edge_style)?;
            } else if low.is_negated() {
                writeln!(
                    dot,
                    "{} -- {} [style={}, dir=forward, arrowhead=odot];",
                    id,
                    low.index(),
                    config.negated_edge_style
                )?;
            } else {
                writeln!(dot, "{} -- {} [style={}];", id, low.index(), config.low_edge_style)?;
            }
        }

        writeln!(dot, "{{ rank=source")?;
        for (i, root) in roots.iter().enumerate() {
            writeln!(dot, "r{} [shape={}, label=\"{}\"];", i, config.root_shape, root)?;
        }
        writeln!(dot, "}}")?;

        for (i, &root) in roots.iter().enumerate() {
            if root == self.zero {
                writeln!(dot, "r{} -- 0;", i)?;
            } else if root.is_negated() {
                writeln!(dot, "r{} -- {} [dir=forward, arrowhead=odot];", i, root.index())?;
            } else {
                writeln!(dot, "r{} -- {};", i, root.index())?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_to_dot_labels() {
        let bdd = Bdd::default();
        let f = bdd.apply_or(bdd.mk_var(1), -bdd.mk_var(2));

        let dot = bdd.to_dot(&[f], &|v| format!("(<= x{} 3)", v)).unwrap();
        println!("{}", dot);
        assert!(dot.starts_with("graph {"));
        assert!(dot.trim_end().ends_with('}'));
        assert!(dot.contains("label=\"(<= x1 3)\""));
        assert!(dot.contains("label=\"(<= x2 3)\""));
        assert!(dot.contains("rank=source"));
    }

    #[test]
    fn test_to_dot_constant() {
        let bdd = Bdd::default();

        let dot = bdd.to_dot(&[bdd.zero], &|v| v.to_string()).unwrap();
        assert!(dot.contains("r0 -- 0;"));
        let dot = bdd.to_dot(&[bdd.one], &|v| v.to_string()).unwrap();
        assert!(dot.contains("r0 -- 1;"));
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label("a\"b"), "a\\\"b");
        assert_eq!(escape_label("a\\b"), "a\\\\b");
    }
}
