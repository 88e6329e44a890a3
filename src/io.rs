//! Plain-text serialization of a BDD.
//!
//! ```text
//! bdd <nodes> <vars>
//! <id> <var> <low> <high>
//! ...
//! root <ref>
//! ```
//!
//! Ids are local to the dump: `1` is the terminal and decision nodes are
//! numbered from `2` in bottom-up order, so every edge points to a line above.
//! Edges are signed: a negative edge is complemented.

use std::collections::HashMap;

use log::debug;

use crate::bdd::Bdd;
use crate::error::{Result, TddError};
use crate::reference::Ref;

impl Bdd {
    /// Serializes the function `f` (over `num_vars` variables).
    pub fn dump(&self, f: Ref, num_vars: usize) -> String {
        let mut order = Vec::new();
        let mut ids = HashMap::new();
        ids.insert(self.one.index(), 1i32);
        self.post_order(f, &mut ids, &mut order);

        let local = |r: Ref| -> i32 {
            let id = ids[&r.index()];
            if r.is_negated() {
                -id
            } else {
                id
            }
        };

        let mut out = format!("bdd {} {}\n", order.len(), num_vars);
        for &i in &order {
            out.push_str(&format!(
                "{} {} {} {}\n",
                ids[&i],
                self.variable(i),
                local(self.low(i)),
                local(self.high(i))
            ));
        }
        out.push_str(&format!("root {}\n", local(f)));
        out
    }

    fn post_order(&self, node: Ref, ids: &mut HashMap<u32, i32>, order: &mut Vec<u32>) {
        let i = node.index();
        if ids.contains_key(&i) {
            return;
        }
        self.post_order(self.low(i), ids, order);
        self.post_order(self.high(i), ids, order);
        ids.insert(i, order.len() as i32 + 2);
        order.push(i);
    }

    /// Rebuilds a dumped function in this manager.
    ///
    /// Returns the root and the number of variables recorded in the header.
    pub fn restore(&self, text: &str) -> Result<(Ref, usize)> {
        let (num_nodes, num_vars) = parse_header(text, "bdd")?;
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty()).skip(1);

        let mut refs: Vec<Ref> = Vec::new();
        refs.push(self.zero); // unused slot 0
        refs.push(self.one);
        let lookup = |refs: &[Ref], id: i32| -> Result<Ref> {
            let r = refs
                .get(id.unsigned_abs() as usize)
                .copied()
                .filter(|_| id != 0)
                .ok_or_else(|| TddError::Parse(format!("dangling node reference {}", id)))?;
            Ok(if id < 0 { -r } else { r })
        };

        for _ in 0..num_nodes {
            let line = lines.next().ok_or_else(|| TddError::Parse("truncated diagram dump".to_string()))?;
            let fields: Vec<i64> = line.split_whitespace().map(parse_number).collect::<Result<_>>()?;
            if fields.len() != 4 || fields[0] != refs.len() as i64 {
                return Err(TddError::Parse(format!("invalid node line: '{}'", line)));
            }
            let var = u32::try_from(fields[1])
                .ok()
                .filter(|&v| v >= 1 && v as usize <= num_vars)
                .ok_or_else(|| TddError::Parse(format!("variable out of range in '{}'", line)))?;
            let edge = |field: i64| {
                i32::try_from(field).map_err(|_| TddError::Parse(format!("node reference out of range in '{}'", line)))
            };
            let low = lookup(&refs, edge(fields[2])?)?;
            let high = lookup(&refs, edge(fields[3])?)?;
            refs.push(self.mk_node(var, low, high));
        }

        let root = match lines.next().map(|line| line.split_whitespace().collect::<Vec<_>>()) {
            Some(fields) if fields.len() == 2 && fields[0] == "root" => lookup(&refs, parse_number(fields[1])?)?,
            _ => return Err(TddError::Parse("missing root line".to_string())),
        };
        debug!("restored BDD with {} nodes over {} variables", num_nodes, num_vars);
        Ok((root, num_vars))
    }
}

/// Reads the `<variant> <nodes> <vars>` header line of a dump.
pub fn parse_header(text: &str, variant: &str) -> Result<(usize, usize)> {
    let header = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| TddError::Parse("empty diagram dump".to_string()))?;
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != 3 || fields[0] != variant {
        return Err(TddError::Parse(format!("invalid {} dump header: '{}'", variant, header)));
    }
    Ok((parse_number(fields[1])?, parse_number(fields[2])?))
}

pub(crate) fn parse_number<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.parse().map_err(|_| TddError::Parse(format!("invalid number '{}'", s)))
}
