//! Structural dump of a tree, for debugging and tests.

use std::fmt;

use super::{NodeId, RadixTree};

impl<V: fmt::Debug> fmt::Debug for RadixTree<V> {
    /// Prints one node per line, indented by depth. Compressed runs are
    /// quoted, branch edge sets are bracketed, `*` marks key nodes, and
    /// `=` shows the stored value. Branch children appear in edge order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "RadixTree {{ keys: {}, nodes: {} }}",
            self.num_elements, self.num_nodes
        )?;
        let mut pending: Vec<(NodeId, usize)> = vec![(self.root_id(), 0)];
        while let Some((id, depth)) = pending.pop() {
            let node = self.node(id);
            write!(f, "{:indent$}", "", indent = depth * 2)?;
            if node.is_compressed {
                write!(f, "\"")?;
                write_escaped(f, &node.edges)?;
                write!(f, "\"")?;
            } else {
                write!(f, "[")?;
                write_escaped(f, &node.edges)?;
                write!(f, "]")?;
            }
            if node.is_key {
                write!(f, " *")?;
            }
            if let Some(value) = &node.value {
                write!(f, " = {value:?}")?;
            }
            writeln!(f)?;
            for &child in node.children.iter().rev() {
                pending.push((child, depth + 1));
            }
        }
        Ok(())
    }
}

impl<V: fmt::Debug> RadixTree<V> {
    /// Renders the structural dump into a string.
    pub fn dump(&self) -> String {
        format!("{self:?}")
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for &b in bytes {
        for c in std::ascii::escape_default(b) {
            write!(f, "{}", c as char)?;
        }
    }
    Ok(())
}
