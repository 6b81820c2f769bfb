//! Outline repair and structural matching.

use crate::types::OutlineNode;

use super::normalize::normalize_text;

/// One outline node in document order after repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatNode {
    /// Normalized title used as the match key.
    pub key: String,
    /// Repaired level.
    pub level: u8,
    /// Target page.
    pub page: Option<u32>,
}

/// Repairs levels so that every child sits exactly one level below its parent.
///
/// Explicit children take `parent + 1`. Top-level nodes keep their declared
/// level but may rise at most one level above the preceding node, which also
/// repairs flat lists such as `[1, 2, 4]` into `[1, 2, 3]`. The tree is then
/// rebuilt from the repaired levels.
#[must_use]
pub fn repair(nodes: &[OutlineNode]) -> Vec<OutlineNode> {
    let mut flat = Vec::new();
    let mut previous = 0_u8;
    for node in nodes {
        let level = node.level.max(1).min(previous.saturating_add(1));
        push_subtree(node, level, &mut flat);
        previous = flat.last().map_or(level, |(_, l, _)| *l);
    }
    OutlineNode::build_tree(flat)
}

fn push_subtree(node: &OutlineNode, level: u8, out: &mut Vec<(String, u8, Option<u32>)>) {
    out.push((node.title.clone(), level, node.page));
    for child in &node.children {
        push_subtree(child, level.saturating_add(1), out);
    }
}

/// Flattens a (repaired) tree in document order with normalized keys.
#[must_use]
pub fn flatten(nodes: &[OutlineNode]) -> Vec<FlatNode> {
    fn walk(nodes: &[OutlineNode], out: &mut Vec<FlatNode>) {
        for node in nodes {
            out.push(FlatNode {
                key: normalize_text(&node.title),
                level: node.level,
                page: node.page,
            });
            walk(&node.children, out);
        }
    }
    let mut out = Vec::new();
    walk(nodes, &mut out);
    out
}

/// Pairing of primary and validator outline nodes.
#[derive(Debug, Default)]
pub struct OutlineMatch {
    /// `(primary index, validator index)` pairs, in primary order.
    pub matched: Vec<(usize, usize)>,
    /// Primary nodes with no counterpart.
    pub primary_only: Vec<usize>,
    /// Validator nodes with no counterpart.
    pub validator_only: Vec<usize>,
}

/// Matches nodes by `(key, page)`, falling back to the key alone when either
/// side has no page. Each validator node is used at most once.
#[must_use]
pub fn match_nodes(primary: &[FlatNode], validator: &[FlatNode]) -> OutlineMatch {
    let mut used = vec![false; validator.len()];
    let mut result = OutlineMatch::default();

    for (pi, p) in primary.iter().enumerate() {
        let exact = validator
            .iter()
            .enumerate()
            .position(|(vi, v)| !used[vi] && v.key == p.key && v.page == p.page);
        let found = exact.or_else(|| {
            validator
                .iter()
                .enumerate()
                .position(|(vi, v)| !used[vi] && v.key == p.key && (v.page.is_none() || p.page.is_none()))
        });

        match found {
            Some(vi) => {
                used[vi] = true;
                result.matched.push((pi, vi));
            }
            None => result.primary_only.push(pi),
        }
    }

    result.validator_only = used
        .iter()
        .enumerate()
        .filter_map(|(vi, &u)| (!u).then_some(vi))
        .collect();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(nodes: &[OutlineNode]) -> Vec<u8> {
        flatten(nodes).iter().map(|n| n.level).collect()
    }

    #[test]
    fn test_repairs_skipped_level_in_tree() {
        let tree = OutlineNode::build_tree(vec![("A", 1, Some(1)), ("B", 2, Some(2)), ("C", 4, Some(3))]);
        let repaired = repair(&tree);
        assert_eq!(levels(&repaired), vec![1, 2, 3]);
        assert_eq!(repaired[0].children[0].children[0].title, "C");
    }

    #[test]
    fn test_repairs_flat_list() {
        let flat = vec![
            OutlineNode::new("A", 1, None),
            OutlineNode::new("B", 2, None),
            OutlineNode::new("C", 4, None),
        ];
        assert_eq!(levels(&repair(&flat)), vec![1, 2, 3]);
    }

    #[test]
    fn test_repairs_child_not_deeper_than_parent() {
        let tree = vec![OutlineNode::new("A", 3, None).with_child(OutlineNode::new("B", 1, None))];
        assert_eq!(levels(&repair(&tree)), vec![1, 2]);
    }

    #[test]
    fn test_repair_is_stable() {
        let tree = OutlineNode::build_tree(vec![("A", 1, Some(1)), ("B", 2, Some(2)), ("C", 1, Some(3))]);
        assert_eq!(repair(&tree), tree);
    }

    #[test]
    fn test_match_with_page_fallback() {
        let primary = flatten(&[
            OutlineNode::new("Intro", 1, Some(1)),
            OutlineNode::new("Results", 1, Some(5)),
            OutlineNode::new("Notes", 1, Some(9)),
        ]);
        let validator = flatten(&[
            OutlineNode::new("intro", 1, None),
            OutlineNode::new("Results", 1, Some(6)),
            OutlineNode::new("Appendix", 1, Some(9)),
        ]);

        let m = match_nodes(&primary, &validator);
        assert_eq!(m.matched, vec![(0, 0)]);
        assert_eq!(m.primary_only, vec![1, 2]);
        assert_eq!(m.validator_only, vec![1, 2]);
    }
}
