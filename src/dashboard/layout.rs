use crate::dashboard::config::WidgetId;
use std::collections::HashSet;

/// Upper bound on rule passes when searching for a fixed point.
pub const NORMALIZE_MAX_PASSES: usize = 8;

/// `before` must immediately follow `after` in the ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdjacencyRule {
    pub after: WidgetId,
    pub before: WidgetId,
}

impl AdjacencyRule {
    pub fn new(after: impl Into<WidgetId>, before: impl Into<WidgetId>) -> Self {
        Self {
            after: after.into(),
            before: before.into(),
        }
    }

    pub fn is_satisfied(&self, ordering: &[WidgetId]) -> bool {
        let Some(a) = ordering.iter().position(|id| *id == self.after) else {
            return true;
        };
        let Some(b) = ordering.iter().position(|id| *id == self.before) else {
            return true;
        };
        self.after == self.before || b == a + 1
    }
}

/// Repair `ordering` so it lists every known widget exactly once and satisfies
/// every adjacency rule.
pub fn normalize(
    ordering: &[WidgetId],
    rules: &[AdjacencyRule],
    known: &[WidgetId],
) -> Vec<WidgetId> {
    normalize_with_report(ordering, rules, known, NORMALIZE_MAX_PASSES).0
}

/// Same as [`normalize`], also returning a description of every repair made.
///
/// Rules are applied in declaration order and the whole rule list is re-run
/// until a pass changes nothing or `max_passes` is reached.
pub fn normalize_with_report(
    ordering: &[WidgetId],
    rules: &[AdjacencyRule],
    known: &[WidgetId],
    max_passes: usize,
) -> (Vec<WidgetId>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut result = reconcile_members(ordering, known, &mut warnings);

    let mut converged = false;
    for _ in 0..max_passes.max(1) {
        let mut changed = false;
        for rule in rules {
            if apply_rule(&mut result, rule) {
                warnings.push(format!(
                    "moved '{}' to follow '{}'",
                    rule.before, rule.after
                ));
                changed = true;
            }
        }
        if !changed {
            converged = true;
            break;
        }
    }
    if !converged {
        warnings.push(format!(
            "adjacency rules did not settle after {} passes",
            max_passes.max(1)
        ));
    }

    (result, warnings)
}

fn reconcile_members(
    ordering: &[WidgetId],
    known: &[WidgetId],
    warnings: &mut Vec<String>,
) -> Vec<WidgetId> {
    let known_set: HashSet<&WidgetId> = known.iter().collect();
    let mut seen: HashSet<&WidgetId> = HashSet::with_capacity(known.len());
    let mut result = Vec::with_capacity(known.len());

    for id in ordering {
        if !known_set.contains(id) {
            warnings.push(format!("dropping unknown widget '{id}' from ordering"));
        } else if !seen.insert(id) {
            warnings.push(format!("dropping duplicate widget '{id}' from ordering"));
        } else {
            result.push(id.clone());
        }
    }
    for id in known {
        if seen.insert(id) {
            warnings.push(format!("appending missing widget '{id}' to ordering"));
            result.push(id.clone());
        }
    }
    result
}

fn apply_rule(ordering: &mut Vec<WidgetId>, rule: &AdjacencyRule) -> bool {
    if rule.after == rule.before {
        return false;
    }
    let Some(after) = ordering.iter().position(|id| *id == rule.after) else {
        return false;
    };
    let Some(before) = ordering.iter().position(|id| *id == rule.before) else {
        return false;
    };
    if before == after + 1 {
        return false;
    }
    let moved = ordering.remove(before);
    let anchor = if before < after { after - 1 } else { after };
    ordering.insert(anchor + 1, moved);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<WidgetId> {
        raw.iter().map(|id| WidgetId::from(*id)).collect()
    }

    #[test]
    fn moves_dependent_widget_after_anchor() {
        let known = ids(&["client-lifecycle", "workspace-stages", "x"]);
        let rules = vec![AdjacencyRule::new("client-lifecycle", "workspace-stages")];
        let ordering = ids(&["workspace-stages", "client-lifecycle", "x"]);
        assert_eq!(
            normalize(&ordering, &rules, &known),
            ids(&["client-lifecycle", "workspace-stages", "x"])
        );
    }

    #[test]
    fn moves_forward_when_dependent_is_later() {
        let known = ids(&["a", "b", "c", "d"]);
        let rules = vec![AdjacencyRule::new("a", "d")];
        assert_eq!(
            normalize(&ids(&["a", "b", "c", "d"]), &rules, &known),
            ids(&["a", "d", "b", "c"])
        );
    }

    #[test]
    fn restores_exact_membership() {
        let known = ids(&["a", "b", "c", "d"]);
        let (result, warnings) =
            normalize_with_report(&ids(&["c", "zzz", "a", "c"]), &[], &known, 4);
        assert_eq!(result, ids(&["c", "a", "b", "d"]));
        assert_eq!(warnings.len(), 4);
    }

    #[test]
    fn empty_ordering_becomes_registration_order() {
        let known = ids(&["a", "b", "c"]);
        assert_eq!(normalize(&[], &[], &known), known);
    }

    #[test]
    fn rule_with_unknown_widget_is_ignored() {
        let known = ids(&["a", "b"]);
        let rules = vec![AdjacencyRule::new("a", "ghost"), AdjacencyRule::new("ghost", "b")];
        let (result, warnings) = normalize_with_report(&ids(&["b", "a"]), &rules, &known, 4);
        assert_eq!(result, ids(&["b", "a"]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn chained_rules_hold_and_are_idempotent() {
        let known = ids(&["a", "b", "c", "d", "e"]);
        let rules = vec![AdjacencyRule::new("b", "c"), AdjacencyRule::new("a", "b")];
        let once = normalize(&ids(&["c", "e", "b", "d", "a"]), &rules, &known);
        for rule in &rules {
            assert!(rule.is_satisfied(&once), "{rule:?} violated in {once:?}");
        }
        assert_eq!(normalize(&once, &rules, &known), once);
    }

    #[test]
    fn conflicting_rules_terminate() {
        let known = ids(&["a", "b", "c"]);
        let rules = vec![AdjacencyRule::new("a", "c"), AdjacencyRule::new("b", "c")];
        let (result, warnings) = normalize_with_report(&ids(&["a", "b", "c"]), &rules, &known, 3);
        assert_eq!(result.len(), 3);
        assert!(warnings.last().unwrap().contains("did not settle"));
    }
}
