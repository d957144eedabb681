// ── Rule engine ──
//
// Derives the `disabled` flag of every suggestion from the configured rule
// list, the work item's matched state and the operator's selections.
// Evaluation is a pure function of those inputs.

use std::collections::BTreeMap;

use crate::model::{FeatureId, MatchRule, MissingCoordinate, SelectionMap, UNSET};

/// Evaluates an ordered rule list against one work item.
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine<'a> {
    rules: &'a [MatchRule],
}

impl<'a> RuleEngine<'a> {
    pub fn new(rules: &'a [MatchRule]) -> Self {
        Self { rules }
    }

    /// Value a rule's `match` clause compares against for `layer`.
    ///
    /// The service's match wins over the operator's pick; `0` when neither
    /// exists.
    pub fn effective_value(
        item: &MissingCoordinate,
        selected: &SelectionMap,
        layer: &str,
    ) -> FeatureId {
        item.matched_id(layer)
            .or_else(|| selected.get(layer))
            .unwrap_or(UNSET)
    }

    /// A rule with an empty `match` map always matches.
    pub fn rule_matches(
        rule: &MatchRule,
        item: &MissingCoordinate,
        selected: &SelectionMap,
    ) -> bool {
        rule.matches
            .iter()
            .all(|(layer, &required)| Self::effective_value(item, selected, layer) == required)
    }

    /// Compute the disabled flags for every suggestion, in suggestion order.
    ///
    /// Flags start cleared and are only ever set within one pass, so a later
    /// rule never re-enables what an earlier one disabled. Restrictions on
    /// layers without suggestions are ignored.
    pub fn evaluate(
        &self,
        item: &MissingCoordinate,
        selected: &SelectionMap,
    ) -> BTreeMap<String, Vec<bool>> {
        let mut flags: BTreeMap<String, Vec<bool>> = item
            .suggestions
            .iter()
            .map(|(layer, list)| (layer.clone(), vec![false; list.len()]))
            .collect();

        for rule in self.rules {
            if !Self::rule_matches(rule, item, selected) {
                continue;
            }
            for (layer, allowed) in &rule.restrict {
                let (Some(layer_flags), Some(list)) =
                    (flags.get_mut(layer), item.suggestions.get(layer))
                else {
                    continue;
                };
                for (flag, suggestion) in layer_flags.iter_mut().zip(list) {
                    if !allowed.contains(&suggestion.admin_level) {
                        *flag = true;
                    }
                }
            }
        }

        flags
    }

    /// Write the evaluated flags into `item`.
    ///
    /// Returns `true` if any flag changed.
    pub fn apply(&self, item: &mut MissingCoordinate, selected: &SelectionMap) -> bool {
        let flags = self.evaluate(item, selected);
        let mut changed = false;
        for (layer, list) in &mut item.suggestions {
            let Some(layer_flags) = flags.get(layer) else {
                continue;
            };
            for (suggestion, &disabled) in list.iter_mut().zip(layer_flags) {
                if suggestion.disabled != disabled {
                    suggestion.disabled = disabled;
                    changed = true;
                }
            }
        }
        changed
    }

    /// Whether [`apply`](Self::apply) would change anything.
    pub fn is_stale(&self, item: &MissingCoordinate, selected: &SelectionMap) -> bool {
        let flags = self.evaluate(item, selected);
        item.suggestions.iter().any(|(layer, list)| {
            flags.get(layer).is_some_and(|layer_flags| {
                list.iter()
                    .zip(layer_flags)
                    .any(|(s, &disabled)| s.disabled != disabled)
            })
        })
    }
}
