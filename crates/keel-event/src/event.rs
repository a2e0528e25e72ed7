//! Event generation: turning changed leaves of a diff tree into events.

use std::fmt;

use keel_cmp::{Change, DiffNode, DiffTree};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::EventResult;
use crate::rule::{ActionType, Rule, RuleType};

/// A detected change together with the rule it matched.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Event {
    pub rule: Rule,
    /// The change the event is attributed to. For anchored rules this is the
    /// anchor node, otherwise the leaf that matched.
    pub change: Change,
    /// Paths of the leaf changes that matched the rule.
    pub matched_paths: Vec<String>,
}

impl Event {
    /// Paths of the anchor nodes the matched leaves belong to, in order and
    /// without duplicates. Events of non-anchored rules yield their change
    /// path.
    pub fn anchor_paths(&self) -> Vec<String> {
        if !self.rule.match_path.is_anchored() {
            return vec![self.change.path.clone()];
        }

        let mut paths: Vec<String> = Vec::new();
        for matched in &self.matched_paths {
            let anchor = self.rule.match_path.find_anchor_path(matched);
            if !paths.contains(&anchor) {
                paths.push(anchor);
            }
        }
        paths
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}) Change: [Type: {}, Path: {}]",
            self.rule.rule_type, self.change.change_type, self.change.path
        )
    }
}

/// An ordered list of events.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Events(Vec<Event>);

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Event> {
        self.0
    }

    /// Events for which `keep` returns `true`, in order.
    pub fn filter(&self, keep: impl Fn(&Event) -> bool) -> Events {
        self.iter().filter(|e| keep(e)).cloned().collect()
    }

    /// Events whose rule has exactly this priority.
    pub fn filter_by_rule_type(&self, t: RuleType) -> Events {
        self.filter(|e| e.rule.rule_type == t)
    }

    pub fn filter_by_action(&self, action: ActionType) -> Events {
        self.filter(|e| e.rule.action == Some(action))
    }

    /// Merge a new event into an existing one produced by the same anchored
    /// rule for the same change type, or append it. The merged event keeps
    /// the change it was first attributed to.
    fn push(&mut self, event: Event) {
        if event.rule.match_path.is_anchored() {
            let existing = self.0.iter_mut().find(|e| {
                e.rule.match_path.as_str() == event.rule.match_path.as_str()
                    && e.rule.rule_type == event.rule.rule_type
                    && e.change.change_type == event.change.change_type
            });

            if let Some(e) = existing {
                e.matched_paths.extend(event.matched_paths);
                return;
            }
        }

        self.0.push(event);
    }
}

impl FromIterator<Event> for Events {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Events {
    type Item = Event;
    type IntoIter = std::vec::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Events {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Match every changed leaf of the tree against the rules.
///
/// Each leaf matches at most one rule (see [`match_rule`]) and produces at
/// most one event; events of the same anchored rule with the same change
/// type are merged into the first one. All rules are validated first, and the first invalid rule
/// aborts generation.
pub fn generate_events(tree: Option<&DiffTree>, rules: &[Rule]) -> EventResult<Events> {
    for rule in rules {
        rule.validate()?;
    }

    let mut events = Events::new();
    let Some(tree) = tree else {
        return Ok(events);
    };

    for node in tree.iter() {
        if !node.is_leaf() || !node.has_changed() {
            continue;
        }

        let Some(rule) = match_rule(node, rules) else {
            trace!(path = node.path(), change = %node.change_type(), "no rule matched");
            continue;
        };

        let target = if rule.match_path.is_anchored() {
            let anchor = rule.match_path.find_anchor_path(node.path());
            tree.parent_by_path(node, &anchor).unwrap_or(node)
        } else {
            node
        };

        debug!(
            path = node.path(),
            target = target.path(),
            rule = %rule.match_path,
            tier = %rule.rule_type,
            "change matched rule"
        );

        events.push(Event {
            rule: rule.clone(),
            change: target.to_change(),
            matched_paths: vec![node.path().to_string()],
        });
    }

    Ok(events)
}

/// The rule that best matches the node, if any.
///
/// A rule matches when its change type is `Any` or equal to the node's, and
/// its path matches the node's path. Among matches the longer path wins,
/// then the one with fewer wildcards, then the higher priority; on a full
/// tie the earlier rule is kept.
pub fn match_rule<'r>(node: &DiffNode, rules: &'r [Rule]) -> Option<&'r Rule> {
    let mut best: Option<&Rule> = None;

    for rule in rules {
        if !rule.accepts(node.change_type()) || !rule.match_path.matches(node.path()) {
            continue;
        }

        if best.map_or(true, |b| is_better_match(rule, b)) {
            best = Some(rule);
        }
    }

    best
}

fn is_better_match(r1: &Rule, r2: &Rule) -> bool {
    let (p1, p2) = (&r1.match_path, &r2.match_path);

    if p1.len() != p2.len() {
        return p1.len() > p2.len();
    }

    if p1.wildcard_count() != p2.wildcard_count() {
        return p1.wildcard_count() < p2.wildcard_count();
    }

    r1.rule_type > r2.rule_type
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_cmp::{compare, ChangeType, Options, Value};
    use std::collections::BTreeMap;

    type Nested = BTreeMap<String, BTreeMap<String, String>>;

    fn nested(entries: Vec<(&str, Vec<(&str, &str)>)>) -> Nested {
        entries
            .into_iter()
            .map(|(k, inner)| {
                let inner = inner
                    .into_iter()
                    .map(|(ik, iv)| (ik.to_string(), iv.to_string()))
                    .collect();
                (k.to_string(), inner)
            })
            .collect()
    }

    fn events_for<A, B>(a: &A, b: &B, rules: &[Rule]) -> Events
    where
        A: keel_cmp::Describe + ?Sized,
        B: keel_cmp::Describe + ?Sized,
    {
        let res = compare(a, b, &Options::default()).unwrap();
        generate_events(res.tree(), rules).unwrap()
    }

    fn ab(before: &str, after: &str) -> (Nested, Nested) {
        (
            nested(vec![("a", vec![("b", before)])]),
            nested(vec![("a", vec![("b", after)])]),
        )
    }

    // =====================================================================
    // 1. Basics
    // =====================================================================

    #[test]
    fn single_change_single_event() {
        let v1 = BTreeMap::from([("A", "Yes")]);
        let v2 = BTreeMap::from([("A", "No")]);
        let rule = Rule::new(RuleType::ALLOW, "A");

        let events = events_for(&v1, &v2, std::slice::from_ref(&rule));
        assert_eq!(events.len(), 1);

        let e = &events.as_slice()[0];
        assert_eq!(e.rule, rule);
        assert_eq!(e.change.value_before, Some(Value::String("Yes".into())));
        assert_eq!(e.change.value_after, Some(Value::String("No".into())));
        assert_eq!(e.matched_paths, ["A"]);
        assert_eq!(e.to_string(), "(Allow) Change: [Type: modify, Path: A]");
    }

    #[test]
    fn empty_comparison_has_no_events() {
        assert!(generate_events(None, &[]).unwrap().is_empty());

        let rules = [Rule::new(RuleType::ERROR, "*")];
        assert!(events_for(&Value::Absent, &Value::Absent, &rules).is_empty());
    }

    #[test]
    fn unchanged_leaves_have_no_events() {
        let (v1, _) = ab("Yes", "Yes");
        assert!(events_for(&v1, &v1, &[Rule::new(RuleType::ERROR, "*")]).is_empty());
    }

    #[test]
    fn unmatched_changes_have_no_events() {
        let (v1, v2) = ab("Yes", "No");
        assert!(events_for(&v1, &v2, &[Rule::new(RuleType::ERROR, "x")]).is_empty());
    }

    #[test]
    fn invalid_rule_aborts_generation() {
        let (v1, v2) = ab("Yes", "No");
        let res = compare(&v1, &v2, &Options::default()).unwrap();
        let rules = [Rule::new(RuleType::ALLOW, "a"), Rule::new(RuleType::ALLOW, "a.{b")];

        let err = generate_events(res.tree(), &rules).unwrap_err();
        assert!(err.to_string().starts_with(r#"rule "a.{b": "#));

        // Validation happens even without a tree.
        assert!(generate_events(None, &rules).is_err());
    }

    // =====================================================================
    // 2. Precedence
    // =====================================================================

    #[test]
    fn longer_path_wins() {
        let (v1, v2) = ab("Yes", "No");
        let r1 = Rule::new(RuleType::ERROR, "a");
        let r2 = Rule::new(RuleType::ALLOW, "a.b");

        let events = events_for(&v1, &v2, &[r1, r2.clone()]);
        assert_eq!(events.len(), 1);
        assert_eq!(events.as_slice()[0].rule, r2);
    }

    #[test]
    fn longest_path_wins_among_many() {
        let (v1, v2) = ab("Yes", "No");
        let rules = [
            Rule::new(RuleType::ERROR, "a"),
            Rule::new(RuleType::ALLOW, "a.b"),
            Rule::new(RuleType::ALLOW, "@"),
            Rule::new(RuleType::ERROR, "*"),
            Rule::new(RuleType::ALLOW, "invalid"),
        ];

        let events = events_for(&v1, &v2, &rules);
        assert_eq!(events.len(), 1);
        assert_eq!(events.as_slice()[0].rule, rules[1]);
        assert_eq!(events.as_slice()[0].change.path, "a.b");
    }

    #[test]
    fn fewer_wildcards_win() {
        let (v1, v2) = ab("Yes", "No");
        let rules = [
            Rule::new(RuleType::ERROR, "*.*"),
            Rule::new(RuleType::WARN, "a.*"),
            Rule::new(RuleType::ALLOW, "a.b"),
        ];

        let events = events_for(&v1, &v2, &rules);
        assert_eq!(events.len(), 1);
        assert_eq!(events.as_slice()[0].rule, rules[2]);
    }

    #[test]
    fn higher_priority_wins() {
        let (v1, v2) = ab("Yes", "No");
        let rules = [
            Rule::new(RuleType::ALLOW, "a.b"),
            Rule::new(RuleType::WARN, "a.b"),
            Rule::new(RuleType::ERROR, "a.b"),
        ];
        let events = events_for(&v1, &v2, &rules);
        assert_eq!(events.as_slice()[0].rule, rules[2]);

        let custom = [
            Rule::new(RuleType(10), "a.b"),
            Rule::new(RuleType(50), "a.b"),
            Rule::new(RuleType(30), "a.b"),
        ];
        let events = events_for(&v1, &v2, &custom);
        assert_eq!(events.len(), 1);
        assert_eq!(events.as_slice()[0].rule, custom[1]);
    }

    #[test]
    fn first_rule_wins_a_full_tie() {
        let (v1, v2) = ab("Yes", "No");
        let rules = [
            Rule::new(RuleType::WARN, "a.b").with_message("first"),
            Rule::new(RuleType::WARN, "a.b").with_message("second"),
        ];
        let events = events_for(&v1, &v2, &rules);
        assert_eq!(events.as_slice()[0].rule.message, "first");
    }

    #[test]
    fn change_type_filters_candidates() {
        let (v1, v2) = ab("Yes", "No");
        let rules = [
            Rule::new(RuleType::ERROR, "a.b").on(ChangeType::Delete),
            Rule::new(RuleType::WARN, "a").on(ChangeType::Modify),
        ];
        let events = events_for(&v1, &v2, &rules);
        assert_eq!(events.len(), 1);
        assert_eq!(events.as_slice()[0].rule, rules[1]);
    }

    // =====================================================================
    // 3. Wildcards, anchors and options
    // =====================================================================

    #[test]
    fn wildcard_reports_the_leaf_and_anchor_the_ancestor() {
        let v1 = nested(vec![("A", vec![("a", "Yes")])]);
        let v2 = nested(vec![("A", vec![("a", "No")])]);

        let events = events_for(&v1, &v2, &[Rule::new(RuleType::ALLOW, "*")]);
        assert_eq!(events.len(), 1);
        assert_eq!(events.as_slice()[0].change.path, "A.a");
        assert_eq!(events.as_slice()[0].matched_paths, ["A.a"]);

        let events = events_for(&v1, &v2, &[Rule::new(RuleType::ALLOW, "@")]);
        assert_eq!(events.len(), 1);
        assert_eq!(events.as_slice()[0].change.path, "A");
        assert_eq!(events.as_slice()[0].matched_paths, ["A.a"]);
    }

    #[test]
    fn options_match_each_listed_key() {
        let v1 = nested(vec![("A", vec![("a", "Yes")])]);
        let v2 = nested(vec![("A", vec![("b", "No")]), ("B", vec![("c", "")])]);

        let events = events_for(&v1, &v2, &[Rule::new(RuleType::ALLOW, "A.{a, b}")]);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn single_wildcard_matches_everything() {
        let v1 = nested(vec![("a", vec![("b", "Yes"), ("c", "Old")])]);
        let v2 = nested(vec![("a", vec![("b", "No"), ("d", "New")])]);
        let rules = [
            Rule::new(RuleType::ALLOW, "x.x"),
            Rule::new(RuleType::ALLOW, "*"),
            Rule::new(RuleType::ALLOW, "x.x"),
        ];

        let events = events_for(&v1, &v2, &rules);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.rule == rules[1]));
    }

    #[test]
    fn anchored_events_merge_by_rule_and_change_type() {
        let v1 = nested(vec![("n", vec![("a", "1"), ("b", "2")]), ("m", vec![("a", "1")])]);
        let v2 = nested(vec![("n", vec![("a", "x"), ("b", "y")]), ("m", vec![("a", "z")])]);

        let events = events_for(&v1, &v2, &[Rule::new(RuleType::WARN, "@")]);
        assert_eq!(events.len(), 1);

        let e = &events.as_slice()[0];
        let mut matched = e.matched_paths.clone();
        matched.sort();
        assert_eq!(matched, ["m.a", "n.a", "n.b"]);

        let mut anchors = e.anchor_paths();
        anchors.sort();
        assert_eq!(anchors, ["m", "n"]);
    }

    #[test]
    fn anchored_events_merge_across_targets() {
        let v1 = nested(vec![("workers", vec![])]);
        let v2 = nested(vec![("workers", vec![("w1", "10.0.0.1"), ("w2", "10.0.0.2")])]);

        let rules = [Rule::new(RuleType::ALLOW, "workers.@").on(ChangeType::Create)];
        let events = events_for(&v1, &v2, &rules);
        assert_eq!(events.len(), 1);

        let e = &events.as_slice()[0];
        assert_eq!(e.change.path, "workers.w1");
        assert_eq!(e.matched_paths, ["workers.w1", "workers.w2"]);
        assert_eq!(e.anchor_paths(), ["workers.w1", "workers.w2"]);
    }

    #[test]
    fn anchored_events_split_by_change_type() {
        let v1 = nested(vec![("workers", vec![("w1", "10.0.0.1")])]);
        let v2 = nested(vec![("workers", vec![("w2", "10.0.0.2")])]);

        let events = events_for(&v1, &v2, &[Rule::new(RuleType::ALLOW, "workers.@")]);
        assert_eq!(events.len(), 2);
        assert_eq!(events.as_slice()[0].change.change_type, ChangeType::Delete);
        assert_eq!(events.as_slice()[1].change.change_type, ChangeType::Create);
    }

    #[test]
    fn anchor_paths_deduplicate_leaves() {
        let v1 = nested(vec![("n", vec![("a", "1"), ("b", "2")])]);
        let v2 = nested(vec![("n", vec![("a", "x"), ("b", "y")])]);

        let events = events_for(&v1, &v2, &[Rule::new(RuleType::WARN, "@")]);
        assert_eq!(events.as_slice()[0].anchor_paths(), ["n"]);

        let events = events_for(&v1, &v2, &[Rule::new(RuleType::WARN, "n.*")]);
        assert_eq!(events.len(), 2);
        assert_eq!(events.as_slice()[1].anchor_paths(), ["n.b"]);
    }

    // =====================================================================
    // 4. Filters
    // =====================================================================

    #[test]
    fn filters_by_tier_and_action() {
        let v1 = nested(vec![("a", vec![("x", "1")]), ("b", vec![])]);
        let v2 = nested(vec![("a", vec![]), ("b", vec![("y", "2")])]);

        let rules = [
            Rule::new(RuleType::ALLOW, "a.@")
                .on(ChangeType::Delete)
                .with_action(ActionType::ScaleDown),
            Rule::new(RuleType::WARN, "b.@")
                .on(ChangeType::Create)
                .with_action(ActionType::ScaleUp),
        ];
        let events = events_for(&v1, &v2, &rules);
        assert_eq!(events.len(), 2);

        let down = events.filter_by_action(ActionType::ScaleDown);
        assert_eq!(down.len(), 1);
        assert_eq!(down.as_slice()[0].change.path, "a.x");

        assert_eq!(events.filter_by_rule_type(RuleType::WARN).len(), 1);
        assert!(events.filter_by_rule_type(RuleType(101)).is_empty());
        assert_eq!(events.filter(|e| e.rule.is_of_type(RuleType(150))).len(), 1);
    }

    #[test]
    fn events_serialize_as_a_list() {
        let v1 = BTreeMap::from([("A", "Yes")]);
        let v2 = BTreeMap::from([("A", "No")]);
        let events = events_for(&v1, &v2, &[Rule::new(RuleType::ERROR, "A").with_message("no")]);

        let json = serde_json::to_value(&events).unwrap();
        assert_eq!(json[0]["rule"]["type"], "error");
        assert_eq!(json[0]["change"]["type"], "modify");
        assert_eq!(json[0]["change"]["value_before"], "Yes");
        assert_eq!(json[0]["matched_paths"][0], "A");
    }
}
