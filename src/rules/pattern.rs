use serde::Deserialize;

use crate::ir::{CallKind, CallSite};
use crate::rules::{Aspect, RewritePlan};

/// Call sites selected by wildcard patterns (`*` any run, `?` any single char).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct Pointcut {
    pub(crate) owner: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) descriptor: Option<String>,
    /// Restricts matching to these invocation kinds; empty means any.
    #[serde(default)]
    pub(crate) kinds: Vec<CallKind>,
}

impl Pointcut {
    pub(crate) fn matches(&self, site: &CallSite) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&site.kind))
            && wildcard_match(&self.owner, &site.owner)
            && wildcard_match(&self.name, &site.name)
            && self
                .descriptor
                .as_deref()
                .is_none_or(|pattern| wildcard_match(pattern, &site.descriptor))
    }
}

/// Aspect declared in the weave configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct PatternAspect {
    #[serde(rename = "match")]
    pub(crate) pointcut: Pointcut,
    #[serde(rename = "replace")]
    pub(crate) plan: RewritePlan,
}

impl Aspect for PatternAspect {
    fn pointcut(&self, site: &CallSite) -> Option<RewritePlan> {
        self.pointcut.matches(site).then(|| self.plan.clone())
    }
}

pub(crate) fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text index it is currently absorbing up to.
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, absorbed)) => {
                    p = star + 1;
                    t = absorbed + 1;
                    backtrack = Some((star, absorbed + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aspect(json: &str) -> PatternAspect {
        serde_json::from_str(json).expect("parse aspect")
    }

    #[test]
    fn wildcard_match_handles_stars_and_question_marks() {
        assert!(wildcard_match("java/lang/*", "java/lang/System"));
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("get?", "getX"));
        assert!(wildcard_match("*Service*Impl", "com/acme/UserServiceCacheImpl"));
        assert!(!wildcard_match("get?", "get"));
        assert!(!wildcard_match("java/lang/*", "java/util/List"));
        assert!(!wildcard_match("run", "runner"));
    }

    #[test]
    fn pattern_aspect_matches_owner_name_and_kind() {
        let aspect = aspect(
            r#"{
                "match": {"owner": "java/lang/System", "name": "currentTimeMillis", "kinds": ["static"]},
                "replace": {"owner": "com/example/Clock", "name": "now", "pass_method_name": true}
            }"#,
        );

        let site = CallSite::new("java/lang/System", "currentTimeMillis", "()J", CallKind::Static);
        let plan = aspect.pointcut(&site).expect("match");
        assert_eq!(plan.new_owner, "com/example/Clock");
        assert_eq!(plan.new_name, "now");
        assert!(plan.pass_method_name);
        assert!(!plan.pass_receiver);

        let virtual_site =
            CallSite::new("java/lang/System", "currentTimeMillis", "()J", CallKind::Virtual);
        assert_eq!(aspect.pointcut(&virtual_site), None);
    }

    #[test]
    fn pattern_aspect_filters_on_descriptor_when_given() {
        let aspect = aspect(
            r#"{
                "match": {"owner": "*", "name": "println", "descriptor": "(Ljava/lang/String;)V"},
                "replace": {"owner": "com/example/Out", "name": "println"}
            }"#,
        );

        let string_site = CallSite::new(
            "java/io/PrintStream",
            "println",
            "(Ljava/lang/String;)V",
            CallKind::Virtual,
        );
        let int_site = CallSite::new("java/io/PrintStream", "println", "(I)V", CallKind::Virtual);

        assert!(aspect.pointcut(&string_site).is_some());
        assert!(aspect.pointcut(&int_site).is_none());
    }
}
