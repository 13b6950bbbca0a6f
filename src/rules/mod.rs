use serde::Deserialize;

use crate::ir::CallSite;

pub(crate) mod pattern;

/// Replacement target chosen by an aspect, plus the synthetic arguments to pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct RewritePlan {
    #[serde(rename = "owner")]
    pub(crate) new_owner: String,
    #[serde(rename = "name")]
    pub(crate) new_name: String,
    #[serde(default)]
    pub(crate) pass_owner_name: bool,
    #[serde(default)]
    pub(crate) pass_method_name: bool,
    #[serde(default)]
    pub(crate) pass_method_signature: bool,
    #[serde(default)]
    pub(crate) pass_target_class: bool,
    #[serde(default)]
    pub(crate) pass_receiver: bool,
}

impl RewritePlan {
    pub(crate) fn new(new_owner: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            new_owner: new_owner.into(),
            new_name: new_name.into(),
            ..Self::default()
        }
    }

    /// Number of synthetic arguments appended after the original ones.
    pub(crate) fn synthetic_argument_count(&self) -> usize {
        [
            self.pass_owner_name,
            self.pass_method_name,
            self.pass_method_signature,
            self.pass_target_class,
            self.pass_receiver,
        ]
        .into_iter()
        .filter(|flag| *flag)
        .count()
    }
}

/// Policy deciding whether a call site is replaced, and by what.
pub(crate) trait Aspect {
    fn pointcut(&self, site: &CallSite) -> Option<RewritePlan>;
}

impl<F> Aspect for F
where
    F: Fn(&CallSite) -> Option<RewritePlan>,
{
    fn pointcut(&self, site: &CallSite) -> Option<RewritePlan> {
        self(site)
    }
}

/// Ordered aspects; the first one that matches a site wins.
#[derive(Default)]
pub(crate) struct RuleSet {
    aspects: Vec<Box<dyn Aspect + Send + Sync>>,
}

impl RuleSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, aspect: impl Aspect + Send + Sync + 'static) {
        self.aspects.push(Box::new(aspect));
    }

    pub(crate) fn with(mut self, aspect: impl Aspect + Send + Sync + 'static) -> Self {
        self.push(aspect);
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.aspects.len()
    }

    pub(crate) fn first_match(&self, site: &CallSite) -> Option<RewritePlan> {
        self.aspects.iter().find_map(|aspect| aspect.pointcut(site))
    }
}
