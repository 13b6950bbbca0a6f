use serde::Serialize;
use tracing::{info, warn};

use crate::config::WeaveConfig;
use crate::descriptor::{parameter_types, slot_size};
use crate::error::{WeaveError, WeaveResult};
use crate::ir::{Class, Method, MethodInfo, MethodParameter};
use crate::params::{ExtractedParameters, ParamExtractor};
use crate::replacer::{InvokeReplacer, RewriteRecord, WorkContext};
use crate::rules::RuleSet;
use crate::visitor::{Discard, StreamVisitor, run_visitor};

/// Superclass assumed when a listing has none.
const JAVA_LANG_OBJECT: &str = "java/lang/Object";

/// A generated class and the sites rewritten to produce it.
#[derive(Clone, Debug)]
pub(crate) struct WovenClass {
    pub(crate) class: Class,
    pub(crate) original_name: String,
    pub(crate) rewrites: Vec<MethodRewrites>,
}

/// Rewrite records of one method of the original class.
#[derive(Clone, Debug)]
pub(crate) struct MethodRewrites {
    pub(crate) method: MethodInfo,
    pub(crate) records: Vec<RewriteRecord>,
}

pub(crate) fn work_context(class: &Class, config: &WeaveConfig) -> WorkContext {
    WorkContext {
        super_reference: class.name.clone(),
        this_reference: format!("{}{}", class.name, config.class_suffix),
        next_super_name: class
            .super_name
            .clone()
            .unwrap_or_else(|| JAVA_LANG_OBJECT.to_string()),
    }
}

/// Rewrite every method of `class`. Returns `None` when no aspect applied
/// anywhere in the class, in which case nothing is generated.
pub(crate) fn weave_class(
    class: &Class,
    config: &WeaveConfig,
    rules: &RuleSet,
) -> WeaveResult<Option<WovenClass>> {
    let work = work_context(class, config);
    let mut methods = Vec::with_capacity(class.methods.len());
    let mut rewrites = Vec::new();
    let mut applied = false;

    for method in &class.methods {
        let info = MethodInfo::for_method(class, method);
        let mut replacer = InvokeReplacer::new(&work, rules, info.clone());
        let events = run_visitor(&mut replacer, method.events.iter().cloned())?;
        applied |= replacer.any_rule_fired();
        let records = replacer.into_rewrites();
        if !records.is_empty() {
            rewrites.push(MethodRewrites {
                method: info,
                records,
            });
        }
        methods.push(Method {
            events,
            ..method.clone()
        });
    }

    if !applied {
        return Ok(None);
    }

    let record_count: usize = rewrites.iter().map(|method| method.records.len()).sum();
    info!(
        class = %class.name,
        generated = %work.this_reference,
        sites = record_count,
        "woven class"
    );

    Ok(Some(WovenClass {
        class: Class {
            name: work.this_reference,
            super_name: Some(work.super_reference),
            methods,
            artifact_index: class.artifact_index,
        },
        original_name: class.name.clone(),
        rewrites,
    }))
}

/// Weave all classes, stopping at the first class that cannot be rewritten.
pub(crate) fn weave_classes(
    classes: &[Class],
    config: &WeaveConfig,
    rules: &RuleSet,
) -> anyhow::Result<Vec<WovenClass>> {
    let mut woven = Vec::new();
    for class in classes {
        let result = weave_class(class, config, rules)
            .map_err(|err| anyhow::Error::new(err).context(format!("failed to weave {}", class.name)))?;
        woven.extend(result);
    }
    Ok(woven)
}

/// Parameter report for one method.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct MethodParameters {
    pub(crate) class: String,
    pub(crate) method: String,
    pub(crate) descriptor: String,
    pub(crate) debug_info_present: bool,
    pub(crate) parameters: Vec<MethodParameter>,
}

pub(crate) fn extract_parameters(class: &Class, method: &Method) -> WeaveResult<ExtractedParameters> {
    let types = parameter_types(&method.descriptor)?;
    let slot_count = types.iter().map(|field_type| slot_size(field_type)).sum();
    let ignore_count = if method.access.is_static { 0 } else { 1 };
    let mut extractor = ParamExtractor::new(ignore_count, types.len(), slot_count);
    for event in &method.events {
        extractor.visit(event.clone(), &mut Discard)?;
    }
    let extracted = extractor.finish();
    if !extracted.debug_info_present {
        warn!(
            class = %class.name,
            method = %MethodInfo::for_method(class, method).signature(),
            "no parameter names in debug info"
        );
    }
    Ok(extracted)
}

/// Collect parameter reports for every method; with `require_debug_info`,
/// a method without parameter names is an error.
pub(crate) fn resolve_parameters(
    classes: &[Class],
    require_debug_info: bool,
) -> WeaveResult<Vec<MethodParameters>> {
    let mut reports = Vec::new();
    for class in classes {
        for method in &class.methods {
            let extracted = extract_parameters(class, method)?;
            if require_debug_info && !extracted.debug_info_present {
                return Err(WeaveError::DebugInfoMissing {
                    class: class.name.clone(),
                    method: MethodInfo::for_method(class, method).signature(),
                });
            }
            reports.push(MethodParameters {
                class: class.name.clone(),
                method: method.name.clone(),
                descriptor: method.descriptor.clone(),
                debug_info_present: extracted.debug_info_present,
                parameters: extracted.parameters,
            });
        }
    }
    Ok(reports)
}
