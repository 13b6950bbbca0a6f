use tracing::debug;

use crate::descriptor::{
    L_JAVA_LANG_CLASS, L_JAVA_LANG_OBJECT, L_JAVA_LANG_STRING, append_argument,
    change_return_type, object_type, prepend_argument,
};
use crate::error::{WeaveError, WeaveResult};
use crate::ir::{CallKind, CallSite, Constant, Event, INIT, MethodInfo};
use crate::opcodes;
use crate::rules::{RewritePlan, RuleSet};
use crate::visitor::{EventSink, StreamVisitor};

/// Class identifiers of the current class-level transformation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct WorkContext {
    /// Class being intercepted; the generated class extends it.
    pub(crate) super_reference: String,
    /// Generated class receiving the rewritten bodies.
    pub(crate) this_reference: String,
    /// Direct superclass named in the original bytecode.
    pub(crate) next_super_name: String,
}

/// What was rewritten at a site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RewriteKind {
    Invocation,
    Construction,
    SuperConstructor,
}

/// A rewritten site, before and after.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RewriteRecord {
    pub(crate) kind: RewriteKind,
    pub(crate) original: CallSite,
    pub(crate) replacement: CallSite,
}

/// Pairing of a replaced `new` with its constructor call.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Construction {
    Idle,
    AwaitingPairedConstructorCall {
        plan: RewritePlan,
        type_name: String,
        /// The `dup` following the suppressed `new` has not been seen yet.
        dup_pending: bool,
        /// Allocations opened since the replaced `new` whose `<init>` is still ahead.
        nested: usize,
    },
}

#[derive(Debug)]
struct RewriterState {
    construction: Construction,
    super_ctor_rewritten: bool,
    any_rule_fired: bool,
}

impl RewriterState {
    fn new() -> Self {
        Self {
            construction: Construction::Idle,
            super_ctor_rewritten: false,
            any_rule_fired: false,
        }
    }
}

/// Rewrites call sites, construction sites and field owners of one method body.
pub(crate) struct InvokeReplacer<'a> {
    work: &'a WorkContext,
    rules: &'a RuleSet,
    method: MethodInfo,
    state: RewriterState,
    rewrites: Vec<RewriteRecord>,
}

impl<'a> InvokeReplacer<'a> {
    pub(crate) fn new(work: &'a WorkContext, rules: &'a RuleSet, method: MethodInfo) -> Self {
        Self {
            work,
            rules,
            method,
            state: RewriterState::new(),
            rewrites: Vec::new(),
        }
    }

    pub(crate) fn any_rule_fired(&self) -> bool {
        self.state.any_rule_fired
    }

    pub(crate) fn into_rewrites(self) -> Vec<RewriteRecord> {
        self.rewrites
    }

    fn visit_invoke(&mut self, site: CallSite, out: &mut dyn EventSink) -> WeaveResult<()> {
        if site.kind == CallKind::Special && site.name == INIT {
            if let Some((plan, type_name)) = self.take_paired_construction() {
                return self.emit_construction(site, plan, &type_name, out);
            }
        }

        // Only the first super constructor call of a cloned constructor targets
        // the intercepted class; later ones belong to other paths.
        if self.method.is_constructor()
            && !self.state.super_ctor_rewritten
            && site.kind == CallKind::Special
            && site.name == INIT
            && site.owner == self.work.next_super_name
        {
            self.state.super_ctor_rewritten = true;
            let replacement = CallSite {
                owner: self.work.super_reference.clone(),
                ..site.clone()
            };
            self.record(RewriteKind::SuperConstructor, site, replacement.clone());
            emit_invoke(out, replacement);
            return Ok(());
        }

        if site.kind == CallKind::Special
            && site.owner == self.work.next_super_name
            && site.name != INIT
        {
            return Err(WeaveError::UnsupportedSuperCall {
                class: self.method.class_name.clone(),
                method: self.method.signature(),
            });
        }

        let Some(plan) = self.rules.first_match(&site) else {
            emit_invoke(out, site);
            return Ok(());
        };
        self.state.any_rule_fired = true;

        let mut descriptor = match site.kind {
            CallKind::Virtual | CallKind::Interface => {
                prepend_argument(&site.descriptor, L_JAVA_LANG_OBJECT)?
            }
            CallKind::Static => site.descriptor.clone(),
            CallKind::Special => {
                return Err(WeaveError::UnsupportedInvocationKind {
                    kind: site.kind,
                    owner: site.owner,
                    name: site.name,
                });
            }
        };

        if plan.pass_owner_name {
            descriptor = append_argument(&descriptor, L_JAVA_LANG_STRING)?;
            out.emit(ldc(Constant::String(site.owner.clone())));
        }
        if plan.pass_method_name {
            descriptor = append_argument(&descriptor, L_JAVA_LANG_STRING)?;
            out.emit(ldc(Constant::String(self.method.method_name.clone())));
        }
        if plan.pass_method_signature {
            descriptor = append_argument(&descriptor, L_JAVA_LANG_STRING)?;
            out.emit(ldc(Constant::String(self.method.signature())));
        }
        if plan.pass_target_class {
            descriptor = append_argument(&descriptor, L_JAVA_LANG_CLASS)?;
            out.emit(ldc(Constant::Type(object_type(&self.work.super_reference))));
        }
        if plan.pass_receiver {
            descriptor = append_argument(&descriptor, L_JAVA_LANG_OBJECT)?;
            out.emit(Event::Var {
                opcode: opcodes::ALOAD,
                index: 0,
            });
        }

        let replacement = CallSite {
            owner: plan.new_owner,
            name: plan.new_name,
            descriptor,
            kind: CallKind::Static,
        };
        self.record(RewriteKind::Invocation, site, replacement.clone());
        emit_invoke(out, replacement);
        Ok(())
    }

    /// Returns the pending plan when this `<init>` closes the replaced allocation.
    fn take_paired_construction(&mut self) -> Option<(RewritePlan, String)> {
        let Construction::AwaitingPairedConstructorCall { nested, .. } =
            &mut self.state.construction
        else {
            return None;
        };
        if *nested > 0 {
            *nested -= 1;
            return None;
        }
        match std::mem::replace(&mut self.state.construction, Construction::Idle) {
            Construction::AwaitingPairedConstructorCall {
                plan, type_name, ..
            } => Some((plan, type_name)),
            Construction::Idle => None,
        }
    }

    fn emit_construction(
        &mut self,
        site: CallSite,
        plan: RewritePlan,
        type_name: &str,
        out: &mut dyn EventSink,
    ) -> WeaveResult<()> {
        let descriptor = change_return_type(&site.descriptor, &object_type(type_name))?;
        let replacement = CallSite {
            owner: plan.new_owner,
            name: plan.new_name,
            descriptor,
            kind: CallKind::Static,
        };
        self.record(RewriteKind::Construction, site, replacement.clone());
        emit_invoke(out, replacement);
        Ok(())
    }

    fn visit_new(&mut self, type_name: String, out: &mut dyn EventSink) -> WeaveResult<()> {
        let plan = self.rules.first_match(&CallSite::construction(&type_name));
        if let Construction::AwaitingPairedConstructorCall { nested, .. } =
            &mut self.state.construction
        {
            if plan.is_some() {
                return Err(WeaveError::NestedConstruction {
                    class: self.method.class_name.clone(),
                    method: self.method.signature(),
                    type_name,
                });
            }
            *nested += 1;
            out.emit(new_event(type_name));
            return Ok(());
        }

        match plan {
            Some(plan) => {
                self.state.any_rule_fired = true;
                self.state.construction = Construction::AwaitingPairedConstructorCall {
                    plan,
                    type_name,
                    dup_pending: true,
                    nested: 0,
                };
            }
            None => out.emit(new_event(type_name)),
        }
        Ok(())
    }

    fn record(&mut self, kind: RewriteKind, original: CallSite, replacement: CallSite) {
        debug!(
            class = %self.method.class_name,
            method = %self.method.signature(),
            "{:?}: {} {}.{}{} -> {}.{}{}",
            kind,
            original.kind.mnemonic(),
            original.owner,
            original.name,
            original.descriptor,
            replacement.owner,
            replacement.name,
            replacement.descriptor
        );
        self.rewrites.push(RewriteRecord {
            kind,
            original,
            replacement,
        });
    }
}

impl StreamVisitor for InvokeReplacer<'_> {
    fn visit(&mut self, event: Event, out: &mut dyn EventSink) -> WeaveResult<()> {
        match event {
            Event::Invoke {
                kind,
                owner,
                name,
                descriptor,
            } => {
                let site = CallSite {
                    owner,
                    name,
                    descriptor,
                    kind,
                };
                self.visit_invoke(site, out)?;
            }
            Event::Type {
                opcode: opcodes::NEW,
                type_name,
            } => self.visit_new(type_name, out)?,
            Event::Insn {
                opcode: opcodes::DUP,
            } => {
                if let Construction::AwaitingPairedConstructorCall { dup_pending, .. } =
                    &mut self.state.construction
                {
                    if *dup_pending {
                        *dup_pending = false;
                        return Ok(());
                    }
                }
                out.emit(event);
            }
            Event::Field {
                opcode,
                owner,
                name,
                descriptor,
            } => {
                // Field accesses in a cloned body target the generated class.
                let owner = if owner == self.work.super_reference {
                    self.work.this_reference.clone()
                } else {
                    owner
                };
                out.emit(Event::Field {
                    opcode,
                    owner,
                    name,
                    descriptor,
                });
            }
            Event::LocalVariable { .. } | Event::LineNumber { .. } => {}
            Event::End => {
                if let Construction::AwaitingPairedConstructorCall { type_name, .. } =
                    &self.state.construction
                {
                    return Err(WeaveError::UnpairedConstruction {
                        class: self.method.class_name.clone(),
                        method: self.method.signature(),
                        type_name: type_name.clone(),
                    });
                }
                out.emit(event);
            }
            other => out.emit(other),
        }
        Ok(())
    }
}

fn emit_invoke(out: &mut dyn EventSink, site: CallSite) {
    out.emit(Event::Invoke {
        kind: site.kind,
        owner: site.owner,
        name: site.name,
        descriptor: site.descriptor,
    });
}

fn ldc(constant: Constant) -> Event {
    Event::Ldc { constant }
}

fn new_event(type_name: String) -> Event {
    Event::Type {
        opcode: opcodes::NEW,
        type_name,
    }
}
