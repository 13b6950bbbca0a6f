use tracing::trace;

use crate::error::WeaveResult;
use crate::ir::{Event, MethodParameter};
use crate::visitor::{EventSink, StreamVisitor};

/// Parameters recovered from a method's local variable table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ExtractedParameters {
    pub(crate) parameters: Vec<MethodParameter>,
    /// False when the table is missing or only holds `argN` placeholders.
    pub(crate) debug_info_present: bool,
}

/// Collects declared parameter names and types from local variable records.
///
/// Slots below `ignore_count` (the receiver, synthetic leading parameters) are
/// skipped; the next `slot_count` slots hold the `param_count` declared
/// parameters. `long` and `double` parameters take two slots each.
pub(crate) struct ParamExtractor {
    ignore_count: u16,
    param_count: usize,
    slot_count: usize,
    parameters: Vec<MethodParameter>,
    debug_info_present: bool,
}

impl ParamExtractor {
    pub(crate) fn new(ignore_count: u16, param_count: usize, slot_count: usize) -> Self {
        Self {
            ignore_count,
            param_count,
            slot_count,
            parameters: Vec::with_capacity(param_count),
            // Nothing to name, so nothing is missing.
            debug_info_present: param_count == 0,
        }
    }

    pub(crate) fn finish(self) -> ExtractedParameters {
        ExtractedParameters {
            parameters: self.parameters,
            debug_info_present: self.debug_info_present,
        }
    }

    fn is_parameter_slot(&self, index: u16) -> bool {
        let first = usize::from(self.ignore_count);
        let slot = usize::from(index);
        slot >= first && slot < first + self.slot_count
    }

    fn visit_local_variable(
        &mut self,
        name: String,
        descriptor: String,
        signature: Option<String>,
        index: u16,
    ) {
        if !self.is_parameter_slot(index) {
            return;
        }
        let position = self.parameters.len();
        if position >= self.param_count {
            trace!(name = %name, index, "ignoring local variable record past the declared parameters");
            return;
        }
        if name != format!("arg{position}") {
            self.debug_info_present = true;
        }
        self.parameters.push(MethodParameter {
            name,
            type_descriptor: signature.unwrap_or(descriptor),
        });
    }
}

impl StreamVisitor for ParamExtractor {
    fn visit(&mut self, event: Event, _out: &mut dyn EventSink) -> WeaveResult<()> {
        // Slots are filled in record order, so an `End` with fewer records
        // than declared parameters leaves a shorter sequence.
        if let Event::LocalVariable {
            name,
            descriptor,
            signature,
            index,
            ..
        } = event
        {
            self.visit_local_variable(name, descriptor, signature, index);
        }
        Ok(())
    }
}
