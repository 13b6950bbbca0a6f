use crate::error::WeaveResult;
use crate::ir::Event;

/// Receiver of events emitted by a visitor.
pub(crate) trait EventSink {
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

/// Sink that drops everything, for visitors that only collect state.
pub(crate) struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: Event) {}
}

/// Stage of an instruction stream pipeline. Events are forwarded unchanged
/// unless an implementation handles them.
pub(crate) trait StreamVisitor {
    fn visit(&mut self, event: Event, out: &mut dyn EventSink) -> WeaveResult<()> {
        out.emit(event);
        Ok(())
    }
}

/// Stage that forwards every event.
#[cfg(test)]
pub(crate) struct PassThrough;

#[cfg(test)]
impl StreamVisitor for PassThrough {}

/// Feed `events` through `visitor` in order and collect what it emits.
pub(crate) fn run_visitor<V, I>(visitor: &mut V, events: I) -> WeaveResult<Vec<Event>>
where
    V: StreamVisitor + ?Sized,
    I: IntoIterator<Item = Event>,
{
    let mut out = Vec::new();
    for event in events {
        visitor.visit(event, &mut out)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CallKind, Constant};
    use crate::opcodes;

    #[test]
    fn pass_through_forwards_every_event() {
        let events = vec![
            Event::Var {
                opcode: opcodes::ALOAD,
                index: 0,
            },
            Event::Ldc {
                constant: Constant::Int(7),
            },
            Event::Invoke {
                kind: CallKind::Virtual,
                owner: "com/example/App".to_string(),
                name: "run".to_string(),
                descriptor: "(I)V".to_string(),
            },
            Event::LineNumber { line: 3, start: 0 },
            Event::End,
        ];

        let out = run_visitor(&mut PassThrough, events.clone()).expect("visit");

        assert_eq!(out, events);
    }

    #[test]
    fn discard_drops_events() {
        struct Counter(usize);
        impl StreamVisitor for Counter {
            fn visit(&mut self, event: Event, out: &mut dyn EventSink) -> WeaveResult<()> {
                self.0 += 1;
                out.emit(event);
                Ok(())
            }
        }

        let mut counter = Counter(0);
        for event in [Event::Insn { opcode: opcodes::NOP }, Event::End] {
            counter.visit(event, &mut Discard).expect("visit");
        }

        assert_eq!(counter.0, 2);
    }
}
