//! Injectable observers of node construction and closing.

/// Whether a node was just constructed or just sealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opened,
    Closed,
}

/// One node event as seen by a [`TraceSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub phase: Phase,
    pub offset: usize,
    pub size: usize,
    /// Number of ancestors of the node.
    pub depth: usize,
    /// Production or node kind name.
    pub kind: &'static str,
    /// Whether the producing grammar marks this as a noise token.
    pub trivial: bool,
    pub summary: String,
}

impl TraceEvent {
    /// Indented single-line rendering: depth, hex offset, kind, summary.
    pub fn render(&self) -> String {
        let summary = match (self.phase, self.summary.is_empty()) {
            (Phase::Opened, true) => "...",
            _ => self.summary.as_str(),
        };
        format!(
            "{}{:08x} {:<25} {}",
            " ".repeat(self.depth),
            self.offset,
            format!("{}()", self.kind),
            summary
        )
    }
}

/// Receives node events from the parser loop.
pub trait TraceSink {
    /// Events are only built when this returns true.
    fn enabled(&self) -> bool {
        true
    }

    fn node_opened(&mut self, _event: &TraceEvent) {}

    fn node_closed(&mut self, _event: &TraceEvent) {}
}

/// Default sink: ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn enabled(&self) -> bool {
        false
    }
}

/// Forwards non-trivial events to `tracing` at trace level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn node_opened(&mut self, event: &TraceEvent) {
        if !event.trivial {
            tracing::trace!(target: "pdfscope::tree", "{}", event.render());
        }
    }

    fn node_closed(&mut self, event: &TraceEvent) {
        if !event.trivial {
            tracing::trace!(target: "pdfscope::tree", "{}", event.render());
        }
    }
}

/// Collects every event; handy for tests and tooling.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for RecordingSink {
    fn node_opened(&mut self, event: &TraceEvent) {
        self.events.push(event.clone());
    }

    fn node_closed(&mut self, event: &TraceEvent) {
        self.events.push(event.clone());
    }
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    fn enabled(&self) -> bool {
        (**self).enabled()
    }

    fn node_opened(&mut self, event: &TraceEvent) {
        (**self).node_opened(event);
    }

    fn node_closed(&mut self, event: &TraceEvent) {
        (**self).node_closed(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_indents_by_depth() {
        let event = TraceEvent {
            phase: Phase::Opened,
            offset: 0x1a,
            size: 2,
            depth: 2,
            kind: "Dictionary",
            trivial: false,
            summary: String::new(),
        };
        assert_eq!(
            event.render(),
            format!("  0000001a {:<25} ...", "Dictionary()")
        );
    }
}
