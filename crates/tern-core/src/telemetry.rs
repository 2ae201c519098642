//! Pluggable span observer.
//!
//! A host that wants timing or tracing around store operations registers a
//! [`SpanObserver`]; the store then reports a begin/end pair around every
//! public operation. With no observer registered the hooks compile down to
//! a branch on a `None`.
//!
//! Observers must be `Send + Sync`: read-only operations on a quiesced
//! store may run from several threads at once, and the observer hears
//! about all of them.

/// Identifies which store operation a span covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `TripleStore::intern`
    Intern,
    /// `TripleStore::add_triple`
    AddTriple,
    /// `TripleStore::ask`
    Ask,
    /// `TripleStore::ask_batch`
    AskBatch,
    /// `TripleStore::get_objects`
    GetObjects,
    /// `TripleStore::materialize_subjects`
    MaterializeSubjects,
    /// `TripleStore::subject_vector`
    SubjectVector,
    /// `TripleStore::is_class`
    IsClass,
    /// `TripleStore::count_objects`, `min_count`, `max_count`
    CountObjects,
    /// `TripleStore::validate_shape` and `validate_shape_batch`
    ValidateShape,
}

impl Operation {
    /// Stable lowercase name, usable as a metric label.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Intern => "intern",
            Operation::AddTriple => "add_triple",
            Operation::Ask => "ask",
            Operation::AskBatch => "ask_batch",
            Operation::GetObjects => "get_objects",
            Operation::MaterializeSubjects => "materialize_subjects",
            Operation::SubjectVector => "subject_vector",
            Operation::IsClass => "is_class",
            Operation::CountObjects => "count_objects",
            Operation::ValidateShape => "validate_shape",
        }
    }
}

/// Receiver for begin/end notifications around store operations.
///
/// Implementations must not call back into the store: the begin hook runs
/// while the operation holds the store borrow.
pub trait SpanObserver: Send + Sync {
    /// An operation is starting.
    fn begin(&self, op: Operation);

    /// The operation that most recently began with the same tag finished.
    /// Fires on error returns too.
    fn end(&self, op: Operation);
}

/// Drop guard pairing one `begin` with exactly one `end`.
///
/// The guard form means early returns and `?` propagation still close the
/// span.
pub(crate) struct ObserverSpan<'a> {
    observer: Option<&'a dyn SpanObserver>,
    op: Operation,
}

impl<'a> ObserverSpan<'a> {
    #[inline]
    pub(crate) fn enter(observer: Option<&'a dyn SpanObserver>, op: Operation) -> Self {
        if let Some(obs) = observer {
            obs.begin(op);
        }
        Self { observer, op }
    }
}

impl Drop for ObserverSpan<'_> {
    #[inline]
    fn drop(&mut self) {
        if let Some(obs) = self.observer {
            obs.end(self.op);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(&'static str, &'static str)>>,
    }

    impl SpanObserver for Recorder {
        fn begin(&self, op: Operation) {
            self.events.lock().unwrap().push(("begin", op.name()));
        }

        fn end(&self, op: Operation) {
            self.events.lock().unwrap().push(("end", op.name()));
        }
    }

    #[test]
    fn guard_pairs_begin_and_end() {
        let recorder = Recorder::default();
        {
            let _span = ObserverSpan::enter(Some(&recorder), Operation::Ask);
        }
        let events = recorder.events.lock().unwrap();
        assert_eq!(*events, vec![("begin", "ask"), ("end", "ask")]);
    }

    #[test]
    fn no_observer_is_silent() {
        let _span = ObserverSpan::enter(None, Operation::AddTriple);
    }

    #[test]
    fn end_fires_on_early_exit() {
        let recorder = Recorder::default();
        let result: Result<(), ()> = (|| {
            let _span = ObserverSpan::enter(Some(&recorder), Operation::AddTriple);
            Err(())
        })();
        assert!(result.is_err());
        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], ("end", "add_triple"));
    }
}
