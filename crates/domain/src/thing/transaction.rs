//! Transaction frames: bracketed batches of `set` calls whose side
//! effects are deferred until the frame is closed.

/// Flags of one transaction frame.
///
/// Frames never inherit from the frame enclosing them: each `start` uses
/// exactly the options it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Fire per-attribute listeners when the frame ends.
    pub notify: bool,
    /// Validate and coerce values before storing them.
    pub validate: bool,
    /// Write to the output slot and push to the driver; otherwise write
    /// to the input slot.
    pub push: bool,
    /// Treat every set as a change, even when the value is unchanged.
    pub force: bool,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            notify: false,
            validate: true,
            push: true,
            force: false,
        }
    }
}

impl TransactionOptions {
    /// Options applied to a `set` made while no transaction is open.
    pub(crate) const IMMEDIATE: Self = Self {
        notify: true,
        validate: true,
        push: true,
        force: false,
    };

    /// Options used for data delivered by a driver.
    pub(crate) const PULLED: Self = Self {
        notify: true,
        validate: true,
        push: false,
        force: false,
    };

    #[must_use]
    pub const fn notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    #[must_use]
    pub const fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    #[must_use]
    pub const fn push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// An open frame on a thing's transaction stack.
#[derive(Debug)]
pub(crate) struct Transaction {
    pub(crate) options: TransactionOptions,
    /// Indices of attributes written in this frame, in first-write order.
    /// The value dispatched is whatever the slot holds at `end`, so the
    /// last write wins.
    pub(crate) pending: Vec<usize>,
    /// Sub-entity paths written through this frame. Each holds a mirror
    /// frame with the same options, closed together with this one.
    pub(crate) nested: Vec<Vec<String>>,
}

impl Transaction {
    pub(crate) fn new(options: TransactionOptions) -> Self {
        Self {
            options,
            pending: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, index: usize) {
        if !self.pending.contains(&index) {
            self.pending.push(index);
        }
    }

    /// Record a sub-entity path; `true` the first time it is seen, when
    /// the mirror frame still has to be opened.
    pub(crate) fn nest(&mut self, path: &[String]) -> bool {
        if self.nested.iter().any(|known| known.as_slice() == path) {
            return false;
        }
        self.nested.push(path.to_vec());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_silent_validated_push() {
        let options = TransactionOptions::default();
        assert!(!options.notify);
        assert!(options.validate);
        assert!(options.push);
        assert!(!options.force);
    }

    #[test]
    fn should_record_each_attribute_once() {
        let mut transaction = Transaction::new(TransactionOptions::default());
        transaction.record(2);
        transaction.record(0);
        transaction.record(2);
        assert_eq!(transaction.pending, vec![2, 0]);
    }

    #[test]
    fn should_nest_each_path_once() {
        let mut transaction = Transaction::new(TransactionOptions::default());
        let bulb = vec!["bulb".to_string()];
        assert!(transaction.nest(&bulb));
        assert!(!transaction.nest(&bulb));
        assert!(transaction.nest(&["shade".to_string()]));
        assert_eq!(transaction.nested.len(), 2);
    }

    #[test]
    fn should_chain_option_overrides() {
        let options = TransactionOptions::default().notify(true).force(true);
        assert!(options.notify);
        assert!(options.force);
        assert!(options.push);
    }
}
