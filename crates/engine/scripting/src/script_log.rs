//! Bounded buffer of script log lines for console display

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Most recent lines written by scripts through `log`/`print`
///
/// Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct ScriptLog {
    lines: Rc<RefCell<VecDeque<String>>>,
    capacity: usize,
}

impl ScriptLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Rc::new(RefCell::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity: capacity.max(1),
        }
    }

    /// Append a line, evicting the oldest when full
    pub fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.borrow_mut();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    /// Copy of the buffered lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().iter().cloned().collect()
    }

    /// Take all buffered lines
    pub fn drain(&self) -> Vec<String> {
        self.lines.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = ScriptLog::new(2);
        log.push("a");
        log.push("b");
        log.push("c");
        assert_eq!(log.lines(), vec!["b", "c"]);
    }

    #[test]
    fn test_clones_share_buffer() {
        let log = ScriptLog::new(8);
        let other = log.clone();
        other.push("hello");
        assert_eq!(log.drain(), vec!["hello"]);
        assert!(other.is_empty());
    }
}
