//! Per-function stack frame bookkeeping.

use std::collections::HashMap;

/// Maps local names to `%rbp`-relative offsets within one function.
/// Parameters are bound first, so they occupy the slots closest to `%rbp`.
pub(crate) struct Frame {
    slots: HashMap<String, i64>,
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Bind a name to the next slot, at `-(n+1)*8` with n the table size at
    /// bind time.
    pub(crate) fn bind(&mut self, name: &str) -> i64 {
        let offset = -((self.slots.len() as i64 + 1) * 8);
        self.slots.insert(name.to_string(), offset);
        offset
    }

    /// Offset of an already-bound name. The parser rejects uses of
    /// undeclared names, so a miss here is a compiler bug.
    pub(crate) fn offset_of(&self, name: &str) -> i64 {
        match self.slots.get(name) {
            Some(&offset) => offset,
            None => panic!("codegen: no frame slot for '{name}', this should not happen"),
        }
    }
}
