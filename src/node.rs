use crate::reference::Ref;
use crate::utils::{pairing3, MyHash};

/// Decision node stored in the unique table of a manager.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct Node {
    pub(crate) variable: u32,
    pub(crate) low: Ref,
    pub(crate) high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::from_raw(0),
            high: Ref::from_raw(0),
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(self.variable as u64, self.low.unsigned() as u64, self.high.unsigned() as u64)
    }
}
