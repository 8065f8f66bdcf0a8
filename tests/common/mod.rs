//! Shared fixtures for integration tests.

use std::collections::{HashMap, HashSet};

use binflow::prelude::*;

/// A lifter scripted from a table of blocks, for recoveries over synthetic
/// programs.
#[derive(Debug, Default)]
pub struct ScriptedLifter {
    blocks: HashMap<Address, Vec<BlockSuccessor>>,
    failures: HashSet<Address>,
}

impl ScriptedLifter {
    pub fn new() -> Self {
        ScriptedLifter::default()
    }

    /// Scripts a block at `address` with the given successors.
    pub fn block(&mut self, address: u64, successors: &[(u64, JumpKind)]) {
        self.blocks.insert(
            Address::new(address),
            successors
                .iter()
                .map(|&(target, kind)| BlockSuccessor::new(Address::new(target), kind))
                .collect(),
        );
    }

    /// Scripts a block with no successors, a program exit.
    pub fn exit(&mut self, address: u64) {
        self.blocks.insert(Address::new(address), Vec::new());
    }

    /// Scripts a lift failure at `address`.
    pub fn fail(&mut self, address: u64) {
        self.failures.insert(Address::new(address));
    }
}

impl BlockLifter for ScriptedLifter {
    fn lift(&self, address: Address, _state: &MachineState) -> Result<Vec<BlockSuccessor>> {
        if self.failures.contains(&address) {
            return Err(Error::Lift {
                address,
                message: "scripted failure".to_string(),
            });
        }
        self.blocks.get(&address).cloned().ok_or(Error::Lift {
            address,
            message: "no block at address".to_string(),
        })
    }
}

/// Convenience constructor for addresses.
pub fn addr(value: u64) -> Address {
    Address::new(value)
}
