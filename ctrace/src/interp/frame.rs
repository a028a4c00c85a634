//! Frames: name bindings for one function activation or the globals

use super::error::InterpResult;
use super::store::{Address, ValueStore};
use super::value::Value;
use crate::ast::{TempId, Type};
use std::collections::HashMap;

/// Declared type and length of a variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub ty: Type,
    /// 1 for scalars, N for `T[N]`
    pub len: usize,
}

impl Symbol {
    pub fn new(ty: Type) -> Self {
        let len = ty.length();
        Self { ty, len }
    }
}

/// Name to declared type
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, ty: Type) {
        self.entries.insert(name.to_string(), Symbol::new(ty));
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }
}

/// Name to address in the [`ValueStore`]
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    bindings: HashMap<String, Address>,
}

impl ValueTable {
    pub fn bind(&mut self, name: &str, addr: Address) {
        self.bindings.insert(name.to_string(), addr);
    }

    pub fn get(&self, name: &str) -> Option<Address> {
        self.bindings.get(name).copied()
    }
}

/// Bindings of one activation.
///
/// Every cell a frame allocates lies at or above `base`, so releasing the
/// frame is a single truncation of the store.
#[derive(Debug, Clone)]
pub struct Frame {
    function: String,
    symbols: SymbolTable,
    values: ValueTable,
    /// Results of hoisted calls waiting to be read
    temps: HashMap<TempId, Value>,
    base: usize,
}

impl Frame {
    pub fn new(function: &str, base: usize) -> Self {
        Frame {
            function: function.to_string(),
            symbols: SymbolTable::new(),
            values: ValueTable::default(),
            temps: HashMap::new(),
            base,
        }
    }

    /// The frame holding global variables
    pub fn global() -> Self {
        Self::new("<global>", 0)
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// Declare `name` and allocate its cell. Names are function-scoped: a
    /// second declaration of the same name reuses the existing cell.
    pub fn declare(
        &mut self,
        store: &mut ValueStore,
        name: &str,
        ty: &Type,
        init: Option<Value>,
        line: u32,
    ) -> InterpResult<Address> {
        let init = match (ty, init) {
            (Type::Array(_, len), None) => Some(Value::Array(vec![None; *len])),
            (_, Some(value)) => Some(value.coerce_to(ty)?),
            (_, None) => None,
        };
        self.symbols.insert(name, ty.clone());

        match self.values.get(name) {
            Some(addr) if store.contains(addr) => {
                if let Some(value) = init {
                    store.set(addr, value, line)?;
                }
                Ok(addr)
            }
            _ => {
                let addr = store.allocate(init, line);
                self.values.bind(name, addr);
                Ok(addr)
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<(Address, &Symbol)> {
        let addr = self.values.get(name)?;
        let symbol = self.symbols.get(name)?;
        Some((addr, symbol))
    }

    pub fn store_temp(&mut self, id: TempId, value: Value) {
        self.temps.insert(id, value);
    }

    /// Read a call result; reading clears it.
    pub fn take_temp(&mut self, id: TempId) -> Option<Value> {
        self.temps.remove(&id)
    }

    /// Free every cell this frame allocated.
    pub fn release(self, store: &mut ValueStore) -> InterpResult<usize> {
        store.free_from(self.base)
    }
}
