//! Nested lexical scopes, hash-chained buckets, stack-allocation bookkeeping,
//! and function/struct registration. `spec.md` §4.4.
//!
//! Grounded on the teacher's `validate::Context` (a tree-walk-scoped map of
//! labels/stats) generalized per `spec.md` §9's redesign note into an
//! explicit scope tree with parent-by-index links, rather than the original
//! language's raw-pointer scope chain.

use crate::{
    consts::SCOPE_BUCKET_COUNT,
    types::TypeInfo,
    util::Span,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Where a symbol's value lives at runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StorageClass {
    Local,
    Global,
    Uniform,
    Attribute,
    Varying,
    In,
    Out,
    Inout,
    Const,
    Register,
}

/// What a [Symbol] denotes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Parameter,
    Struct,
    Builtin,
}

/// A bound name: what it is, what type it has, and where it lives.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub type_info: Rc<TypeInfo>,
    pub storage: StorageClass,
    pub span: Span,
    pub scope_level: usize,
    /// Assigned register index, or `-1` if memory-resident.
    pub register: i32,
    /// Stack (local) or data-segment (global) offset, or `-1` if
    /// register-resident.
    pub stack_offset: isize,
    /// Ordered parameter list, for function symbols.
    pub params: Vec<Rc<TypeInfo>>,
    /// Number of local variables declared directly in a function's body,
    /// for function symbols.
    pub local_count: usize,
}

impl Symbol {
    fn new(
        name: String,
        kind: SymbolKind,
        type_info: Rc<TypeInfo>,
        storage: StorageClass,
        span: Span,
        scope_level: usize,
    ) -> Self {
        Self {
            name,
            kind,
            type_info,
            storage,
            span,
            scope_level,
            register: -1,
            stack_offset: -1,
            params: Vec::new(),
            local_count: 0,
        }
    }
}

/// A shared handle to a [Symbol]. Lookups hand these out so that later
/// compiler stages (code generation) can fill in `register`/`stack_offset`
/// after the symbol has already been inserted.
pub type SymbolRef = Rc<RefCell<Symbol>>;

/// DJB2 hash, truncated into `SCOPE_BUCKET_COUNT` buckets.
fn djb2_bucket(name: &str) -> usize {
    let mut hash: u64 = 5381;
    for byte in name.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
    }
    (hash as usize) % SCOPE_BUCKET_COUNT
}

/// A fixed-size hash table of symbol chains, plus scope-tree plumbing.
pub struct Scope {
    buckets: Vec<Vec<SymbolRef>>,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Running allocation cursor for locals declared directly in this scope.
    stack_offset: usize,
}

impl Scope {
    fn new(parent: Option<usize>) -> Self {
        Self {
            buckets: (0..SCOPE_BUCKET_COUNT).map(|_| Vec::new()).collect(),
            parent,
            children: Vec::new(),
            stack_offset: 0,
        }
    }

    fn find(&self, name: &str) -> Option<&SymbolRef> {
        self.buckets[djb2_bucket(name)]
            .iter()
            .find(|sym| sym.borrow().name == name)
    }

    fn insert(&mut self, sym: SymbolRef) {
        let bucket = djb2_bucket(&sym.borrow().name);
        self.buckets[bucket].push(sym);
    }

    /// Round the scope's cursor up to `alignment`, then advance by `size`.
    /// Returns the aligned offset the new local should live at.
    fn alloc(&mut self, size: usize, alignment: usize) -> usize {
        let align = alignment.max(1);
        let aligned = (self.stack_offset + align - 1) / align * align;
        self.stack_offset = aligned + size;
        aligned
    }
}

/// Owns the scope tree, a cursor into it, and flat struct/function
/// registries for direct cross-scope lookups.
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: usize,
    depth: usize,
    structs: Vec<(String, Rc<TypeInfo>)>,
    functions: Vec<SymbolRef>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None)],
            current: 0,
            depth: 0,
            structs: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Depth of the current scope; `0` at global scope.
    pub fn scope_depth(&self) -> usize {
        self.depth
    }

    pub fn is_global_scope(&self) -> bool {
        self.depth == 0
    }

    /// Create a child of the current scope and move the cursor there.
    pub fn enter_scope(&mut self) {
        let new_index = self.scopes.len();
        self.depth += 1;
        self.scopes.push(Scope::new(Some(self.current)));
        self.scopes[self.current].children.push(new_index);
        self.current = new_index;
    }

    /// Pop back to the parent scope.
    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
            self.depth = self.depth.saturating_sub(1);
        }
    }

    /// Insert a symbol into the current scope. Fails if a symbol of the same
    /// name already exists in the current scope only (outer scopes may be
    /// shadowed freely).
    pub fn define(
        &mut self,
        name: &str,
        kind: SymbolKind,
        type_info: Rc<TypeInfo>,
        storage: StorageClass,
        span: Span,
    ) -> Result<SymbolRef, Span> {
        if let Some(existing) = self.scopes[self.current].find(name) {
            return Err(existing.borrow().span);
        }

        let stack_offset = if storage == StorageClass::Local {
            self.scopes[self.current].alloc(type_info.size, type_info.alignment) as isize
        } else {
            -1
        };

        let mut symbol = Symbol::new(
            name.to_string(),
            kind,
            type_info,
            storage,
            span,
            self.depth,
        );
        symbol.stack_offset = stack_offset;
        let symbol_ref = Rc::new(RefCell::new(symbol));
        self.scopes[self.current].insert(Rc::clone(&symbol_ref));

        if kind == SymbolKind::Function {
            self.functions.push(Rc::clone(&symbol_ref));
        }
        Ok(symbol_ref)
    }

    /// Look up a name, starting at the current scope and walking toward the
    /// global scope.
    pub fn lookup(&self, name: &str) -> Option<SymbolRef> {
        let mut scope_index = Some(self.current);
        while let Some(index) = scope_index {
            let scope = &self.scopes[index];
            if let Some(sym) = scope.find(name) {
                return Some(Rc::clone(sym));
            }
            scope_index = scope.parent;
        }
        None
    }

    /// Look up a name, but only within the current scope.
    pub fn lookup_local(&self, name: &str) -> Option<SymbolRef> {
        self.scopes[self.current]
            .find(name)
            .map(Rc::clone)
    }

    /// Register a struct layout in the flat struct registry, and insert a
    /// symbol of kind `Struct` into the current scope.
    pub fn define_struct(
        &mut self,
        name: &str,
        type_info: Rc<TypeInfo>,
        span: Span,
    ) -> Result<SymbolRef, Span> {
        let symbol = self.define(
            name,
            SymbolKind::Struct,
            Rc::clone(&type_info),
            StorageClass::Const,
            span,
        )?;
        self.structs.push((name.to_string(), type_info));
        Ok(symbol)
    }

    pub fn lookup_struct(&self, name: &str) -> Option<Rc<TypeInfo>> {
        self.structs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| Rc::clone(t))
    }

    pub fn functions(&self) -> &[SymbolRef] {
        &self.functions
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    fn dummy_span() -> Span {
        Span::new(0, 0, 1, 1, 1, 1)
    }

    #[test]
    fn test_define_then_lookup() {
        let registry = TypeRegistry::new();
        let int_t = registry.type_from_name("int").unwrap();
        let mut table = SymbolTable::new();
        let sym = table
            .define(
                "x",
                SymbolKind::Variable,
                int_t,
                StorageClass::Global,
                dummy_span(),
            )
            .unwrap();
        let found = table.lookup("x").unwrap();
        assert!(Rc::ptr_eq(&sym, &found));
    }

    #[test]
    fn test_shadowing_after_exit_scope() {
        let registry = TypeRegistry::new();
        let int_t = registry.type_from_name("int").unwrap();
        let mut table = SymbolTable::new();
        let outer = table
            .define(
                "x",
                SymbolKind::Variable,
                Rc::clone(&int_t),
                StorageClass::Global,
                dummy_span(),
            )
            .unwrap();

        table.enter_scope();
        let inner = table
            .define(
                "x",
                SymbolKind::Variable,
                Rc::clone(&int_t),
                StorageClass::Local,
                dummy_span(),
            )
            .unwrap();
        assert!(Rc::ptr_eq(&table.lookup("x").unwrap(), &inner));
        table.exit_scope();
        assert!(Rc::ptr_eq(&table.lookup("x").unwrap(), &outer));
    }

    #[test]
    fn test_redefinition_in_same_scope_fails() {
        let registry = TypeRegistry::new();
        let int_t = registry.type_from_name("int").unwrap();
        let mut table = SymbolTable::new();
        table
            .define(
                "x",
                SymbolKind::Variable,
                Rc::clone(&int_t),
                StorageClass::Global,
                dummy_span(),
            )
            .unwrap();
        let err = table.define(
            "x",
            SymbolKind::Variable,
            int_t,
            StorageClass::Global,
            dummy_span(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_lookup_local_does_not_see_outer() {
        let registry = TypeRegistry::new();
        let int_t = registry.type_from_name("int").unwrap();
        let mut table = SymbolTable::new();
        table
            .define(
                "x",
                SymbolKind::Variable,
                int_t,
                StorageClass::Global,
                dummy_span(),
            )
            .unwrap();
        table.enter_scope();
        assert!(table.lookup_local("x").is_none());
        assert!(table.lookup("x").is_some());
    }

    #[test]
    fn test_stack_offset_allocation_alignment() {
        let registry = TypeRegistry::new();
        let char_t = registry.type_from_name("char").unwrap();
        let int_t = registry.type_from_name("int").unwrap();
        let mut table = SymbolTable::new();
        table.enter_scope();
        let c = table
            .define(
                "c",
                SymbolKind::Variable,
                char_t,
                StorageClass::Local,
                dummy_span(),
            )
            .unwrap();
        let i = table
            .define(
                "i",
                SymbolKind::Variable,
                int_t,
                StorageClass::Local,
                dummy_span(),
            )
            .unwrap();
        assert_eq!(c.borrow().stack_offset, 0);
        // i must be 4-aligned, so it lands at offset 4, not 1.
        assert_eq!(i.borrow().stack_offset, 4);
    }

    #[test]
    fn test_scope_depth() {
        let mut table = SymbolTable::new();
        assert_eq!(table.scope_depth(), 0);
        assert!(table.is_global_scope());
        table.enter_scope();
        assert_eq!(table.scope_depth(), 1);
        assert!(!table.is_global_scope());
        table.exit_scope();
        assert_eq!(table.scope_depth(), 0);
    }
}
