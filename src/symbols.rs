//! Scope & symbol table.

use std::collections::HashMap;

use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Struct,
}

/// A value-copyable symbol record. The authoritative `Type` objects live in the owning AST;
/// symbols only carry enough information (name, kind, type, parameter/member lists) to answer
/// binder queries without re-walking the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    /// Parameter types, for `Function` symbols. Includes the implicit `this` parameter once the
    /// binder has appended it for struct member functions.
    pub param_types: Vec<Type>,
    /// Struct members, for `Struct` symbols.
    pub struct_members: Vec<Symbol>,
    pub variadic: bool,
    pub is_struct_member_function: bool,
    /// True for `extern` declarations and for `main`: these IR functions are registered under
    /// their raw name in the lowering engine's value table rather than the `func:<n>` prefix.
    pub is_extern_or_main: bool,
}

impl Symbol {
    pub fn variable(name: impl Into<String>, ty: Type) -> Symbol {
        Symbol {
            name: name.into(),
            kind: SymbolKind::Variable,
            ty,
            param_types: Vec::new(),
            struct_members: Vec::new(),
            variadic: false,
            is_struct_member_function: false,
            is_extern_or_main: false,
        }
    }

    pub fn function(name: impl Into<String>, ret_type: Type, param_types: Vec<Type>) -> Symbol {
        Symbol {
            name: name.into(),
            kind: SymbolKind::Function,
            ty: ret_type,
            param_types,
            struct_members: Vec::new(),
            variadic: false,
            is_struct_member_function: false,
            is_extern_or_main: false,
        }
    }

    pub fn strct(name: impl Into<String>, members: Vec<Symbol>) -> Symbol {
        let name = name.into();
        Symbol {
            ty: Type::identifier(name.clone()),
            name,
            kind: SymbolKind::Struct,
            param_types: Vec::new(),
            struct_members: members,
            variadic: false,
            is_struct_member_function: false,
            is_extern_or_main: false,
        }
    }

    /// Arity as seen by callers: the declared parameter count, minus one if this is a struct
    /// member function (the implicit `this` is never supplied by the caller).
    pub fn visible_arity(&self) -> usize {
        let n = self.param_types.len();
        if self.is_struct_member_function && n > 0 {
            n - 1
        } else {
            n
        }
    }

    pub fn find_member(&self, name: &str) -> Option<&Symbol> {
        self.struct_members.iter().find(|m| m.name == name)
    }
}

/// An unordered name -> symbol map, i.e. a single lexical scope.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    pub fn new() -> Scope {
        Scope::default()
    }

    /// Unchecked overwrite; callers that need duplicate-detection check `try_get` first.
    pub fn add(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn try_get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }
}

/// The binder's scope stack: innermost scope is last. Falls back to the global symbol table
/// injected at construction when a name is not found in any binder-owned scope.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    stack: Vec<Scope>,
    global: HashMap<String, Symbol>,
}

impl ScopeStack {
    pub fn new(global: HashMap<String, Symbol>) -> ScopeStack {
        ScopeStack { stack: vec![Scope::new()], global }
    }

    pub fn enter(&mut self) {
        self.stack.push(Scope::new());
    }

    pub fn leave(&mut self) {
        self.stack.pop();
    }

    pub fn add(&mut self, symbol: Symbol) {
        if let Some(scope) = self.stack.last_mut() {
            scope.add(symbol);
        }
    }

    /// True if `name` already exists in the innermost scope (used for VarDecl shadowing checks).
    pub fn contains_in_innermost(&self, name: &str) -> bool {
        self.stack.last().map(|s| s.contains(name)).unwrap_or(false)
    }

    /// Scans innermost-to-outermost binder scopes, then falls back to the global table.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        for scope in self.stack.iter().rev() {
            if let Some(sym) = scope.try_get(name) {
                return Some(sym);
            }
        }
        self.global.get(name)
    }

    pub fn global(&self) -> &HashMap<String, Symbol> {
        &self.global
    }
}

/// The per-project global symbol table: populated by the build driver before binding by merging
/// every file's top-level summaries. `main` is never promoted into it.
pub fn merge_global_symbols(per_file: Vec<HashMap<String, Symbol>>) -> HashMap<String, Symbol> {
    let mut global = HashMap::new();
    for file_symbols in per_file {
        for (name, symbol) in file_symbols {
            if name == "main" {
                continue;
            }
            global.insert(name, symbol);
        }
    }
    global
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_falls_back_to_global_table() {
        let mut global = HashMap::new();
        global.insert("add".to_string(), Symbol::function("add", Type::identifier("int"), vec![Type::identifier("int")]));
        let stack = ScopeStack::new(global);
        assert!(stack.lookup("add").is_some());
        assert!(stack.lookup("missing").is_none());
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut stack = ScopeStack::new(HashMap::new());
        stack.add(Symbol::variable("x", Type::identifier("int")));
        stack.enter();
        stack.add(Symbol::variable("x", Type::identifier("bool")));
        assert_eq!(stack.lookup("x").unwrap().ty, Type::identifier("bool"));
        stack.leave();
        assert_eq!(stack.lookup("x").unwrap().ty, Type::identifier("int"));
    }

    #[test]
    fn main_is_never_promoted_to_global() {
        let mut file_symbols = HashMap::new();
        file_symbols.insert("main".to_string(), Symbol::function("main", Type::identifier("int"), vec![]));
        file_symbols.insert("helper".to_string(), Symbol::function("helper", Type::identifier("void"), vec![]));
        let global = merge_global_symbols(vec![file_symbols]);
        assert!(!global.contains_key("main"));
        assert!(global.contains_key("helper"));
    }
}
