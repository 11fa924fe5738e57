//! Public output model (§3): the `Repository` tree the Exporter produces.
//!
//! This is a plain, self-contained value: it shares no interior pointers or
//! arena indices with the collector's heap. Field names are part of the wire
//! contract (§6) and must match the case used here exactly, since downstream
//! consumers pin on them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// `(ModulePath, PackagePath, Name)` — uniquely names any exported entity.
/// `Name` may be decorated for methods; see [`decorate_method_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "ModPath")]
    pub mod_path: String,
    #[serde(rename = "PkgPath")]
    pub pkg_path: String,
    #[serde(rename = "Name")]
    pub name: String,
}

impl Identity {
    pub fn new(mod_path: impl Into<String>, pkg_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self { mod_path: mod_path.into(), pkg_path: pkg_path.into(), name: name.into() }
    }
}

/// Method-name decoration (P6): `<Type>.<method>` for instance methods,
/// `<Type>::<method>` for static/associated methods, `<Interface><<Type>>.<method>`
/// when the method implements a trait/interface, or bare `<method>` with
/// neither receiver nor interface.
pub fn decorate_method_name(method: &str, receiver: Option<&str>, interface: Option<&str>, is_static: bool) -> String {
    match (receiver, interface) {
        (Some(t), Some(i)) => format!("{i}<{t}>.{method}"),
        (Some(t), None) if is_static => format!("{t}::{method}"),
        (Some(t), None) => format!("{t}.{method}"),
        (None, _) => method.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Modules")]
    pub modules: IndexMap<String, Module>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Directory")]
    pub directory: String,
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "Packages")]
    pub packages: IndexMap<String, Package>,
    #[serde(rename = "Files")]
    pub files: IndexMap<String, File>,
    #[serde(rename = "Dependencies")]
    pub dependencies: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    #[serde(rename = "PkgPath")]
    pub pkg_path: String,
    #[serde(rename = "IsMain")]
    pub is_main: bool,
    #[serde(rename = "IsTest")]
    pub is_test: bool,
    #[serde(rename = "Functions")]
    pub functions: IndexMap<String, Function>,
    #[serde(rename = "Types")]
    pub types: IndexMap<String, Type>,
    #[serde(rename = "Vars")]
    pub vars: IndexMap<String, Var>,
}

impl Package {
    pub fn new(pkg_path: impl Into<String>) -> Self {
        Self {
            pkg_path: pkg_path.into(),
            is_main: false,
            is_test: false,
            functions: IndexMap::new(),
            types: IndexMap::new(),
            vars: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Alias")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Package")]
    pub package: String,
    #[serde(rename = "Imports")]
    pub imports: Vec<Import>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(rename = "FileLine")]
    pub file_line: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "Signature")]
    pub signature: String,
    #[serde(rename = "Exported")]
    pub exported: bool,
    #[serde(rename = "IsMethod")]
    pub is_method: bool,
    #[serde(rename = "IsInterfaceMethod")]
    pub is_interface_method: bool,
    #[serde(rename = "Receiver")]
    pub receiver: Option<Identity>,
    #[serde(rename = "TypeParams")]
    pub type_params: Vec<Identity>,
    #[serde(rename = "Params")]
    pub params: Vec<Identity>,
    #[serde(rename = "Results")]
    pub results: Vec<Identity>,
    #[serde(rename = "FunctionCalls")]
    pub function_calls: Vec<Identity>,
    #[serde(rename = "MethodCalls")]
    pub method_calls: Vec<Identity>,
    #[serde(rename = "Types")]
    pub types: Vec<Identity>,
    #[serde(rename = "GlobalVars")]
    pub global_vars: Vec<Identity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Struct,
    Interface,
    Enum,
    Typedef,
    TypeParameter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Type {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(rename = "FileLine")]
    pub file_line: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "TypeKind")]
    pub type_kind: TypeKind,
    #[serde(rename = "Exported")]
    pub exported: bool,
    #[serde(rename = "SubStruct")]
    pub sub_struct: Vec<Identity>,
    #[serde(rename = "InlineStruct")]
    pub inline_struct: Vec<Identity>,
    #[serde(rename = "Implements")]
    pub implements: Vec<Identity>,
    #[serde(rename = "Methods")]
    pub methods: IndexMap<String, Identity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Var {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(rename = "FileLine")]
    pub file_line: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "IsExported")]
    pub is_exported: bool,
    #[serde(rename = "IsConst")]
    pub is_const: bool,
    #[serde(rename = "IsPointer")]
    pub is_pointer: bool,
    #[serde(rename = "Type")]
    pub type_dep: Option<Identity>,
    #[serde(rename = "Dependencies")]
    pub dependencies: Vec<Identity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorate_method_name_covers_all_four_cases() {
        assert_eq!(decorate_method_name("speak", Some("Dog"), Some("Animal"), false), "Animal<Dog>.speak");
        assert_eq!(decorate_method_name("speak", None, None, false), "speak");
        assert_eq!(decorate_method_name("speak", Some("Dog"), None, false), "Dog.speak");
        assert_eq!(decorate_method_name("new", Some("Dog"), None, true), "Dog::new");
    }

    #[test]
    fn repository_round_trips_through_json() {
        let mut repo = Repository { path: "/repo".into(), modules: IndexMap::new() };
        let mut module = Module {
            name: "demo".into(),
            directory: "/repo".into(),
            language: "rust".into(),
            packages: IndexMap::new(),
            files: IndexMap::new(),
            dependencies: IndexMap::new(),
        };
        module.packages.insert("demo".into(), Package::new("demo"));
        repo.modules.insert("demo".into(), module);

        let json = serde_json::to_string(&repo).unwrap();
        let back: Repository = serde_json::from_str(&json).unwrap();
        assert_eq!(back.path, repo.path);
        assert!(back.modules.contains_key("demo"));
    }
}
