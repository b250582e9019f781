//! Printing binding declarations back to binding-file text.
//!
//! The output lowers to the same declarations it was printed from, so a
//! run's requests can be normalized, diffed or regenerated.

use std::fmt::Write;

use crate::base::QualifiedName;

use super::alias::NamespaceAlias;
use super::request::{BindDecl, BindingRequest, MemberKind, MemberSelection, RequestKind};
use super::lower::{IGNORE_UNBOUND, RENAME};
use super::symbols::{Param, Signature};

const INDENT: &str = "    ";

/// Render `decls` as one binding file under `root_namespace`.
pub fn print_bindings(decls: &[BindDecl], root_namespace: &str) -> String {
    let mut printer = Printer {
        out: String::new(),
        open: Vec::new(),
    };
    let _ = writeln!(printer.out, "namespace {} {{", root_namespace);
    for decl in decls {
        let scope = match decl {
            BindDecl::Alias(alias) => &alias.scope,
            BindDecl::Request(request) => &request.scope,
        };
        printer.enter(scope);
        match decl {
            BindDecl::Alias(alias) => printer.alias(alias),
            BindDecl::Request(request) => printer.request(request),
        }
    }
    printer.enter(&QualifiedName::root());
    printer.out.push_str("}\n");
    printer.out
}

struct Printer {
    out: String,
    /// Currently open namespaces below the root namespace.
    open: Vec<String>,
}

impl Printer {
    fn indent(&mut self, extra: usize) {
        for _ in 0..self.open.len() + extra {
            self.out.push_str(INDENT);
        }
    }

    /// Close and open namespaces until exactly `scope` is open.
    fn enter(&mut self, scope: &QualifiedName) {
        let target: Vec<&str> = scope.segments().iter().map(|s| s.as_str()).collect();
        let common = self
            .open
            .iter()
            .zip(&target)
            .take_while(|(a, b)| a.as_str() == **b)
            .count();
        while self.open.len() > common {
            self.open.pop();
            self.indent(0);
            self.out.push_str("}\n");
        }
        for segment in &target[common..] {
            self.indent(0);
            let _ = writeln!(self.out, "namespace {} {{", segment);
            self.open.push(segment.to_string());
        }
    }

    fn alias(&mut self, alias: &NamespaceAlias) {
        self.indent(0);
        let _ = writeln!(self.out, "namespace {} = ::{};", alias.alias, alias.target);
    }

    fn request(&mut self, request: &BindingRequest) {
        match &request.kind {
            RequestKind::Record { keyword } => {
                let name = request.path.to_string();
                self.indent(0);
                let _ = writeln!(self.out, "{} {} {{", keyword.as_str(), name);
                for member in &request.members {
                    self.indent(1);
                    let line = member_line(&name, member);
                    self.out.push_str(&line);
                    self.out.push('\n');
                }
                self.indent(0);
                self.out.push('}');
                if let Some(policy) = request.policy {
                    let _ = write!(self.out, " {}", policy.marker());
                }
                if request.ignore_unbound {
                    let _ = write!(self.out, " {}", IGNORE_UNBOUND);
                }
                if let Some(rename) = &request.rename {
                    let _ = write!(self.out, " {}({})", RENAME, rename);
                }
                self.out.push_str(";\n");
            }
            RequestKind::Function { signature } => {
                self.indent(0);
                let mut line = rename_prefix(request.rename.as_deref());
                match signature {
                    Some(signature) => line.push_str(&function_line(&request.path.to_string(), signature, false)),
                    None => {
                        let _ = write!(line, "using {};", request.path);
                    }
                }
                self.out.push_str(&line);
                self.out.push('\n');
            }
            RequestKind::Enum { scoped } => {
                self.indent(0);
                let mut line = rename_prefix(request.rename.as_deref());
                let _ = write!(
                    line,
                    "enum {}{} {{}};",
                    if *scoped { "class " } else { "" },
                    request.path
                );
                self.out.push_str(&line);
                self.out.push('\n');
            }
        }
    }
}

fn rename_prefix(rename: Option<&str>) -> String {
    match rename {
        Some(name) => format!("{}({}) ", RENAME, name),
        None => String::new(),
    }
}

fn member_line(class_name: &str, member: &MemberSelection) -> String {
    let mut line = rename_prefix(member.rename.as_deref());
    match (member.kind, &member.signature, &member.field_type) {
        (MemberKind::Any, _, _) => {
            let _ = write!(line, "using {}::{};", class_name, member.name);
        }
        (MemberKind::Field, _, Some(ty)) => {
            if member.is_static {
                line.push_str("static ");
            }
            let _ = write!(line, "{} {};", ty, member.name);
        }
        (_, Some(signature), _) => {
            line.push_str(&function_line(&member.name, signature, member.is_static));
        }
        // Selections always carry a signature or a field type once lowered.
        _ => {
            let _ = write!(line, "using {}::{};", class_name, member.name);
        }
    }
    line
}

fn function_line(name: &str, signature: &Signature, is_static: bool) -> String {
    let mut line = String::new();
    if is_static {
        line.push_str("static ");
    }
    if let Some(returns) = &signature.returns {
        let _ = write!(line, "{} ", returns);
    }
    line.push_str(name);
    line.push('(');
    let params: Vec<String> = signature.params.iter().map(param_text).collect();
    line.push_str(&params.join(", "));
    if signature.is_variadic {
        if !signature.params.is_empty() {
            line.push_str(", ");
        }
        line.push_str("...");
    }
    line.push(')');
    if signature.is_const {
        line.push_str(" const");
    }
    line.push(';');
    line
}

fn param_text(param: &Param) -> String {
    let mut text = param.ty.to_string();
    if let Some(name) = &param.name {
        text.push(' ');
        text.push_str(name);
    }
    if param.has_default {
        text.push_str(" = {}");
    }
    text
}
