//! Symbol tables from CastXML output (`castxml --castxml-output=1`).
//!
//! CastXML writes a flat list of elements cross-referenced by id. The
//! reader collects every element first, then walks `context` chains to
//! qualify names and `type` chains to rebuild [`TypeRef`]s.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::base::QualifiedName;
use crate::hir::{
    normalize_fundamental, Access, EnumVariant, Param, RealSymbol, Reference, Signature, SymbolKind, TypeRef,
};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CastXmlError {
    #[error("malformed XML: {0}")]
    Xml(String),
    #[error("element {element} has no id")]
    MissingId { element: String },
    #[error("reference to unknown id '{0}'")]
    UnknownId(String),
    #[error("type chain through '{0}' does not end")]
    TypeCycle(String),
}

/// One element with its attributes and, for callables, enums and classes,
/// its child elements (`Argument`, `Ellipsis`, `EnumValue`, `Base`).
#[derive(Clone, Debug, Default)]
struct Element {
    tag: String,
    attrs: FxHashMap<String, String>,
    children: Vec<Element>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    fn flag(&self, name: &str) -> bool {
        self.attr(name) == Some("1")
    }
}

/// Parse CastXML output into real symbols, in document order.
pub fn load_castxml(text: &str) -> Result<Vec<RealSymbol>, CastXmlError> {
    let elements = read_elements(text)?;
    let index: FxHashMap<&str, &Element> = elements
        .iter()
        .filter_map(|e| e.attr("id").map(|id| (id, e)))
        .collect();
    let doc = Document { index };

    let mut symbols = Vec::new();
    for element in &elements {
        if let Some(symbol) = doc.symbol(element)? {
            trace!(name = %symbol.name, kind = ?symbol.kind, "castxml symbol");
            symbols.push(symbol);
        }
    }
    info!(elements = elements.len(), symbols = symbols.len(), "castxml loaded");
    Ok(symbols)
}

// ============================================================================
// XML
// ============================================================================

fn xml_error(err: impl std::fmt::Display) -> CastXmlError {
    CastXmlError::Xml(err.to_string())
}

fn element_of(start: &BytesStart<'_>) -> Result<Element, CastXmlError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = FxHashMap::default();
    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value: Cow<'_, str> = attr.unescape_value().map_err(xml_error)?;
        attrs.insert(key, value.into_owned());
    }
    Ok(Element {
        tag,
        attrs,
        children: Vec::new(),
    })
}

/// Top-level elements below the `CastXML` root, with their children.
fn read_elements(text: &str) -> Result<Vec<Element>, CastXmlError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut elements = Vec::new();
    // Open elements below the root; children attach to the innermost.
    let mut stack: Vec<Element> = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => {
                depth += 1;
                if depth > 1 {
                    stack.push(element_of(&start)?);
                }
            }
            Event::Empty(start) => {
                if depth == 0 {
                    continue;
                }
                let element = element_of(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => elements.push(element),
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if let Some(element) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => elements.push(element),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    debug!(elements = elements.len(), "castxml elements read");
    Ok(elements)
}

// ============================================================================
// LOWERING
// ============================================================================

struct Document<'a> {
    index: FxHashMap<&'a str, &'a Element>,
}

impl Document<'_> {
    fn get(&self, id: &str) -> Result<&Element, CastXmlError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| CastXmlError::UnknownId(id.to_string()))
    }

    /// Qualified name of a namespace, class or enum, or `None` when the
    /// chain passes through something that is not a named scope.
    fn scope_name(&self, element: &Element) -> Result<Option<QualifiedName>, CastXmlError> {
        let mut segments: Vec<SmolStr> = Vec::new();
        let mut current = element;
        loop {
            match current.tag.as_str() {
                "Namespace" | "Class" | "Struct" | "Enumeration" | "Typedef" => {}
                _ => return Ok(None),
            }
            let name = current.attr("name").unwrap_or("");
            if name == "::" {
                break;
            }
            if name.is_empty() {
                // Anonymous scopes have no name a binding can refer to.
                return Ok(None);
            }
            segments.push(SmolStr::new(name));
            match current.attr("context") {
                Some(context) => current = self.get(context)?,
                None => break,
            }
        }
        segments.reverse();
        Ok(Some(QualifiedName::from_segments(segments)))
    }

    fn context_name(&self, element: &Element) -> Result<Option<QualifiedName>, CastXmlError> {
        match element.attr("context") {
            Some(context) => self.scope_name(self.get(context)?),
            None => Ok(Some(QualifiedName::root())),
        }
    }

    /// Rebuild the type behind a `type` attribute. A trailing `c` on the id
    /// marks a const-qualified reference.
    fn type_ref(&self, id: &str) -> Result<TypeRef, CastXmlError> {
        let mut ty = TypeRef::named("");
        let mut pointers = 0u8;
        let mut reference = Reference::None;
        let mut is_const = false;
        let mut current = id;

        for _ in 0..64 {
            let (base, cv_const) = match current.strip_suffix('c') {
                Some(base) if !self.index.contains_key(current) => (base, true),
                _ => (current, false),
            };
            is_const |= cv_const;
            let element = self.get(base)?;
            match element.tag.as_str() {
                "PointerType" => pointers += 1,
                "ReferenceType" => reference = Reference::LValue,
                "CvQualifiedType" => is_const |= element.flag("const"),
                "ElaboratedType" => {}
                "FundamentalType" => {
                    ty.name = QualifiedName::parse(&normalize_fundamental(element.attr("name").unwrap_or("")));
                    break;
                }
                "Class" | "Struct" | "Enumeration" | "Typedef" => {
                    ty.name = self
                        .scope_name(element)?
                        .unwrap_or_else(|| QualifiedName::parse(element.attr("name").unwrap_or("")));
                    break;
                }
                "ArrayType" => pointers += 1,
                // Function types and the like have no spelling a binding can use.
                other => {
                    ty.name = QualifiedName::parse(other);
                    break;
                }
            }
            match element.attr("type") {
                Some(next) => current = next,
                None => return Err(CastXmlError::UnknownId(format!("{}.type", base))),
            }
        }
        if ty.name.is_empty() {
            return Err(CastXmlError::TypeCycle(id.to_string()));
        }
        ty.is_const = is_const;
        ty.pointer_depth = pointers;
        ty.reference = reference;
        Ok(ty)
    }

    fn signature(&self, element: &Element) -> Result<Signature, CastXmlError> {
        let mut params = Vec::new();
        let mut is_variadic = false;
        for child in &element.children {
            match child.tag.as_str() {
                "Argument" => {
                    let ty = self.type_ref(child.attr("type").unwrap_or(""))?;
                    params.push(Param {
                        name: child.attr("name").map(SmolStr::new),
                        ty,
                        has_default: child.attr("default").is_some(),
                    });
                }
                "Ellipsis" => is_variadic = true,
                _ => {}
            }
        }
        let returns = match element.attr("returns") {
            Some(id) => Some(self.type_ref(id)?),
            None => None,
        };
        Ok(Signature {
            params,
            returns,
            is_const: element.flag("const"),
            is_variadic,
        })
    }

    fn symbol(&self, element: &Element) -> Result<Option<RealSymbol>, CastXmlError> {
        if element.attr("id").is_none() {
            return Err(CastXmlError::MissingId {
                element: element.tag.clone(),
            });
        }
        let kind = match element.tag.as_str() {
            "Class" | "Struct" => SymbolKind::Class,
            "Enumeration" => SymbolKind::Enum,
            "Method" | "OperatorMethod" => SymbolKind::Method,
            "Constructor" => SymbolKind::Constructor,
            "Destructor" => SymbolKind::Destructor,
            "Field" => SymbolKind::Field,
            "Function" | "OperatorFunction" => SymbolKind::Function,
            _ => return Ok(None),
        };

        let name = element.attr("name").unwrap_or("");
        if name.is_empty() {
            return Ok(None);
        }
        let Some(scope) = self.context_name(element)? else {
            return Ok(None);
        };
        let simple = match element.tag.as_str() {
            "OperatorMethod" | "OperatorFunction" => format!("operator{}", name),
            "Destructor" if !name.starts_with('~') => format!("~{}", name),
            _ => name.to_string(),
        };

        let mut symbol = RealSymbol::new(kind, scope.child(simple));
        symbol.access = match element.attr("access") {
            Some("private") => Access::Private,
            Some("protected") => Access::Protected,
            _ => Access::Public,
        };
        symbol.is_static = element.flag("static");

        match kind {
            SymbolKind::Class => {
                if let (Some(size), Some(align)) = (element.attr("size"), element.attr("align")) {
                    if let (Ok(size), Ok(align)) = (size.parse::<u64>(), align.parse::<u64>()) {
                        symbol = symbol.with_layout(size / 8, align / 8);
                    }
                }
                for base in element.children.iter().filter(|c| c.tag == "Base") {
                    if matches!(base.attr("access"), Some("private") | Some("protected")) {
                        continue;
                    }
                    let ty = self.type_ref(base.attr("type").unwrap_or(""))?;
                    symbol.bases.push(ty.name);
                }
            }
            SymbolKind::Enum => {
                symbol.variants = element
                    .children
                    .iter()
                    .filter(|c| c.tag == "EnumValue")
                    .map(|c| EnumVariant {
                        name: SmolStr::new(c.attr("name").unwrap_or("")),
                        value: c.attr("init").map(SmolStr::new),
                    })
                    .collect();
            }
            SymbolKind::Field => {
                symbol.field_type = Some(self.type_ref(element.attr("type").unwrap_or(""))?);
            }
            _ => symbol.signature = Some(self.signature(element)?),
        }
        Ok(Some(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::{Layout, SymbolTable};

    const PRIM: &str = r#"<?xml version="1.0"?>
<CastXML format="1.1.0">
  <Namespace id="_1" name="::" members="_2"/>
  <Namespace id="_2" name="PXR_INTERNAL_NS" context="_1" members="_3 _9"/>
  <Class id="_3" name="UsdPrim" context="_2" size="256" align="64" members="_4 _5 _6 _7"/>
  <Method id="_4" name="GetName" returns="_10" context="_3" access="public" const="1"/>
  <Method id="_5" name="SetActive" returns="_11" context="_3" access="public">
    <Argument name="active" type="_12"/>
  </Method>
  <Constructor id="_6" name="UsdPrim" context="_3" access="public"/>
  <Field id="_7" name="_proxyPrimPath" type="_13" context="_3" access="private"/>
  <OperatorMethod id="_8" name="==" returns="_12" context="_3" access="public" const="1">
    <Argument name="other" type="_14"/>
  </OperatorMethod>
  <Class id="_9" name="TfToken" context="_2" size="64" align="64"/>
  <ReferenceType id="_10" type="_9c"/>
  <FundamentalType id="_11" name="void"/>
  <FundamentalType id="_12" name="bool"/>
  <PointerType id="_13" type="_15"/>
  <ReferenceType id="_14" type="_3c"/>
  <FundamentalType id="_15" name="unsigned int"/>
  <Enumeration id="_16" name="Kind" context="_2" size="32" align="32">
    <EnumValue name="Model" init="0"/>
    <EnumValue name="Group" init="1"/>
  </Enumeration>
  <Function id="_17" name="UsdDescribe" returns="_11" context="_2">
    <Argument type="_14"/>
    <Ellipsis/>
  </Function>
</CastXML>
"#;

    fn find<'a>(symbols: &'a [RealSymbol], name: &str) -> &'a RealSymbol {
        let name = QualifiedName::parse(name);
        symbols.iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_classes_and_layout() {
        let symbols = load_castxml(PRIM).unwrap();
        let prim = find(&symbols, "PXR_INTERNAL_NS::UsdPrim");
        assert_eq!(prim.kind, SymbolKind::Class);
        assert_eq!(prim.layout, Some(Layout { size: 32, align: 8 }));
    }

    #[test]
    fn test_method_types() {
        let symbols = load_castxml(PRIM).unwrap();
        let get_name = find(&symbols, "PXR_INTERNAL_NS::UsdPrim::GetName");
        let signature = get_name.signature.as_ref().unwrap();
        assert!(signature.is_const);
        assert_eq!(signature.returns.as_ref().unwrap().to_string(), "const PXR_INTERNAL_NS::TfToken&");

        let eq = find(&symbols, "PXR_INTERNAL_NS::UsdPrim::operator==");
        assert_eq!(eq.kind, SymbolKind::Method);

        let field = find(&symbols, "PXR_INTERNAL_NS::UsdPrim::_proxyPrimPath");
        assert_eq!(field.access, Access::Private);
        assert_eq!(field.field_type.as_ref().unwrap().to_string(), "unsigned int*");
    }

    #[test]
    fn test_enums_and_functions() {
        let symbols = load_castxml(PRIM).unwrap();
        let kind = find(&symbols, "PXR_INTERNAL_NS::Kind");
        let names: Vec<&str> = kind.variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Model", "Group"]);

        let describe = find(&symbols, "PXR_INTERNAL_NS::UsdDescribe");
        let signature = describe.signature.as_ref().unwrap();
        assert!(signature.is_variadic);
        assert_eq!(signature.params[0].name, None);
        assert!(SymbolTable::load(symbols).is_ok());
    }

    #[test]
    fn test_public_bases_are_recorded() {
        let xml = r#"<CastXML format="1.1.0">
  <Namespace id="_1" name="::"/>
  <Namespace id="_2" name="pxr" context="_1"/>
  <Class id="_3" name="UsdObject" context="_2" size="64" align="64"/>
  <Class id="_4" name="TfRefBase" context="_2" size="64" align="64"/>
  <Class id="_5" name="UsdPrim" context="_2" size="128" align="64">
    <Base type="_6" access="public" virtual="0" offset="0"/>
    <Base type="_4" access="private" virtual="0" offset="8"/>
  </Class>
  <ElaboratedType id="_6" type="_3"/>
</CastXML>"#;
        let symbols = load_castxml(xml).unwrap();
        let prim = find(&symbols, "pxr::UsdPrim");
        assert_eq!(prim.bases, vec![QualifiedName::parse("pxr::UsdObject")]);
        assert!(find(&symbols, "pxr::UsdObject").bases.is_empty());
    }

    #[test]
    fn test_unknown_reference_is_an_error() {
        let text = r#"<CastXML><Field id="_1" name="x" type="_9" context="_2"/><Class id="_2" name="A"/></CastXML>"#;
        assert_eq!(load_castxml(text), Err(CastXmlError::UnknownId("_9".into())));
    }
}
