use std::sync::Arc;

use shapecast_model::{Candidates, Descriptor, NamespaceRegistry, SymbolPathDescriptor, Value};
use tracing::debug;

use crate::compile::{Coercion, Compiler, Cursor};
use crate::error::{CastError, LookupError, Mismatch};

pub(crate) fn compile_symbol_path(
    compiler: &Compiler<'_>,
    descriptor: &Descriptor,
    spec: &SymbolPathDescriptor,
) -> Coercion {
    let resolver = SymbolResolver {
        spec: spec.clone(),
        namespaces: compiler.context().namespaces().clone(),
        expected: descriptor.clone(),
    };
    compiler.coercion(descriptor, move |value, cursor| resolver.resolve(value, cursor))
}

/// Resolves dotted paths against the registered namespaces, restricted to
/// the roots and names the descriptor allows.
#[derive(Clone)]
pub(crate) struct SymbolResolver {
    spec: SymbolPathDescriptor,
    namespaces: Arc<NamespaceRegistry>,
    expected: Descriptor,
}

impl SymbolResolver {
    pub(crate) fn resolve(&self, value: &Value, cursor: &Cursor) -> Result<Value, CastError> {
        let Some(path) = value.as_text() else {
            return Err(cursor.mismatch(value, &self.expected, Mismatch::WrongKind));
        };
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(self.reject(value, cursor, Mismatch::MalformedSymbolPath));
        }
        let Some((root, rest)) = segments.split_first() else {
            return Err(self.reject(value, cursor, Mismatch::MalformedSymbolPath));
        };

        let allowed_root = self.spec.roots.admits(root);
        let resolved = if allowed_root {
            if !self.spec.admits(root, rest) {
                return Err(self.reject(value, cursor, Mismatch::SymbolNotAllowed));
            }
            lookup(&self.namespaces, root, rest)?
        } else if self.namespaces.get(root).is_some() {
            return Err(self.reject(value, cursor, Mismatch::SymbolNotAllowed));
        } else {
            match self.resolve_relative(&segments) {
                Some(resolved) => resolved,
                None => return Err(self.reject(value, cursor, Mismatch::SymbolNotAllowed)),
            }
        };
        debug!(path, kind = resolved.kind_name(), "resolved symbol");
        Ok(resolved)
    }

    /// Tries the whole path under each allowed root in declared order.
    fn resolve_relative(&self, segments: &[&str]) -> Option<Value> {
        let Candidates::Only(roots) = &self.spec.roots else {
            return None;
        };
        roots
            .iter()
            .filter(|root| self.spec.admits(root, segments))
            .find_map(|root| lookup(&self.namespaces, root, segments).ok())
    }

    fn reject(&self, value: &Value, cursor: &Cursor, reason: Mismatch) -> CastError {
        cursor.mismatch(value, &self.expected, reason)
    }
}

/// Walks `members` starting at the registered namespace `root`.
fn lookup(
    registry: &NamespaceRegistry,
    root: &str,
    members: &[&str],
) -> Result<Value, LookupError> {
    let Some(namespace) = registry.get(root) else {
        return Err(LookupError::UnknownRoot {
            root: root.to_string(),
        });
    };
    let mut current = Value::Namespace(namespace.clone());
    let mut owner = root.to_string();
    for member in members {
        let next = match &current {
            Value::Namespace(namespace) => namespace.member(member).cloned(),
            Value::Record(record) => record.get(member).cloned(),
            _ => None,
        };
        let Some(next) = next else {
            return Err(LookupError::MissingMember {
                owner,
                member: member.to_string(),
            });
        };
        current = next;
        owner.push('.');
        owner.push_str(member);
    }
    Ok(current)
}
