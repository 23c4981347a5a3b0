//! Per-call validation state.

use std::{any::Any, cell::RefCell, rc::Rc};

use crate::{
    error::{EvalError, SchemaError},
    notes::Notes,
    schema::{NodeId, Schema},
};

/// Hard recursion limit. Reference cycles in a schema are legal; this cap
/// is what guarantees progress against them.
pub const MAX_DEPTH: u32 = 1000;

/// Validation options. These are uncommon, so the plain
/// [`validate`](Schema::validate) entry point does not take them.
#[derive(Debug, Clone, Default)]
pub struct ValidateOpts {
    /// Write `default` values into the instance before validating.
    ///
    /// A missing object property whose `properties` sub-schema carries a
    /// `default` is inserted, unless the property is `required` (the
    /// caller must supply those). A `null` array slot covered by
    /// `prefixItems` (or a pre-2020 `items` list) with a `default` is
    /// replaced. If the default is not permitted by the rest of the
    /// schema, validation may then fail.
    pub apply_defaults: bool,

    /// Check `format` keywords against the registered format validators.
    /// Unregistered formats always match.
    pub validate_format: bool,
}

/// State threaded through one validation call.
///
/// Each recursion step works on a child state with its own notes bag and
/// instance path; `version_data` is shared by every state of the call and
/// holds draft-specific scratch (draft 2020-12 keeps its dynamic-anchor
/// scope there).
pub struct ValidationState<'s> {
    /// The schema being validated against; owns every node.
    pub root: &'s Schema,
    /// The node whose parts are currently executing.
    pub node: NodeId,
    /// Index into the current node's parts.
    pub index: usize,
    /// Notes recorded while validating this node.
    pub notes: Notes,
    /// Recursion depth, capped at [`MAX_DEPTH`].
    pub depth: u32,
    /// Options for this call.
    pub opts: &'s ValidateOpts,
    /// Opaque per-draft slot, shared across the whole call.
    pub version_data: Rc<RefCell<Option<Box<dyn Any>>>>,
    /// RFC 6901 tokens to the current location within the instance.
    pub instance_path: Vec<String>,
}

impl<'s> ValidationState<'s> {
    pub(crate) fn new(root: &'s Schema, opts: &'s ValidateOpts) -> ValidationState<'s> {
        ValidationState {
            root,
            node: root.root(),
            index: 0,
            notes: Notes::default(),
            depth: 0,
            opts,
            version_data: Rc::new(RefCell::new(None)),
            instance_path: Vec::new(),
        }
    }

    /// A child state for validating a sub-schema without disturbing the
    /// notes stored here. Fails once the recursion limit is hit.
    pub fn child(&self) -> Result<ValidationState<'s>, EvalError> {
        if self.depth > MAX_DEPTH {
            return Err(EvalError::Fatal(SchemaError::RecursionLimit));
        }
        Ok(ValidationState {
            root: self.root,
            node: self.node,
            index: self.index,
            notes: Notes::default(),
            depth: self.depth + 1,
            opts: self.opts,
            version_data: Rc::clone(&self.version_data),
            instance_path: self.instance_path.clone(),
        })
    }

    /// Appends a token to the instance path.
    pub fn push_instance_token(&mut self, tok: &str) {
        self.instance_path.push(tok.to_string());
    }

    /// Removes the last token from the instance path.
    pub fn pop_instance_token(&mut self) {
        self.instance_path.pop();
    }

    /// The current instance location as a `#`-prefixed JSON Pointer.
    pub fn instance_pointer(&self) -> String {
        if self.instance_path.is_empty() {
            return "#".to_string();
        }
        let mut out = String::from("#");
        for tok in &self.instance_path {
            out.push('/');
            out.push_str(&crate::error::escape_token(tok));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft202012;

    #[test]
    fn instance_pointer_escapes_tokens() {
        let schema = draft202012::Builder::new().build();
        let opts = ValidateOpts::default();
        let mut state = ValidationState::new(&schema, &opts);
        assert_eq!(state.instance_pointer(), "#");
        state.push_instance_token("a/b");
        state.push_instance_token("c");
        assert_eq!(state.instance_pointer(), "#/a~1b/c");
        state.pop_instance_token();
        assert_eq!(state.instance_pointer(), "#/a~1b");
    }

    #[test]
    fn child_stops_at_depth_limit() {
        let schema = draft202012::Builder::new().build();
        let opts = ValidateOpts::default();
        let mut state = ValidationState::new(&schema, &opts);
        state.depth = MAX_DEPTH + 1;
        assert!(state.child().is_err());
    }
}
