//! Boundary interface for dialect conversion passes.
//!
//! The pattern-rewrite engine that consumes these lives elsewhere; this
//! module only declares what a conversion pass exposes: a name, an
//! applicability predicate, and the set of source-to-target operator
//! mappings it wants applied. Nothing here touches the gradient rules.

/// A fully qualified operator name inside a dialect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpHandle {
    pub dialect: String,
    pub name: String,
}

impl OpHandle {
    pub fn new(dialect: &str, name: &str) -> Self {
        OpHandle {
            dialect: dialect.to_string(),
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for OpHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.dialect, self.name)
    }
}

/// One declarative rewrite: replace `source_op` with `target_op`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewritePattern {
    pub source_op: OpHandle,
    pub target_op: OpHandle,
}

/// A conversion pass as seen by the rewrite engine.
pub trait DialectConversionPass {
    fn name(&self) -> &str;

    /// Whether the pass should run on a region rooted at `op`.
    fn can_apply_on(&self, op: &OpHandle) -> bool;

    /// The rewrite patterns to install, in application order.
    fn patterns(&self) -> Vec<RewritePattern>;
}

/// Converts the framework-native operator dialect into the primitive
/// dialect the gradient rules and the compiler backend speak.
pub struct NativeToPrimitivePass {
    patterns: Vec<RewritePattern>,
}

const NATIVE: &str = "native";
const PRIM: &str = "prim";

impl NativeToPrimitivePass {
    pub fn new() -> Self {
        let table: &[(&str, &str)] = &[
            ("sum", "reduce_sum"),
            ("max", "reduce_max"),
            ("prod", "reduce_prod"),
            ("add", "elementwise_add"),
            ("subtract", "elementwise_sub"),
            ("multiply", "elementwise_mul"),
            ("divide", "elementwise_div"),
            ("elementwise_pow", "pow"),
            ("maximum", "elementwise_max"),
            ("minimum", "elementwise_min"),
            ("reshape", "reshape"),
            ("transpose", "transpose"),
            ("concat", "concat"),
            ("split", "split"),
            ("slice", "slice"),
            ("expand", "broadcast_to"),
            ("scale", "scale"),
            ("gather", "gather"),
            ("gather_nd", "gather_nd"),
            ("scatter", "scatter"),
            ("softmax", "softmax"),
            ("gelu", "gelu"),
            ("relu", "relu"),
            ("layer_norm", "layer_norm"),
            ("dropout", "dropout"),
        ];
        let patterns = table
            .iter()
            .map(|&(src, dst)| RewritePattern {
                source_op: OpHandle::new(NATIVE, src),
                target_op: OpHandle::new(PRIM, dst),
            })
            .collect();
        NativeToPrimitivePass { patterns }
    }
}

impl Default for NativeToPrimitivePass {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectConversionPass for NativeToPrimitivePass {
    fn name(&self) -> &str {
        "native_to_primitive"
    }

    fn can_apply_on(&self, op: &OpHandle) -> bool {
        // applies to whole-module roots in the native or builtin dialects
        op.dialect == NATIVE || (op.dialect == "builtin" && op.name == "module")
    }

    fn patterns(&self) -> Vec<RewritePattern> {
        self.patterns.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_applicability() {
        let pass = NativeToPrimitivePass::new();
        assert!(pass.can_apply_on(&OpHandle::new("builtin", "module")));
        assert!(pass.can_apply_on(&OpHandle::new("native", "sum")));
        assert!(!pass.can_apply_on(&OpHandle::new("prim", "reduce_sum")));
    }

    #[test]
    fn test_patterns_map_native_to_prim() {
        let pass = NativeToPrimitivePass::new();
        let patterns = pass.patterns();
        assert!(!patterns.is_empty());
        assert!(patterns
            .iter()
            .all(|p| p.source_op.dialect == "native" && p.target_op.dialect == "prim"));
        let sum = patterns
            .iter()
            .find(|p| p.source_op.name == "sum")
            .unwrap();
        assert_eq!(sum.target_op.name, "reduce_sum");
        assert_eq!(sum.target_op.to_string(), "prim.reduce_sum");
    }
}
