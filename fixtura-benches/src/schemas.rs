//! Synthetic schemas.

use fixtura_core::{ScalarKind, Schema, StructDef, TypeExpr};

use crate::{error::BenchSetupError, params::ShapeParams};

/// Name of level `index` in a [`chain`] schema.
#[must_use]
pub fn level_name(index: usize) -> String {
    format!("Level{index}")
}

/// Name of scalar member `index`.
#[must_use]
pub fn member_name(index: usize) -> String {
    format!("m{index}")
}

/// A chain `Level0 -> Level1 -> ...` where each level carries `breadth`
/// scalar members, a `Vec` of the next level and an optional reference to
/// `Level0`. The reference is cut as a cycle on `Level0` itself; below a
/// collection only the depth bound stops it.
///
/// # Errors
/// Returns [`BenchSetupError::ZeroValue`] when `depth` is zero.
pub fn chain(shape: ShapeParams) -> Result<(Schema, TypeExpr), BenchSetupError> {
    if shape.depth == 0 {
        return Err(BenchSetupError::ZeroValue { context: "depth" });
    }
    let scalars = [ScalarKind::String, ScalarKind::I64, ScalarKind::F64, ScalarKind::Bool];
    let schema = (0..shape.depth).fold(Schema::new(), |schema, level| {
        let def = (0..shape.breadth).fold(StructDef::new(level_name(level)), |def, index| {
            let kind = scalars.get(index % scalars.len()).copied().unwrap_or(ScalarKind::String);
            def.field(member_name(index), kind)
        });
        let def = def.field(
            "root",
            TypeExpr::optional(TypeExpr::named(level_name(0))),
        );
        let def = if level + 1 < shape.depth {
            def.field("children", TypeExpr::seq(TypeExpr::named(level_name(level + 1))))
        } else {
            def
        };
        schema.with(def)
    });
    Ok((schema, TypeExpr::named(level_name(0))))
}

#[cfg(test)]
mod tests {
    use super::*;

    use fixtura_core::FixtureBuilder;
    use rstest::rstest;

    #[rstest]
    fn chains_populate_and_cut_the_back_reference() {
        let (schema, root) = chain(ShapeParams { depth: 2, breadth: 3 }).expect("non-zero depth");
        let value = FixtureBuilder::from_schema(schema, root)
            .with_seed(1)
            .create_value()
            .expect("valid schema");
        assert!(value.pointer("m0").and_then(|member| member.as_str()).is_some());
        assert_eq!(value.pointer("root"), Some(&fixtura_core::Value::Null));
    }

    #[rstest]
    fn zero_depth_is_rejected() {
        let err = chain(ShapeParams { depth: 0, breadth: 1 }).expect_err("zero depth");
        assert!(matches!(err, BenchSetupError::ZeroValue { context: "depth" }));
    }
}
