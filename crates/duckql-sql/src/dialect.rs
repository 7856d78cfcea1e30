//! The DuckDB dialect.

use std::sync::Arc;

use crate::ast::Query;
use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::error::CompileResult;
use crate::mapping::TableMapping;

/// DuckDB dialect configured with a table mapping.
///
/// The mapping is fixed at construction and shared by every compiler the
/// dialect creates. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct DuckDbDialect {
    mapping: Arc<TableMapping>,
}

impl DuckDbDialect {
    /// Creates a dialect with the given table mapping.
    pub fn new(mapping: TableMapping) -> Self {
        Self {
            mapping: Arc::new(mapping),
        }
    }

    /// Returns the table mapping.
    pub fn mapping(&self) -> &TableMapping {
        &self.mapping
    }

    /// Creates a compiler bound to this dialect's mapping.
    pub fn compiler(&self) -> QueryCompiler<'_> {
        QueryCompiler::new(self.mapping.as_ref())
    }

    /// Compiles `query` to SQL text and parameters.
    pub fn compile(&self, query: &Query) -> CompileResult<CompiledQuery> {
        let compiled = self.compiler().compile(query)?;
        tracing::debug!(
            kind = query.kind(),
            sql = %compiled.sql,
            params = compiled.parameters.len(),
            "compiled query"
        );
        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::QueryBuilder;
    use crate::error::CompileError;
    use crate::types::NativeValue;
    use crate::{ColumnDef, LogicalType};

    fn dialect() -> DuckDbDialect {
        DuckDbDialect::new(
            TableMapping::new()
                .with("person", "read_json('person.json')")
                .with("archive.person", "read_parquet('person.parquet')"),
        )
    }

    #[test]
    fn test_default_dialect_has_empty_mapping() {
        let dialect = DuckDbDialect::default();
        assert!(dialect.mapping().is_empty());
        let compiled = dialect
            .compile(&QueryBuilder::new().select_from("person").build())
            .unwrap();
        assert_eq!(compiled.sql, "select * from \"person\"");
    }

    #[test]
    fn test_compile_mapped_select() {
        let query = QueryBuilder::new()
            .select_from("person")
            .select(&["first_name"])
            .where_eq("id", 42)
            .build();
        let compiled = dialect().compile(&query).unwrap();
        assert_eq!(
            compiled.sql,
            "select \"first_name\" from read_json('person.json') where \"id\" = ?"
        );
        assert_eq!(compiled.parameters, vec![NativeValue::Integer(42)]);
    }

    #[test]
    fn test_default_schema_changes_lookup_key() {
        let query = QueryBuilder::new()
            .with_schema("archive")
            .select_from("person")
            .build();
        let compiled = dialect().compile(&query).unwrap();
        assert_eq!(compiled.sql, "select * from read_parquet('person.parquet')");
    }

    #[test]
    fn test_compile_is_deterministic() {
        let query = QueryBuilder::new()
            .select_from("person as p")
            .left_join("archive.person as a", "p.id", "a.id")
            .where_eq("p.name", "x")
            .limit(3)
            .build();
        let dialect = dialect();
        assert_eq!(dialect.compile(&query).unwrap(), dialect.compile(&query).unwrap());
    }

    #[test]
    fn test_auto_increment_propagates() {
        let query = QueryBuilder::new()
            .create_table("t")
            .column(ColumnDef::new("id", LogicalType::BigInt).auto_increment())
            .build();
        assert!(matches!(
            dialect().compile(&query),
            Err(CompileError::AutoIncrementUnsupported { .. })
        ));
    }
}
