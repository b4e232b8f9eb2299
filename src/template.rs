//! Statement rendering.
//!
//! Templates are Jinja-style files resolved against a fixed root directory. The parameter
//! mapping of a call is the render context, so template authors can branch on it:
//! ```sql
//! SELECT id, name FROM users
//! WHERE 1 = 1
//! {% if name is not_empty %}
//!   AND name = :name
//! {% endif %}
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use minijinja::{Environment, Value, path_loader};

use crate::error::SqlMapError;
use crate::types::SqlParams;

/// True iff the value is bound and not null.
#[must_use]
pub fn is_present(value: &Value) -> bool {
    !value.is_undefined() && !value.is_none()
}

/// True iff the value is bound, not null, and not the empty string.
#[must_use]
pub fn is_not_empty(value: &Value) -> bool {
    is_present(value) && value.as_str() != Some("")
}

/// Where the SQL for a call comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementSource<'a> {
    /// Template name, resolved against the renderer's root.
    Template(&'a str),
    /// SQL used verbatim.
    Direct(&'a str),
}

impl StatementSource<'_> {
    #[must_use]
    pub fn is_template(&self) -> bool {
        matches!(self, StatementSource::Template(_))
    }
}

pub struct TemplateRenderer {
    env: Environment<'static>,
    root: PathBuf,
}

impl TemplateRenderer {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, trim_blocks: bool) -> Self {
        let root = root.into();
        let mut env = Environment::new();
        env.set_trim_blocks(trim_blocks);
        env.set_loader(path_loader(root.clone()));
        env.add_test("present", is_present);
        env.add_test("not_empty", is_not_empty);
        Self { env, root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Render the named template with `params` as context.
    ///
    /// # Errors
    /// Returns `SqlMapError::RenderError` if the template is missing, malformed, or fails to render.
    pub fn render(&self, name: &str, params: &SqlParams) -> Result<String, SqlMapError> {
        let template = self.env.get_template(name)?;
        Ok(template.render(params)?)
    }

    /// Render an inline template source with `params` as context.
    ///
    /// # Errors
    /// Returns `SqlMapError::RenderError` if the source is malformed or fails to render.
    pub fn render_str(&self, source: &str, params: &SqlParams) -> Result<String, SqlMapError> {
        Ok(self.env.render_str(source, params)?)
    }

    /// Resolve a statement source to SQL text.
    ///
    /// # Errors
    /// Returns `SqlMapError::RenderError` for template failures; direct SQL never fails.
    pub fn resolve(
        &self,
        source: StatementSource<'_>,
        params: &SqlParams,
    ) -> Result<String, SqlMapError> {
        match source {
            StatementSource::Template(name) => self.render(name, params),
            StatementSource::Direct(sql) => Ok(sql.to_owned()),
        }
    }
}

impl fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;

    fn renderer() -> TemplateRenderer {
        TemplateRenderer::new(std::env::temp_dir(), true)
    }

    #[test]
    fn predicate_table() {
        let cases = [
            (Value::UNDEFINED, false, false),
            (Value::from(()), false, false),
            (Value::from(""), true, false),
            (Value::from("x"), true, true),
            (Value::from(0), true, true),
        ];
        for (value, present, not_empty) in cases {
            assert_eq!(is_present(&value), present, "present({value:?})");
            assert_eq!(is_not_empty(&value), not_empty, "not_empty({value:?})");
        }
    }

    #[test]
    fn predicates_inside_templates() {
        let r = renderer();
        let src = "{% if v is present %}P{% endif %}{% if v is not_empty %}N{% endif %}";
        let render = |params: SqlParams| r.render_str(src, &params).unwrap();

        assert_eq!(render(SqlParams::new()), "");
        assert_eq!(render(SqlParams::new().with("v", RowValues::Null)), "");
        assert_eq!(render(SqlParams::new().with("v", "")), "P");
        assert_eq!(render(SqlParams::new().with("v", "x")), "PN");
    }

    #[test]
    fn renders_params_inline() {
        let sql = renderer()
            .render_str(
                "SELECT id, name FROM users WHERE id = {{id}}",
                &SqlParams::new().with("id", 7),
            )
            .unwrap();
        assert_eq!(sql, "SELECT id, name FROM users WHERE id = 7");
    }

    #[test]
    fn direct_source_is_verbatim() {
        let sql = renderer()
            .resolve(StatementSource::Direct("select {{ not rendered }}"), &SqlParams::new())
            .unwrap();
        assert_eq!(sql, "select {{ not rendered }}");
    }

    #[test]
    fn missing_template_is_render_error() {
        let err = renderer()
            .render("definitely_not_here_sql_map.sql", &SqlParams::new())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Render);
    }
}
