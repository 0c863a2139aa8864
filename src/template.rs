use crate::error::ApiError;
use actix_web::HttpResponse;
use lazy_static::lazy_static;
use std::collections::HashMap;
use tera::{Result as TeraResult, Tera, Value};

lazy_static! {
    pub static ref TERA: Tera = {
        // Relative to the crate root, where the binary and tests run.
        let mut tera = match Tera::new("templates/**/*.html") {
            Ok(t) => t,
            Err(e) => {
                log::error!("template parsing error(s): {}", e);
                ::std::process::exit(1);
            }
        };

        tera.register_filter("json", json_filter);
        tera.register_filter("runtime", runtime_filter);
        tera
    };
}

// Embeds a value into an inline script. `<` is escaped so content can't close the tag.
fn json_filter(value: &Value, _: &HashMap<String, Value>) -> TeraResult<Value> {
    match serde_json::to_string(value) {
        Ok(json_string) => Ok(Value::String(json_string.replace('<', "\\u003c"))),
        Err(e) => Err(tera::Error::msg(format!("JSON serialization error: {}", e))),
    }
}

/// Minutes as "2h 32m".
pub fn format_runtime(minutes: i64) -> String {
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

fn runtime_filter(value: &Value, _: &HashMap<String, Value>) -> TeraResult<Value> {
    let minutes = value
        .as_i64()
        .ok_or_else(|| tera::Error::msg("runtime filter expects an integer"))?;
    Ok(Value::String(format_runtime(minutes)))
}

pub fn render(name: &str, context: &tera::Context) -> Result<HttpResponse, ApiError> {
    let html = TERA
        .render(name, context)
        .map_err(|e| ApiError::internal("Failed to render page", format!("{}: {:?}", name, e)))?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_formatting() {
        assert_eq!(format_runtime(152), "2h 32m");
        assert_eq!(format_runtime(120), "2h");
        assert_eq!(format_runtime(47), "47m");
    }

    #[test]
    fn json_filter_escapes_script_close() {
        let value = serde_json::json!({ "footer": "</script>" });
        let out = json_filter(&value, &HashMap::new()).unwrap();
        assert_eq!(out, Value::String(r#"{"footer":"\u003c/script>"}"#.to_string()));
    }

    #[test]
    fn templates_parse() {
        for name in ["index.html", "browse.html", "search.html", "watch.html", "admin/dashboard.html"] {
            assert!(
                TERA.get_template_names().any(|t| t == name),
                "missing template {}",
                name
            );
        }
    }
}
