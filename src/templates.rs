use axum::response::Html;
use std::sync::OnceLock;
use tera::{Context, Tera};

static TERA: OnceLock<Tera> = OnceLock::new();

pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| match Tera::new("templates/**/*.html") {
        Ok(tera) => tera,
        Err(e) => {
            tracing::error!("Failed to load templates: {}", e);
            Tera::default()
        }
    })
}

pub fn render(name: &str, ctx: &Context) -> Html<String> {
    let rendered = get_tera().render(name, ctx).unwrap_or_else(|e| {
        tracing::error!("Failed to render {}: {:?}", name, e);
        format!("Template error: {}", name)
    });
    Html(rendered)
}
