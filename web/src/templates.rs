//! Jinja-style template environment.
//!
//! Templates are embedded at compile time and rendered through one
//! [`minijinja::Environment`] owned by the application state.

use axum::response::Html;
use minijinja::Environment;

use crate::error::AppError;

/// Build the template environment with every page registered.
///
/// # Errors
///
/// Fails when a template does not parse — a build-time defect surfaced at
/// startup, never mid-request.
pub fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("base.html", include_str!("../templates/base.html"))?;
    env.add_template("index.html", include_str!("../templates/index.html"))?;
    env.add_template("shop.html", include_str!("../templates/shop.html"))?;
    env.add_template("cart.html", include_str!("../templates/cart.html"))?;
    env.add_template("checkout.html", include_str!("../templates/checkout.html"))?;
    env.add_template("login.html", include_str!("../templates/login.html"))?;
    env.add_template("portal.html", include_str!("../templates/portal.html"))?;
    Ok(env)
}

/// Render one template to an HTML response.
///
/// # Errors
///
/// Maps a render failure to a generic 500.
pub fn render(
    env: &Environment<'static>,
    name: &str,
    ctx: minijinja::Value,
) -> Result<Html<String>, AppError> {
    let template = env
        .get_template(name)
        .map_err(|e| AppError::internal("template missing").with_source(anyhow::Error::new(e)))?;
    template
        .render(ctx)
        .map(Html)
        .map_err(|e| AppError::internal("template render failed").with_source(anyhow::Error::new(e)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn every_template_parses() {
        environment().unwrap();
    }

    #[test]
    fn index_renders_artwork_cards() {
        let env = environment().unwrap();
        let html = render(
            &env,
            "index.html",
            context! {
                artworks => vec![context! {
                    title => "Sunset",
                    image_url => "/images/Sunset",
                    link => "/shop/Sunset",
                    price => 225,
                }],
            },
        )
        .unwrap();
        assert!(html.0.contains("Sunset"));
        assert!(html.0.contains("/shop/Sunset"));
    }
}
