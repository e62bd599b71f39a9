//! Server-rendered pages.
//!
//! Templates are embedded at compile time so the binary has no runtime
//! template directory to locate.

use anyhow::{Context, Result};
use minijinja::Environment;
use serde::Serialize;

pub struct Views {
    env: Environment<'static>,
}

impl Views {
    /// Load every template into the environment.
    ///
    /// # Errors
    /// Returns an error if a template fails to parse.
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("layout.html", include_str!("../../templates/layout.html"))?;
        env.add_template("home.html", include_str!("../../templates/home.html"))?;
        env.add_template("login.html", include_str!("../../templates/login.html"))?;
        env.add_template("register.html", include_str!("../../templates/register.html"))?;
        env.add_template("secrets.html", include_str!("../../templates/secrets.html"))?;
        env.add_template("submit.html", include_str!("../../templates/submit.html"))?;
        Ok(Self { env })
    }

    /// Render a template with the given context.
    ///
    /// # Errors
    /// Returns an error for an unknown template or a render failure.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        let template = self
            .env
            .get_template(name)
            .with_context(|| format!("unknown template {name}"))?;
        template
            .render(ctx)
            .with_context(|| format!("failed to render {name}"))
    }
}
