//! Server-side pages.
//!
//! Every `*.html` under the views directory is parsed once at start-up and
//! kept in memory. Page templates extend the shared layout in
//! `layouts/layout.html`; callers name pages without the extension
//! (`"auth/login"`).

use std::path::Path;

use axum::{http::StatusCode, response::Html};
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{debug, error};

pub const LAYOUT: &str = "layouts/layout.html";
const EXTENSION: &str = ".html";

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("views directory {0} does not exist")]
    MissingDir(String),
    #[error("layout template layouts/layout.html is missing")]
    MissingLayout,
    #[error("no view named {0}")]
    UnknownView(String),
    #[error(transparent)]
    Template(#[from] tera::Error),
}

pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ViewError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ViewError::MissingDir(dir.display().to_string()));
        }
        let glob = format!("{}/**/*{EXTENSION}", dir.display());
        let tera = Tera::new(&glob)?;
        if !tera.get_template_names().any(|n| n == LAYOUT) {
            return Err(ViewError::MissingLayout);
        }
        debug!(count = tera.get_template_names().count(), "views loaded");
        Ok(Self { tera })
    }

    fn template_name(view: &str) -> String {
        format!("{view}{EXTENSION}")
    }

    pub fn render(&self, view: &str, ctx: &Context) -> Result<String, ViewError> {
        let name = Self::template_name(view);
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(ViewError::UnknownView(view.to_string()));
        }
        Ok(self.tera.render(&name, ctx)?)
    }

    /// Renders for a handler, turning failures into a 500.
    pub fn page(&self, view: &str, ctx: &Context) -> Result<Html<String>, (StatusCode, String)> {
        self.render(view, ctx).map(Html).map_err(|e| {
            error!(error = %e, view, "render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page".to_string())
        })
    }
}

/// Context carrying the page title every layout expects.
pub fn titled(title: &str) -> Context {
    let mut ctx = Context::new();
    ctx.insert("title", title);
    ctx
}
