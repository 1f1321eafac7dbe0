//! Minijinja templates for outgoing mail.
//!
//! Templates are compiled into the binary and registered once per
//! [`TemplateRenderer`]. Each message has a subject, an HTML body and a
//! plain-text body rendered from the same context.

use minijinja::Environment;
use serde::Serialize;

use crate::traits::{NotifyError, OutgoingEmail};

const LAYOUT: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
{% block content %}{% endblock %}
</div>"#;

const SHARED_SUBJECT: &str = r#"{{ sharer }} shared "{{ title }}" with you on Examly"#;
const SHARED_HTML: &str = r#"{% extends "layout.html" %}{% block content %}
<h1 style="color: #4F46E5;">New study material</h1>
<p>{{ sharer }} shared <strong>{{ title }}</strong> with you.</p>
<a href="{{ app_url }}/dashboard/materials/{{ material_id }}" style="display: inline-block; padding: 12px 24px; background-color: #4F46E5; color: white; text-decoration: none; border-radius: 6px;">Open material</a>
{% endblock %}"#;
const SHARED_TEXT: &str = r#"{{ sharer }} shared "{{ title }}" with you. Open it at {{ app_url }}/dashboard/materials/{{ material_id }}"#;

/// Context for the "material shared" email.
#[derive(Debug, Clone, Serialize)]
pub struct SharedContext {
    pub sharer: String,
    pub title: String,
    pub material_id: String,
    pub app_url: String,
}

#[derive(Debug)]
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self, NotifyError> {
        let mut env = Environment::new();
        let templates = [
            ("layout.html", LAYOUT),
            ("shared.subject", SHARED_SUBJECT),
            ("shared.html", SHARED_HTML),
            ("shared.txt", SHARED_TEXT),
        ];
        for (name, source) in templates {
            env.add_template(name, source)
                .map_err(|e| NotifyError::Template(e.to_string()))?;
        }
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: impl Serialize) -> Result<String, NotifyError> {
        self.env
            .get_template(name)
            .and_then(|t| t.render(ctx))
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    fn email(&self, stem: &str, to: &str, ctx: impl Serialize + Copy) -> Result<OutgoingEmail, NotifyError> {
        Ok(OutgoingEmail {
            to: to.to_string(),
            subject: self.render(&format!("{stem}.subject"), ctx)?,
            html: self.render(&format!("{stem}.html"), ctx)?,
            text: self.render(&format!("{stem}.txt"), ctx)?,
        })
    }

    pub fn material_shared(&self, to: &str, ctx: &SharedContext) -> Result<OutgoingEmail, NotifyError> {
        self.email("shared", to, ctx)
    }
}
