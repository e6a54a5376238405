//! Embedded minijinja templates. Names ending in `.html` are auto-escaped.

use minijinja::Environment;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("agent_form.html", include_str!("../../templates/agent_form.html")),
    ("agent_document.html", include_str!("../../templates/agent_document.html")),
    ("documents.html", include_str!("../../templates/documents.html")),
    ("upload.html", include_str!("../../templates/upload.html")),
    ("document_detail.html", include_str!("../../templates/document_detail.html")),
    ("audit.html", include_str!("../../templates/audit.html")),
];

pub const STYLESHEET: &str = include_str!("../../static/healthcore.css");

pub fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    for &(name, source) in TEMPLATES {
        env.add_template(name, source)?;
    }
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_all_templates_compile() {
        let env = environment().unwrap();
        for &(name, _) in TEMPLATES {
            env.get_template(name).unwrap();
        }
    }

    #[test]
    fn test_html_is_escaped() {
        let env = environment().unwrap();
        let html = env
            .get_template("login.html")
            .unwrap()
            .render(context! { username => "<b>x</b>", next => "/" })
            .unwrap();
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
    }
}
