//! Static website generation for an advisory database using Tera templates.
//!
//! [`render_site`] writes:
//!
//! - `index.html`: every advisory, newest first;
//! - `advisories/<ID>.html`: one page per advisory;
//! - `packages/<name>.html`: every advisory for one package.
//!
//! Templates are registered under `.html` names so Tera escapes all
//! interpolated values.

use crate::advisory::Advisory;
use crate::database::Database;
use crate::error::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tera::{Context, Tera};
use tracing::info;

#[derive(serde::Serialize)]
struct AdvisoryView<'a> {
    id: &'a str,
    package: &'a str,
    title: &'a str,
    description: &'a str,
    date: String,
    url: Option<&'a str>,
    cvss: Option<String>,
    score: Option<f64>,
    rating: String,
    kind: String,
    aliases: &'a [String],
    categories: &'a [String],
    keywords: &'a [String],
    references: &'a [String],
    patched: Vec<String>,
    unaffected: Vec<String>,
    withdrawn: Option<String>,
}

impl<'a> From<&'a Advisory> for AdvisoryView<'a> {
    fn from(advisory: &'a Advisory) -> Self {
        let meta = &advisory.metadata;
        let kind = match &meta.informational {
            Some(info) => info.to_string(),
            None => "vulnerability".to_string(),
        };
        AdvisoryView {
            id: &meta.id,
            package: meta.package.as_str(),
            title: &meta.title,
            description: &meta.description,
            date: meta.date.to_string(),
            url: meta.url.as_deref(),
            cvss: meta.cvss.as_ref().map(|c| c.vector().to_string()),
            score: meta.cvss.as_ref().map(|c| c.score()),
            rating: meta
                .rating()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unrated".to_string()),
            kind,
            aliases: &meta.aliases,
            categories: &meta.categories,
            keywords: &meta.keywords,
            references: &meta.references,
            patched: advisory.versions.patched.iter().map(|r| r.to_string()).collect(),
            unaffected: advisory
                .versions
                .unaffected
                .iter()
                .map(|r| r.to_string())
                .collect(),
            withdrawn: meta.withdrawn.map(|d| d.to_string()),
        }
    }
}

/// Renders the database as a static site into `out_dir`.
///
/// Returns the number of pages written.
pub fn render_site(database: &Database, out_dir: &Path) -> Result<usize> {
    let tera = templates()?;

    let mut advisories: Vec<&Advisory> = database.iter().collect();
    advisories.sort_by(|a, b| {
        b.metadata
            .date
            .cmp(&a.metadata.date)
            .then_with(|| b.id().cmp(a.id()))
    });
    let views: Vec<AdvisoryView> = advisories.iter().map(|a| AdvisoryView::from(*a)).collect();

    std::fs::create_dir_all(out_dir.join("advisories"))?;
    std::fs::create_dir_all(out_dir.join("packages"))?;

    let mut context = Context::new();
    context.insert("advisories", &views);
    context.insert("count", &views.len());
    context.insert("version", env!("CARGO_PKG_VERSION"));
    std::fs::write(out_dir.join("index.html"), tera.render("index.html", &context)?)?;
    let mut pages = 1;

    for view in &views {
        let mut context = Context::new();
        context.insert("advisory", view);
        let rendered = tera.render("advisory.html", &context)?;
        std::fs::write(
            out_dir.join("advisories").join(format!("{}.html", view.id)),
            rendered,
        )?;
        pages += 1;
    }

    let mut by_package: BTreeMap<&str, Vec<&AdvisoryView>> = BTreeMap::new();
    for view in &views {
        by_package.entry(view.package).or_default().push(view);
    }
    for (package, list) in &by_package {
        let mut context = Context::new();
        context.insert("package", package);
        context.insert("advisories", list);
        let rendered = tera.render("package.html", &context)?;
        std::fs::write(out_dir.join("packages").join(format!("{package}.html")), rendered)?;
        pages += 1;
    }

    info!(pages, out_dir = %out_dir.display(), "static site written");
    Ok(pages)
}

fn templates() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", BASE_TEMPLATE),
        ("index.html", INDEX_TEMPLATE),
        ("advisory.html", ADVISORY_TEMPLATE),
        ("package.html", PACKAGE_TEMPLATE),
    ])?;
    Ok(tera)
}

const BASE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{% block title %}Advisory Database{% endblock title %}</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f8fafc; color: #1e293b; line-height: 1.6; margin: 0; }
        .container { max-width: 960px; margin: 0 auto; padding: 20px; }
        header { background: #0f172a; color: white; padding: 24px 20px; }
        header a { color: white; text-decoration: none; }
        table { width: 100%; border-collapse: collapse; background: white; }
        th, td { text-align: left; padding: 8px 12px; border-bottom: 1px solid #e2e8f0; }
        .badge { display: inline-block; padding: 1px 8px; border-radius: 12px; color: white; font-size: 0.75em; font-weight: 700; text-transform: uppercase; }
        .badge-critical { background: #dc2626; }
        .badge-high { background: #ea580c; }
        .badge-medium { background: #ca8a04; }
        .badge-low { background: #2563eb; }
        .badge-none, .badge-unrated { background: #6b7280; }
        .badge-informational { background: #7c3aed; }
        pre { background: white; border: 1px solid #e2e8f0; padding: 15px; white-space: pre-wrap; word-wrap: break-word; }
        dt { font-weight: 600; }
        .withdrawn { color: #dc2626; font-weight: 700; }
    </style>
</head>
<body>
    <header><div class="container"><a href="{% block root %}.{% endblock root %}/index.html">Advisory Database</a></div></header>
    <div class="container">
    {% block content %}{% endblock content %}
    </div>
</body>
</html>
"#;

const INDEX_TEMPLATE: &str = r#"{% extends "base.html" %}
{% block content %}
<h1>Advisories ({{ count }})</h1>
<table>
    <tr><th>ID</th><th>Package</th><th>Title</th><th>Date</th><th>Severity</th></tr>
    {% for a in advisories %}
    <tr>
        <td><a href="advisories/{{ a.id }}.html">{{ a.id }}</a></td>
        <td><a href="packages/{{ a.package }}.html">{{ a.package }}</a></td>
        <td>{{ a.title }}{% if a.withdrawn %} <span class="withdrawn">(withdrawn)</span>{% endif %}</td>
        <td>{{ a.date }}</td>
        <td>{% if a.kind != "vulnerability" %}<span class="badge badge-informational">{{ a.kind }}</span>{% else %}<span class="badge badge-{{ a.rating }}">{{ a.rating }}</span>{% endif %}</td>
    </tr>
    {% endfor %}
</table>
<p>Generated by oxidized-cargo-audit {{ version }}</p>
{% endblock content %}
"#;

const ADVISORY_TEMPLATE: &str = r#"{% extends "base.html" %}
{% block title %}{{ advisory.id }}: {{ advisory.title }}{% endblock title %}
{% block root %}..{% endblock root %}
{% block content %}
<h1>{{ advisory.id }}</h1>
<h2>{{ advisory.title }}</h2>
{% if advisory.withdrawn %}<p class="withdrawn">Withdrawn on {{ advisory.withdrawn }}</p>{% endif %}
<dl>
    <dt>Package</dt><dd><a href="../packages/{{ advisory.package }}.html">{{ advisory.package }}</a></dd>
    <dt>Date</dt><dd>{{ advisory.date }}</dd>
    <dt>Type</dt><dd>{{ advisory.kind }}</dd>
    {% if advisory.cvss %}<dt>Severity</dt><dd><span class="badge badge-{{ advisory.rating }}">{{ advisory.score }} {{ advisory.rating }}</span> <code>{{ advisory.cvss }}</code></dd>{% endif %}
    {% if advisory.url %}<dt>URL</dt><dd><a href="{{ advisory.url }}">{{ advisory.url }}</a></dd>{% endif %}
    {% if advisory.aliases | length > 0 %}<dt>Aliases</dt><dd>{{ advisory.aliases | join(sep=", ") }}</dd>{% endif %}
    {% if advisory.categories | length > 0 %}<dt>Categories</dt><dd>{{ advisory.categories | join(sep=", ") }}</dd>{% endif %}
    {% if advisory.keywords | length > 0 %}<dt>Keywords</dt><dd>{{ advisory.keywords | join(sep=", ") }}</dd>{% endif %}
    <dt>Patched</dt><dd>{% if advisory.patched | length > 0 %}{{ advisory.patched | join(sep=" OR ") }}{% else %}no patched versions{% endif %}</dd>
    {% if advisory.unaffected | length > 0 %}<dt>Unaffected</dt><dd>{{ advisory.unaffected | join(sep=" OR ") }}</dd>{% endif %}
</dl>
<h3>Description</h3>
<pre>{{ advisory.description }}</pre>
{% if advisory.references | length > 0 %}
<h3>References</h3>
<ul>{% for r in advisory.references %}<li><a href="{{ r }}">{{ r }}</a></li>{% endfor %}</ul>
{% endif %}
{% endblock content %}
"#;

const PACKAGE_TEMPLATE: &str = r#"{% extends "base.html" %}
{% block title %}{{ package }}{% endblock title %}
{% block root %}..{% endblock root %}
{% block content %}
<h1>{{ package }}</h1>
<ul>
{% for a in advisories %}
    <li><a href="../advisories/{{ a.id }}.html">{{ a.id }}</a>: {{ a.title }} ({{ a.date }})</li>
{% endfor %}
</ul>
{% endblock content %}
"#;
