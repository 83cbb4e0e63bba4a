/// HTML escaping helpers.
pub mod escape;

/// Per-commit link strategies.
pub mod url;

use std::fmt::Write;

use tracing::debug;

use crate::AppResult;
use crate::history::Section;
use crate::time_utils::format_commit_time;
use escape::{escape_html, inline_markup};
pub(crate) use url::{TemplateUrls, UrlStrategy};

/// Class token carried by every per-commit element.
pub const NODE_CLASS: &str = "literate-git-node";

/// Attribute holding the full lowercase commit id of a node.
pub const COMMIT_ATTR: &str = "data-commit-sha1";

const STYLE: &str = "\
body { font-family: sans-serif; max-width: 48em; margin: 2em auto; }
.literate-git-node { border-top: 1px solid #ccc; padding: 0.5em 0; }
.literate-git-header { color: #666; font-size: 0.9em; }
.literate-git-links a { margin-left: 0.5em; }
.literate-git-changes { font-family: monospace; font-size: 0.9em; }
";

/// Render `sections` as one complete HTML document.
///
/// With `include_results`, each node also links to the commit's result and
/// source as given by `urls`; links the strategy does not supply are left
/// out.
#[tracing::instrument(
    name = "Rendering document",
    level = "debug",
    skip(sections, urls),
    fields(sections = sections.len())
)]
pub fn render(
    sections: &[Section],
    urls: &dyn UrlStrategy,
    title: &str,
    include_results: bool,
) -> AppResult<String> {
    let title = escape_html(title);
    let mut html = String::new();

    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "<meta charset=\"utf-8\">")?;
    writeln!(html, "<title>{title}</title>")?;
    writeln!(html, "<style>\n{STYLE}</style>")?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html, "<h1>{title}</h1>")?;

    for section in sections {
        write_section(&mut html, section, urls, include_results)?;
    }

    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;

    debug!("Rendered {} bytes of HTML", html.len());
    Ok(html)
}

fn write_section(
    html: &mut String,
    section: &Section,
    urls: &dyn UrlStrategy,
    include_results: bool,
) -> AppResult<()> {
    let id = section.id();
    let sha1 = id.to_string();

    writeln!(
        html,
        "<div class=\"{NODE_CLASS}\" {COMMIT_ATTR}=\"{sha1}\" id=\"section-{}\">",
        section.position
    )?;
    writeln!(html, "<div class=\"literate-git-header\">")?;
    writeln!(html, "<span class=\"literate-git-sha1\">{}</span>", &sha1[..7])?;
    writeln!(
        html,
        "<span class=\"literate-git-date\">{}</span>",
        escape_html(&format_commit_time(
            section.commit.time,
            section.commit.offset_minutes
        ))
    )?;

    if include_results {
        let links: Vec<(&str, String)> = [
            ("SOURCE", urls.source_url(id)),
            ("RESULT", urls.result_url(id)),
        ]
        .into_iter()
        .filter_map(|(label, url)| url.map(|url| (label, url)))
        .collect();
        if !links.is_empty() {
            write!(html, "<span class=\"literate-git-links\">")?;
            for (label, url) in links {
                write!(html, "<a href=\"{}\">{label}</a>", escape_html(&url))?;
            }
            writeln!(html, "</span>")?;
        }
    }
    writeln!(html, "</div>")?;

    if let Some(annotation) = &section.annotation {
        writeln!(
            html,
            "<h2 class=\"literate-git-title\">{}</h2>",
            inline_markup(&annotation.title)
        )?;
        for paragraph in &annotation.body {
            writeln!(html, "<p>{}</p>", inline_markup(paragraph))?;
        }
    }

    if !section.changed_paths.is_empty() {
        writeln!(html, "<ul class=\"literate-git-changes\">")?;
        for path in &section.changed_paths {
            writeln!(html, "<li>{}</li>", escape_html(path))?;
        }
        writeln!(html, "</ul>")?;
    }

    writeln!(html, "</div>")?;
    Ok(())
}
