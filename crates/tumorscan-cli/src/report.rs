//! Self-contained HTML run reports.
//!
//! A [`Report`] is a titled page made of [`ReportSection`]s, each holding
//! free-form `maud` markup and interactive `plotly` figures. Plotly's
//! JavaScript bundle is loaded from its CDN.
use std::path::Path;

use anyhow::Result;
use chrono::Local;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

use crate::util::write_bytes_to_file;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            content: Vec::new(),
        }
    }

    pub fn add_content(&mut self, markup: Markup) {
        self.content.push(markup);
    }

    pub fn add_plot(&mut self, plot: Plot) {
        let div_id = format!(
            "plot-{}-{}",
            self.title.to_lowercase().replace(' ', "-"),
            self.content.len()
        );
        self.content
            .push(PreEscaped(plot.to_inline_html(Some(div_id.as_str()))));
    }

    fn render(&self) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for block in &self.content {
                    div class="block" { (block) }
                }
            }
        }
    }
}

pub struct Report {
    app_name: String,
    version: String,
    title: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(app_name: &str, version: &str, title: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            version: version.to_string(),
            title: title.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> Markup {
        let generated = Local::now().format("%Y-%m-%d %H:%M:%S");
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_CDN) {}
                    style {
                        "body { font-family: sans-serif; margin: 2em auto; max-width: 1100px; }
                        table { border-collapse: collapse; }
                        th, td { padding: 4px 12px; text-align: right; border-bottom: 1px solid #ddd; }
                        th:first-child, td:first-child { text-align: left; }
                        .block { margin-bottom: 1.5em; }"
                    }
                }
                body {
                    header {
                        h1 { (self.title) }
                        p { (self.app_name) " v" (self.version) " | generated " (generated.to_string()) }
                    }
                    @for section in &self.sections {
                        (section.render())
                    }
                }
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        write_bytes_to_file(path, self.render().into_string().as_bytes())?;
        log::info!("Report saved to: {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_renders_sections_and_plots() {
        let mut report = Report::new("tumorscan", "0.1.0", "Run <Report>");
        let mut section = ReportSection::new("Overview");
        section.add_content(html! { p { "hello" } });
        section.add_plot(Plot::new());
        report.add_section(section);

        let out = report.render().into_string();
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("Run &lt;Report&gt;"));
        assert!(out.contains("<h2>Overview</h2>"));
        assert!(out.contains("<p>hello</p>"));
        assert!(out.contains("plot-overview-1"));
    }
}
