//! Interactive terminal dashboard. One input line is one interaction: it is
//! parsed, run to completion against the session, and its result printed.

pub mod render;
pub mod session;

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::database::repo::LocalStore;
use crate::ingest::client::ArtifactSource;
use crate::reports::catalog::ReportGroup;
use crate::reports::engine::ReportEngine;
use self::session::{ChoiceSource, Session};

const PREVIEW_ROWS: usize = 20;
const REPORT_ROWS: usize = 50;

const HELP: &str = "\
Commands:
  classifications            list classifications to choose from
  refresh                    reload classifications (with live object counts)
  use <classification>       choose a classification (\"All\" for no filter)
  pages <start> <end>        choose the page range to fetch
  fetch                      fetch and flatten the selected pages
  show json|table            preview the fetched rows
  insert                     load the fetched rows into the database
  counts                     row counts of the database tables
  reports                    list available reports
  report <id> [key=value..]  run a report
  help                       this text
  quit                       leave";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowMode {
    Json,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Classifications,
    Refresh,
    Use(String),
    Pages(u32, u32),
    Fetch,
    Show(ShowMode),
    Insert,
    Counts,
    Reports,
    Report { id: String, params: Vec<(String, String)> },
    Quit,
}

pub fn parse_params<'a, I: IntoIterator<Item = &'a str>>(args: I) -> Result<Vec<(String, String)>> {
    args.into_iter()
        .map(|arg| match arg.split_once('=') {
            Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
            _ => bail!("expected key=value, got '{}'", arg),
        })
        .collect()
}

/// Parses one input line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();

    let command = match word.to_ascii_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "classifications" => Command::Classifications,
        "refresh" => Command::Refresh,
        "use" => {
            if rest.is_empty() {
                bail!("usage: use <classification>");
            }
            Command::Use(rest.to_string())
        }
        "pages" => {
            let (Some(start), Some(end), None) = (args.next(), args.next(), args.next()) else {
                bail!("usage: pages <start> <end>");
            };
            let start = start.parse::<u32>().with_context(|| format!("invalid start page '{}'", start))?;
            let end = end.parse::<u32>().with_context(|| format!("invalid end page '{}'", end))?;
            Command::Pages(start, end)
        }
        "fetch" => Command::Fetch,
        "show" => match args.next() {
            Some("json") => Command::Show(ShowMode::Json),
            Some("table") | None => Command::Show(ShowMode::Table),
            Some(other) => bail!("unknown view '{}', expected json or table", other),
        },
        "insert" => Command::Insert,
        "counts" => Command::Counts,
        "reports" => Command::Reports,
        "report" => {
            let Some(id) = args.next() else {
                bail!("usage: report <id> [key=value ...]");
            };
            Command::Report { id: id.to_string(), params: parse_params(args)? }
        }
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{}', type `help`", other),
    };
    Ok(Some(command))
}

pub struct Dashboard<'a> {
    session: Session,
    source: Option<&'a dyn ArtifactSource>,
    db_path: PathBuf,
    engine: ReportEngine,
    show_progress: bool,
}

impl<'a> Dashboard<'a> {
    pub fn new(source: Option<&'a dyn ArtifactSource>, db_path: PathBuf) -> Self {
        Self {
            session: Session::new(),
            source,
            db_path,
            engine: ReportEngine::new(),
            show_progress: true,
        }
    }

    #[cfg(test)]
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Reads commands until `quit` or end of input. Command failures are
    /// printed and the loop carries on.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        writeln!(out, "Harvard Artifacts Explorer. Type `help` for commands.")?;
        if let Some(source) = self.source {
            // Startup never fails on the live list; the static one stands in.
            let _ = self.session.refresh_classifications(source);
        }
        self.print_counts(out)?;

        for line in input.lines() {
            let line = line.context("Failed to read input")?;
            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    writeln!(out, "error: {}", e)?;
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            if let Err(e) = self.execute(command, out) {
                error!("{:#}", e);
                writeln!(out, "error: {:#}", e)?;
            }
        }
        Ok(())
    }

    fn open_store(&self) -> Result<LocalStore> {
        LocalStore::open(&self.db_path).with_context(|| format!("Failed to open {:?}", self.db_path))
    }

    fn print_counts<W: Write>(&self, out: &mut W) -> Result<()> {
        match self.open_store().and_then(|store| Ok((store.counts()?, store.orphaned_colors()?))) {
            Ok((counts, orphans)) => {
                render::table_counts(out, &counts)?;
                render::integrity(out, orphans)?;
            }
            Err(e) => writeln!(out, "warning: database unavailable: {:#}", e)?,
        }
        Ok(())
    }

    fn require_source(&self) -> Result<&'a dyn ArtifactSource> {
        match self.source {
            Some(source) => Ok(source),
            None => bail!("no API client available; configure HARVARD_API_KEY first"),
        }
    }

    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        match command {
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Classifications => {
                let (origin, choices) = self.session.classification_choices();
                let note = match origin {
                    ChoiceSource::Live => "live",
                    ChoiceSource::Cached => "cached, last refresh failed",
                    ChoiceSource::Static => "built-in list",
                };
                writeln!(out, "Classifications ({}):", note)?;
                for (name, count) in choices {
                    let marker = if name == self.session.classification() { "*" } else { " " };
                    match count {
                        Some(n) => writeln!(out, " {} {} ({} objects)", marker, name, n)?,
                        None => writeln!(out, " {} {}", marker, name)?,
                    }
                }
            }
            Command::Refresh => {
                let source = self.require_source()?;
                match self.session.refresh_classifications(source) {
                    Ok(n) => writeln!(out, "Loaded {} classifications.", n)?,
                    Err(e) => writeln!(out, "warning: {}. Keeping the previous list.", e)?,
                }
            }
            Command::Use(name) => {
                self.session.set_classification(&name);
                writeln!(out, "Classification: {}", self.session.classification())?;
            }
            Command::Pages(start, end) => {
                let range = self.session.set_range(start, end)?;
                writeln!(out, "Pages {} to {}", range.start(), range.end())?;
            }
            Command::Fetch => self.fetch(out)?,
            Command::Show(mode) => self.show(mode, out)?,
            Command::Insert => {
                let mut store = self.open_store()?;
                let counts = self.session.insert(&mut store)?;
                writeln!(out, "Database: {}", store.path().display())?;
                render::load_counts(out, &counts)?;
                render::table_counts(out, &store.counts()?)?;
                render::integrity(out, store.orphaned_colors()?)?;
            }
            Command::Counts => {
                let store = self.open_store()?;
                render::table_counts(out, &store.counts()?)?;
                render::integrity(out, store.orphaned_colors()?)?;
            }
            Command::Reports => {
                for group in ReportGroup::ALL {
                    writeln!(out, "{}:", group.label())?;
                    for report in self.engine.catalog().iter().filter(|r| r.group == group) {
                        let params: Vec<String> =
                            report.params.iter().map(|p| format!("{}={}", p.name, p.default)).collect();
                        writeln!(out, "  {:<32} {} {}", report.id, report.title, params.join(" "))?;
                        let columns: Vec<String> =
                            report.columns.iter().map(|c| format!("{} ({})", c.name, c.kind.label())).collect();
                        writeln!(out, "  {:<32} -> {}", "", columns.join(", "))?;
                    }
                }
            }
            Command::Report { id, params } => {
                let store = self.open_store()?;
                let output = self.engine.run(&store, &id, &params)?;
                writeln!(out, "{}", output.definition.title)?;
                render::query_result(out, &output.result, REPORT_ROWS)?;
                if let Some(hint) = output.chart() {
                    render::bar_chart(out, &output.result, hint)?;
                }
            }
            Command::Quit => {}
        }
        Ok(())
    }

    fn fetch<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let source = self.require_source()?;
        let range = self.session.range();
        let progress = if self.show_progress {
            let bar = ProgressBar::new(range.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                    .context("Invalid progress template")?
                    .progress_chars("=> "),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let summary = self.session.fetch(source, &progress);
        if let Some(e) = &summary.error {
            writeln!(out, "error: {}. Remaining pages were not fetched.", e)?;
        }
        writeln!(
            out,
            "Fetched {} of {} page(s), {} record(s) for {}.",
            summary.pages_fetched,
            range.len(),
            summary.records,
            self.session.classification()
        )?;
        if summary.total_records > 0 {
            writeln!(out, "{} matching record(s) available in total.", summary.total_records)?;
        }
        if summary.warnings > 0 {
            writeln!(out, "{} malformed entr(ies) skipped.", summary.warnings)?;
        }
        if let Some(fetched) = self.session.fetched() {
            let batch = &fetched.flattened.batch;
            writeln!(
                out,
                "Ready to insert: {} metadata, {} media, {} colors.",
                batch.metadata.len(),
                batch.media.len(),
                batch.colors.len()
            )?;
            info!(pages = fetched.pages_fetched, "Fetch stored in session");
        }
        Ok(())
    }

    fn show<W: Write>(&self, mode: ShowMode, out: &mut W) -> Result<()> {
        let Some(fetched) = self.session.fetched() else {
            bail!("nothing fetched yet, run `fetch` first");
        };
        let batch = &fetched.flattened.batch;
        writeln!(
            out,
            "{}, pages {} to {}",
            fetched.classification,
            fetched.range.start(),
            fetched.range.end()
        )?;
        match mode {
            ShowMode::Json => {
                writeln!(out, "{}", serde_json::to_string_pretty(batch).context("Failed to encode rows")?)?;
            }
            ShowMode::Table => {
                writeln!(out, "Metadata")?;
                let rows: Vec<Vec<String>> = batch
                    .metadata
                    .iter()
                    .map(|m| {
                        vec![
                            m.id.to_string(),
                            m.title.clone(),
                            m.culture.clone(),
                            m.century.clone(),
                            m.department.clone(),
                            m.classification.clone(),
                        ]
                    })
                    .collect();
                render::table(
                    out,
                    &columns(&["id", "title", "culture", "century", "department", "classification"]),
                    &rows,
                    PREVIEW_ROWS,
                )?;

                writeln!(out, "\nMedia")?;
                let rows: Vec<Vec<String>> = batch
                    .media
                    .iter()
                    .map(|m| {
                        [m.objectid, m.imagecount, m.mediacount, m.colorcount, m.rank, m.datebegin, m.dateend]
                            .iter()
                            .map(|v| v.to_string())
                            .collect()
                    })
                    .collect();
                render::table(
                    out,
                    &columns(&["objectid", "imagecount", "mediacount", "colorcount", "rank", "datebegin", "dateend"]),
                    &rows,
                    PREVIEW_ROWS,
                )?;

                writeln!(out, "\nColors")?;
                let rows: Vec<Vec<String>> = batch
                    .colors
                    .iter()
                    .map(|c| {
                        vec![
                            c.objectid.to_string(),
                            c.color.clone(),
                            c.hue.clone(),
                            c.spectrum.clone(),
                            c.percent.to_string(),
                            c.css3.clone(),
                        ]
                    })
                    .collect();
                render::table(
                    out,
                    &columns(&["objectid", "color", "hue", "spectrum", "percent", "css3"]),
                    &rows,
                    PREVIEW_ROWS,
                )?;
            }
        }
        Ok(())
    }
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::client::tests::FakeSource;
    use crate::ingest::types::Classification;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn run_script(source: Option<&dyn ArtifactSource>, db_path: PathBuf, script: &str) -> String {
        let mut dashboard = Dashboard::new(source, db_path).without_progress();
        let mut out = Vec::new();
        dashboard.run(Cursor::new(script), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("  ").unwrap(), None);
        assert_eq!(parse_command("# note").unwrap(), None);
        assert_eq!(parse_command("use Textile Arts").unwrap(), Some(Command::Use("Textile Arts".to_string())));
        assert_eq!(parse_command("pages 2 4").unwrap(), Some(Command::Pages(2, 4)));
        assert_eq!(parse_command("SHOW json").unwrap(), Some(Command::Show(ShowMode::Json)));
        assert_eq!(parse_command("show").unwrap(), Some(Command::Show(ShowMode::Table)));
        assert_eq!(
            parse_command("report top-colors limit=3").unwrap(),
            Some(Command::Report {
                id: "top-colors".to_string(),
                params: vec![("limit".to_string(), "3".to_string())],
            })
        );
        assert!(parse_command("pages 1").is_err());
        assert!(parse_command("pages one two").is_err());
        assert!(parse_command("report").is_err());
        assert!(parse_command("report x limit").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_fetch_insert_report_session() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("harvard_db.sqlite3");
        let mut source = FakeSource::new(10, 2);
        source.classifications = Some(vec![Classification { name: "Paintings".to_string(), objectcount: 20 }]);

        let output = run_script(
            Some(&source),
            db.clone(),
            "use Paintings\npages 1 2\nfetch\ninsert\ninsert\nreport department-counts\nquit\nfetch\n",
        );

        assert!(output.contains("Fetched 2 of 2 page(s), 20 record(s) for Paintings."));
        assert!(output.contains("Ready to insert: 20 metadata, 20 media, 40 colors."));
        assert!(output.contains("Inserted 80 row(s): 20 metadata, 20 media, 40 colors."));
        assert!(output.contains("Records already exist"));
        assert!(output.contains("Department-wise Artifact Counts"));
        assert!(output.contains("artifact_count by department"));
        // Nothing after `quit` ran.
        assert_eq!(source.requested.borrow().len(), 2);

        assert!(output.contains("Integrity: every color row references an artifact."));
        let store = LocalStore::open(&db).unwrap();
        assert_eq!(store.counts().unwrap().colors, 40);
    }

    #[test]
    fn test_errors_are_reported_and_loop_continues() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::new(1, 0);
        source.failing = vec![2];

        let output = run_script(
            Some(&source),
            dir.path().join("db.sqlite3"),
            "insert\npages 3 1\npages 1 3\nfetch\nreport nope\nclassifications\n",
        );

        assert!(output.contains("error: nothing fetched yet"));
        assert!(output.contains("error: invalid page range 3..=1"));
        assert!(output.contains("error: failed to fetch page 2: HTTP status 500"));
        assert!(output.contains("Fetched 1 of 3 page(s)"));
        assert!(output.contains("error: unknown report 'nope'"));
        assert!(output.contains("built-in list"));
    }

    #[test]
    fn test_reports_work_without_api_client() {
        let dir = tempdir().unwrap();
        let output = run_script(None, dir.path().join("db.sqlite3"), "fetch\nreports\nreport total-colors\n");
        assert!(output.contains("error: no API client available"));
        assert!(output.contains("Join-Based Queries:"));
        assert!(output.contains("department (text), artifact_count (integer)"));
        assert!(output.contains("total_color_entries"));
    }

    #[test]
    fn test_show_json_lists_rows() {
        let dir = tempdir().unwrap();
        let source = FakeSource::new(1, 1);
        let output = run_script(Some(&source), dir.path().join("db.sqlite3"), "fetch\nshow json\nshow table\n");
        assert!(output.contains("\"metadata\""));
        assert!(output.contains("\"css3\": \"#000000\""));
        assert!(output.contains("Colors"));
    }
}
