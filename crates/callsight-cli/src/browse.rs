//! Line-driven browsing session over the engagement list.

use std::io::Write as _;

use anyhow::Context;
use callsight_core::filter::{PAGE_SIZES, Pagination, paginate};
use callsight_core::{EngagementFilter, EngagementRecord, Page};
use callsight_sync::RecordSource;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::config::{Settings, Source};
use crate::display::{render_detail, render_page};
use crate::load_records;

const HELP: &str = "\
Commands:
  n            next page
  p            previous page
  g <page>     go to page
  z <size>     page size (5, 10, 15, 20, 25, 50)
  s <id>       show engagement
  c            close engagement
  f [text]     search company or owner (empty clears)
  r            refresh from the feed
  h            help
  q            quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Next,
    Prev,
    Goto(usize),
    PageSize(usize),
    Select(String),
    Close,
    Search(Option<String>),
    Refresh,
    Help,
    Quit,
}

/// What the loop should do after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Render,
    Refresh,
    Help,
    Quit,
}

pub fn parse_action(line: &str) -> Result<Action, String> {
    let line = line.trim();
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };
    let number = |what: &str| {
        arg.parse::<usize>()
            .map_err(|_| format!("{what} needs a number, got '{arg}'"))
    };

    match cmd {
        "n" | "next" => Ok(Action::Next),
        "p" | "prev" => Ok(Action::Prev),
        "g" | "goto" => number("goto").map(Action::Goto),
        "z" | "size" => {
            let size = number("size")?;
            if PAGE_SIZES.contains(&size) {
                Ok(Action::PageSize(size))
            } else {
                Err(format!("page size must be one of {PAGE_SIZES:?}"))
            }
        }
        "s" | "show" if !arg.is_empty() => Ok(Action::Select(arg.to_string())),
        "s" | "show" => Err("show needs an engagement id".into()),
        "c" | "close" => Ok(Action::Close),
        "f" | "find" => Ok(Action::Search((!arg.is_empty()).then(|| arg.to_string()))),
        "r" | "refresh" => Ok(Action::Refresh),
        "h" | "help" | "?" => Ok(Action::Help),
        "q" | "quit" | "exit" => Ok(Action::Quit),
        "" => Err("type h for help".into()),
        other => Err(format!("unknown command '{other}'; type h for help")),
    }
}

/// Selection, position, and filters for one browsing session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub selected: Option<String>,
    pub pagination: Pagination,
    pub filter: EngagementFilter,
}

impl Session {
    /// Apply `action` given the page currently on screen.
    pub fn apply(&mut self, action: Action, current: &Page) -> Step {
        match action {
            Action::Next if current.has_next() => self.pagination.page = current.number + 1,
            Action::Prev if current.has_prev() => self.pagination.page = current.number - 1,
            Action::Next | Action::Prev => {}
            Action::Goto(page) => self.pagination.page = page,
            Action::PageSize(size) => {
                self.pagination.per_page = size;
                self.pagination.page = 1;
            }
            Action::Select(id) => self.selected = Some(id),
            Action::Close => self.selected = None,
            Action::Search(term) => {
                self.filter.search = term;
                self.pagination.page = 1;
            }
            Action::Refresh => return Step::Refresh,
            Action::Help => return Step::Help,
            Action::Quit => return Step::Quit,
        }
        Step::Render
    }

    /// Render the current page and selection, settling the page number and
    /// dropping a selection that no longer exists.
    pub fn view(&mut self, records: &[EngagementRecord], settings: &Settings) -> (String, Page) {
        let matched = self.filter.apply(records, &settings.org);
        let page = paginate(matched.len(), self.pagination);
        self.pagination.page = page.number;

        let mut out = render_page(&matched, &page, &settings.parser, self.selected.as_deref());
        if let Some(id) = self.selected.clone() {
            match records.iter().find(|r| r.id() == id) {
                Some(record) => {
                    out.push('\n');
                    out.push_str(&render_detail(record, &settings.parser, &settings.crm_url));
                }
                None => {
                    out.push_str(&format!("No engagement with id '{id}'.\n"));
                    self.selected = None;
                }
            }
        }
        (out, page)
    }
}

pub async fn run(source: &Source, settings: &Settings, mut session: Session) -> anyhow::Result<()> {
    let mut records = load_records(source).await?;
    let (view, mut page) = session.view(&records, settings);
    println!("{view}");
    println!("Type h for help.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("writing prompt")?;
        let Some(line) = lines.next_line().await.context("reading command")? else {
            break;
        };
        let action = match parse_action(&line) {
            Ok(action) => action,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };

        match session.apply(action, &page) {
            Step::Quit => break,
            Step::Help => {
                println!("{HELP}");
                continue;
            }
            Step::Refresh => {
                source.invalidate().await.context("clearing feed cache")?;
                match source.fetch().await {
                    Ok(fresh) if !fresh.is_empty() => records = fresh,
                    Ok(_) => warn!("refresh returned no engagements; keeping previous data"),
                    Err(e) => warn!(error = %e, "refresh failed; keeping previous data"),
                }
            }
            Step::Render => {}
        }

        let (view, settled) = session.view(&records, settings);
        page = settled;
        println!("{view}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlobalArgs;
    use clap::Parser;
    use serde_json::json;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        global: GlobalArgs,
    }

    fn settings() -> Settings {
        let h = Harness::try_parse_from(["callsight", "--no-cache"]).unwrap();
        Settings::from_args(&h.global)
    }

    fn records(n: usize) -> Vec<EngagementRecord> {
        (0..n)
            .map(|i| {
                serde_json::from_value(json!({
                    "engagement_id": format!("e-{i}"),
                    "external_company": if i % 2 == 0 { "Acme" } else { "Globex" },
                    "created_at": format!("2024-01-{:02}T09:00:00Z", i + 1),
                }))
                .unwrap()
            })
            .collect()
    }

    fn page(number: usize, total_pages: usize) -> Page {
        Page {
            number,
            total_pages,
            total_records: total_pages * 5,
            start: (number - 1) * 5,
            end: number * 5,
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_action("n"), Ok(Action::Next));
        assert_eq!(parse_action(" g 3 "), Ok(Action::Goto(3)));
        assert_eq!(parse_action("z 25"), Ok(Action::PageSize(25)));
        assert_eq!(parse_action("s e-1"), Ok(Action::Select("e-1".into())));
        assert_eq!(
            parse_action("f acme corp"),
            Ok(Action::Search(Some("acme corp".into())))
        );
        assert_eq!(parse_action("f"), Ok(Action::Search(None)));
        assert_eq!(parse_action("q"), Ok(Action::Quit));
        assert!(parse_action("g two").is_err());
        assert!(parse_action("z 7").is_err());
        assert!(parse_action("s").is_err());
        assert!(parse_action("xyzzy").is_err());
    }

    #[test]
    fn paging_stops_at_the_ends() {
        let mut session = Session::default();
        assert_eq!(session.apply(Action::Prev, &page(1, 3)), Step::Render);
        assert_eq!(session.pagination.page, 1);

        session.apply(Action::Next, &page(1, 3));
        assert_eq!(session.pagination.page, 2);

        session.pagination.page = 3;
        session.apply(Action::Next, &page(3, 3));
        assert_eq!(session.pagination.page, 3);
    }

    #[test]
    fn search_and_page_size_reset_to_first_page() {
        let mut session = Session::default();
        session.pagination.page = 4;
        session.apply(Action::Search(Some("acme".into())), &page(4, 5));
        assert_eq!(session.pagination.page, 1);
        assert_eq!(session.filter.search.as_deref(), Some("acme"));

        session.pagination.page = 2;
        session.apply(Action::PageSize(50), &page(2, 5));
        assert_eq!(session.pagination, Pagination { page: 1, per_page: 50 });
    }

    #[test]
    fn non_render_steps() {
        let mut session = Session::default();
        let p = page(1, 1);
        assert_eq!(session.apply(Action::Refresh, &p), Step::Refresh);
        assert_eq!(session.apply(Action::Help, &p), Step::Help);
        assert_eq!(session.apply(Action::Quit, &p), Step::Quit);
    }

    #[test]
    fn view_settles_out_of_range_page() {
        let records = records(12);
        let mut session = Session {
            pagination: Pagination { page: 9, per_page: 5 },
            ..Default::default()
        };
        let (out, page) = session.view(&records, &settings());
        assert_eq!(page.number, 1);
        assert_eq!(session.pagination.page, 1);
        assert!(out.starts_with("Showing 1-5 of 12 engagements"));
        // Newest first.
        assert!(out.find("e-11").unwrap() < out.find("e-10").unwrap());
    }

    #[test]
    fn view_shows_and_drops_selection() {
        let records = records(3);
        let settings = settings();

        let mut session = Session::default();
        session.apply(Action::Select("e-1".into()), &page(1, 1));
        let (out, _) = session.view(&records, &settings);
        assert!(out.contains("=== Globex ==="));
        assert_eq!(session.selected.as_deref(), Some("e-1"));

        session.apply(Action::Select("missing".into()), &page(1, 1));
        let (out, _) = session.view(&records, &settings);
        assert!(out.contains("No engagement with id 'missing'."));
        assert_eq!(session.selected, None);
    }

    #[test]
    fn view_applies_search() {
        let records = records(4);
        let mut session = Session::default();
        session.apply(Action::Search(Some("globex".into())), &page(1, 1));
        let (out, page) = session.view(&records, &settings());
        assert_eq!(page.total_records, 2);
        assert!(!out.contains("Acme"));
    }
}
