use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dom_highlighter::dom::layout::block_layout;
use dom_highlighter::{
    detect_scrollable_containers, find_element, generate_css_path, generate_xpath, get_robust_selector,
    CapabilityTag, Config, Highlighter, Page,
};
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let input = Arg::new("input")
        .required(true)
        .help("Page to analyse: an .html file or a .json snapshot");

    Command::new("dom-highlighter")
        .about("Classifies interactive elements and generates robust selectors")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("JSON configuration file"),
        )
        .subcommand(
            Command::new("find")
                .about("List descriptors for the requested capability tags")
                .arg(input.clone())
                .arg(
                    Arg::new("tag")
                        .long("tag")
                        .short('t')
                        .action(ArgAction::Append)
                        .help("CLICKABLE, FILLABLE, SELECTABLE or NON_INTERACTIVE_ELEMENT"),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Full JSON report with every capability tag")
                .arg(input.clone()),
        )
        .subcommand(
            Command::new("selector")
                .about("Robust selector, XPath and CSS path for one element")
                .arg(input.clone())
                .arg(Arg::new("css").long("css").required(true).help("Selector of the target element")),
        )
        .subcommand(
            Command::new("scrollables")
                .about("Scrollable containers across all reachable documents")
                .arg(input),
        )
}

fn load_page(path: &str, config: &Config) -> Result<Page> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
    let is_snapshot = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let page = if is_snapshot {
        Page::from_snapshot(&raw)?
    } else {
        let url = format!("file://{}", path);
        let mut page = Page::from_html_with_viewport(&raw, &url, config.viewport);
        block_layout(&mut page);
        page
    };
    info!("Loaded {} ({} nodes)", path, page.len());
    Ok(page)
}

fn input_of(matches: &ArgMatches) -> Result<&String> {
    matches
        .get_one::<String>("input")
        .ok_or_else(|| anyhow!("missing input path"))
}

fn requested_tags(matches: &ArgMatches) -> Result<Vec<CapabilityTag>> {
    let Some(values) = matches.get_many::<String>("tag") else {
        return Ok(CapabilityTag::ALL.to_vec());
    };
    values
        .map(|value| value.parse::<CapabilityTag>().map_err(anyhow::Error::from))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    match matches.subcommand() {
        Some(("find", sub)) => {
            let page = load_page(input_of(sub)?, &config)?;
            let tags = requested_tags(sub)?;
            let descriptors = Highlighter::new(config).find_elements(&page, &tags).await?;
            println!("{}", serde_json::to_string_pretty(&descriptors)?);
        }
        Some(("report", sub)) => {
            let page = load_page(input_of(sub)?, &config)?;
            println!("{}", Highlighter::new(config).generate_json(&page).await?);
        }
        Some(("selector", sub)) => {
            let page = load_page(input_of(sub)?, &config)?;
            let css = sub
                .get_one::<String>("css")
                .ok_or_else(|| anyhow!("missing --css"))?;
            let element = find_element(&page, "", css)?.ok_or_else(|| anyhow!("no element matches {}", css))?;
            let robust = match get_robust_selector(&page, element, &config.selector) {
                Ok(selector) => Some(selector),
                Err(err) => {
                    warn!("No robust selector for {}: {}", css, err);
                    None
                }
            };
            let out = json!({
                "robustSelector": robust,
                "xpath": generate_xpath(&page, element),
                "cssPath": generate_css_path(&page, element),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Some(("scrollables", sub)) => {
            let page = load_page(input_of(sub)?, &config)?;
            let containers = detect_scrollable_containers(&page);
            println!("{}", serde_json::to_string_pretty(&containers)?);
        }
        _ => return Err(anyhow!("unknown subcommand")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_tags() {
        let matches = cli()
            .try_get_matches_from(["dom-highlighter", "find", "page.html", "--tag", "CLICKABLE", "-t", "fillable"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(
            requested_tags(sub).unwrap(),
            vec![CapabilityTag::Clickable, CapabilityTag::Fillable]
        );
    }

    #[test]
    fn selector_requires_css() {
        assert!(cli()
            .try_get_matches_from(["dom-highlighter", "selector", "page.html"])
            .is_err());
    }
}
